//! Area-proportional circle packing of the containment tree.
//!
//! Leaves get a radius of `sqrt(value)`, siblings are packed with a front
//! chain, and each parent becomes a circle enclosing its children. The tree
//! is packed twice: once to learn the scale, once with the padding converted
//! into that scale.

use eframe::egui::{Pos2, Vec2, vec2};

use super::{
    EdgeOrigin, LabelPlacement, Layout, Placement, RoutedEdge, Shape, entry_key, entry_kind,
    entry_role,
};
use crate::config::PackConfig;
use crate::graph::{HierarchyEntry, HierarchyTree};

const CONTAINER_LABEL_INSET: f32 = 12.0;

pub fn layout_pack(tree: &HierarchyTree, config: &PackConfig, viewport: Vec2) -> Layout {
    let extent = f64::from(viewport.min_elem().max(1.0));
    let mut root = Disc::from_entry(tree.root());

    root.pack_children(0.0);
    let padding = if root.r > 0.0 {
        f64::from(config.padding) * root.r / extent
    } else {
        0.0
    };
    root.pack_children(padding);

    let scale = if root.r > 0.0 { extent / (2.0 * root.r) } else { 1.0 };
    let center = viewport * 0.5;
    root.x = f64::from(center.x);
    root.y = f64::from(center.y);
    root.r *= scale;
    for child in &mut root.children {
        child.translate(root.x, root.y, scale);
    }

    let mut placements = Vec::new();
    let mut edges = Vec::new();
    root.emit(config, 0, None, &mut placements, &mut edges);
    Layout::new(placements, edges)
}

struct Disc<'a> {
    entry: &'a HierarchyEntry,
    x: f64,
    y: f64,
    r: f64,
    children: Vec<Disc<'a>>,
}

impl<'a> Disc<'a> {
    fn from_entry(entry: &'a HierarchyEntry) -> Self {
        Self {
            entry,
            x: 0.0,
            y: 0.0,
            r: entry.value.max(0.0).sqrt(),
            children: entry.children.iter().map(Disc::from_entry).collect(),
        }
    }

    /// Packs every subtree bottom-up; child positions end up relative to
    /// their parent's center.
    fn pack_children(&mut self, padding: f64) {
        if self.children.is_empty() {
            return;
        }
        for child in &mut self.children {
            child.pack_children(padding);
        }

        for child in &mut self.children {
            child.r += padding;
        }
        let mut circles: Vec<Circle> = self
            .children
            .iter()
            .map(|child| Circle {
                x: 0.0,
                y: 0.0,
                r: child.r,
            })
            .collect();
        let enclosing = pack_siblings(&mut circles);
        for (child, circle) in self.children.iter_mut().zip(&circles) {
            child.x = circle.x;
            child.y = circle.y;
            child.r -= padding;
        }
        self.r = enclosing + padding;
    }

    fn translate(&mut self, parent_x: f64, parent_y: f64, scale: f64) {
        self.r *= scale;
        self.x = parent_x + self.x * scale;
        self.y = parent_y + self.y * scale;
        let (x, y) = (self.x, self.y);
        for child in &mut self.children {
            child.translate(x, y, scale);
        }
    }

    fn emit(
        &self,
        config: &PackConfig,
        depth: usize,
        parent: Option<&str>,
        placements: &mut Vec<Placement>,
        edges: &mut Vec<RoutedEdge>,
    ) {
        let key = entry_key(self.entry);
        let center = Pos2::new(self.x as f32, self.y as f32);
        let radius = self.r as f32;
        let leaf = self.entry.is_leaf();

        let threshold = if leaf {
            config.leaf_label_min_radius
        } else {
            config.container_label_min_radius
        };
        let anchor = if leaf {
            center
        } else {
            center - vec2(0.0, (radius - CONTAINER_LABEL_INSET).max(0.0))
        };
        placements.push(Placement {
            key: key.clone(),
            node_id: self.entry.node_id.clone(),
            label: self.entry.name.clone(),
            role: entry_role(self.entry),
            kind: entry_kind(self.entry),
            center,
            shape: Shape::Circle { radius },
            label_placement: LabelPlacement {
                visible: depth > 0 && radius >= threshold,
                ..LabelPlacement::centered(anchor)
            },
            depth,
        });

        if let Some(parent) = parent {
            edges.push(RoutedEdge {
                key: format!("tree:{parent}->{key}"),
                source: parent.to_owned(),
                target: key.clone(),
                origin: EdgeOrigin::Tree,
                points: Vec::new(),
            });
        }

        for child in &self.children {
            child.emit(config, depth + 1, Some(&key), placements, edges);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Circle {
    x: f64,
    y: f64,
    r: f64,
}

impl Circle {
    fn intersects(self, other: Circle) -> bool {
        let reach = self.r + other.r - 1e-6;
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        reach > 0.0 && reach * reach > dx * dx + dy * dy
    }
}

/// Places `c` tangent to both `a` and `b`.
fn place_tangent(b: Circle, a: Circle, c: &mut Circle) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d2 = dx * dx + dy * dy;
    if d2 <= 0.0 {
        c.x = a.x + c.r;
        c.y = a.y;
        return;
    }

    let a2 = (a.r + c.r).powi(2);
    let b2 = (b.r + c.r).powi(2);
    if a2 > b2 {
        let x = (d2 + b2 - a2) / (2.0 * d2);
        let y = (b2 / d2 - x * x).max(0.0).sqrt();
        c.x = b.x - x * dx - y * dy;
        c.y = b.y - x * dy + y * dx;
    } else {
        let x = (d2 + a2 - b2) / (2.0 * d2);
        let y = (a2 / d2 - x * x).max(0.0).sqrt();
        c.x = a.x + x * dx - y * dy;
        c.y = a.y + x * dy + y * dx;
    }
}

/// Packs circles around the origin and returns the enclosing radius; the
/// circles end up centered on the enclosing circle.
fn pack_siblings(circles: &mut [Circle]) -> f64 {
    let n = circles.len();
    match n {
        0 => return 0.0,
        1 => {
            circles[0].x = 0.0;
            circles[0].y = 0.0;
            return circles[0].r;
        }
        _ => {}
    }

    circles[0].x = -circles[1].r;
    circles[0].y = 0.0;
    circles[1].x = circles[0].r;
    circles[1].y = 0.0;
    if n > 2 {
        let (a, b) = (circles[0], circles[1]);
        place_tangent(b, a, &mut circles[2]);
        front_chain(circles);
    }

    let (x, y, r) = enclose(circles);
    for circle in circles.iter_mut() {
        circle.x -= x;
        circle.y -= y;
    }
    r
}

fn front_chain(circles: &mut [Circle]) {
    let n = circles.len();
    let mut next = vec![0usize; n];
    let mut previous = vec![0usize; n];
    // Chain a → b → c → a over the first three circles.
    let (mut a, mut b) = (0usize, 1usize);
    next[0] = 1;
    previous[1] = 0;
    next[1] = 2;
    previous[2] = 1;
    next[2] = 0;
    previous[0] = 2;

    let score = |circles: &[Circle], next: &[usize], node: usize| {
        let (p, q) = (circles[node], circles[next[node]]);
        let sum = p.r + q.r;
        let dx = (p.x * q.r + q.x * p.r) / sum;
        let dy = (p.y * q.r + q.y * p.r) / sum;
        dx * dx + dy * dy
    };

    let mut i = 3;
    'pack: while i < n {
        let (anchor_a, anchor_b) = (circles[a], circles[b]);
        place_tangent(anchor_a, anchor_b, &mut circles[i]);
        let c = i;

        let (mut j, mut k) = (next[b], previous[a]);
        let (mut sj, mut sk) = (circles[b].r, circles[a].r);
        loop {
            if sj <= sk {
                if circles[j].intersects(circles[c]) {
                    b = j;
                    next[a] = b;
                    previous[b] = a;
                    continue 'pack;
                }
                sj += circles[j].r;
                j = next[j];
            } else {
                if circles[k].intersects(circles[c]) {
                    a = k;
                    next[a] = b;
                    previous[b] = a;
                    continue 'pack;
                }
                sk += circles[k].r;
                k = previous[k];
            }
            if j == next[k] {
                break;
            }
        }

        previous[c] = a;
        next[c] = b;
        next[a] = c;
        previous[b] = c;
        b = c;

        let mut best = a;
        let mut best_score = score(&*circles, &next, a);
        let mut cursor = next[c];
        while cursor != b {
            let candidate = score(&*circles, &next, cursor);
            if candidate < best_score {
                best = cursor;
                best_score = candidate;
            }
            cursor = next[cursor];
        }
        a = best;
        b = next[a];
        i += 1;
    }
}

/// Circle around every input: centered on their bounding box, reaching the
/// farthest edge.
fn enclose(circles: &[Circle]) -> (f64, f64, f64) {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for circle in circles {
        min_x = min_x.min(circle.x - circle.r);
        min_y = min_y.min(circle.y - circle.r);
        max_x = max_x.max(circle.x + circle.r);
        max_y = max_y.max(circle.y + circle.r);
    }
    let x = (min_x + max_x) * 0.5;
    let y = (min_y + max_y) * 0.5;
    let r = circles
        .iter()
        .map(|circle| ((circle.x - x).hypot(circle.y - y)) + circle.r)
        .fold(0.0, f64::max);
    (x, y, r)
}
