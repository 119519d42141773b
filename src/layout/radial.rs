//! Radial tree: depth maps to radius, siblings split their parent's wedge.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use eframe::egui::{Pos2, Vec2, vec2};

use super::{
    EdgeOrigin, LabelAlign, LabelPlacement, Layout, Placement, RoutedEdge, Shape, entry_key,
    entry_kind, entry_role,
};
use crate::config::RadialConfig;
use crate::graph::{HierarchyEntry, HierarchyTree};

/// Room left around the outer ring for labels when the radius is derived
/// from the viewport.
const LABEL_ROOM: f32 = 120.0;
const MIN_RADIUS: f32 = 60.0;

pub fn layout_radial(tree: &HierarchyTree, config: &RadialConfig, viewport: Vec2) -> Layout {
    let root = tree.root();
    let outer = config
        .radius
        .unwrap_or_else(|| (viewport.min_elem() * 0.5 - LABEL_ROOM).max(MIN_RADIUS));
    let ring = outer / root.height().max(1) as f32;

    let mut radial = Radial {
        config,
        origin: (viewport * 0.5).to_pos2(),
        ring,
        placements: Vec::new(),
        edges: Vec::new(),
    };
    radial.place(root, 0, 0.0, TAU, None);
    Layout::new(radial.placements, radial.edges)
}

struct Radial<'a> {
    config: &'a RadialConfig,
    origin: Pos2,
    ring: f32,
    placements: Vec<Placement>,
    edges: Vec<RoutedEdge>,
}

impl Radial<'_> {
    fn point(&self, angle: f32, radius: f32) -> Pos2 {
        self.origin + polar(angle, radius)
    }

    fn place(
        &mut self,
        entry: &HierarchyEntry,
        depth: usize,
        start: f32,
        span: f32,
        parent: Option<(String, f32, f32)>,
    ) {
        let angle = start + span * 0.5;
        let radius = depth as f32 * self.ring;
        let center = self.point(angle, radius);
        let key = entry_key(entry);

        if let Some((parent_key, parent_angle, parent_radius)) = parent {
            let middle = (parent_radius + radius) * 0.5;
            self.edges.push(RoutedEdge {
                key: format!("tree:{parent_key}->{key}"),
                source: parent_key,
                target: key.clone(),
                origin: EdgeOrigin::Tree,
                points: vec![
                    self.point(parent_angle, parent_radius),
                    self.point(parent_angle, middle),
                    self.point(angle, middle),
                    center,
                ],
            });
        }

        self.placements.push(Placement {
            key: key.clone(),
            node_id: entry.node_id.clone(),
            label: entry.name.clone(),
            role: entry_role(entry),
            kind: entry_kind(entry),
            center,
            shape: Shape::Circle {
                radius: self.config.node_radius,
            },
            label_placement: self.label(center, angle, entry.is_leaf(), depth == 0),
            depth,
        });

        let count = entry.children.len();
        if count == 0 {
            return;
        }
        let wedge = span / count as f32;
        for (index, child) in entry.children.iter().enumerate() {
            self.place(
                child,
                depth + 1,
                start + wedge * index as f32,
                wedge,
                Some((key.clone(), angle, radius)),
            );
        }
    }

    /// Leaves label outward, interior entries inward; text past the half
    /// circle is turned over so it reads left to right.
    fn label(&self, center: Pos2, angle: f32, leaf: bool, root: bool) -> LabelPlacement {
        if root {
            return LabelPlacement {
                visible: false,
                ..LabelPlacement::centered(center)
            };
        }

        let offset = self.config.node_radius + self.config.label_offset;
        let outward = polar(angle, 1.0);
        let anchor = if leaf {
            center + outward * offset
        } else {
            center - outward * offset
        };
        let flipped = angle >= PI;
        let rotation = if flipped {
            angle + FRAC_PI_2
        } else {
            angle - FRAC_PI_2
        };
        let align = if leaf != flipped {
            LabelAlign::Start
        } else {
            LabelAlign::End
        };

        LabelPlacement {
            anchor,
            angle: rotation,
            align,
            visible: true,
        }
    }
}

/// Angle zero points up; angles grow clockwise on screen.
fn polar(angle: f32, radius: f32) -> Vec2 {
    let turned = angle - FRAC_PI_2;
    vec2(turned.cos(), turned.sin()) * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_hierarchy;
    use crate::graph::fixtures;
    use crate::layout::PlacementRole;

    fn layout() -> Layout {
        let graph = fixtures::small_repo();
        let tree = build_hierarchy(graph.nodes());
        layout_radial(
            &tree,
            &RadialConfig {
                radius: Some(300.0),
                ..RadialConfig::default()
            },
            vec2(800.0, 800.0),
        )
    }

    #[test]
    fn depth_maps_to_ring_radius() {
        let layout = layout();
        let origin = Pos2::new(400.0, 400.0);
        // root → src → main.rs → main: height 3, rings of 100.
        let folder = layout.placement("folder:src").expect("folder placed");
        let file = layout.placement("src/main.rs").expect("file placed");
        let symbol = layout.placement("src/main.rs:main").expect("symbol placed");

        assert!((folder.center.distance(origin) - 100.0).abs() < 1e-3);
        assert!((file.center.distance(origin) - 200.0).abs() < 1e-3);
        assert!((symbol.center.distance(origin) - 300.0).abs() < 1e-3);
        assert_eq!(folder.role, PlacementRole::Folder);
        assert_eq!(file.role, PlacementRole::Container);
        assert_eq!(symbol.role, PlacementRole::Node);
    }

    #[test]
    fn every_child_gets_a_tree_link() {
        let layout = layout();
        // Root, one folder, two files, four symbols.
        assert_eq!(layout.placements().len(), 8);
        assert_eq!(layout.edges().len(), 7);
        assert!(layout.edges().iter().all(|edge| edge.origin == EdgeOrigin::Tree));
    }

    #[test]
    fn labels_past_half_circle_flip() {
        let radial = Radial {
            config: &RadialConfig::default(),
            origin: Pos2::ZERO,
            ring: 100.0,
            placements: Vec::new(),
            edges: Vec::new(),
        };

        let right = radial.label(Pos2::ZERO, FRAC_PI_2, true, false);
        let left = radial.label(Pos2::ZERO, PI + FRAC_PI_2, true, false);
        assert_eq!(right.align, LabelAlign::Start);
        assert_eq!(left.align, LabelAlign::End);
        assert!(right.angle.abs() < 1e-6);
        assert!((left.angle - TAU).abs() < 1e-5);
        assert!(right.anchor.x > 0.0 && left.anchor.x < 0.0);
    }

    #[test]
    fn siblings_split_the_wedge_evenly() {
        let layout = layout();
        let main = layout.placement("src/main.rs").expect("placed");
        let lib = layout.placement("src/lib.rs").expect("placed");
        // Two files under one folder: opposite halves of the full circle.
        let origin = Pos2::new(400.0, 400.0);
        let a = (main.center - origin).angle();
        let b = (lib.center - origin).angle();
        assert!(((a - b).abs() - PI).abs() < 1e-3);
    }
}
