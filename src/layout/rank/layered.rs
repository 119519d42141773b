//! Layered left-to-right placement of one container level.
//!
//! Runs the four classic phases over the direct children of a container:
//! cycle removal, longest-path ranking, barycenter crossing reduction and
//! coordinate assignment. Child containers arrive as opaque boxes with their
//! already computed size.

use std::collections::VecDeque;

use eframe::egui::{Pos2, Vec2, pos2};

use crate::config::RankSpacing;

const ORDER_SWEEPS: usize = 12;
const ALIGN_PASSES: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LevelEdge {
    pub source: usize,
    pub target: usize,
    /// Caller-side identity, echoed back with the edge's waypoints.
    pub id: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct LevelLayout {
    /// Box centers, relative to the top-left of the content area.
    pub centers: Vec<Pos2>,
    pub size: Vec2,
    /// Dummy-node positions per edge id, ordered from source to target.
    pub waypoints: Vec<(usize, Vec<Pos2>)>,
}

pub(crate) fn layout_level(
    sizes: &[Vec2],
    edges: &[LevelEdge],
    spacing: &RankSpacing,
) -> LevelLayout {
    if sizes.is_empty() {
        return LevelLayout::default();
    }

    let oriented = remove_cycles(sizes.len(), edges);
    let ranks = assign_ranks(sizes.len(), &oriented);
    let mut layered = Layered::build(sizes, &ranks, &oriented);
    layered.reduce_crossings();
    layered.assign_coordinates(spacing);
    layered.finish(sizes.len())
}

#[derive(Clone, Copy, Debug)]
struct Oriented {
    from: usize,
    to: usize,
    id: usize,
    reversed: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Reverses DFS back edges so the level becomes acyclic.
fn remove_cycles(count: usize, edges: &[LevelEdge]) -> Vec<Oriented> {
    let mut outgoing = vec![Vec::new(); count];
    for (index, edge) in edges.iter().enumerate() {
        outgoing[edge.source].push(index);
    }

    let mut state = vec![Visit::New; count];
    let mut reversed = vec![false; edges.len()];
    for start in 0..count {
        if state[start] != Visit::New {
            continue;
        }
        state[start] = Visit::Active;
        let mut stack = vec![(start, 0usize)];

        while let Some(&(node, cursor)) = stack.last() {
            let Some(&edge) = outgoing[node].get(cursor) else {
                state[node] = Visit::Done;
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            let target = edges[edge].target;
            match state[target] {
                Visit::Active => reversed[edge] = true,
                Visit::New => {
                    state[target] = Visit::Active;
                    stack.push((target, 0));
                }
                Visit::Done => {}
            }
        }
    }

    edges
        .iter()
        .zip(reversed)
        .map(|(edge, reversed)| {
            let (from, to) = if reversed {
                (edge.target, edge.source)
            } else {
                (edge.source, edge.target)
            };
            Oriented {
                from,
                to,
                id: edge.id,
                reversed,
            }
        })
        .collect()
}

/// Longest-path ranking over the acyclic orientation.
fn assign_ranks(count: usize, edges: &[Oriented]) -> Vec<usize> {
    let mut indegree = vec![0usize; count];
    let mut outgoing = vec![Vec::new(); count];
    for edge in edges {
        indegree[edge.to] += 1;
        outgoing[edge.from].push(edge.to);
    }

    let mut rank = vec![0usize; count];
    let mut queue: VecDeque<usize> = (0..count).filter(|&node| indegree[node] == 0).collect();
    while let Some(node) = queue.pop_front() {
        for &next in &outgoing[node] {
            rank[next] = rank[next].max(rank[node] + 1);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }
    rank
}

struct Vertex {
    size: Vec2,
    rank: usize,
    dummy: bool,
    center: Pos2,
}

struct Chain {
    id: usize,
    reversed: bool,
    dummies: Vec<usize>,
}

struct Layered {
    vertices: Vec<Vertex>,
    layers: Vec<Vec<usize>>,
    /// Position of each vertex inside its layer.
    order: Vec<usize>,
    upper: Vec<Vec<usize>>,
    lower: Vec<Vec<usize>>,
    chains: Vec<Chain>,
}

impl Layered {
    fn build(sizes: &[Vec2], ranks: &[usize], edges: &[Oriented]) -> Self {
        let mut vertices: Vec<Vertex> = sizes
            .iter()
            .zip(ranks)
            .map(|(&size, &rank)| Vertex {
                size,
                rank,
                dummy: false,
                center: Pos2::ZERO,
            })
            .collect();
        let mut segments = Vec::new();
        let mut chains = Vec::with_capacity(edges.len());

        for edge in edges {
            let mut dummies = Vec::new();
            let mut previous = edge.from;
            for rank in ranks[edge.from] + 1..ranks[edge.to] {
                let dummy = vertices.len();
                vertices.push(Vertex {
                    size: Vec2::ZERO,
                    rank,
                    dummy: true,
                    center: Pos2::ZERO,
                });
                segments.push((previous, dummy));
                dummies.push(dummy);
                previous = dummy;
            }
            segments.push((previous, edge.to));
            chains.push(Chain {
                id: edge.id,
                reversed: edge.reversed,
                dummies,
            });
        }

        let rank_count = vertices.iter().map(|vertex| vertex.rank + 1).max().unwrap_or(0);
        let mut layers = vec![Vec::new(); rank_count];
        let mut order = vec![0; vertices.len()];
        for (index, vertex) in vertices.iter().enumerate() {
            order[index] = layers[vertex.rank].len();
            layers[vertex.rank].push(index);
        }

        let mut upper = vec![Vec::new(); vertices.len()];
        let mut lower = vec![Vec::new(); vertices.len()];
        for (from, to) in segments {
            lower[from].push(to);
            upper[to].push(from);
        }

        Self {
            vertices,
            layers,
            order,
            upper,
            lower,
            chains,
        }
    }

    fn reduce_crossings(&mut self) {
        if self.layers.len() < 2 {
            return;
        }
        let mut best = self.layers.clone();
        let mut best_crossings = self.crossings();

        for sweep in 0..ORDER_SWEEPS {
            if best_crossings == 0 {
                break;
            }
            if sweep % 2 == 0 {
                for rank in 1..self.layers.len() {
                    self.reorder(rank, true);
                }
            } else {
                for rank in (0..self.layers.len() - 1).rev() {
                    self.reorder(rank, false);
                }
            }

            let crossings = self.crossings();
            if crossings < best_crossings {
                best_crossings = crossings;
                best = self.layers.clone();
            }
        }

        self.layers = best;
        self.refresh_order();
    }

    fn reorder(&mut self, rank: usize, from_upper: bool) {
        let mut keyed: Vec<(f32, usize)> = self.layers[rank]
            .iter()
            .map(|&vertex| {
                let neighbors = if from_upper {
                    &self.upper[vertex]
                } else {
                    &self.lower[vertex]
                };
                let barycenter = if neighbors.is_empty() {
                    self.order[vertex] as f32
                } else {
                    neighbors
                        .iter()
                        .map(|&neighbor| self.order[neighbor] as f32)
                        .sum::<f32>()
                        / neighbors.len() as f32
                };
                (barycenter, vertex)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

        self.layers[rank] = keyed.into_iter().map(|(_, vertex)| vertex).collect();
        for (position, &vertex) in self.layers[rank].iter().enumerate() {
            self.order[vertex] = position;
        }
    }

    fn refresh_order(&mut self) {
        for layer in &self.layers {
            for (position, &vertex) in layer.iter().enumerate() {
                self.order[vertex] = position;
            }
        }
    }

    fn crossings(&self) -> usize {
        let mut total = 0;
        for layer in &self.layers {
            let mut segments: Vec<(usize, usize)> = layer
                .iter()
                .flat_map(|&vertex| {
                    self.lower[vertex]
                        .iter()
                        .map(move |&below| (self.order[vertex], self.order[below]))
                })
                .collect();
            segments.sort_unstable();
            for (index, &(_, low)) in segments.iter().enumerate() {
                total += segments[index + 1..]
                    .iter()
                    .filter(|&&(_, other)| other < low)
                    .count();
            }
        }
        total
    }

    fn gap(&self, a: usize, b: usize, spacing: &RankSpacing) -> f32 {
        let (a, b) = (&self.vertices[a], &self.vertices[b]);
        let separation = if a.dummy || b.dummy {
            spacing.edge_sep
        } else {
            spacing.node_sep
        };
        (a.size.y + b.size.y) * 0.5 + separation
    }

    fn assign_coordinates(&mut self, spacing: &RankSpacing) {
        let mut left = 0.0;
        for layer in &self.layers {
            let width = layer
                .iter()
                .map(|&vertex| self.vertices[vertex].size.x)
                .fold(0.0_f32, f32::max);
            for &vertex in layer {
                self.vertices[vertex].center.x = left + width * 0.5;
            }
            left += width + spacing.rank_sep;
        }

        for rank in 0..self.layers.len() {
            let mut y = 0.0;
            for position in 0..self.layers[rank].len() {
                let vertex = self.layers[rank][position];
                if position == 0 {
                    y = self.vertices[vertex].size.y * 0.5;
                } else {
                    y += self.gap(self.layers[rank][position - 1], vertex, spacing);
                }
                self.vertices[vertex].center.y = y;
            }
        }

        for pass in 0..ALIGN_PASSES {
            let downward = pass % 2 == 0;
            let ranks: Vec<usize> = if downward {
                (1..self.layers.len()).collect()
            } else {
                (0..self.layers.len().saturating_sub(1)).rev().collect()
            };
            for rank in ranks {
                self.align_rank(rank, downward, spacing);
            }
        }

        let top = self
            .vertices
            .iter()
            .map(|vertex| vertex.center.y - vertex.size.y * 0.5)
            .fold(f32::INFINITY, f32::min);
        for vertex in &mut self.vertices {
            vertex.center.y -= top;
        }
    }

    /// Pulls each vertex toward the median of its neighbours, then restores
    /// separation and recenters the rank on the requested positions.
    fn align_rank(&mut self, rank: usize, downward: bool, spacing: &RankSpacing) {
        let layer = self.layers[rank].clone();
        if layer.is_empty() {
            return;
        }

        let desired: Vec<f32> = layer
            .iter()
            .map(|&vertex| {
                let neighbors = if downward {
                    &self.upper[vertex]
                } else {
                    &self.lower[vertex]
                };
                let mut ys: Vec<f32> = neighbors
                    .iter()
                    .map(|&neighbor| self.vertices[neighbor].center.y)
                    .collect();
                median(&mut ys).unwrap_or(self.vertices[vertex].center.y)
            })
            .collect();

        let mut placed = Vec::with_capacity(layer.len());
        for (position, &vertex) in layer.iter().enumerate() {
            let y = if position == 0 {
                desired[0]
            } else {
                let minimum = placed[position - 1] + self.gap(layer[position - 1], vertex, spacing);
                desired[position].max(minimum)
            };
            placed.push(y);
        }

        let drift = placed
            .iter()
            .zip(&desired)
            .map(|(placed, desired)| placed - desired)
            .sum::<f32>()
            / placed.len() as f32;
        for (&vertex, y) in layer.iter().zip(placed) {
            self.vertices[vertex].center.y = y - drift;
        }
    }

    fn finish(self, real: usize) -> LevelLayout {
        let size = self
            .vertices
            .iter()
            .map(|vertex| vertex.center.to_vec2() + vertex.size * 0.5)
            .fold(Vec2::ZERO, |acc, corner| acc.max(corner));
        let centers = self.vertices[..real]
            .iter()
            .map(|vertex| vertex.center)
            .collect();
        let waypoints = self
            .chains
            .iter()
            .map(|chain| {
                let mut points: Vec<Pos2> = chain
                    .dummies
                    .iter()
                    .map(|&dummy| self.vertices[dummy].center)
                    .collect();
                if chain.reversed {
                    points.reverse();
                }
                (chain.id, points)
            })
            .collect();

        LevelLayout {
            centers,
            size,
            waypoints,
        }
    }
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let middle = values.len() / 2;
    Some(if values.len() % 2 == 1 {
        values[middle]
    } else {
        (values[middle - 1] + values[middle]) * 0.5
    })
}

/// Top-left corner of a box centered at `center`.
pub(crate) fn corner(center: Pos2, size: Vec2) -> Pos2 {
    pos2(center.x - size.x * 0.5, center.y - size.y * 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::vec2;

    fn boxes(count: usize) -> Vec<Vec2> {
        vec![vec2(140.0, 36.0); count]
    }

    fn edge(source: usize, target: usize) -> LevelEdge {
        LevelEdge {
            source,
            target,
            id: source * 100 + target,
        }
    }

    #[test]
    fn chain_flows_left_to_right() {
        let spacing = RankSpacing::default();
        let layout = layout_level(&boxes(3), &[edge(0, 1), edge(1, 2)], &spacing);

        assert!(layout.centers[0].x < layout.centers[1].x);
        assert!(layout.centers[1].x < layout.centers[2].x);
        assert!((layout.centers[1].x - layout.centers[0].x - (140.0 + spacing.rank_sep)).abs() < 1e-3);
    }

    #[test]
    fn cycles_still_rank_every_node() {
        let spacing = RankSpacing::default();
        let layout = layout_level(&boxes(3), &[edge(0, 1), edge(1, 2), edge(2, 0)], &spacing);

        assert_eq!(layout.centers.len(), 3);
        assert!(layout.centers.iter().all(|center| center.x.is_finite() && center.y.is_finite()));
    }

    #[test]
    fn long_edges_get_waypoints_in_source_order() {
        let spacing = RankSpacing::default();
        let layout = layout_level(
            &boxes(4),
            &[edge(0, 1), edge(1, 2), edge(2, 3), edge(0, 3)],
            &spacing,
        );

        let (_, points) = layout
            .waypoints
            .iter()
            .find(|(id, _)| *id == 3)
            .expect("long edge recorded");
        assert_eq!(points.len(), 2);
        assert!(points[0].x < points[1].x);
    }

    #[test]
    fn same_rank_boxes_do_not_overlap() {
        let spacing = RankSpacing::default();
        let layout = layout_level(&boxes(4), &[edge(0, 1), edge(0, 2), edge(0, 3)], &spacing);

        let mut ys: Vec<f32> = layout.centers[1..].iter().map(|center| center.y).collect();
        ys.sort_by(f32::total_cmp);
        for pair in ys.windows(2) {
            assert!(pair[1] - pair[0] >= 36.0 + spacing.node_sep - 1e-3);
        }
    }

    #[test]
    fn content_size_covers_every_box() {
        let spacing = RankSpacing::default();
        let sizes = vec![vec2(200.0, 80.0), vec2(140.0, 36.0), vec2(140.0, 36.0)];
        let layout = layout_level(&sizes, &[edge(0, 1)], &spacing);

        for (center, size) in layout.centers.iter().zip(&sizes) {
            let min = corner(*center, *size);
            assert!(min.x >= -1e-3 && min.y >= -1e-3);
            assert!(min.x + size.x <= layout.size.x + 1e-3);
            assert!(min.y + size.y <= layout.size.y + 1e-3);
        }
    }

    #[test]
    fn median_of_even_count_averages() {
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }
}
