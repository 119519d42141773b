//! Hierarchical layout: nodes flow left to right by rank, nested inside the
//! boxes of their containers.
//!
//! Each container level is laid out on its own, innermost first, with child
//! containers treated as opaque boxes. Absolute positions are then handed
//! down from the root. A broken membership map fails the compound pass, and
//! the layout is retried once with every container flattened.

mod layered;

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use eframe::egui::{Pos2, Vec2, pos2, vec2};
use tracing::{debug, warn};

use self::layered::{LevelEdge, LevelLayout, corner, layout_level};
use super::{
    EdgeOrigin, LabelAlign, LabelPlacement, Layout, LayoutError, LayoutRequest, Placement,
    PlacementRole, RoutedEdge, Shape,
};
use crate::config::RankSpacing;
use crate::graph::GraphData;

const CONTAINER_LABEL_GAP: f32 = 4.0;

pub fn layout_ranked(request: LayoutRequest<'_>) -> Result<Layout, LayoutError> {
    let started = Instant::now();
    let derived;
    let membership = match request.membership {
        Some(membership) => membership,
        None => {
            derived = request.graph.membership();
            &derived
        }
    };

    let result = match layout_compound(request.graph, membership, &request.config.rank) {
        Ok(layout) => Ok(layout),
        Err(error) => {
            warn!(%error, "compound layout failed, retrying without containers");
            layout_compound(request.graph, &HashMap::new(), &request.config.rank)
        }
    };

    debug!(
        nodes = request.graph.node_count(),
        edges = request.graph.edge_count(),
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        ok = result.is_ok(),
        "hierarchical layout"
    );
    result
}

/// Node indices arranged into container levels.
struct Nesting {
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    depth: Vec<usize>,
    /// Position of each node among its siblings.
    local: Vec<usize>,
}

impl Nesting {
    fn build(graph: &GraphData, membership: &HashMap<String, String>) -> Result<Self, LayoutError> {
        let count = graph.node_count();
        let mut parent = vec![None; count];

        for (index, node) in graph.nodes().iter().enumerate() {
            let Some(container_id) = membership.get(&node.id) else {
                continue;
            };
            if container_id == &node.id {
                return Err(LayoutError::SelfContainment(node.id.clone()));
            }
            let Some(container) = graph.index_of(container_id) else {
                continue;
            };
            if !graph.nodes()[container].kind.is_container() {
                return Err(LayoutError::NotAContainer {
                    member: node.id.clone(),
                    container: container_id.clone(),
                });
            }
            parent[index] = Some(container);
        }

        let mut depth = vec![0usize; count];
        for start in 0..count {
            let mut seen = HashSet::from([start]);
            let mut current = start;
            while let Some(next) = parent[current] {
                if !seen.insert(next) {
                    return Err(LayoutError::ContainmentCycle(graph.nodes()[start].id.clone()));
                }
                depth[start] += 1;
                current = next;
            }
        }

        let mut children = vec![Vec::new(); count];
        let mut roots = Vec::new();
        let mut local = vec![0usize; count];
        for index in 0..count {
            let siblings = match parent[index] {
                Some(container) => &mut children[container],
                None => &mut roots,
            };
            local[index] = siblings.len();
            siblings.push(index);
        }

        Ok(Self {
            parent,
            children,
            roots,
            depth,
            local,
        })
    }

    fn ancestry(&self, node: usize) -> Vec<usize> {
        let mut chain = vec![node];
        let mut current = node;
        while let Some(next) = self.parent[current] {
            chain.push(next);
            current = next;
        }
        chain
    }

    fn is_compound(&self, node: usize) -> bool {
        !self.children[node].is_empty()
    }
}

/// Level id of the root; container levels use the container's node index.
fn root_level(nesting: &Nesting) -> usize {
    nesting.parent.len()
}

fn layout_compound(
    graph: &GraphData,
    membership: &HashMap<String, String>,
    spacing: &RankSpacing,
) -> Result<Layout, LayoutError> {
    if !spacing.is_finite() {
        return Err(LayoutError::InvalidSpacing);
    }
    let nesting = Nesting::build(graph, membership)?;
    let count = graph.node_count();
    let root = root_level(&nesting);

    let kept = kept_edges(graph, &nesting);
    let mut level_edges: Vec<Vec<LevelEdge>> = vec![Vec::new(); count + 1];
    for &edge_index in &kept {
        let edge = &graph.edges()[edge_index];
        let (Some(source), Some(target)) = (graph.index_of(&edge.source), graph.index_of(&edge.target))
        else {
            continue;
        };
        if let Some((level, from, to)) = shared_level(&nesting, source, target) {
            level_edges[level].push(LevelEdge {
                source: nesting.local[from],
                target: nesting.local[to],
                id: edge_index,
            });
        }
    }

    // Innermost containers first, so every child box has its final size.
    let mut sizes: Vec<Vec2> = graph
        .nodes()
        .iter()
        .map(|node| vec2(spacing.leaf_width(&node.name), spacing.leaf_height))
        .collect();
    let mut levels: Vec<Option<LevelLayout>> = vec![None; count + 1];
    let mut compounds: Vec<usize> = (0..count).filter(|&node| nesting.is_compound(node)).collect();
    compounds.sort_by_key(|&node| std::cmp::Reverse(nesting.depth[node]));

    for container in compounds {
        let level = lay_out_level(&nesting.children[container], &sizes, &level_edges[container], spacing);
        sizes[container] = level.size + Vec2::splat(spacing.container_padding * 2.0);
        levels[container] = Some(level);
    }
    levels[root] = Some(lay_out_level(&nesting.roots, &sizes, &level_edges[root], spacing));

    // Absolute positions, outermost first.
    let mut centers = vec![Pos2::ZERO; count];
    let mut waypoints: HashMap<usize, Vec<Pos2>> = HashMap::new();
    let mut pending = vec![(root, pos2(spacing.margin_x, spacing.margin_y))];
    while let Some((level_id, origin)) = pending.pop() {
        let Some(level) = levels[level_id].as_ref() else {
            continue;
        };
        let members = if level_id == root {
            &nesting.roots
        } else {
            &nesting.children[level_id]
        };
        for (&member, local_center) in members.iter().zip(&level.centers) {
            let center = origin + local_center.to_vec2();
            centers[member] = center;
            if nesting.is_compound(member) {
                let content = corner(center, sizes[member]) + Vec2::splat(spacing.container_padding);
                pending.push((member, content));
            }
        }
        for (edge_index, points) in &level.waypoints {
            waypoints.insert(
                *edge_index,
                points.iter().map(|point| origin + point.to_vec2()).collect(),
            );
        }
    }

    let placements = graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let size = sizes[index];
            let center = centers[index];
            let (role, label_placement) = if nesting.is_compound(index) {
                let anchor = corner(center, size) - vec2(0.0, CONTAINER_LABEL_GAP);
                (
                    PlacementRole::Container,
                    LabelPlacement {
                        anchor,
                        angle: 0.0,
                        align: LabelAlign::AboveLeft,
                        visible: true,
                    },
                )
            } else {
                (PlacementRole::Node, LabelPlacement::centered(center))
            };
            Placement {
                key: node.id.clone(),
                node_id: Some(node.id.clone()),
                label: node.name.clone(),
                role,
                kind: Some(node.kind),
                center,
                shape: Shape::Rect { size },
                label_placement,
                depth: nesting.depth[index],
            }
        })
        .collect::<Vec<_>>();

    let edges = kept
        .iter()
        .filter_map(|&edge_index| {
            let edge = &graph.edges()[edge_index];
            let source = graph.index_of(&edge.source)?;
            let target = graph.index_of(&edge.target)?;
            let start = placements[source].shape.right_anchor(centers[source]);
            let end = placements[target].shape.left_anchor(centers[target]);
            let lead = vec2(spacing.edge_sep, 0.0);

            let mut points = vec![start, start + lead];
            points.extend(waypoints.remove(&edge_index).unwrap_or_default());
            points.extend([end - lead, end]);
            Some(RoutedEdge {
                key: edge.key(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                origin: EdgeOrigin::Graph(edge_index),
                points,
            })
        })
        .collect();

    let layout = Layout::new(placements, edges);
    layout.ensure_finite()?;
    Ok(layout)
}

fn lay_out_level(
    members: &[usize],
    sizes: &[Vec2],
    edges: &[LevelEdge],
    spacing: &RankSpacing,
) -> LevelLayout {
    let member_sizes: Vec<Vec2> = members.iter().map(|&member| sizes[member]).collect();
    layout_level(&member_sizes, edges, spacing)
}

/// Indices of the edges that are drawn: no self loops, and no structural
/// edge between a node and its own direct container.
fn kept_edges(graph: &GraphData, nesting: &Nesting) -> Vec<usize> {
    graph
        .edges()
        .iter()
        .enumerate()
        .filter(|(_, edge)| {
            if edge.is_self_loop() {
                return false;
            }
            let (Some(source), Some(target)) =
                (graph.index_of(&edge.source), graph.index_of(&edge.target))
            else {
                return false;
            };
            let direct = nesting.parent[source] == Some(target) || nesting.parent[target] == Some(source);
            !(direct && edge.is_structural())
        })
        .map(|(index, _)| index)
        .collect()
}

/// The level both endpoints meet at, with the sibling boxes standing in for
/// them. Edges between a container and its own descendants join no level.
fn shared_level(nesting: &Nesting, source: usize, target: usize) -> Option<(usize, usize, usize)> {
    let source_chain = nesting.ancestry(source);
    let target_chain = nesting.ancestry(target);
    if source_chain.contains(&target) || target_chain.contains(&source) {
        return None;
    }

    let target_ancestors: HashSet<usize> = target_chain.iter().copied().collect();
    let common = source_chain
        .iter()
        .copied()
        .find(|ancestor| target_ancestors.contains(ancestor));

    let below = |chain: &[usize]| {
        chain
            .iter()
            .copied()
            .find(|&node| nesting.parent[node] == common)
    };
    let from = below(&source_chain)?;
    let to = below(&target_chain)?;
    let level = common.unwrap_or_else(|| root_level(nesting));
    Some((level, from, to))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use eframe::egui::{Rect, Vec2};
    use proptest::prelude::*;

    use super::*;
    use crate::config::AtlasConfig;
    use crate::graph::fixtures::{self, file, symbol};
    use crate::graph::{Edge, Node, NodeKind, normalize_parts};

    fn run(graph: &GraphData, config: &AtlasConfig) -> Result<Layout, LayoutError> {
        layout_ranked(LayoutRequest {
            graph,
            membership: None,
            config,
            viewport: Vec2::new(800.0, 600.0),
        })
    }

    fn run_with(
        graph: &GraphData,
        membership: &HashMap<String, String>,
        config: &AtlasConfig,
    ) -> Result<Layout, LayoutError> {
        layout_ranked(LayoutRequest {
            graph,
            membership: Some(membership),
            config,
            viewport: Vec2::new(800.0, 600.0),
        })
    }

    fn encloses(outer: Rect, inner: Rect, padding: f32) -> bool {
        outer.expand(1e-3).contains_rect(inner.expand(padding))
    }

    #[test]
    fn structural_edge_to_own_container_is_suppressed() {
        let config = AtlasConfig::default();
        let layout = run(&fixtures::file_with_symbol("defines"), &config).expect("layout");
        assert!(layout.edges().is_empty());

        let layout = run(&fixtures::file_with_symbol("V:Member_Of"), &config).expect("layout");
        assert!(layout.edges().is_empty());
    }

    #[test]
    fn call_edge_to_own_container_is_kept() {
        let config = AtlasConfig::default();
        let layout = run(&fixtures::file_with_symbol("calls"), &config).expect("layout");
        assert_eq!(layout.edges().len(), 1);
        assert_eq!(layout.edges()[0].source, "a:fn1");
    }

    #[test]
    fn containers_enclose_members_with_padding() {
        let config = AtlasConfig::default();
        let graph = fixtures::small_repo();
        let layout = run(&graph, &config).expect("layout");

        let main = layout.placement("src/main.rs").expect("file placed");
        assert_eq!(main.role, PlacementRole::Container);
        for member in ["src/main.rs:main", "src/main.rs:Args"] {
            let inner = layout.placement(member).expect("member placed");
            assert!(encloses(main.bounds(), inner.bounds(), config.rank.container_padding));
        }
    }

    #[test]
    fn chain_ranks_increase_left_to_right() {
        let config = AtlasConfig::default();
        let layout = run(&fixtures::chain(4), &config).expect("layout");
        let xs: Vec<f32> = (0..4)
            .map(|index| layout.placement(&format!("n{index}")).expect("placed").center.x)
            .collect();
        assert!(xs.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn edges_run_from_right_middle_to_left_middle() {
        let config = AtlasConfig::default();
        let layout = run(&fixtures::chain(2), &config).expect("layout");
        let edge = &layout.edges()[0];
        let source = layout.placement("n0").expect("placed");
        let target = layout.placement("n1").expect("placed");

        let first = edge.points[0];
        let last = edge.points[edge.points.len() - 1];
        assert_eq!(first, pos2(source.bounds().max.x, source.center.y));
        assert_eq!(last, pos2(target.bounds().min.x, target.center.y));
    }

    #[test]
    fn self_containment_falls_back_to_flat() {
        let config = AtlasConfig::default();
        let graph = fixtures::small_repo();
        let membership = HashMap::from([("src/main.rs".to_owned(), "src/main.rs".to_owned())]);

        let layout = run_with(&graph, &membership, &config).expect("flat retry succeeds");
        assert_eq!(layout.placements().len(), graph.node_count());
        assert!(
            layout
                .placements()
                .iter()
                .all(|placement| placement.role == PlacementRole::Node)
        );
    }

    #[test]
    fn member_of_a_symbol_falls_back_to_flat() {
        let config = AtlasConfig::default();
        let graph = fixtures::small_repo();
        let membership =
            HashMap::from([("src/lib.rs:run".to_owned(), "src/main.rs:main".to_owned())]);

        let layout = run_with(&graph, &membership, &config).expect("flat retry succeeds");
        assert_eq!(layout.placements().len(), graph.node_count());
    }

    #[test]
    fn containment_cycle_is_rejected() {
        let graph = normalize_parts(
            vec![
                Node::new("p", "p", NodeKind::Package),
                Node::new("q", "q", NodeKind::Package),
            ],
            Vec::new(),
        );
        let membership = HashMap::from([
            ("p".to_owned(), "q".to_owned()),
            ("q".to_owned(), "p".to_owned()),
        ]);
        let nesting = Nesting::build(&graph, &membership);
        assert!(matches!(nesting, Err(LayoutError::ContainmentCycle(_))));
    }

    #[test]
    fn non_finite_spacing_fails_both_passes() {
        let mut config = AtlasConfig::default();
        config.rank.rank_sep = f32::NAN;
        assert_eq!(
            run(&fixtures::small_repo(), &config),
            Err(LayoutError::InvalidSpacing)
        );
    }

    #[test]
    fn dropping_a_dangling_edge_moves_nothing() {
        let config = AtlasConfig::default();
        let nodes = vec![
            file("a"),
            symbol("a:fn1", NodeKind::Function, "a"),
            file("b"),
        ];
        let edges = vec![Edge::new("a:fn1", "b", "calls")];
        let clean = normalize_parts(nodes.clone(), edges.clone());

        let mut dangling = edges;
        dangling.push(Edge::new("a:fn1", "missing", "calls"));
        let dirty = normalize_parts(nodes, dangling);

        let clean = run(&clean, &config).expect("layout");
        let dirty = run(&dirty, &config).expect("layout");
        for placement in clean.placements() {
            let other = dirty.placement(&placement.key).expect("same nodes");
            assert_eq!(placement.center, other.center);
        }
    }

    #[test]
    fn empty_container_is_an_ordinary_box() {
        let config = AtlasConfig::default();
        let graph = normalize_parts(vec![file("lonely.rs")], Vec::new());
        let layout = run(&graph, &config).expect("layout");
        let placement = layout.placement("lonely.rs").expect("placed");

        assert_eq!(placement.role, PlacementRole::Node);
        assert_eq!(
            placement.shape,
            Shape::Rect {
                size: vec2(config.rank.min_leaf_width, config.rank.leaf_height)
            }
        );
    }

    fn repo_strategy() -> impl Strategy<Value = GraphData> {
        (1usize..5, 0usize..4, prop::collection::vec((0usize..40, 0usize..40), 0..30)).prop_map(
            |(files, symbols_per_file, links)| {
                let mut nodes = Vec::new();
                for f in 0..files {
                    let file_id = format!("f{f}");
                    nodes.push(file(&file_id));
                    for s in 0..symbols_per_file {
                        nodes.push(symbol(&format!("{file_id}:s{s}"), NodeKind::Function, &file_id));
                    }
                }
                let ids: Vec<String> = nodes.iter().map(|node| node.id.clone()).collect();
                let edges = links
                    .into_iter()
                    .map(|(a, b)| Edge::new(ids[a % ids.len()].clone(), ids[b % ids.len()].clone(), "calls"))
                    .collect();
                normalize_parts(nodes, edges)
            },
        )
    }

    proptest! {
        #[test]
        fn every_node_is_placed_inside_its_container(graph in repo_strategy()) {
            let config = AtlasConfig::default();
            let layout = run(&graph, &config).expect("valid membership");

            prop_assert_eq!(layout.placements().len(), graph.node_count());
            for (member, container) in graph.membership() {
                let outer = layout.placement(&container).expect("container placed").bounds();
                let inner = layout.placement(&member).expect("member placed").bounds();
                prop_assert!(encloses(outer, inner, config.rank.container_padding));
            }
            for edge in layout.edges() {
                prop_assert!(graph.contains(&edge.source) && graph.contains(&edge.target));
            }
        }
    }
}
