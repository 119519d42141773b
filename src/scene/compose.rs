use eframe::egui::Pos2;

use super::{Scene, SceneEdge, SceneLabel, SceneNode};
use crate::graph::GraphData;
use crate::layout::curve::{resample, sample_basis};
use crate::layout::{EdgeOrigin, Layout, Placement, PlacementRole};
use crate::style::{
    StyleContext, badge_style, container_style, edge_style, folder_style, node_style,
    tree_link_style,
};

/// Pairs a layout with the graph it was computed from and resolves styles.
///
/// Edges whose endpoints have no placement, and tree links without control
/// points, are left out.
pub fn compose(layout: &Layout, graph: &GraphData, context: &StyleContext<'_>, samples: usize) -> Scene {
    if layout.is_empty() {
        return Scene::placeholder();
    }

    let mut containers = Vec::new();
    let mut nodes = Vec::new();
    for placement in layout.placements() {
        let shape = compose_shape(placement, graph, context);
        match placement.role {
            PlacementRole::Node => nodes.push(shape),
            PlacementRole::Container | PlacementRole::Folder => containers.push(shape),
        }
    }
    containers.sort_by_key(|shape| shape.depth);

    let edges = layout
        .edges()
        .iter()
        .filter(|edge| layout.placement(&edge.source).is_some() && layout.placement(&edge.target).is_some())
        .filter_map(|routed| {
            let style = match routed.origin {
                EdgeOrigin::Graph(index) => edge_style(graph.edges().get(index)?, context),
                EdgeOrigin::Tree => {
                    let target = layout
                        .placement(&routed.target)
                        .and_then(|placement| placement.node_id.as_deref());
                    tree_link_style(target, context)
                }
            };
            Some(SceneEdge {
                key: routed.key.clone(),
                source: routed.source.clone(),
                target: routed.target.clone(),
                points: curve(&routed.points, samples)?,
                style,
            })
        })
        .collect();

    Scene {
        containers,
        edges,
        nodes,
        bounds: layout.bounds(),
        placeholder: None,
    }
}

fn compose_shape(placement: &Placement, graph: &GraphData, context: &StyleContext<'_>) -> SceneNode {
    let node = placement.node_id.as_deref().and_then(|id| graph.node(id));
    let style = match (node, placement.role) {
        (Some(node), PlacementRole::Node) => node_style(node, context),
        (Some(node), PlacementRole::Container | PlacementRole::Folder) => container_style(node, context),
        (None, _) => folder_style(placement.depth, context),
    };

    SceneNode {
        key: placement.key.clone(),
        node_id: placement.node_id.clone(),
        role: placement.role,
        kind: placement.kind,
        depth: placement.depth,
        center: placement.center,
        shape: placement.shape,
        label: SceneLabel {
            text: placement.label.clone(),
            placement: placement.label_placement,
        },
        style,
        badge: node.and_then(|node| badge_style(node, context)),
        grows_from: node
            .filter(|node| node.expanded_child)
            .and_then(|node| node.container.clone().or_else(|| node.parent_file.clone())),
    }
}

/// Straight segments are resampled, routed polylines smoothed; both end up
/// with `samples` points so transitions interpolate point-wise.
fn curve(points: &[Pos2], samples: usize) -> Option<Vec<Pos2>> {
    match points.len() {
        0 => None,
        1 | 2 => Some(resample(points, samples)),
        _ => Some(sample_basis(points, samples)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use eframe::egui::vec2;
    use proptest::prelude::*;

    use super::*;
    use crate::config::AtlasConfig;
    use crate::expansion::ExpansionState;
    use crate::graph::{Edge, Node, NodeKind, fixtures, normalize_parts};
    use crate::highlight::{FocusSet, HighlightState, HoverEmphasis};
    use crate::layout::{LayoutMode, LayoutRequest, compute};

    struct Styles {
        config: AtlasConfig,
        highlight: HighlightState,
        focus: FocusSet,
        hover: HoverEmphasis,
        expansion: ExpansionState,
    }

    impl Styles {
        fn new() -> Self {
            Self {
                config: AtlasConfig::default(),
                highlight: HighlightState::none(),
                focus: FocusSet::default(),
                hover: HoverEmphasis::none(),
                expansion: ExpansionState::default(),
            }
        }

        fn context(&self) -> StyleContext<'_> {
            StyleContext {
                selected: None,
                highlight: &self.highlight,
                focus: &self.focus,
                hover: &self.hover,
                expansion: &self.expansion,
                toggle_available: true,
                dims: &self.config.dims,
                config: &self.config.style,
            }
        }
    }

    fn scene(mode: LayoutMode, graph: &GraphData) -> Scene {
        let styles = Styles::new();
        let layout = compute(
            mode,
            LayoutRequest {
                graph,
                membership: None,
                config: &styles.config,
                viewport: vec2(900.0, 700.0),
            },
            &HashMap::new(),
        )
        .expect("layout");
        compose(&layout, graph, &styles.context(), 16)
    }

    #[test]
    fn containers_and_nodes_are_split() {
        let graph = fixtures::small_repo();
        let scene = scene(LayoutMode::Hierarchical, &graph);

        let containers: Vec<&str> = scene.containers.iter().map(|shape| shape.key.as_str()).collect();
        assert!(containers.contains(&"src/main.rs"));
        assert!(containers.contains(&"src/lib.rs"));
        assert_eq!(scene.nodes.len(), 4);
        assert!(scene.edges.iter().all(|edge| edge.points.len() == 16));
        assert!(scene.placeholder.is_none());
    }

    #[test]
    fn badges_sit_on_containers_only() {
        let graph = fixtures::small_repo();
        let scene = scene(LayoutMode::Hierarchical, &graph);

        assert!(scene.containers.iter().all(|shape| shape.badge.is_some()));
        assert!(scene.nodes.iter().all(|shape| shape.badge.is_none()));
    }

    #[test]
    fn empty_layout_gives_the_placeholder() {
        let scene = scene(LayoutMode::Hierarchical, &GraphData::default());
        assert_eq!(scene.placeholder, Some(super::super::EMPTY_PLACEHOLDER));
        assert!(scene.is_empty());
    }

    #[test]
    fn pack_tree_links_are_not_drawn() {
        let graph = fixtures::small_repo();
        let scene = scene(LayoutMode::Pack, &graph);
        assert!(scene.edges.is_empty());
        assert!(scene.shape("folder:src").is_some());
    }

    #[test]
    fn expanded_children_remember_their_container() {
        let graph = normalize_parts(
            vec![
                fixtures::file("a"),
                fixtures::symbol("a:fn1", NodeKind::Function, "a").as_expanded_child(),
            ],
            Vec::new(),
        );
        let scene = scene(LayoutMode::Force, &graph);
        let child = scene.shape("a:fn1").expect("child drawn");
        assert_eq!(child.grows_from.as_deref(), Some("a"));
        assert!(scene.shape("a").expect("file drawn").grows_from.is_none());
    }

    fn arbitrary_graph() -> impl Strategy<Value = GraphData> {
        (2usize..10, proptest::collection::vec((0usize..12, 0usize..12), 0..20)).prop_map(|(count, pairs)| {
            let nodes = (0..count)
                .map(|index| Node::new(format!("n{index}"), format!("n{index}"), NodeKind::Function))
                .collect();
            let edges = pairs
                .into_iter()
                .map(|(from, to)| Edge::new(format!("n{from}"), format!("n{to}"), "calls"))
                .collect();
            normalize_parts(nodes, edges)
        })
    }

    proptest! {
        #[test]
        fn every_edge_endpoint_is_drawn(graph in arbitrary_graph()) {
            for mode in LayoutMode::ALL {
                let scene = scene(mode, &graph);
                for edge in &scene.edges {
                    prop_assert!(scene.shape(&edge.source).is_some());
                    prop_assert!(scene.shape(&edge.target).is_some());
                }
            }
        }
    }
}
