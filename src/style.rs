//! Data-driven visual attributes.
//!
//! Every function here is pure: the same element and [`StyleContext`] always
//! resolve to the same style, so toggling a highlight off and on again lands
//! exactly where it started.

use eframe::egui::Color32;

use crate::config::{DimLevels, StyleConfig};
use crate::expansion::{BadgeState, ExpansionState};
use crate::graph::{Edge, Node, NodeKind};
use crate::highlight::{FocusSet, HighlightState, HoverEmphasis};

pub const PATH_COLOR: Color32 = Color32::from_rgb(246, 206, 104);
pub const SELECTED_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
pub const VIRTUAL_EDGE_COLOR: Color32 = Color32::from_rgb(103, 196, 255);
pub const DEFAULT_EDGE_COLOR: Color32 = Color32::from_rgb(96, 104, 118);
pub const HYDRATION_COLOR: Color32 = Color32::from_rgb(155, 89, 182);
pub const NODE_STROKE: Color32 = Color32::from_rgba_premultiplied(14, 14, 14, 190);
pub const CONTAINER_FILL: Color32 = Color32::from_rgba_premultiplied(38, 46, 58, 180);
pub const CONTAINER_STROKE: Color32 = Color32::from_rgb(84, 98, 116);
pub const FOLDER_FILL: Color32 = Color32::from_rgba_premultiplied(30, 36, 46, 150);
pub const TREE_LINK_COLOR: Color32 = Color32::from_rgb(70, 78, 90);

pub fn kind_color(kind: NodeKind) -> Color32 {
    match kind {
        NodeKind::File => Color32::from_rgb(88, 166, 255),
        NodeKind::Package => Color32::from_rgb(125, 133, 151),
        NodeKind::Function => Color32::from_rgb(98, 200, 140),
        NodeKind::Struct => Color32::from_rgb(240, 160, 80),
        NodeKind::Interface => Color32::from_rgb(200, 120, 230),
        NodeKind::Field => Color32::from_rgb(150, 170, 190),
        NodeKind::Cluster => Color32::from_rgb(110, 130, 160),
    }
}

pub fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (f32::from(a) * (1.0 - amount) + f32::from(b) * amount) as u8;
    Color32::from_rgba_unmultiplied(
        mix(base.r(), overlay.r()),
        mix(base.g(), overlay.g()),
        mix(base.b(), overlay.b()),
        mix(base.a(), overlay.a()),
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dash {
    Solid,
    Dashed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    None,
    Arrow,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeStyle {
    pub fill: Color32,
    pub stroke: Color32,
    pub stroke_width: f32,
    pub opacity: f32,
    pub dash: Dash,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeStyle {
    pub color: Color32,
    pub width: f32,
    pub opacity: f32,
    pub dash: Dash,
    pub marker: Marker,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BadgeStyle {
    pub state: BadgeState,
    pub glyph: &'static str,
    pub opacity: f32,
}

/// Everything besides the element itself that affects its style.
#[derive(Clone, Copy)]
pub struct StyleContext<'a> {
    pub selected: Option<&'a str>,
    pub highlight: &'a HighlightState,
    pub focus: &'a FocusSet,
    pub hover: &'a HoverEmphasis,
    pub expansion: &'a ExpansionState,
    /// Whether the host handles expansion toggles; badges appear only then.
    pub toggle_available: bool,
    pub dims: &'a DimLevels,
    pub config: &'a StyleConfig,
}

impl StyleContext<'_> {
    /// Opacity of a node: the lowest level among the de-emphasis triggers that
    /// currently exclude it.
    pub fn node_opacity(&self, id: &str) -> f32 {
        let mut opacity = 1.0_f32;
        if self.focus.is_active() && !self.focus.contains(id) {
            opacity = opacity.min(self.dims.focus);
        }
        if self.highlight.is_active() && !self.highlight.contains_node(id) {
            opacity = opacity.min(self.dims.path_exclusion);
        }
        if self.hover.is_active() && !self.hover.emphasizes(id) {
            opacity = opacity.min(self.dims.hover);
        }
        opacity
    }

    fn edge_dim(&self, edge: &Edge, on_path: bool) -> f32 {
        let mut opacity = 1.0_f32;
        if self.focus.is_active() && !(self.focus.contains(&edge.source) && self.focus.contains(&edge.target)) {
            opacity = opacity.min(self.dims.focus);
        }
        if self.highlight.is_active() && !on_path {
            opacity = opacity.min(self.dims.path_exclusion);
        }
        if self.hover.is_active() && !self.hover.emphasizes_edge(edge) {
            opacity = opacity.min(self.dims.hover);
        }
        opacity
    }

    fn weight_opacity(&self, weight: Option<f32>) -> f32 {
        match weight {
            Some(weight) => {
                let floor = self.config.weight_opacity_floor;
                let ceiling = self.config.weight_opacity_ceiling;
                floor + weight.clamp(0.0, 1.0) * (ceiling - floor)
            }
            None => 1.0,
        }
    }
}

/// Style of a node drawn as a single shape.
pub fn node_style(node: &Node, context: &StyleContext<'_>) -> NodeStyle {
    let accent = kind_color(node.kind);
    let on_path = context.highlight.contains_node(&node.id);

    let (fill, mut stroke, mut stroke_width, dash) = if on_path {
        (blend_color(accent, PATH_COLOR, 0.72), PATH_COLOR, 1.8, Dash::Solid)
    } else if node.needs_hydration() {
        (HYDRATION_COLOR, HYDRATION_COLOR, 1.4, Dash::Dashed)
    } else {
        (accent, NODE_STROKE, 1.0, Dash::Solid)
    };

    if context.selected == Some(node.id.as_str()) {
        stroke = SELECTED_COLOR;
        stroke_width += 1.2;
    }

    NodeStyle {
        fill,
        stroke,
        stroke_width,
        opacity: context.node_opacity(&node.id),
        dash,
    }
}

/// Style of a container box drawn around its members.
pub fn container_style(node: &Node, context: &StyleContext<'_>) -> NodeStyle {
    let selected = context.selected == Some(node.id.as_str());
    let stroke = if context.highlight.contains_node(&node.id) {
        PATH_COLOR
    } else if selected {
        SELECTED_COLOR
    } else {
        blend_color(CONTAINER_STROKE, kind_color(node.kind), 0.35)
    };

    NodeStyle {
        fill: CONTAINER_FILL,
        stroke,
        stroke_width: if selected { 2.2 } else { 1.0 },
        opacity: if context.focus.is_active() {
            context.config.container_focus_opacity
        } else {
            1.0
        },
        dash: Dash::Solid,
    }
}

/// Style of a hierarchy folder without a backing node.
pub fn folder_style(depth: usize, context: &StyleContext<'_>) -> NodeStyle {
    let shade = (depth.min(6) as f32) / 6.0;
    NodeStyle {
        fill: blend_color(FOLDER_FILL, CONTAINER_STROKE, shade * 0.4),
        stroke: CONTAINER_STROKE,
        stroke_width: 1.0,
        opacity: if context.focus.is_active() {
            context.config.container_focus_opacity
        } else {
            1.0
        },
        dash: Dash::Solid,
    }
}

pub fn edge_style(edge: &Edge, context: &StyleContext<'_>) -> EdgeStyle {
    let on_path = context.highlight.contains_edge(&edge.source, &edge.target);
    let dim = context.edge_dim(edge, on_path);

    if on_path {
        return EdgeStyle {
            color: PATH_COLOR,
            width: 3.0,
            opacity: dim,
            dash: Dash::Solid,
            marker: Marker::Arrow,
        };
    }

    let weighted = context.weight_opacity(edge.weight);
    let (color, width, dash) = if edge.is_virtual() {
        (VIRTUAL_EDGE_COLOR, 1.2, Dash::Dashed)
    } else {
        (DEFAULT_EDGE_COLOR, 1.0, Dash::Solid)
    };
    EdgeStyle {
        color,
        width,
        opacity: weighted.min(dim),
        dash,
        marker: Marker::Arrow,
    }
}

/// Parent → child links of the radial tree.
pub fn tree_link_style(target: Option<&str>, context: &StyleContext<'_>) -> EdgeStyle {
    let opacity = match target {
        Some(id) => context.node_opacity(id),
        None if context.focus.is_active() => context.config.container_focus_opacity,
        None => 1.0,
    };
    EdgeStyle {
        color: TREE_LINK_COLOR,
        width: 1.0,
        opacity,
        dash: Dash::Solid,
        marker: Marker::None,
    }
}

pub fn badge_style(node: &Node, context: &StyleContext<'_>) -> Option<BadgeStyle> {
    let state = context
        .expansion
        .badge_state(node, context.toggle_available)?;
    Some(BadgeStyle {
        state,
        glyph: state.glyph(),
        opacity: if state == BadgeState::Expanding {
            context.config.expanding_badge_opacity
        } else {
            1.0
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AtlasConfig;
    use crate::graph::fixtures;
    use crate::highlight::PathTrace;

    struct Fixture {
        config: AtlasConfig,
        highlight: HighlightState,
        focus: FocusSet,
        hover: HoverEmphasis,
        expansion: ExpansionState,
    }

    impl Fixture {
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

    #[test]
    fn focus_dims_everything_outside_the_set() {
        let graph = fixtures::file_with_symbol("calls");
        let mut fixture = Fixture::new();
        fixture.focus = FocusSet::new(["a:fn1"]);
        let context = fixture.context();

        let symbol = graph.node("a:fn1").expect("symbol");
        let file = graph.node("a").expect("file");
        assert_eq!(node_style(symbol, &context).opacity, 1.0);
        assert_eq!(node_style(file, &context).opacity, 0.2);
        assert_eq!(container_style(file, &context).opacity, 0.5);
    }

    #[test]
    fn triggers_combine_by_minimum() {
        let graph = fixtures::small_repo();
        let mut fixture = Fixture::new();
        fixture.focus = FocusSet::new(["src/lib.rs:run"]);
        fixture.highlight = HighlightState::from_trace(Some(&PathTrace::new(vec![
            "src/main.rs:main".into(),
            "src/lib.rs:run".into(),
        ])));
        let context = fixture.context();

        // Outside focus and outside the path.
        let args = graph.node("src/main.rs:Args").expect("node");
        assert_eq!(node_style(args, &context).opacity, 0.1);
        // On the path, outside focus.
        let main = graph.node("src/main.rs:main").expect("node");
        assert_eq!(node_style(main, &context).opacity, 0.2);
        // In both.
        let run = graph.node("src/lib.rs:run").expect("node");
        assert_eq!(node_style(run, &context).opacity, 1.0);
    }

    #[test]
    fn highlight_toggle_is_idempotent() {
        let graph = fixtures::small_repo();
        let trace = PathTrace::new(vec!["src/main.rs:main".into(), "src/lib.rs:run".into()]);
        let mut fixture = Fixture::new();

        let styles = |fixture: &Fixture| {
            let context = fixture.context();
            let nodes: Vec<NodeStyle> = graph.nodes().iter().map(|node| node_style(node, &context)).collect();
            let edges: Vec<EdgeStyle> = graph.edges().iter().map(|edge| edge_style(edge, &context)).collect();
            (nodes, edges)
        };

        fixture.highlight = HighlightState::from_trace(Some(&trace));
        let first = styles(&fixture);
        fixture.highlight = HighlightState::none();
        let cleared = styles(&fixture);
        fixture.highlight = HighlightState::from_trace(Some(&trace));
        let again = styles(&fixture);

        assert_eq!(first, again);
        assert_ne!(first, cleared);
    }

    #[test]
    fn path_edges_win_over_virtual_and_weight() {
        let graph = fixtures::small_repo();
        let implements = graph
            .edges()
            .iter()
            .find(|edge| edge.relation == "v:implements")
            .expect("virtual edge");

        let fixture = Fixture::new();
        let plain = edge_style(implements, &fixture.context());
        assert_eq!(plain.color, VIRTUAL_EDGE_COLOR);
        assert_eq!(plain.dash, Dash::Dashed);
        assert!((plain.opacity - 0.6).abs() < 1e-6);

        let mut fixture = Fixture::new();
        fixture.highlight = HighlightState::from_trace(Some(&PathTrace::new(vec![
            "src/lib.rs:Runner".into(),
            "src/lib.rs:run".into(),
        ])));
        let traced = edge_style(implements, &fixture.context());
        assert_eq!(traced.color, PATH_COLOR);
        assert_eq!(traced.opacity, 1.0);
    }

    #[test]
    fn unhydrated_symbols_are_purple_and_dashed() {
        let node = fixtures::symbol("a:fn1", NodeKind::Function, "a").unhydrated();
        let fixture = Fixture::new();
        let style = node_style(&node, &fixture.context());
        assert_eq!(style.fill, HYDRATION_COLOR);
        assert_eq!(style.dash, Dash::Dashed);

        let file = fixtures::file("a").unhydrated();
        assert_eq!(node_style(&file, &fixture.context()).fill, kind_color(NodeKind::File));
    }

    #[test]
    fn selection_changes_only_the_stroke() {
        let graph = fixtures::small_repo();
        let node = graph.node("src/lib.rs:run").expect("node");
        let fixture = Fixture::new();
        let plain = node_style(node, &fixture.context());
        let selected = node_style(
            node,
            &StyleContext {
                selected: Some("src/lib.rs:run"),
                ..fixture.context()
            },
        );

        assert_eq!(plain.fill, selected.fill);
        assert_eq!(plain.opacity, selected.opacity);
        assert_eq!(selected.stroke, SELECTED_COLOR);
        assert!(selected.stroke_width > plain.stroke_width);
    }

    #[test]
    fn badges_only_on_containers_with_a_toggle() {
        let graph = fixtures::file_with_symbol("calls");
        let mut fixture = Fixture::new();
        fixture
            .expansion
            .begin_toggle(&graph, "a")
            .expect("container");
        let context = fixture.context();

        let badge = badge_style(graph.node("a").expect("file"), &context).expect("badge");
        assert_eq!(badge.glyph, "…");
        assert_eq!(badge.opacity, 0.5);
        assert!(badge_style(graph.node("a:fn1").expect("symbol"), &context).is_none());

        let without_toggle = StyleContext {
            toggle_available: false,
            ..context
        };
        assert!(badge_style(graph.node("a").expect("file"), &without_toggle).is_none());
    }

    #[test]
    fn hover_keeps_neighbours_visible() {
        let graph = fixtures::small_repo();
        let mut fixture = Fixture::new();
        fixture.hover = HoverEmphasis::for_node(&graph, "src/main.rs:main");
        let context = fixture.context();

        assert_eq!(context.node_opacity("src/lib.rs:run"), 1.0);
        assert_eq!(context.node_opacity("src/lib.rs:Runner"), 0.05);
    }
}
