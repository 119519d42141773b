//! Layout strategies: pure functions from graph data to positioned shapes.
//!
//! Hierarchical, radial and packing layouts run to completion in one call.
//! The force layout is iterative and is driven through
//! [`force::SimulationHandle`].

pub mod curve;
pub mod force;
pub mod pack;
pub mod radial;
pub mod rank;

use std::collections::HashMap;
use std::fmt;

use eframe::egui::{Pos2, Rect, Vec2, vec2};
use thiserror::Error;

use crate::config::AtlasConfig;
use crate::graph::{EntryKind, GraphData, HierarchyEntry, NodeKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum LayoutMode {
    #[default]
    Hierarchical,
    Force,
    Radial,
    Pack,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 4] = [Self::Hierarchical, Self::Force, Self::Radial, Self::Pack];

    pub fn label(self) -> &'static str {
        match self {
            Self::Hierarchical => "Hierarchy",
            Self::Force => "Force",
            Self::Radial => "Radial tree",
            Self::Pack => "Circle pack",
        }
    }

    /// Radial and packing views are derived from the containment tree.
    pub fn uses_hierarchy(self) -> bool {
        matches!(self, Self::Radial | Self::Pack)
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("node {0} is listed as its own container")]
    SelfContainment(String),
    #[error("containment cycle through {0}")]
    ContainmentCycle(String),
    #[error("{member} is assigned to {container}, which is not a container")]
    NotAContainer { member: String, container: String },
    #[error("spacing parameters must be finite and non-negative")]
    InvalidSpacing,
    #[error("layout produced non-finite geometry for {0}")]
    NonFinite(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Rect { size: Vec2 },
    Circle { radius: f32 },
}

impl Shape {
    pub fn bounds(self, center: Pos2) -> Rect {
        match self {
            Self::Rect { size } => Rect::from_center_size(center, size),
            Self::Circle { radius } => Rect::from_center_size(center, Vec2::splat(radius * 2.0)),
        }
    }

    pub fn contains(self, center: Pos2, point: Pos2) -> bool {
        match self {
            Self::Rect { size } => Rect::from_center_size(center, size).contains(point),
            Self::Circle { radius } => center.distance_sq(point) <= radius * radius,
        }
    }

    /// Point on the shape's right edge at the center height.
    pub fn right_anchor(self, center: Pos2) -> Pos2 {
        match self {
            Self::Rect { size } => center + vec2(size.x * 0.5, 0.0),
            Self::Circle { radius } => center + vec2(radius, 0.0),
        }
    }

    pub fn left_anchor(self, center: Pos2) -> Pos2 {
        match self {
            Self::Rect { size } => center - vec2(size.x * 0.5, 0.0),
            Self::Circle { radius } => center - vec2(radius, 0.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlacementRole {
    /// A graph node drawn as a single shape.
    Node,
    /// A graph container drawn around its members.
    Container,
    /// A hierarchy folder without a backing graph node.
    Folder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelAlign {
    Center,
    /// Text starts at the anchor.
    Start,
    /// Text ends at the anchor.
    End,
    /// Outside the shape, above its top-left corner.
    AboveLeft,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelPlacement {
    pub anchor: Pos2,
    /// Rotation in radians, already flipped to keep text upright.
    pub angle: f32,
    pub align: LabelAlign,
    pub visible: bool,
}

impl LabelPlacement {
    pub fn centered(anchor: Pos2) -> Self {
        Self {
            anchor,
            angle: 0.0,
            align: LabelAlign::Center,
            visible: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    /// Element identity; the node id for graph-backed placements.
    pub key: String,
    pub node_id: Option<String>,
    pub label: String,
    pub role: PlacementRole,
    pub kind: Option<NodeKind>,
    pub center: Pos2,
    pub shape: Shape,
    pub label_placement: LabelPlacement,
    pub depth: usize,
}

impl Placement {
    pub fn bounds(&self) -> Rect {
        self.shape.bounds(self.center)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeOrigin {
    /// Index into the laid-out graph's edge list.
    Graph(usize),
    /// Parent → child link of the containment tree.
    Tree,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoutedEdge {
    pub key: String,
    pub source: String,
    pub target: String,
    pub origin: EdgeOrigin,
    /// Control points; the scene turns them into a sampled curve.
    pub points: Vec<Pos2>,
}

/// Output of one layout pass, keyed by placement key.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    placements: Vec<Placement>,
    edges: Vec<RoutedEdge>,
    index: HashMap<String, usize>,
    bounds: Rect,
}

impl Layout {
    pub fn new(placements: Vec<Placement>, edges: Vec<RoutedEdge>) -> Self {
        let index = placements
            .iter()
            .enumerate()
            .map(|(position, placement)| (placement.key.clone(), position))
            .collect();
        let bounds = placements
            .iter()
            .map(Placement::bounds)
            .reduce(|acc, rect| acc.union(rect))
            .unwrap_or(Rect::NOTHING);
        Self {
            placements,
            edges,
            index,
            bounds,
        }
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn edges(&self) -> &[RoutedEdge] {
        &self.edges
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn placement(&self, key: &str) -> Option<&Placement> {
        self.index.get(key).map(|&position| &self.placements[position])
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Moves placements and re-anchors the edges touching them; used by the
    /// force simulation, whose edges are straight segments.
    pub(crate) fn update_centers(&mut self, centers: &HashMap<String, Pos2>) {
        for placement in &mut self.placements {
            if let Some(center) = centers.get(&placement.key) {
                let delta = *center - placement.center;
                placement.center = *center;
                placement.label_placement.anchor += delta;
            }
        }
        for edge in &mut self.edges {
            let (Some(&source), Some(&target)) =
                (self.index.get(&edge.source), self.index.get(&edge.target))
            else {
                continue;
            };
            edge.points = vec![self.placements[source].center, self.placements[target].center];
        }
        self.bounds = self
            .placements
            .iter()
            .map(Placement::bounds)
            .reduce(|acc, rect| acc.union(rect))
            .unwrap_or(Rect::NOTHING);
    }

    pub(crate) fn ensure_finite(&self) -> Result<(), LayoutError> {
        for placement in &self.placements {
            let rect = placement.bounds();
            if !(rect.min.x.is_finite()
                && rect.min.y.is_finite()
                && rect.max.x.is_finite()
                && rect.max.y.is_finite())
            {
                return Err(LayoutError::NonFinite(placement.key.clone()));
            }
        }
        Ok(())
    }
}

/// Placement key of a hierarchy entry: the node id, or a folder path.
pub fn entry_key(entry: &HierarchyEntry) -> String {
    match &entry.node_id {
        Some(id) => id.clone(),
        None => format!("folder:{}", entry.path),
    }
}

fn entry_role(entry: &HierarchyEntry) -> PlacementRole {
    match entry.kind {
        EntryKind::Root | EntryKind::Folder => PlacementRole::Folder,
        EntryKind::Node(_) if entry.is_leaf() => PlacementRole::Node,
        EntryKind::Node(_) => PlacementRole::Container,
    }
}

fn entry_kind(entry: &HierarchyEntry) -> Option<NodeKind> {
    match entry.kind {
        EntryKind::Node(kind) => Some(kind),
        EntryKind::Root | EntryKind::Folder => None,
    }
}

/// Inputs shared by the one-shot strategies.
#[derive(Clone, Copy)]
pub struct LayoutRequest<'a> {
    pub graph: &'a GraphData,
    /// Member → container overrides; derived from the node records when `None`.
    pub membership: Option<&'a HashMap<String, String>>,
    pub config: &'a AtlasConfig,
    pub viewport: Vec2,
}

/// Runs a one-shot strategy. The force mode returns its seed arrangement; the
/// caller animates it through a simulation handle.
pub fn compute(
    mode: LayoutMode,
    request: LayoutRequest<'_>,
    previous: &HashMap<String, Pos2>,
) -> Result<Layout, LayoutError> {
    let layout = match mode {
        LayoutMode::Hierarchical => rank::layout_ranked(request)?,
        LayoutMode::Force => force::seed_layout(
            request.graph,
            previous,
            &request.config.force,
            request.viewport,
        ),
        LayoutMode::Radial => {
            let tree = crate::graph::build_hierarchy(request.graph.nodes());
            radial::layout_radial(&tree, &request.config.radial, request.viewport)
        }
        LayoutMode::Pack => {
            let tree = crate::graph::build_hierarchy(request.graph.nodes());
            pack::layout_pack(&tree, &request.config.pack, request.viewport)
        }
    };
    layout.ensure_finite()?;
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures;

    fn request<'a>(graph: &'a GraphData, config: &'a AtlasConfig) -> LayoutRequest<'a> {
        LayoutRequest {
            graph,
            membership: None,
            config,
            viewport: vec2(800.0, 600.0),
        }
    }

    #[test]
    fn every_mode_places_every_node() {
        let graph = fixtures::small_repo();
        let config = AtlasConfig::default();
        for mode in LayoutMode::ALL {
            let layout = compute(mode, request(&graph, &config), &HashMap::new())
                .unwrap_or_else(|error| panic!("{mode}: {error}"));
            for node in graph.nodes() {
                assert!(layout.placement(&node.id).is_some(), "{mode} misses {}", node.id);
            }
        }
    }

    #[test]
    fn non_finite_radial_geometry_is_rejected() {
        let graph = fixtures::small_repo();
        let mut config = AtlasConfig::default();
        config.radial.radius = Some(f32::NAN);

        let error = compute(LayoutMode::Radial, request(&graph, &config), &HashMap::new())
            .expect_err("NaN radius");
        assert!(matches!(error, LayoutError::NonFinite(_)));
    }

    #[test]
    fn non_finite_force_seed_is_rejected() {
        let graph = fixtures::small_repo();
        let config = AtlasConfig::default();
        let previous = HashMap::from([("src/lib.rs:run".to_owned(), Pos2::new(f32::NAN, 0.0))]);

        let error = compute(LayoutMode::Force, request(&graph, &config), &previous)
            .expect_err("NaN seed");
        assert_eq!(error, LayoutError::NonFinite("src/lib.rs:run".to_owned()));
    }
}
