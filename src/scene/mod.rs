//! Immutable scene description and the incremental renderer that animates it.
//!
//! [`compose`] turns a [`Layout`](crate::layout::Layout) plus styles into a
//! [`Scene`]; [`SceneRenderer`] reconciles successive scenes into a retained
//! element map and hands out interpolated frames.

mod compose;
mod pick;
mod renderer;
mod transition;

use eframe::egui::{Pos2, Rect, vec2};

use crate::graph::NodeKind;
use crate::layout::{LabelPlacement, PlacementRole, Shape};
use crate::style::{BadgeStyle, EdgeStyle, NodeStyle};

pub use compose::compose;
pub use pick::{PickTarget, SceneEvents, dispatch_click, dispatch_hover, pick};
pub use renderer::{RenderInputs, RenderOutcome, RenderReport, SceneRenderer};

pub const EMPTY_PLACEHOLDER: &str = "No graph data";
pub const BADGE_RADIUS: f32 = 7.0;

#[derive(Clone, Debug, PartialEq)]
pub struct SceneLabel {
    pub text: String,
    pub placement: LabelPlacement,
}

/// A drawn shape: a graph node, a container box or a hierarchy folder.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub key: String,
    pub node_id: Option<String>,
    pub role: PlacementRole,
    pub kind: Option<NodeKind>,
    pub depth: usize,
    pub center: Pos2,
    pub shape: Shape,
    pub label: SceneLabel,
    pub style: NodeStyle,
    pub badge: Option<BadgeStyle>,
    /// Container an expanded child grows out of when it first appears.
    pub grows_from: Option<String>,
}

impl SceneNode {
    pub fn bounds(&self) -> Rect {
        self.shape.bounds(self.center)
    }

    pub fn badge_center(&self) -> Pos2 {
        match self.shape {
            Shape::Rect { size } => self.center + vec2(size.x * 0.5 - BADGE_RADIUS - 3.0, -size.y * 0.5 + BADGE_RADIUS + 3.0),
            Shape::Circle { radius } => self.center + vec2(radius, -radius) * std::f32::consts::FRAC_1_SQRT_2,
        }
    }

    pub fn contains(&self, point: Pos2) -> bool {
        self.shape.contains(self.center, point)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneEdge {
    pub key: String,
    pub source: String,
    pub target: String,
    /// Sampled curve; every edge of a scene carries the same point count.
    pub points: Vec<Pos2>,
    pub style: EdgeStyle,
}

/// Everything needed to draw one frame, in draw order.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Container boxes and folders, outermost first.
    pub containers: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub nodes: Vec<SceneNode>,
    pub bounds: Rect,
    pub placeholder: Option<&'static str>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            containers: Vec::new(),
            edges: Vec::new(),
            nodes: Vec::new(),
            bounds: Rect::NOTHING,
            placeholder: None,
        }
    }
}

impl Scene {
    pub fn placeholder() -> Self {
        Self {
            placeholder: Some(EMPTY_PLACEHOLDER),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.nodes.is_empty()
    }

    pub fn shapes(&self) -> impl Iterator<Item = &SceneNode> {
        self.containers.iter().chain(&self.nodes)
    }

    pub fn shape(&self, key: &str) -> Option<&SceneNode> {
        self.shapes().find(|shape| shape.key == key)
    }
}
