use eframe::egui::Pos2;

use super::{BADGE_RADIUS, Scene, SceneNode};
use crate::layout::PlacementRole;

/// What sits under a point, topmost first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickTarget {
    /// Expansion badge of a container.
    Badge(String),
    Node(String),
    /// Hierarchy folder, identified by its path.
    Folder(String),
    /// Background of a container box, identified by its node id.
    Container(String),
}

/// Callbacks the host wires to scene interactions.
pub trait SceneEvents {
    fn select_node(&mut self, id: &str, navigate: bool);
    fn hover_node(&mut self, id: Option<&str>);
    fn toggle_expansion(&mut self, id: &str);
    /// Drill into a file or directory.
    fn select_file(&mut self, path: &str);
}

pub fn pick(scene: &Scene, point: Pos2) -> Option<PickTarget> {
    let badge = scene.shapes().find(|shape| {
        shape.badge.is_some() && shape.badge_center().distance(point) <= BADGE_RADIUS
    });
    if let Some(shape) = badge
        && let Some(id) = &shape.node_id
    {
        return Some(PickTarget::Badge(id.clone()));
    }

    if let Some(shape) = scene.nodes.iter().rev().find(|shape| shape.contains(point))
        && let Some(id) = &shape.node_id
    {
        return Some(PickTarget::Node(id.clone()));
    }

    // Containers are drawn outermost first, so the last hit is the innermost.
    scene
        .containers
        .iter()
        .rev()
        .filter(|shape| shape.depth > 0 || shape.node_id.is_some())
        .find(|shape| shape.contains(point))
        .and_then(container_target)
}

fn container_target(shape: &SceneNode) -> Option<PickTarget> {
    match (&shape.node_id, shape.role) {
        (Some(id), _) => Some(PickTarget::Container(id.clone())),
        (None, PlacementRole::Folder) => shape
            .key
            .strip_prefix("folder:")
            .map(|path| PickTarget::Folder(path.to_owned())),
        (None, _) => None,
    }
}

/// Routes a click to `events`. `navigate` is forwarded with node selections.
pub fn dispatch_click(
    scene: &Scene,
    point: Pos2,
    navigate: bool,
    events: &mut dyn SceneEvents,
) -> Option<PickTarget> {
    let target = pick(scene, point)?;
    match &target {
        PickTarget::Badge(id) => events.toggle_expansion(id),
        PickTarget::Node(id) => events.select_node(id, navigate),
        PickTarget::Folder(path) | PickTarget::Container(path) => events.select_file(path),
    }
    Some(target)
}

/// Reports the hovered node, or `None` when the point is over nothing
/// selectable.
pub fn dispatch_hover(scene: &Scene, point: Pos2, events: &mut dyn SceneEvents) -> Option<PickTarget> {
    let target = pick(scene, point);
    match &target {
        Some(PickTarget::Node(id) | PickTarget::Container(id)) => events.hover_node(Some(id)),
        _ => events.hover_node(None),
    }
    target
}
