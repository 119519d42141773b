use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Instant;

use eframe::egui::{Pos2, Rect, Vec2};
use tracing::{debug, warn};

use super::transition::{Interpolate, Tween, Visual};
use super::{Scene, SceneEdge, SceneNode, compose};
use crate::config::{
    AtlasConfig, ForceConfig, PackConfig, RadialConfig, RankSpacing, TransitionConfig,
};
use crate::graph::GraphData;
use crate::layout::curve::resample;
use crate::layout::force::{ForceSimulation, SimulationHandle, SimulationStatus};
use crate::layout::{self, Layout, LayoutMode, LayoutRequest, PlacementRole, Shape};
use crate::style::StyleContext;

/// Everything one render call depends on.
#[derive(Clone, Copy)]
pub struct RenderInputs<'a> {
    pub graph: &'a GraphData,
    pub mode: LayoutMode,
    pub membership: Option<&'a HashMap<String, String>>,
    pub config: &'a AtlasConfig,
    pub viewport: Vec2,
    pub style: StyleContext<'a>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// A layout strategy ran.
    Relayout,
    /// The cached layout was reused; only styles were resolved again.
    Restyled,
    /// Layout failed; the previous scene stays on screen.
    Aborted,
    Empty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderReport {
    pub outcome: RenderOutcome,
    pub entered: usize,
    pub updated: usize,
    pub exited: usize,
    pub unchanged: usize,
}

impl RenderReport {
    fn new(outcome: RenderOutcome) -> Self {
        Self {
            outcome,
            entered: 0,
            updated: 0,
            exited: 0,
            unchanged: 0,
        }
    }
}

/// Inputs that decide whether the cached layout is still valid. Styling
/// state is not part of the key.
#[derive(Clone, Debug, PartialEq)]
struct LayoutKey {
    mode: LayoutMode,
    fingerprint: u64,
    viewport: Option<(i32, i32)>,
    rank: RankSpacing,
    force: ForceConfig,
    radial: RadialConfig,
    pack: PackConfig,
}

impl LayoutKey {
    fn new(inputs: &RenderInputs<'_>, graph: &GraphData) -> Self {
        let viewport = (inputs.mode != LayoutMode::Hierarchical)
            .then(|| (inputs.viewport.x.round() as i32, inputs.viewport.y.round() as i32));
        Self {
            mode: inputs.mode,
            fingerprint: fingerprint(graph, inputs.membership),
            viewport,
            rank: inputs.config.rank.clone(),
            force: inputs.config.force.clone(),
            radial: inputs.config.radial.clone(),
            pack: inputs.config.pack.clone(),
        }
    }
}

fn fingerprint(graph: &GraphData, membership: Option<&HashMap<String, String>>) -> u64 {
    let mut hasher = DefaultHasher::new();
    for node in graph.nodes() {
        node.id.hash(&mut hasher);
        node.name.hash(&mut hasher);
        node.kind.hash(&mut hasher);
        node.container.hash(&mut hasher);
        node.parent_file.hash(&mut hasher);
        node.path.hash(&mut hasher);
        node.size.hash(&mut hasher);
    }
    for edge in graph.edges() {
        edge.source.hash(&mut hasher);
        edge.target.hash(&mut hasher);
        edge.relation.hash(&mut hasher);
    }
    if let Some(membership) = membership {
        let mut entries: Vec<_> = membership.iter().collect();
        entries.sort_unstable();
        entries.hash(&mut hasher);
    }
    hasher.finish()
}

trait Element: Interpolate + PartialEq {
    fn fade(&mut self, presence: f32);
}

impl Element for SceneNode {
    fn fade(&mut self, presence: f32) {
        self.style.opacity *= presence;
        if let Some(badge) = self.badge.as_mut() {
            badge.opacity *= presence;
        }
    }
}

impl Element for SceneEdge {
    fn fade(&mut self, presence: f32) {
        self.style.opacity *= presence;
    }
}

struct Retained<T> {
    tween: Tween<Visual<T>>,
    exiting: bool,
    order: usize,
}

/// Retained elements of one kind, keyed by element id.
struct Retention<T> {
    elements: HashMap<String, Retained<T>>,
}

impl<T> Default for Retention<T> {
    fn default() -> Self {
        Self {
            elements: HashMap::new(),
        }
    }
}

impl<T: Element> Retention<T> {
    /// Brings `key` toward `target`. `enter` supplies the starting state of a
    /// new element.
    fn upsert(
        &mut self,
        key: String,
        target: T,
        order: usize,
        clock: (f64, f64),
        report: &mut RenderReport,
        enter: impl FnOnce(&T) -> T,
    ) {
        let (now, duration) = clock;
        let target = Visual {
            element: target,
            presence: 1.0,
        };

        let Some(retained) = self.elements.get_mut(&key) else {
            let from = Visual {
                element: enter(&target.element),
                presence: 0.0,
            };
            self.elements.insert(
                key,
                Retained {
                    tween: Tween::new(from, target, now, duration),
                    exiting: false,
                    order,
                },
            );
            report.entered += 1;
            return;
        };

        retained.order = order;
        if !retained.exiting && retained.tween.target() == &target {
            report.unchanged += 1;
            return;
        }
        retained.exiting = false;
        retained.tween.retarget(target, now, duration);
        report.updated += 1;
    }

    fn exit_missing(&mut self, seen: &HashSet<String>, clock: (f64, f64), report: &mut RenderReport) {
        let (now, duration) = clock;
        for (key, retained) in &mut self.elements {
            if retained.exiting || seen.contains(key) {
                continue;
            }
            let mut target = retained.tween.target().clone();
            target.presence = 0.0;
            retained.tween.retarget(target, now, duration);
            retained.exiting = true;
            report.exited += 1;
        }
    }

    fn prune(&mut self, now: f64) {
        self.elements
            .retain(|_, retained| !(retained.exiting && retained.tween.is_done(now)));
    }

    fn animating(&self, now: f64) -> bool {
        self.elements.values().any(|retained| !retained.tween.is_done(now))
    }

    /// Interpolated elements with their draw order.
    fn frame(&self, now: f64) -> Vec<(usize, T)> {
        self.elements
            .values()
            .map(|retained| {
                let visual = retained.tween.value(now);
                let mut element = visual.element;
                element.fade(visual.presence);
                (retained.order, element)
            })
            .collect()
    }
}

/// Retained, animated view of successive scenes.
///
/// Owns the cached layout and at most one force simulation. Nothing here
/// runs on its own: the host calls [`SceneRenderer::render`] when inputs
/// change and [`SceneRenderer::advance`] once per frame.
pub struct SceneRenderer {
    cache: Option<(LayoutKey, Layout)>,
    simulation: Option<SimulationHandle>,
    shapes: Retention<SceneNode>,
    edges: Retention<SceneEdge>,
    placeholder: Option<&'static str>,
    bounds: Rect,
    transition: TransitionConfig,
    ticks_per_frame: usize,
    layout_runs: usize,
}

impl Default for SceneRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self {
            cache: None,
            simulation: None,
            shapes: Retention::default(),
            edges: Retention::default(),
            placeholder: None,
            bounds: Rect::NOTHING,
            transition: TransitionConfig::default(),
            ticks_per_frame: ForceConfig::default().ticks_per_frame,
            layout_runs: 0,
        }
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.cache.as_ref().map(|(_, layout)| layout)
    }

    pub fn layout_runs(&self) -> usize {
        self.layout_runs
    }

    pub fn is_simulating(&self) -> bool {
        self.simulation
            .as_ref()
            .is_some_and(SimulationHandle::is_running)
    }

    /// Forgets the cached layout so the next render lays out again, starting
    /// from the current positions.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn render(&mut self, inputs: RenderInputs<'_>, now: f64) -> RenderReport {
        self.transition = inputs.config.transition.clone();
        self.ticks_per_frame = inputs.config.force.ticks_per_frame.max(1);

        let graph = inputs.style.expansion.visible_graph(inputs.graph);
        if graph.is_empty() {
            self.stop_simulation();
            self.cache = None;
            let mut report = RenderReport::new(RenderOutcome::Empty);
            self.reconcile(Scene::placeholder(), now, &mut report);
            return report;
        }

        let key = LayoutKey::new(&inputs, &graph);
        let reuse = self
            .cache
            .as_ref()
            .is_some_and(|(cached, _)| *cached == key);
        let outcome = if reuse {
            RenderOutcome::Restyled
        } else {
            let previous = self.current_centers(now);
            self.stop_simulation();
            let Some(layout) = self.relayout(&inputs, &graph, &previous) else {
                return RenderReport::new(RenderOutcome::Aborted);
            };
            self.cache = Some((key, layout));
            RenderOutcome::Relayout
        };

        let Some((_, layout)) = &self.cache else {
            return RenderReport::new(RenderOutcome::Aborted);
        };
        let scene = compose(layout, &graph, &inputs.style, self.transition.curve_samples);
        let mut report = RenderReport::new(outcome);
        self.reconcile(scene, now, &mut report);
        debug!(
            outcome = ?report.outcome,
            entered = report.entered,
            updated = report.updated,
            exited = report.exited,
            unchanged = report.unchanged,
            "scene reconciled"
        );
        report
    }

    fn relayout(
        &mut self,
        inputs: &RenderInputs<'_>,
        graph: &GraphData,
        previous: &HashMap<String, Pos2>,
    ) -> Option<Layout> {
        let started = Instant::now();
        let request = LayoutRequest {
            graph,
            membership: inputs.membership,
            config: inputs.config,
            viewport: inputs.viewport,
        };
        let layout = match layout::compute(inputs.mode, request, previous) {
            Ok(layout) => layout,
            Err(error) => {
                warn!(%error, mode = %inputs.mode, "layout failed, keeping the previous scene");
                return None;
            }
        };

        self.layout_runs += 1;
        if inputs.mode == LayoutMode::Force {
            self.simulation = Some(ForceSimulation::start(
                graph,
                &layout,
                &inputs.config.force,
                inputs.viewport,
            ));
        }
        debug!(
            mode = %inputs.mode,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "layout computed"
        );
        Some(layout)
    }

    fn reconcile(&mut self, scene: Scene, now: f64, report: &mut RenderReport) {
        let clock = (now, self.transition.duration_secs);
        let origins = self.current_centers(now);
        self.placeholder = scene.placeholder;
        if !scene.is_empty() {
            self.bounds = scene.bounds;
        }

        let mut seen = HashSet::new();
        for (order, shape) in scene.containers.into_iter().chain(scene.nodes).enumerate() {
            seen.insert(shape.key.clone());
            let origin = shape
                .grows_from
                .as_ref()
                .and_then(|container| origins.get(container))
                .copied();
            self.shapes
                .upsert(shape.key.clone(), shape, order, clock, report, |target| {
                    grow_from(target, origin)
                });
        }
        self.shapes.exit_missing(&seen, clock, report);

        seen.clear();
        for (order, edge) in scene.edges.into_iter().enumerate() {
            seen.insert(edge.key.clone());
            self.edges
                .upsert(edge.key.clone(), edge, order, clock, report, Clone::clone);
        }
        self.edges.exit_missing(&seen, clock, report);
    }

    /// Pumps the simulation and drops finished exits; returns whether another
    /// frame is needed.
    pub fn advance(&mut self, now: f64) -> bool {
        self.pump_simulation();
        self.shapes.prune(now);
        self.edges.prune(now);
        self.is_simulating() || self.shapes.animating(now) || self.edges.animating(now)
    }

    fn pump_simulation(&mut self) {
        let Some(handle) = self.simulation.as_mut() else {
            return;
        };
        let mut latest = None;
        let status = handle.step(self.ticks_per_frame, &mut |tick| latest = Some(tick.centers()));
        if let Some(centers) = latest {
            self.apply_positions(&centers);
        }
        if status == SimulationStatus::Stopped {
            self.simulation = None;
        }
    }

    /// Moves nodes and straight edges to simulated positions without
    /// restarting their style transitions.
    fn apply_positions(&mut self, centers: &HashMap<String, Pos2>) {
        for (key, center) in centers {
            if let Some(retained) = self.shapes.elements.get_mut(key) {
                retained.tween.adjust(|visual| {
                    let delta = *center - visual.element.center;
                    visual.element.center = *center;
                    visual.element.label.placement.anchor += delta;
                });
            }
        }

        let Some((_, layout)) = self.cache.as_mut() else {
            return;
        };
        layout.update_centers(centers);
        self.bounds = layout.bounds();
        let samples = self.transition.curve_samples;
        for routed in layout.edges() {
            if let Some(retained) = self.edges.elements.get_mut(&routed.key) {
                let points = resample(&routed.points, samples);
                retained
                    .tween
                    .adjust(|visual| visual.element.points.clone_from(&points));
            }
        }
    }

    /// Interpolated draw list at `now`.
    pub fn frame(&self, now: f64) -> Scene {
        let mut containers = Vec::new();
        let mut nodes = Vec::new();
        for (order, shape) in self.shapes.frame(now) {
            if shape.role == PlacementRole::Node {
                nodes.push((order, shape));
            } else {
                containers.push((order, shape));
            }
        }
        containers.sort_by(|(a_order, a), (b_order, b)| {
            a.depth.cmp(&b.depth).then(a_order.cmp(b_order))
        });
        nodes.sort_by_key(|(order, _)| *order);
        let mut edges = self.edges.frame(now);
        edges.sort_by_key(|(order, _)| *order);

        Scene {
            containers: containers.into_iter().map(|(_, shape)| shape).collect(),
            edges: edges.into_iter().map(|(_, edge)| edge).collect(),
            nodes: nodes.into_iter().map(|(_, shape)| shape).collect(),
            bounds: self.bounds,
            placeholder: self.placeholder,
        }
    }

    /// Stops the simulation; safe to call repeatedly.
    pub fn shutdown(&mut self) {
        self.stop_simulation();
    }

    fn stop_simulation(&mut self) {
        if let Some(mut handle) = self.simulation.take() {
            handle.stop();
        }
    }

    fn current_centers(&self, now: f64) -> HashMap<String, Pos2> {
        self.shapes
            .elements
            .iter()
            .filter(|(_, retained)| !retained.exiting)
            .map(|(key, retained)| (key.clone(), retained.tween.value(now).element.center))
            .collect()
    }
}

/// Entry state of a new shape: collapsed onto its container's current center
/// when it is an expanded child, otherwise in place.
fn grow_from(target: &SceneNode, origin: Option<Pos2>) -> SceneNode {
    let mut start = target.clone();
    if let Some(origin) = origin {
        start.center = origin;
        start.label.placement.anchor = origin;
        start.shape = match target.shape {
            Shape::Rect { .. } => Shape::Rect { size: Vec2::ZERO },
            Shape::Circle { .. } => Shape::Circle { radius: 0.0 },
        };
    }
    start
}
