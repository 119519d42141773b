//! Iterative force-directed layout.
//!
//! The simulation never runs on its own: the owner of a [`SimulationHandle`]
//! pulls ticks with [`SimulationHandle::step`], typically a few per frame,
//! and [`SimulationHandle::stop`] drops the state for good.

mod forces;
mod quadtree;

use std::collections::HashMap;

use eframe::egui::{Pos2, Vec2, vec2};
use tracing::debug;

use self::forces::{Collision, Repulsion, Springs};
use self::quadtree::Cell;
use super::{EdgeOrigin, LabelAlign, LabelPlacement, Layout, Placement, PlacementRole, RoutedEdge, Shape};
use crate::config::ForceConfig;
use crate::graph::{GraphData, Node};
use crate::util::stable_pair;

const LABEL_GAP: f32 = 4.0;
const SETTLED_SPEED_SQ: f32 = 0.02 * 0.02;
const MAX_FORCE: f32 = 255.0;

pub fn node_radius(node: &Node, config: &ForceConfig) -> f32 {
    (node.weight() as f32).sqrt() * config.collision_scale + config.collision_base
}

/// Initial arrangement: previous positions where known, otherwise a stable
/// scatter around the viewport center derived from each id.
pub fn seed_layout(
    graph: &GraphData,
    previous: &HashMap<String, Pos2>,
    config: &ForceConfig,
    viewport: Vec2,
) -> Layout {
    let center = (viewport * 0.5).to_pos2();
    let spread = (graph.node_count() as f32).sqrt() * 42.0;

    let placements = graph
        .nodes()
        .iter()
        .map(|node| {
            let position = previous.get(&node.id).copied().unwrap_or_else(|| {
                let (x, y) = stable_pair(&node.id);
                center + vec2(x, y) * spread
            });
            let radius = node_radius(node, config);
            Placement {
                key: node.id.clone(),
                node_id: Some(node.id.clone()),
                label: node.name.clone(),
                role: PlacementRole::Node,
                kind: Some(node.kind),
                center: position,
                shape: Shape::Circle { radius },
                label_placement: LabelPlacement {
                    anchor: position + vec2(0.0, radius + LABEL_GAP),
                    angle: 0.0,
                    align: LabelAlign::Center,
                    visible: true,
                },
                depth: 0,
            }
        })
        .collect::<Vec<_>>();

    let edges = graph
        .edges()
        .iter()
        .enumerate()
        .filter(|(_, edge)| !edge.is_self_loop())
        .filter_map(|(index, edge)| {
            let source = placements[graph.index_of(&edge.source)?].center;
            let target = placements[graph.index_of(&edge.target)?].center;
            Some(RoutedEdge {
                key: edge.key(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                origin: EdgeOrigin::Graph(index),
                points: vec![source, target],
            })
        })
        .collect();

    Layout::new(placements, edges)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationStatus {
    /// Ticks remain; call `step` again next frame.
    Running,
    /// Cooled down or motionless; no further ticks will be produced.
    Settled,
    Stopped,
}

/// Positions after one tick, aligned with `ids`.
pub struct Tick<'a> {
    pub index: usize,
    pub alpha: f32,
    pub ids: &'a [String],
    pub positions: &'a [Pos2],
    /// Endpoint indices of every simulated link.
    pub links: &'a [(usize, usize)],
}

impl Tick<'_> {
    pub fn centers(&self) -> HashMap<String, Pos2> {
        self.ids.iter().cloned().zip(self.positions.iter().copied()).collect()
    }

    pub fn link_endpoints(&self) -> impl Iterator<Item = (Pos2, Pos2)> + '_ {
        self.links
            .iter()
            .map(|&(from, to)| (self.positions[from], self.positions[to]))
    }
}

struct SimulationState {
    config: ForceConfig,
    center: Vec2,
    ids: Vec<String>,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    radii: Vec<f32>,
    links: Vec<(usize, usize)>,
    forces: Vec<Vec2>,
    output: Vec<Pos2>,
    alpha: f32,
    ticks: usize,
}

impl SimulationState {
    /// Advances one tick; returns whether anything is still moving.
    fn tick(&mut self) -> bool {
        let count = self.positions.len();
        let config = &self.config;
        let alpha = self.alpha;
        self.forces.clear();
        self.forces.resize(count, Vec2::ZERO);

        if let Some(root) = Cell::build(&self.positions) {
            let repulsion = Repulsion {
                strength: config.repulsion,
                softening: config.softening,
            };
            for (index, force) in self.forces.iter_mut().enumerate() {
                *force += repulsion.accumulate(&root, index, &self.positions) * alpha;
            }

            let largest = self.radii.iter().copied().fold(0.0_f32, f32::max);
            let collision = Collision {
                strength: config.collision_strength,
                reach: largest * 2.0,
            };
            collision.accumulate(&root, &root, true, &self.positions, &self.radii, &mut self.forces);
        }

        let mut spring_forces = vec![Vec2::ZERO; count];
        Springs {
            rest_length: config.spring_length,
            strength: config.spring_strength,
            damping: config.spring_damping,
        }
        .accumulate(&self.links, &self.positions, &self.velocities, &self.radii, &mut spring_forces);

        let mut moving = false;
        for index in 0..count {
            let pull = (self.center - self.positions[index]) * config.center_strength;
            let mut force = self.forces[index] + (spring_forces[index] + pull) * alpha;
            let magnitude = force.length();
            if magnitude > MAX_FORCE {
                force *= MAX_FORCE / magnitude;
            }

            let mut velocity = (self.velocities[index] + force) * config.velocity_damping;
            let speed_sq = velocity.length_sq();
            if speed_sq > config.max_speed * config.max_speed {
                velocity *= config.max_speed / speed_sq.sqrt();
            }
            if velocity.length_sq() > SETTLED_SPEED_SQ {
                moving = true;
            }

            self.velocities[index] = velocity;
            self.positions[index] += velocity;
        }

        self.alpha += (0.0 - self.alpha) * config.alpha_decay;
        self.ticks += 1;
        for (output, position) in self.output.iter_mut().zip(&self.positions) {
            *output = position.to_pos2();
        }
        moving
    }

    fn exhausted(&self) -> bool {
        self.alpha < self.config.alpha_min || self.ticks >= self.config.max_ticks
    }
}

pub struct ForceSimulation;

impl ForceSimulation {
    /// Builds a simulation seeded from `seed`'s placements; no tick runs
    /// until the returned handle is stepped.
    pub fn start(graph: &GraphData, seed: &Layout, config: &ForceConfig, viewport: Vec2) -> SimulationHandle {
        let ids: Vec<String> = graph.nodes().iter().map(|node| node.id.clone()).collect();
        let positions: Vec<Vec2> = graph
            .nodes()
            .iter()
            .map(|node| {
                seed.placement(&node.id)
                    .map(|placement| placement.center.to_vec2())
                    .unwrap_or(viewport * 0.5)
            })
            .collect();
        let radii = graph
            .nodes()
            .iter()
            .map(|node| node_radius(node, config))
            .collect();
        let links = graph
            .edges()
            .iter()
            .filter(|edge| !edge.is_self_loop())
            .filter_map(|edge| Some((graph.index_of(&edge.source)?, graph.index_of(&edge.target)?)))
            .collect();

        debug!(nodes = ids.len(), "force simulation started");
        let count = ids.len();
        SimulationHandle {
            state: Some(SimulationState {
                config: config.clone(),
                center: viewport * 0.5,
                output: positions.iter().map(|position| position.to_pos2()).collect(),
                ids,
                positions,
                velocities: vec![Vec2::ZERO; count],
                radii,
                links,
                forces: Vec::with_capacity(count),
                alpha: 1.0,
                ticks: 0,
            }),
            settled: false,
        }
    }
}

/// Owned, cancellable simulation.
pub struct SimulationHandle {
    state: Option<SimulationState>,
    settled: bool,
}

impl SimulationHandle {
    pub fn is_running(&self) -> bool {
        self.state.is_some() && !self.settled
    }

    pub fn ticks(&self) -> usize {
        self.state.as_ref().map_or(0, |state| state.ticks)
    }

    pub fn alpha(&self) -> f32 {
        self.state.as_ref().map_or(0.0, |state| state.alpha)
    }

    /// Runs up to `budget` ticks, handing each one to `sink`.
    pub fn step(&mut self, budget: usize, sink: &mut dyn FnMut(&Tick<'_>)) -> SimulationStatus {
        let Some(state) = self.state.as_mut() else {
            return SimulationStatus::Stopped;
        };
        if self.settled {
            return SimulationStatus::Settled;
        }

        for _ in 0..budget {
            if state.exhausted() {
                self.settled = true;
                break;
            }
            let moving = state.tick();
            sink(&Tick {
                index: state.ticks,
                alpha: state.alpha,
                ids: &state.ids,
                positions: &state.output,
                links: &state.links,
            });
            if !moving {
                self.settled = true;
                break;
            }
        }

        if self.settled {
            debug!(ticks = state.ticks, alpha = state.alpha, "force simulation settled");
            SimulationStatus::Settled
        } else {
            SimulationStatus::Running
        }
    }

    /// Drops the simulation; later `step` calls produce no ticks.
    pub fn stop(&mut self) {
        if let Some(state) = self.state.take() {
            debug!(ticks = state.ticks, "force simulation stopped");
        }
    }

    pub fn positions(&self) -> Option<HashMap<String, Pos2>> {
        let state = self.state.as_ref()?;
        Some(
            state
                .ids
                .iter()
                .cloned()
                .zip(state.output.iter().copied())
                .collect(),
        )
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures;

    fn start(graph: &GraphData, config: &ForceConfig) -> (Layout, SimulationHandle) {
        let viewport = vec2(800.0, 600.0);
        let seed = seed_layout(graph, &HashMap::new(), config, viewport);
        let handle = ForceSimulation::start(graph, &seed, config, viewport);
        (seed, handle)
    }

    #[test]
    fn stopped_before_first_tick_never_calls_back() {
        let graph = fixtures::small_repo();
        let config = ForceConfig::default();
        let (seed, mut handle) = start(&graph, &config);
        let before = handle.positions().expect("running");

        handle.stop();
        handle.stop();
        let mut calls = 0;
        let status = handle.step(10, &mut |_| calls += 1);

        assert_eq!(status, SimulationStatus::Stopped);
        assert_eq!(calls, 0);
        assert!(handle.positions().is_none());
        for placement in seed.placements() {
            assert_eq!(before[&placement.key], placement.center);
        }
    }

    #[test]
    fn ticks_are_bounded_by_max_ticks() {
        let graph = fixtures::small_repo();
        let config = ForceConfig {
            max_ticks: 25,
            ..ForceConfig::default()
        };
        let (_, mut handle) = start(&graph, &config);

        let mut calls = 0;
        let mut status = SimulationStatus::Running;
        for _ in 0..100 {
            status = handle.step(3, &mut |_| calls += 1);
            if status != SimulationStatus::Running {
                break;
            }
        }

        assert_eq!(status, SimulationStatus::Settled);
        assert!(calls <= 25);
        assert!(!handle.is_running());
    }

    #[test]
    fn ticks_report_node_and_link_positions() {
        let graph = fixtures::small_repo();
        let config = ForceConfig::default();
        let (_, mut handle) = start(&graph, &config);

        let mut seen = None;
        handle.step(1, &mut |tick| {
            seen = Some((tick.positions.len(), tick.link_endpoints().count(), tick.centers()));
        });

        let (nodes, links, centers) = seen.expect("one tick ran");
        assert_eq!(nodes, graph.node_count());
        assert_eq!(links, graph.edge_count());
        assert!(centers.values().all(|center| center.x.is_finite() && center.y.is_finite()));
    }

    #[test]
    fn seeds_reuse_previous_positions() {
        let graph = fixtures::chain(3);
        let previous = HashMap::from([("n1".to_owned(), Pos2::new(5.0, 7.0))]);
        let seed = seed_layout(&graph, &previous, &ForceConfig::default(), vec2(800.0, 600.0));

        assert_eq!(seed.placement("n1").expect("placed").center, Pos2::new(5.0, 7.0));
        let again = seed_layout(&graph, &HashMap::new(), &ForceConfig::default(), vec2(800.0, 600.0));
        let other = seed_layout(&graph, &HashMap::new(), &ForceConfig::default(), vec2(800.0, 600.0));
        assert_eq!(again, other);
    }

    #[test]
    fn radius_grows_with_size() {
        let config = ForceConfig::default();
        let graph = fixtures::small_repo();
        let big = node_radius(graph.node("src/main.rs").expect("node"), &config);
        let small = node_radius(graph.node("src/lib.rs:Runner").expect("node"), &config);
        assert!(big > small);
        assert!(small > config.collision_base);
    }
}
