use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{Context as _, Result};
use eframe::egui::{self, Context, Vec2};
use tracing::{info, warn};

use repo_atlas::config::AtlasConfig;
use repo_atlas::expansion::ExpansionState;
use repo_atlas::graph::{GraphData, normalize, parse_graph};
use repo_atlas::highlight::{FocusSet, HighlightState, HoverEmphasis, PathTrace};
use repo_atlas::layout::LayoutMode;
use repo_atlas::scene::{RenderReport, SceneRenderer};

use self::hydrate::HydrationWorker;

mod events;
mod graph;
mod hydrate;
mod render_utils;
mod trace;
mod ui;

/// Files the viewer loads on start and on reload.
#[derive(Clone, Debug)]
pub struct Sources {
    pub graph: PathBuf,
    pub trace: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

struct Loaded {
    graph: GraphData,
    trace: Option<PathTrace>,
    config: AtlasConfig,
}

fn load(sources: &Sources) -> Result<Loaded> {
    let config = match &sources.config {
        Some(path) => AtlasConfig::load(path)?,
        None => AtlasConfig::default(),
    };

    let raw = fs::read_to_string(&sources.graph)
        .with_context(|| format!("failed to read graph {}", sources.graph.display()))?;
    let parsed = parse_graph(&raw)
        .with_context(|| format!("failed to parse graph {}", sources.graph.display()))?;
    let graph = normalize(parsed);

    let trace = match &sources.trace {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read trace {}", path.display()))?;
            PathTrace::from_json(&raw)
                .with_context(|| format!("failed to parse trace {}", path.display()))?
        }
        None => None,
    };

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        traced = trace.is_some(),
        "graph loaded"
    );
    Ok(Loaded {
        graph,
        trace,
        config,
    })
}

pub struct AtlasApp {
    sources: Sources,
    mode: LayoutMode,
    state: AppState,
    reload_rx: Option<Receiver<Result<Loaded, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<Loaded, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct SearchMatchCache {
    query: String,
    graph_revision: u64,
    matches: Vec<String>,
}

struct ViewModel {
    /// Full graph, including expanded children that are currently hidden.
    graph: GraphData,
    graph_revision: u64,
    config: AtlasConfig,
    mode: LayoutMode,
    renderer: SceneRenderer,
    render_dirty: bool,
    last_report: Option<RenderReport>,
    viewport: Vec2,
    selected: Option<String>,
    trace: Option<PathTrace>,
    highlight: HighlightState,
    focus: FocusSet,
    focus_mode: bool,
    hover: HoverEmphasis,
    expansion: ExpansionState,
    hydration: HydrationWorker,
    drilled_path: Option<String>,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    pan: Vec2,
    zoom: f32,
    fit_pending: bool,
}

impl AtlasApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, sources: Sources, mode: LayoutMode) -> Self {
        let state = Self::start_load(sources.clone());
        Self {
            sources,
            mode,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(sources: Sources) -> Receiver<Result<Loaded, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load(&sources).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(sources: Sources) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(sources),
        }
    }

    fn ready(&self, loaded: Loaded) -> AppState {
        AppState::Ready(Box::new(ViewModel::new(loaded, self.mode)))
    }
}

impl eframe::App for AtlasApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(result);
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading repository graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load repository graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
                if retry {
                    self.state = Self::start_load(self.sources.clone());
                    return;
                }
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.sources, &mut reload_requested, is_reloading);
                self.mode = model.mode;

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.sources.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => transition = Some(result),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(Err("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(result) = transition {
            self.reload_rx = None;
            if let AppState::Ready(model) = &mut self.state {
                model.renderer.shutdown();
            }
            self.state = match result {
                Ok(loaded) => self.ready(loaded),
                Err(error) => {
                    warn!(%error, "graph load failed");
                    AppState::Error(error)
                }
            };
        }
    }
}
