use eframe::egui::{self, Align, Context, Layout, Vec2};

use repo_atlas::expansion::ExpansionState;
use repo_atlas::highlight::{FocusSet, HighlightState, HoverEmphasis};
use repo_atlas::layout::LayoutMode;
use repo_atlas::scene::{RenderOutcome, SceneRenderer};
use repo_atlas::util::format_count;

use super::super::hydrate::HydrationWorker;
use super::super::{Loaded, Sources, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(loaded: Loaded, mode: LayoutMode) -> Self {
        let Loaded {
            graph,
            trace,
            config,
        } = loaded;
        let focus = FocusSet::new(graph.critical_ids());

        Self {
            highlight: HighlightState::from_trace(trace.as_ref()),
            trace,
            focus_mode: focus.is_active(),
            focus,
            graph,
            graph_revision: 0,
            config,
            mode,
            renderer: SceneRenderer::new(),
            render_dirty: true,
            last_report: None,
            viewport: Vec2::ZERO,
            selected: None,
            hover: HoverEmphasis::none(),
            expansion: ExpansionState::default(),
            hydration: HydrationWorker::new(),
            drilled_path: None,
            search: String::new(),
            search_match_cache: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            fit_pending: true,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        sources: &Sources,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("repo-atlas");
                    ui.separator();
                    ui.label(format!("graph: {}", sources.graph.display()));
                    ui.label(format!("nodes: {}", format_count(self.graph.node_count() as u64)));
                    ui.label(format!("edges: {}", format_count(self.graph.edge_count() as u64)));
                    let reload_button = ui.add_enabled(!is_loading, egui::Button::new("Reload graph"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui.button("Fit view").clicked() {
                        self.fit_pending = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(text) = self.render_report_text() {
                            ui.label(text);
                        }
                        if self.renderer.is_simulating() {
                            ui.label("simulating");
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_controls(ui));
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_details(ui));
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                if is_loading {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Reloading repository graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                } else {
                    self.draw_graph(ui);
                }
            });
    }

    fn render_report_text(&self) -> Option<String> {
        let report = self.last_report?;
        let outcome = match report.outcome {
            RenderOutcome::Relayout => "layout",
            RenderOutcome::Restyled => "restyle",
            RenderOutcome::Aborted => "layout failed",
            RenderOutcome::Empty => "empty",
        };
        Some(format!(
            "{outcome}: +{} ~{} -{} ={}",
            report.entered, report.updated, report.exited, report.unchanged
        ))
    }
}
