use eframe::egui::{self, RichText, Ui};

use repo_atlas::expansion::ExpansionPhase;
use repo_atlas::scene::SceneEvents;
use repo_atlas::util::{format_count, short_name};

use super::super::ViewModel;

const NEIGHBOR_ROWS: usize = 32;

enum DetailsAction {
    Select(String),
    ToggleExpansion(String),
    ToggleFocus(String),
    TraceTo(String),
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let mut action = None;
        self.draw_selection(ui, &mut action);
        ui.separator();
        self.draw_trace(ui, &mut action);

        if let Some(path) = &self.drilled_path {
            ui.separator();
            ui.label(RichText::new("Drilled into").strong());
            ui.small(path.as_str());
        }

        match action {
            Some(DetailsAction::Select(id)) => {
                self.set_selected(Some(id.clone()));
                self.center_on(&id);
            }
            Some(DetailsAction::ToggleExpansion(id)) => self.toggle_expansion(&id),
            Some(DetailsAction::ToggleFocus(id)) => self.toggle_focus(&id),
            Some(DetailsAction::TraceTo(id)) => self.trace_to(&id),
            None => {}
        }
    }

    fn draw_selection(&self, ui: &mut Ui, action: &mut Option<DetailsAction>) {
        let Some(selected_id) = self.selected.as_deref() else {
            ui.label("Select a node from the graph or the search results.");
            return;
        };
        let Some(node) = self.graph.node(selected_id) else {
            ui.label("Selected node no longer exists in the graph.");
            return;
        };

        ui.label(RichText::new(short_name(&node.id)).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Kind: {}", node.kind));
        if let Some(path) = &node.path {
            ui.label(format!("Path: {path}"));
        }
        if let Some(parent) = node.container.as_ref().or(node.parent_file.as_ref()) {
            ui.label(format!("Inside: {}", short_name(parent)));
        }
        if let Some(size) = node.size {
            ui.label(format!("Size: {}", format_count(size)));
        }
        ui.label(format!("Incoming edges: {}", node.in_degree));
        ui.label(format!("Outgoing edges: {}", node.out_degree));
        if !node.hydrated {
            ui.label(RichText::new("Content not loaded yet").italics());
        }
        if node.critical {
            ui.label("Marked critical");
        }

        ui.horizontal(|ui| {
            if node.kind.is_container() {
                let phase = self.expansion.phase(&node.id);
                let text = match phase {
                    ExpansionPhase::Collapsed => "Expand",
                    ExpansionPhase::Expanded => "Collapse",
                    ExpansionPhase::Expanding => "Expanding...",
                    ExpansionPhase::Collapsing => "Collapsing...",
                };
                let idle = matches!(phase, ExpansionPhase::Collapsed | ExpansionPhase::Expanded);
                let enabled = idle && self.expansion.expanding().is_none();
                if ui.add_enabled(enabled, egui::Button::new(text)).clicked() {
                    *action = Some(DetailsAction::ToggleExpansion(node.id.clone()));
                }
            }

            let focus_text = if self.focus.contains(&node.id) {
                "Remove from focus"
            } else {
                "Add to focus"
            };
            if ui.button(focus_text).clicked() {
                *action = Some(DetailsAction::ToggleFocus(node.id.clone()));
            }
        });

        ui.separator();
        ui.label(RichText::new("Neighbors").strong());
        let neighbors = self.graph.neighbors(&node.id);
        if neighbors.is_empty() {
            ui.label("No connected nodes.");
            return;
        }
        for neighbor in neighbors.iter().take(NEIGHBOR_ROWS) {
            let response = ui
                .link(short_name(neighbor))
                .on_hover_text(format!("{neighbor}\nshift-click to trace a path"));
            if response.clicked() {
                let shift = ui.input(|input| input.modifiers.shift);
                *action = Some(if shift {
                    DetailsAction::TraceTo((*neighbor).to_owned())
                } else {
                    DetailsAction::Select((*neighbor).to_owned())
                });
            }
        }
        if neighbors.len() > NEIGHBOR_ROWS {
            ui.small(format!("... and {} more", neighbors.len() - NEIGHBOR_ROWS));
        }
    }

    fn draw_trace(&self, ui: &mut Ui, action: &mut Option<DetailsAction>) {
        ui.label(RichText::new("Traced path").strong());
        let Some(trace) = &self.trace else {
            ui.label("Shift-click a node to trace from the selection.");
            return;
        };

        for (step, id) in trace.path.iter().enumerate() {
            let missing = !self.graph.contains(id);
            let text = format!("{}. {}", step + 1, short_name(id));
            if missing {
                ui.label(RichText::new(text).weak());
            } else if ui.link(text).on_hover_text(id.as_str()).clicked() {
                *action = Some(DetailsAction::Select(id.clone()));
            }
        }
        for link in &trace.links {
            ui.small(format!(
                "{} -{}-> {}",
                short_name(&link.source),
                link.relation,
                short_name(&link.target)
            ));
        }
    }
}
