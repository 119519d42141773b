use std::ops::RangeInclusive;

use eframe::egui::{self, Key, Response, RichText, Ui};

use repo_atlas::highlight::FocusSet;
use repo_atlas::layout::LayoutMode;
use repo_atlas::util::short_name;

use super::super::ViewModel;

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;
const SEARCH_RESULT_ROWS: usize = 12;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    positive_secs: f32,
    negative_secs: f32,
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

/// Arrow keys nudge a focused slider, faster the longer they are held.
fn apply_slider_arrow_acceleration(
    ui: &Ui,
    response: &Response,
    value: &mut f32,
    range: &RangeInclusive<f32>,
) -> bool {
    let state_id = response.id.with("arrow_key_hold_state");
    let mut hold_state = ui
        .ctx()
        .data(|data| data.get_temp::<SliderKeyHoldState>(state_id).unwrap_or_default());

    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return false;
    }

    let (delta_time, increase_down, decrease_down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    hold_state.positive_secs = if increase_down {
        hold_state.positive_secs + delta_time
    } else {
        0.0
    };
    hold_state.negative_secs = if decrease_down {
        hold_state.negative_secs + delta_time
    } else {
        0.0
    };
    ui.ctx()
        .data_mut(|data| data.insert_temp(state_id, hold_state));

    let direction = (increase_down as i8) - (decrease_down as i8);
    if direction == 0 {
        return false;
    }

    let hold_secs = if direction > 0 {
        hold_state.positive_secs
    } else {
        hold_state.negative_secs
    };
    let step = ((range.end() - range.start()) / 200.0).max(0.0005);
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold_secs);
    let old_value = *value;
    *value = (*value + direction as f32 * step * speed * delta_time)
        .clamp(*range.start(), *range.end());
    ui.ctx().request_repaint();
    (*value - old_value).abs() > f32::EPSILON
}

fn tuning_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    text: &str,
    hover: &str,
) -> bool {
    let response = ui
        .add(
            egui::Slider::new(value, range.clone())
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if response.hovered() {
        response.request_focus();
    }
    let mut changed = response.changed();
    changed |= apply_slider_arrow_acceleration(ui, &response, value, &range);
    changed
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        let mut changed = false;

        ui.label("Layout");
        ui.horizontal_wrapped(|ui| {
            for mode in LayoutMode::ALL {
                if ui
                    .selectable_value(&mut self.mode, mode, mode.label())
                    .changed()
                {
                    self.fit_pending = true;
                    changed = true;
                }
            }
        });

        ui.separator();
        self.draw_search(ui);
        ui.separator();

        changed |= ui
            .checkbox(&mut self.focus_mode, "Focus on critical nodes")
            .on_hover_text("Dim everything outside the focus set.")
            .changed();
        ui.add_enabled_ui(self.focus_mode, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("{} focused", self.focus.len()));
                if ui.button("Reset to critical").clicked() {
                    self.focus = FocusSet::new(self.graph.critical_ids());
                    changed = true;
                }
                if ui.button("Clear").clicked() {
                    self.focus.clear();
                    changed = true;
                }
            });
        });

        let expanded: Vec<String> = self.expansion.expanded_ids().map(str::to_owned).collect();
        if !expanded.is_empty() {
            ui.horizontal(|ui| {
                ui.label(format!("{} expanded", expanded.len()));
                if ui.button("Collapse all").clicked() {
                    for id in &expanded {
                        self.expansion.collapse(id);
                    }
                    changed = true;
                }
            });
        }

        ui.horizontal(|ui| {
            let label = if self.highlight.is_active() {
                format!("Path: {} nodes", self.highlight.path().len())
            } else {
                "No path traced".to_owned()
            };
            ui.label(label)
                .on_hover_text("Shift-click a node to trace a path from the selection.");
            if ui
                .add_enabled(self.highlight.is_active(), egui::Button::new("Clear path"))
                .clicked()
            {
                self.set_trace(None);
            }
        });

        ui.separator();

        ui.collapsing("Emphasis", |ui| {
            let dims = &mut self.config.dims;
            changed |= tuning_slider(
                ui,
                &mut dims.focus,
                0.0..=1.0,
                "Unfocused",
                "Opacity of nodes outside the focus set.",
            );
            changed |= tuning_slider(
                ui,
                &mut dims.path_exclusion,
                0.0..=1.0,
                "Off path",
                "Opacity of nodes outside the traced path.",
            );
            changed |= tuning_slider(
                ui,
                &mut dims.hover,
                0.0..=1.0,
                "Not hovered",
                "Opacity of nodes unrelated to the hovered one.",
            );
            let mut duration = self.config.transition.duration_secs as f32;
            if tuning_slider(
                ui,
                &mut duration,
                0.0..=2.0,
                "Transition (s)",
                "Length of enter, update and exit animations.",
            ) {
                self.config.transition.duration_secs = f64::from(duration);
                changed = true;
            }
        });

        ui.add_enabled_ui(self.mode == LayoutMode::Force, |ui| {
            ui.collapsing("Physics tuning", |ui| {
                let force = &mut self.config.force;
                changed |= tuning_slider(
                    ui,
                    &mut force.repulsion,
                    50.0..=4000.0,
                    "Repulsion",
                    "How strongly nodes push away from each other.",
                );
                changed |= tuning_slider(
                    ui,
                    &mut force.spring_length,
                    20.0..=400.0,
                    "Edge length",
                    "Rest length of the spring on every edge.",
                );
                changed |= tuning_slider(
                    ui,
                    &mut force.spring_strength,
                    0.001..=0.5,
                    "Edge spring",
                    "How strongly connected nodes pull toward their rest length.",
                );
                changed |= tuning_slider(
                    ui,
                    &mut force.center_strength,
                    0.0..=0.2,
                    "Centering",
                    "Pull toward the middle of the viewport.",
                );
                changed |= tuning_slider(
                    ui,
                    &mut force.velocity_damping,
                    0.5..=0.98,
                    "Velocity damping",
                    "How quickly node movement slows each tick.",
                );
                if ui
                    .button("Restart physics")
                    .on_hover_text("Run the simulation again from the current positions.")
                    .clicked()
                {
                    self.renderer.invalidate();
                    changed = true;
                }
            });
        });

        if changed {
            self.render_dirty = true;
        }
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.label("Search (name or id)")
            .on_hover_text("Fuzzy-highlight matching nodes without changing the rendered graph.");
        ui.text_edit_singleline(&mut self.search)
            .on_hover_text("Type to ring matching nodes, then click a result to select it.");

        if self.search.trim().is_empty() {
            return;
        }

        let matches = self.search_matches().to_vec();
        if matches.is_empty() {
            ui.small("No matches.");
            return;
        }

        ui.small(format!("{} matches", matches.len()));
        let mut clicked = None;
        for id in matches.iter().take(SEARCH_RESULT_ROWS) {
            let selected = self.selected.as_deref() == Some(id.as_str());
            let text = RichText::new(short_name(id)).monospace();
            if ui
                .selectable_label(selected, text)
                .on_hover_text(id.as_str())
                .clicked()
            {
                clicked = Some(id.clone());
            }
        }
        if matches.len() > SEARCH_RESULT_ROWS {
            ui.small(format!("... and {} more", matches.len() - SEARCH_RESULT_ROWS));
        }

        if let Some(id) = clicked {
            self.set_selected(Some(id.clone()));
            self.center_on(&id);
        }
    }
}
