use eframe::egui::{self, Rect, Ui, Vec2};

use super::super::ViewModel;
use super::super::render_utils::screen_to_world;

const MIN_ZOOM: f32 = 0.05;
const MAX_ZOOM: f32 = 6.0;
const FIT_MARGIN: f32 = 80.0;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = pointer - rect.center() - (world_before.to_vec2() * self.zoom);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
            || response.dragged_by(egui::PointerButton::Primary)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Zooms and pans so `bounds` (world units) fills `rect`.
    pub(in crate::app) fn fit_to(&mut self, rect: Rect, bounds: Rect) {
        let width = bounds.width() + FIT_MARGIN;
        let height = bounds.height() + FIT_MARGIN;
        let zoom = (rect.width() / width).min(rect.height() / height);
        if !zoom.is_finite() {
            return;
        }
        self.zoom = zoom.clamp(MIN_ZOOM, 2.0);
        self.pan = -bounds.center().to_vec2() * self.zoom;
    }

    /// Pans so the placement for `id` sits in the middle of the canvas.
    pub(in crate::app) fn center_on(&mut self, id: &str) {
        let Some(center) = self
            .renderer
            .layout()
            .and_then(|layout| layout.placement(id))
            .map(|placement| placement.center)
        else {
            return;
        };
        self.pan = Vec2::ZERO - center.to_vec2() * self.zoom;
    }
}
