use eframe::egui::emath::Rot2;
use eframe::egui::epaint::TextShape;
use eframe::egui::{self, Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Stroke, StrokeKind, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use repo_atlas::highlight::FocusSet;
use repo_atlas::layout::{LabelAlign, Shape};
use repo_atlas::scene::{
    BADGE_RADIUS, PickTarget, RenderInputs, Scene, SceneEdge, SceneEvents, SceneLabel, SceneNode,
    dispatch_click, dispatch_hover, pick,
};
use repo_atlas::style::{Dash, Marker, StyleContext, VIRTUAL_EDGE_COLOR};
use repo_atlas::util::short_name;

use super::super::render_utils::{
    circle_outline, draw_arrow_head, draw_background, draw_polyline, faded, polyline_visible,
    rect_outline, screen_to_world, world_to_screen,
};
use super::super::{SearchMatchCache, ViewModel};

const LABEL_COLOR: Color32 = Color32::from_gray(238);
const BADGE_FILL: Color32 = Color32::from_rgb(30, 36, 46);

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// World → screen mapping for one frame.
#[derive(Clone, Copy)]
struct View {
    rect: Rect,
    pan: egui::Vec2,
    zoom: f32,
}

impl View {
    fn point(self, world: Pos2) -> Pos2 {
        world_to_screen(self.rect, self.pan, self.zoom, world)
    }

    fn stroke_scale(self) -> f32 {
        self.zoom.sqrt().clamp(0.6, 1.8)
    }
}

impl ViewModel {
    /// Ids of nodes whose name or id fuzzy-matches the search box, best first.
    pub(in crate::app) fn search_matches(&mut self) -> &[String] {
        let query = self.search.trim().to_owned();
        let fresh = self
            .search_match_cache
            .as_ref()
            .is_some_and(|cached| cached.query == query && cached.graph_revision == self.graph_revision);
        if !fresh {
            let matches = if query.is_empty() {
                Vec::new()
            } else {
                let matcher = SkimMatcherV2::default();
                let mut scored: Vec<(i64, String)> = self
                    .graph
                    .nodes()
                    .iter()
                    .filter_map(|node| {
                        let score = fuzzy_match_score(&matcher, &node.name, &query)
                            .or_else(|| fuzzy_match_score(&matcher, &node.id, &query))?;
                        Some((score, node.id.clone()))
                    })
                    .collect();
                scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
                scored.into_iter().map(|(_, id)| id).collect()
            };
            self.search_match_cache = Some(SearchMatchCache {
                query,
                graph_revision: self.graph_revision,
                matches,
            });
        }

        self.search_match_cache
            .as_ref()
            .map_or(&[][..], |cached| cached.matches.as_slice())
    }

    /// Hands the current state to the renderer.
    pub(in crate::app) fn refresh_scene(&mut self, now: f64) {
        let inactive = FocusSet::default();
        let focus = if self.focus_mode {
            &self.focus
        } else {
            &inactive
        };
        let inputs = RenderInputs {
            graph: &self.graph,
            mode: self.mode,
            membership: None,
            config: &self.config,
            viewport: self.viewport,
            style: StyleContext {
                selected: self.selected.as_deref(),
                highlight: &self.highlight,
                focus,
                hover: &self.hover,
                expansion: &self.expansion,
                toggle_available: true,
                dims: &self.config.dims,
                config: &self.config.style,
            },
        };
        self.last_report = Some(self.renderer.render(inputs, now));
        self.render_dirty = false;
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);
        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);

        let now = ui.input(|input| input.time);
        self.apply_hydration();
        if (rect.size() - self.viewport).length_sq() > 0.25 {
            self.viewport = rect.size();
            self.render_dirty = true;
        }
        if self.render_dirty {
            self.refresh_scene(now);
        }

        let animating = self.renderer.advance(now);
        let scene = self.renderer.frame(now);
        if self.fit_pending && scene.bounds.is_positive() {
            self.fit_to(rect, scene.bounds);
            self.fit_pending = false;
        }

        let view = View {
            rect,
            pan: self.pan,
            zoom: self.zoom,
        };
        if let Some(text) = scene.placeholder
            && scene.is_empty()
        {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                text,
                FontId::proportional(16.0),
                Color32::from_gray(170),
            );
        }

        for container in &scene.containers {
            draw_shape(&painter, view, container);
        }
        for edge in &scene.edges {
            draw_edge(&painter, view, edge);
        }
        for node in &scene.nodes {
            draw_shape(&painter, view, node);
        }
        for shape in scene.shapes() {
            draw_badge(&painter, view, shape);
        }

        let matches = self.search_matches().to_vec();
        for shape in scene.shapes() {
            if shape
                .node_id
                .as_ref()
                .is_some_and(|id| matches.contains(id))
            {
                let bounds = Rect::from_min_max(view.point(shape.bounds().min), view.point(shape.bounds().max));
                painter.rect_stroke(
                    bounds.expand(3.0),
                    4.0,
                    Stroke::new(1.6, VIRTUAL_EDGE_COLOR),
                    StrokeKind::Outside,
                );
            }
        }

        self.handle_pointer(ui, &response, rect, &scene, &painter);

        if animating || self.render_dirty || self.hydration.is_busy() || response.dragged() {
            ui.ctx().request_repaint();
        }
    }

    fn handle_pointer(
        &mut self,
        ui: &Ui,
        response: &egui::Response,
        rect: Rect,
        scene: &Scene,
        painter: &Painter,
    ) {
        let world = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer))
            .map(|pointer| screen_to_world(rect, self.pan, self.zoom, pointer));

        match world {
            Some(world) if response.hovered() => {
                if dispatch_hover(scene, world, self).is_some() {
                    ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
                }
            }
            _ => self.hover_node_cleared(),
        }

        if let Some(world) = world {
            if response.double_clicked() {
                dispatch_click(scene, world, true, self);
            } else if response.clicked_by(egui::PointerButton::Primary) {
                let shift = ui.input(|input| input.modifiers.shift);
                match pick(scene, world) {
                    Some(PickTarget::Node(id)) if shift => self.trace_to(&id),
                    Some(_) => {
                        dispatch_click(scene, world, false, self);
                    }
                    None => self.set_selected(None),
                }
            }
        }

        if let Some(hovered) = self.hover.hovered()
            && let Some(node) = self.graph.node(hovered)
        {
            let text = format!(
                "{}  |  {}  |  in {} / out {}",
                short_name(&node.id),
                node.kind,
                node.in_degree,
                node.out_degree
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }
    }

    fn hover_node_cleared(&mut self) {
        if self.hover.is_active() {
            self.hover_node(None);
        }
    }
}

fn draw_shape(painter: &Painter, view: View, shape: &SceneNode) {
    let style = shape.style;
    if style.opacity <= 0.01 {
        return;
    }
    let bounds = Rect::from_min_max(view.point(shape.bounds().min), view.point(shape.bounds().max));
    if !view.rect.intersects(bounds) {
        return;
    }

    let fill = faded(style.fill, style.opacity);
    let stroke = Stroke::new(
        style.stroke_width * view.stroke_scale(),
        faded(style.stroke, style.opacity),
    );
    match shape.shape {
        Shape::Rect { .. } => {
            let corner = (5.0 * view.zoom).clamp(1.0, 8.0);
            painter.rect_filled(bounds, corner, fill);
            match style.dash {
                Dash::Solid => {
                    painter.rect_stroke(bounds, corner, stroke, StrokeKind::Inside);
                }
                Dash::Dashed => draw_polyline(painter, rect_outline(bounds), stroke, Dash::Dashed),
            }
        }
        Shape::Circle { radius } => {
            let center = view.point(shape.center);
            let radius = radius * view.zoom;
            painter.circle_filled(center, radius, fill);
            match style.dash {
                Dash::Solid => {
                    painter.circle_stroke(center, radius, stroke);
                }
                Dash::Dashed => draw_polyline(painter, circle_outline(center, radius), stroke, Dash::Dashed),
            }
        }
    }

    draw_label(painter, view, shape, &shape.label, style.opacity);
}

fn draw_label(painter: &Painter, view: View, shape: &SceneNode, label: &SceneLabel, opacity: f32) {
    let placement = label.placement;
    let font_size = (12.0 * view.zoom.sqrt()).clamp(8.0, 16.0);
    if !placement.visible || font_size * view.zoom.sqrt() < 6.0 || label.text.is_empty() {
        return;
    }

    let anchor = view.point(placement.anchor);
    let font = FontId::proportional(font_size);
    let color = faded(LABEL_COLOR, opacity);

    match placement.align {
        LabelAlign::AboveLeft => {
            painter.text(anchor, Align2::LEFT_BOTTOM, &label.text, font, color);
        }
        LabelAlign::Center => {
            let align = if placement.anchor.distance(shape.center) < 0.5 {
                Align2::CENTER_CENTER
            } else {
                Align2::CENTER_TOP
            };
            painter.text(anchor, align, &label.text, font, color);
        }
        LabelAlign::Start | LabelAlign::End => {
            let galley = painter.layout_no_wrap(label.text.clone(), font, color);
            let size = galley.size();
            let offset = if placement.align == LabelAlign::Start {
                vec2(0.0, size.y * 0.5)
            } else {
                vec2(size.x, size.y * 0.5)
            };
            let position = anchor - Rot2::from_angle(placement.angle) * offset;
            painter.add(TextShape::new(position, galley, color).with_angle(placement.angle));
        }
    }
}

fn draw_edge(painter: &Painter, view: View, edge: &SceneEdge) {
    let style = edge.style;
    if style.opacity <= 0.01 {
        return;
    }
    let points: Vec<Pos2> = edge.points.iter().map(|point| view.point(*point)).collect();
    if !polyline_visible(view.rect, &points, 4.0) {
        return;
    }

    let width = (style.width * view.stroke_scale()).clamp(0.5, 6.0);
    let color = faded(style.color, style.opacity);
    if style.marker == Marker::Arrow {
        draw_arrow_head(painter, &points, color, 4.0 + width * 2.0);
    }
    draw_polyline(painter, points, Stroke::new(width, color), style.dash);
}

fn draw_badge(painter: &Painter, view: View, shape: &SceneNode) {
    let Some(badge) = shape.badge else {
        return;
    };
    let radius = BADGE_RADIUS * view.zoom;
    if radius < 3.0 || badge.opacity <= 0.01 {
        return;
    }
    let center = view.point(shape.badge_center());
    if !view.rect.contains(center) {
        return;
    }

    painter.circle_filled(center, radius, faded(BADGE_FILL, badge.opacity));
    painter.circle_stroke(
        center,
        radius,
        Stroke::new(1.0, faded(shape.style.stroke, badge.opacity)),
    );
    painter.text(
        center,
        Align2::CENTER_CENTER,
        badge.glyph,
        FontId::monospace((radius * 1.4).clamp(8.0, 16.0)),
        faded(LABEL_COLOR, badge.opacity),
    );
}
