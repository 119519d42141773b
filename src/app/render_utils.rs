use eframe::egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2, vec2};

use repo_atlas::style::Dash;

const DASH_LENGTH: f32 = 6.0;
const GAP_LENGTH: f32 = 4.0;

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Pos2) -> Pos2 {
    rect.center() + pan + world.to_vec2() * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Pos2 {
    ((screen - rect.center() - pan) / zoom).to_pos2()
}

pub(super) fn faded(color: Color32, opacity: f32) -> Color32 {
    color.gamma_multiply(opacity.clamp(0.0, 1.0))
}

pub(super) fn polyline_visible(rect: Rect, points: &[Pos2], padding: f32) -> bool {
    let Some(bounds) = points
        .iter()
        .map(|point| Rect::from_center_size(*point, Vec2::ZERO))
        .reduce(|acc, point| acc.union(point))
    else {
        return false;
    };
    rect.intersects(bounds.expand(padding))
}

pub(super) fn draw_polyline(painter: &Painter, points: Vec<Pos2>, stroke: Stroke, dash: Dash) {
    match dash {
        Dash::Solid => {
            painter.add(Shape::line(points, stroke));
        }
        Dash::Dashed => {
            painter.extend(Shape::dashed_line(&points, stroke, DASH_LENGTH, GAP_LENGTH));
        }
    }
}

/// Filled arrow head at the end of `points`, pointing along the last segment.
pub(super) fn draw_arrow_head(painter: &Painter, points: &[Pos2], color: Color32, size: f32) {
    let [.., before, tip] = points else {
        return;
    };
    let direction = (*tip - *before).normalized();
    if !direction.x.is_finite() || !direction.y.is_finite() {
        return;
    }
    let back = *tip - direction * size;
    let side = direction.rot90() * (size * 0.5);
    painter.add(Shape::convex_polygon(
        vec![*tip, back + side, back - side],
        color,
        Stroke::NONE,
    ));
}

pub(super) fn circle_outline(center: Pos2, radius: f32) -> Vec<Pos2> {
    let segments = ((radius * 0.6) as usize).clamp(16, 96);
    (0..=segments)
        .map(|index| {
            let angle = index as f32 / segments as f32 * std::f32::consts::TAU;
            center + vec2(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

pub(super) fn rect_outline(rect: Rect) -> Vec<Pos2> {
    vec![
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
        rect.left_top(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_and_world_round_trip() {
        let rect = Rect::from_min_size(Pos2::new(10.0, 20.0), vec2(400.0, 300.0));
        let pan = vec2(-35.0, 12.0);
        let world = Pos2::new(120.0, -40.0);
        let screen = world_to_screen(rect, pan, 1.7, world);
        assert!(screen_to_world(rect, pan, 1.7, screen).distance(world) < 1e-3);
    }

    #[test]
    fn polyline_visibility_uses_padded_bounds() {
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(100.0, 100.0));
        assert!(polyline_visible(rect, &[Pos2::new(-50.0, 50.0), Pos2::new(150.0, 50.0)], 0.0));
        assert!(!polyline_visible(rect, &[Pos2::new(-50.0, -50.0), Pos2::new(-10.0, -20.0)], 4.0));
        assert!(polyline_visible(rect, &[Pos2::new(-50.0, -50.0), Pos2::new(-3.0, -20.0)], 4.0));
        assert!(!polyline_visible(rect, &[], 10.0));
    }
}
