use eframe::egui::{Color32, Pos2, Vec2};

use super::{SceneEdge, SceneNode};
use crate::layout::curve::resample;
use crate::layout::{LabelPlacement, Shape};
use crate::style::{BadgeStyle, EdgeStyle, NodeStyle, blend_color};

/// Values that can be blended toward a target. Discrete fields take the
/// target's value as soon as a transition starts.
pub(crate) trait Interpolate: Clone {
    fn interpolate(&self, to: &Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Interpolate for Pos2 {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        Pos2::new(self.x.interpolate(&to.x, t), self.y.interpolate(&to.y, t))
    }
}

impl Interpolate for Vec2 {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        *self + (*to - *self) * t
    }
}

impl Interpolate for Color32 {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        blend_color(*self, *to, t)
    }
}

impl Interpolate for Vec<Pos2> {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        if self.len() == to.len() {
            return self.iter().zip(to).map(|(a, b)| a.interpolate(b, t)).collect();
        }
        let from = resample(self, to.len());
        from.iter().zip(to).map(|(a, b)| a.interpolate(b, t)).collect()
    }
}

impl Interpolate for Shape {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        match (*self, *to) {
            (Shape::Rect { size: a }, Shape::Rect { size: b }) => Shape::Rect {
                size: a.interpolate(&b, t),
            },
            (Shape::Circle { radius: a }, Shape::Circle { radius: b }) => Shape::Circle {
                radius: a.interpolate(&b, t),
            },
            _ => *to,
        }
    }
}

impl Interpolate for LabelPlacement {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        LabelPlacement {
            anchor: self.anchor.interpolate(&to.anchor, t),
            angle: self.angle.interpolate(&to.angle, t),
            ..*to
        }
    }
}

impl Interpolate for NodeStyle {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        NodeStyle {
            fill: self.fill.interpolate(&to.fill, t),
            stroke: self.stroke.interpolate(&to.stroke, t),
            stroke_width: self.stroke_width.interpolate(&to.stroke_width, t),
            opacity: self.opacity.interpolate(&to.opacity, t),
            dash: to.dash,
        }
    }
}

impl Interpolate for EdgeStyle {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        EdgeStyle {
            color: self.color.interpolate(&to.color, t),
            width: self.width.interpolate(&to.width, t),
            opacity: self.opacity.interpolate(&to.opacity, t),
            ..*to
        }
    }
}

impl Interpolate for Option<BadgeStyle> {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        match (self, to) {
            (Some(from), Some(to)) => Some(BadgeStyle {
                opacity: from.opacity.interpolate(&to.opacity, t),
                ..*to
            }),
            _ => *to,
        }
    }
}

impl Interpolate for SceneNode {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        let mut label = to.label.clone();
        label.placement = self.label.placement.interpolate(&to.label.placement, t);
        SceneNode {
            center: self.center.interpolate(&to.center, t),
            shape: self.shape.interpolate(&to.shape, t),
            label,
            style: self.style.interpolate(&to.style, t),
            badge: self.badge.interpolate(&to.badge, t),
            ..to.clone()
        }
    }
}

impl Interpolate for SceneEdge {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        SceneEdge {
            points: self.points.interpolate(&to.points, t),
            style: self.style.interpolate(&to.style, t),
            ..to.clone()
        }
    }
}

/// An element together with how present it is: 0 while entering or after
/// exiting, 1 when fully shown.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Visual<T> {
    pub(crate) element: T,
    pub(crate) presence: f32,
}

impl<T: Interpolate> Interpolate for Visual<T> {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        Visual {
            element: self.element.interpolate(&to.element, t),
            presence: self.presence.interpolate(&to.presence, t),
        }
    }
}

/// Cubic ease-in-out.
pub(crate) fn ease(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Tween<T> {
    from: T,
    to: T,
    start: f64,
    duration: f64,
}

impl<T: Interpolate> Tween<T> {
    pub(crate) fn new(from: T, to: T, start: f64, duration: f64) -> Self {
        Self {
            from,
            to,
            start,
            duration,
        }
    }

    fn progress(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.start) / self.duration).clamp(0.0, 1.0) as f32
    }

    pub(crate) fn value(&self, now: f64) -> T {
        let t = ease(self.progress(now));
        if t >= 1.0 {
            self.to.clone()
        } else {
            self.from.interpolate(&self.to, t)
        }
    }

    pub(crate) fn target(&self) -> &T {
        &self.to
    }

    pub(crate) fn is_done(&self, now: f64) -> bool {
        self.progress(now) >= 1.0
    }

    /// Restarts from wherever the element currently is.
    pub(crate) fn retarget(&mut self, to: T, now: f64, duration: f64) {
        self.from = self.value(now);
        self.to = to;
        self.start = now;
        self.duration = duration;
    }

    /// Applies `update` to both ends, moving the element without restarting
    /// its transition.
    pub(crate) fn adjust(&mut self, mut update: impl FnMut(&mut T)) {
        update(&mut self.from);
        update(&mut self.to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ease_hits_the_ends_and_midpoint() {
        assert_eq!(ease(0.0), 0.0);
        assert_eq!(ease(1.0), 1.0);
        assert!((ease(0.5) - 0.5).abs() < 1e-6);
        assert!(ease(0.25) < 0.25);
    }

    #[test]
    fn retarget_starts_from_the_current_value() {
        let mut tween = Tween::new(0.0_f32, 10.0, 0.0, 1.0);
        let midway = tween.value(0.5);
        assert!((midway - 5.0).abs() < 1e-4);

        tween.retarget(20.0, 0.5, 1.0);
        assert!((tween.value(0.5) - midway).abs() < 1e-4);
        assert_eq!(tween.value(1.5), 20.0);
        assert!(tween.is_done(1.5));
        assert!(!tween.is_done(1.0));
    }

    #[test]
    fn zero_duration_snaps() {
        let tween = Tween::new(Pos2::ZERO, Pos2::new(4.0, 4.0), 3.0, 0.0);
        assert_eq!(tween.value(3.0), Pos2::new(4.0, 4.0));
    }

    #[test]
    fn mismatched_curves_are_resampled() {
        let from = vec![Pos2::new(0.0, 0.0), Pos2::new(10.0, 0.0)];
        let to = vec![Pos2::new(0.0, 10.0), Pos2::new(5.0, 10.0), Pos2::new(10.0, 10.0)];
        let halfway = from.interpolate(&to, 0.5);
        assert_eq!(halfway.len(), 3);
        assert!((halfway[1].x - 5.0).abs() < 1e-4);
        assert!((halfway[1].y - 5.0).abs() < 1e-4);
    }

    #[test]
    fn shape_kinds_switch_immediately() {
        let rect = Shape::Rect {
            size: Vec2::new(10.0, 10.0),
        };
        let circle = Shape::Circle { radius: 3.0 };
        assert_eq!(rect.interpolate(&circle, 0.1), circle);
    }
}
