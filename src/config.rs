use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Every tunable of the engine. Each section and field is defaulted, so a
/// partial JSON document overrides only what it names.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub rank: RankSpacing,
    pub force: ForceConfig,
    pub radial: RadialConfig,
    pub pack: PackConfig,
    pub dims: DimLevels,
    pub style: StyleConfig,
    pub transition: TransitionConfig,
}

impl AtlasConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid atlas config JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RankSpacing {
    pub rank_sep: f32,
    pub node_sep: f32,
    pub edge_sep: f32,
    pub margin_x: f32,
    pub margin_y: f32,
    pub container_padding: f32,
    pub leaf_height: f32,
    pub min_leaf_width: f32,
    pub char_width: f32,
}

impl Default for RankSpacing {
    fn default() -> Self {
        Self {
            rank_sep: 80.0,
            node_sep: 24.0,
            edge_sep: 12.0,
            margin_x: 20.0,
            margin_y: 20.0,
            container_padding: 20.0,
            leaf_height: 36.0,
            min_leaf_width: 140.0,
            char_width: 8.0,
        }
    }
}

impl RankSpacing {
    pub fn leaf_width(&self, name: &str) -> f32 {
        self.min_leaf_width
            .max(name.chars().count() as f32 * self.char_width)
    }

    pub(crate) fn is_finite(&self) -> bool {
        [
            self.rank_sep,
            self.node_sep,
            self.edge_sep,
            self.margin_x,
            self.margin_y,
            self.container_padding,
            self.leaf_height,
            self.min_leaf_width,
            self.char_width,
        ]
        .iter()
        .all(|value| value.is_finite() && *value >= 0.0)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    pub repulsion: f32,
    pub softening: f32,
    pub spring_length: f32,
    pub spring_strength: f32,
    pub spring_damping: f32,
    pub center_strength: f32,
    /// Collision radius is `sqrt(size) * collision_scale + collision_base`.
    pub collision_scale: f32,
    pub collision_base: f32,
    pub collision_strength: f32,
    pub velocity_damping: f32,
    pub max_speed: f32,
    pub max_ticks: usize,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub ticks_per_frame: usize,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            repulsion: 78_000.0,
            softening: 620.0,
            spring_length: 96.0,
            spring_strength: 0.016,
            spring_damping: 0.22,
            center_strength: 0.0011,
            collision_scale: 1.6,
            collision_base: 8.0,
            collision_strength: 1.9,
            velocity_damping: 0.9,
            max_speed: 26.0,
            max_ticks: 300,
            alpha_decay: 0.0228,
            alpha_min: 0.001,
            ticks_per_frame: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RadialConfig {
    /// Outer ring radius; `None` fits the ring into the viewport.
    pub radius: Option<f32>,
    pub node_radius: f32,
    pub label_offset: f32,
}

impl Default for RadialConfig {
    fn default() -> Self {
        Self {
            radius: None,
            node_radius: 4.5,
            label_offset: 6.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    pub padding: f32,
    pub container_label_min_radius: f32,
    pub leaf_label_min_radius: f32,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            padding: 3.0,
            container_label_min_radius: 28.0,
            leaf_label_min_radius: 12.0,
        }
    }
}

/// Opacity each de-emphasis trigger applies to elements outside its set.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DimLevels {
    pub focus: f32,
    pub path_exclusion: f32,
    pub hover: f32,
}

impl Default for DimLevels {
    fn default() -> Self {
        Self {
            focus: 0.2,
            path_exclusion: 0.1,
            hover: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub container_focus_opacity: f32,
    pub weight_opacity_floor: f32,
    pub weight_opacity_ceiling: f32,
    pub expanding_badge_opacity: f32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            container_focus_opacity: 0.5,
            weight_opacity_floor: 0.2,
            weight_opacity_ceiling: 1.0,
            expanding_badge_opacity: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub duration_secs: f64,
    /// Points per rendered edge curve; transitions interpolate point-wise.
    pub curve_samples: usize,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration_secs: 0.45,
            curve_samples: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = AtlasConfig::from_json(r#"{"dims": {"focus": 0.3}, "rank": {"rank_sep": 120}}"#)
            .expect("valid config");

        assert_eq!(config.dims.focus, 0.3);
        assert_eq!(config.dims.path_exclusion, 0.1);
        assert_eq!(config.dims.hover, 0.05);
        assert_eq!(config.rank.rank_sep, 120.0);
        assert_eq!(config.rank.node_sep, RankSpacing::default().node_sep);
        assert_eq!(config.force, ForceConfig::default());
    }

    #[test]
    fn leaf_width_has_a_floor() {
        let spacing = RankSpacing::default();
        assert_eq!(spacing.leaf_width("run"), 140.0);
        assert_eq!(spacing.leaf_width(&"x".repeat(30)), 240.0);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(AtlasConfig::from_json("{ not json").is_err());
    }
}
