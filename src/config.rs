//! Runtime settings, read from an optional TOML file. Every field has a
//! default, so a partial file (or none at all) is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::camera::MotionTuning;
use crate::renderer::{BackdropColors, ProjectionParams};
use crate::texture::Rgb;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub window: WindowConfig,
    pub render: RenderConfig,
    pub player: PlayerConfig,
    pub frame: FrameConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Height of the internal render target; width follows the window aspect.
    pub internal_height: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "gridcaster".into(),
            width: 1280,
            height: 720,
            internal_height: 480,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub projection_scale: f64,
    pub fog_distance: f64,
    pub fog_rate: f64,
    pub ceiling_top: Rgb,
    pub ceiling_bottom: Rgb,
    pub floor_top: Rgb,
    pub floor_bottom: Rgb,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let projection = ProjectionParams::default();
        let colors = BackdropColors::default();
        Self {
            projection_scale: projection.projection_scale,
            fog_distance: projection.fog_distance,
            fog_rate: projection.fog_rate,
            ceiling_top: colors.ceiling_top,
            ceiling_bottom: colors.ceiling_bottom,
            floor_top: colors.floor_top,
            floor_bottom: colors.floor_bottom,
        }
    }
}

impl RenderConfig {
    pub fn projection(&self) -> ProjectionParams {
        ProjectionParams {
            projection_scale: self.projection_scale,
            fog_distance: self.fog_distance,
            fog_rate: self.fog_rate,
        }
    }

    pub fn backdrop_colors(&self) -> BackdropColors {
        BackdropColors {
            ceiling_top: self.ceiling_top,
            ceiling_bottom: self.ceiling_bottom,
            floor_top: self.floor_top,
            floor_bottom: self.floor_bottom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    pub speed: f64,
    pub rotation_speed: f64,
    pub turn_rate: f64,
    pub focal_length: f64,
    pub focal_step: f64,
    pub focal_min: f64,
    pub focal_max: f64,
    /// Heading at spawn, radians. Map files carry no orientation.
    pub spawn_orientation: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let motion = MotionTuning::default();
        Self {
            speed: motion.speed,
            rotation_speed: motion.rotation_speed,
            turn_rate: motion.turn_rate,
            focal_length: 1.0,
            focal_step: 0.05,
            focal_min: motion.focal_min,
            focal_max: motion.focal_max,
            spawn_orientation: 0.0,
        }
    }
}

impl PlayerConfig {
    pub fn motion(&self) -> MotionTuning {
        MotionTuning {
            speed: self.speed,
            rotation_speed: self.rotation_speed,
            turn_rate: self.turn_rate,
            focal_min: self.focal_min,
            focal_max: self.focal_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    pub min_interval_ms: u64,
    pub idle_sleep_ms: u64,
    pub max_delta_ms: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 5,
            idle_sleep_ms: 2,
            max_delta_ms: 100,
        }
    }
}

impl FrameConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    pub fn max_delta(&self) -> Duration {
        Duration::from_millis(self.max_delta_ms)
    }
}

impl Config {
    /// Read `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key, reason: &str| {
            Err(ConfigError::Invalid {
                key,
                reason: reason.to_string(),
            })
        };
        let positive = |v: f64| v.is_finite() && v > 0.0;

        if self.window.width == 0 || self.window.height == 0 {
            return invalid("window.width/height", "must be positive");
        }
        if self.window.internal_height == 0 {
            return invalid("window.internal_height", "must be positive");
        }
        if !positive(self.render.projection_scale) {
            return invalid("render.projection_scale", "must be a positive number");
        }
        if !positive(self.render.fog_distance) || !(self.render.fog_rate >= 0.0) {
            return invalid("render.fog_distance/fog_rate", "must be positive");
        }
        if !positive(self.player.speed) || !positive(self.player.rotation_speed) {
            return invalid("player.speed/rotation_speed", "must be positive");
        }
        if !self.player.turn_rate.is_finite() || !self.player.focal_step.is_finite() {
            return invalid("player.turn_rate/focal_step", "must be finite");
        }
        if !positive(self.player.focal_min) || !(self.player.focal_max >= self.player.focal_min) {
            return invalid("player.focal_min/focal_max", "need 0 < focal_min <= focal_max");
        }
        if !self.player.focal_length.is_finite() {
            return invalid("player.focal_length", "must be finite");
        }
        if self.frame.max_delta_ms == 0 {
            return invalid("frame.max_delta_ms", "must be positive");
        }
        Ok(())
    }
}
