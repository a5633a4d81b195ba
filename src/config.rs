//! Simulation Configuration
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Loaded from JSON.

use std::path::Path;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::Vec2;
use crate::game::camera::{DEFAULT_MAX_OFFSET, DEFAULT_VIEW_HEIGHT, DEFAULT_VIEW_WIDTH};
use crate::game::level::TilePalette;
use crate::{TICK_RATE, TILE_SIZE};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config is not valid JSON for [`SimConfig`].
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Level building options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Tile edge in pixels
    pub tile_size: f32,
    /// Layout colors
    pub palette: TilePalette,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self { tile_size: TILE_SIZE, palette: TilePalette::default() }
    }
}

/// Camera options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// View width in pixels
    pub width: f32,
    /// View height in pixels
    pub height: f32,
    /// Maximum vertical trail behind the target
    pub max_offset: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEW_WIDTH,
            height: DEFAULT_VIEW_HEIGHT,
            max_offset: DEFAULT_MAX_OFFSET,
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks per second, carried on every `Tick`
    pub tick_rate: u32,
    /// Level options
    pub level: LevelConfig,
    /// Camera options
    pub camera: CameraConfig,
    /// Where new characters appear
    pub spawn: Vec2,
    /// Name for joined players; `{}` is replaced by the player number
    pub player_name: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            level: LevelConfig::default(),
            camera: CameraConfig::default(),
            spawn: Vec2::new(600.0, 32.0),
            player_name: "player{}".to_string(),
        }
    }
}

impl SimConfig {
    /// Parse and validate JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be positive".into()));
        }
        if !positive(self.level.tile_size) {
            return Err(ConfigError::Invalid(format!("tile_size {} must be positive", self.level.tile_size)));
        }
        if !positive(self.camera.width) || !positive(self.camera.height) {
            return Err(ConfigError::Invalid(format!(
                "camera size {}x{} must be positive",
                self.camera.width, self.camera.height
            )));
        }
        if self.camera.max_offset.is_nan() || self.camera.max_offset < 0.0 {
            return Err(ConfigError::Invalid("camera max_offset must not be negative".into()));
        }
        Ok(())
    }

    /// Display name for the `number`th player.
    pub fn player_name_for(&self, number: u32) -> String {
        self.player_name.replace("{}", &number.to_string())
    }
}

/// Finite and above zero.
fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimConfig::default();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.level.tile_size, 8.0);
        assert_eq!(config.camera.width, 1280.0);
        assert_eq!(config.spawn, Vec2::new(600.0, 32.0));
        assert_eq!(config.player_name_for(1), "player1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SimConfig::from_json_str(r#"{ "camera": { "max_offset": 50.0 }, "player_name": "ninja" }"#).unwrap();
        assert_eq!(config.camera.max_offset, 50.0);
        assert_eq!(config.camera.height, 720.0);
        assert_eq!(config.player_name_for(2), "ninja");
        assert_eq!(config.level, LevelConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(SimConfig::from_json_str(r#"{ "tick_rate": 0 }"#), Err(ConfigError::Invalid(_))));
        assert!(matches!(
            SimConfig::from_json_str(r#"{ "level": { "tile_size": -1.0 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(SimConfig::from_json_str("{ nope"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(SimConfig::from_file("/nonexistent/kunai.json"), Err(ConfigError::Io(_))));
    }
}
