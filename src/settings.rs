//! Engine settings
//!
//! Tuning knobs that are not part of any single template: pool prewarming,
//! flush limits, nesting depth and the template used for burn damage.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default location of the engine settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "assets/config/engine.ron";

#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Instances to construct per template before the first cast
    pub prewarm: HashMap<String, usize>,
    /// Commands processed per flush before the rest is deferred to the next one
    pub max_commands_per_flush: usize,
    /// Deepest allowed nesting of spawned sub-effects (top-level casts are 0)
    pub max_spawn_depth: u8,
    /// Template spawned for the Burn debuff; receives the DOT parameters
    pub burn_template: String,
    /// Fixed simulation rate used by the headless runner, ticks per second
    pub default_tick_rate: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            prewarm: HashMap::new(),
            max_commands_per_flush: 4096,
            max_spawn_depth: 4,
            burn_template: "burn".to_string(),
            default_tick_rate: 60.0,
        }
    }
}

impl EngineSettings {
    /// Load settings from file, or return defaults if the file is missing or
    /// malformed.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No engine settings at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::try_load(path) {
            Ok(settings) => {
                info!("Loaded engine settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("{}; using default engine settings", e);
                Self::default()
            }
        }
    }

    /// Strict variant of `load`.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let settings: Self = ron::from_str(&contents).map_err(|source| ConfigError::Ron {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_commands_per_flush == 0 {
            return Err(ConfigError::invalid("max_commands_per_flush must be at least 1"));
        }
        if !(self.default_tick_rate > 0.0 && self.default_tick_rate.is_finite()) {
            return Err(ConfigError::invalid(format!(
                "default_tick_rate must be positive, got {}",
                self.default_tick_rate
            )));
        }
        Ok(())
    }

    /// Fixed timestep derived from `default_tick_rate`.
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.default_tick_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: EngineSettings = ron::from_str("(max_spawn_depth: 2)").unwrap();
        assert_eq!(settings.max_spawn_depth, 2);
        assert_eq!(settings.burn_template, "burn");
        assert_eq!(settings.max_commands_per_flush, 4096);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = EngineSettings::load("does/not/exist.ron");
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        let settings = EngineSettings {
            default_tick_rate: 0.0,
            ..EngineSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
