//! JSON scenario configuration
//!
//! A scenario places one caster and a set of enemies, then schedules casts
//! against them. Everything except the combatants has a default.

use std::fs;
use std::path::Path;

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::effects::template::DEFAULT_TEMPLATES_PATH;
use crate::error::ConfigError;
use crate::settings::DEFAULT_SETTINGS_PATH;
use crate::world::CombatantSpec;

/// One cast issued by the runner at a fixed simulation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCast {
    /// Seconds since the scenario started
    #[serde(default)]
    pub at_secs: f32,
    pub template: String,
    #[serde(default = "default_direction")]
    pub direction: [f32; 2],
    /// Index into `enemies`
    #[serde(default)]
    pub target: Option<usize>,
    /// Aim at the target instead of using `direction`
    #[serde(default)]
    pub aim_at_target: bool,
}

impl ScheduledCast {
    pub fn direction(&self) -> Vec2 {
        Vec2::from_array(self.direction)
    }
}

/// Scenario loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Template library (RON)
    #[serde(default = "default_templates_path")]
    pub templates_path: String,
    /// Engine settings (RON); defaults are used when the file is absent
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
    /// The caster; always on team 0
    pub player: CombatantSpec,
    pub enemies: Vec<CombatantSpec>,
    #[serde(default)]
    pub casts: Vec<ScheduledCast>,
    /// Hard stop in seconds (default: 60)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Seed for crit/evasion rolls; entropy when absent
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Where to write the combat log JSON
    #[serde(default)]
    pub output_path: Option<String>,
    /// Ticks per second; the engine settings' rate when absent
    #[serde(default)]
    pub tick_rate: Option<f32>,
}

fn default_direction() -> [f32; 2] {
    [1.0, 0.0]
}

fn default_templates_path() -> String {
    DEFAULT_TEMPLATES_PATH.to_string()
}

fn default_settings_path() -> String {
    DEFAULT_SETTINGS_PATH.to_string()
}

fn default_max_duration() -> f32 {
    60.0
}

impl ScenarioConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_json(&contents).map_err(|e| match e {
            ConfigError::Json { source, .. } => ConfigError::Json {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: ScenarioConfig =
            serde_json::from_str(json).map_err(|source| ConfigError::Json {
                path: "<inline>".into(),
                source,
            })?;
        config.player.team = 0;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enemies.is_empty() {
            return Err(ConfigError::invalid("scenario needs at least one enemy"));
        }
        for enemy in &self.enemies {
            if enemy.team == self.player.team {
                return Err(ConfigError::invalid(format!(
                    "enemy '{}' is on the player's team {}",
                    enemy.name, enemy.team
                )));
            }
        }
        for combatant in std::iter::once(&self.player).chain(&self.enemies) {
            if !(combatant.health > 0.0) {
                return Err(ConfigError::invalid(format!(
                    "'{}' must start with positive health",
                    combatant.name
                )));
            }
        }

        for (i, cast) in self.casts.iter().enumerate() {
            if cast.template.is_empty() {
                return Err(ConfigError::invalid(format!("cast {} has no template", i)));
            }
            if !(cast.at_secs >= 0.0) {
                return Err(ConfigError::invalid(format!(
                    "cast {} ({}) has a negative time",
                    i, cast.template
                )));
            }
            if let Some(target) = cast.target {
                if target >= self.enemies.len() {
                    return Err(ConfigError::invalid(format!(
                        "cast {} target {} is out of range ({} enemies)",
                        i,
                        target,
                        self.enemies.len()
                    )));
                }
            }
        }

        if !(self.max_duration_secs > 0.0) {
            return Err(ConfigError::invalid("max_duration_secs must be positive"));
        }
        if let Some(rate) = self.tick_rate {
            if !(rate > 0.0 && rate.is_finite()) {
                return Err(ConfigError::invalid("tick_rate must be positive"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "player": { "name": "Hero", "position": [0.0, 0.0], "health": 100.0 },
        "enemies": [
            { "name": "Grunt", "team": 1, "position": [2.0, 0.0], "health": 50.0 }
        ],
        "casts": [ { "template": "cleave", "target": 0 } ]
    }"#;

    #[test]
    fn test_defaults_fill_in() {
        let config = ScenarioConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.templates_path, DEFAULT_TEMPLATES_PATH);
        assert_eq!(config.max_duration_secs, 60.0);
        assert_eq!(config.casts[0].direction(), Vec2::X);
        assert_eq!(config.enemies[0].radius, 0.5);
        assert!(config.random_seed.is_none());
    }

    #[test]
    fn test_target_out_of_range_is_rejected() {
        let json = MINIMAL.replace("\"target\": 0", "\"target\": 3");
        let err = ScenarioConfig::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_enemy_on_player_team_is_rejected() {
        let json = MINIMAL.replace("\"team\": 1", "\"team\": 0");
        assert!(ScenarioConfig::from_json(&json).is_err());
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let err = ScenarioConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }
}
