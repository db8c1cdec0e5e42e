//! Command-line interface for stormcall
//!
//! Runs a JSON scenario headless; flags override the scenario's own paths.

use clap::Parser;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::headless::ScenarioConfig;

/// Attack effect engine scenario runner
#[derive(Parser, Debug)]
#[command(name = "stormcall")]
#[command(about = "Run attack effect scenarios headless")]
#[command(version)]
pub struct Args {
    /// Scenario JSON file
    #[arg(long, value_name = "SCENARIO_FILE")]
    pub scenario: PathBuf,

    /// Template library (RON), overrides the scenario's `templates_path`
    #[arg(long, value_name = "TEMPLATES_FILE")]
    pub templates: Option<PathBuf>,

    /// Engine settings (RON), overrides the scenario's `settings_path`
    #[arg(long, value_name = "SETTINGS_FILE")]
    pub settings: Option<PathBuf>,

    /// Output path for the combat log
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Maximum scenario duration in seconds
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Seed for crit/evasion rolls
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Args {
    /// Load the scenario and apply command-line overrides.
    pub fn load_scenario(&self) -> Result<ScenarioConfig, ConfigError> {
        let mut config = ScenarioConfig::load_from_file(&self.scenario)?;
        if let Some(path) = &self.templates {
            config.templates_path = path.to_string_lossy().to_string();
        }
        if let Some(path) = &self.settings {
            config.settings_path = path.to_string_lossy().to_string();
        }
        if let Some(path) = &self.output {
            config.output_path = Some(path.to_string_lossy().to_string());
        }
        if let Some(max) = self.max_duration {
            config.max_duration_secs = max;
        }
        if self.seed.is_some() {
            config.random_seed = self.seed;
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn parse_args() -> Args {
    Args::parse()
}
