//! Headless mode for scripted effect scenarios
//!
//! Runs a scenario (one caster, a set of enemies, a timeline of casts) without
//! any graphical output, suitable for automated testing and balancing.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --scenario assets/scenarios/cleave_chain.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "player": { "name": "Hero", "position": [0.0, 0.0], "health": 100.0 },
//!   "enemies": [
//!     { "name": "Grunt", "team": 1, "position": [2.0, 0.0], "health": 60.0 }
//!   ],
//!   "casts": [ { "at_secs": 0.0, "template": "cleave", "direction": [1.0, 0.0] } ],
//!   "max_duration_secs": 30,
//!   "random_seed": 42
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::{ScenarioConfig, ScheduledCast};
pub use runner::{
    run_headless_scenario, CastSchedule, HeadlessPlugin, HeadlessScenarioState, ScenarioOutcome,
    ScenarioResult, ScenarioRoster, ScenarioRunner,
};
