//! Stormcall - attack effect execution engine
//!
//! Templates describe attacks as a list of composable behaviors (sweeps,
//! projectiles, fields, chains, orbits, buffs). The engine instantiates them
//! from pooled storage, drives their phases every tick against an injected
//! host, and tears down whole effect trees when a parent ends.
//!
//! This library exposes the engine, the reference `Arena` host and the
//! headless scenario runner for testing and reuse.

pub mod cli;
pub mod combat;
pub mod effects;
pub mod error;
pub mod headless;
pub mod settings;
pub mod stats;
pub mod targeting;
pub mod world;

// Re-export commonly used types
pub use combat::events::EngineEvent;
pub use combat::log::{CombatLog, CombatLogEventType};
pub use combat::{CastEvent, EffectEnginePlugin, SimulationSpeed};
pub use effects::{AttackId, CastRequest, EffectEngine, EffectTemplate, TemplateLibrary};
pub use error::ConfigError;
pub use headless::{ScenarioConfig, ScenarioResult, ScenarioRunner};
pub use settings::EngineSettings;
pub use world::{Arena, CombatHost, EntityId};
