//! Attack effect execution
//!
//! - `template`: authored, immutable effect descriptions and the library
//! - `attack`: live instances with generational handles
//! - `factory`: arena, per-template free lists and the active registry
//! - `component`: the behavior trait and the shared phase clock
//! - `context`: what a behavior may touch during a call
//! - `engine`: the tick scheduler and the public operations
//! - `behaviors`: every concrete effect kind

pub mod attack;
pub mod behaviors;
pub mod component;
pub mod context;
pub mod engine;
pub mod factory;
pub mod template;

pub use attack::{Attack, AttackId, Lifecycle};
pub use behaviors::BehaviorSpec;
pub use component::{AttackComponent, EffectEvent, Phase, PhaseClock};
pub use context::{CastRequest, EffectCommand, EffectContext, SpawnRequest};
pub use engine::EffectEngine;
pub use factory::{AttackFactory, InstanceInit};
pub use template::{
    load_template_library, EffectTemplate, TemplateLibrary, TemplateRepository, TemplateVisuals,
    TemplatesConfig,
};
