//! Engine events
//!
//! Emitted by the effect engine during an operation and drained by the host
//! (the Bevy plugin forwards them as Bevy events).

use bevy::prelude::*;

use crate::effects::AttackId;
use crate::world::EntityId;

#[derive(Event, Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// An instance was taken from the pool and initialised
    Spawned {
        attack: AttackId,
        template: String,
        parent: Option<AttackId>,
    },
    /// Every behavior of the instance has run `activate`
    Activated { attack: AttackId },
    Hit {
        attack: AttackId,
        target: EntityId,
        damage: f32,
        critical: bool,
        evaded: bool,
        killed: bool,
    },
    Deactivated { attack: AttackId, template: String },
    /// Returned to the free list at the end-of-operation sweep
    Pooled { attack: AttackId, template: String },
    /// A cast or spawn named a template the repository doesn't know
    TemplateMissing { template: String },
}

impl EngineEvent {
    pub fn attack(&self) -> Option<AttackId> {
        match self {
            EngineEvent::Spawned { attack, .. }
            | EngineEvent::Activated { attack }
            | EngineEvent::Hit { attack, .. }
            | EngineEvent::Deactivated { attack, .. }
            | EngineEvent::Pooled { attack, .. } => Some(*attack),
            EngineEvent::TemplateMissing { .. } => None,
        }
    }
}
