//! Host services
//!
//! The effect engine never owns entities, positions or health. Everything it
//! needs from the surrounding game is consumed through the narrow traits in
//! this module:
//!
//! - `EntityHost`: positions and liveness
//! - `SpatialQuery`: distance-ordered "who is near whom"
//! - `StatHost`: effective stat values and timed modifiers
//! - `DamagePipeline`: final damage, crit and evasion
//! - `VisualHost`: presentation handles, decoupled from effect logic
//!
//! `CombatHost` bundles all of them; `Arena` is the reference implementation
//! used by the headless runner and the tests.

pub mod arena;
pub mod rng;

use std::fmt;

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::effects::Attack;
use crate::stats::{ModifierOutcome, ReapplyPolicy, StatModifier, StatType};
use crate::targeting::{AreaShape, TargetSet};

pub use arena::{Arena, Combatant, CombatantSpec};
pub use rng::GameRng;

/// Host entity handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Never issued by a host; marks an unowned (pooled) instance.
    pub const INVALID: EntityId = EntityId(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of one `DamagePipeline::process_hit` call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AttackResult {
    /// Damage actually removed from the target's health
    pub total_damage: f32,
    pub is_critical: bool,
    pub is_evaded: bool,
    /// False when the hit killed the target (or it was already gone)
    pub target_alive: bool,
}

/// Authored presentation asset name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisualHandle(pub String);

impl VisualHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A live presentation object owned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VisualId(pub u32);

/// Entity transforms and liveness.
pub trait EntityHost {
    fn position(&self, entity: EntityId) -> Option<Vec2>;
    fn set_position(&mut self, entity: EntityId, position: Vec2);
    /// Present in the world and not dead.
    fn is_alive(&self, entity: EntityId) -> bool;
    fn body_radius(&self, entity: EntityId) -> f32;
    /// Human-readable name for logs.
    fn describe(&self, entity: EntityId) -> String {
        entity.to_string()
    }
}

/// Spatial queries. Every result is ordered by ascending distance, ties broken
/// by entity id.
pub trait SpatialQuery: EntityHost {
    /// Live entities hostile to `entity`, in the host's registry order.
    fn enemies_of(&self, entity: EntityId) -> Vec<EntityId>;

    /// Live enemies of `owner` whose body overlaps a circle of `radius` at `center`.
    fn enemies_within(&self, owner: EntityId, center: Vec2, radius: f32) -> TargetSet {
        self.overlap(owner, &AreaShape::Circle { radius }, center, Vec2::X)
    }

    /// The `count` live enemies of `owner` nearest to `center`.
    fn nearest_enemies(&self, owner: EntityId, center: Vec2, count: usize) -> TargetSet {
        let mut set = TargetSet::from_positions(
            center,
            self.enemies_of(owner)
                .into_iter()
                .filter_map(|enemy| self.position(enemy).map(|position| (enemy, position))),
        );
        set.truncate(count);
        set
    }

    /// Live enemies of `owner` overlapping `shape` placed at `center`.
    fn overlap(&self, owner: EntityId, shape: &AreaShape, center: Vec2, facing: Vec2) -> TargetSet {
        TargetSet::from_positions(
            center,
            self.enemies_of(owner).into_iter().filter_map(|enemy| {
                let position = self.position(enemy)?;
                shape
                    .contains(center, facing, position, self.body_radius(enemy))
                    .then_some((enemy, position))
            }),
        )
    }
}

/// Stat sheets of host entities.
pub trait StatHost {
    /// Effective value (base combined with live modifiers).
    fn stat(&self, entity: EntityId, stat: StatType) -> f32;
    fn apply_modifier(
        &mut self,
        entity: EntityId,
        stat: StatType,
        modifier: StatModifier,
        policy: ReapplyPolicy,
    ) -> ModifierOutcome;
    fn set_base_stat(&mut self, entity: EntityId, stat: StatType, value: f32);
}

/// Final damage resolution. Owns all mitigation, crit and evasion math.
pub trait DamagePipeline {
    fn process_hit(&mut self, attack: &Attack, target: EntityId) -> AttackResult;
}

/// Presentation playback.
pub trait VisualHost {
    fn spawn_visual(&mut self, handle: &VisualHandle, at: Vec2) -> Option<VisualId>;
    fn move_visual(&mut self, visual: VisualId, to: Vec2);
    fn stop_visual(&mut self, visual: VisualId);
    /// Fire-and-forget connector between two points (chain hops).
    fn play_beam(&mut self, handle: &VisualHandle, from: Vec2, to: Vec2);
}

/// Everything the effect engine consumes from its host.
pub trait CombatHost: SpatialQuery + StatHost + DamagePipeline + VisualHost {}

impl<T: SpatialQuery + StatHost + DamagePipeline + VisualHost> CombatHost for T {}
