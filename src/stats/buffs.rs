//! Buff & Debuff wrappers
//!
//! Maps the small set of named status effects onto stat modifier insertions.
//! Burn is the one exception: it is damage over time, so it resolves to a
//! `DotSpec` that the effect layer turns into a DOT sub-effect.
//!
//! ## Re-application policy (one per kind)
//! | Kind    | Policy  |
//! |---------|---------|
//! | Haste   | Refresh |
//! | Shield  | Refresh |
//! | Empower | Refresh |
//! | Slow    | Refresh |
//! | Freeze  | Refresh |
//! | Stun    | Ignore  |
//! | Burn    | Stack   |

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use super::modifier::{ModifierKey, ModifierOutcome, ReapplyPolicy, StatModifier};
use super::stat_sheet::StatType;
use crate::world::{EntityId, StatHost};

/// Modifiers produced by one status application.
pub type ModifierSet = SmallVec<[(StatType, StatModifier); 3]>;

/// Beneficial effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuffType {
    /// Attack and movement speed multiplied by `multiplier`
    Haste,
    /// Flat absorb of `magnitude` per hit
    Shield,
    /// Attack power multiplied by `multiplier`
    Empower,
}

impl BuffType {
    pub fn name(self) -> &'static str {
        match self {
            BuffType::Haste => "Haste",
            BuffType::Shield => "Shield",
            BuffType::Empower => "Empower",
        }
    }

    pub fn policy(self) -> ReapplyPolicy {
        ReapplyPolicy::Refresh
    }
}

/// Harmful effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebuffType {
    /// Movement speed multiplied by `multiplier` (0.6 = 40% slow)
    Slow,
    /// `magnitude` damage every `tick_interval` for `duration`
    Burn,
    /// Movement speed forced to zero
    Freeze,
    /// Movement and attack speed forced to zero, Stun stat raised
    Stun,
}

impl DebuffType {
    pub fn name(self) -> &'static str {
        match self {
            DebuffType::Slow => "Slow",
            DebuffType::Burn => "Burn",
            DebuffType::Freeze => "Freeze",
            DebuffType::Stun => "Stun",
        }
    }

    pub fn policy(self) -> ReapplyPolicy {
        match self {
            DebuffType::Slow | DebuffType::Freeze => ReapplyPolicy::Refresh,
            // No stun-lock: a stunned target cannot be re-stunned until it wears off
            DebuffType::Stun => ReapplyPolicy::Ignore,
            DebuffType::Burn => ReapplyPolicy::Stack,
        }
    }
}

/// Damage-over-time parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DotSpec {
    pub damage: f32,
    pub interval: f32,
    pub duration: f32,
}

/// One-shot buff request.
#[derive(Clone, Debug, PartialEq)]
pub struct BuffInfo {
    pub kind: BuffType,
    pub target: EntityId,
    pub magnitude: f32,
    pub multiplier: f32,
    pub duration: f32,
}

impl BuffInfo {
    pub fn modifiers(&self) -> ModifierSet {
        let key = ModifierKey::Buff(self.kind);
        let timed = |modifier: StatModifier| modifier.with_key(key.clone());
        match self.kind {
            BuffType::Haste => smallvec![
                (StatType::AttackSpeed, timed(StatModifier::multiplicative(self.multiplier, self.duration))),
                (StatType::MoveSpeed, timed(StatModifier::multiplicative(self.multiplier, self.duration))),
            ],
            BuffType::Shield => smallvec![
                (StatType::Shield, timed(StatModifier::additive(self.magnitude, self.duration))),
            ],
            BuffType::Empower => smallvec![
                (StatType::AttackPower, timed(StatModifier::multiplicative(self.multiplier, self.duration))),
            ],
        }
    }
}

/// One-shot debuff request.
#[derive(Clone, Debug, PartialEq)]
pub struct DebuffInfo {
    pub kind: DebuffType,
    pub target: EntityId,
    pub magnitude: f32,
    pub multiplier: f32,
    pub duration: f32,
    pub tick_interval: f32,
}

impl DebuffInfo {
    pub fn modifiers(&self) -> ModifierSet {
        let key = ModifierKey::Debuff(self.kind);
        let timed = |modifier: StatModifier| modifier.with_key(key.clone());
        match self.kind {
            DebuffType::Slow => smallvec![
                (StatType::MoveSpeed, timed(StatModifier::multiplicative(self.multiplier, self.duration))),
            ],
            DebuffType::Freeze => smallvec![
                (StatType::MoveSpeed, timed(StatModifier::multiplicative(0.0, self.duration))),
            ],
            DebuffType::Stun => smallvec![
                (StatType::Stun, timed(StatModifier::additive(1.0, self.duration))),
                (StatType::MoveSpeed, timed(StatModifier::multiplicative(0.0, self.duration))),
                (StatType::AttackSpeed, timed(StatModifier::multiplicative(0.0, self.duration))),
            ],
            DebuffType::Burn => SmallVec::new(),
        }
    }

    /// Tick damage parameters, only for Burn.
    pub fn dot_spec(&self) -> Option<DotSpec> {
        match self.kind {
            DebuffType::Burn => Some(DotSpec {
                damage: self.magnitude,
                interval: self.tick_interval,
                duration: self.duration,
            }),
            _ => None,
        }
    }
}

/// Insert every modifier of a buff. Returns the outcome of the first insertion;
/// all modifiers of one application share a key and duration, so they agree.
pub fn apply_buff<H: StatHost + ?Sized>(host: &mut H, info: &BuffInfo) -> ModifierOutcome {
    apply_set(host, info.target, info.modifiers(), info.kind.policy())
}

/// Insert the stat modifiers of a debuff. Burn inserts nothing here.
pub fn apply_debuff<H: StatHost + ?Sized>(host: &mut H, info: &DebuffInfo) -> ModifierOutcome {
    apply_set(host, info.target, info.modifiers(), info.kind.policy())
}

fn apply_set<H: StatHost + ?Sized>(
    host: &mut H,
    target: EntityId,
    modifiers: ModifierSet,
    policy: ReapplyPolicy,
) -> ModifierOutcome {
    let mut first = None;
    for (stat, modifier) in modifiers {
        let outcome = host.apply_modifier(target, stat, modifier, policy);
        first.get_or_insert(outcome);
    }
    first.unwrap_or(ModifierOutcome::Rejected)
}

fn default_multiplier() -> f32 {
    1.0
}

/// Authored status effect, as it appears in a template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StatusSpec {
    Buff {
        kind: BuffType,
        #[serde(default)]
        magnitude: f32,
        #[serde(default = "default_multiplier")]
        multiplier: f32,
        duration: f32,
    },
    Debuff {
        kind: DebuffType,
        #[serde(default)]
        magnitude: f32,
        #[serde(default = "default_multiplier")]
        multiplier: f32,
        duration: f32,
        #[serde(default)]
        tick_interval: f32,
    },
}

/// A status spec bound to a concrete target.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusRequest {
    Buff(BuffInfo),
    Debuff(DebuffInfo),
}

impl StatusSpec {
    pub fn for_target(&self, target: EntityId) -> StatusRequest {
        match *self {
            StatusSpec::Buff {
                kind,
                magnitude,
                multiplier,
                duration,
            } => StatusRequest::Buff(BuffInfo {
                kind,
                target,
                magnitude,
                multiplier,
                duration,
            }),
            StatusSpec::Debuff {
                kind,
                magnitude,
                multiplier,
                duration,
                tick_interval,
            } => StatusRequest::Debuff(DebuffInfo {
                kind,
                target,
                magnitude,
                multiplier,
                duration,
                tick_interval,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StatusSpec::Buff { kind, .. } => kind.name(),
            StatusSpec::Debuff { kind, .. } => kind.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debuff(kind: DebuffType) -> DebuffInfo {
        DebuffInfo {
            kind,
            target: EntityId(1),
            magnitude: 4.0,
            multiplier: 0.5,
            duration: 2.0,
            tick_interval: 0.5,
        }
    }

    #[test]
    fn test_stun_produces_three_keyed_modifiers() {
        let modifiers = debuff(DebuffType::Stun).modifiers();
        assert_eq!(modifiers.len(), 3);
        assert!(modifiers
            .iter()
            .all(|(_, m)| m.key == ModifierKey::Debuff(DebuffType::Stun)));
    }

    #[test]
    fn test_burn_maps_to_dot_not_modifiers() {
        let burn = debuff(DebuffType::Burn);
        assert!(burn.modifiers().is_empty());
        assert_eq!(
            burn.dot_spec(),
            Some(DotSpec {
                damage: 4.0,
                interval: 0.5,
                duration: 2.0
            })
        );
        assert_eq!(debuff(DebuffType::Slow).dot_spec(), None);
    }

    #[test]
    fn test_each_kind_has_one_policy() {
        assert_eq!(DebuffType::Stun.policy(), ReapplyPolicy::Ignore);
        assert_eq!(DebuffType::Burn.policy(), ReapplyPolicy::Stack);
        assert_eq!(DebuffType::Slow.policy(), ReapplyPolicy::Refresh);
        assert_eq!(BuffType::Haste.policy(), ReapplyPolicy::Refresh);
    }
}
