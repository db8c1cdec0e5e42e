//! Stat sheet
//!
//! Base values plus a list of timed modifiers. The effective value of a stat is
//! `(base + sum(additive)) * product(multiplicative)`, with multipliers applied
//! in the order they were inserted. Expired modifiers never contribute, even
//! before the next `tick` sweeps them out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::modifier::{ModifierKey, ModifierOp, ModifierOutcome, ReapplyPolicy, StatModifier};

/// Every stat an entity or an attack instance can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatType {
    /// Raw damage an attack instance hands to the damage pipeline
    AttackPower,
    AttackSpeed,
    MoveSpeed,
    /// Flat damage reduction per hit
    Defense,
    /// Flat absorb per hit, stacked on top of defense
    Shield,
    /// 0.0 - 1.0
    CritChance,
    CritMultiplier,
    /// 0.0 - 1.0 chance to evade a hit entirely
    Evasion,
    MaxHealth,
    /// > 0 means stunned
    Stun,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct ModifierEntry {
    stat: StatType,
    modifier: StatModifier,
}

/// Base values and active modifiers for one entity or attack instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatSheet {
    base: BTreeMap<StatType, f32>,
    modifiers: Vec<ModifierEntry>,
}

impl StatSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sheet seeded with base values.
    pub fn from_base(values: impl IntoIterator<Item = (StatType, f32)>) -> Self {
        Self {
            base: values.into_iter().collect(),
            modifiers: Vec::new(),
        }
    }

    pub fn set_base(&mut self, stat: StatType, value: f32) {
        self.base.insert(stat, value);
    }

    /// Base value of a stat, 0.0 when never set.
    pub fn base(&self, stat: StatType) -> f32 {
        self.base.get(&stat).copied().unwrap_or(0.0)
    }

    /// Insert a modifier that always stacks independently.
    pub fn add_modifier(&mut self, stat: StatType, modifier: StatModifier) -> ModifierOutcome {
        self.apply_modifier(stat, modifier, ReapplyPolicy::Stack)
    }

    /// Insert a modifier honoring a re-application policy.
    ///
    /// Anonymous modifiers always stack regardless of `policy`.
    pub fn apply_modifier(
        &mut self,
        stat: StatType,
        modifier: StatModifier,
        policy: ReapplyPolicy,
    ) -> ModifierOutcome {
        if modifier.is_expired() {
            return ModifierOutcome::Rejected;
        }

        if modifier.key != ModifierKey::Anonymous && policy != ReapplyPolicy::Stack {
            let existing = self.modifiers.iter_mut().find(|entry| {
                entry.stat == stat && entry.modifier.key == modifier.key && !entry.modifier.is_expired()
            });
            if let Some(entry) = existing {
                return match policy {
                    ReapplyPolicy::Refresh => {
                        entry.modifier.refresh_from(&modifier);
                        ModifierOutcome::Refreshed
                    }
                    _ => ModifierOutcome::Ignored,
                };
            }
        }

        self.modifiers.push(ModifierEntry { stat, modifier });
        ModifierOutcome::Added
    }

    /// Effective value: all additive modifiers first, then all multiplicative
    /// modifiers in insertion order.
    pub fn effective(&self, stat: StatType) -> f32 {
        let live = || {
            self.modifiers
                .iter()
                .filter(move |entry| entry.stat == stat && !entry.modifier.is_expired())
        };

        let additive: f32 = live()
            .filter(|entry| entry.modifier.op == ModifierOp::Additive)
            .map(|entry| entry.modifier.magnitude)
            .sum();

        live()
            .filter(|entry| entry.modifier.op == ModifierOp::Multiplicative)
            .fold(self.base(stat) + additive, |value, entry| {
                value * entry.modifier.magnitude
            })
    }

    /// Count every modifier down by `dt` and drop the expired ones.
    ///
    /// Returns how many modifiers expired this tick.
    pub fn tick(&mut self, dt: f32) -> usize {
        let before = self.modifiers.len();
        for entry in self.modifiers.iter_mut() {
            entry.modifier.tick(dt);
        }
        self.modifiers.retain(|entry| !entry.modifier.is_expired());
        before - self.modifiers.len()
    }

    /// Number of live modifiers across all stats.
    pub fn modifier_count(&self) -> usize {
        self.modifiers
            .iter()
            .filter(|entry| !entry.modifier.is_expired())
            .count()
    }

    /// Live modifiers on one stat, in insertion order.
    pub fn modifiers_for(&self, stat: StatType) -> impl Iterator<Item = &StatModifier> {
        self.modifiers
            .iter()
            .filter(move |entry| entry.stat == stat && !entry.modifier.is_expired())
            .map(|entry| &entry.modifier)
    }

    pub fn has_modifier(&self, key: &ModifierKey) -> bool {
        self.modifiers
            .iter()
            .any(|entry| &entry.modifier.key == key && !entry.modifier.is_expired())
    }

    /// Drop every modifier and keep the base values.
    pub fn clear_modifiers(&mut self) {
        self.modifiers.clear();
    }

    /// Replace base values and drop modifiers (used when an instance is recycled).
    pub fn reset_to(&mut self, values: impl IntoIterator<Item = (StatType, f32)>) {
        self.base.clear();
        self.base.extend(values);
        self.modifiers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_additive_applies_before_multiplicative() {
        let mut sheet = StatSheet::from_base([(StatType::AttackPower, 10.0)]);
        sheet.add_modifier(StatType::AttackPower, StatModifier::multiplicative(2.0, 5.0));
        sheet.add_modifier(StatType::AttackPower, StatModifier::additive(5.0, 5.0));

        // (10 + 5) * 2, not 10 * 2 + 5
        assert_eq!(sheet.effective(StatType::AttackPower), 30.0);
    }

    #[test]
    fn test_unset_stat_reads_zero() {
        let sheet = StatSheet::new();
        assert_eq!(sheet.effective(StatType::Shield), 0.0);
    }

    #[test]
    fn test_tick_removes_expired_modifiers() {
        let mut sheet = StatSheet::from_base([(StatType::MoveSpeed, 4.0)]);
        sheet.add_modifier(StatType::MoveSpeed, StatModifier::multiplicative(0.5, 1.0));
        sheet.add_modifier(StatType::MoveSpeed, StatModifier::additive(1.0, 2.0));

        assert_eq!(sheet.tick(1.0), 1);
        assert_eq!(sheet.modifier_count(), 1);
        assert_eq!(sheet.effective(StatType::MoveSpeed), 5.0);
    }

    #[test]
    fn test_refresh_policy_keeps_single_entry() {
        let mut sheet = StatSheet::from_base([(StatType::MoveSpeed, 4.0)]);
        let key = ModifierKey::Named("frost".to_string());
        let first = StatModifier::multiplicative(0.5, 1.0).with_key(key.clone());
        let second = StatModifier::multiplicative(0.5, 3.0).with_key(key);

        assert_eq!(
            sheet.apply_modifier(StatType::MoveSpeed, first, ReapplyPolicy::Refresh),
            ModifierOutcome::Added
        );
        assert_eq!(
            sheet.apply_modifier(StatType::MoveSpeed, second, ReapplyPolicy::Refresh),
            ModifierOutcome::Refreshed
        );
        assert_eq!(sheet.modifier_count(), 1);
        assert_eq!(sheet.effective(StatType::MoveSpeed), 2.0);

        sheet.tick(2.0);
        assert_eq!(sheet.modifier_count(), 1, "refresh extended the duration to 3s");
    }

    #[test]
    fn test_ignore_policy_drops_reapplication() {
        let mut sheet = StatSheet::new();
        let key = ModifierKey::Named("stun".to_string());
        sheet.apply_modifier(
            StatType::Stun,
            StatModifier::additive(1.0, 1.0).with_key(key.clone()),
            ReapplyPolicy::Ignore,
        );
        let outcome = sheet.apply_modifier(
            StatType::Stun,
            StatModifier::additive(1.0, 5.0).with_key(key),
            ReapplyPolicy::Ignore,
        );

        assert_eq!(outcome, ModifierOutcome::Ignored);
        sheet.tick(1.0);
        assert_eq!(sheet.effective(StatType::Stun), 0.0);
    }

    #[test]
    fn test_zero_duration_modifier_is_rejected() {
        let mut sheet = StatSheet::new();
        let outcome = sheet.add_modifier(StatType::Defense, StatModifier::additive(3.0, 0.0));
        assert_eq!(outcome, ModifierOutcome::Rejected);
        assert_eq!(sheet.modifier_count(), 0);
    }
}
