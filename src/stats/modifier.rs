//! Timed stat modifiers
//!
//! A modifier is a single additive or multiplicative adjustment with its own
//! countdown. The owning `StatSheet` counts it down and drops it once expired.

use serde::{Deserialize, Serialize};

use super::buffs::{BuffType, DebuffType};

/// Timing tolerance in seconds. Frame deltas summed in f32 drift by far less
/// than this, so a countdown within it of zero has run out.
pub const TIME_EPSILON: f32 = 1e-4;

/// How a modifier combines with the base value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierOp {
    /// Summed onto the base before any multiplier is applied
    Additive,
    /// Multiplied onto `base + additive`, in insertion order
    Multiplicative,
}

/// Identifies the named effect that produced a modifier.
///
/// Re-application policies match on this key: two modifiers with the same key
/// on the same stat are "the same effect" for refresh/ignore purposes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKey {
    /// Never matches anything, always stacks
    Anonymous,
    Buff(BuffType),
    Debuff(DebuffType),
    /// Free-form source, e.g. a template id applying a passive aura
    Named(String),
}

impl Default for ModifierKey {
    fn default() -> Self {
        ModifierKey::Anonymous
    }
}

/// What to do when a modifier with an already-present key is applied again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReapplyPolicy {
    /// Keep one entry: take the new magnitude and the longer remaining duration
    Refresh,
    /// Insert an independent entry with its own countdown
    Stack,
    /// Leave the existing entry untouched and drop the new one
    Ignore,
}

/// Result of inserting a modifier into a sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModifierOutcome {
    Added,
    Refreshed,
    Ignored,
    /// Zero-duration, non-permanent modifiers are already expired on arrival
    Rejected,
}

impl ModifierOutcome {
    /// True when the sheet changed.
    pub fn applied(self) -> bool {
        matches!(self, ModifierOutcome::Added | ModifierOutcome::Refreshed)
    }
}

/// A single timed adjustment to one stat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub magnitude: f32,
    pub op: ModifierOp,
    /// Seconds left; never negative
    remaining: f32,
    /// Permanent modifiers ignore their countdown
    pub permanent: bool,
    #[serde(default)]
    pub key: ModifierKey,
}

impl StatModifier {
    /// Create a timed modifier. Negative durations clamp to zero.
    pub fn new(magnitude: f32, op: ModifierOp, duration: f32) -> Self {
        Self {
            magnitude,
            op,
            remaining: duration.max(0.0),
            permanent: false,
            key: ModifierKey::Anonymous,
        }
    }

    pub fn additive(magnitude: f32, duration: f32) -> Self {
        Self::new(magnitude, ModifierOp::Additive, duration)
    }

    pub fn multiplicative(magnitude: f32, duration: f32) -> Self {
        Self::new(magnitude, ModifierOp::Multiplicative, duration)
    }

    /// Create a modifier that never expires on its own.
    pub fn permanent(magnitude: f32, op: ModifierOp) -> Self {
        Self {
            magnitude,
            op,
            remaining: 0.0,
            permanent: true,
            key: ModifierKey::Anonymous,
        }
    }

    /// Tag this modifier with the effect that produced it (builder pattern).
    #[must_use]
    pub fn with_key(mut self, key: ModifierKey) -> Self {
        self.key = key;
        self
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        !self.permanent && self.remaining <= TIME_EPSILON
    }

    /// Count down by `dt`, clamping at zero.
    pub fn tick(&mut self, dt: f32) {
        if !self.permanent {
            self.remaining = (self.remaining - dt).max(0.0);
        }
    }

    /// Merge a re-application into this entry (refresh policy).
    pub(crate) fn refresh_from(&mut self, newer: &StatModifier) {
        self.magnitude = newer.magnitude;
        self.remaining = self.remaining.max(newer.remaining);
        self.permanent |= newer.permanent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_duration_clamps_to_zero() {
        let modifier = StatModifier::additive(5.0, -3.0);
        assert_eq!(modifier.remaining(), 0.0);
        assert!(modifier.is_expired());
    }

    #[test]
    fn test_tick_never_goes_negative() {
        let mut modifier = StatModifier::multiplicative(1.5, 0.5);
        modifier.tick(0.25);
        assert_eq!(modifier.remaining(), 0.25);
        modifier.tick(10.0);
        assert_eq!(modifier.remaining(), 0.0);
        assert!(modifier.is_expired());
    }

    #[test]
    fn test_rounding_residue_counts_as_expired() {
        let mut modifier = StatModifier::multiplicative(1.5, 1.0);
        for _ in 0..49 {
            modifier.tick(0.02);
        }
        assert!(!modifier.is_expired());
        modifier.tick(0.02);
        assert!(modifier.is_expired());
    }

    #[test]
    fn test_permanent_modifier_never_expires() {
        let mut modifier = StatModifier::permanent(2.0, ModifierOp::Additive);
        modifier.tick(1000.0);
        assert!(!modifier.is_expired());
    }

    #[test]
    fn test_refresh_keeps_longer_duration() {
        let mut existing = StatModifier::additive(5.0, 3.0);
        existing.refresh_from(&StatModifier::additive(8.0, 1.0));
        assert_eq!(existing.magnitude, 8.0);
        assert_eq!(existing.remaining(), 3.0);
    }
}
