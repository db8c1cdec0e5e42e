//! Concrete behaviors
//!
//! One module per effect kind, each a self-contained FSM behind
//! `AttackComponent`. `BehaviorSpec` is the authored (RON) form; `build`
//! turns it into a fresh behavior object.

pub mod chain;
pub mod contact;
pub mod dot;
pub mod field;
pub mod follow;
pub mod melee;
pub mod orbit;
pub mod projectile;
pub mod pulse;
pub mod spawner;
pub mod status;
pub mod sweep;

use serde::{Deserialize, Serialize};

use super::component::AttackComponent;

pub use chain::{ChainLightning, ChainParams};
pub use contact::{ContactDamage, ContactParams};
pub use dot::{DamageOverTime, DotParams};
pub use field::{AreaField, AreaFieldParams};
pub use follow::{FollowOwner, FollowParams};
pub use melee::{MeleeSwing, MeleeSwingParams};
pub use orbit::{OrbitParams, SatelliteOrbit};
pub use projectile::{Projectile, ProjectileParams};
pub use pulse::{GlobalPulse, PulseParams};
pub use spawner::{SpawnerParams, SubEffectSpawner};
pub use status::{ApplyStatus, StatusParams, StatusScope};
pub use sweep::{FanSweep, FanSweepParams};

/// Authored behavior with its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BehaviorSpec {
    MeleeSwing(MeleeSwingParams),
    FanSweep(FanSweepParams),
    Projectile(ProjectileParams),
    AreaField(AreaFieldParams),
    DamageOverTime(DotParams),
    ChainLightning(ChainParams),
    OrbitRing(OrbitParams),
    ContactDamage(ContactParams),
    GlobalPulse(PulseParams),
    ApplyStatus(StatusParams),
    FollowOwner(FollowParams),
    SubEffectSpawner(SpawnerParams),
}

impl BehaviorSpec {
    pub fn build(&self) -> Box<dyn AttackComponent> {
        match self {
            BehaviorSpec::MeleeSwing(p) => Box::new(MeleeSwing::new(p.clone())),
            BehaviorSpec::FanSweep(p) => Box::new(FanSweep::new(p.clone())),
            BehaviorSpec::Projectile(p) => Box::new(Projectile::new(p.clone())),
            BehaviorSpec::AreaField(p) => Box::new(AreaField::new(p.clone())),
            BehaviorSpec::DamageOverTime(p) => Box::new(DamageOverTime::new(p.clone())),
            BehaviorSpec::ChainLightning(p) => Box::new(ChainLightning::new(p.clone())),
            BehaviorSpec::OrbitRing(p) => Box::new(SatelliteOrbit::new(p.clone())),
            BehaviorSpec::ContactDamage(p) => Box::new(ContactDamage::new(p.clone())),
            BehaviorSpec::GlobalPulse(p) => Box::new(GlobalPulse::new(p.clone())),
            BehaviorSpec::ApplyStatus(p) => Box::new(ApplyStatus::new(p.clone())),
            BehaviorSpec::FollowOwner(p) => Box::new(FollowOwner::new(p.clone())),
            BehaviorSpec::SubEffectSpawner(p) => Box::new(SubEffectSpawner::new(p.clone())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BehaviorSpec::MeleeSwing(_) => "MeleeSwing",
            BehaviorSpec::FanSweep(_) => "FanSweep",
            BehaviorSpec::Projectile(_) => "Projectile",
            BehaviorSpec::AreaField(_) => "AreaField",
            BehaviorSpec::DamageOverTime(_) => "DamageOverTime",
            BehaviorSpec::ChainLightning(_) => "ChainLightning",
            BehaviorSpec::OrbitRing(_) => "OrbitRing",
            BehaviorSpec::ContactDamage(_) => "ContactDamage",
            BehaviorSpec::GlobalPulse(_) => "GlobalPulse",
            BehaviorSpec::ApplyStatus(_) => "ApplyStatus",
            BehaviorSpec::FollowOwner(_) => "FollowOwner",
            BehaviorSpec::SubEffectSpawner(_) => "SubEffectSpawner",
        }
    }

    /// Template ids this behavior may spawn.
    pub fn referenced_templates(&self) -> Vec<&str> {
        match self {
            BehaviorSpec::MeleeSwing(p) => p.on_hit.iter().map(String::as_str).collect(),
            BehaviorSpec::FanSweep(p) => p.on_hit.iter().map(String::as_str).collect(),
            BehaviorSpec::Projectile(p) => p.explode.iter().map(String::as_str).collect(),
            BehaviorSpec::OrbitRing(p) => vec![p.satellite.as_str()],
            BehaviorSpec::SubEffectSpawner(p) => vec![p.template.as_str()],
            _ => Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            BehaviorSpec::MeleeSwing(p) => p.validate(),
            BehaviorSpec::FanSweep(p) => p.validate(),
            BehaviorSpec::Projectile(p) => p.validate(),
            BehaviorSpec::AreaField(p) => p.validate(),
            BehaviorSpec::DamageOverTime(p) => p.validate(),
            BehaviorSpec::ChainLightning(p) => p.validate(),
            BehaviorSpec::OrbitRing(p) => p.validate(),
            BehaviorSpec::ContactDamage(p) => p.validate(),
            BehaviorSpec::GlobalPulse(p) => p.validate(),
            BehaviorSpec::ApplyStatus(p) => p.validate(),
            BehaviorSpec::FollowOwner(_) => Ok(()),
            BehaviorSpec::SubEffectSpawner(p) => p.validate(),
        }
    }
}

/// Reject negative or non-finite authored numbers.
pub(crate) fn non_negative(name: &str, value: f32) -> Result<(), String> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(format!("{} must be a non-negative number, got {}", name, value))
    }
}

/// Zero or negative means "no limit".
pub(crate) fn duration_or_unbounded(duration: f32) -> f32 {
    if duration > 0.0 {
        duration
    } else {
        f32::INFINITY
    }
}

/// Tolerance for accumulated floating-point time.
const TICK_EPSILON: f32 = crate::stats::TIME_EPSILON;

/// Fixed-interval tick schedule over a bounded duration.
///
/// Degenerate schedules (interval <= 0, duration <= 0, or
/// interval >= duration) fire exactly once, at start. Otherwise the number of
/// ticks is `floor(duration / interval)`, counted rather than compared
/// against elapsed time so accumulated rounding can't add or drop a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ticker {
    interval: f32,
    total: u32,
    fired: u32,
    accumulator: f32,
    /// First tick at start instead of after the first interval
    immediate: bool,
}

impl Ticker {
    pub fn new(interval: f32, duration: f32, immediate: bool) -> Self {
        let single = interval <= 0.0 || duration <= 0.0 || interval >= duration;
        let total = if single {
            1
        } else {
            ((duration / interval) + TICK_EPSILON).floor() as u32
        };
        Self {
            interval: interval.max(0.0),
            total,
            fired: 0,
            accumulator: 0.0,
            immediate: immediate || single,
        }
    }

    /// Unbounded schedule (fires every interval until stopped).
    pub fn repeating(interval: f32, immediate: bool) -> Self {
        let mut ticker = Self::new(interval, f32::INFINITY, immediate);
        if interval > 0.0 {
            ticker.total = u32::MAX;
        }
        ticker
    }

    pub fn is_single(&self) -> bool {
        self.total == 1
    }

    /// Ticks due at start (0 or 1).
    pub fn start(&mut self) -> u32 {
        self.fired = 0;
        self.accumulator = 0.0;
        if self.immediate {
            self.fired = 1;
            1
        } else {
            0
        }
    }

    /// Ticks due after `dt` more seconds.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if self.is_done() || self.interval <= 0.0 {
            return 0;
        }
        self.accumulator += dt.max(0.0);
        let mut due = 0;
        while self.accumulator + TICK_EPSILON >= self.interval && self.fired < self.total {
            self.accumulator -= self.interval;
            self.fired += 1;
            due += 1;
        }
        due
    }

    pub fn is_done(&self) -> bool {
        self.fired >= self.total
    }

    pub fn fired(&self) -> u32 {
        self.fired
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn reset(&mut self) {
        self.fired = 0;
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_schedule_counts_ticks() {
        let mut ticker = Ticker::new(1.0, 5.0, false);
        assert_eq!(ticker.total(), 5);
        assert_eq!(ticker.start(), 0);

        let mut fired = 0;
        for _ in 0..40 {
            fired += ticker.advance(0.25);
        }
        assert_eq!(fired, 5);
        assert!(ticker.is_done());
    }

    #[test]
    fn test_interval_equal_to_duration_fires_once_at_start() {
        let mut ticker = Ticker::new(5.0, 5.0, false);
        assert!(ticker.is_single());
        assert_eq!(ticker.start(), 1);
        assert_eq!(ticker.advance(10.0), 0);
        assert!(ticker.is_done());
    }

    #[test]
    fn test_zero_interval_is_not_an_infinite_loop() {
        let mut ticker = Ticker::new(0.0, 3.0, false);
        assert_eq!(ticker.start(), 1);
        assert_eq!(ticker.advance(1.0), 0);
    }

    #[test]
    fn test_rounding_does_not_add_ticks() {
        let mut ticker = Ticker::new(0.1, 1.0, false);
        let mut fired = 0;
        for _ in 0..200 {
            fired += ticker.advance(1.0 / 60.0);
        }
        assert_eq!(fired, 10);
    }

    #[test]
    fn test_immediate_field_schedule() {
        let mut ticker = Ticker::new(1.0, 3.0, true);
        assert_eq!(ticker.start(), 1);
        assert_eq!(ticker.advance(1.0), 1);
        assert_eq!(ticker.advance(1.0), 1);
        assert_eq!(ticker.advance(1.0), 0);
        assert!(ticker.is_done());
    }

    #[test]
    fn test_repeating_never_finishes() {
        let mut ticker = Ticker::repeating(0.5, true);
        ticker.start();
        assert_eq!(ticker.advance(10.0), 20);
        assert!(!ticker.is_done());
    }
}
