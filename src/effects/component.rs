//! Behavior contract
//!
//! Every concrete behavior is an `AttackComponent` driving its own finite-state
//! machine of the shape
//!
//! ```text
//! None -> Preparing -> Active -> Finishing -> Finished -> None
//! ```
//!
//! `Preparing` is a short delay before collision or visual presence,
//! `Active` does the per-tick work, `Finishing` is a teardown delay and
//! `Finished` asks the factory to deactivate the instance. `PhaseClock` keeps
//! the timing uniform so pooling and cascading deactivation treat every
//! behavior the same way.

use bevy::math::Vec2;

use super::attack::AttackId;
use super::context::EffectContext;
use crate::world::EntityId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    None,
    Preparing,
    Active,
    Finishing,
    Finished,
}

/// Payload of `AttackComponent::on_event`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectEvent {
    /// A child of this instance was deactivated
    ChildDeactivated(AttackId),
    /// Orbit rings: spawn one more satellite
    AddSatellite,
    /// Orbit rings: drop the newest satellite
    RemoveSatellite,
    Retarget(EntityId),
    /// Skip to the teardown phase
    Cancel,
}

/// One unit of effect logic attached to an `Attack`.
///
/// The lifecycle is strictly `activate -> update* -> deactivate`; the factory
/// calls `reset` before an instance is reused.
pub trait AttackComponent: Send + Sync {
    fn name(&self) -> &'static str;

    fn activate(&mut self, ctx: &mut EffectContext, direction: Vec2);

    /// Called in reverse declaration order while the instance is torn down.
    fn deactivate(&mut self, ctx: &mut EffectContext);

    fn update(&mut self, ctx: &mut EffectContext, dt: f32);

    /// Overlap reported by the collision pass or by the host.
    fn process_collision(&mut self, _ctx: &mut EffectContext, _target: EntityId) {}

    /// Returns true when the event was handled.
    fn on_event(&mut self, _ctx: &mut EffectContext, _event: &EffectEvent) -> bool {
        false
    }

    /// Drop all transient per-activation state.
    fn reset(&mut self);

    fn phase(&self) -> Phase;
}

/// Shared timing for the behavior FSM.
///
/// Durations are in seconds. An `active` duration of `f32::INFINITY` keeps the
/// clock in `Active` until the behavior calls `finish`. Time spent in
/// `Preparing` never counts against the active duration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseClock {
    phase: Phase,
    elapsed: f32,
    prepare: f32,
    active: f32,
    finish: f32,
}

impl Default for PhaseClock {
    fn default() -> Self {
        Self::new(0.0, f32::INFINITY, 0.0)
    }
}

impl PhaseClock {
    pub fn new(prepare: f32, active: f32, finish: f32) -> Self {
        Self {
            phase: Phase::None,
            elapsed: 0.0,
            prepare: prepare.max(0.0),
            active: active.max(0.0),
            finish: finish.max(0.0),
        }
    }

    /// Open-ended active phase.
    pub fn until_finished(prepare: f32, finish: f32) -> Self {
        Self::new(prepare, f32::INFINITY, finish)
    }

    /// Enter `Preparing`, or `Active` straight away when there is no delay.
    /// Returns the phase entered.
    pub fn start(&mut self) -> Phase {
        self.elapsed = 0.0;
        self.phase = if self.prepare > 0.0 {
            Phase::Preparing
        } else {
            Phase::Active
        };
        self.phase
    }

    /// Advance the clock. Returns the phase entered, if a transition happened.
    /// At most one transition per call (an empty `Finishing` counts as part of
    /// it); leftover time carries into the new phase.
    pub fn advance(&mut self, dt: f32) -> Option<Phase> {
        let limit = match self.phase {
            Phase::Preparing => self.prepare,
            Phase::Active => self.active,
            Phase::Finishing => self.finish,
            Phase::None | Phase::Finished => return None,
        };
        self.elapsed += dt.max(0.0);
        if self.elapsed < limit {
            return None;
        }

        self.elapsed -= limit;
        self.phase = match self.phase {
            Phase::Preparing => Phase::Active,
            // A zero-length teardown is skipped
            Phase::Active if self.finish > 0.0 => Phase::Finishing,
            _ => Phase::Finished,
        };
        Some(self.phase)
    }

    /// Leave `Preparing`/`Active` early. Skips straight to `Finished` when
    /// there is no teardown delay. Returns the phase entered.
    pub fn finish(&mut self) -> Phase {
        if matches!(self.phase, Phase::Preparing | Phase::Active) {
            self.elapsed = 0.0;
            self.phase = if self.finish > 0.0 {
                Phase::Finishing
            } else {
                Phase::Finished
            };
        }
        self.phase
    }

    /// Jump to `Finished` from any running phase, skipping the teardown delay.
    pub fn complete(&mut self) {
        if self.is_running() {
            self.elapsed = 0.0;
            self.phase = Phase::Finished;
        }
    }

    /// Report `Finished` to the factory and return to `None`. Returns true
    /// when the clock had finished.
    pub fn conclude(&mut self, ctx: &mut EffectContext) -> bool {
        if self.phase != Phase::Finished {
            return false;
        }
        ctx.finish();
        self.reset();
        true
    }

    pub fn reset(&mut self) {
        self.phase = Phase::None;
        self.elapsed = 0.0;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is(&self, phase: Phase) -> bool {
        self.phase == phase
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.phase, Phase::None | Phase::Finished)
    }

    /// Seconds spent in the current phase.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn set_active(&mut self, active: f32) {
        self.active = active.max(0.0);
    }

    pub fn active_duration(&self) -> f32 {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut clock = PhaseClock::new(0.25, 0.5, 0.25);
        assert_eq!(clock.start(), Phase::Preparing);
        assert_eq!(clock.advance(0.25), Some(Phase::Active));
        assert_eq!(clock.advance(0.25), None);
        assert_eq!(clock.advance(0.25), Some(Phase::Finishing));
        assert_eq!(clock.advance(0.25), Some(Phase::Finished));
        assert_eq!(clock.advance(10.0), None);
    }

    #[test]
    fn test_active_expiry_skips_empty_teardown() {
        let mut clock = PhaseClock::new(0.0, 1.0, 0.0);
        clock.start();
        assert_eq!(clock.advance(1.0), Some(Phase::Finished));
    }

    #[test]
    fn test_no_prepare_starts_active() {
        let mut clock = PhaseClock::new(0.0, 1.0, 0.0);
        assert_eq!(clock.start(), Phase::Active);
    }

    #[test]
    fn test_preparing_time_does_not_consume_active_time() {
        let mut clock = PhaseClock::new(1.0, 1.0, 0.0);
        clock.start();
        assert_eq!(clock.advance(1.0), Some(Phase::Active));
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.advance(0.5), None);
        assert!(clock.is(Phase::Active));
    }

    #[test]
    fn test_finish_early_without_teardown() {
        let mut clock = PhaseClock::until_finished(0.0, 0.0);
        clock.start();
        assert_eq!(clock.advance(100.0), None);
        assert_eq!(clock.finish(), Phase::Finished);
    }

    #[test]
    fn test_finish_does_not_rewind_finishing() {
        let mut clock = PhaseClock::new(0.0, 1.0, 1.0);
        clock.start();
        clock.advance(1.0);
        clock.advance(0.5);
        assert_eq!(clock.finish(), Phase::Finishing);
        assert_eq!(clock.elapsed(), 0.5);
    }
}
