//! Damage over time
//!
//! Ticks `damage` every `interval` for `duration` seconds, either on the
//! instance's explicit target (`radius == 0`) or on every enemy within
//! `radius` of the instance. A degenerate schedule (interval <= 0, duration
//! <= 0, interval >= duration) fires once on activation and ends.
//!
//! Instances spawned by the Burn debuff carry a `DotSpec` override that
//! replaces the authored numbers.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::{non_negative, Ticker};
use crate::effects::component::{AttackComponent, EffectEvent, Phase, PhaseClock};
use crate::effects::context::EffectContext;
use crate::stats::DotSpec;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DotParams {
    pub damage: f32,
    pub interval: f32,
    pub duration: f32,
    /// Zero: single target (the instance's target). Otherwise every enemy in range.
    #[serde(default)]
    pub radius: f32,
    #[serde(default)]
    pub max_targets: Option<usize>,
}

impl DotParams {
    pub fn validate(&self) -> Result<(), String> {
        non_negative("damage", self.damage)?;
        non_negative("radius", self.radius)?;
        // Degenerate interval/duration are legal: they fire once
        if !self.interval.is_finite() || !self.duration.is_finite() {
            return Err("interval and duration must be finite".to_string());
        }
        Ok(())
    }

    fn spec(&self) -> DotSpec {
        DotSpec {
            damage: self.damage,
            interval: self.interval,
            duration: self.duration,
        }
    }
}

pub struct DamageOverTime {
    params: DotParams,
    clock: PhaseClock,
    ticker: Ticker,
    damage: f32,
}

impl DamageOverTime {
    pub fn new(params: DotParams) -> Self {
        let spec = params.spec();
        Self {
            params,
            clock: PhaseClock::default(),
            ticker: Ticker::new(spec.interval, spec.duration, false),
            damage: spec.damage,
        }
    }

    fn single_target(&self) -> bool {
        self.params.radius <= 0.0
    }

    /// Apply `count` ticks. Ends the effect when a single target is gone.
    fn fire(&mut self, ctx: &mut EffectContext, count: u32) {
        for _ in 0..count {
            if self.single_target() {
                let Some(target) = ctx.target() else {
                    self.clock.finish();
                    return;
                };
                match ctx.strike_with_power(target, self.damage) {
                    Some(result) if result.target_alive => {}
                    _ => {
                        // Target died or vanished: a normal end, not an error
                        self.clock.finish();
                        return;
                    }
                }
            } else {
                let center = ctx.position();
                let mut targets = ctx.enemies_within(center, self.params.radius);
                if let Some(max) = self.params.max_targets {
                    targets.truncate(max);
                }
                for (target, _) in targets {
                    ctx.strike_with_power(target, self.damage);
                }
            }
        }
    }

    fn track_target(&self, ctx: &mut EffectContext) {
        if !self.single_target() {
            return;
        }
        if let Some(position) = ctx.target().and_then(|target| ctx.position_of(target)) {
            ctx.set_position(position);
        }
    }
}

impl AttackComponent for DamageOverTime {
    fn name(&self) -> &'static str {
        "DamageOverTime"
    }

    fn activate(&mut self, ctx: &mut EffectContext, _direction: Vec2) {
        let spec = ctx.dot_override().unwrap_or_else(|| self.params.spec());
        self.ticker = Ticker::new(spec.interval, spec.duration, false);
        self.damage = spec.damage;

        self.clock.start();
        self.track_target(ctx);
        ctx.show_body();

        let due = self.ticker.start();
        self.fire(ctx, due);
        if self.ticker.is_done() {
            self.clock.finish();
        }
        self.clock.conclude(ctx);
    }

    fn deactivate(&mut self, ctx: &mut EffectContext) {
        ctx.hide_body();
    }

    fn update(&mut self, ctx: &mut EffectContext, dt: f32) {
        if !self.clock.is(Phase::Active) {
            self.clock.advance(dt);
            self.clock.conclude(ctx);
            return;
        }
        self.track_target(ctx);
        let due = self.ticker.advance(dt);
        self.fire(ctx, due);
        if self.ticker.is_done() {
            self.clock.finish();
        }
        self.clock.conclude(ctx);
    }

    fn on_event(&mut self, ctx: &mut EffectContext, event: &EffectEvent) -> bool {
        match event {
            EffectEvent::Retarget(target) if self.single_target() => ctx.set_target(Some(*target)),
            EffectEvent::Cancel => {
                self.clock.finish();
                self.clock.conclude(ctx);
                true
            }
            _ => false,
        }
    }

    fn reset(&mut self) {
        self.clock.reset();
        self.ticker.reset();
        self.damage = self.params.damage;
    }

    fn phase(&self) -> Phase {
        self.clock.phase()
    }
}
