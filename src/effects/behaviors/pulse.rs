//! Global pulse
//!
//! Every `interval`, strikes every live enemy of the owner regardless of
//! distance. The enemy list is re-read on every pulse and each entry is
//! re-checked before the hit, so enemies removed mid-pulse are skipped.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::{non_negative, Ticker};
use crate::effects::component::{AttackComponent, EffectEvent, Phase, PhaseClock};
use crate::effects::context::EffectContext;
use crate::stats::StatusSpec;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PulseParams {
    pub interval: f32,
    /// Zero means until cancelled
    #[serde(default)]
    pub duration: f32,
    /// Fixed damage per pulse; the instance's attack power when absent
    #[serde(default)]
    pub damage: Option<f32>,
    #[serde(default)]
    pub status: Option<StatusSpec>,
}

impl PulseParams {
    pub fn validate(&self) -> Result<(), String> {
        non_negative("interval", self.interval)?;
        non_negative("duration", self.duration)?;
        if let Some(damage) = self.damage {
            non_negative("damage", damage)?;
        }
        Ok(())
    }

    fn ticker(&self) -> Ticker {
        if self.duration > 0.0 {
            Ticker::new(self.interval, self.duration, true)
        } else {
            Ticker::repeating(self.interval, true)
        }
    }
}

pub struct GlobalPulse {
    params: PulseParams,
    clock: PhaseClock,
    ticker: Ticker,
}

impl GlobalPulse {
    pub fn new(params: PulseParams) -> Self {
        let ticker = params.ticker();
        Self {
            params,
            clock: PhaseClock::default(),
            ticker,
        }
    }

    fn pulse(&mut self, ctx: &mut EffectContext, count: u32) {
        for _ in 0..count {
            for enemy in ctx.enemies() {
                if !ctx.is_alive(enemy) {
                    continue;
                }
                let result = match self.params.damage {
                    Some(damage) => ctx.strike_with_power(enemy, damage),
                    None => ctx.strike(enemy),
                };
                if let (Some(status), Some(result)) = (&self.params.status, result) {
                    if result.target_alive {
                        ctx.apply_status(status, enemy);
                    }
                }
            }
        }
        if self.ticker.is_done() {
            self.clock.finish();
        }
        self.clock.conclude(ctx);
    }
}

impl AttackComponent for GlobalPulse {
    fn name(&self) -> &'static str {
        "GlobalPulse"
    }

    fn activate(&mut self, ctx: &mut EffectContext, _direction: Vec2) {
        self.clock.start();
        let due = self.ticker.start();
        self.pulse(ctx, due);
    }

    fn deactivate(&mut self, _ctx: &mut EffectContext) {}

    fn update(&mut self, ctx: &mut EffectContext, dt: f32) {
        if self.clock.is(Phase::Active) {
            let due = self.ticker.advance(dt);
            self.pulse(ctx, due);
        }
    }

    fn on_event(&mut self, ctx: &mut EffectContext, event: &EffectEvent) -> bool {
        match event {
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
    }

    fn phase(&self) -> Phase {
        self.clock.phase()
    }
}
