//! Area field
//!
//! A lingering zone: on entering `Active` and then every `tick_interval`, every
//! enemy overlapping the instance's extent takes a hit and, if authored,
//! a status effect. The field lasts `duration` seconds of `Active` time.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::{non_negative, Ticker};
use crate::effects::component::{AttackComponent, EffectEvent, Phase, PhaseClock};
use crate::effects::context::EffectContext;
use crate::stats::StatusSpec;
use crate::targeting::AreaShape;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaFieldParams {
    #[serde(default)]
    pub windup: f32,
    pub duration: f32,
    pub tick_interval: f32,
    /// Circle radius; the template's shape is used when absent
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub status: Option<StatusSpec>,
    /// Keep the zone centred on the owner
    #[serde(default)]
    pub follow_owner: bool,
    #[serde(default)]
    pub max_targets: Option<usize>,
}

impl AreaFieldParams {
    pub fn validate(&self) -> Result<(), String> {
        non_negative("windup", self.windup)?;
        non_negative("duration", self.duration)?;
        non_negative("tick_interval", self.tick_interval)?;
        if let Some(radius) = self.radius {
            non_negative("radius", radius)?;
        }
        Ok(())
    }
}

pub struct AreaField {
    params: AreaFieldParams,
    clock: PhaseClock,
    ticker: Ticker,
}

impl AreaField {
    pub fn new(params: AreaFieldParams) -> Self {
        let ticker = Ticker::new(params.tick_interval, params.duration, true);
        // A degenerate schedule fires once and ends immediately
        let active = if ticker.is_single() { 0.0 } else { params.duration };
        let clock = PhaseClock::new(params.windup, active, 0.0);
        Self {
            params,
            clock,
            ticker,
        }
    }

    fn begin(&mut self, ctx: &mut EffectContext) {
        if let Some(radius) = self.params.radius {
            ctx.set_shape(AreaShape::Circle { radius });
        }
        ctx.show_body();
        let due = self.ticker.start();
        self.pulse(ctx, due);
        if self.ticker.is_single() {
            self.clock.finish();
        }
    }

    fn pulse(&mut self, ctx: &mut EffectContext, count: u32) {
        for _ in 0..count {
            let shape = ctx.shape();
            let mut targets = ctx.overlap(&shape);
            if let Some(max) = self.params.max_targets {
                targets.truncate(max);
            }
            for (target, _) in targets {
                let Some(result) = ctx.strike(target) else {
                    continue;
                };
                if let (Some(status), true) = (&self.params.status, result.target_alive) {
                    ctx.apply_status(status, target);
                }
            }
        }
    }
}

impl AttackComponent for AreaField {
    fn name(&self) -> &'static str {
        "AreaField"
    }

    fn activate(&mut self, ctx: &mut EffectContext, _direction: Vec2) {
        if self.clock.start() == Phase::Active {
            self.begin(ctx);
        }
        self.clock.conclude(ctx);
    }

    fn deactivate(&mut self, ctx: &mut EffectContext) {
        ctx.hide_body();
    }

    fn update(&mut self, ctx: &mut EffectContext, dt: f32) {
        if self.params.follow_owner {
            if let Some(owner) = ctx.owner_position() {
                ctx.set_position(owner);
            }
        }
        // Ticks due this frame land before the clock can leave Active
        if self.clock.is(Phase::Active) {
            let due = self.ticker.advance(dt);
            self.pulse(ctx, due);
        }
        if self.clock.advance(dt) == Some(Phase::Active) {
            self.begin(ctx);
        }
        self.clock.conclude(ctx);
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
