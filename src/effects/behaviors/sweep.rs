//! Fan sweep
//!
//! After `windup`, builds the fan polygon around the owner's facing, strikes
//! every enemy inside it once (nearest first) and spawns the `on_hit` effect
//! on each struck target, typically a chain. The sweep then lingers in
//! `Finishing` while any of those children are alive, for at most
//! `linger_limit` seconds; whatever is still running then is cascaded down
//! with the sweep.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::non_negative;
use crate::effects::component::{AttackComponent, EffectEvent, Phase, PhaseClock};
use crate::effects::context::{EffectContext, SpawnRequest};
use crate::targeting::{facing_or_default, AreaShape};

fn default_segments() -> u32 {
    8
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FanSweepParams {
    pub radius: f32,
    pub half_angle_deg: f32,
    #[serde(default = "default_segments")]
    pub segments: u32,
    #[serde(default)]
    pub windup: f32,
    /// Upper bound on waiting for `on_hit` children. Zero ends the sweep, and
    /// cascades its children, right after the strike.
    #[serde(default)]
    pub linger_limit: f32,
    #[serde(default)]
    pub max_targets: Option<usize>,
    #[serde(default)]
    pub on_hit: Option<String>,
}

impl FanSweepParams {
    pub fn validate(&self) -> Result<(), String> {
        non_negative("radius", self.radius)?;
        non_negative("half_angle_deg", self.half_angle_deg)?;
        non_negative("windup", self.windup)?;
        non_negative("linger_limit", self.linger_limit)?;
        if self.segments == 0 {
            return Err("segments must be at least 1".to_string());
        }
        Ok(())
    }

    fn shape(&self) -> AreaShape {
        AreaShape::Fan {
            radius: self.radius,
            half_angle_deg: self.half_angle_deg,
            segments: self.segments,
        }
    }
}

pub struct FanSweep {
    params: FanSweepParams,
    clock: PhaseClock,
    hits: usize,
}

impl FanSweep {
    pub fn new(params: FanSweepParams) -> Self {
        let clock = PhaseClock::until_finished(params.windup, params.linger_limit);
        Self {
            params,
            clock,
            hits: 0,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    fn sweep(&mut self, ctx: &mut EffectContext) {
        if let Some(owner) = ctx.owner_position() {
            ctx.set_position(owner);
        }
        let shape = self.params.shape();
        ctx.set_shape(shape);
        ctx.show_body();

        let mut targets = ctx.overlap(&shape);
        if let Some(max) = self.params.max_targets {
            targets.truncate(max);
        }

        let facing = ctx.direction();
        for (target, _) in targets {
            if ctx.strike(target).is_none() {
                continue;
            }
            self.hits += 1;
            if let Some(on_hit) = &self.params.on_hit {
                let mut request = SpawnRequest::new(on_hit.clone())
                    .targeting(target)
                    .toward(facing);
                if let Some(position) = ctx.position_of(target) {
                    request = request.at(position);
                }
                ctx.spawn(request);
            }
        }

        self.clock.finish();
        self.settle(ctx);
    }

    /// Leave `Finishing` early once every child has ended.
    fn settle(&mut self, ctx: &mut EffectContext) {
        if self.clock.is(Phase::Finishing) && !ctx.has_children() {
            self.clock.complete();
        }
        self.clock.conclude(ctx);
    }
}

impl AttackComponent for FanSweep {
    fn name(&self) -> &'static str {
        "FanSweep"
    }

    fn activate(&mut self, ctx: &mut EffectContext, direction: Vec2) {
        ctx.set_direction(facing_or_default(direction));
        if self.clock.start() == Phase::Active {
            self.sweep(ctx);
        }
    }

    fn deactivate(&mut self, ctx: &mut EffectContext) {
        ctx.hide_body();
    }

    fn update(&mut self, ctx: &mut EffectContext, dt: f32) {
        if self.clock.advance(dt) == Some(Phase::Active) {
            self.sweep(ctx);
            return;
        }
        self.settle(ctx);
    }

    fn on_event(&mut self, ctx: &mut EffectContext, event: &EffectEvent) -> bool {
        match event {
            EffectEvent::ChildDeactivated(_) => {
                self.settle(ctx);
                true
            }
            EffectEvent::Cancel => {
                self.clock.complete();
                self.clock.conclude(ctx);
                true
            }
            _ => false,
        }
    }

    fn reset(&mut self) {
        self.clock.reset();
        self.hits = 0;
    }

    fn phase(&self) -> Phase {
        self.clock.phase()
    }
}
