//! Projectile
//!
//! Flies at `speed` along its direction, optionally steering toward the
//! instance's explicit target. The collider is live while `Active`; each
//! target is struck at most once, and the projectile stops after
//! `pierce + 1` hits, after `max_distance`, or after `lifetime`. `explode`
//! spawns a detached effect where it stopped.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::{duration_or_unbounded, non_negative};
use crate::effects::component::{AttackComponent, EffectEvent, Phase, PhaseClock};
use crate::effects::context::{EffectContext, SpawnRequest};
use crate::targeting::facing_or_default;
use crate::world::EntityId;

fn default_turn_rate() -> f32 {
    360.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileParams {
    pub speed: f32,
    #[serde(default)]
    pub windup: f32,
    #[serde(default)]
    pub homing: bool,
    /// Degrees per second when homing
    #[serde(default = "default_turn_rate")]
    pub turn_rate_deg: f32,
    /// Extra targets passed through after the first hit
    #[serde(default)]
    pub pierce: u32,
    /// Zero means unbounded
    #[serde(default)]
    pub max_distance: f32,
    /// Zero means unbounded
    #[serde(default)]
    pub lifetime: f32,
    #[serde(default)]
    pub explode: Option<String>,
}

impl ProjectileParams {
    pub fn validate(&self) -> Result<(), String> {
        non_negative("speed", self.speed)?;
        non_negative("windup", self.windup)?;
        non_negative("turn_rate_deg", self.turn_rate_deg)?;
        non_negative("max_distance", self.max_distance)?;
        non_negative("lifetime", self.lifetime)?;
        if self.max_distance <= 0.0 && self.lifetime <= 0.0 {
            return Err("needs a positive max_distance or lifetime".to_string());
        }
        Ok(())
    }
}

pub struct Projectile {
    params: ProjectileParams,
    clock: PhaseClock,
    traveled: f32,
    struck: Vec<EntityId>,
    hits: u32,
    exploded: bool,
}

impl Projectile {
    pub fn new(params: ProjectileParams) -> Self {
        let clock = PhaseClock::new(params.windup, duration_or_unbounded(params.lifetime), 0.0);
        Self {
            params,
            clock,
            traveled: 0.0,
            struck: Vec::new(),
            hits: 0,
            exploded: false,
        }
    }

    fn steer(&self, ctx: &mut EffectContext, dt: f32) {
        let Some(target) = ctx.target().filter(|t| ctx.is_alive(*t)) else {
            return;
        };
        let Some(target_position) = ctx.position_of(target) else {
            return;
        };
        let desired = target_position - ctx.position();
        if desired.length_squared() <= f32::EPSILON {
            return;
        }
        let current = ctx.direction();
        let max_turn = (self.params.turn_rate_deg * dt).to_radians();
        let angle = current
            .perp_dot(desired)
            .atan2(current.dot(desired))
            .clamp(-max_turn, max_turn);
        ctx.set_direction(Vec2::from_angle(angle).rotate(current));
    }

    fn fly(&mut self, ctx: &mut EffectContext, dt: f32) {
        if self.params.homing {
            self.steer(ctx, dt);
        }
        let mut step = self.params.speed * dt;
        if self.params.max_distance > 0.0 {
            step = step.min(self.params.max_distance - self.traveled);
        }
        let position = ctx.position() + ctx.direction() * step;
        ctx.set_position(position);
        self.traveled += step;

        if self.params.max_distance > 0.0 && self.traveled >= self.params.max_distance {
            self.stop(ctx);
        }
    }

    fn stop(&mut self, ctx: &mut EffectContext) {
        ctx.set_collider(false);
        if !self.exploded {
            self.exploded = true;
            if let Some(explode) = &self.params.explode {
                let at = ctx.position();
                ctx.spawn(SpawnRequest::new(explode.clone()).at(at).detached());
            }
        }
        self.clock.finish();
    }
}

impl AttackComponent for Projectile {
    fn name(&self) -> &'static str {
        "Projectile"
    }

    fn activate(&mut self, ctx: &mut EffectContext, direction: Vec2) {
        let mut facing = facing_or_default(direction);
        if self.params.homing {
            let aim = ctx
                .target()
                .and_then(|target| ctx.position_of(target))
                .map(|at| at - ctx.position());
            if let Some(aim) = aim.filter(|aim| aim.length_squared() > f32::EPSILON) {
                facing = aim.normalize();
            }
        }
        ctx.set_direction(facing);
        if self.clock.start() == Phase::Active {
            ctx.set_collider(true);
            ctx.show_body();
        }
    }

    fn deactivate(&mut self, ctx: &mut EffectContext) {
        ctx.set_collider(false);
        ctx.hide_body();
    }

    fn update(&mut self, ctx: &mut EffectContext, dt: f32) {
        match self.clock.advance(dt) {
            Some(Phase::Active) => {
                ctx.set_collider(true);
                ctx.show_body();
            }
            Some(Phase::Finishing) | Some(Phase::Finished) => {
                // Lifetime ran out
                self.stop(ctx);
                self.clock.complete();
            }
            _ => {}
        }
        if self.clock.is(Phase::Active) {
            self.fly(ctx, dt);
        }
        self.clock.conclude(ctx);
    }

    fn process_collision(&mut self, ctx: &mut EffectContext, target: EntityId) {
        if !self.clock.is(Phase::Active) || self.struck.contains(&target) {
            return;
        }
        self.struck.push(target);
        if ctx.strike(target).is_none() {
            return;
        }
        self.hits += 1;
        if self.hits > self.params.pierce {
            self.stop(ctx);
            self.clock.conclude(ctx);
        }
    }

    fn on_event(&mut self, ctx: &mut EffectContext, event: &EffectEvent) -> bool {
        match event {
            EffectEvent::Retarget(target) => ctx.set_target(Some(*target)),
            EffectEvent::Cancel => {
                self.stop(ctx);
                self.clock.conclude(ctx);
                true
            }
            _ => false,
        }
    }

    fn reset(&mut self) {
        self.clock.reset();
        self.traveled = 0.0;
        self.struck.clear();
        self.hits = 0;
        self.exploded = false;
    }

    fn phase(&self) -> Phase {
        self.clock.phase()
    }
}
