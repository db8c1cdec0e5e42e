//! Contact damage
//!
//! A live collider that strikes whatever it touches, at most once per
//! `rehit_cooldown` per target. With a `hit_budget` the instance ends after
//! that many successful hits. Satellite bodies are the usual users.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::{duration_or_unbounded, non_negative};
use crate::effects::component::{AttackComponent, EffectEvent, Phase, PhaseClock};
use crate::effects::context::EffectContext;
use crate::stats::StatusSpec;
use crate::world::EntityId;

fn default_rehit_cooldown() -> f32 {
    0.5
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactParams {
    #[serde(default = "default_rehit_cooldown")]
    pub rehit_cooldown: f32,
    #[serde(default)]
    pub hit_budget: Option<u32>,
    #[serde(default)]
    pub status: Option<StatusSpec>,
    /// Zero means until cancelled
    #[serde(default)]
    pub duration: f32,
}

impl ContactParams {
    pub fn validate(&self) -> Result<(), String> {
        non_negative("rehit_cooldown", self.rehit_cooldown)?;
        non_negative("duration", self.duration)?;
        if self.hit_budget == Some(0) {
            return Err("hit_budget must be at least 1".to_string());
        }
        Ok(())
    }
}

pub struct ContactDamage {
    params: ContactParams,
    clock: PhaseClock,
    cooldowns: Vec<(EntityId, f32)>,
    hits: u32,
}

impl ContactDamage {
    pub fn new(params: ContactParams) -> Self {
        let clock = PhaseClock::new(0.0, duration_or_unbounded(params.duration), 0.0);
        Self {
            params,
            clock,
            cooldowns: Vec::new(),
            hits: 0,
        }
    }

    fn cooling_down(&self, target: EntityId) -> bool {
        self.cooldowns.iter().any(|(entity, _)| *entity == target)
    }
}

impl AttackComponent for ContactDamage {
    fn name(&self) -> &'static str {
        "ContactDamage"
    }

    fn activate(&mut self, ctx: &mut EffectContext, _direction: Vec2) {
        self.clock.start();
        ctx.set_collider(true);
        ctx.show_body();
    }

    fn deactivate(&mut self, ctx: &mut EffectContext) {
        ctx.set_collider(false);
        ctx.hide_body();
    }

    fn update(&mut self, ctx: &mut EffectContext, dt: f32) {
        for (_, remaining) in self.cooldowns.iter_mut() {
            *remaining -= dt;
        }
        self.cooldowns.retain(|(_, remaining)| *remaining > 0.0);

        if self.clock.advance(dt).is_some() {
            ctx.set_collider(false);
        }
        self.clock.conclude(ctx);
    }

    fn process_collision(&mut self, ctx: &mut EffectContext, target: EntityId) {
        if !self.clock.is(Phase::Active) || self.cooling_down(target) {
            return;
        }
        let Some(result) = ctx.strike(target) else {
            return;
        };
        self.cooldowns.push((target, self.params.rehit_cooldown));
        self.hits += 1;

        if let (Some(status), true) = (&self.params.status, result.target_alive) {
            ctx.apply_status(status, target);
        }
        if self.params.hit_budget.is_some_and(|budget| self.hits >= budget) {
            ctx.set_collider(false);
            self.clock.finish();
            self.clock.conclude(ctx);
        }
    }

    fn on_event(&mut self, ctx: &mut EffectContext, event: &EffectEvent) -> bool {
        match event {
            EffectEvent::Cancel => {
                ctx.set_collider(false);
                self.clock.finish();
                self.clock.conclude(ctx);
                true
            }
            _ => false,
        }
    }

    fn reset(&mut self) {
        self.clock.reset();
        self.cooldowns.clear();
        self.hits = 0;
    }

    fn phase(&self) -> Phase {
        self.clock.phase()
    }
}
