//! Melee swing
//!
//! Places the collider `reach` in front of the owner and keeps it there for
//! `active_time`. Each target overlapping the collider is struck once per
//! swing; `on_hit` spawns a nested effect on every struck target.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::non_negative;
use crate::effects::component::{AttackComponent, Phase, PhaseClock};
use crate::effects::context::{EffectContext, SpawnRequest};
use crate::effects::EffectEvent;
use crate::targeting::facing_or_default;
use crate::world::EntityId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeleeSwingParams {
    #[serde(default)]
    pub windup: f32,
    pub active_time: f32,
    #[serde(default)]
    pub recovery: f32,
    /// Collider center distance in front of the owner
    pub reach: f32,
    #[serde(default)]
    pub on_hit: Option<String>,
}

impl MeleeSwingParams {
    pub fn validate(&self) -> Result<(), String> {
        non_negative("windup", self.windup)?;
        non_negative("active_time", self.active_time)?;
        non_negative("recovery", self.recovery)?;
        non_negative("reach", self.reach)
    }
}

pub struct MeleeSwing {
    params: MeleeSwingParams,
    clock: PhaseClock,
    facing: Vec2,
    struck: Vec<EntityId>,
}

impl MeleeSwing {
    pub fn new(params: MeleeSwingParams) -> Self {
        let clock = PhaseClock::new(params.windup, params.active_time, params.recovery);
        Self {
            params,
            clock,
            facing: Vec2::X,
            struck: Vec::new(),
        }
    }

    fn follow_owner(&self, ctx: &mut EffectContext) {
        if let Some(owner) = ctx.owner_position() {
            ctx.set_position(owner + self.facing * self.params.reach);
        }
    }

    fn enter(&mut self, ctx: &mut EffectContext, phase: Phase) {
        match phase {
            Phase::Active => {
                ctx.set_collider(true);
                ctx.show_body();
            }
            Phase::Finishing | Phase::Finished => {
                ctx.set_collider(false);
                ctx.hide_body();
            }
            _ => {}
        }
    }
}

impl AttackComponent for MeleeSwing {
    fn name(&self) -> &'static str {
        "MeleeSwing"
    }

    fn activate(&mut self, ctx: &mut EffectContext, direction: Vec2) {
        self.facing = facing_or_default(direction);
        ctx.set_direction(self.facing);
        self.follow_owner(ctx);
        let phase = self.clock.start();
        self.enter(ctx, phase);
    }

    fn deactivate(&mut self, ctx: &mut EffectContext) {
        ctx.set_collider(false);
        ctx.hide_body();
    }

    fn update(&mut self, ctx: &mut EffectContext, dt: f32) {
        if let Some(phase) = self.clock.advance(dt) {
            self.enter(ctx, phase);
        }
        if matches!(self.clock.phase(), Phase::Preparing | Phase::Active) {
            self.follow_owner(ctx);
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
        if let Some(on_hit) = &self.params.on_hit {
            let mut request = SpawnRequest::new(on_hit.clone())
                .targeting(target)
                .toward(self.facing);
            if let Some(position) = ctx.position_of(target) {
                request = request.at(position);
            }
            ctx.spawn(request);
        }
    }

    fn on_event(&mut self, ctx: &mut EffectContext, event: &EffectEvent) -> bool {
        match event {
            EffectEvent::Cancel => {
                let phase = self.clock.finish();
                self.enter(ctx, phase);
                self.clock.conclude(ctx);
                true
            }
            _ => false,
        }
    }

    fn reset(&mut self) {
        self.clock.reset();
        self.facing = Vec2::X;
        self.struck.clear();
    }

    fn phase(&self) -> Phase {
        self.clock.phase()
    }
}
