//! Keeps an instance anchored on its owner. Never ends on its own; pair it
//! with a behavior that does, or let a parent cascade it.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::effects::component::{AttackComponent, EffectEvent, Phase, PhaseClock};
use crate::effects::context::EffectContext;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowParams {
    pub offset: [f32; 2],
    /// Rotate the offset by the instance's direction
    pub rotate_with_direction: bool,
}

pub struct FollowOwner {
    params: FollowParams,
    clock: PhaseClock,
}

impl FollowOwner {
    pub fn new(params: FollowParams) -> Self {
        Self {
            params,
            clock: PhaseClock::default(),
        }
    }

    fn snap(&self, ctx: &mut EffectContext) {
        let Some(owner) = ctx.owner_position() else {
            return;
        };
        let mut offset = Vec2::from(self.params.offset);
        if self.params.rotate_with_direction {
            offset = ctx.direction().rotate(offset);
        }
        ctx.set_position(owner + offset);
    }
}

impl AttackComponent for FollowOwner {
    fn name(&self) -> &'static str {
        "FollowOwner"
    }

    fn activate(&mut self, ctx: &mut EffectContext, _direction: Vec2) {
        self.clock.start();
        self.snap(ctx);
        ctx.show_body();
    }

    fn deactivate(&mut self, ctx: &mut EffectContext) {
        ctx.hide_body();
    }

    fn update(&mut self, ctx: &mut EffectContext, _dt: f32) {
        if self.clock.is(Phase::Active) {
            self.snap(ctx);
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
    }

    fn phase(&self) -> Phase {
        self.clock.phase()
    }
}
