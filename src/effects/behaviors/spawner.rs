//! Sub-effect spawner
//!
//! Spawns `count` instances of `template`, one every `interval` (all at once
//! when the interval is zero). Directions fan out evenly across `spread_deg`
//! around the instance's facing. Attached children keep the spawner in
//! `Finishing` until they end, for at most `linger_limit` seconds.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::non_negative;
use crate::effects::component::{AttackComponent, EffectEvent, Phase, PhaseClock};
use crate::effects::context::{EffectContext, SpawnRequest};
use crate::targeting::{facing_or_default, rotate_deg};

fn default_attach() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnerParams {
    pub template: String,
    pub count: u32,
    #[serde(default)]
    pub interval: f32,
    #[serde(default)]
    pub spread_deg: f32,
    #[serde(default = "default_attach")]
    pub attach: bool,
    /// Spawn at the explicit target instead of the instance's position
    #[serde(default)]
    pub at_target: bool,
    #[serde(default)]
    pub windup: f32,
    #[serde(default)]
    pub linger_limit: f32,
}

impl SpawnerParams {
    pub fn validate(&self) -> Result<(), String> {
        non_negative("interval", self.interval)?;
        non_negative("spread_deg", self.spread_deg)?;
        non_negative("windup", self.windup)?;
        non_negative("linger_limit", self.linger_limit)?;
        if self.count == 0 {
            return Err("count must be at least 1".to_string());
        }
        Ok(())
    }

    /// Facing offset of the `index`-th spawn, degrees.
    fn angle_of(&self, index: u32) -> f32 {
        if self.count <= 1 {
            return 0.0;
        }
        -self.spread_deg * 0.5 + self.spread_deg * index as f32 / (self.count - 1) as f32
    }
}

pub struct SubEffectSpawner {
    params: SpawnerParams,
    clock: PhaseClock,
    spawned: u32,
    timer: f32,
    facing: Vec2,
}

impl SubEffectSpawner {
    pub fn new(params: SpawnerParams) -> Self {
        let clock = PhaseClock::until_finished(params.windup, params.linger_limit);
        Self {
            params,
            clock,
            spawned: 0,
            timer: 0.0,
            facing: Vec2::X,
        }
    }

    fn spawn_next(&mut self, ctx: &mut EffectContext) {
        let direction = rotate_deg(self.facing, self.params.angle_of(self.spawned));
        self.spawned += 1;

        let mut request = SpawnRequest::new(self.params.template.clone()).toward(direction);
        if let Some(target) = ctx.target() {
            request = request.targeting(target);
            if self.params.at_target {
                if let Some(position) = ctx.position_of(target) {
                    request = request.at(position);
                }
            }
        }
        if !self.params.attach {
            request = request.detached();
        }
        ctx.spawn(request);
    }

    fn run(&mut self, ctx: &mut EffectContext, dt: f32) {
        if self.params.interval <= 0.0 {
            while self.spawned < self.params.count {
                self.spawn_next(ctx);
            }
        } else {
            self.timer += dt;
            while self.timer >= self.params.interval && self.spawned < self.params.count {
                self.timer -= self.params.interval;
                self.spawn_next(ctx);
            }
        }
        if self.spawned >= self.params.count {
            self.clock.finish();
        }
        self.settle(ctx);
    }

    fn settle(&mut self, ctx: &mut EffectContext) {
        if self.clock.is(Phase::Finishing) && !ctx.has_children() {
            self.clock.complete();
        }
        self.clock.conclude(ctx);
    }

    fn begin(&mut self, ctx: &mut EffectContext) {
        // The first spawn lands on entering Active
        self.timer = self.params.interval;
        self.run(ctx, 0.0);
    }
}

impl AttackComponent for SubEffectSpawner {
    fn name(&self) -> &'static str {
        "SubEffectSpawner"
    }

    fn activate(&mut self, ctx: &mut EffectContext, direction: Vec2) {
        self.facing = facing_or_default(direction);
        if self.clock.start() == Phase::Active {
            self.begin(ctx);
        }
    }

    fn deactivate(&mut self, _ctx: &mut EffectContext) {}

    fn update(&mut self, ctx: &mut EffectContext, dt: f32) {
        match self.clock.advance(dt) {
            Some(Phase::Active) => self.begin(ctx),
            _ if self.clock.is(Phase::Active) => self.run(ctx, dt),
            _ => self.settle(ctx),
        }
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
        self.spawned = 0;
        self.timer = 0.0;
        self.facing = Vec2::X;
    }

    fn phase(&self) -> Phase {
        self.clock.phase()
    }
}
