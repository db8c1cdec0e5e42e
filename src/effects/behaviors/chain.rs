//! Chain lightning
//!
//! On activation, collects every enemy within `radius` of the instance,
//! nearest first, and queues up to `count` of them. Every `delay` seconds one
//! hop lands: the next still-living target takes `damage` and a beam is drawn
//! from the previous hop. Targets that died in the meantime are dropped
//! without costing a hop. With `skip_origin`, the instance's explicit target
//! (the entity whose hit spawned the chain) counts as already struck;
//! otherwise it is an ordinary candidate like every other enemy in range.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::non_negative;
use crate::effects::component::{AttackComponent, EffectEvent, Phase, PhaseClock};
use crate::effects::context::EffectContext;
use crate::stats::StatusSpec;
use crate::targeting::ChainQueue;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainParams {
    pub radius: f32,
    pub count: u32,
    /// Seconds between hops; zero lands every hop at once
    #[serde(default)]
    pub delay: f32,
    pub damage: f32,
    #[serde(default)]
    pub status: Option<StatusSpec>,
    /// Treat the explicit target as already hit. Set on chains spawned from
    /// another effect's hit.
    #[serde(default)]
    pub skip_origin: bool,
}

impl ChainParams {
    pub fn validate(&self) -> Result<(), String> {
        non_negative("radius", self.radius)?;
        non_negative("delay", self.delay)?;
        non_negative("damage", self.damage)
    }
}

pub struct ChainLightning {
    params: ChainParams,
    clock: PhaseClock,
    queue: ChainQueue,
    timer: f32,
}

impl ChainLightning {
    pub fn new(params: ChainParams) -> Self {
        Self {
            params,
            clock: PhaseClock::default(),
            queue: ChainQueue::new(),
            timer: 0.0,
        }
    }

    pub fn hops(&self) -> u32 {
        self.queue.hops()
    }

    /// Land one hop. Returns false when nothing was left to hit.
    fn hop(&mut self, ctx: &mut EffectContext) -> bool {
        let Some(target) = self.queue.next_live(|entity| ctx.is_alive(entity)) else {
            return false;
        };
        let from = self.queue.last_point();
        let to = ctx.position_of(target).unwrap_or(from);

        let result = ctx.strike_with_power(target, self.params.damage);
        ctx.beam(from, to);
        self.queue.record_hop(to);

        if let (Some(status), Some(result)) = (&self.params.status, result) {
            if result.target_alive {
                ctx.apply_status(status, target);
            }
        }
        true
    }

    fn propagate(&mut self, ctx: &mut EffectContext, dt: f32) {
        if self.params.delay <= 0.0 {
            while !self.queue.is_exhausted() && self.hop(ctx) {}
        } else {
            self.timer += dt;
            while self.timer >= self.params.delay && !self.queue.is_exhausted() {
                self.timer -= self.params.delay;
                if !self.hop(ctx) {
                    break;
                }
            }
        }
        if self.queue.is_exhausted() {
            self.clock.finish();
        }
        self.clock.conclude(ctx);
    }
}

impl AttackComponent for ChainLightning {
    fn name(&self) -> &'static str {
        "ChainLightning"
    }

    fn activate(&mut self, ctx: &mut EffectContext, _direction: Vec2) {
        let start = ctx.position();
        let targets = ctx.enemies_within(start, self.params.radius);
        let origin: Vec<_> = ctx
            .target()
            .filter(|_| self.params.skip_origin)
            .into_iter()
            .collect();
        self.queue.seed(targets, self.params.count, &origin, start);
        self.timer = 0.0;
        self.clock.start();

        if self.params.delay <= 0.0 || self.queue.is_exhausted() {
            self.propagate(ctx, 0.0);
        }
    }

    fn deactivate(&mut self, _ctx: &mut EffectContext) {}

    fn update(&mut self, ctx: &mut EffectContext, dt: f32) {
        if self.clock.is(Phase::Active) {
            self.propagate(ctx, dt);
        } else {
            self.clock.advance(dt);
            self.clock.conclude(ctx);
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
        self.queue.clear();
        self.timer = 0.0;
    }

    fn phase(&self) -> Phase {
        self.clock.phase()
    }
}
