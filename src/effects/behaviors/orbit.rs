//! Orbiting satellites
//!
//! Spawns `count` satellite children around the owner and moves them along a
//! shared ring every tick. Satellites that end on their own (a spent hit
//! budget, say) drop out of the ring and the survivors re-space smoothly.
//! The orbit itself ends when its `duration` runs out or the ring empties;
//! any satellites still alive are cascaded down with it.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::non_negative;
use crate::effects::attack::AttackId;
use crate::effects::component::{AttackComponent, EffectEvent, Phase, PhaseClock};
use crate::effects::context::{EffectContext, SpawnRequest};
use crate::targeting::{OrbitRing, OrbitShape};

fn default_respace_time() -> f32 {
    0.3
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitParams {
    pub count: u32,
    pub radius_x: f32,
    pub radius_y: f32,
    /// Degrees per second
    pub speed: f32,
    #[serde(default)]
    pub clockwise: bool,
    #[serde(default = "default_respace_time")]
    pub respace_time: f32,
    /// Template of each satellite
    pub satellite: String,
    /// Zero means until cancelled or emptied
    #[serde(default)]
    pub duration: f32,
}

impl OrbitParams {
    pub fn validate(&self) -> Result<(), String> {
        non_negative("radius_x", self.radius_x)?;
        non_negative("radius_y", self.radius_y)?;
        non_negative("respace_time", self.respace_time)?;
        non_negative("duration", self.duration)?;
        if !self.speed.is_finite() {
            return Err("speed must be finite".to_string());
        }
        if self.satellite.is_empty() {
            return Err("satellite template id is empty".to_string());
        }
        Ok(())
    }

    fn shape(&self) -> OrbitShape {
        OrbitShape {
            radius_x: self.radius_x,
            radius_y: self.radius_y,
            speed: self.speed,
            clockwise: self.clockwise,
            respace_time: self.respace_time,
        }
    }
}

pub struct SatelliteOrbit {
    params: OrbitParams,
    clock: PhaseClock,
    ring: OrbitRing<AttackId>,
}

impl SatelliteOrbit {
    pub fn new(params: OrbitParams) -> Self {
        let clock = PhaseClock::new(0.0, super::duration_or_unbounded(params.duration), 0.0);
        let ring = OrbitRing::new(params.shape());
        Self {
            params,
            clock,
            ring,
        }
    }

    pub fn ring(&self) -> &OrbitRing<AttackId> {
        &self.ring
    }

    fn spawn_satellite(&self, ctx: &mut EffectContext) -> Option<AttackId> {
        ctx.spawn(SpawnRequest::new(self.params.satellite.clone()))
    }

    fn anchor(ctx: &mut EffectContext) -> Vec2 {
        let anchor = ctx.owner_position().unwrap_or(ctx.position());
        ctx.set_position(anchor);
        anchor
    }

    fn place_all(&self, ctx: &mut EffectContext, anchor: Vec2) {
        for (satellite, position) in self.ring.positions(anchor) {
            ctx.place(satellite, position);
        }
    }

    fn end_if_empty(&mut self, ctx: &mut EffectContext) {
        if self.ring.is_empty() {
            self.clock.finish();
        }
        self.clock.conclude(ctx);
    }
}

impl AttackComponent for SatelliteOrbit {
    fn name(&self) -> &'static str {
        "OrbitRing"
    }

    fn activate(&mut self, ctx: &mut EffectContext, _direction: Vec2) {
        self.ring = OrbitRing::new(self.params.shape());
        let satellites: Vec<AttackId> = (0..self.params.count)
            .filter_map(|_| self.spawn_satellite(ctx))
            .collect();
        self.ring.populate(satellites);

        self.clock.start();
        let anchor = Self::anchor(ctx);
        self.place_all(ctx, anchor);
        self.end_if_empty(ctx);
    }

    fn deactivate(&mut self, _ctx: &mut EffectContext) {
        self.ring.clear();
    }

    fn update(&mut self, ctx: &mut EffectContext, dt: f32) {
        self.clock.advance(dt);
        if self.clock.is(Phase::Active) {
            let anchor = Self::anchor(ctx);
            self.ring.advance(dt);
            self.place_all(ctx, anchor);
        }
        self.clock.conclude(ctx);
    }

    fn on_event(&mut self, ctx: &mut EffectContext, event: &EffectEvent) -> bool {
        match event {
            EffectEvent::ChildDeactivated(child) => {
                if self.ring.remove(*child) {
                    self.end_if_empty(ctx);
                }
                true
            }
            EffectEvent::AddSatellite if self.clock.is(Phase::Active) => {
                if let Some(satellite) = self.spawn_satellite(ctx) {
                    self.ring.add(satellite);
                    let anchor = Self::anchor(ctx);
                    self.place_all(ctx, anchor);
                }
                true
            }
            EffectEvent::RemoveSatellite => {
                if let Some(newest) = self.ring.keys().last() {
                    self.ring.remove(newest);
                    ctx.deactivate(newest);
                    self.end_if_empty(ctx);
                }
                true
            }
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
        self.ring.clear();
    }

    fn phase(&self) -> Phase {
        self.clock.phase()
    }
}
