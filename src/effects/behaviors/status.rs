//! One-shot status application

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::non_negative;
use crate::effects::component::{AttackComponent, EffectEvent, Phase, PhaseClock};
use crate::effects::context::EffectContext;
use crate::stats::StatusSpec;

/// Who receives the status.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum StatusScope {
    Owner,
    /// The instance's explicit target
    Target,
    /// Every enemy within the radius of the instance
    EnemiesInRadius(f32),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusParams {
    pub status: StatusSpec,
    pub scope: StatusScope,
    /// Seconds the instance stays alive after applying (for its visual)
    #[serde(default)]
    pub linger: f32,
}

impl StatusParams {
    pub fn validate(&self) -> Result<(), String> {
        non_negative("linger", self.linger)?;
        if let StatusScope::EnemiesInRadius(radius) = self.scope {
            non_negative("radius", radius)?;
        }
        Ok(())
    }
}

pub struct ApplyStatus {
    params: StatusParams,
    clock: PhaseClock,
}

impl ApplyStatus {
    pub fn new(params: StatusParams) -> Self {
        let clock = PhaseClock::new(0.0, params.linger, 0.0);
        Self { params, clock }
    }
}

impl AttackComponent for ApplyStatus {
    fn name(&self) -> &'static str {
        "ApplyStatus"
    }

    fn activate(&mut self, ctx: &mut EffectContext, _direction: Vec2) {
        let recipients = match self.params.scope {
            StatusScope::Owner => vec![ctx.owner()],
            StatusScope::Target => ctx.target().into_iter().collect(),
            StatusScope::EnemiesInRadius(radius) => {
                let center = ctx.position();
                ctx.enemies_within(center, radius).entities().collect()
            }
        };
        for recipient in recipients {
            ctx.apply_status(&self.params.status, recipient);
        }

        self.clock.start();
        if self.params.linger <= 0.0 {
            self.clock.finish();
        } else {
            ctx.show_body();
        }
        self.clock.conclude(ctx);
    }

    fn deactivate(&mut self, ctx: &mut EffectContext) {
        ctx.hide_body();
    }

    fn update(&mut self, ctx: &mut EffectContext, dt: f32) {
        self.clock.advance(dt);
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
    }

    fn phase(&self) -> Phase {
        self.clock.phase()
    }
}
