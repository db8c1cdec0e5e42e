//! Combat integration
//!
//! Bevy-facing side of the effect engine:
//! - `log`: the gameplay combat log (hits, statuses, lifecycle, config errors)
//! - `events`: `EngineEvent`s drained from the engine after every operation
//! - `EffectEnginePlugin`: ticks the `Arena` host and the `EffectEngine` from
//!   `Time`, scaled by `SimulationSpeed`

use bevy::prelude::*;

pub mod events;
pub mod log;

use crate::effects::{CastRequest, EffectEngine};
use crate::world::Arena;
use events::EngineEvent;

/// Cast request sent by gameplay systems; resolved before the next tick.
#[derive(Event, Debug, Clone)]
pub struct CastEvent(pub CastRequest);

/// Plugin for the effect engine. `Arena` and `EffectEngine` are inserted by
/// the app (they need a template library and a seed); systems idle until
/// both exist.
pub struct EffectEnginePlugin;

impl Plugin for EffectEnginePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<EngineEvent>()
            .add_event::<CastEvent>()
            .init_resource::<SimulationSpeed>()
            .add_systems(Update, (process_cast_events, tick_effects).chain());
    }
}

/// Resolve queued `CastEvent`s against the host.
pub fn process_cast_events(
    mut casts: EventReader<CastEvent>,
    arena: Option<ResMut<Arena>>,
    engine: Option<ResMut<EffectEngine>>,
    mut engine_events: EventWriter<EngineEvent>,
) {
    let (Some(mut arena), Some(mut engine)) = (arena, engine) else {
        casts.clear();
        return;
    };
    for CastEvent(request) in casts.read() {
        engine.cast(&mut *arena, request.clone());
    }
    for event in engine.drain_events() {
        engine_events.send(event);
    }
}

/// Count down host stat modifiers, then advance every live effect.
pub fn tick_effects(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    arena: Option<ResMut<Arena>>,
    engine: Option<ResMut<EffectEngine>>,
    mut engine_events: EventWriter<EngineEvent>,
) {
    let (Some(mut arena), Some(mut engine)) = (arena, engine) else {
        return;
    };
    let dt = time.delta_secs() * speed.multiplier;
    if dt <= 0.0 {
        return;
    }

    arena.tick(dt);
    engine.tick(&mut *arena, dt);
    for event in engine.drain_events() {
        engine_events.send(event);
    }
}

/// Controls the speed of the combat simulation
#[derive(Resource)]
pub struct SimulationSpeed {
    /// Speed multiplier (0.0 = paused, 0.5 = half speed, 1.0 = normal, 2.0 = double)
    pub multiplier: f32,
}

impl Default for SimulationSpeed {
    fn default() -> Self {
        Self { multiplier: 1.0 }
    }
}

impl SimulationSpeed {
    pub fn pause(&mut self) {
        self.multiplier = 0.0;
    }

    pub fn half_speed(&mut self) {
        self.multiplier = 0.5;
    }

    pub fn normal_speed(&mut self) {
        self.multiplier = 1.0;
    }

    pub fn double_speed(&mut self) {
        self.multiplier = 2.0;
    }

    pub fn is_paused(&self) -> bool {
        self.multiplier == 0.0
    }
}
