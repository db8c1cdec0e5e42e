//! Headless scenario execution
//!
//! Two drivers over the same pieces:
//! - `ScenarioRunner` steps the engine directly at a fixed `dt`, for tests and
//!   tooling that want a result value without an app.
//! - `HeadlessPlugin` / `run_headless_scenario` run the same scenario inside a
//!   minimal Bevy app through `EffectEnginePlugin`, with a manual time step so
//!   runs are reproducible.

use std::collections::BTreeMap;
use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use serde::Serialize;

use super::config::{ScenarioConfig, ScheduledCast};
use crate::combat::log::CombatLogEventType;
use crate::combat::{tick_effects, EffectEnginePlugin};
use crate::effects::{load_template_library, CastRequest, EffectEngine, TemplateLibrary};
use crate::error::ConfigError;
use crate::settings::EngineSettings;
use crate::world::{Arena, EntityHost, EntityId, GameRng};

/// How a scenario ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScenarioOutcome {
    AllEnemiesDefeated,
    /// Every cast was issued and every effect has ended
    Quiescent,
    TimedOut,
}

/// Statistics for a single combatant after the run
#[derive(Debug, Clone, Serialize)]
pub struct CombatantResult {
    pub name: String,
    pub team: u8,
    pub max_health: f32,
    /// Health remaining at the end (0 if dead)
    pub final_health: f32,
    pub survived: bool,
    pub damage_dealt: f32,
    pub damage_taken: f32,
}

/// Result of a completed scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub outcome: ScenarioOutcome,
    /// Simulated seconds
    pub elapsed: f32,
    pub ticks: u32,
    pub casts_issued: usize,
    /// Casts that produced no instance (unknown template, dead caster)
    pub casts_failed: usize,
    pub enemies_alive: usize,
    pub total_damage: f32,
    pub damage_by_template: BTreeMap<String, f32>,
    pub combatants: Vec<CombatantResult>,
    /// Random seed used (if deterministic mode)
    pub random_seed: Option<u64>,
}

/// Scheduled casts, ordered by time. Casts sharing a time keep file order.
#[derive(Debug, Clone, Default)]
pub struct CastSchedule {
    casts: Vec<ScheduledCast>,
    next: usize,
}

impl CastSchedule {
    pub fn new(mut casts: Vec<ScheduledCast>) -> Self {
        casts.sort_by(|a, b| a.at_secs.total_cmp(&b.at_secs));
        Self { casts, next: 0 }
    }

    /// Pop every cast due at or before `now`.
    pub fn due(&mut self, now: f32) -> Vec<ScheduledCast> {
        let start = self.next;
        while self.next < self.casts.len() && self.casts[self.next].at_secs <= now + 1e-4 {
            self.next += 1;
        }
        self.casts[start..self.next].to_vec()
    }

    pub fn is_exhausted(&self) -> bool {
        self.next >= self.casts.len()
    }

    pub fn remaining(&self) -> usize {
        self.casts.len() - self.next
    }
}

/// Player and enemy ids in the arena, in scenario order.
#[derive(Debug, Clone)]
pub struct ScenarioRoster {
    pub player: EntityId,
    pub enemies: Vec<EntityId>,
}

impl ScenarioRoster {
    fn spawn(arena: &mut Arena, config: &ScenarioConfig) -> Self {
        let player = arena.spawn(&config.player);
        let enemies = config.enemies.iter().map(|spec| arena.spawn(spec)).collect();
        Self { player, enemies }
    }

    /// Turn a scheduled cast into an engine request.
    pub fn request(&self, arena: &Arena, cast: &ScheduledCast) -> CastRequest {
        let mut request = CastRequest::new(cast.template.clone(), self.player).toward(cast.direction());
        let target = cast.target.and_then(|index| self.enemies.get(index).copied());
        if let Some(target) = target {
            request = request.targeting(target);
            if cast.aim_at_target {
                let aim = arena
                    .position(target)
                    .zip(arena.position(self.player))
                    .map(|(to, from)| to - from);
                if let Some(aim) = aim.filter(|aim| aim.length_squared() > f32::EPSILON) {
                    request = request.toward(aim.normalize());
                }
            }
        }
        request
    }

    pub fn enemies_alive(&self, arena: &Arena) -> usize {
        self.enemies.iter().filter(|enemy| arena.is_alive(**enemy)).count()
    }
}

fn build_arena(seed: Option<u64>) -> Arena {
    let rng = match seed {
        Some(seed) => {
            info!("Using deterministic RNG with seed: {}", seed);
            GameRng::from_seed(seed)
        }
        None => {
            info!("Using non-deterministic RNG (no seed provided)");
            GameRng::from_entropy()
        }
    };
    Arena::new(rng)
}

fn build_engine(library: TemplateLibrary, settings: EngineSettings) -> EffectEngine {
    let mut engine = EffectEngine::new(library, settings);
    engine.prewarm();
    engine
}

/// Decide whether the run is over.
pub fn evaluate_end(
    arena: &Arena,
    engine: &EffectEngine,
    roster: &ScenarioRoster,
    schedule: &CastSchedule,
    elapsed: f32,
    max_duration: f32,
) -> Option<ScenarioOutcome> {
    if roster.enemies_alive(arena) == 0 {
        Some(ScenarioOutcome::AllEnemiesDefeated)
    } else if schedule.is_exhausted() && engine.active_count() == 0 {
        Some(ScenarioOutcome::Quiescent)
    } else if elapsed >= max_duration {
        Some(ScenarioOutcome::TimedOut)
    } else {
        None
    }
}

#[allow(clippy::too_many_arguments)]
fn build_result(
    arena: &Arena,
    engine: &EffectEngine,
    roster: &ScenarioRoster,
    outcome: ScenarioOutcome,
    elapsed: f32,
    ticks: u32,
    casts_issued: usize,
    casts_failed: usize,
    random_seed: Option<u64>,
) -> ScenarioResult {
    let combatants = arena
        .combatants()
        .iter()
        .map(|combatant| CombatantResult {
            name: combatant.name.clone(),
            team: combatant.team,
            max_health: combatant.max_health,
            final_health: combatant.health.max(0.0),
            survived: combatant.is_alive(),
            damage_dealt: combatant.damage_dealt,
            damage_taken: combatant.damage_taken,
        })
        .collect();

    ScenarioResult {
        outcome,
        elapsed,
        ticks,
        casts_issued,
        casts_failed,
        enemies_alive: roster.enemies_alive(arena),
        total_damage: engine.log().total_damage(),
        damage_by_template: engine.log().damage_by_template(),
        combatants,
        random_seed,
    }
}

fn announce_end(engine: &mut EffectEngine, outcome: ScenarioOutcome, elapsed: f32) {
    let message = match outcome {
        ScenarioOutcome::AllEnemiesDefeated => format!("All enemies defeated after {:.2}s", elapsed),
        ScenarioOutcome::Quiescent => format!("All effects ended after {:.2}s", elapsed),
        ScenarioOutcome::TimedOut => format!("Scenario timed out after {:.2}s", elapsed),
    };
    info!("{}", message);
    engine.log_mut().log(CombatLogEventType::MatchEvent, message);
}

fn save_log(engine: &EffectEngine, path: &str) {
    match engine.log().save_to_file(path) {
        Ok(()) => println!("Scenario complete. Log saved to: {}", path),
        Err(e) => eprintln!("Failed to save combat log: {}", e),
    }
}

// ----------------------------------------------------------------------
// Direct runner
// ----------------------------------------------------------------------

/// Fixed-step scenario driver
pub struct ScenarioRunner {
    arena: Arena,
    engine: EffectEngine,
    roster: ScenarioRoster,
    schedule: CastSchedule,
    dt: f32,
    max_duration: f32,
    elapsed: f32,
    ticks: u32,
    casts_issued: usize,
    casts_failed: usize,
    random_seed: Option<u64>,
    output_path: Option<String>,
    result: Option<ScenarioResult>,
}

impl ScenarioRunner {
    /// Load the template library and settings named by the scenario.
    pub fn new(config: ScenarioConfig) -> Result<Self, ConfigError> {
        let library = load_template_library(&config.templates_path)?;
        let settings = EngineSettings::load(&config.settings_path);
        Ok(Self::with_library(config, library, settings))
    }

    pub fn with_library(config: ScenarioConfig, library: TemplateLibrary, settings: EngineSettings) -> Self {
        let dt = 1.0 / config.tick_rate.unwrap_or(settings.default_tick_rate);
        let mut arena = build_arena(config.random_seed);
        let roster = ScenarioRoster::spawn(&mut arena, &config);
        let mut engine = build_engine(library, settings);
        engine.log_mut().log(
            CombatLogEventType::MatchEvent,
            format!("Scenario started: {} vs {} enemies", config.player.name, config.enemies.len()),
        );

        Self {
            arena,
            engine,
            roster,
            schedule: CastSchedule::new(config.casts),
            dt,
            max_duration: config.max_duration_secs,
            elapsed: 0.0,
            ticks: 0,
            casts_issued: 0,
            casts_failed: 0,
            random_seed: config.random_seed,
            output_path: config.output_path,
            result: None,
        }
    }

    /// Issue due casts, then advance one fixed step. Returns the result once
    /// the scenario has ended.
    pub fn step(&mut self) -> Option<&ScenarioResult> {
        if self.result.is_some() {
            return self.result.as_ref();
        }

        for cast in self.schedule.due(self.elapsed) {
            let request = self.roster.request(&self.arena, &cast);
            self.casts_issued += 1;
            if self.engine.cast(&mut self.arena, request).is_none() {
                self.casts_failed += 1;
            }
        }

        self.arena.tick(self.dt);
        self.engine.tick(&mut self.arena, self.dt);
        self.elapsed += self.dt;
        self.ticks += 1;

        let outcome = evaluate_end(
            &self.arena,
            &self.engine,
            &self.roster,
            &self.schedule,
            self.elapsed,
            self.max_duration,
        )?;
        self.engine.deactivate_all(&mut self.arena);
        announce_end(&mut self.engine, outcome, self.elapsed);
        self.result = Some(build_result(
            &self.arena,
            &self.engine,
            &self.roster,
            outcome,
            self.elapsed,
            self.ticks,
            self.casts_issued,
            self.casts_failed,
            self.random_seed,
        ));
        self.result.as_ref()
    }

    pub fn run_to_completion(mut self) -> ScenarioResult {
        loop {
            if let Some(result) = self.step() {
                let result = result.clone();
                if let Some(path) = &self.output_path {
                    save_log(&self.engine, path);
                }
                return result;
            }
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn engine(&self) -> &EffectEngine {
        &self.engine
    }

    pub fn roster(&self) -> &ScenarioRoster {
        &self.roster
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }
}

// ----------------------------------------------------------------------
// Bevy app
// ----------------------------------------------------------------------

/// Resource to track headless scenario state
#[derive(Resource)]
pub struct HeadlessScenarioState {
    pub roster: ScenarioRoster,
    pub schedule: CastSchedule,
    pub max_duration: f32,
    /// Elapsed simulation time
    pub elapsed: f32,
    pub ticks: u32,
    pub casts_issued: usize,
    pub casts_failed: usize,
    pub output_path: Option<String>,
    pub random_seed: Option<u64>,
    pub complete: bool,
    /// Populated when the scenario completes
    pub result: Option<ScenarioResult>,
}

/// Plugin for headless scenario execution
pub struct HeadlessPlugin {
    pub config: ScenarioConfig,
    pub library: TemplateLibrary,
    pub settings: EngineSettings,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        let dt = 1.0 / self.config.tick_rate.unwrap_or(self.settings.default_tick_rate);
        let mut arena = build_arena(self.config.random_seed);
        let roster = ScenarioRoster::spawn(&mut arena, &self.config);
        let engine = build_engine(self.library.clone(), self.settings.clone());

        app.add_plugins(EffectEnginePlugin)
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(dt)))
            .insert_resource(arena)
            .insert_resource(engine)
            .insert_resource(HeadlessScenarioState {
                roster,
                schedule: CastSchedule::new(self.config.casts.clone()),
                max_duration: self.config.max_duration_secs,
                elapsed: 0.0,
                ticks: 0,
                casts_issued: 0,
                casts_failed: 0,
                output_path: self.config.output_path.clone(),
                random_seed: self.config.random_seed,
                complete: false,
                result: None,
            })
            .add_systems(Startup, headless_setup)
            .add_systems(
                Update,
                (
                    headless_issue_casts.before(tick_effects),
                    headless_check_end.after(tick_effects),
                ),
            )
            .add_systems(PostUpdate, headless_exit_on_complete);
    }
}

fn headless_setup(mut engine: ResMut<EffectEngine>, state: Res<HeadlessScenarioState>) {
    engine.log_mut().log(
        CombatLogEventType::MatchEvent,
        "Scenario started (headless mode)!".to_string(),
    );
    info!(
        "Headless scenario setup complete: {} enemies, {} casts scheduled",
        state.roster.enemies.len(),
        state.schedule.remaining()
    );
}

fn headless_issue_casts(
    mut state: ResMut<HeadlessScenarioState>,
    mut arena: ResMut<Arena>,
    mut engine: ResMut<EffectEngine>,
) {
    if state.complete {
        return;
    }
    let now = state.elapsed;
    for cast in state.schedule.due(now) {
        let request = state.roster.request(&arena, &cast);
        state.casts_issued += 1;
        if engine.cast(&mut *arena, request).is_none() {
            state.casts_failed += 1;
        }
    }
}

fn headless_check_end(
    time: Res<Time>,
    mut state: ResMut<HeadlessScenarioState>,
    mut arena: ResMut<Arena>,
    mut engine: ResMut<EffectEngine>,
) {
    if state.complete {
        return;
    }
    state.elapsed += time.delta_secs();
    state.ticks += 1;

    let Some(outcome) = evaluate_end(
        &arena,
        &engine,
        &state.roster,
        &state.schedule,
        state.elapsed,
        state.max_duration,
    ) else {
        return;
    };

    engine.deactivate_all(&mut *arena);
    announce_end(&mut engine, outcome, state.elapsed);
    let result = build_result(
        &arena,
        &engine,
        &state.roster,
        outcome,
        state.elapsed,
        state.ticks,
        state.casts_issued,
        state.casts_failed,
        state.random_seed,
    );
    if let Some(path) = &state.output_path {
        save_log(&engine, path);
    }
    state.result = Some(result);
    state.complete = true;
}

/// Exit the app when the scenario is complete
fn headless_exit_on_complete(state: Res<HeadlessScenarioState>, mut exit: EventWriter<AppExit>) {
    if state.complete {
        exit.send(AppExit::Success);
    }
}

/// Run a headless scenario inside a minimal Bevy app
pub fn run_headless_scenario(config: ScenarioConfig) -> Result<(), ConfigError> {
    let library = load_template_library(&config.templates_path)?;
    let settings = EngineSettings::load(&config.settings_path);

    println!("Starting headless scenario...");
    println!("  Player: {}", config.player.name);
    println!("  Enemies: {}", config.enemies.len());
    println!("  Casts: {}", config.casts.len());
    println!("  Max duration: {:.0}s", config.max_duration_secs);

    App::new()
        // Minimal plugins - no window, no rendering
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::ZERO)))
        .add_plugins(bevy::log::LogPlugin::default())
        .add_plugins(HeadlessPlugin {
            config,
            library,
            settings,
        })
        .run();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cast(at: f32, template: &str) -> ScheduledCast {
        ScheduledCast {
            at_secs: at,
            template: template.to_string(),
            direction: [1.0, 0.0],
            target: None,
            aim_at_target: false,
        }
    }

    #[test]
    fn test_schedule_orders_by_time_and_keeps_ties_stable() {
        let mut schedule = CastSchedule::new(vec![cast(1.0, "b"), cast(0.0, "a"), cast(1.0, "c")]);
        assert_eq!(schedule.due(0.0).len(), 1);
        let later: Vec<String> = schedule.due(1.0).into_iter().map(|c| c.template).collect();
        assert_eq!(later, vec!["b".to_string(), "c".to_string()]);
        assert!(schedule.is_exhausted());
    }

    #[test]
    fn test_nothing_due_before_its_time() {
        let mut schedule = CastSchedule::new(vec![cast(0.5, "a")]);
        assert!(schedule.due(0.25).is_empty());
        assert_eq!(schedule.remaining(), 1);
    }
}
