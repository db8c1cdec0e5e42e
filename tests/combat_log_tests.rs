//! Tests for the combat log produced by engine runs
//!
//! These tests verify that the CombatLog correctly:
//! - Aggregates damage by template and by target
//! - Records killing blows
//! - Files lifecycle, status and configuration entries under the right type
//! - Round-trips through its JSON dump

use bevy::math::Vec2;
use regex::Regex;

use stormcall::combat::log::{CombatLog, CombatLogEventType};
use stormcall::effects::behaviors::{BehaviorSpec, FanSweepParams, StatusParams, StatusScope};
use stormcall::effects::{CastRequest, EffectEngine, EffectTemplate, TemplateLibrary};
use stormcall::settings::EngineSettings;
use stormcall::stats::{DebuffType, StatType, StatusSpec};
use stormcall::world::{Arena, CombatantSpec, EntityId};

fn sweep() -> EffectTemplate {
    EffectTemplate::named("cleave")
        .with_stat(StatType::AttackPower, 10.0)
        .with_behavior(BehaviorSpec::FanSweep(FanSweepParams {
            radius: 3.0,
            half_angle_deg: 45.0,
            segments: 8,
            windup: 0.0,
            linger_limit: 0.0,
            max_targets: None,
            on_hit: None,
        }))
}

fn shout() -> EffectTemplate {
    EffectTemplate::named("shout").with_behavior(BehaviorSpec::ApplyStatus(StatusParams {
        status: StatusSpec::Debuff {
            kind: DebuffType::Stun,
            magnitude: 0.0,
            multiplier: 1.0,
            duration: 2.0,
            tick_interval: 0.0,
        },
        scope: StatusScope::EnemiesInRadius(3.0),
        linger: 0.0,
    }))
}

/// Hero at the origin facing +x, Foe in front, Bystander behind.
fn setup(foe_health: f32) -> (EffectEngine, Arena, EntityId, EntityId, EntityId) {
    let library = TemplateLibrary::from_templates(vec![sweep(), shout()]).unwrap();
    let engine = EffectEngine::new(library, EngineSettings::default());
    let mut arena = Arena::with_seed(5);
    let hero = arena.spawn(&CombatantSpec::new("Hero", 0, Vec2::ZERO, 100.0));
    let foe = arena.spawn(&CombatantSpec::new("Foe", 1, Vec2::new(1.5, 0.0), foe_health));
    let bystander = arena.spawn(&CombatantSpec::new("Bystander", 1, Vec2::new(-1.5, 0.0), 50.0));
    (engine, arena, hero, foe, bystander)
}

fn cast_and_settle(engine: &mut EffectEngine, arena: &mut Arena, request: CastRequest) {
    engine.cast(arena, request).unwrap();
    for _ in 0..5 {
        engine.tick(arena, 0.1);
    }
}

fn messages(log: &CombatLog, event_type: CombatLogEventType) -> Vec<String> {
    log.filter_by_type(event_type)
        .into_iter()
        .map(|e| e.message.clone())
        .collect()
}

// =============================================================================
// Damage aggregation
// =============================================================================

#[test]
fn test_empty_log_has_no_damage() {
    let log = CombatLog::default();
    assert_eq!(log.total_damage(), 0.0);
    assert!(log.damage_by_template().is_empty());
    assert!(log.killing_blows().is_empty());
}

#[test]
fn test_damage_is_attributed_to_template_and_target() {
    let (mut engine, mut arena, hero, foe, bystander) = setup(100.0);
    cast_and_settle(&mut engine, &mut arena, CastRequest::new("cleave", hero));
    cast_and_settle(&mut engine, &mut arena, CastRequest::new("cleave", hero));

    let log = engine.log();
    assert_eq!(log.total_damage(), 20.0);
    assert_eq!(log.damage_by_template().get("cleave"), Some(&20.0));
    assert_eq!(log.hits_on(foe), 2);
    assert_eq!(log.damage_taken_by(foe), 20.0);
    assert_eq!(log.hits_on(bystander), 0, "Bystander is behind the sweep");
}

#[test]
fn test_overkill_is_capped_at_remaining_health() {
    let (mut engine, mut arena, hero, foe, _) = setup(15.0);
    cast_and_settle(&mut engine, &mut arena, CastRequest::new("cleave", hero));
    cast_and_settle(&mut engine, &mut arena, CastRequest::new("cleave", hero));

    let log = engine.log();
    assert_eq!(log.damage_taken_by(foe), 15.0);
    let blows = log.killing_blows();
    assert_eq!(blows.len(), 1);
    assert_eq!(blows[0].target, foe);
    assert_eq!(blows[0].source, hero);
    assert_eq!(blows[0].amount, 5.0);
}

// =============================================================================
// Messages
// =============================================================================

#[test]
fn test_hit_and_death_messages() {
    let (mut engine, mut arena, hero, _, _) = setup(15.0);
    cast_and_settle(&mut engine, &mut arena, CastRequest::new("cleave", hero));
    cast_and_settle(&mut engine, &mut arena, CastRequest::new("cleave", hero));

    let hit = Regex::new(r"^Hero's cleave (hits|CRITS) Foe for \d+ damage$").unwrap();
    let damage = messages(engine.log(), CombatLogEventType::Damage);
    assert_eq!(damage.len(), 2);
    assert!(damage.iter().all(|m| hit.is_match(m)), "{:?}", damage);

    let deaths = messages(engine.log(), CombatLogEventType::Death);
    assert_eq!(deaths, vec!["Foe has been slain by Hero's cleave".to_string()]);
}

#[test]
fn test_lifecycle_messages_pair_up() {
    let (mut engine, mut arena, hero, _, _) = setup(100.0);
    cast_and_settle(&mut engine, &mut arena, CastRequest::new("cleave", hero));

    let spawned = messages(engine.log(), CombatLogEventType::EffectSpawned);
    let ended = messages(engine.log(), CombatLogEventType::EffectEnded);
    assert_eq!(spawned, vec!["cleave spawned".to_string()]);
    assert_eq!(ended, vec!["cleave ended".to_string()]);

    let spawned_at = engine.log().filter_by_type(CombatLogEventType::EffectSpawned)[0].timestamp;
    let ended_at = engine.log().filter_by_type(CombatLogEventType::EffectEnded)[0].timestamp;
    assert!(spawned_at <= ended_at);
}

#[test]
fn test_status_messages_show_policy_outcome() {
    let (mut engine, mut arena, hero, _, _) = setup(100.0);
    cast_and_settle(&mut engine, &mut arena, CastRequest::new("shout", hero));
    engine.cast(&mut arena, CastRequest::new("shout", hero)).unwrap();
    engine.tick(&mut arena, 0.1);

    let status = Regex::new(r"^(Foe|Bystander) is afflicted by Stun \(Added\)$").unwrap();
    let applied = messages(engine.log(), CombatLogEventType::StatusApplied);
    assert_eq!(applied.len(), 2);
    assert!(applied.iter().all(|m| status.is_match(m)), "{:?}", applied);

    let resisted = Regex::new(r"^(Foe|Bystander) resists Stun \(Ignored\)$").unwrap();
    let ignored = messages(engine.log(), CombatLogEventType::StatusIgnored);
    assert_eq!(ignored.len(), 2);
    assert!(ignored.iter().all(|m| resisted.is_match(m)), "{:?}", ignored);
}

#[test]
fn test_unknown_template_is_a_config_error() {
    let (mut engine, mut arena, hero, _, _) = setup(100.0);
    assert!(engine.cast(&mut arena, CastRequest::new("meteor", hero)).is_none());

    let errors = messages(engine.log(), CombatLogEventType::ConfigError);
    assert_eq!(errors, vec!["Unknown attack template 'meteor'".to_string()]);
    assert!(engine.log().filter_by_type(CombatLogEventType::EffectSpawned).is_empty());
}

// =============================================================================
// Queries and persistence
// =============================================================================

#[test]
fn test_recent_returns_last_entries_in_order() {
    let mut log = CombatLog::default();
    for i in 0..5 {
        log.log(CombatLogEventType::MatchEvent, format!("event {}", i));
    }
    let recent: Vec<_> = log.recent(2).into_iter().map(|e| e.message.as_str()).collect();
    assert_eq!(recent, vec!["event 3", "event 4"]);
    assert_eq!(log.recent(10).len(), 5);
}

#[test]
fn test_log_saves_as_json() {
    let (mut engine, mut arena, hero, _, _) = setup(15.0);
    cast_and_settle(&mut engine, &mut arena, CastRequest::new("cleave", hero));
    cast_and_settle(&mut engine, &mut arena, CastRequest::new("cleave", hero));

    let path = std::env::temp_dir().join(format!("stormcall_log_{}.json", std::process::id()));
    engine.log().save_to_file(&path).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let restored: CombatLog = serde_json::from_str(&contents).unwrap();
    assert_eq!(restored.entries, engine.log().entries);
    assert_eq!(restored.killing_blows().len(), 1);
}
