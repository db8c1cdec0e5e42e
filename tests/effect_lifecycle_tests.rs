//! Integration tests for effect instance lifecycles
//!
//! These tests drive the engine against a small `Arena` and verify:
//! - Timed statuses last exactly their duration and refresh instead of stacking
//! - Damage over time ticks the right number of times
//! - Deactivation is idempotent and instances are pooled and reused
//! - Missing templates are reported without disturbing the rest of the effect

use bevy::math::Vec2;

use stormcall::combat::events::EngineEvent;
use stormcall::combat::log::CombatLogEventType;
use stormcall::effects::behaviors::{
    AreaFieldParams, BehaviorSpec, DotParams, FanSweepParams, FollowParams, ProjectileParams,
    StatusParams, StatusScope,
};
use stormcall::effects::{CastRequest, EffectEngine, EffectTemplate, TemplateLibrary};
use stormcall::settings::EngineSettings;
use stormcall::stats::{BuffType, DebuffType, StatType, StatusSpec};
use stormcall::world::{Arena, CombatantSpec, EntityId, StatHost};

fn engine_with(templates: Vec<EffectTemplate>) -> EffectEngine {
    let library = TemplateLibrary::from_templates(templates).unwrap();
    EffectEngine::new(library, EngineSettings::default())
}

fn duel(foe_health: f32) -> (Arena, EntityId, EntityId) {
    let mut arena = Arena::with_seed(11);
    let hero = arena.spawn(&CombatantSpec::new("Hero", 0, Vec2::ZERO, 100.0));
    let foe = arena.spawn(&CombatantSpec::new("Foe", 1, Vec2::new(1.0, 0.0), foe_health));
    (arena, hero, foe)
}

fn aura() -> EffectTemplate {
    EffectTemplate::named("aura").with_behavior(BehaviorSpec::FollowOwner(FollowParams::default()))
}

fn dot(id: &str, damage: f32, interval: f32, duration: f32) -> EffectTemplate {
    EffectTemplate::named(id).with_behavior(BehaviorSpec::DamageOverTime(DotParams {
        damage,
        interval,
        duration,
        radius: 0.0,
        max_targets: None,
    }))
}

fn status(id: &str, status: StatusSpec, scope: StatusScope) -> EffectTemplate {
    EffectTemplate::named(id).with_behavior(BehaviorSpec::ApplyStatus(StatusParams {
        status,
        scope,
        linger: 0.0,
    }))
}

fn haste(duration: f32) -> EffectTemplate {
    status(
        "haste",
        StatusSpec::Buff {
            kind: BuffType::Haste,
            magnitude: 0.0,
            multiplier: 1.5,
            duration,
        },
        StatusScope::Owner,
    )
}

fn sweep(id: &str, on_hit: Option<&str>) -> EffectTemplate {
    EffectTemplate::named(id)
        .with_stat(StatType::AttackPower, 10.0)
        .with_behavior(BehaviorSpec::FanSweep(FanSweepParams {
            radius: 3.0,
            half_angle_deg: 60.0,
            segments: 8,
            windup: 0.0,
            linger_limit: 0.0,
            max_targets: None,
            on_hit: on_hit.map(str::to_string),
        }))
}

// =============================================================================
// Timed statuses
// =============================================================================

#[test]
fn test_buff_lasts_exactly_its_duration() {
    let (mut arena, hero, _) = duel(100.0);
    arena.set_base_stat(hero, StatType::AttackSpeed, 1.0);
    let mut engine = engine_with(vec![haste(2.0)]);

    engine.cast(&mut arena, CastRequest::new("haste", hero)).unwrap();
    assert_eq!(arena.stat(hero, StatType::AttackSpeed), 1.5);

    arena.tick(1.5);
    assert_eq!(arena.stat(hero, StatType::AttackSpeed), 1.5, "Haste should still be up");

    arena.tick(0.5);
    assert_eq!(arena.stat(hero, StatType::AttackSpeed), 1.0, "Haste should expire at 2s");
}

#[test]
fn test_recast_buff_refreshes_instead_of_stacking() {
    let (mut arena, hero, _) = duel(100.0);
    arena.set_base_stat(hero, StatType::AttackSpeed, 1.0);
    let mut engine = engine_with(vec![haste(2.0)]);

    engine.cast(&mut arena, CastRequest::new("haste", hero)).unwrap();
    arena.tick(1.5);
    engine.cast(&mut arena, CastRequest::new("haste", hero)).unwrap();
    assert_eq!(arena.stat(hero, StatType::AttackSpeed), 1.5, "Refresh must not multiply twice");

    arena.tick(1.5);
    assert_eq!(
        arena.stat(hero, StatType::AttackSpeed),
        1.5,
        "Refreshed haste should run a full 2s from the recast"
    );
    arena.tick(0.5);
    assert_eq!(arena.stat(hero, StatType::AttackSpeed), 1.0);
}

#[test]
fn test_stun_cannot_be_reapplied_while_active() {
    let (mut arena, hero, foe) = duel(100.0);
    let shout = status(
        "shout",
        StatusSpec::Debuff {
            kind: DebuffType::Stun,
            magnitude: 0.0,
            multiplier: 1.0,
            duration: 1.5,
            tick_interval: 0.0,
        },
        StatusScope::EnemiesInRadius(3.0),
    );
    let mut engine = engine_with(vec![shout]);

    engine.cast(&mut arena, CastRequest::new("shout", hero)).unwrap();
    engine.cast(&mut arena, CastRequest::new("shout", hero)).unwrap();

    assert_eq!(arena.stat(foe, StatType::Stun), 1.0);
    assert_eq!(engine.log().filter_by_type(CombatLogEventType::StatusApplied).len(), 1);
    assert_eq!(engine.log().filter_by_type(CombatLogEventType::StatusIgnored).len(), 1);
}

#[test]
fn test_burn_stacks_as_independent_dots() {
    let (mut arena, hero, foe) = duel(100.0);
    let ignite = status(
        "ignite",
        StatusSpec::Debuff {
            kind: DebuffType::Burn,
            magnitude: 5.0,
            multiplier: 1.0,
            duration: 2.0,
            tick_interval: 1.0,
        },
        StatusScope::Target,
    );
    let mut engine = engine_with(vec![ignite, dot("burn", 1.0, 1.0, 1.0)]);

    engine.cast(&mut arena, CastRequest::new("ignite", hero).targeting(foe)).unwrap();
    engine.cast(&mut arena, CastRequest::new("ignite", hero).targeting(foe)).unwrap();
    assert_eq!(engine.active_count(), 2, "Two burn instances should be running");

    engine.tick(&mut arena, 1.0);
    engine.tick(&mut arena, 1.0);
    // 2 burns x 2 ticks x 5 damage, using the debuff's numbers not the template's
    assert_eq!(arena.health(foe), 80.0);
    assert_eq!(engine.active_count(), 0);
}

// =============================================================================
// Damage over time
// =============================================================================

#[test]
fn test_dot_deals_total_damage_over_its_ticks() {
    let (mut arena, hero, foe) = duel(200.0);
    let mut engine = engine_with(vec![dot("venom", 20.0, 1.0, 5.0)]);

    let id = engine
        .cast(&mut arena, CastRequest::new("venom", hero).targeting(foe))
        .unwrap();
    assert_eq!(arena.health(foe), 200.0, "First tick lands after one interval");

    for _ in 0..9 {
        engine.tick(&mut arena, 0.5);
    }
    assert_eq!(arena.health(foe), 120.0);
    assert!(engine.is_active(id));

    engine.tick(&mut arena, 0.5);
    assert_eq!(arena.health(foe), 100.0, "5 ticks x 20 damage");
    assert!(!engine.is_active(id));
    assert_eq!(engine.log().hits_on(foe), 5);
}

#[test]
fn test_dot_with_interval_equal_to_duration_fires_once() {
    let (mut arena, hero, foe) = duel(200.0);
    let mut engine = engine_with(vec![dot("venom", 20.0, 5.0, 5.0)]);

    let id = engine
        .cast(&mut arena, CastRequest::new("venom", hero).targeting(foe))
        .unwrap();
    assert_eq!(arena.health(foe), 180.0);
    assert!(!engine.is_active(id));

    for _ in 0..10 {
        engine.tick(&mut arena, 1.0);
    }
    assert_eq!(arena.health(foe), 180.0);
}

#[test]
fn test_dot_ends_when_its_target_dies() {
    let (mut arena, hero, foe) = duel(30.0);
    let mut engine = engine_with(vec![dot("venom", 20.0, 1.0, 5.0)]);

    let id = engine
        .cast(&mut arena, CastRequest::new("venom", hero).targeting(foe))
        .unwrap();
    engine.tick(&mut arena, 1.0);
    engine.tick(&mut arena, 1.0);

    assert_eq!(arena.health(foe), 0.0);
    assert!(!engine.is_active(id));
    assert_eq!(engine.log().killing_blows().len(), 1);
}

// =============================================================================
// Deactivation and pooling
// =============================================================================

#[test]
fn test_deactivate_twice_is_a_no_op() {
    let (mut arena, hero, _) = duel(100.0);
    let mut engine = engine_with(vec![aura()]);

    let id = engine.cast(&mut arena, CastRequest::new("aura", hero)).unwrap();
    engine.deactivate(&mut arena, id);
    engine.drain_events();

    engine.deactivate(&mut arena, id);
    assert!(engine.drain_events().is_empty());
    assert_eq!(engine.log().filter_by_type(CombatLogEventType::EffectEnded).len(), 1);
    assert_eq!(engine.pooled_count("aura"), 1);
}

#[test]
fn test_pooled_instances_are_reused() {
    let (mut arena, hero, _) = duel(100.0);
    let mut engine = engine_with(vec![aura()]);

    let first = engine.cast(&mut arena, CastRequest::new("aura", hero)).unwrap();
    engine.deactivate(&mut arena, first);
    assert_eq!(engine.pooled_count("aura"), 1);

    let second = engine.cast(&mut arena, CastRequest::new("aura", hero)).unwrap();
    assert_eq!(engine.pooled_count("aura"), 0);
    assert_eq!(first.index(), second.index());
    assert!(second.generation() > first.generation());

    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(e, EngineEvent::Pooled { attack, .. } if *attack == first)));
}

#[test]
fn test_body_visual_stops_on_deactivate() {
    let (mut arena, hero, _) = duel(100.0);
    let glow = aura().with_visuals(stormcall::effects::TemplateVisuals {
        body: Some(stormcall::world::VisualHandle::new("glow")),
        beam: None,
    });
    let mut engine = engine_with(vec![glow]);

    let id = engine.cast(&mut arena, CastRequest::new("aura", hero)).unwrap();
    assert_eq!(arena.active_visuals(), 1);
    engine.deactivate(&mut arena, id);
    assert_eq!(arena.active_visuals(), 0);
}

// =============================================================================
// Missing templates
// =============================================================================

#[test]
fn test_library_rejects_unknown_sub_effect() {
    let err = TemplateLibrary::from_templates(vec![sweep("cleave", Some("ghost"))]).unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn test_missing_sub_effect_at_runtime_is_logged_and_skipped() {
    let (mut arena, hero, foe) = duel(100.0);
    let mut library = TemplateLibrary::from_templates(vec![aura()]).unwrap();
    // Inserted templates skip the reference check, like a hot-reloaded library would
    library.insert(sweep("cleave", Some("ghost"))).unwrap();
    let mut engine = EffectEngine::new(library, EngineSettings::default());

    let id = engine
        .cast(&mut arena, CastRequest::new("cleave", hero).toward(Vec2::X))
        .unwrap();

    assert_eq!(arena.health(foe), 90.0, "The sweep itself still lands");
    assert!(!engine.is_active(id));
    assert_eq!(engine.active_count(), 0);
    let errors = engine.log().filter_by_type(CombatLogEventType::ConfigError);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("ghost"));
}

// =============================================================================
// Projectiles
// =============================================================================

#[test]
fn test_projectile_hits_first_target_and_explodes() {
    let mut arena = Arena::with_seed(5);
    let hero = arena.spawn(&CombatantSpec::new("Hero", 0, Vec2::ZERO, 100.0));
    let foe = arena.spawn(&CombatantSpec::new("Foe", 1, Vec2::new(3.0, 0.0), 100.0));
    let bystander = arena.spawn(&CombatantSpec::new("Bystander", 1, Vec2::new(4.5, 0.0), 100.0));

    let bolt = EffectTemplate::named("bolt")
        .with_stat(StatType::AttackPower, 15.0)
        .with_shape(stormcall::targeting::AreaShape::Circle { radius: 0.25 })
        .with_behavior(BehaviorSpec::Projectile(ProjectileParams {
            speed: 8.0,
            windup: 0.0,
            homing: false,
            turn_rate_deg: 180.0,
            pierce: 0,
            max_distance: 10.0,
            lifetime: 0.0,
            explode: Some("blast".to_string()),
        }));
    let blast = EffectTemplate::named("blast")
        .with_stat(StatType::AttackPower, 5.0)
        .with_behavior(BehaviorSpec::AreaField(AreaFieldParams {
            windup: 0.0,
            duration: 0.0,
            tick_interval: 0.0,
            radius: Some(2.0),
            status: None,
            follow_owner: false,
            max_targets: None,
        }));
    let mut engine = engine_with(vec![bolt, blast]);

    let id = engine
        .cast(&mut arena, CastRequest::new("bolt", hero).toward(Vec2::X))
        .unwrap();
    for _ in 0..2 {
        engine.tick(&mut arena, 0.125);
    }
    assert_eq!(arena.health(foe), 100.0, "Bolt is still in flight");

    engine.tick(&mut arena, 0.125);
    assert_eq!(arena.health(foe), 80.0, "15 from the bolt, 5 from the blast");
    assert_eq!(arena.health(bystander), 95.0, "Only the blast reaches the bystander");
    assert!(!engine.is_active(id));
    assert_eq!(engine.active_count(), 0);
}
