//! Effect engine
//!
//! Owns the factory, the template repository and the deferred command queue,
//! and drives every live instance once per `tick`:
//!
//! 1. Snapshot the active registry. Instances created during this tick are
//!    activated right away but first updated on the next tick.
//! 2. For each snapshot entry that is still active: behavior `update`s in
//!    declaration order, command flush, the collision pass (host overlap query
//!    then `process_collision`), command flush, visual follow.
//! 3. Sweep: released instances leave the registry and return to the pool.
//!
//! Nothing here returns an error into the loop. Bad configuration is logged
//! and the affected cast or spawn is dropped.

use std::collections::VecDeque;

use bevy::prelude::*;

use super::attack::{Attack, AttackId, BehaviorList, Lifecycle};
use super::component::EffectEvent;
use super::context::{reserve_instance, CastRequest, EffectCommand, EffectContext};
use super::factory::{AttackFactory, InstanceInit};
use super::template::TemplateRepository;
use crate::combat::events::EngineEvent;
use crate::combat::log::{CombatLog, CombatLogEventType};
use crate::settings::EngineSettings;
use crate::world::{CombatHost, EntityId};

#[derive(Resource)]
pub struct EffectEngine {
    factory: AttackFactory,
    templates: Box<dyn TemplateRepository + Send + Sync>,
    commands: VecDeque<EffectCommand>,
    log: CombatLog,
    events: Vec<EngineEvent>,
    settings: EngineSettings,
    /// Simulation time in seconds
    clock: f32,
}

impl EffectEngine {
    pub fn new(templates: impl TemplateRepository + Send + Sync + 'static, settings: EngineSettings) -> Self {
        if templates.template(&settings.burn_template).is_none() {
            warn!(
                "Burn template {:?} is not registered; Burn debuffs will be rejected",
                settings.burn_template
            );
        }
        Self {
            factory: AttackFactory::new(),
            templates: Box::new(templates),
            commands: VecDeque::new(),
            log: CombatLog::default(),
            events: Vec::new(),
            settings,
            clock: 0.0,
        }
    }

    /// Fill the pools listed in `EngineSettings::prewarm`.
    pub fn prewarm(&mut self) {
        let mut entries: Vec<(&String, &usize)> = self.settings.prewarm.iter().collect();
        entries.sort();
        for (template_id, count) in entries {
            match self.templates.template(template_id) {
                Some(template) => self.factory.prewarm(template, *count),
                None => warn!("Cannot prewarm unknown attack template {:?}", template_id),
            }
        }
        self.factory.log_stats();
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Create a top-level instance and run its activation. `None` when the
    /// template is unknown or the owner is gone.
    pub fn cast(&mut self, host: &mut dyn CombatHost, request: CastRequest) -> Option<AttackId> {
        if !host.is_alive(request.owner) {
            debug!(
                "{} cannot cast {}: not alive",
                host.describe(request.owner),
                request.template
            );
            return None;
        }

        let position = request
            .position
            .or_else(|| host.position(request.owner))
            .unwrap_or_default();
        let init = InstanceInit {
            owner: request.owner,
            target: request.target,
            position,
            direction: request.direction,
            parent: None,
            depth: 0,
            dot_override: None,
            now: self.clock,
        };
        let id = reserve_instance(
            &mut self.factory,
            &*self.templates,
            &mut self.log,
            &mut self.events,
            &mut self.commands,
            &request.template,
            init,
        )?;

        self.flush(host);
        self.sweep();
        Some(id)
    }

    /// Deactivate `id` and, first, all of its children. A no-op for anything
    /// that is not currently active, including stale handles.
    pub fn deactivate(&mut self, host: &mut dyn CombatHost, id: AttackId) {
        self.deactivate_now(host, id);
        self.flush(host);
        self.sweep();
    }

    /// Deactivate every live instance.
    pub fn deactivate_all(&mut self, host: &mut dyn CombatHost) {
        for id in self.active_ids() {
            self.deactivate_now(host, id);
        }
        self.flush(host);
        self.sweep();
    }

    /// Advance every live instance by `dt` seconds.
    pub fn tick(&mut self, host: &mut dyn CombatHost, dt: f32) {
        let dt = dt.max(0.0);
        self.clock += dt;
        self.log.match_time = self.clock;

        let snapshot = self.factory.registry().to_vec();
        for id in snapshot {
            if !self.factory.is_active(id) {
                continue;
            }
            self.update_instance(host, id, dt);
            self.flush(host);

            let collides = self
                .factory
                .get(id)
                .is_some_and(|attack| {
                    attack.is_active() && attack.collider_enabled() && !attack.finish_requested
                });
            if collides {
                self.collision_pass(host, id);
                self.flush(host);
            }

            self.follow_visual(host, id);
        }

        self.flush(host);
        self.sweep();
    }

    /// Deliver `event` to every behavior of `id`. Returns whether any behavior
    /// handled it. An unhandled `Cancel` deactivates the instance.
    pub fn send_event(&mut self, host: &mut dyn CombatHost, id: AttackId, event: EffectEvent) -> bool {
        if !self.factory.is_active(id) {
            return false;
        }
        let handled = self.dispatch_event(host, id, event);
        self.flush(host);
        self.sweep();
        handled
    }

    /// Report an overlap detected outside the engine's own collision pass.
    pub fn collide(&mut self, host: &mut dyn CombatHost, id: AttackId, target: EntityId) {
        if !self.factory.is_active(id) {
            return;
        }
        self.with_behaviors(host, id, |behaviors, ctx| {
            for behavior in behaviors.iter_mut() {
                if ctx.finish_requested() {
                    break;
                }
                behavior.process_collision(ctx, target);
            }
        });
        self.flush(host);
        self.sweep();
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn is_active(&self, id: AttackId) -> bool {
        self.factory.is_active(id)
    }

    /// The instance behind `id`, if the handle is current.
    pub fn attack(&self, id: AttackId) -> Option<&Attack> {
        self.factory.get(id)
    }

    pub fn children(&self, id: AttackId) -> &[AttackId] {
        self.factory.get(id).map(Attack::children).unwrap_or(&[])
    }

    /// Live instances in creation order.
    pub fn active_ids(&self) -> Vec<AttackId> {
        self.factory
            .registry()
            .iter()
            .copied()
            .filter(|id| self.factory.is_active(*id))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.factory.active_count()
    }

    pub fn pooled_count(&self, template: &str) -> usize {
        self.factory.pooled_count(template)
    }

    pub fn factory(&self) -> &AttackFactory {
        &self.factory
    }

    pub fn templates(&self) -> &dyn TemplateRepository {
        &*self.templates
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn log(&self) -> &CombatLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut CombatLog {
        &mut self.log
    }

    pub fn now(&self) -> f32 {
        self.clock
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Commands still waiting for a flush.
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn context<'a>(&'a mut self, host: &'a mut dyn CombatHost, id: AttackId) -> EffectContext<'a> {
        EffectContext {
            id,
            factory: &mut self.factory,
            host,
            templates: &*self.templates,
            commands: &mut self.commands,
            log: &mut self.log,
            events: &mut self.events,
            settings: &self.settings,
            now: self.clock,
        }
    }

    /// Run `f` with the instance's behaviors detached from its slot, so they
    /// can borrow the context mutably.
    fn with_behaviors<R>(
        &mut self,
        host: &mut dyn CombatHost,
        id: AttackId,
        f: impl FnOnce(&mut BehaviorList, &mut EffectContext) -> R,
    ) -> R {
        let mut behaviors = self.factory.take_behaviors(id);
        let result = {
            let mut ctx = self.context(host, id);
            f(&mut behaviors, &mut ctx)
        };
        self.factory.restore_behaviors(id, behaviors);
        result
    }

    fn update_instance(&mut self, host: &mut dyn CombatHost, id: AttackId, dt: f32) {
        self.with_behaviors(host, id, |behaviors, ctx| {
            for behavior in behaviors.iter_mut() {
                if ctx.finish_requested() {
                    break;
                }
                behavior.update(ctx, dt);
            }
        });
    }

    fn collision_pass(&mut self, host: &mut dyn CombatHost, id: AttackId) {
        let Some(attack) = self.factory.get(id) else {
            return;
        };
        let targets = host.overlap(attack.owner(), attack.shape(), attack.position(), attack.direction());
        if targets.is_empty() {
            return;
        }

        self.with_behaviors(host, id, |behaviors, ctx| {
            for target in targets.entities() {
                if ctx.finish_requested() || !ctx.attack().collider_enabled() {
                    break;
                }
                for behavior in behaviors.iter_mut() {
                    if ctx.finish_requested() {
                        break;
                    }
                    behavior.process_collision(ctx, target);
                }
            }
        });
    }

    fn follow_visual(&mut self, host: &mut dyn CombatHost, id: AttackId) {
        let Some(attack) = self.factory.get(id).filter(|attack| attack.is_active()) else {
            return;
        };
        if let Some(visual) = attack.visual() {
            host.move_visual(visual, attack.position());
        }
    }

    /// Drain the command queue, bounded by `max_commands_per_flush`. Commands
    /// left over stay queued for the next flush.
    fn flush(&mut self, host: &mut dyn CombatHost) {
        let mut processed = 0;
        while let Some(command) = self.commands.pop_front() {
            if processed >= self.settings.max_commands_per_flush {
                self.commands.push_front(command);
                warn!(
                    "Effect command flush hit its limit ({}); {} commands deferred",
                    self.settings.max_commands_per_flush,
                    self.commands.len()
                );
                break;
            }
            processed += 1;

            match command {
                EffectCommand::Activate { attack, direction } => {
                    self.activate_now(host, attack, direction);
                }
                EffectCommand::Deactivate(attack) => self.deactivate_now(host, attack),
                EffectCommand::Event { attack, event } => {
                    if self.factory.is_active(attack) {
                        self.dispatch_event(host, attack, event);
                    }
                }
            }
        }
    }

    fn activate_now(&mut self, host: &mut dyn CombatHost, id: AttackId, direction: Vec2) {
        if !self.factory.is_active(id) {
            return;
        }
        self.with_behaviors(host, id, |behaviors, ctx| {
            for behavior in behaviors.iter_mut() {
                if ctx.finish_requested() {
                    break;
                }
                behavior.activate(ctx, direction);
            }
        });
        self.events.push(EngineEvent::Activated { attack: id });
    }

    fn dispatch_event(&mut self, host: &mut dyn CombatHost, id: AttackId, event: EffectEvent) -> bool {
        let handled = self.with_behaviors(host, id, |behaviors, ctx| {
            let mut handled = false;
            for behavior in behaviors.iter_mut() {
                if ctx.finish_requested() {
                    break;
                }
                handled |= behavior.on_event(ctx, &event);
            }
            handled
        });

        if event == EffectEvent::Cancel && !handled {
            self.deactivate_now(host, id);
        }
        handled
    }

    /// Children first, then behaviors in reverse declaration order, then the
    /// parent link and runtime state. The slot itself is pooled by `sweep`.
    fn deactivate_now(&mut self, host: &mut dyn CombatHost, id: AttackId) {
        let Some(attack) = self.factory.get_mut(id) else {
            return;
        };
        if attack.lifecycle != Lifecycle::Active {
            return;
        }
        attack.lifecycle = Lifecycle::Deactivating;
        let children = attack.children.clone();
        let parent = attack.parent;

        for child in children {
            self.deactivate_now(host, child);
        }

        let mut behaviors = self.factory.take_behaviors(id);
        {
            let mut ctx = self.context(host, id);
            for behavior in behaviors.iter_mut().rev() {
                behavior.deactivate(&mut ctx);
            }
        }
        for behavior in behaviors.iter_mut() {
            behavior.reset();
        }
        self.factory.restore_behaviors(id, behaviors);

        if let Some(parent) = parent {
            self.factory.unlink_child(parent, id);
            if self.factory.is_active(parent) {
                self.commands.push_back(EffectCommand::Event {
                    attack: parent,
                    event: EffectEvent::ChildDeactivated(id),
                });
            }
        }

        let attack = self.factory.attack_mut(id);
        if let Some(visual) = attack.visual.take() {
            host.stop_visual(visual);
        }
        let template = attack.template_id().to_string();
        let hits = attack.hits();
        attack.clear_runtime();
        self.factory.release(id);

        debug!("Deactivated {} ({}) after {} hits", template, id, hits);
        self.log.log(
            CombatLogEventType::EffectEnded,
            format!("{} ended", template),
        );
        self.events.push(EngineEvent::Deactivated { attack: id, template });
    }

    fn sweep(&mut self) {
        for (id, template) in self.factory.sweep() {
            self.events.push(EngineEvent::Pooled { attack: id, template });
        }
    }
}

impl std::fmt::Debug for EffectEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectEngine")
            .field("factory", &self.factory)
            .field("pending_commands", &self.commands.len())
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::behaviors::{
        AreaFieldParams, BehaviorSpec, DotParams, FollowParams, StatusParams, StatusScope,
    };
    use crate::effects::template::{EffectTemplate, TemplateLibrary};
    use crate::stats::{BuffType, StatType, StatusSpec};
    use crate::world::{Arena, CombatantSpec, StatHost};

    fn follower(id: &str) -> EffectTemplate {
        EffectTemplate::named(id).with_behavior(BehaviorSpec::FollowOwner(FollowParams::default()))
    }

    fn engine_with(templates: Vec<EffectTemplate>) -> EffectEngine {
        let library = TemplateLibrary::from_templates(templates).unwrap();
        EffectEngine::new(library, EngineSettings::default())
    }

    fn duel() -> (Arena, EntityId, EntityId) {
        let mut arena = Arena::with_seed(7);
        let hero = arena.spawn(&CombatantSpec::new("Hero", 0, Vec2::ZERO, 100.0));
        let foe = arena.spawn(&CombatantSpec::new("Foe", 1, Vec2::new(1.0, 0.0), 100.0));
        (arena, hero, foe)
    }

    #[test]
    fn test_cast_unknown_template_returns_none() {
        let (mut arena, hero, _) = duel();
        let mut engine = engine_with(vec![follower("aura")]);

        assert!(engine.cast(&mut arena, CastRequest::new("missing", hero)).is_none());
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.log().filter_by_type(CombatLogEventType::ConfigError).len(), 1);
        assert!(engine
            .drain_events()
            .contains(&EngineEvent::TemplateMissing { template: "missing".to_string() }));
    }

    #[test]
    fn test_dead_owner_cannot_cast() {
        let (mut arena, hero, _) = duel();
        arena.remove(hero);
        let mut engine = engine_with(vec![follower("aura")]);
        assert!(engine.cast(&mut arena, CastRequest::new("aura", hero)).is_none());
    }

    #[test]
    fn test_one_shot_status_is_pooled_within_the_cast() {
        let (mut arena, hero, _) = duel();
        let haste = EffectTemplate::named("haste").with_behavior(BehaviorSpec::ApplyStatus(StatusParams {
            status: StatusSpec::Buff {
                kind: BuffType::Haste,
                magnitude: 0.0,
                multiplier: 1.5,
                duration: 2.0,
            },
            scope: StatusScope::Owner,
            linger: 0.0,
        }));
        let mut engine = engine_with(vec![haste]);
        arena.set_base_stat(hero, StatType::AttackSpeed, 1.0);

        let id = engine.cast(&mut arena, CastRequest::new("haste", hero));
        assert!(id.is_some());
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.pooled_count("haste"), 1);
        assert!((arena.stat(hero, StatType::AttackSpeed) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_field_ticks_and_ends() {
        let (mut arena, hero, foe) = duel();
        let field = EffectTemplate::named("field")
            .with_stat(StatType::AttackPower, 10.0)
            .with_behavior(BehaviorSpec::AreaField(AreaFieldParams {
                windup: 0.0,
                duration: 2.0,
                tick_interval: 1.0,
                radius: Some(3.0),
                status: None,
                follow_owner: false,
                max_targets: None,
            }));
        let mut engine = engine_with(vec![field]);

        let id = engine.cast(&mut arena, CastRequest::new("field", hero)).unwrap();
        assert_eq!(arena.health(foe), 90.0);
        for _ in 0..4 {
            engine.tick(&mut arena, 0.5);
        }
        assert_eq!(arena.health(foe), 80.0);
        assert!(!engine.is_active(id));
    }

    #[test]
    fn test_degenerate_dot_fires_once_on_activation() {
        let (mut arena, hero, foe) = duel();
        let burn = EffectTemplate::named("burn").with_behavior(BehaviorSpec::DamageOverTime(DotParams {
            damage: 1.0,
            interval: 1.0,
            duration: 1.0,
            radius: 0.0,
            max_targets: None,
        }));
        let mut engine = engine_with(vec![burn]);
        let id = engine
            .cast(&mut arena, CastRequest::new("burn", hero).targeting(foe))
            .unwrap();
        // Degenerate schedule: one tick on activation, then done
        assert_eq!(arena.health(foe), 99.0);
        assert!(!engine.is_active(id));
    }

    #[test]
    fn test_cancel_is_handled_and_unknown_events_are_not() {
        let (mut arena, hero, _) = duel();
        let inert = EffectTemplate::named("inert").with_behavior(BehaviorSpec::ApplyStatus(StatusParams {
            status: StatusSpec::Buff {
                kind: BuffType::Shield,
                magnitude: 5.0,
                multiplier: 1.0,
                duration: 1.0,
            },
            scope: StatusScope::Owner,
            linger: 10.0,
        }));
        let mut engine = engine_with(vec![inert, follower("aura")]);

        let aura = engine.cast(&mut arena, CastRequest::new("aura", hero)).unwrap();
        assert!(engine.send_event(&mut arena, aura, EffectEvent::Cancel));
        assert!(!engine.is_active(aura));

        let lingering = engine.cast(&mut arena, CastRequest::new("inert", hero)).unwrap();
        assert!(!engine.send_event(&mut arena, lingering, EffectEvent::AddSatellite));
        assert!(engine.is_active(lingering));
    }

    #[test]
    fn test_stale_handles_are_ignored() {
        let (mut arena, hero, _) = duel();
        let mut engine = engine_with(vec![follower("aura")]);

        let first = engine.cast(&mut arena, CastRequest::new("aura", hero)).unwrap();
        engine.deactivate(&mut arena, first);
        let second = engine.cast(&mut arena, CastRequest::new("aura", hero)).unwrap();

        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        engine.deactivate(&mut arena, first);
        assert!(engine.is_active(second));
        assert!(engine.attack(first).is_none());
    }

    #[test]
    fn test_flush_limit_defers_commands() {
        let (mut arena, hero, _) = duel();
        let library = TemplateLibrary::from_templates(vec![follower("aura")]).unwrap();
        let settings = EngineSettings {
            max_commands_per_flush: 1,
            ..EngineSettings::default()
        };
        let mut engine = EffectEngine::new(library, settings);

        let a = engine.cast(&mut arena, CastRequest::new("aura", hero)).unwrap();
        let b = engine.cast(&mut arena, CastRequest::new("aura", hero)).unwrap();
        engine.with_behaviors(&mut arena, a, |_, ctx| {
            ctx.deactivate(a);
            ctx.deactivate(b);
        });
        engine.flush(&mut arena);
        assert_eq!(engine.pending_commands(), 1);
        engine.tick(&mut arena, 0.0);
        assert_eq!(engine.pending_commands(), 0);
        assert_eq!(engine.active_count(), 0);
    }
}
