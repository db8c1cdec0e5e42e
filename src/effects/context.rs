//! Behavior context
//!
//! `EffectContext` is what a behavior sees during `activate`, `update`,
//! `process_collision`, `on_event` and `deactivate`: its own instance, the
//! host services, and a command queue back into the engine. Spawning reserves
//! the child slot immediately (so the caller gets a handle) but defers its
//! activation; deactivation and events are always deferred. The engine
//! drains the queue between behavior calls, never during one.

use std::collections::VecDeque;

use bevy::math::Vec2;
use bevy::prelude::*;

use super::attack::{Attack, AttackId};
use super::component::EffectEvent;
use super::factory::{AttackFactory, InstanceInit};
use super::template::{EffectTemplate, TemplateRepository};
use crate::combat::events::EngineEvent;
use crate::combat::log::{CombatLog, CombatLogEventType, DamageRecord};
use crate::settings::EngineSettings;
use crate::stats::{
    apply_buff, apply_debuff, DotSpec, ModifierOutcome, StatSheet, StatType, StatusRequest,
    StatusSpec,
};
use crate::targeting::{facing_or_default, AreaShape, TargetSet};
use crate::world::{AttackResult, CombatHost, EntityId, VisualHandle};

/// Deferred work for the engine's flush loop.
#[derive(Clone, Debug, PartialEq)]
pub enum EffectCommand {
    Activate { attack: AttackId, direction: Vec2 },
    Deactivate(AttackId),
    Event { attack: AttackId, event: EffectEvent },
}

/// A top-level cast.
#[derive(Clone, Debug, PartialEq)]
pub struct CastRequest {
    pub template: String,
    pub owner: EntityId,
    pub target: Option<EntityId>,
    pub direction: Vec2,
    /// Defaults to the owner's position
    pub position: Option<Vec2>,
}

impl CastRequest {
    pub fn new(template: impl Into<String>, owner: EntityId) -> Self {
        Self {
            template: template.into(),
            owner,
            target: None,
            direction: Vec2::X,
            position: None,
        }
    }

    pub fn toward(mut self, direction: Vec2) -> Self {
        self.direction = direction;
        self
    }

    pub fn targeting(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }
}

/// A nested spawn requested by a behavior. The child inherits the caller's
/// owner.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnRequest {
    pub template: String,
    pub target: Option<EntityId>,
    /// Defaults to the caller's position
    pub position: Option<Vec2>,
    /// Defaults to the caller's direction
    pub direction: Option<Vec2>,
    /// Link as a child (cascading deactivation) or live independently
    pub attach: bool,
    pub dot_override: Option<DotSpec>,
}

impl SpawnRequest {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            target: None,
            position: None,
            direction: None,
            attach: true,
            dot_override: None,
        }
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn toward(mut self, direction: Vec2) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn targeting(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn detached(mut self) -> Self {
        self.attach = false;
        self
    }

    pub fn with_dot(mut self, dot: DotSpec) -> Self {
        self.dot_override = Some(dot);
        self
    }
}

/// Acquire and initialise an instance, queueing its activation.
///
/// Unknown templates are a configuration error: logged, reported as an
/// event, and answered with `None`.
pub(crate) fn reserve_instance(
    factory: &mut AttackFactory,
    templates: &dyn TemplateRepository,
    log: &mut CombatLog,
    events: &mut Vec<EngineEvent>,
    commands: &mut VecDeque<EffectCommand>,
    template_id: &str,
    init: InstanceInit,
) -> Option<AttackId> {
    let Some(template) = templates.template(template_id) else {
        error!("Unknown attack template {:?}", template_id);
        log.log(
            CombatLogEventType::ConfigError,
            format!("Unknown attack template '{}'", template_id),
        );
        events.push(EngineEvent::TemplateMissing {
            template: template_id.to_string(),
        });
        return None;
    };

    let direction = facing_or_default(init.direction);
    let init = InstanceInit { direction, ..init };
    let id = factory.acquire(template, init);
    let parent = factory.attack(id).parent();

    debug!("Spawned {} ({}) parent={:?}", template_id, id, parent);
    log.log(
        CombatLogEventType::EffectSpawned,
        format!("{} spawned", template_id),
    );
    events.push(EngineEvent::Spawned {
        attack: id,
        template: template_id.to_string(),
        parent,
    });
    commands.push_back(EffectCommand::Activate {
        attack: id,
        direction,
    });
    Some(id)
}

pub struct EffectContext<'a> {
    pub(crate) id: AttackId,
    pub(crate) factory: &'a mut AttackFactory,
    pub(crate) host: &'a mut dyn CombatHost,
    pub(crate) templates: &'a dyn TemplateRepository,
    pub(crate) commands: &'a mut VecDeque<EffectCommand>,
    pub(crate) log: &'a mut CombatLog,
    pub(crate) events: &'a mut Vec<EngineEvent>,
    pub(crate) settings: &'a EngineSettings,
    pub(crate) now: f32,
}

impl<'a> EffectContext<'a> {
    // ------------------------------------------------------------------
    // Own instance
    // ------------------------------------------------------------------

    pub fn id(&self) -> AttackId {
        self.id
    }

    /// Simulation time in seconds.
    pub fn now(&self) -> f32 {
        self.now
    }

    pub fn attack(&self) -> &Attack {
        self.factory.attack(self.id)
    }

    fn attack_mut(&mut self) -> &mut Attack {
        self.factory.attack_mut(self.id)
    }

    pub fn template(&self) -> Option<&'a EffectTemplate> {
        let templates = self.templates;
        templates.template(self.factory.attack(self.id).template_id())
    }

    pub fn owner(&self) -> EntityId {
        self.attack().owner()
    }

    pub fn target(&self) -> Option<EntityId> {
        self.attack().target()
    }

    pub fn set_target(&mut self, target: Option<EntityId>) -> bool {
        self.attack_mut().set_target(target)
    }

    pub fn position(&self) -> Vec2 {
        self.attack().position()
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.attack_mut().position = position;
    }

    pub fn direction(&self) -> Vec2 {
        self.attack().direction()
    }

    pub fn set_direction(&mut self, direction: Vec2) {
        self.attack_mut().direction = facing_or_default(direction);
    }

    pub fn shape(&self) -> AreaShape {
        *self.attack().shape()
    }

    pub fn set_shape(&mut self, shape: AreaShape) {
        self.attack_mut().shape = shape;
    }

    pub fn stats(&self) -> &StatSheet {
        self.attack().stats()
    }

    pub fn stats_mut(&mut self) -> &mut StatSheet {
        self.attack_mut().stats_mut()
    }

    /// Enable or disable the engine's collision pass for this instance.
    pub fn set_collider(&mut self, enabled: bool) {
        self.attack_mut().collider_enabled = enabled;
    }

    pub fn dot_override(&self) -> Option<DotSpec> {
        self.attack().dot_override()
    }

    pub fn children(&self) -> &[AttackId] {
        self.attack().children()
    }

    pub fn has_children(&self) -> bool {
        !self.attack().children().is_empty()
    }

    /// Move another instance (satellites, attached followers).
    pub fn place(&mut self, attack: AttackId, position: Vec2) {
        if let Some(other) = self.factory.get_mut(attack) {
            if other.is_active() {
                other.position = position;
            }
        }
    }

    // ------------------------------------------------------------------
    // World
    // ------------------------------------------------------------------

    pub fn host(&mut self) -> &mut dyn CombatHost {
        &mut *self.host
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.host.is_alive(entity)
    }

    pub fn position_of(&self, entity: EntityId) -> Option<Vec2> {
        self.host.position(entity)
    }

    pub fn owner_position(&self) -> Option<Vec2> {
        self.host.position(self.owner())
    }

    /// Live enemies of the owner, in host registry order.
    pub fn enemies(&self) -> Vec<EntityId> {
        self.host.enemies_of(self.owner())
    }

    pub fn enemies_within(&self, center: Vec2, radius: f32) -> TargetSet {
        self.host.enemies_within(self.owner(), center, radius)
    }

    pub fn nearest_enemies(&self, center: Vec2, count: usize) -> TargetSet {
        self.host.nearest_enemies(self.owner(), center, count)
    }

    /// Enemies overlapping `shape` at the instance's position and facing.
    pub fn overlap(&self, shape: &AreaShape) -> TargetSet {
        let attack = self.attack();
        self.host
            .overlap(attack.owner(), shape, attack.position(), attack.direction())
    }

    // ------------------------------------------------------------------
    // Damage & status
    // ------------------------------------------------------------------

    /// Run one hit through the host damage pipeline. `None` when the target
    /// was already gone.
    pub fn strike(&mut self, target: EntityId) -> Option<AttackResult> {
        if !self.host.is_alive(target) {
            return None;
        }
        let result = self.host.process_hit(self.factory.attack(self.id), target);

        let attack = self.factory.attack_mut(self.id);
        attack.hits += 1;
        attack.damage_dealt += result.total_damage;
        let owner = attack.owner();
        let template = attack.template_id().to_string();

        self.events.push(EngineEvent::Hit {
            attack: self.id,
            target,
            damage: result.total_damage,
            critical: result.is_critical,
            evaded: result.is_evaded,
            killed: !result.target_alive,
        });

        let attacker = self.host.describe(owner);
        let defender = self.host.describe(target);
        let message = if result.is_evaded {
            format!("{} evades {}'s {}", defender, attacker, template)
        } else {
            let verb = if result.is_critical { "CRITS" } else { "hits" };
            format!(
                "{}'s {} {} {} for {:.0} damage",
                attacker, template, verb, defender, result.total_damage
            )
        };
        self.log.log_damage(
            DamageRecord {
                source: owner,
                target,
                template: template.clone(),
                amount: result.total_damage,
                is_critical: result.is_critical,
                is_evaded: result.is_evaded,
                killing_blow: !result.target_alive,
            },
            message,
        );
        if !result.target_alive {
            self.log.log(
                CombatLogEventType::Death,
                format!("{} has been slain by {}'s {}", defender, attacker, template),
            );
        }
        Some(result)
    }

    /// Set the instance's attack power, then strike. For behaviors with a
    /// fixed authored damage (chain hops, DOT ticks).
    pub fn strike_with_power(&mut self, target: EntityId, power: f32) -> Option<AttackResult> {
        self.stats_mut().set_base(StatType::AttackPower, power);
        self.strike(target)
    }

    /// Apply an authored buff/debuff to `target`. Burn spawns a detached DOT
    /// instance of the configured burn template instead of modifying stats.
    pub fn apply_status(&mut self, status: &StatusSpec, target: EntityId) -> ModifierOutcome {
        if !self.host.is_alive(target) {
            return ModifierOutcome::Rejected;
        }

        let outcome = match status.for_target(target) {
            StatusRequest::Buff(info) => apply_buff(&mut *self.host, &info),
            StatusRequest::Debuff(info) => match info.dot_spec() {
                Some(dot) => {
                    let burn = SpawnRequest::new(self.settings.burn_template.clone())
                        .targeting(target)
                        .detached()
                        .with_dot(dot);
                    let burn = match self.host.position(target) {
                        Some(position) => burn.at(position),
                        None => burn,
                    };
                    match self.spawn(burn) {
                        Some(_) => ModifierOutcome::Added,
                        None => ModifierOutcome::Rejected,
                    }
                }
                None => apply_debuff(&mut *self.host, &info),
            },
        };

        let target_name = self.host.describe(target);
        if outcome.applied() {
            self.log.log(
                CombatLogEventType::StatusApplied,
                format!("{} is afflicted by {} ({:?})", target_name, status.name(), outcome),
            );
        } else {
            self.log.log(
                CombatLogEventType::StatusIgnored,
                format!("{} resists {} ({:?})", target_name, status.name(), outcome),
            );
        }
        outcome
    }

    // ------------------------------------------------------------------
    // Engine commands
    // ------------------------------------------------------------------

    /// Reserve a nested instance now; it is activated by the engine's next flush.
    pub fn spawn(&mut self, request: SpawnRequest) -> Option<AttackId> {
        let attack = self.factory.attack(self.id);
        let depth = attack.depth().saturating_add(1);
        if depth > self.settings.max_spawn_depth {
            warn!(
                "{} tried to spawn {} past the nesting limit ({})",
                attack.template_id(),
                request.template,
                self.settings.max_spawn_depth
            );
            self.log.log(
                CombatLogEventType::ConfigError,
                format!(
                    "Spawn of '{}' from '{}' exceeds nesting depth {}",
                    request.template,
                    attack.template_id(),
                    self.settings.max_spawn_depth
                ),
            );
            return None;
        }

        let init = InstanceInit {
            owner: attack.owner(),
            target: request.target,
            position: request.position.unwrap_or(attack.position()),
            direction: request.direction.unwrap_or(attack.direction()),
            parent: request.attach.then_some(self.id),
            depth,
            dot_override: request.dot_override,
            now: self.now,
        };
        reserve_instance(
            self.factory,
            self.templates,
            self.log,
            self.events,
            self.commands,
            &request.template,
            init,
        )
    }

    /// Ask for this instance to be deactivated. Remaining behaviors of the
    /// current pass are skipped.
    pub fn finish(&mut self) {
        let attack = self.attack_mut();
        if attack.finish_requested {
            return;
        }
        attack.finish_requested = true;
        self.commands.push_back(EffectCommand::Deactivate(self.id));
    }

    pub fn finish_requested(&self) -> bool {
        self.attack().finish_requested
    }

    pub fn deactivate(&mut self, attack: AttackId) {
        self.commands.push_back(EffectCommand::Deactivate(attack));
    }

    pub fn send(&mut self, attack: AttackId, event: EffectEvent) {
        self.commands
            .push_back(EffectCommand::Event { attack, event });
    }

    // ------------------------------------------------------------------
    // Presentation
    // ------------------------------------------------------------------

    /// Spawn the template's body visual if the instance has none yet.
    pub fn show_body(&mut self) {
        if self.attack().visual().is_some() {
            return;
        }
        let Some(handle) = self.template().and_then(|t| t.visuals.body.as_ref()) else {
            return;
        };
        let position = self.position();
        let visual = self.host.spawn_visual(handle, position);
        self.attack_mut().visual = visual;
    }

    pub fn hide_body(&mut self) {
        if let Some(visual) = self.attack_mut().visual.take() {
            self.host.stop_visual(visual);
        }
    }

    /// Connector between two points using the template's beam handle.
    pub fn beam(&mut self, from: Vec2, to: Vec2) {
        let handle: Option<&VisualHandle> = self.template().and_then(|t| t.visuals.beam.as_ref());
        if let Some(handle) = handle {
            self.host.play_beam(handle, from, to);
        }
    }

    pub fn log(&mut self, event_type: CombatLogEventType, message: String) {
        self.log.log(event_type, message);
    }
}
