//! Reference host
//!
//! A flat, brute-force world: combatants in creation order, teams instead of
//! factions, and the damage math the effect engine deliberately does not own.
//! Dead or removed combatants stay in the list (ids are indices) and are
//! filtered out by every query.

use std::collections::BTreeMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
    AttackResult, DamagePipeline, EntityHost, EntityId, GameRng, SpatialQuery, StatHost,
    VisualHandle, VisualHost, VisualId,
};
use crate::effects::Attack;
use crate::stats::{ModifierOutcome, ReapplyPolicy, StatModifier, StatSheet, StatType};

/// Damage multiplier for critical strikes when the attack doesn't author one.
pub const CRIT_DAMAGE_MULTIPLIER: f32 = 1.5;

fn default_radius() -> f32 {
    0.5
}

/// Authored combatant, as it appears in scenario files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatantSpec {
    pub name: String,
    #[serde(default)]
    pub team: u8,
    pub position: [f32; 2],
    #[serde(default = "default_radius")]
    pub radius: f32,
    pub health: f32,
    #[serde(default)]
    pub stats: BTreeMap<StatType, f32>,
}

impl CombatantSpec {
    pub fn new(name: impl Into<String>, team: u8, position: Vec2, health: f32) -> Self {
        Self {
            name: name.into(),
            team,
            position: position.to_array(),
            radius: default_radius(),
            health,
            stats: BTreeMap::new(),
        }
    }

    pub fn with_stat(mut self, stat: StatType, value: f32) -> Self {
        self.stats.insert(stat, value);
        self
    }
}

#[derive(Clone, Debug)]
pub struct Combatant {
    pub id: EntityId,
    pub name: String,
    pub team: u8,
    pub position: Vec2,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub stats: StatSheet,
    /// Despawned by the simulation (distinct from dying)
    pub removed: bool,
    pub damage_taken: f32,
    pub damage_dealt: f32,
}

impl Combatant {
    pub fn is_alive(&self) -> bool {
        !self.removed && self.health > 0.0
    }
}

/// Presentation object bookkeeping. There is no renderer; tests and the
/// headless runner inspect these records instead.
#[derive(Clone, Debug, PartialEq)]
pub struct VisualRecord {
    pub id: VisualId,
    pub handle: VisualHandle,
    pub position: Vec2,
    pub active: bool,
}

#[derive(Resource, Debug, Default)]
pub struct Arena {
    combatants: Vec<Combatant>,
    rng: GameRng,
    visuals: Vec<VisualRecord>,
    beams_played: usize,
}

impl Arena {
    pub fn new(rng: GameRng) -> Self {
        Self {
            combatants: Vec::new(),
            rng,
            visuals: Vec::new(),
            beams_played: 0,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(GameRng::from_seed(seed))
    }

    pub fn spawn(&mut self, spec: &CombatantSpec) -> EntityId {
        let id = EntityId(self.combatants.len() as u32);
        let mut stats = StatSheet::from_base(spec.stats.iter().map(|(stat, value)| (*stat, *value)));
        stats.set_base(StatType::MaxHealth, spec.health);

        self.combatants.push(Combatant {
            id,
            name: spec.name.clone(),
            team: spec.team,
            position: Vec2::from_array(spec.position),
            radius: spec.radius.max(0.0),
            health: spec.health,
            max_health: spec.health,
            stats,
            removed: false,
            damage_taken: 0.0,
            damage_dealt: 0.0,
        });
        debug!("Spawned {} ({}) on team {}", spec.name, id, spec.team);
        id
    }

    /// Despawn without killing. Queries stop returning the entity immediately.
    pub fn remove(&mut self, entity: EntityId) {
        if let Some(combatant) = self.combatant_mut(entity) {
            combatant.removed = true;
        }
    }

    pub fn combatant(&self, entity: EntityId) -> Option<&Combatant> {
        self.combatants.get(entity.0 as usize)
    }

    pub fn combatant_mut(&mut self, entity: EntityId) -> Option<&mut Combatant> {
        self.combatants.get_mut(entity.0 as usize)
    }

    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn health(&self, entity: EntityId) -> f32 {
        self.combatant(entity).map_or(0.0, |c| c.health)
    }

    pub fn alive_on_team(&self, team: u8) -> usize {
        self.combatants
            .iter()
            .filter(|c| c.team == team && c.is_alive())
            .count()
    }

    /// Count down every stat sheet. Returns the number of modifiers that expired.
    pub fn tick(&mut self, dt: f32) -> usize {
        self.combatants
            .iter_mut()
            .filter(|c| !c.removed)
            .map(|c| c.stats.tick(dt))
            .sum()
    }

    pub fn rng_mut(&mut self) -> &mut GameRng {
        &mut self.rng
    }

    pub fn visual(&self, visual: VisualId) -> Option<&VisualRecord> {
        self.visuals.get(visual.0 as usize)
    }

    pub fn active_visuals(&self) -> usize {
        self.visuals.iter().filter(|v| v.active).count()
    }

    pub fn beams_played(&self) -> usize {
        self.beams_played
    }

    fn live(&self, entity: EntityId) -> Option<&Combatant> {
        self.combatant(entity).filter(|c| c.is_alive())
    }

    /// Owner's attack power relative to its base, so buffs on the caster carry
    /// into every effect it owns.
    fn owner_scale(&self, owner: EntityId) -> f32 {
        let Some(combatant) = self.combatant(owner) else {
            return 1.0;
        };
        let base = combatant.stats.base(StatType::AttackPower);
        if base > 0.0 {
            combatant.stats.effective(StatType::AttackPower) / base
        } else {
            1.0
        }
    }
}

impl EntityHost for Arena {
    fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.combatant(entity).filter(|c| !c.removed).map(|c| c.position)
    }

    fn set_position(&mut self, entity: EntityId, position: Vec2) {
        if let Some(combatant) = self.combatant_mut(entity) {
            combatant.position = position;
        }
    }

    fn is_alive(&self, entity: EntityId) -> bool {
        self.live(entity).is_some()
    }

    fn body_radius(&self, entity: EntityId) -> f32 {
        self.combatant(entity).map_or(0.0, |c| c.radius)
    }

    fn describe(&self, entity: EntityId) -> String {
        match self.combatant(entity) {
            Some(combatant) => combatant.name.clone(),
            None => entity.to_string(),
        }
    }
}

impl SpatialQuery for Arena {
    fn enemies_of(&self, entity: EntityId) -> Vec<EntityId> {
        let Some(team) = self.combatant(entity).map(|c| c.team) else {
            return Vec::new();
        };
        self.combatants
            .iter()
            .filter(|c| c.team != team && c.is_alive())
            .map(|c| c.id)
            .collect()
    }
}

impl StatHost for Arena {
    fn stat(&self, entity: EntityId, stat: StatType) -> f32 {
        self.combatant(entity).map_or(0.0, |c| c.stats.effective(stat))
    }

    fn apply_modifier(
        &mut self,
        entity: EntityId,
        stat: StatType,
        modifier: StatModifier,
        policy: ReapplyPolicy,
    ) -> ModifierOutcome {
        match self.combatant_mut(entity) {
            Some(combatant) if combatant.is_alive() => {
                combatant.stats.apply_modifier(stat, modifier, policy)
            }
            _ => ModifierOutcome::Rejected,
        }
    }

    fn set_base_stat(&mut self, entity: EntityId, stat: StatType, value: f32) {
        if let Some(combatant) = self.combatant_mut(entity) {
            combatant.stats.set_base(stat, value);
        }
    }
}

impl DamagePipeline for Arena {
    fn process_hit(&mut self, attack: &Attack, target: EntityId) -> AttackResult {
        let Some(defender) = self.live(target) else {
            return AttackResult::default();
        };
        let evasion = defender.stats.effective(StatType::Evasion);
        let defense = defender.stats.effective(StatType::Defense).max(0.0);
        let shield = defender.stats.effective(StatType::Shield).max(0.0);

        if self.rng.roll(evasion) {
            return AttackResult {
                is_evaded: true,
                target_alive: true,
                ..AttackResult::default()
            };
        }

        let raw = attack.stats().effective(StatType::AttackPower) * self.owner_scale(attack.owner());
        let is_critical = self.rng.roll(attack.stats().effective(StatType::CritChance));
        let crit_multiplier = match attack.stats().effective(StatType::CritMultiplier) {
            m if m > 0.0 => m,
            _ => CRIT_DAMAGE_MULTIPLIER,
        };
        let dealt = if is_critical { raw * crit_multiplier } else { raw };
        let mitigated = (dealt - defense - shield).max(0.0);

        let Some(defender) = self.combatant_mut(target) else {
            return AttackResult::default();
        };
        debug_assert!(
            defender.health >= 0.0,
            "process_hit: target health already negative ({})",
            defender.health
        );
        let actual = mitigated.min(defender.health);
        defender.health = (defender.health - mitigated).max(0.0);
        defender.damage_taken += actual;
        let target_alive = defender.is_alive();

        if let Some(owner) = self.combatant_mut(attack.owner()) {
            owner.damage_dealt += actual;
        }

        AttackResult {
            total_damage: actual,
            is_critical,
            is_evaded: false,
            target_alive,
        }
    }
}

impl VisualHost for Arena {
    fn spawn_visual(&mut self, handle: &VisualHandle, at: Vec2) -> Option<VisualId> {
        let id = VisualId(self.visuals.len() as u32);
        self.visuals.push(VisualRecord {
            id,
            handle: handle.clone(),
            position: at,
            active: true,
        });
        Some(id)
    }

    fn move_visual(&mut self, visual: VisualId, to: Vec2) {
        if let Some(record) = self.visuals.get_mut(visual.0 as usize) {
            record.position = to;
        }
    }

    fn stop_visual(&mut self, visual: VisualId) {
        if let Some(record) = self.visuals.get_mut(visual.0 as usize) {
            record.active = false;
        }
    }

    fn play_beam(&mut self, _handle: &VisualHandle, _from: Vec2, _to: Vec2) {
        self.beams_played += 1;
    }
}
