//! Effect factory & pool
//!
//! Instances live in a flat arena of slots. Pooled slots sit on a free list
//! keyed by template id, so a reused slot already carries the right behavior
//! boxes and only needs a reset. The active registry lists live instances in
//! acquisition order; that order is the scheduler's iteration order.
//!
//! Release is two-step: `release` marks an instance and the end-of-operation
//! `sweep` removes it from the registry and pushes it on the free list. An
//! instance is therefore never both registered and available.

use std::collections::HashMap;

use bevy::math::Vec2;
use bevy::prelude::*;

use super::attack::{Attack, AttackId, BehaviorList, Lifecycle};
use super::template::EffectTemplate;
use crate::stats::DotSpec;
use crate::world::EntityId;

/// Everything an acquired instance is initialised with.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceInit {
    pub owner: EntityId,
    pub target: Option<EntityId>,
    pub position: Vec2,
    pub direction: Vec2,
    pub parent: Option<AttackId>,
    pub depth: u8,
    pub dot_override: Option<DotSpec>,
    pub now: f32,
}

#[derive(Debug, Default)]
pub struct AttackFactory {
    slots: Vec<Attack>,
    free: HashMap<String, Vec<u32>>,
    registry: Vec<AttackId>,
    pending_release: Vec<AttackId>,
}

impl AttackFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build `count` pooled instances of `template` ahead of time.
    pub fn prewarm(&mut self, template: &EffectTemplate, count: usize) {
        for _ in 0..count {
            let index = self.construct(template);
            self.free.entry(template.id.clone()).or_default().push(index);
        }
    }

    fn construct(&mut self, template: &EffectTemplate) -> u32 {
        let index = self.slots.len() as u32;
        let id = AttackId {
            index,
            generation: 0,
        };
        self.slots
            .push(Attack::new(id, template.id.clone(), template.build_behaviors()));
        index
    }

    /// Take a pooled instance of `template` (or construct one) and make it active.
    pub fn acquire(&mut self, template: &EffectTemplate, init: InstanceInit) -> AttackId {
        let index = match self.free.get_mut(&template.id).and_then(|free| free.pop()) {
            Some(index) => index,
            None => self.construct(template),
        };

        let parent = init.parent.filter(|parent| self.is_active(*parent));
        let attack = &mut self.slots[index as usize];
        debug_assert_eq!(attack.lifecycle, Lifecycle::Pooled, "acquired a live slot");

        attack.clear_runtime();
        for behavior in attack.behaviors.iter_mut() {
            behavior.reset();
        }
        attack.stats.reset_to(template.stats.iter().map(|(stat, value)| (*stat, *value)));
        attack.shape = template.shape;
        attack.owner = init.owner;
        attack.target = init.target;
        attack.position = init.position;
        attack.direction = init.direction;
        attack.parent = parent;
        attack.depth = init.depth;
        attack.dot_override = init.dot_override;
        attack.spawned_at = init.now;
        attack.lifecycle = Lifecycle::Active;
        let id = attack.id;

        if let Some(parent) = parent {
            self.slots[parent.index()].children.push(id);
        }
        self.registry.push(id);
        id
    }

    /// Mark for release at the next sweep.
    pub(crate) fn release(&mut self, id: AttackId) {
        if !self.pending_release.contains(&id) {
            self.pending_release.push(id);
        }
    }

    /// Pool every released instance. Returns `(id, template)` per pooled instance.
    pub(crate) fn sweep(&mut self) -> Vec<(AttackId, String)> {
        if self.pending_release.is_empty() {
            return Vec::new();
        }

        let mut pooled = Vec::with_capacity(self.pending_release.len());
        for id in std::mem::take(&mut self.pending_release) {
            let Some(attack) = self.slots.get_mut(id.index()) else {
                continue;
            };
            if attack.generation_matches(id) && attack.lifecycle == Lifecycle::Deactivating {
                attack.lifecycle = Lifecycle::Pooled;
                attack.id.generation = attack.id.generation.wrapping_add(1);
                self.free
                    .entry(attack.template.clone())
                    .or_default()
                    .push(id.index);
                pooled.push((id, attack.template.clone()));
            }
        }

        let slots = &self.slots;
        self.registry
            .retain(|id| slots[id.index()].lifecycle == Lifecycle::Active);
        pooled
    }

    pub(crate) fn unlink_child(&mut self, parent: AttackId, child: AttackId) {
        if let Some(parent) = self.get_mut(parent) {
            parent.children.retain(|c| *c != child);
        }
    }

    pub(crate) fn take_behaviors(&mut self, id: AttackId) -> BehaviorList {
        self.get_mut(id)
            .map(|attack| std::mem::take(&mut attack.behaviors))
            .unwrap_or_default()
    }

    pub(crate) fn restore_behaviors(&mut self, id: AttackId, behaviors: BehaviorList) {
        if let Some(attack) = self.get_mut(id) {
            debug_assert!(attack.behaviors.is_empty(), "behaviors restored twice");
            attack.behaviors = behaviors;
        }
    }

    /// Slot lookup for a handle known to be current. Only used while the
    /// instance is inside one of its own behavior calls.
    pub(crate) fn attack(&self, id: AttackId) -> &Attack {
        &self.slots[id.index()]
    }

    pub(crate) fn attack_mut(&mut self, id: AttackId) -> &mut Attack {
        &mut self.slots[id.index()]
    }

    /// Generation-checked lookup; stale handles resolve to `None`.
    pub fn get(&self, id: AttackId) -> Option<&Attack> {
        self.slots
            .get(id.index())
            .filter(|attack| attack.generation_matches(id))
    }

    pub fn get_mut(&mut self, id: AttackId) -> Option<&mut Attack> {
        self.slots
            .get_mut(id.index())
            .filter(|attack| attack.generation_matches(id))
    }

    pub fn is_active(&self, id: AttackId) -> bool {
        self.get(id).is_some_and(|attack| attack.is_active())
    }

    /// Live instances in acquisition order.
    pub fn registry(&self) -> &[AttackId] {
        &self.registry
    }

    pub fn active_count(&self) -> usize {
        self.registry
            .iter()
            .filter(|id| self.is_active(**id))
            .count()
    }

    pub fn pooled_count(&self, template: &str) -> usize {
        self.free.get(template).map_or(0, Vec::len)
    }

    /// Total slots ever constructed.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn log_stats(&self) {
        debug!(
            "Attack pool: {} slots, {} active, {} templates pooled",
            self.slots.len(),
            self.registry.len(),
            self.free.len()
        );
    }
}

impl Attack {
    fn generation_matches(&self, id: AttackId) -> bool {
        self.id.generation == id.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::template::EffectTemplate;

    fn init() -> InstanceInit {
        InstanceInit {
            owner: EntityId(0),
            target: None,
            position: Vec2::ZERO,
            direction: Vec2::X,
            parent: None,
            depth: 0,
            dot_override: None,
            now: 0.0,
        }
    }

    fn release_now(factory: &mut AttackFactory, id: AttackId) {
        factory.attack_mut(id).lifecycle = Lifecycle::Deactivating;
        factory.release(id);
        factory.sweep();
    }

    #[test]
    fn test_pool_grows_on_demand_and_reuses_slots() {
        let template = EffectTemplate::named("spark");
        let mut factory = AttackFactory::new();

        let first = factory.acquire(&template, init());
        let second = factory.acquire(&template, init());
        assert_eq!(factory.capacity(), 2);

        release_now(&mut factory, first);
        assert_eq!(factory.pooled_count("spark"), 1);

        let third = factory.acquire(&template, init());
        assert_eq!(third.index(), first.index());
        assert_ne!(third.generation(), first.generation());
        assert_eq!(factory.capacity(), 2);
        assert_eq!(factory.registry(), &[second, third]);
    }

    #[test]
    fn test_stale_handle_does_not_resolve() {
        let template = EffectTemplate::named("spark");
        let mut factory = AttackFactory::new();
        let id = factory.acquire(&template, init());
        release_now(&mut factory, id);

        assert!(factory.get(id).is_none());
        assert!(!factory.is_active(id));
    }

    #[test]
    fn test_released_instance_stays_registered_until_sweep() {
        let template = EffectTemplate::named("spark");
        let mut factory = AttackFactory::new();
        let id = factory.acquire(&template, init());

        factory.attack_mut(id).lifecycle = Lifecycle::Deactivating;
        factory.release(id);
        assert_eq!(factory.registry(), &[id]);
        assert_eq!(factory.pooled_count("spark"), 0);

        factory.sweep();
        assert!(factory.registry().is_empty());
        assert_eq!(factory.pooled_count("spark"), 1);
    }

    #[test]
    fn test_prewarm_fills_free_list() {
        let template = EffectTemplate::named("spark");
        let mut factory = AttackFactory::new();
        factory.prewarm(&template, 3);
        assert_eq!(factory.pooled_count("spark"), 3);

        factory.acquire(&template, init());
        assert_eq!(factory.pooled_count("spark"), 2);
        assert_eq!(factory.capacity(), 3);
    }

    #[test]
    fn test_child_links_to_active_parent() {
        let template = EffectTemplate::named("spark");
        let mut factory = AttackFactory::new();
        let parent = factory.acquire(&template, init());
        let child = factory.acquire(
            &template,
            InstanceInit {
                parent: Some(parent),
                depth: 1,
                ..init()
            },
        );

        assert_eq!(factory.attack(parent).children(), &[child]);
        assert_eq!(factory.attack(child).parent(), Some(parent));

        factory.unlink_child(parent, child);
        assert!(factory.attack(parent).children().is_empty());
    }
}
