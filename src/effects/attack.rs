//! Effect instances
//!
//! An `Attack` is one live occurrence of a template: owner, optional target,
//! a stat sheet seeded from the template, a spatial extent, parent/child links
//! and the ordered behaviors that drive it. Instances live in the factory's
//! arena and are addressed by generational `AttackId`s, so a handle kept past
//! pooling simply stops resolving.

use std::fmt;

use bevy::math::Vec2;

use super::component::{AttackComponent, Phase};
use crate::stats::{DotSpec, StatSheet};
use crate::targeting::AreaShape;
use crate::world::{EntityId, VisualId};

/// Generational handle into the factory arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttackId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl AttackId {
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for AttackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attack#{}v{}", self.index, self.generation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Pooled,
    Active,
    /// Inside `deactivate`, until the end-of-operation sweep pools it
    Deactivating,
}

pub type BehaviorList = Vec<Box<dyn AttackComponent>>;

pub struct Attack {
    pub(crate) id: AttackId,
    pub(crate) template: String,
    pub(crate) owner: EntityId,
    pub(crate) target: Option<EntityId>,
    pub(crate) stats: StatSheet,
    pub(crate) shape: AreaShape,
    pub(crate) position: Vec2,
    pub(crate) direction: Vec2,
    pub(crate) parent: Option<AttackId>,
    pub(crate) children: Vec<AttackId>,
    pub(crate) behaviors: BehaviorList,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) collider_enabled: bool,
    pub(crate) visual: Option<VisualId>,
    /// Per-instance DOT parameters (Burn), overriding the authored ones
    pub(crate) dot_override: Option<DotSpec>,
    /// Nesting level; top-level casts are 0
    pub(crate) depth: u8,
    pub(crate) finish_requested: bool,
    pub(crate) spawned_at: f32,
    pub(crate) hits: u32,
    pub(crate) damage_dealt: f32,
}

impl Attack {
    pub(crate) fn new(id: AttackId, template: String, behaviors: BehaviorList) -> Self {
        Self {
            id,
            template,
            owner: EntityId::INVALID,
            target: None,
            stats: StatSheet::new(),
            shape: AreaShape::default(),
            position: Vec2::ZERO,
            direction: Vec2::X,
            parent: None,
            children: Vec::new(),
            behaviors,
            lifecycle: Lifecycle::Pooled,
            collider_enabled: false,
            visual: None,
            dot_override: None,
            depth: 0,
            finish_requested: false,
            spawned_at: 0.0,
            hits: 0,
            damage_dealt: 0.0,
        }
    }

    pub fn id(&self) -> AttackId {
        self.id
    }

    pub fn template_id(&self) -> &str {
        &self.template
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Retarget. Only an active instance may change its target.
    pub fn set_target(&mut self, target: Option<EntityId>) -> bool {
        if self.lifecycle != Lifecycle::Active {
            return false;
        }
        self.target = target;
        true
    }

    pub fn stats(&self) -> &StatSheet {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut StatSheet {
        &mut self.stats
    }

    pub fn shape(&self) -> &AreaShape {
        &self.shape
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn parent(&self) -> Option<AttackId> {
        self.parent
    }

    pub fn children(&self) -> &[AttackId] {
        &self.children
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    pub fn collider_enabled(&self) -> bool {
        self.collider_enabled
    }

    pub fn visual(&self) -> Option<VisualId> {
        self.visual
    }

    pub fn dot_override(&self) -> Option<DotSpec> {
        self.dot_override
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn spawned_at(&self) -> f32 {
        self.spawned_at
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn damage_dealt(&self) -> f32 {
        self.damage_dealt
    }

    pub fn behavior_names(&self) -> Vec<&'static str> {
        self.behaviors.iter().map(|b| b.name()).collect()
    }

    /// Current FSM phase of every behavior, in declaration order.
    pub fn phases(&self) -> Vec<Phase> {
        self.behaviors.iter().map(|b| b.phase()).collect()
    }

    /// Drop every per-activation field. Behaviors are reset separately.
    pub(crate) fn clear_runtime(&mut self) {
        self.owner = EntityId::INVALID;
        self.target = None;
        self.parent = None;
        self.children.clear();
        self.stats.clear_modifiers();
        self.collider_enabled = false;
        self.visual = None;
        self.dot_override = None;
        self.depth = 0;
        self.finish_requested = false;
        self.hits = 0;
        self.damage_dealt = 0.0;
    }
}

impl fmt::Debug for Attack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attack")
            .field("id", &self.id)
            .field("template", &self.template)
            .field("owner", &self.owner)
            .field("target", &self.target)
            .field("lifecycle", &self.lifecycle)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("behaviors", &self.behavior_names())
            .finish()
    }
}
