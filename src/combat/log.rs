//! Combat logging
//!
//! Records every hit, status application, effect lifecycle event and
//! configuration problem for post-run analysis. Entries are serialisable so a
//! headless run can dump the whole log as JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::world::EntityId;

/// A single entry in the combat log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatLogEntry {
    /// Simulation time (seconds since the engine started)
    pub timestamp: f32,
    pub event_type: CombatLogEventType,
    /// Human-readable description of the event
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<DamageRecord>,
}

/// Structured data behind a `Damage` / `Evade` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageRecord {
    /// Owner of the attack instance
    pub source: EntityId,
    pub target: EntityId,
    pub template: String,
    pub amount: f32,
    pub is_critical: bool,
    pub is_evaded: bool,
    pub killing_blow: bool,
}

/// Types of combat log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatLogEventType {
    Damage,
    Evade,
    /// Buff/debuff applied or refreshed
    StatusApplied,
    /// Buff/debuff rejected by its re-application policy
    StatusIgnored,
    EffectSpawned,
    EffectEnded,
    Death,
    /// Unknown template, depth limit and similar authoring problems
    ConfigError,
    /// Run start, end, etc.
    MatchEvent,
}

/// The combat log storing all events
#[derive(Resource, Debug, Default, Serialize, Deserialize)]
pub struct CombatLog {
    /// All entries in chronological order
    pub entries: Vec<CombatLogEntry>,
    /// Current simulation time
    pub match_time: f32,
}

impl CombatLog {
    pub fn clear(&mut self) {
        self.entries.clear();
        self.match_time = 0.0;
    }

    pub fn log(&mut self, event_type: CombatLogEventType, message: String) {
        self.entries.push(CombatLogEntry {
            timestamp: self.match_time,
            event_type,
            message,
            damage: None,
        });
    }

    /// Record a hit. Evaded hits are logged as `Evade`.
    pub fn log_damage(&mut self, record: DamageRecord, message: String) {
        let event_type = if record.is_evaded {
            CombatLogEventType::Evade
        } else {
            CombatLogEventType::Damage
        };
        self.entries.push(CombatLogEntry {
            timestamp: self.match_time,
            event_type,
            message,
            damage: Some(record),
        });
    }

    pub fn filter_by_type(&self, event_type: CombatLogEventType) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&CombatLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    pub fn damage_records(&self) -> impl Iterator<Item = &DamageRecord> {
        self.entries.iter().filter_map(|e| e.damage.as_ref())
    }

    pub fn total_damage(&self) -> f32 {
        self.damage_records().map(|r| r.amount).sum()
    }

    /// Damage dealt per template id.
    pub fn damage_by_template(&self) -> BTreeMap<String, f32> {
        let mut totals = BTreeMap::new();
        for record in self.damage_records() {
            *totals.entry(record.template.clone()).or_insert(0.0) += record.amount;
        }
        totals
    }

    pub fn damage_taken_by(&self, entity: EntityId) -> f32 {
        self.damage_records()
            .filter(|r| r.target == entity)
            .map(|r| r.amount)
            .sum()
    }

    pub fn hits_on(&self, entity: EntityId) -> usize {
        self.damage_records()
            .filter(|r| r.target == entity && !r.is_evaded)
            .count()
    }

    pub fn killing_blows(&self) -> Vec<&DamageRecord> {
        self.damage_records().filter(|r| r.killing_blow).collect()
    }

    /// Write the whole log as pretty JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Combat log saved to {}", path.display());
        Ok(())
    }
}
