//! Distance-ordered target sets
//!
//! Every spatial query result is sorted by ascending distance, ties broken by
//! entity id, so two runs over the same world always visit targets in the
//! same order.

use bevy::math::Vec2;

use crate::world::EntityId;

/// Targets ordered by ascending distance from the query point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetSet {
    entries: Vec<(EntityId, f32)>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `(entity, position)` pairs measured from `origin`.
    pub fn from_positions(origin: Vec2, candidates: impl IntoIterator<Item = (EntityId, Vec2)>) -> Self {
        let mut entries: Vec<(EntityId, f32)> = candidates
            .into_iter()
            .map(|(entity, position)| (entity, origin.distance(position)))
            .collect();
        sort_by_distance(&mut entries);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the nearest `max` entries.
    pub fn truncate(&mut self, max: usize) {
        self.entries.truncate(max);
    }

    /// Drop specific entities (e.g. already visited ones).
    pub fn exclude(&mut self, excluded: &[EntityId]) {
        self.entries.retain(|(entity, _)| !excluded.contains(entity));
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.iter().map(|(entity, _)| *entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(EntityId, f32)> {
        self.entries.iter()
    }

    pub fn nearest(&self) -> Option<EntityId> {
        self.entries.first().map(|(entity, _)| *entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entries.iter().any(|(e, _)| *e == entity)
    }
}

impl IntoIterator for TargetSet {
    type Item = (EntityId, f32);
    type IntoIter = std::vec::IntoIter<(EntityId, f32)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Ascending distance, then ascending entity id.
pub fn sort_by_distance(entries: &mut [(EntityId, f32)]) {
    entries.sort_by(|(a_id, a_dist), (b_id, b_dist)| {
        a_dist.total_cmp(b_dist).then_with(|| a_id.cmp(b_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_distances_break_ties_by_id() {
        let set = TargetSet::from_positions(
            Vec2::ZERO,
            [
                (EntityId(7), Vec2::new(0.0, 2.0)),
                (EntityId(3), Vec2::new(2.0, 0.0)),
                (EntityId(5), Vec2::new(1.0, 0.0)),
            ],
        );
        let order: Vec<EntityId> = set.entities().collect();
        assert_eq!(order, vec![EntityId(5), EntityId(3), EntityId(7)]);
    }

    #[test]
    fn test_exclude_and_truncate() {
        let mut set = TargetSet::from_positions(
            Vec2::ZERO,
            (1..=5).map(|i| (EntityId(i), Vec2::new(i as f32, 0.0))),
        );
        set.exclude(&[EntityId(1)]);
        set.truncate(2);
        assert_eq!(set.entities().collect::<Vec<_>>(), vec![EntityId(2), EntityId(3)]);
    }
}
