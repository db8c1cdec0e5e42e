//! Chain propagation queue
//!
//! Holds the ordered hop list for one chain activation. Targets are visited at
//! most once; targets that died between enqueue and dequeue are skipped
//! without costing a hop.

use std::collections::VecDeque;

use bevy::math::Vec2;

use super::query::TargetSet;
use crate::world::EntityId;

#[derive(Clone, Debug, Default)]
pub struct ChainQueue {
    queue: VecDeque<EntityId>,
    visited: Vec<EntityId>,
    hops: u32,
    max_hops: u32,
    /// Where the last hop landed, for beam visuals
    last_point: Vec2,
}

impl ChainQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue up to `count` targets from a distance-ordered set.
    ///
    /// `origin` marks entities that count as already struck (the chain start).
    pub fn seed(&mut self, targets: TargetSet, count: u32, origin: &[EntityId], start: Vec2) {
        self.clear();
        self.max_hops = count;
        self.last_point = start;
        self.visited.extend_from_slice(origin);

        for entity in targets.entities() {
            if self.queue.len() as u32 >= count {
                break;
            }
            if !self.visited.contains(&entity) && !self.queue.contains(&entity) {
                self.queue.push_back(entity);
            }
        }
    }

    /// Pop the next target that is still alive. Dead ones are dropped.
    pub fn next_live(&mut self, mut is_alive: impl FnMut(EntityId) -> bool) -> Option<EntityId> {
        while let Some(entity) = self.queue.pop_front() {
            if self.visited.contains(&entity) {
                continue;
            }
            self.visited.push(entity);
            if is_alive(entity) {
                return Some(entity);
            }
        }
        None
    }

    /// Record a landed hop at `point`.
    pub fn record_hop(&mut self, point: Vec2) {
        self.hops += 1;
        self.last_point = point;
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty() || self.hops >= self.max_hops
    }

    pub fn hops(&self) -> u32 {
        self.hops
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn last_point(&self) -> Vec2 {
        self.last_point
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.visited.clear();
        self.hops = 0;
        self.max_hops = 0;
        self.last_point = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_of(count: u32) -> TargetSet {
        TargetSet::from_positions(
            Vec2::ZERO,
            (1..=count).map(|i| (EntityId(i), Vec2::new(i as f32, 0.0))),
        )
    }

    #[test]
    fn test_seed_caps_at_count() {
        let mut chain = ChainQueue::new();
        chain.seed(line_of(6), 3, &[], Vec2::ZERO);
        assert_eq!(chain.pending(), 3);
    }

    #[test]
    fn test_dead_targets_are_skipped_without_a_hop() {
        let mut chain = ChainQueue::new();
        chain.seed(line_of(3), 3, &[], Vec2::ZERO);

        let next = chain.next_live(|entity| entity != EntityId(1));
        assert_eq!(next, Some(EntityId(2)));
        assert_eq!(chain.hops(), 0);
    }

    #[test]
    fn test_origin_is_never_revisited() {
        let mut chain = ChainQueue::new();
        chain.seed(line_of(3), 5, &[EntityId(1)], Vec2::ZERO);
        assert_eq!(chain.pending(), 2);
        assert_eq!(chain.next_live(|_| true), Some(EntityId(2)));
    }

    #[test]
    fn test_exhausted_after_max_hops() {
        let mut chain = ChainQueue::new();
        chain.seed(line_of(4), 2, &[], Vec2::ZERO);
        for _ in 0..2 {
            let target = chain.next_live(|_| true);
            assert!(target.is_some());
            chain.record_hop(Vec2::ONE);
        }
        assert!(chain.is_exhausted());
    }
}
