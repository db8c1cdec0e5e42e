//! Orbiting satellite placement
//!
//! N satellites share a base angle that advances every tick. Each satellite
//! sits at its own angular offset from the base; when the ring gains or loses
//! a member the offsets ease from their current values to an even
//! `360 / N` spacing. Offsets are interpolated between two ascending
//! sequences, so neighbours never cross or coincide during the animation.

use bevy::math::Vec2;

#[derive(Clone, Copy, Debug, PartialEq)]
struct OrbitSlot<K> {
    key: K,
    /// Offset from the base angle, degrees
    offset: f32,
    from: f32,
    to: f32,
}

/// Ring geometry and motion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitShape {
    pub radius_x: f32,
    pub radius_y: f32,
    /// Degrees per second
    pub speed: f32,
    pub clockwise: bool,
    /// Seconds to settle into even spacing after a membership change
    pub respace_time: f32,
}

#[derive(Clone, Debug)]
pub struct OrbitRing<K> {
    shape: OrbitShape,
    slots: Vec<OrbitSlot<K>>,
    base_angle: f32,
    respace_elapsed: f32,
}

impl<K: Copy + PartialEq> OrbitRing<K> {
    pub fn new(shape: OrbitShape) -> Self {
        Self {
            shape,
            slots: Vec::new(),
            base_angle: 0.0,
            respace_elapsed: 0.0,
        }
    }

    /// Fill an empty ring with evenly spaced members, no animation.
    pub fn populate(&mut self, keys: impl IntoIterator<Item = K>) {
        self.slots = keys
            .into_iter()
            .map(|key| OrbitSlot {
                key,
                offset: 0.0,
                from: 0.0,
                to: 0.0,
            })
            .collect();
        let spacing = self.spacing();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let even = i as f32 * spacing;
            slot.offset = even;
            slot.from = even;
            slot.to = even;
        }
        self.respace_elapsed = self.shape.respace_time;
    }

    /// Add a member in the widest gap position (after the last slot) and re-space.
    pub fn add(&mut self, key: K) {
        let offset = match (self.slots.first(), self.slots.last()) {
            (Some(first), Some(last)) => (last.offset + first.offset + 360.0) * 0.5,
            _ => 0.0,
        };
        self.slots.push(OrbitSlot {
            key,
            offset,
            from: offset,
            to: offset,
        });
        self.respace();
    }

    /// Remove a member and re-space the survivors. Returns false when absent.
    pub fn remove(&mut self, key: K) -> bool {
        let Some(index) = self.slots.iter().position(|slot| slot.key == key) else {
            return false;
        };
        self.slots.remove(index);
        self.respace();
        true
    }

    fn spacing(&self) -> f32 {
        if self.slots.is_empty() {
            0.0
        } else {
            360.0 / self.slots.len() as f32
        }
    }

    fn respace(&mut self) {
        // Survivors keep their order; the first one anchors the new layout so
        // nothing needs to travel more than one spacing.
        let spacing = self.spacing();
        let anchor = self.slots.first().map(|slot| slot.offset).unwrap_or(0.0);
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.from = slot.offset;
            slot.to = anchor + i as f32 * spacing;
        }
        self.respace_elapsed = 0.0;
    }

    /// Advance the shared base angle and the re-spacing animation.
    pub fn advance(&mut self, dt: f32) {
        let sign = if self.shape.clockwise { -1.0 } else { 1.0 };
        self.base_angle = (self.base_angle + self.shape.speed * sign * dt).rem_euclid(360.0);

        self.respace_elapsed += dt;
        let progress = if self.shape.respace_time <= 0.0 {
            1.0
        } else {
            (self.respace_elapsed / self.shape.respace_time).clamp(0.0, 1.0)
        };
        // Smoothstep easing; one shared progress value keeps the ordering intact
        let eased = progress * progress * (3.0 - 2.0 * progress);
        for slot in self.slots.iter_mut() {
            slot.offset = slot.from + (slot.to - slot.from) * eased;
        }
    }

    pub fn is_settled(&self) -> bool {
        self.respace_elapsed >= self.shape.respace_time
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.slots.iter().map(|slot| slot.key)
    }

    pub fn base_angle(&self) -> f32 {
        self.base_angle
    }

    /// Absolute angle of every member, degrees in [0, 360).
    pub fn angles(&self) -> Vec<f32> {
        self.slots
            .iter()
            .map(|slot| (self.base_angle + slot.offset).rem_euclid(360.0))
            .collect()
    }

    /// Member positions around `anchor` on the (possibly elliptical) ring.
    pub fn positions(&self, anchor: Vec2) -> Vec<(K, Vec2)> {
        self.slots
            .iter()
            .map(|slot| {
                let angle = (self.base_angle + slot.offset).to_radians();
                let offset = Vec2::new(angle.cos() * self.shape.radius_x, angle.sin() * self.shape.radius_y);
                (slot.key, anchor + offset)
            })
            .collect()
    }

    /// Smallest angular gap between neighbours, degrees.
    pub fn min_gap(&self) -> f32 {
        let mut angles = self.angles();
        if angles.len() < 2 {
            return 360.0;
        }
        angles.sort_by(f32::total_cmp);
        let wrap = angles[0] + 360.0 - angles[angles.len() - 1];
        angles
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .fold(wrap, f32::min)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.base_angle = 0.0;
        self.respace_elapsed = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> OrbitShape {
        OrbitShape {
            radius_x: 2.0,
            radius_y: 2.0,
            speed: 90.0,
            clockwise: false,
            respace_time: 0.5,
        }
    }

    #[test]
    fn test_populate_spaces_evenly() {
        let mut ring = OrbitRing::new(shape());
        ring.populate([1u32, 2, 3, 4]);
        assert_eq!(ring.angles(), vec![0.0, 90.0, 180.0, 270.0]);
    }

    #[test]
    fn test_base_angle_advances_with_direction_sign() {
        let mut ring = OrbitRing::new(OrbitShape {
            clockwise: true,
            ..shape()
        });
        ring.populate([1u32]);
        ring.advance(0.5);
        assert_eq!(ring.base_angle(), 315.0);
    }

    #[test]
    fn test_elliptical_positions_use_both_radii() {
        let mut ring = OrbitRing::new(OrbitShape {
            radius_x: 3.0,
            radius_y: 1.0,
            ..shape()
        });
        ring.populate([1u32, 2]);
        let positions = ring.positions(Vec2::ZERO);
        assert!((positions[0].1 - Vec2::new(3.0, 0.0)).length() < 1e-4);
        assert!((positions[1].1 - Vec2::new(-3.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_add_member_converges_without_overlap() {
        let mut ring = OrbitRing::new(shape());
        ring.populate([1u32, 2]);
        ring.add(3);
        for _ in 0..40 {
            ring.advance(0.025);
            assert!(ring.min_gap() > 1.0);
        }
        assert!((ring.min_gap() - 120.0).abs() < 0.01);
    }

    #[test]
    fn test_removed_member_leaves_even_spacing() {
        let mut ring = OrbitRing::new(shape());
        ring.populate([1u32, 2, 3, 4]);
        assert!(ring.remove(2));
        assert!(!ring.remove(2));

        let mut previous_order: Option<Vec<u32>> = None;
        for _ in 0..30 {
            ring.advance(1.0 / 30.0);
            assert!(ring.min_gap() > 1.0);
            let order: Vec<u32> = ring.keys().collect();
            if let Some(previous) = &previous_order {
                assert_eq!(previous, &order);
            }
            previous_order = Some(order);
        }
        assert!(ring.is_settled());
        assert!((ring.min_gap() - 120.0).abs() < 0.01);
    }
}
