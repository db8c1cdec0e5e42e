//! Area shapes and overlap tests
//!
//! Shapes are authored in templates and evaluated against host entity
//! positions. Fans are turned into a polygon with `segments + 2` vertices, the
//! same polygon a renderer or a physics collider would use.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

/// Spatial extent of an attack instance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum AreaShape {
    Circle {
        radius: f32,
    },
    /// Axis-aligned rectangle centered on the instance
    Rect {
        half_width: f32,
        half_height: f32,
    },
    /// Sector opening around the facing direction
    Fan {
        radius: f32,
        half_angle_deg: f32,
        segments: u32,
    },
}

impl Default for AreaShape {
    fn default() -> Self {
        AreaShape::Circle { radius: 0.5 }
    }
}

impl AreaShape {
    /// Does a body of radius `padding` at `point` overlap this shape placed at
    /// `center` facing `facing`?
    pub fn contains(&self, center: Vec2, facing: Vec2, point: Vec2, padding: f32) -> bool {
        match *self {
            AreaShape::Circle { radius } => center.distance(point) <= radius + padding,
            AreaShape::Rect {
                half_width,
                half_height,
            } => {
                let delta = (point - center).abs();
                delta.x <= half_width + padding && delta.y <= half_height + padding
            }
            AreaShape::Fan {
                radius,
                half_angle_deg,
                segments,
            } => {
                if center.distance(point) > radius + padding {
                    return false;
                }
                let polygon = fan_vertices(
                    center,
                    facing,
                    radius + padding,
                    half_angle_deg.to_radians(),
                    segments.max(1),
                );
                point_in_polygon(point, &polygon)
            }
        }
    }
}

/// Unit facing vector, falling back to +X for a zero direction.
pub fn facing_or_default(direction: Vec2) -> Vec2 {
    let normalized = direction.normalize_or_zero();
    if normalized == Vec2::ZERO {
        Vec2::X
    } else {
        normalized
    }
}

/// Rotate a vector counter-clockwise by `degrees`.
pub fn rotate_deg(vector: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(vector)
}

/// Fan polygon: the center, then `segments + 1` arc points blended by angle
/// from `direction` rotated by `-half_angle` to `direction` rotated by
/// `+half_angle`, each at `radius` from the center.
pub fn fan_vertices(
    center: Vec2,
    direction: Vec2,
    radius: f32,
    half_angle: f32,
    segments: u32,
) -> Vec<Vec2> {
    let facing = facing_or_default(direction);
    let mut vertices = Vec::with_capacity(segments as usize + 2);
    vertices.push(center);

    let steps = segments.max(1) as f32;
    for i in 0..=segments {
        // Interpolating the angle (not the endpoints) keeps every point on the arc
        // and supports sectors wider than 180 degrees.
        let t = i as f32 / steps;
        let angle = -half_angle + 2.0 * half_angle * t;
        let arc_direction = Vec2::from_angle(angle).rotate(facing);
        vertices.push(center + arc_direction * radius);
    }

    vertices
}

/// Even-odd ray casting test.
pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let cross_x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_fan_vertex_count_and_radius() {
        let center = Vec2::new(2.0, -1.0);
        let vertices = fan_vertices(center, Vec2::Y, 3.0, 45f32.to_radians(), 8);

        assert_eq!(vertices.len(), 10);
        assert_eq!(vertices[0], center);
        for vertex in &vertices[1..] {
            assert!((vertex.distance(center) - 3.0).abs() < EPS);
        }
    }

    #[test]
    fn test_fan_is_symmetric_about_bisector() {
        let direction = Vec2::new(1.0, 1.0).normalize();
        let vertices = fan_vertices(Vec2::ZERO, direction, 2.0, 60f32.to_radians(), 8);
        let arc = &vertices[1..];

        for i in 0..arc.len() {
            let mirrored = arc[arc.len() - 1 - i];
            // Reflect across the bisector: keep the parallel part, flip the perpendicular part
            let along = arc[i].dot(direction);
            let across = arc[i].perp_dot(direction);
            assert!((mirrored.dot(direction) - along).abs() < EPS);
            assert!((mirrored.perp_dot(direction) + across).abs() < EPS);
        }
        // Middle arc point lies on the bisector
        assert!((arc[4] - direction * 2.0).length() < EPS);
    }

    #[test]
    fn test_fan_contains_only_points_inside_sector() {
        let fan = AreaShape::Fan {
            radius: 5.0,
            half_angle_deg: 30.0,
            segments: 8,
        };
        assert!(fan.contains(Vec2::ZERO, Vec2::X, Vec2::new(3.0, 0.5), 0.0));
        assert!(!fan.contains(Vec2::ZERO, Vec2::X, Vec2::new(0.0, 3.0), 0.0));
        assert!(!fan.contains(Vec2::ZERO, Vec2::X, Vec2::new(-3.0, 0.0), 0.0));
        assert!(!fan.contains(Vec2::ZERO, Vec2::X, Vec2::new(6.0, 0.0), 0.0));
    }

    #[test]
    fn test_wide_fan_covers_more_than_half_circle() {
        let fan = AreaShape::Fan {
            radius: 5.0,
            half_angle_deg: 135.0,
            segments: 16,
        };
        assert!(fan.contains(Vec2::ZERO, Vec2::X, Vec2::new(0.0, 3.0), 0.0));
        assert!(!fan.contains(Vec2::ZERO, Vec2::X, Vec2::new(-3.0, 0.1), 0.0));
    }

    #[test]
    fn test_rect_uses_padding() {
        let rect = AreaShape::Rect {
            half_width: 1.0,
            half_height: 0.5,
        };
        assert!(!rect.contains(Vec2::ZERO, Vec2::X, Vec2::new(1.2, 0.0), 0.0));
        assert!(rect.contains(Vec2::ZERO, Vec2::X, Vec2::new(1.2, 0.0), 0.3));
    }
}
