//! Collision primitives
//!
//! Axis-aligned boxes for the octree and spacecraft hitboxes, and the
//! swept test used for projectiles: a projectile moves a long way in one tick
//! compared to a hitbox, so its whole path segment is tested, not just its
//! end position.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box of a sphere
    pub fn around(center: Vec3, radius: f32) -> Self {
        Self {
            min: center - Vec3::splat(radius),
            max: center + Vec3::splat(radius),
        }
    }

    /// Box of a path segment, padded by `radius`
    pub fn of_segment(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self {
            min: start.min(end) - Vec3::splat(radius),
            max: start.max(end) + Vec3::splat(radius),
        }
    }

    /// Smallest box containing both
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.min.cmple(point).all() && self.max.cmpge(point).all()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Result of a swept hit test
#[derive(Debug, Clone, Copy)]
pub struct SegmentHit {
    /// Fraction along the segment where it enters the box (0 = start)
    pub t: f32,
    /// Entry point
    pub point: Vec3,
}

/// Slab test of the segment `start..end` against `aabb`.
///
/// Returns the entry point, or the start point if the segment starts inside
/// the box.
pub fn segment_aabb_intersection(start: Vec3, end: Vec3, aabb: &Aabb) -> Option<SegmentHit> {
    let dir = end - start;
    let mut t_min = 0.0f32;
    let mut t_max = 1.0f32;

    for axis in 0..3 {
        let origin = start[axis];
        let d = dir[axis];
        let (lo, hi) = (aabb.min[axis], aabb.max[axis]);
        if d.abs() < 1e-8 {
            // Parallel to this slab: must already be inside it
            if origin < lo || origin > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t1 = (lo - origin) * inv;
        let mut t2 = (hi - origin) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }

    Some(SegmentHit {
        t: t_min,
        point: start + dir * t_min,
    })
}

/// Whether a sphere and a box overlap
pub fn sphere_aabb_overlap(center: Vec3, radius: f32, aabb: &Aabb) -> bool {
    let closest = center.clamp(aabb.min, aabb.max);
    closest.distance_squared(center) <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_segment_through_box() {
        let hit = segment_aabb_intersection(
            Vec3::new(-5.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
            &unit_box(),
        )
        .unwrap();
        assert!((hit.t - 0.4).abs() < 1e-5);
        assert!((hit.point.x + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_segment_stops_short() {
        let hit = segment_aabb_intersection(
            Vec3::new(-5.0, 0.0, 0.0),
            Vec3::new(-2.0, 0.0, 0.0),
            &unit_box(),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_segment_parallel_outside() {
        let hit = segment_aabb_intersection(
            Vec3::new(-5.0, 2.0, 0.0),
            Vec3::new(5.0, 2.0, 0.0),
            &unit_box(),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_segment_starting_inside() {
        let hit = segment_aabb_intersection(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0), &unit_box())
            .unwrap();
        assert_eq!(hit.t, 0.0);
    }

    #[test]
    fn test_box_queries() {
        let a = unit_box();
        let b = Aabb::around(Vec3::new(1.5, 0.0, 0.0), 0.6);
        let c = Aabb::around(Vec3::new(3.0, 0.0, 0.0), 0.5);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(a.union(&c).max.x, 3.5);
        assert!(a.contains_point(Vec3::new(0.5, -0.5, 1.0)));
        assert!(sphere_aabb_overlap(Vec3::new(1.5, 0.0, 0.0), 0.6, &a));
        assert!(!sphere_aabb_overlap(Vec3::new(1.5, 1.5, 0.0), 0.6, &a));
    }
}
