use crate::{Interval, Vec3};

/// A ray in 3D space with origin and direction.
///
/// Used for line traces against runtime surfaces: a segment from `a` to `b`
/// is the ray `a + t * (b - a)` restricted to `t` in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Result of a ray-triangle intersection.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TriangleHit {
    /// Ray parameter of the hit point
    pub t: f32,
    /// Barycentric coordinates of the hit (weights of v1 and v2)
    pub u: f32,
    pub v: f32,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Ray spanning the segment `start..end` for `t` in `[0, 1]`.
    pub fn segment(start: Vec3, end: Vec3) -> Self {
        Self::new(start, end - start)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Möller-Trumbore ray-triangle intersection.
    ///
    /// Both windings are accepted.
    pub fn intersect_triangle(
        &self,
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        ray_t: Interval,
    ) -> Option<TriangleHit> {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let h = self.direction.cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return None;
        }

        let f = 1.0 / a;
        let s = self.origin - v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * self.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if !ray_t.contains(t) {
            return None;
        }

        Some(TriangleHit { t, u, v })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_segment_spans_unit_parameter() {
        let start = Vec3::new(0.0, 0.0, 500.0);
        let end = Vec3::new(0.0, 0.0, -500.0);
        let ray = Ray::segment(start, end);
        assert_eq!(ray.at(0.0), start);
        assert_eq!(ray.at(1.0), end);
    }

    #[test]
    fn test_triangle_hit_both_windings() {
        let ray = Ray::segment(Vec3::new(0.25, 0.25, 10.0), Vec3::new(0.25, 0.25, -10.0));
        let (a, b, c) = (Vec3::ZERO, Vec3::X, Vec3::Y);

        let hit = ray.intersect_triangle(a, b, c, Interval::new(0.0, 1.0)).unwrap();
        assert!((hit.t - 0.5).abs() < 0.001);
        assert!((ray.at(hit.t) - Vec3::new(0.25, 0.25, 0.0)).length() < 0.001);

        assert!(ray.intersect_triangle(a, c, b, Interval::new(0.0, 1.0)).is_some());
    }

    #[test]
    fn test_triangle_miss() {
        let ray = Ray::segment(Vec3::new(2.0, 2.0, 10.0), Vec3::new(2.0, 2.0, -10.0));
        assert!(ray
            .intersect_triangle(Vec3::ZERO, Vec3::X, Vec3::Y, Interval::new(0.0, 1.0))
            .is_none());
    }

    #[test]
    fn test_triangle_out_of_range() {
        let ray = Ray::segment(Vec3::new(0.1, 0.1, 10.0), Vec3::new(0.1, 0.1, 5.0));
        assert!(ray
            .intersect_triangle(Vec3::ZERO, Vec3::X, Vec3::Y, Interval::new(0.0, 1.0))
            .is_none());
    }
}
