//! Numeric tolerances shared by the geometry codecs.

use glam::Vec3;

/// Two points closer than this on every axis are the same point.
pub const THRESH_POINTS_ARE_SAME: f32 = 0.00002;

/// Per-axis distance under which mesh vertices are merged.
pub const VERTEX_MERGE_TOLERANCE: f32 = 4.0 * THRESH_POINTS_ARE_SAME;

/// Minimum normal dot product for two polygons to be coplanar.
pub const COPLANAR_NORMAL_DOT: f32 = 0.9999;

/// Maximum absolute plane distance for two polygons to be coplanar.
pub const COPLANAR_PLANE_DISTANCE: f32 = 0.001;

/// Generic small number for float comparison.
pub const SMALL_NUMBER: f32 = 1.0e-8;

/// Tolerance for "nearly equal" scalar checks.
pub const KINDA_SMALL_NUMBER: f32 = 1.0e-4;

/// Per-axis vertex coincidence test.
pub fn vertices_equal(a: Vec3, b: Vec3) -> bool {
    (a.x - b.x).abs() <= VERTEX_MERGE_TOLERANCE
        && (a.y - b.y).abs() <= VERTEX_MERGE_TOLERANCE
        && (a.z - b.z).abs() <= VERTEX_MERGE_TOLERANCE
}

pub fn is_nearly_equal(a: f32, b: f32) -> bool {
    (a - b).abs() <= KINDA_SMALL_NUMBER
}

/// Signed distance of `point` from the plane through `origin` with `normal`.
pub fn point_plane_distance(point: Vec3, origin: Vec3, normal: Vec3) -> f32 {
    (point - origin).dot(normal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertices_equal_is_per_axis() {
        let a = Vec3::ZERO;
        let d = VERTEX_MERGE_TOLERANCE;
        // Within tolerance on every axis, although the Euclidean distance exceeds it.
        assert!(vertices_equal(a, Vec3::splat(d)));
        assert!(Vec3::splat(d).length() > d);
        assert!(!vertices_equal(a, Vec3::new(0.0, 0.0, d * 2.0)));
    }

    #[test]
    fn test_point_plane_distance_sign() {
        let n = Vec3::Z;
        assert!((point_plane_distance(Vec3::new(5.0, 5.0, 2.0), Vec3::ZERO, n) - 2.0).abs() < 1e-6);
        assert!(point_plane_distance(Vec3::new(0.0, 0.0, -1.0), Vec3::ZERO, n) < 0.0);
    }
}
