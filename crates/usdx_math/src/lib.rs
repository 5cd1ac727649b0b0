// Re-export glam for convenience
pub use glam::*;

// usdx math types
mod aabb;
mod axes;
mod interval;
mod ray;
mod tolerance;
mod transform;

pub use aabb::Aabb;
pub use axes::{StageAxes, UpAxis, RUNTIME_METERS_PER_UNIT};
pub use interval::Interval;
pub use ray::{Ray, TriangleHit};
pub use tolerance::*;
pub use transform::{Mat4Ext, Transform};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
    }

    #[test]
    fn test_reexported_types_work_together() {
        let t = Transform::from_translation(Vec3::new(0.0, 0.0, 10.0));
        let ray = Ray::new(t.translation, Vec3::NEG_Z);
        assert!((ray.at(10.0) - Vec3::ZERO).length() < 0.001);
    }
}
