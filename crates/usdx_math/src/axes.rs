//! Coordinate convention conversion between the runtime and a document stage.
//!
//! The runtime is Z-up, left-handed, measured in centimetres. A stage
//! declares its own up axis and metres-per-unit; converting between the two
//! is a reflection (self-inverse) plus a uniform unit rescale.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::{is_nearly_equal, Transform};

/// Metres per unit of the runtime world.
pub const RUNTIME_METERS_PER_UNIT: f32 = 0.01;

/// Up axis declared by a stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpAxis {
    Y,
    #[default]
    Z,
}

impl UpAxis {
    /// Token spelling used in stage metadata.
    pub fn token(self) -> &'static str {
        match self {
            UpAxis::Y => "Y",
            UpAxis::Z => "Z",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "Y" | "y" => Some(UpAxis::Y),
            "Z" | "z" => Some(UpAxis::Z),
            _ => None,
        }
    }
}

/// Axis and unit convention of a stage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageAxes {
    pub up_axis: UpAxis,
    pub meters_per_unit: f32,
}

impl Default for StageAxes {
    fn default() -> Self {
        Self {
            up_axis: UpAxis::Z,
            meters_per_unit: RUNTIME_METERS_PER_UNIT,
        }
    }
}

impl StageAxes {
    pub fn new(up_axis: UpAxis, meters_per_unit: f32) -> Self {
        Self {
            up_axis,
            meters_per_unit,
        }
    }

    /// Factor applied to runtime lengths to express them in stage units.
    pub fn runtime_to_stage_scale(&self) -> f32 {
        if self.meters_per_unit <= 0.0
            || is_nearly_equal(self.meters_per_unit, RUNTIME_METERS_PER_UNIT)
        {
            1.0
        } else {
            RUNTIME_METERS_PER_UNIT / self.meters_per_unit
        }
    }

    /// Reflect a position or direction across conventions.
    pub fn convert_vector(&self, v: Vec3) -> Vec3 {
        match self.up_axis {
            UpAxis::Z => Vec3::new(v.x, -v.y, v.z),
            UpAxis::Y => Vec3::new(v.x, v.z, v.y),
        }
    }

    /// Reflect a rotation across conventions.
    pub fn convert_rotation(&self, q: Quat) -> Quat {
        match self.up_axis {
            UpAxis::Z => Quat::from_xyzw(-q.x, q.y, -q.z, q.w),
            UpAxis::Y => {
                let inv = q.inverse();
                Quat::from_xyzw(inv.x, inv.z, inv.y, inv.w)
            }
        }
    }

    /// Reflect a non-uniform scale across conventions.
    pub fn convert_scale(&self, s: Vec3) -> Vec3 {
        match self.up_axis {
            UpAxis::Z => s,
            UpAxis::Y => Vec3::new(s.x, s.z, s.y),
        }
    }

    /// Axis conversion of a full placement, without unit rescale.
    pub fn convert_axes(&self, t: &Transform) -> Transform {
        Transform {
            translation: self.convert_vector(t.translation),
            rotation: self.convert_rotation(t.rotation),
            scale: self.convert_scale(t.scale),
        }
    }

    /// Runtime point to stage point.
    pub fn point_to_stage(&self, p: Vec3) -> Vec3 {
        self.convert_vector(p) * self.runtime_to_stage_scale()
    }

    /// Stage point to runtime point.
    pub fn point_from_stage(&self, p: Vec3) -> Vec3 {
        self.convert_vector(p / self.runtime_to_stage_scale())
    }

    /// Runtime placement to stage placement.
    pub fn transform_to_stage(&self, t: &Transform) -> Transform {
        let mut converted = self.convert_axes(t);
        converted.translation *= self.runtime_to_stage_scale();
        converted
    }

    /// Stage placement to runtime placement.
    pub fn transform_from_stage(&self, t: &Transform) -> Transform {
        let mut unscaled = *t;
        unscaled.translation /= self.runtime_to_stage_scale();
        self.convert_axes(&unscaled)
    }

    /// Whether converting flips triangle winding. Both supported
    /// conventions are reflections of the runtime frame.
    pub fn flips_winding(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transform {
        Transform::new(
            Vec3::new(100.0, 200.0, 300.0),
            Quat::from_euler(glam::EulerRot::XYZ, 0.3, -0.7, 1.1),
            Vec3::new(1.0, 2.0, 3.0),
        )
    }

    #[test]
    fn test_z_up_negates_y_and_xz_rotation() {
        let axes = StageAxes::new(UpAxis::Z, 0.01);
        let t = sample();
        let c = axes.transform_to_stage(&t);
        assert!((c.translation - Vec3::new(100.0, -200.0, 300.0)).length() < 0.001);
        assert!((c.rotation.x + t.rotation.x).abs() < 1e-6);
        assert!((c.rotation.y - t.rotation.y).abs() < 1e-6);
        assert!((c.rotation.z + t.rotation.z).abs() < 1e-6);
        assert_eq!(c.scale, t.scale);
    }

    #[test]
    fn test_y_up_swaps_axes() {
        let axes = StageAxes::new(UpAxis::Y, 0.01);
        let c = axes.transform_to_stage(&sample());
        assert!((c.translation - Vec3::new(100.0, 300.0, 200.0)).length() < 0.001);
        assert!((c.scale - Vec3::new(1.0, 3.0, 2.0)).length() < 0.001);
    }

    #[test]
    fn test_conversion_round_trips() {
        for axes in [
            StageAxes::new(UpAxis::Z, 0.01),
            StageAxes::new(UpAxis::Y, 1.0),
            StageAxes::new(UpAxis::Z, 0.1),
        ] {
            let t = sample();
            let back = axes.transform_from_stage(&axes.transform_to_stage(&t));
            assert!(t.abs_diff_eq(&back, 0.001), "{:?}", axes);
        }
    }

    #[test]
    fn test_meters_rescale() {
        let axes = StageAxes::new(UpAxis::Z, 1.0);
        assert!((axes.runtime_to_stage_scale() - 0.01).abs() < 1e-7);
        let p = axes.point_to_stage(Vec3::new(100.0, 0.0, 50.0));
        assert!((p - Vec3::new(1.0, 0.0, 0.5)).length() < 0.0001);
        assert!((axes.point_from_stage(p) - Vec3::new(100.0, 0.0, 50.0)).length() < 0.001);
    }

    #[test]
    fn test_rotation_conversion_matches_reflected_matrix() {
        // Reflecting a rotation must equal M * R * M for the reflection M.
        for axes in [StageAxes::new(UpAxis::Z, 0.01), StageAxes::new(UpAxis::Y, 0.01)] {
            let q = sample().rotation;
            let v = Vec3::new(0.3, -1.2, 2.5);
            let expected = axes.convert_vector(q * axes.convert_vector(v));
            let actual = axes.convert_rotation(q) * v;
            assert!((expected - actual).length() < 0.001);
        }
    }
}
