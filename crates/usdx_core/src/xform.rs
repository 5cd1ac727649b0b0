//! Transform operations on document prims.
//!
//! A prim's local transform is the product of the ops listed in its
//! `xformOpOrder`, applied right to left to column vectors. Reading converts
//! the stage's axis and unit convention into the runtime's; writing does the
//! reverse and always authors a translate / orient / scale stack.

use usdx_math::{Mat4, Quat, StageAxes, Transform, Vec3};

use crate::document::{AttrValue, PrimId, Stage, TimeCode};
use crate::schema::geom;

const INVERT_PREFIX: &str = "!invert!";
const RESET_XFORM_STACK: &str = "!resetXformStack!";

/// Transform operation types found in xformOps.
#[derive(Clone, Debug, PartialEq)]
pub enum XformOp {
    /// Translation (xformOp:translate)
    Translate(Vec3),

    /// Rotation in degrees around X axis
    RotateX(f32),

    /// Rotation in degrees around Y axis
    RotateY(f32),

    /// Rotation in degrees around Z axis
    RotateZ(f32),

    /// Euler rotation in degrees, X applied first
    RotateXYZ(Vec3),

    /// Quaternion rotation (xformOp:orient)
    Orient(Quat),

    /// Scale (uniform or non-uniform)
    Scale(Vec3),

    /// Full 4x4 transform matrix
    Transform(Mat4),
}

impl XformOp {
    /// Interpret an authored op attribute. `name` may carry a `:suffix`.
    pub fn from_attribute(name: &str, value: &AttrValue) -> Option<Self> {
        let op = name.strip_prefix("xformOp:")?;
        let kind = op.split(':').next().unwrap_or(op);
        let scalar = || value.as_float().map(|f| f as f32);

        match kind {
            "translate" => value.as_vec3().map(XformOp::Translate),
            "rotateX" => scalar().map(XformOp::RotateX),
            "rotateY" => scalar().map(XformOp::RotateY),
            "rotateZ" => scalar().map(XformOp::RotateZ),
            "rotateXYZ" => value.as_vec3().map(XformOp::RotateXYZ),
            "orient" => value.as_quat().map(XformOp::Orient),
            "scale" => value
                .as_vec3()
                .or_else(|| scalar().map(Vec3::splat))
                .map(XformOp::Scale),
            "transform" => value.as_matrix().map(XformOp::Transform),
            _ => None,
        }
    }

    /// Convert this operation to a transformation matrix.
    pub fn to_matrix(&self) -> Mat4 {
        match self {
            XformOp::Translate(t) => Mat4::from_translation(*t),
            XformOp::RotateX(deg) => Mat4::from_rotation_x(deg.to_radians()),
            XformOp::RotateY(deg) => Mat4::from_rotation_y(deg.to_radians()),
            XformOp::RotateZ(deg) => Mat4::from_rotation_z(deg.to_radians()),
            XformOp::RotateXYZ(euler) => {
                Mat4::from_rotation_z(euler.z.to_radians())
                    * Mat4::from_rotation_y(euler.y.to_radians())
                    * Mat4::from_rotation_x(euler.x.to_radians())
            }
            XformOp::Orient(q) => Mat4::from_quat(q.normalize()),
            XformOp::Scale(s) => Mat4::from_scale(*s),
            XformOp::Transform(m) => *m,
        }
    }
}

/// Combine a list of xformOps into a single matrix.
pub fn compose_xform_ops(ops: &[XformOp]) -> Mat4 {
    ops.iter()
        .fold(Mat4::IDENTITY, |result, op| result * op.to_matrix())
}

/// Local matrix of a prim in stage space, or `None` when it authors no ops.
pub fn local_matrix(stage: &Stage, prim: PrimId, time: TimeCode) -> Option<Mat4> {
    let order: Vec<String> = match stage
        .get(prim, geom::XFORM_OP_ORDER, TimeCode::Default)
        .and_then(AttrValue::as_string_array)
    {
        Some(order) => order.to_vec(),
        None => stage
            .prim(prim)
            .attributes
            .keys()
            .filter(|name| name.starts_with("xformOp:"))
            .cloned()
            .collect(),
    };
    if order.is_empty() {
        return None;
    }

    let mut ops = Vec::with_capacity(order.len());
    for entry in &order {
        if entry == RESET_XFORM_STACK {
            ops.clear();
            continue;
        }
        let (name, invert) = match entry.strip_prefix(INVERT_PREFIX) {
            Some(name) => (name, true),
            None => (entry.as_str(), false),
        };
        let op = stage
            .get(prim, name, time)
            .and_then(|value| XformOp::from_attribute(name, value));
        match op {
            Some(op) if invert => ops.push(XformOp::Transform(op.to_matrix().inverse())),
            Some(op) => ops.push(op),
            None => log::warn!("Ignoring unreadable op {} on {}", entry, stage.prim(prim).path),
        }
    }
    Some(compose_xform_ops(&ops))
}

/// Local transform of a prim in runtime space.
pub fn read_local_transform(stage: &Stage, prim: PrimId, time: TimeCode) -> Option<Transform> {
    let matrix = local_matrix(stage, prim, time)?;
    Some(stage.axes().transform_from_stage(&Transform::from_matrix(matrix)))
}

/// Author a runtime-space transform as translate / orient / scale ops.
pub fn write_local_transform(
    stage: &mut Stage,
    prim: PrimId,
    transform: &Transform,
    axes: StageAxes,
    time: TimeCode,
) {
    let converted = axes.transform_to_stage(transform);

    stage.set_typed(
        prim,
        geom::XFORM_TRANSLATE,
        "double3",
        AttrValue::Vec3(converted.translation),
        time,
        false,
    );
    stage.set_typed(
        prim,
        geom::XFORM_ORIENT,
        "quatf",
        AttrValue::Quat(converted.rotation),
        time,
        false,
    );
    stage.set_typed(
        prim,
        geom::XFORM_SCALE,
        "float3",
        AttrValue::Vec3(converted.scale),
        time,
        false,
    );

    let order = vec![
        geom::XFORM_TRANSLATE.to_string(),
        geom::XFORM_ORIENT.to_string(),
        geom::XFORM_SCALE.to_string(),
    ];
    stage.set_typed(
        prim,
        geom::XFORM_OP_ORDER,
        "token[]",
        AttrValue::TokenArray(order),
        TimeCode::Default,
        false,
    );
    if let Some(attr) = stage.attribute_mut(prim, geom::XFORM_OP_ORDER) {
        attr.uniform = true;
    }
}
