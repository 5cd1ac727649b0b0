//! Typed attribute values and time codes.

use half::f16;
use usdx_math::{Mat4, Quat, Vec2, Vec3};

/// A half-precision quaternion, stored real part first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quath {
    pub w: f16,
    pub x: f16,
    pub y: f16,
    pub z: f16,
}

impl Quath {
    pub fn from_quat(q: Quat) -> Self {
        Self {
            w: f16::from_f32(q.w),
            x: f16::from_f32(q.x),
            y: f16::from_f32(q.y),
            z: f16::from_f32(q.z),
        }
    }

    /// Widen to single precision; the result is renormalized since half
    /// precision drifts off unit length.
    pub fn to_quat(self) -> Quat {
        let q = Quat::from_xyzw(self.x.to_f32(), self.y.to_f32(), self.z.to_f32(), self.w.to_f32());
        if q.length_squared() > 0.0 {
            q.normalize()
        } else {
            Quat::IDENTITY
        }
    }
}

/// An attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i32),
    Float(f64),
    String(String),
    Token(String),
    Vec3(Vec3),
    Quat(Quat),
    Matrix(Mat4),
    StringArray(Vec<String>),
    TokenArray(Vec<String>),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    Vec2Array(Vec<Vec2>),
    Vec3Array(Vec<Vec3>),
    QuatArray(Vec<Quat>),
    QuathArray(Vec<Quath>),
    MatrixArray(Vec<Mat4>),
}

impl AttrValue {
    /// Type name used when the attribute is created from this value.
    pub fn default_type_name(&self) -> &'static str {
        match self {
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "int",
            AttrValue::Float(_) => "double",
            AttrValue::String(_) => "string",
            AttrValue::Token(_) => "token",
            AttrValue::Vec3(_) => "double3",
            AttrValue::Quat(_) => "quatf",
            AttrValue::Matrix(_) => "matrix4d",
            AttrValue::StringArray(_) => "string[]",
            AttrValue::TokenArray(_) => "token[]",
            AttrValue::IntArray(_) => "int[]",
            AttrValue::FloatArray(_) => "float[]",
            AttrValue::Vec2Array(_) => "texCoord2f[]",
            AttrValue::Vec3Array(_) => "float3[]",
            AttrValue::QuatArray(_) => "quatf[]",
            AttrValue::QuathArray(_) => "quath[]",
            AttrValue::MatrixArray(_) => "matrix4d[]",
        }
    }

    /// String or token contents.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) | AttrValue::Token(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string_array(&self) -> Option<&[String]> {
        match self {
            AttrValue::StringArray(v) | AttrValue::TokenArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int_array(&self) -> Option<&[i32]> {
        match self {
            AttrValue::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec2_array(&self) -> Option<&[Vec2]> {
        match self {
            AttrValue::Vec2Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3_array(&self) -> Option<&[Vec3]> {
        match self {
            AttrValue::Vec3Array(v) => Some(v),
            _ => None,
        }
    }

    /// Orientation array at single precision, whichever precision was authored.
    pub fn to_quat_array(&self) -> Option<Vec<Quat>> {
        match self {
            AttrValue::QuatArray(v) => Some(v.clone()),
            AttrValue::QuathArray(v) => Some(v.iter().map(|q| q.to_quat()).collect()),
            _ => None,
        }
    }

    pub fn as_matrix_array(&self) -> Option<&[Mat4]> {
        match self {
            AttrValue::MatrixArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            AttrValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_quat(&self) -> Option<Quat> {
        match self {
            AttrValue::Quat(q) => Some(*q),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<Mat4> {
        match self {
            AttrValue::Matrix(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            AttrValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Time at which an attribute is read or written.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum TimeCode {
    /// The attribute's default (non-animated) value.
    #[default]
    Default,
    /// A time sample.
    At(f64),
}

impl TimeCode {
    /// Time code from the float convention used by scripting callers, where
    /// `f32::MAX` means "unset".
    pub fn from_sentinel(time: f32) -> Self {
        if time == f32::MAX {
            TimeCode::Default
        } else {
            TimeCode::At(time as f64)
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, TimeCode::Default)
    }
}

impl From<f64> for TimeCode {
    fn from(time: f64) -> Self {
        TimeCode::At(time)
    }
}

impl From<Option<f64>> for TimeCode {
    fn from(time: Option<f64>) -> Self {
        time.map_or(TimeCode::Default, TimeCode::At)
    }
}
