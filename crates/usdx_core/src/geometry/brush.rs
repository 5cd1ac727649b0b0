//! Solid geometry made of planar convex polygons.

use usdx_math::{
    point_plane_distance, Aabb, Vec3, COPLANAR_NORMAL_DOT, COPLANAR_PLANE_DISTANCE,
    SMALL_NUMBER,
};

use super::{GeometryError, GeometryResult};
use crate::schema::brush_type;

/// World units per texture repeat.
pub const TEXEL_SCALE: f32 = 100.0;

/// Texture basis vectors closer than this are considered identical.
const TEXTURE_BASIS_TOLERANCE: f32 = 1.0e-3;

/// How a brush contributes to level geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BrushOp {
    Add,
    Subtract,
    #[default]
    Default,
    Max,
}

impl BrushOp {
    pub fn token(self) -> &'static str {
        match self {
            BrushOp::Add => brush_type::ADD,
            BrushOp::Subtract => brush_type::SUBTRACT,
            BrushOp::Default => brush_type::DEFAULT,
            BrushOp::Max => brush_type::MAX,
        }
    }

    /// Unrecognized tokens read as `Default`.
    pub fn from_token(token: &str) -> Self {
        match token {
            brush_type::ADD => BrushOp::Add,
            brush_type::SUBTRACT => BrushOp::Subtract,
            brush_type::MAX => BrushOp::Max,
            _ => BrushOp::Default,
        }
    }
}

/// A planar convex polygon.
#[derive(Clone, Debug, PartialEq)]
pub struct Poly {
    pub vertices: Vec<Vec3>,

    /// Texture origin
    pub base: Vec3,

    pub normal: Vec3,
    pub texture_u: Vec3,
    pub texture_v: Vec3,

    /// Material path, `None` for the default material
    pub material: Option<String>,

    pub flags: u32,

    /// Index of the first polygon of this polygon's merged face
    pub link: usize,
}

impl Poly {
    pub fn new(vertices: Vec<Vec3>, material: Option<String>) -> Self {
        let base = vertices.first().copied().unwrap_or(Vec3::ZERO);
        Self {
            vertices,
            base,
            normal: Vec3::ZERO,
            texture_u: Vec3::ZERO,
            texture_v: Vec3::ZERO,
            material,
            flags: 0,
            link: 0,
        }
    }

    pub fn with_texture(mut self, base: Vec3, texture_u: Vec3, texture_v: Vec3) -> Self {
        self.base = base;
        self.texture_u = texture_u;
        self.texture_v = texture_v;
        self
    }

    /// Compute the normal and fill a missing texture basis.
    ///
    /// `index` only labels the error.
    pub fn finalize(&mut self, index: usize) -> GeometryResult<()> {
        if self.vertices.len() < 3 {
            return Err(GeometryError::DegeneratePolygon(index));
        }

        let v0 = self.vertices[0];
        let mut sum = Vec3::ZERO;
        for i in 2..self.vertices.len() {
            sum += (self.vertices[i - 1] - v0).cross(self.vertices[i] - v0);
        }
        if sum.length_squared() < SMALL_NUMBER {
            return Err(GeometryError::DegeneratePolygon(index));
        }
        self.normal = sum.normalize();

        if self.texture_u.length_squared() < SMALL_NUMBER
            || self.texture_v.length_squared() < SMALL_NUMBER
        {
            let (u, v) = self.normal.any_orthonormal_pair();
            self.texture_u = u;
            self.texture_v = v;
        }
        Ok(())
    }

    /// Signed distance of `point` from this polygon's plane.
    pub fn plane_distance(&self, point: Vec3) -> f32 {
        point_plane_distance(point, self.vertices[0], self.normal)
    }

    /// Whether `other` can be merged into the same face as `self`.
    pub fn can_merge_with(&self, other: &Poly) -> bool {
        self.material == other.material
            && self.flags == other.flags
            && self
                .texture_u
                .abs_diff_eq(other.texture_u, TEXTURE_BASIS_TOLERANCE)
            && self
                .texture_v
                .abs_diff_eq(other.texture_v, TEXTURE_BASIS_TOLERANCE)
            && self.normal.dot(other.normal) > COPLANAR_NORMAL_DOT
            && other
                .vertices
                .first()
                .map(|&p| self.plane_distance(p).abs() <= COPLANAR_PLANE_DISTANCE)
                .unwrap_or(false)
    }
}

/// A brush's polygon soup with merge links and bounds.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub polys: Vec<Poly>,
    pub bounds: Aabb,
}

impl Model {
    pub fn new(polys: Vec<Poly>) -> Self {
        let mut model = Self {
            polys,
            bounds: Aabb::empty(),
        };
        model.build_bound();
        model
    }

    /// Axis-aligned box brush centred on the origin.
    pub fn cube(half_extent: f32, material: Option<String>) -> GeometryResult<Self> {
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut polys = Vec::with_capacity(faces.len());
        for (index, (normal, u, v)) in faces.into_iter().enumerate() {
            let center = normal * half_extent;
            let vertices = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
                .iter()
                .map(|&(a, b)| center + (u * a + v * b) * half_extent)
                .collect();
            let mut poly = Poly::new(vertices, material.clone()).with_texture(center, u, v);
            poly.finalize(index)?;
            polys.push(poly);
        }

        let mut model = Self::new(polys);
        model.validate_brush();
        Ok(model)
    }

    pub fn clear(&mut self) {
        self.polys.clear();
        self.bounds = Aabb::empty();
    }

    /// Link polygons that belong to the same face.
    ///
    /// Each polygon links to the lowest-indexed compatible polygon that is
    /// itself a face leader.
    pub fn validate_brush(&mut self) {
        for (i, poly) in self.polys.iter_mut().enumerate() {
            poly.link = i;
        }

        for i in 0..self.polys.len() {
            if self.polys[i].link != i {
                continue;
            }
            for j in (i + 1)..self.polys.len() {
                if self.polys[j].link == j && self.polys[i].can_merge_with(&self.polys[j]) {
                    self.polys[j].link = i;
                }
            }
        }
    }

    pub fn build_bound(&mut self) {
        self.bounds = Aabb::enclosing(self.polys.iter().flat_map(|p| p.vertices.iter()));
    }

    /// Polygon indices grouped by merged face, in leader order.
    pub fn faces(&self) -> Vec<Vec<usize>> {
        let mut faces: Vec<(usize, Vec<usize>)> = Vec::new();
        for (i, poly) in self.polys.iter().enumerate() {
            match faces.iter_mut().find(|(leader, _)| *leader == poly.link) {
                Some((_, members)) => members.push(i),
                None => faces.push((poly.link, vec![i])),
            }
        }
        faces.into_iter().map(|(_, members)| members).collect()
    }

    pub fn merged_face_count(&self) -> usize {
        self.polys
            .iter()
            .enumerate()
            .filter(|(i, p)| p.link == *i)
            .count()
    }
}
