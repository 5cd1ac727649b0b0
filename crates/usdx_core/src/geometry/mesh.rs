//! Renderable triangle mesh.
//!
//! Flat vertex and index buffers as produced by `StaticMesh::build` and used
//! by landscape surfaces for line traces.

use usdx_math::{Aabb, Vec2, Vec3};

/// A mesh consisting of vertex positions, normals, UVs and triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional, see `compute_normals`)
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional, one per vertex)
    pub uvs: Option<Vec<Vec2>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl Mesh {
    /// Create a new mesh from positions and indices.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::enclosing(&positions);
        Self {
            positions,
            normals: None,
            uvs: None,
            indices,
            bounds,
        }
    }

    /// Create a new mesh with UV coordinates.
    pub fn with_uvs(positions: Vec<Vec3>, indices: Vec<u32>, uvs: Vec<Vec2>) -> Self {
        Self {
            uvs: Some(uvs),
            ..Self::new(positions, indices)
        }
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Triangles are wound clockwise when viewed from the front, so the face
    /// normal is `edge2 x edge1`.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for [p0, p1, p2, ..] in self.triangles_indexed() {
            let (i0, i1, i2) = (p0 as usize, p1 as usize, p2 as usize);
            let edge1 = self.positions[i1] - self.positions[i0];
            let edge2 = self.positions[i2] - self.positions[i0];
            let face_normal = edge2.cross(edge1);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Z);
        }

        self.normals = Some(normals);
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Triangles with in-range indices; malformed ones are skipped.
    fn triangles_indexed(&self) -> impl Iterator<Item = [u32; 4]> + '_ {
        let count = self.positions.len();
        self.indices.chunks_exact(3).filter_map(move |chunk| {
            if chunk.iter().any(|&i| i as usize >= count) {
                log::warn!(
                    "Invalid triangle indices: {:?}, vertex count: {}",
                    chunk,
                    count
                );
                return None;
            }
            Some([chunk[0], chunk[1], chunk[2], 0])
        })
    }

    /// Extract triangle vertices as `[v0, v1, v2]` triplets.
    pub fn extract_triangle_vertices(&self) -> Vec<[Vec3; 3]> {
        self.triangles_indexed()
            .map(|[i0, i1, i2, _]| {
                [
                    self.positions[i0 as usize],
                    self.positions[i1 as usize],
                    self.positions[i2 as usize],
                ]
            })
            .collect()
    }

    /// Flat grid in the XY plane, `cells` quads per side, facing +Z.
    pub fn grid(origin: Vec3, size: f32, cells: u32) -> Self {
        let cells = cells.max(1);
        let step = size / cells as f32;
        let row = cells + 1;

        let mut positions = Vec::with_capacity((row * row) as usize);
        let mut uvs = Vec::with_capacity(positions.capacity());
        for y in 0..row {
            for x in 0..row {
                positions.push(origin + Vec3::new(x as f32 * step, y as f32 * step, 0.0));
                uvs.push(Vec2::new(x as f32 / cells as f32, y as f32 / cells as f32));
            }
        }

        let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
        for y in 0..cells {
            for x in 0..cells {
                let i = y * row + x;
                indices.extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
            }
        }

        Self::with_uvs(positions, indices, uvs)
    }
}
