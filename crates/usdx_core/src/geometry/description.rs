//! Editable mesh description: shared vertices, per-corner UVs, polygon groups.

use indexmap::IndexSet;
use usdx_math::{vertices_equal, Aabb, Vec2, Vec3};

use super::{GeometryError, GeometryResult, Mesh};

/// One corner of a triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Corner {
    /// Index into `MeshDescription::vertices`
    pub vertex: usize,
    pub uv: Vec2,
}

impl Corner {
    pub fn new(vertex: usize, uv: Vec2) -> Self {
        Self { vertex, uv }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub corners: [Corner; 3],
    /// Index into `MeshDescription::groups`
    pub group: usize,
}

/// Triangles sharing one material slot.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonGroup {
    pub material: String,
}

#[derive(Clone, Debug, Default)]
pub struct MeshDescription {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<Triangle>,
    pub groups: Vec<PolygonGroup>,
    hard_edges: IndexSet<(usize, usize)>,
}

impl MeshDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn add_vertex(&mut self, position: Vec3) -> usize {
        self.vertices.push(position);
        self.vertices.len() - 1
    }

    /// Reuse a vertex coincident with `position` (per-axis tolerance) or add one.
    pub fn find_or_add_vertex(&mut self, position: Vec3) -> usize {
        match self
            .vertices
            .iter()
            .position(|&v| vertices_equal(v, position))
        {
            Some(existing) => existing,
            None => self.add_vertex(position),
        }
    }

    /// Group for `material`, created on first use.
    pub fn group_for_material(&mut self, material: &str) -> usize {
        match self.groups.iter().position(|g| g.material == material) {
            Some(existing) => existing,
            None => {
                self.groups.push(PolygonGroup {
                    material: material.to_string(),
                });
                self.groups.len() - 1
            }
        }
    }

    pub fn add_triangle(&mut self, corners: [Corner; 3], group: usize) -> GeometryResult<usize> {
        for corner in &corners {
            if corner.vertex >= self.vertices.len() {
                return Err(GeometryError::IndexOutOfRange {
                    index: corner.vertex,
                    len: self.vertices.len(),
                });
            }
        }
        if group >= self.groups.len() {
            return Err(GeometryError::IndexOutOfRange {
                index: group,
                len: self.groups.len(),
            });
        }

        self.triangles.push(Triangle { corners, group });
        Ok(self.triangles.len() - 1)
    }

    pub fn set_edge_hard(&mut self, a: usize, b: usize) {
        self.hard_edges.insert(edge_key(a, b));
    }

    pub fn is_edge_hard(&self, a: usize, b: usize) -> bool {
        self.hard_edges.contains(&edge_key(a, b))
    }

    pub fn hard_edge_count(&self) -> usize {
        self.hard_edges.len()
    }

    pub fn triangle_positions(&self, index: usize) -> [Vec3; 3] {
        let corners = &self.triangles[index].corners;
        [
            self.vertices[corners[0].vertex],
            self.vertices[corners[1].vertex],
            self.vertices[corners[2].vertex],
        ]
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::enclosing(&self.vertices)
    }

    /// Flatten into a renderable mesh, one vertex per triangle corner.
    pub fn to_mesh(&self) -> Mesh {
        let mut positions = Vec::with_capacity(self.triangles.len() * 3);
        let mut uvs = Vec::with_capacity(positions.capacity());
        for triangle in &self.triangles {
            for corner in &triangle.corners {
                positions.push(self.vertices[corner.vertex]);
                uvs.push(corner.uv);
            }
        }
        let indices = (0..positions.len() as u32).collect();
        Mesh::with_uvs(positions, indices, uvs)
    }
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}
