//! Static mesh assets.

use usdx_math::Aabb;

use super::{GeometryError, GeometryResult, Mesh, MeshDescription};

/// A single-LOD static mesh asset.
#[derive(Clone, Debug)]
pub struct StaticMesh {
    /// Asset path, e.g. `/Game/Meshes/Cube.Cube`
    pub path: String,

    /// Source description of LOD 0
    pub description: MeshDescription,

    /// Material per polygon group, in group order
    pub materials: Vec<String>,

    /// Render data, present after `build`
    pub render: Option<Mesh>,

    pub bounds: Aabb,
}

impl StaticMesh {
    pub fn new(path: impl Into<String>, description: MeshDescription) -> Self {
        let materials = description
            .groups
            .iter()
            .map(|g| g.material.clone())
            .collect();
        Self {
            path: path.into(),
            description,
            materials,
            render: None,
            bounds: Aabb::empty(),
        }
    }

    /// Short name, the path segment after the last `/` and before any `.`.
    pub fn name(&self) -> &str {
        asset_name(&self.path)
    }

    /// Rebuild render data and bounds from the description.
    pub fn build(&mut self) -> GeometryResult<()> {
        if self.description.triangle_count() == 0 {
            return Err(GeometryError::EmptyMesh(self.path.clone()));
        }
        for triangle in &self.description.triangles {
            if triangle.group >= self.materials.len() {
                return Err(GeometryError::IndexOutOfRange {
                    index: triangle.group,
                    len: self.materials.len(),
                });
            }
        }

        let mut render = self.description.to_mesh();
        render.compute_normals();
        self.bounds = render.bounds;
        self.render = Some(render);

        log::debug!(
            "Built static mesh {} ({} triangles, {} materials)",
            self.path,
            self.description.triangle_count(),
            self.materials.len()
        );
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.render.is_some()
    }
}

/// Short name of an asset path.
pub fn asset_name(path: &str) -> &str {
    let tail = path.rsplit('/').next().unwrap_or(path);
    tail.split('.').next().unwrap_or(tail)
}
