//! Geometry codecs.
//!
//! - `Mesh`: renderable triangle data built from a mesh description
//! - `MeshDescription`: indexed triangles with per-corner UVs and material groups
//! - `StaticMesh`: a single-LOD mesh asset
//! - `brush`: planar-polygon solids and their polygon merge
//! - `brush_mesh`: solid ⇄ mesh description conversion
//! - `geom_mesh`: mesh description ⇄ document `Mesh` prims
//! - `instancing`: instanced batch ⇄ point instancer
//! - `foliage`: scatter instances ⇄ point instancer with base-surface indices

pub mod brush;
pub mod brush_mesh;
mod description;
pub mod foliage;
pub mod geom_mesh;
pub mod instancing;
mod mesh;
mod static_mesh;

use thiserror::Error;

pub use brush::{BrushOp, Model, Poly};
pub use description::{Corner, MeshDescription, PolygonGroup, Triangle};
pub use mesh::Mesh;
pub use static_mesh::{asset_name, StaticMesh};

/// Errors raised by the geometry codecs.
#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("Degenerate polygon {0}")]
    DegeneratePolygon(usize),

    #[error("Mesh has no triangles: {0}")]
    EmptyMesh(String),

    #[error("Index {index} out of range ({len} elements)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result type for geometry operations.
pub type GeometryResult<T> = Result<T, GeometryError>;
