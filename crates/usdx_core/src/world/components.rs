//! Component kinds and their per-kind data.

use usdx_math::{Aabb, Interval, Mat4Ext, Ray, Transform, Vec3};

use super::cluster_tree::ClusterTree;
use crate::geometry::{BrushOp, Mesh, Model, StaticMesh};
use crate::schema::prim_type;

/// Closed set of component kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Scene,
    StaticMesh,
    SkeletalMesh,
    InstancedBatch,
    Brush,
    Landscape,
}

impl ComponentKind {
    /// Renders a static mesh asset.
    pub fn uses_static_mesh(self) -> bool {
        matches!(self, ComponentKind::StaticMesh | ComponentKind::InstancedBatch)
    }

    /// Carries geometry that the codecs convert.
    pub fn supports_geometry_conversion(self) -> bool {
        matches!(self, ComponentKind::Brush | ComponentKind::InstancedBatch)
    }

    /// Can be hit by surface traces.
    pub fn is_traceable_surface(self) -> bool {
        matches!(self, ComponentKind::Landscape)
    }

    /// Document prim type written for this kind.
    pub fn prim_type(self) -> &'static str {
        match self {
            ComponentKind::StaticMesh | ComponentKind::Brush => prim_type::MESH,
            ComponentKind::SkeletalMesh => prim_type::SKEL_ROOT,
            ComponentKind::Scene | ComponentKind::InstancedBatch | ComponentKind::Landscape => {
                prim_type::XFORM
            }
        }
    }
}

/// Mesh asset and material overrides of a mesh component.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshSlot {
    pub mesh: Option<String>,
    pub materials: Vec<Option<String>>,
}

impl MeshSlot {
    pub fn material(&self, slot: usize) -> Option<&str> {
        self.materials.get(slot).and_then(|m| m.as_deref())
    }

    pub fn set_material(&mut self, slot: usize, material: Option<String>) {
        if self.materials.len() <= slot {
            self.materials.resize(slot + 1, None);
        }
        self.materials[slot] = material;
    }
}

/// Many copies of one mesh, each with its own transform relative to the
/// component.
#[derive(Clone, Debug, Default)]
pub struct InstancedBatch {
    pub slot: MeshSlot,
    instances: Vec<Transform>,
    tree: Option<ClusterTree>,
}

impl InstancedBatch {
    pub fn instances(&self) -> &[Transform] {
        &self.instances
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn add_instance(&mut self, transform: Transform) -> usize {
        self.instances.push(transform);
        self.tree = None;
        self.instances.len() - 1
    }

    pub fn clear_instances(&mut self) {
        self.instances.clear();
        self.tree = None;
    }

    /// Rebuild the instance tree from the prototype's local bounds.
    pub fn build_tree(&mut self, mesh_bounds: &Aabb) {
        let local = if mesh_bounds.is_empty() {
            Aabb::from_points(Vec3::ZERO, Vec3::ZERO)
        } else {
            *mesh_bounds
        };
        let bounds: Vec<Aabb> = self
            .instances
            .iter()
            .map(|t| t.to_matrix().transform_aabb(&local))
            .collect();
        self.tree = Some(ClusterTree::build(&bounds));
    }

    pub fn tree(&self) -> Option<&ClusterTree> {
        self.tree.as_ref()
    }

    pub fn is_tree_outdated(&self) -> bool {
        self.tree.is_none()
    }
}

/// A brush's polygons and its contribution to level geometry.
#[derive(Clone, Debug, Default)]
pub struct BrushData {
    pub model: Model,
    pub op: BrushOp,

    /// Renderable mesh built from the model by `World::build_geometry`
    pub render: Option<StaticMesh>,
}

/// A traceable ground surface in component space.
#[derive(Clone, Debug, Default)]
pub struct LandscapeData {
    surface: Mesh,
    tree: ClusterTree,
}

impl LandscapeData {
    pub fn new(surface: Mesh) -> Self {
        let bounds: Vec<Aabb> = surface
            .extract_triangle_vertices()
            .iter()
            .map(|tri| Aabb::enclosing(tri.iter()))
            .collect();
        Self {
            tree: ClusterTree::build(&bounds),
            surface,
        }
    }

    pub fn surface(&self) -> &Mesh {
        &self.surface
    }

    /// Nearest ray parameter in `ray_t` at which the surface is hit.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<f32> {
        let triangles = self.surface.extract_triangle_vertices();
        self.tree
            .query_ray(ray, ray_t)
            .into_iter()
            .filter_map(|i| triangles.get(i))
            .filter_map(|[a, b, c]| ray.intersect_triangle(*a, *b, *c, ray_t))
            .map(|hit| hit.t)
            .min_by(f32::total_cmp)
    }
}

/// Per-kind component state.
#[derive(Clone, Debug)]
pub enum ComponentData {
    Scene,
    StaticMesh(MeshSlot),
    SkeletalMesh(MeshSlot),
    InstancedBatch(InstancedBatch),
    Brush(BrushData),
    Landscape(LandscapeData),
}

impl ComponentData {
    pub fn new(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Scene => ComponentData::Scene,
            ComponentKind::StaticMesh => ComponentData::StaticMesh(MeshSlot::default()),
            ComponentKind::SkeletalMesh => ComponentData::SkeletalMesh(MeshSlot::default()),
            ComponentKind::InstancedBatch => {
                ComponentData::InstancedBatch(InstancedBatch::default())
            }
            ComponentKind::Brush => ComponentData::Brush(BrushData::default()),
            ComponentKind::Landscape => ComponentData::Landscape(LandscapeData::default()),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentData::Scene => ComponentKind::Scene,
            ComponentData::StaticMesh(_) => ComponentKind::StaticMesh,
            ComponentData::SkeletalMesh(_) => ComponentKind::SkeletalMesh,
            ComponentData::InstancedBatch(_) => ComponentKind::InstancedBatch,
            ComponentData::Brush(_) => ComponentKind::Brush,
            ComponentData::Landscape(_) => ComponentKind::Landscape,
        }
    }

    /// Mesh asset slot for kinds that render a mesh.
    pub fn mesh_slot(&self) -> Option<&MeshSlot> {
        match self {
            ComponentData::StaticMesh(slot) | ComponentData::SkeletalMesh(slot) => Some(slot),
            ComponentData::InstancedBatch(batch) => Some(&batch.slot),
            _ => None,
        }
    }

    pub fn mesh_slot_mut(&mut self) -> Option<&mut MeshSlot> {
        match self {
            ComponentData::StaticMesh(slot) | ComponentData::SkeletalMesh(slot) => Some(slot),
            ComponentData::InstancedBatch(batch) => Some(&mut batch.slot),
            _ => None,
        }
    }
}
