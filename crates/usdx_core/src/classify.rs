//! Prim classification.
//!
//! Reads a prim's declared type and its tagging attributes and decides what
//! the walkers should do with it. Classification never fails: missing or
//! malformed attributes fall back to inert defaults, and references that do
//! not resolve are recorded so the walkers can report them.

use crate::document::{PrimId, Stage};
use crate::error::{ConversionError, ReferenceKind};
use crate::geometry::BrushOp;
use crate::registry::Registry;
use crate::schema::{attr, class, is_none_reference, method, prim_type, usage};

/// Structural role of a prim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Usage {
    Folder,
    Actor,
    Component,
    #[default]
    Data,
}

impl Usage {
    pub fn from_token(token: &str) -> Self {
        match token {
            usage::FOLDER => Usage::Folder,
            usage::ACTOR => Usage::Actor,
            usage::COMPONENT => Usage::Component,
            _ => Usage::Data,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Usage::Folder => usage::FOLDER,
            Usage::Actor => usage::ACTOR,
            Usage::Component => usage::COMPONENT,
            Usage::Data => usage::DATA,
        }
    }
}

/// What a prim converts to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    None,
    Folder,
    Scene,
    StaticMesh,
    SkeletalMesh,
    InstancedBatch,
    ScatterSystem,
    SolidGeometry,
}

/// Whether the walker creates, updates or skips the runtime object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConversionMethod {
    Spawn,
    Modify,
    #[default]
    Ignore,
}

impl ConversionMethod {
    pub fn from_token(token: &str) -> Self {
        match token {
            method::SPAWN => ConversionMethod::Spawn,
            method::IGNORE => ConversionMethod::Ignore,
            _ => ConversionMethod::Modify,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            ConversionMethod::Spawn => method::SPAWN,
            ConversionMethod::Modify => method::MODIFY,
            ConversionMethod::Ignore => method::IGNORE,
        }
    }
}

/// A reference attribute whose target is not registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub kind: ReferenceKind,
    pub path: String,
}

impl UnresolvedReference {
    pub fn to_error(&self) -> ConversionError {
        ConversionError::unresolved(self.kind, self.path.clone())
    }
}

/// Classification of one prim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrimInfo {
    pub usage: Usage,
    pub kind: NodeKind,
    pub method: ConversionMethod,

    /// Cross-run identity; empty when the prim does not author one
    pub instance_key: String,

    /// Resolved class path
    pub runtime_class: Option<String>,

    /// Resolved asset path
    pub asset: Option<String>,

    /// Resolved material path
    pub material: Option<String>,

    /// Folder authored on the prim itself
    pub folder_path: String,

    pub brush_op: BrushOp,
    pub unresolved: Vec<UnresolvedReference>,
}

impl PrimInfo {
    pub fn unresolved(&self, kind: ReferenceKind) -> Option<&UnresolvedReference> {
        self.unresolved.iter().find(|r| r.kind == kind)
    }

    pub fn is_foliage_actor(&self) -> bool {
        self.runtime_class.as_deref() == Some(class::INSTANCED_FOLIAGE_ACTOR)
    }
}

/// Classify `prim`, resolving its references against `registry`.
pub fn classify(stage: &Stage, prim: PrimId, registry: &Registry) -> PrimInfo {
    let mut info = PrimInfo::default();
    let text = |name: &str| {
        stage
            .get_str(prim, name)
            .filter(|v| !is_none_reference(v))
            .map(str::to_string)
    };

    if let Some(token) = stage.get_str(prim, attr::PRIM_USAGE) {
        info.usage = Usage::from_token(token);
    }
    if let Some(token) = stage.get_str(prim, attr::CONVERSION_METHOD) {
        info.method = ConversionMethod::from_token(token);
    }
    info.instance_key = text(attr::INSTANCE_REFERENCE).unwrap_or_default();
    info.folder_path = text(attr::ACTOR_FOLDER_PATH).unwrap_or_default();

    if let Some(path) = text(attr::CLASS_REFERENCE) {
        if registry.classes.resolve(&path).is_some() {
            info.runtime_class = Some(path);
        } else {
            info.unresolved.push(UnresolvedReference {
                kind: ReferenceKind::Class,
                path,
            });
        }
    }
    if let Some(path) = text(attr::ASSET_REFERENCE) {
        if registry.assets.has_asset(&path) {
            info.asset = Some(path);
        } else {
            info.unresolved.push(UnresolvedReference {
                kind: ReferenceKind::Asset,
                path,
            });
        }
    }
    if let Some(path) = text(attr::MATERIAL_REFERENCE) {
        if registry.assets.has_material(&path) {
            info.material = Some(path);
        } else {
            info.unresolved.push(UnresolvedReference {
                kind: ReferenceKind::Material,
                path,
            });
        }
    }

    let class_is = |path: &str| info.runtime_class.as_deref() == Some(path);
    info.kind = match stage.prim(prim).type_name.as_str() {
        prim_type::SCOPE if info.usage == Usage::Folder => NodeKind::Folder,
        prim_type::XFORM if class_is(class::HISM_COMPONENT) => NodeKind::InstancedBatch,
        prim_type::XFORM => NodeKind::Scene,
        prim_type::MESH => {
            if stage.get_str(prim, attr::PRIM_TYPE) == Some(prim_type::BSP) {
                info.brush_op = stage
                    .get_str(prim, attr::BSP_BRUSH_TYPE)
                    .map(BrushOp::from_token)
                    .unwrap_or_default();
                NodeKind::SolidGeometry
            } else {
                NodeKind::StaticMesh
            }
        }
        prim_type::SKEL_ROOT => NodeKind::SkeletalMesh,
        prim_type::POINT_INSTANCER if class_is(class::INSTANCED_FOLIAGE_ACTOR) => {
            NodeKind::ScatterSystem
        }
        _ => NodeKind::None,
    };

    info
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> Stage {
        let usda = r#"#usda 1.0

def Scope "Props"
{
    custom string unrealPrimUsage = "folder"
}

def Scope "Plain"
{
}

def Xform "Cube1"
{
    custom string unrealPrimUsage = "actor"
    custom string unrealConversionMethod = "spawn"
    custom string unrealInstanceReference = "Level.Cube1"
    custom string unrealClassReference = "/Script/Engine.StaticMeshActor"
}

def Xform "Batch"
{
    custom string unrealPrimUsage = "component"
    custom string unrealConversionMethod = "update"
    custom string unrealClassReference = "/Script/Engine.HierarchicalInstancedStaticMeshComponent"
}

def Mesh "Wall"
{
    custom string unrealPrimUsage = "weird"
    custom string unrealPrimType = "BSP"
    custom string unrealBSPBrushType = "subtract"
    custom string unrealMaterial = "/Game/Missing.Missing"
}

def Mesh "Floor"
{
    custom string unrealPrimType = "BSP"
    custom string unrealBSPBrushType = "sideways"
    custom string unrealAssetReference = "None"
}

def PointInstancer "Foliage"
{
    custom string unrealClassReference = "/Script/Foliage.InstancedFoliageActor"
}

def PointInstancer "Plants"
{
    custom string unrealClassReference = "/Script/Nope.Nope"
}
"#;
        Stage::from_usda("classify.usda", usda).unwrap()
    }

    fn info(stage: &Stage, path: &str) -> PrimInfo {
        classify(stage, stage.prim_at_path(path).unwrap(), &Registry::default())
    }

    #[test]
    fn test_folder_needs_usage() {
        let stage = stage();
        let props = info(&stage, "/Props");
        assert_eq!(props.kind, NodeKind::Folder);
        assert_eq!(props.usage, Usage::Folder);

        let plain = info(&stage, "/Plain");
        assert_eq!(plain.kind, NodeKind::None);
        assert_eq!(plain.usage, Usage::Data);
        assert_eq!(plain.method, ConversionMethod::Ignore);
    }

    #[test]
    fn test_actor_references() {
        let stage = stage();
        let cube = info(&stage, "/Cube1");
        assert_eq!(cube.kind, NodeKind::Scene);
        assert_eq!(cube.usage, Usage::Actor);
        assert_eq!(cube.method, ConversionMethod::Spawn);
        assert_eq!(cube.instance_key, "Level.Cube1");
        assert_eq!(cube.runtime_class.as_deref(), Some(class::STATIC_MESH_ACTOR));
        assert!(cube.unresolved.is_empty());
    }

    #[test]
    fn test_instanced_batch_upgrade() {
        let stage = stage();
        let batch = info(&stage, "/Batch");
        assert_eq!(batch.kind, NodeKind::InstancedBatch);
        assert_eq!(batch.method, ConversionMethod::Modify);
    }

    #[test]
    fn test_solid_geometry() {
        let stage = stage();
        let wall = info(&stage, "/Wall");
        assert_eq!(wall.kind, NodeKind::SolidGeometry);
        assert_eq!(wall.brush_op, BrushOp::Subtract);
        assert_eq!(wall.usage, Usage::Data);
        assert_eq!(
            wall.unresolved(ReferenceKind::Material).map(|r| r.path.as_str()),
            Some("/Game/Missing.Missing")
        );

        let floor = info(&stage, "/Floor");
        assert_eq!(floor.brush_op, BrushOp::Default);
        assert!(floor.asset.is_none());
        assert!(floor.unresolved.is_empty());
    }

    #[test]
    fn test_scatter_system_needs_class() {
        let stage = stage();
        let foliage = info(&stage, "/Foliage");
        assert_eq!(foliage.kind, NodeKind::ScatterSystem);
        assert!(foliage.is_foliage_actor());

        let plants = info(&stage, "/Plants");
        assert_eq!(plants.kind, NodeKind::None);
        assert!(plants.unresolved(ReferenceKind::Class).is_some());
    }
}
