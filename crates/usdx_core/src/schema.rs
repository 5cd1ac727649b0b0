//! Attribute and token vocabulary used to tag document prims.
//!
//! Every spelling here is part of the on-disk format: documents written by an
//! earlier version must keep importing, so these strings never change.

/// Custom attribute names.
pub mod attr {
    pub const PRIM_TYPE: &str = "unrealPrimType";
    pub const PRIM_USAGE: &str = "unrealPrimUsage";
    pub const CONVERSION_METHOD: &str = "unrealConversionMethod";
    pub const INSTANCE_REFERENCE: &str = "unrealInstanceReference";
    pub const CLASS_REFERENCE: &str = "unrealClassReference";
    pub const ASSET_REFERENCE: &str = "unrealAssetReference";
    pub const MATERIAL_REFERENCE: &str = "unrealMaterial";
    pub const ACTOR_FOLDER_PATH: &str = "unrealActorFolderPath";
    pub const BSP_BRUSH_TYPE: &str = "unrealBSPBrushType";
    pub const BASE_COMPONENT_REFERENCES: &str = "unrealBaseComponentReferences";
    pub const BASE_COMPONENT_INDICES: &str = "unrealBaseComponentIndices";
}

/// Declared prim type tokens.
pub mod prim_type {
    pub const SCOPE: &str = "Scope";
    pub const XFORM: &str = "Xform";
    pub const MESH: &str = "Mesh";
    pub const SKEL_ROOT: &str = "SkelRoot";
    pub const POINT_INSTANCER: &str = "PointInstancer";
    pub const GEOM_SUBSET: &str = "GeomSubset";
    /// Secondary type written to `unrealPrimType` on solid geometry.
    pub const BSP: &str = "BSP";
}

/// Values of `unrealPrimUsage`.
pub mod usage {
    pub const FOLDER: &str = "folder";
    pub const ACTOR: &str = "actor";
    pub const COMPONENT: &str = "component";
    pub const DATA: &str = "data";
}

/// Values of `unrealConversionMethod`.
pub mod method {
    pub const SPAWN: &str = "spawn";
    pub const MODIFY: &str = "modify";
    pub const IGNORE: &str = "ignore";
}

/// Values of `unrealBSPBrushType`.
pub mod brush_type {
    pub const ADD: &str = "add";
    pub const SUBTRACT: &str = "subtract";
    pub const DEFAULT: &str = "default";
    pub const MAX: &str = "max";
}

/// Values of the standard `visibility` attribute.
pub mod visibility {
    pub const INHERITED: &str = "inherited";
    pub const INVISIBLE: &str = "invisible";
}

/// Fixed child prim names.
pub mod child {
    /// Point instancer nested under an instanced batch prim.
    pub const HISM_INSTANCE: &str = "HISMInstance";
    /// Grouping of prototype meshes under a point instancer.
    pub const PROTOTYPES: &str = "Prototypes";
}

/// Standard geometry attribute names the codecs read and write.
pub mod geom {
    pub const POINTS: &str = "points";
    pub const FACE_VERTEX_COUNTS: &str = "faceVertexCounts";
    pub const FACE_VERTEX_INDICES: &str = "faceVertexIndices";
    pub const ST: &str = "primvars:st";
    pub const VISIBILITY: &str = "visibility";
    pub const SUBSET_INDICES: &str = "indices";
    pub const SUBSET_ELEMENT_TYPE: &str = "elementType";
    pub const SUBSET_FAMILY_NAME: &str = "familyName";
    pub const MATERIAL_BIND_FAMILY: &str = "materialBind";

    pub const PROTO_INDICES: &str = "protoIndices";
    pub const POSITIONS: &str = "positions";
    pub const ORIENTATIONS: &str = "orientations";
    pub const SCALES: &str = "scales";
    pub const PROTOTYPES_REL: &str = "prototypes";

    pub const XFORM_OP_ORDER: &str = "xformOpOrder";
    pub const XFORM_TRANSLATE: &str = "xformOp:translate";
    pub const XFORM_ORIENT: &str = "xformOp:orient";
    pub const XFORM_SCALE: &str = "xformOp:scale";
}

/// Reference value meaning "no reference".
pub const NONE_REFERENCE: &str = "None";

/// Runtime class paths the walkers treat specially.
pub mod class {
    pub const ACTOR: &str = "/Script/Engine.Actor";
    pub const STATIC_MESH_ACTOR: &str = "/Script/Engine.StaticMeshActor";
    pub const SKELETAL_MESH_ACTOR: &str = "/Script/Engine.SkeletalMeshActor";
    pub const BRUSH: &str = "/Script/Engine.Brush";
    pub const LANDSCAPE: &str = "/Script/Landscape.Landscape";
    pub const INSTANCED_FOLIAGE_ACTOR: &str = "/Script/Foliage.InstancedFoliageActor";

    pub const SCENE_COMPONENT: &str = "/Script/Engine.SceneComponent";
    pub const STATIC_MESH_COMPONENT: &str = "/Script/Engine.StaticMeshComponent";
    pub const SKELETAL_MESH_COMPONENT: &str = "/Script/Engine.SkeletalMeshComponent";
    pub const HISM_COMPONENT: &str = "/Script/Engine.HierarchicalInstancedStaticMeshComponent";
    pub const BRUSH_COMPONENT: &str = "/Script/Engine.BrushComponent";
    pub const LANDSCAPE_COMPONENT: &str = "/Script/Landscape.LandscapeComponent";
}

/// Material used for solid-geometry polygons without one.
pub const DEFAULT_MATERIAL: &str = "/Engine/EngineMaterials/WorldGridMaterial.WorldGridMaterial";

/// True when a reference attribute value names nothing.
pub fn is_none_reference(value: &str) -> bool {
    value.is_empty() || value == NONE_REFERENCE
}
