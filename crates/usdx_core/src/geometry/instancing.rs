//! Instanced batches as point instancers.
//!
//! A batch component's prim gets an `HISMInstance` point-instancer child
//! whose `Prototypes` scope holds one mesh prim per source asset. Instance
//! placements are relative to the batch and written as the standard
//! instancer arrays.

use usdx_math::{Mat4, Quat, StageAxes, Transform, Vec3};

use super::geom_mesh::write_mesh_description;
use super::asset_name;
use crate::document::{make_valid_identifier, AttrValue, PrimId, Quath, Stage, TimeCode};
use crate::error::{ConversionError, ConversionResult, ReferenceKind};
use crate::registry::Registry;
use crate::schema::{attr, child, geom, is_none_reference, prim_type, NONE_REFERENCE};
use crate::world::InstancedBatch;

/// One instance read back from a point instancer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstancerSample {
    pub proto_index: i32,

    /// Placement in runtime space
    pub transform: Transform,
}

/// Instance matrices of a point instancer in stage space.
pub fn compute_instance_matrices(
    stage: &Stage,
    instancer: PrimId,
    time: TimeCode,
) -> ConversionResult<Vec<Mat4>> {
    let positions = stage
        .get(instancer, geom::POSITIONS, time)
        .and_then(AttrValue::as_vec3_array)
        .ok_or_else(|| {
            ConversionError::mismatch(stage.prim(instancer).path.clone(), geom::POSITIONS)
        })?;
    let orientations = stage
        .get(instancer, geom::ORIENTATIONS, time)
        .and_then(AttrValue::to_quat_array)
        .unwrap_or_default();
    let scales = stage
        .get(instancer, geom::SCALES, time)
        .and_then(AttrValue::as_vec3_array)
        .unwrap_or_default();

    Ok(positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let rotation = orientations.get(i).copied().unwrap_or(Quat::IDENTITY);
            let scale = scales.get(i).copied().unwrap_or(Vec3::ONE);
            Mat4::from_scale_rotation_translation(scale, rotation, position)
        })
        .collect())
}

/// Read every instance of a point instancer, converted to runtime space.
pub fn read_instancer_samples(
    stage: &Stage,
    instancer: PrimId,
    time: TimeCode,
) -> ConversionResult<Vec<InstancerSample>> {
    let axes = stage.axes();
    let matrices = compute_instance_matrices(stage, instancer, time)?;
    let proto_indices = stage
        .get(instancer, geom::PROTO_INDICES, time)
        .and_then(AttrValue::as_int_array)
        .unwrap_or_default();

    Ok(matrices
        .into_iter()
        .enumerate()
        .map(|(i, matrix)| InstancerSample {
            proto_index: proto_indices.get(i).copied().unwrap_or(0),
            transform: axes.transform_from_stage(&Transform::from_matrix(matrix)),
        })
        .collect())
}

/// Author runtime-space placements as the standard instancer arrays.
pub fn write_instancer_arrays(
    stage: &mut Stage,
    instancer: PrimId,
    proto_indices: Vec<i32>,
    transforms: &[Transform],
    axes: StageAxes,
    time: TimeCode,
) {
    let converted: Vec<Transform> = transforms
        .iter()
        .map(|t| axes.transform_to_stage(t))
        .collect();

    stage.set_typed(
        instancer,
        geom::PROTO_INDICES,
        "int[]",
        AttrValue::IntArray(proto_indices),
        time,
        false,
    );
    stage.set_typed(
        instancer,
        geom::POSITIONS,
        "point3f[]",
        AttrValue::Vec3Array(converted.iter().map(|t| t.translation).collect()),
        time,
        false,
    );
    stage.set_typed(
        instancer,
        geom::ORIENTATIONS,
        "quath[]",
        AttrValue::QuathArray(converted.iter().map(|t| Quath::from_quat(t.rotation)).collect()),
        time,
        false,
    );
    stage.set_typed(
        instancer,
        geom::SCALES,
        "float3[]",
        AttrValue::Vec3Array(converted.iter().map(|t| t.scale).collect()),
        time,
        false,
    );
}

/// Get or create the prototype mesh prim `name` for `mesh` under
/// `prototypes_path`.
///
/// Geometry is written only when the prim is first created. Returns the
/// prototype's path.
pub fn ensure_prototype(
    stage: &mut Stage,
    prototypes_path: &str,
    name: &str,
    mesh: &str,
    registry: &Registry,
    axes: StageAxes,
) -> ConversionResult<String> {
    let path = format!("{}/{}", prototypes_path, name);
    if stage.prim_at_path(&path).is_none() {
        let prim = stage.define_prim(&path, prim_type::MESH)?;
        match registry.assets.static_mesh(mesh) {
            Some(asset) => write_mesh_description(stage, prim, &asset.description, axes)?,
            None => log::warn!("No geometry registered for prototype {}", mesh),
        }
    }

    let prim = stage.override_prim(&path)?;
    stage.set_custom(
        prim,
        attr::ASSET_REFERENCE,
        AttrValue::String(mesh.to_string()),
        TimeCode::Default,
    );
    Ok(path)
}

/// Write an instanced batch onto the prim at `batch_path`.
pub fn write_instanced_batch(
    stage: &mut Stage,
    batch_path: &str,
    batch: &InstancedBatch,
    registry: &Registry,
    time: TimeCode,
) -> ConversionResult<()> {
    let mesh = batch
        .slot
        .mesh
        .as_deref()
        .ok_or_else(|| ConversionError::unresolved(ReferenceKind::Asset, NONE_REFERENCE))?;
    let axes = stage.axes();

    let instancer_path = format!("{}/{}", batch_path, child::HISM_INSTANCE);
    let instancer = stage.define_prim(&instancer_path, prim_type::POINT_INSTANCER)?;
    let prototypes_path = format!("{}/{}", instancer_path, child::PROTOTYPES);
    stage.define_prim(&prototypes_path, prim_type::SCOPE)?;

    let name = make_valid_identifier(asset_name(mesh));
    let prototype_path = ensure_prototype(stage, &prototypes_path, &name, mesh, registry, axes)?;
    if let Some(material) = batch.slot.material(0) {
        if let Some(prototype) = stage.prim_at_path(&prototype_path) {
            stage.set_custom(
                prototype,
                attr::MATERIAL_REFERENCE,
                AttrValue::String(material.to_string()),
                TimeCode::Default,
            );
        }
    }
    stage.set_relationship(instancer, geom::PROTOTYPES_REL, vec![prototype_path]);

    write_instancer_arrays(
        stage,
        instancer,
        vec![0; batch.instance_count()],
        batch.instances(),
        axes,
        time,
    );

    log::debug!(
        "Wrote {} instances of {} to {}",
        batch.instance_count(),
        mesh,
        instancer_path
    );
    Ok(())
}

/// Rebuild an instanced batch from the point instancer under `batch_prim`.
///
/// Existing instances are removed first, so a failed read leaves the batch
/// empty. Returns the number of instances added.
pub fn read_instanced_batch(
    stage: &Stage,
    batch_prim: PrimId,
    batch: &mut InstancedBatch,
    registry: &Registry,
) -> ConversionResult<usize> {
    batch.clear_instances();
    let batch_path = &stage.prim(batch_prim).path;
    let instancer = stage
        .child_named(batch_prim, child::HISM_INSTANCE)
        .filter(|&c| stage.prim(c).type_name == prim_type::POINT_INSTANCER)
        .ok_or_else(|| ConversionError::mismatch(batch_path.clone(), "HISMInstance point instancer"))?;
    let prototypes = stage
        .child_named(instancer, child::PROTOTYPES)
        .ok_or_else(|| ConversionError::mismatch(batch_path.clone(), "Prototypes child"))?;

    let (proto_index, prototype) = stage
        .children(prototypes)
        .iter()
        .copied()
        .enumerate()
        .find(|(_, c)| stage.prim(*c).type_name == prim_type::MESH)
        .ok_or_else(|| ConversionError::mismatch(batch_path.clone(), "Mesh prototype"))?;

    let mesh_path = stage
        .get_str(prototype, attr::ASSET_REFERENCE)
        .unwrap_or(NONE_REFERENCE);
    let mesh = registry
        .assets
        .static_mesh(mesh_path)
        .ok_or_else(|| ConversionError::unresolved(ReferenceKind::Asset, mesh_path))?;

    let material = match stage
        .get_str(prototype, attr::MATERIAL_REFERENCE)
        .filter(|m| !is_none_reference(m))
    {
        Some(m) if registry.assets.has_material(m) => Some(m.to_string()),
        Some(m) => return Err(ConversionError::unresolved(ReferenceKind::Material, m)),
        None => None,
    };

    let samples = read_instancer_samples(stage, instancer, TimeCode::Default)?;

    batch.slot.mesh = Some(mesh.path.clone());
    batch.slot.set_material(0, material);
    for sample in samples.iter().filter(|s| s.proto_index == proto_index as i32) {
        batch.add_instance(sample.transform);
    }

    let bounds = if mesh.is_built() {
        mesh.bounds
    } else {
        mesh.description.bounds()
    };
    batch.build_tree(&bounds);

    log::debug!(
        "Read {} instances of {} from {}",
        batch.instance_count(),
        mesh.path,
        batch_path
    );
    Ok(batch.instance_count())
}
