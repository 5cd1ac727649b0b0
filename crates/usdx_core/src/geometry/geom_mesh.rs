//! Mesh descriptions as document `Mesh` prims.
//!
//! Layout written and read:
//!
//! - `points`: vertex positions in stage space
//! - `faceVertexCounts` / `faceVertexIndices`: one entry per triangle
//! - `primvars:st`: face-varying UVs, V flipped
//! - one `GeomSubset` child per material group when there is more than one,
//!   each tagged with `unrealMaterial`; a single group is tagged on the mesh
//!
//! Both stage conventions are reflections of the runtime frame, so corner
//! order is reversed in both directions to keep faces pointing outward.

use usdx_math::{StageAxes, Vec2};

use super::{Corner, MeshDescription};
use crate::document::{AttrValue, PrimId, Stage, TimeCode};
use crate::error::{ConversionError, ConversionResult};
use crate::schema::{attr, geom, is_none_reference, prim_type, DEFAULT_MATERIAL};

const SUBSET_PREFIX: &str = "Section";

fn flip_v(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, 1.0 - uv.y)
}

/// Author `desc` onto the mesh prim `prim`.
pub fn write_mesh_description(
    stage: &mut Stage,
    prim: PrimId,
    desc: &MeshDescription,
    axes: StageAxes,
) -> ConversionResult<()> {
    let reverse = axes.flips_winding();
    let points = desc
        .vertices
        .iter()
        .map(|&p| axes.point_to_stage(p))
        .collect();

    let mut indices = Vec::with_capacity(desc.triangle_count() * 3);
    let mut st = Vec::with_capacity(indices.capacity());
    for triangle in &desc.triangles {
        let mut corners = triangle.corners;
        if reverse {
            corners.reverse();
        }
        for corner in corners {
            indices.push(corner.vertex as i32);
            st.push(flip_v(corner.uv));
        }
    }

    let time = TimeCode::Default;
    stage.set_typed(prim, geom::POINTS, "point3f[]", AttrValue::Vec3Array(points), time, false);
    stage.set_typed(
        prim,
        geom::FACE_VERTEX_COUNTS,
        "int[]",
        AttrValue::IntArray(vec![3; desc.triangle_count()]),
        time,
        false,
    );
    stage.set_typed(
        prim,
        geom::FACE_VERTEX_INDICES,
        "int[]",
        AttrValue::IntArray(indices),
        time,
        false,
    );
    stage.set_typed(prim, geom::ST, "texCoord2f[]", AttrValue::Vec2Array(st), time, false);
    if let Some(attr) = stage.attribute_mut(prim, geom::ST) {
        attr.interpolation = Some("faceVarying".to_string());
    }

    match desc.groups.as_slice() {
        [] => {}
        [single] => stage.set_custom(
            prim,
            attr::MATERIAL_REFERENCE,
            AttrValue::String(single.material.clone()),
            time,
        ),
        groups => {
            let mesh_path = stage.prim(prim).path.clone();
            for (index, group) in groups.iter().enumerate() {
                let faces: Vec<i32> = desc
                    .triangles
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.group == index)
                    .map(|(i, _)| i as i32)
                    .collect();

                let path = format!("{}/{}{}", mesh_path, SUBSET_PREFIX, index);
                let subset = stage.define_prim(&path, prim_type::GEOM_SUBSET)?;
                for (name, value) in [
                    (geom::SUBSET_ELEMENT_TYPE, "face"),
                    (geom::SUBSET_FAMILY_NAME, geom::MATERIAL_BIND_FAMILY),
                ] {
                    stage.set_typed(subset, name, "token", AttrValue::Token(value.into()), time, false);
                    if let Some(attr) = stage.attribute_mut(subset, name) {
                        attr.uniform = true;
                    }
                }
                stage.set_typed(
                    subset,
                    geom::SUBSET_INDICES,
                    "int[]",
                    AttrValue::IntArray(faces),
                    time,
                    false,
                );
                stage.set_custom(
                    subset,
                    attr::MATERIAL_REFERENCE,
                    AttrValue::String(group.material.clone()),
                    time,
                );
            }
        }
    }

    log::debug!(
        "Wrote mesh {} ({} points, {} triangles)",
        stage.prim(prim).path,
        desc.vertex_count(),
        desc.triangle_count()
    );
    Ok(())
}

/// Read the mesh prim `prim` into a runtime-space description.
///
/// Polygons with more than three corners are fan-triangulated.
pub fn read_mesh_description(
    stage: &Stage,
    prim: PrimId,
    time: TimeCode,
) -> ConversionResult<MeshDescription> {
    let axes = stage.axes();
    let path = &stage.prim(prim).path;
    let missing = |what: &str| ConversionError::mismatch(path.clone(), what.to_string());

    let points = stage
        .get(prim, geom::POINTS, time)
        .and_then(AttrValue::as_vec3_array)
        .ok_or_else(|| missing(geom::POINTS))?;
    let counts = stage
        .get(prim, geom::FACE_VERTEX_COUNTS, time)
        .and_then(AttrValue::as_int_array)
        .ok_or_else(|| missing(geom::FACE_VERTEX_COUNTS))?;
    let indices = stage
        .get(prim, geom::FACE_VERTEX_INDICES, time)
        .and_then(AttrValue::as_int_array)
        .ok_or_else(|| missing(geom::FACE_VERTEX_INDICES))?;

    let st = stage.get(prim, geom::ST, time).and_then(AttrValue::as_vec2_array);
    let uv_at = |corner: usize, vertex: usize| -> Vec2 {
        let uv = match st {
            Some(st) if st.len() == indices.len() => st.get(corner),
            Some(st) => st.get(vertex),
            None => None,
        };
        uv.copied().map(flip_v).unwrap_or(Vec2::ZERO)
    };

    let mut desc = MeshDescription::new();
    for &p in points {
        desc.add_vertex(axes.point_from_stage(p));
    }

    let face_groups = read_face_groups(stage, prim, counts.len(), &mut desc);

    let mut offset = 0usize;
    for (face, &count) in counts.iter().enumerate() {
        let count = count.max(0) as usize;
        let end = offset + count;
        if end > indices.len() {
            return Err(ConversionError::mismatch(
                path.clone(),
                format!("{} face vertex indices", end),
            ));
        }

        let mut corners = Vec::with_capacity(count);
        for corner in offset..end {
            let vertex = usize::try_from(indices[corner]).unwrap_or(usize::MAX);
            corners.push(Corner::new(vertex, uv_at(corner, vertex)));
        }
        if axes.flips_winding() {
            corners.reverse();
        }

        for i in 1..count.saturating_sub(1) {
            desc.add_triangle([corners[0], corners[i], corners[i + 1]], face_groups[face])?;
        }
        offset = end;
    }

    log::debug!(
        "Read mesh {} ({} vertices, {} triangles, {} groups)",
        path,
        desc.vertex_count(),
        desc.triangle_count(),
        desc.groups.len()
    );
    Ok(desc)
}

/// Material group of every face, creating groups in the description.
fn read_face_groups(
    stage: &Stage,
    prim: PrimId,
    face_count: usize,
    desc: &mut MeshDescription,
) -> Vec<usize> {
    let material_of = |id: PrimId| {
        stage
            .get_str(id, attr::MATERIAL_REFERENCE)
            .filter(|m| !is_none_reference(m))
            .unwrap_or(DEFAULT_MATERIAL)
            .to_string()
    };

    let subsets: Vec<PrimId> = stage
        .children(prim)
        .iter()
        .copied()
        .filter(|&c| stage.prim(c).type_name == prim_type::GEOM_SUBSET)
        .filter(|&c| {
            stage
                .get_str(c, geom::SUBSET_FAMILY_NAME)
                .map_or(true, |f| f == geom::MATERIAL_BIND_FAMILY)
        })
        .collect();

    let mut materials: Vec<Option<String>> = vec![None; face_count];
    for subset in subsets {
        let material = material_of(subset);
        let faces = stage
            .get(subset, geom::SUBSET_INDICES, TimeCode::Default)
            .and_then(AttrValue::as_int_array)
            .unwrap_or_default();
        for &face in faces {
            if let Some(slot) = usize::try_from(face).ok().and_then(|f| materials.get_mut(f)) {
                *slot = Some(material.clone());
            }
        }
    }

    // Groups are created in order of first use by a face
    let fallback = material_of(prim);
    materials
        .iter()
        .map(|m| desc.group_for_material(m.as_deref().unwrap_or(&fallback)))
        .collect()
}
