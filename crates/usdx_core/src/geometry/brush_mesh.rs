//! Conversion between brush polygons and mesh descriptions.
//!
//! Brush to mesh fan-triangulates every polygon, reversing winding, and
//! derives per-corner UVs from the polygon's texture basis. Mesh to brush
//! turns every triangle back into a polygon, recovering the texture basis
//! from the corner UVs, then links coplanar polygons into faces.

use usdx_math::{Mat3, Vec2, Vec3, SMALL_NUMBER};

use super::brush::TEXEL_SCALE;
use super::{Corner, GeometryResult, MeshDescription, Model, Poly, StaticMesh};
use crate::schema::DEFAULT_MATERIAL;

/// Triangulate a brush into a mesh description.
///
/// `pivot` is the owning actor's pivot offset; texture origins are measured
/// relative to it. Coincident vertices are merged per axis and every edge is
/// hard.
pub fn brush_to_mesh_description(model: &Model, pivot: Vec3) -> GeometryResult<MeshDescription> {
    let mut desc = MeshDescription::new();

    for (index, poly) in model.polys.iter().enumerate() {
        if poly.vertices.len() < 3 {
            log::warn!("Skipping brush polygon {} with {} vertices", index, poly.vertices.len());
            continue;
        }

        let group = desc.group_for_material(poly.material.as_deref().unwrap_or(DEFAULT_MATERIAL));
        let origin = poly.base - pivot;
        let texture_u = poly.texture_u / TEXEL_SCALE;
        let texture_v = poly.texture_v / TEXEL_SCALE;
        let uv_of = |p: Vec3| Vec2::new((p - origin).dot(texture_u), (p - origin).dot(texture_v));

        let ids: Vec<usize> = poly
            .vertices
            .iter()
            .map(|&p| desc.find_or_add_vertex(p))
            .collect();

        for i in 2..poly.vertices.len() {
            let corners = [i, i - 1, 0].map(|k| Corner::new(ids[k], uv_of(poly.vertices[k])));
            desc.add_triangle(corners, group)?;
            desc.set_edge_hard(ids[i], ids[i - 1]);
            desc.set_edge_hard(ids[i - 1], ids[0]);
            desc.set_edge_hard(ids[0], ids[i]);
        }
    }

    Ok(desc)
}

/// Build a renderable static mesh asset from a brush.
pub fn brush_to_static_mesh(model: &Model, pivot: Vec3, path: &str) -> GeometryResult<StaticMesh> {
    let desc = brush_to_mesh_description(model, pivot)?;
    let mut mesh = StaticMesh::new(path, desc);
    mesh.build()?;
    Ok(mesh)
}

/// Replace a brush's polygons with one polygon per mesh triangle.
pub fn rebuild_brush_from_mesh(
    model: &mut Model,
    desc: &MeshDescription,
    pivot: Vec3,
) -> GeometryResult<()> {
    model.clear();

    for (index, triangle) in desc.triangles.iter().enumerate() {
        let positions = desc.triangle_positions(index);
        let vertices = [positions[2], positions[1], positions[0]];
        let uvs = [
            triangle.corners[2].uv,
            triangle.corners[1].uv,
            triangle.corners[0].uv,
        ];

        let material = desc
            .groups
            .get(triangle.group)
            .map(|g| g.material.as_str())
            .filter(|m| *m != DEFAULT_MATERIAL)
            .map(str::to_string);

        let (origin, texture_u, texture_v) = texcoords_to_vectors(vertices, uvs);
        let mut poly = Poly::new(vertices.to_vec(), material).with_texture(
            origin + pivot,
            texture_u * TEXEL_SCALE,
            texture_v * TEXEL_SCALE,
        );

        match poly.finalize(index) {
            Ok(()) => model.polys.push(poly),
            Err(e) => log::warn!("Dropping triangle: {}", e),
        }
    }

    model.validate_brush();
    model.build_bound();
    log::debug!(
        "Rebuilt brush: {} polygons in {} faces",
        model.polys.len(),
        model.merged_face_count()
    );
    Ok(())
}

/// Recover a texture basis from three points and their UVs.
///
/// Returns the point where UV is (0, 0) and the vectors `u`, `v` such that
/// `uv = ((p - origin).dot(u), (p - origin).dot(v))` for points in the
/// triangle's plane.
pub fn texcoords_to_vectors(p: [Vec3; 3], uv: [Vec2; 3]) -> (Vec3, Vec3, Vec3) {
    let e1 = p[1] - p[0];
    let e2 = p[2] - p[0];
    let d1 = uv[1] - uv[0];
    let d2 = uv[2] - uv[0];

    let fallback = || {
        let normal = e1.cross(e2).try_normalize().unwrap_or(Vec3::Z);
        let (u, v) = normal.any_orthonormal_pair();
        (p[0], u / TEXEL_SCALE, v / TEXEL_SCALE)
    };

    let normal = match e1.cross(e2).try_normalize() {
        Some(n) => n,
        None => return fallback(),
    };
    let det = d1.x * d2.y - d2.x * d1.y;
    if det.abs() < SMALL_NUMBER {
        return fallback();
    }

    // World-space steps of one unit in U and in V
    let axis_u = (e1 * d2.y - e2 * d1.y) / det;
    let axis_v = (e2 * d1.x - e1 * d2.x) / det;
    let origin = p[0] - axis_u * uv[0].x - axis_v * uv[0].y;

    let basis = Mat3::from_cols(axis_u, axis_v, normal);
    if basis.determinant().abs() < SMALL_NUMBER {
        return fallback();
    }
    let dual = basis.inverse();
    (origin, dual.row(0), dual.row(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use usdx_math::vertices_equal;

    fn two_material_cube() -> Model {
        let mut cube = Model::cube(50.0, Some("/Game/Brick.Brick".to_string())).unwrap();
        cube.polys[4].material = None;
        cube.validate_brush();
        cube
    }

    #[test]
    fn test_cube_to_mesh() {
        let desc = brush_to_mesh_description(&two_material_cube(), Vec3::ZERO).unwrap();
        assert_eq!(desc.vertex_count(), 8);
        assert_eq!(desc.triangle_count(), 12);
        assert_eq!(desc.groups.len(), 2);
        assert_eq!(desc.groups[1].material, DEFAULT_MATERIAL);
        // 12 cube edges plus one diagonal per face
        assert_eq!(desc.hard_edge_count(), 18);
    }

    #[test]
    fn test_fan_winding_is_reversed() {
        let poly = Poly::new(vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y], None);
        let mut model = Model::new(vec![poly]);
        model.polys[0].finalize(0).unwrap();

        let desc = brush_to_mesh_description(&model, Vec3::ZERO).unwrap();
        assert_eq!(desc.triangle_count(), 2);
        let first = desc.triangle_positions(0);
        assert_eq!(first, [Vec3::new(1.0, 1.0, 0.0), Vec3::X, Vec3::ZERO]);
    }

    #[test]
    fn test_uvs_follow_texture_basis_and_pivot() {
        let poly = Poly::new(vec![Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), Vec3::new(100.0, 100.0, 0.0)], None)
            .with_texture(Vec3::ZERO, Vec3::X, Vec3::Y);
        let model = Model::new(vec![poly]);

        let desc = brush_to_mesh_description(&model, Vec3::new(-50.0, 0.0, 0.0)).unwrap();
        let corners = desc.triangles[0].corners;
        // Corner order is (V2, V1, V0); origin shifts to base - pivot = (50, 0, 0)
        assert!((corners[0].uv - Vec2::new(0.5, 1.0)).length() < 1e-5);
        assert!((corners[2].uv - Vec2::new(-0.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_texcoords_to_vectors_recovers_basis() {
        let u = Vec3::new(0.0, 1.0, 0.0) / TEXEL_SCALE;
        let v = Vec3::new(0.0, 0.0, 1.0) / TEXEL_SCALE;
        let origin = Vec3::new(10.0, -20.0, 30.0);
        let p = [
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 100.0, 0.0),
            Vec3::new(10.0, 0.0, 100.0),
        ];
        let uv = p.map(|q| Vec2::new((q - origin).dot(u), (q - origin).dot(v)));

        let (o, ru, rv) = texcoords_to_vectors(p, uv);
        assert!((ru - u).length() < 1e-5);
        assert!((rv - v).length() < 1e-5);
        assert!(((p[1] - o).dot(ru) - uv[1].x).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_uvs_fall_back() {
        let p = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let (o, u, v) = texcoords_to_vectors(p, [Vec2::ZERO; 3]);
        assert_eq!(o, Vec3::ZERO);
        assert!(u.dot(Vec3::Z).abs() < 1e-6);
        assert!(v.dot(Vec3::Z).abs() < 1e-6);
    }

    #[test]
    fn test_round_trip_cube() {
        let original = two_material_cube();
        let pivot = Vec3::new(5.0, -3.0, 0.0);

        let desc = brush_to_mesh_description(&original, pivot).unwrap();
        let mut rebuilt = Model::default();
        rebuild_brush_from_mesh(&mut rebuilt, &desc, pivot).unwrap();

        assert_eq!(rebuilt.polys.len(), 12);
        assert_eq!(rebuilt.merged_face_count(), original.merged_face_count());

        for face in rebuilt.faces() {
            let leader = &rebuilt.polys[face[0]];
            let source = original
                .polys
                .iter()
                .find(|p| p.normal.dot(leader.normal) > 0.9999)
                .unwrap();
            assert_eq!(leader.material, source.material);
            assert!((leader.texture_u - source.texture_u).length() < 1e-3);
            for &member in &face {
                for &vertex in &rebuilt.polys[member].vertices {
                    assert!(source.vertices.iter().any(|&s| vertices_equal(s, vertex)));
                }
            }
        }
        assert_eq!(rebuilt.bounds, original.bounds);
    }

    #[test]
    fn test_static_mesh_from_brush() {
        let mesh = brush_to_static_mesh(&two_material_cube(), Vec3::ZERO, "/Game/Brush.Brush").unwrap();
        assert!(mesh.is_built());
        assert_eq!(mesh.materials.len(), 2);
    }
}
