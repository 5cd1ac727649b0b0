//! USDA serialization.

use std::fmt::Write;

use usdx_math::{Mat4, Quat, Vec2, Vec3};

use crate::document::stage::{Attribute, PrimId, Stage};
use crate::document::value::{AttrValue, Quath};

const INDENT: &str = "    ";

/// Serialize a whole stage to USDA text.
pub fn write_stage(stage: &Stage) -> String {
    let mut out = String::from("#usda 1.0\n(\n");
    let meta = stage.metadata();

    if let Some(default_prim) = &meta.default_prim {
        let _ = writeln!(out, "{}defaultPrim = {}", INDENT, quote(default_prim));
    }
    let _ = writeln!(out, "{}metersPerUnit = {}", INDENT, meta.meters_per_unit);
    if !meta.sub_layers.is_empty() {
        let layers: Vec<String> = meta.sub_layers.iter().map(|l| format!("@{}@", l)).collect();
        let _ = writeln!(out, "{}subLayers = [{}]", INDENT, layers.join(", "));
    }
    let _ = writeln!(out, "{}upAxis = {}", INDENT, quote(meta.up_axis.token()));
    out.push_str(")\n");

    for &root in stage.root_prims() {
        out.push('\n');
        write_prim(stage, root, 0, &mut out);
    }

    out
}

fn write_prim(stage: &Stage, id: PrimId, depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);
    let prim = stage.prim(id);

    let type_part = if prim.type_name.is_empty() {
        String::new()
    } else {
        format!("{} ", prim.type_name)
    };
    let _ = writeln!(
        out,
        "{}{} {}{}",
        indent,
        prim.specifier.keyword(),
        type_part,
        quote(&prim.name)
    );
    let _ = writeln!(out, "{}{{", indent);

    let inner = INDENT.repeat(depth + 1);
    for (name, attr) in &prim.attributes {
        write_attribute(name, attr, &inner, out);
    }
    for (name, targets) in &prim.relationships {
        let targets: Vec<String> = targets.iter().map(|t| format!("<{}>", t)).collect();
        let _ = writeln!(out, "{}rel {} = [{}]", inner, name, targets.join(", "));
    }

    for &child in &prim.children {
        out.push('\n');
        write_prim(stage, child, depth + 1, out);
    }

    let _ = writeln!(out, "{}}}", indent);
}

fn write_attribute(name: &str, attr: &Attribute, indent: &str, out: &mut String) {
    let mut decl = String::new();
    if attr.custom {
        decl.push_str("custom ");
    }
    if attr.uniform {
        decl.push_str("uniform ");
    }
    let _ = write!(decl, "{} {}", attr.type_name, name);

    let metadata = attr
        .interpolation
        .as_ref()
        .map(|i| format!(" (interpolation = {})", quote(i)))
        .unwrap_or_default();

    match &attr.default {
        Some(value) => {
            let _ = writeln!(out, "{}{} = {}{}", indent, decl, format_value(value), metadata);
        }
        None if attr.time_samples.is_empty() => {
            let _ = writeln!(out, "{}{}{}", indent, decl, metadata);
        }
        None => {}
    }

    if !attr.time_samples.is_empty() {
        let _ = writeln!(out, "{}{}.timeSamples = {{", indent, decl);
        for (time, value) in &attr.time_samples {
            let _ = writeln!(out, "{}{}{}: {},", indent, INDENT, time, format_value(value));
        }
        let _ = writeln!(out, "{}}}", indent);
    }
}

fn quote(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{}\"", escaped)
}

fn fmt_vec2(v: &Vec2) -> String {
    format!("({}, {})", v.x, v.y)
}

fn fmt_vec3(v: &Vec3) -> String {
    format!("({}, {}, {})", v.x, v.y, v.z)
}

fn fmt_quat(q: &Quat) -> String {
    format!("({}, {}, {}, {})", q.w, q.x, q.y, q.z)
}

fn fmt_quath(q: &Quath) -> String {
    format!(
        "({}, {}, {}, {})",
        q.w.to_f32(),
        q.x.to_f32(),
        q.y.to_f32(),
        q.z.to_f32()
    )
}

/// Columns of a column-vector matrix are the written rows.
fn fmt_matrix(m: &Mat4) -> String {
    let rows: Vec<String> = m
        .to_cols_array_2d()
        .iter()
        .map(|c| format!("({}, {}, {}, {})", c[0], c[1], c[2], c[3]))
        .collect();
    format!("( {} )", rows.join(", "))
}

fn array<T>(items: &[T], f: impl Fn(&T) -> String) -> String {
    let parts: Vec<String> = items.iter().map(f).collect();
    format!("[{}]", parts.join(", "))
}

/// Format a value as USDA text.
fn format_value(value: &AttrValue) -> String {
    match value {
        AttrValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        AttrValue::Int(i) => i.to_string(),
        AttrValue::Float(f) => f.to_string(),
        AttrValue::String(s) | AttrValue::Token(s) => quote(s),
        AttrValue::Vec3(v) => fmt_vec3(v),
        AttrValue::Quat(q) => fmt_quat(q),
        AttrValue::Matrix(m) => fmt_matrix(m),
        AttrValue::StringArray(v) | AttrValue::TokenArray(v) => array(v, |s| quote(s)),
        AttrValue::IntArray(v) => array(v, |i| i.to_string()),
        AttrValue::FloatArray(v) => array(v, |f| f.to_string()),
        AttrValue::Vec2Array(v) => array(v, fmt_vec2),
        AttrValue::Vec3Array(v) => array(v, fmt_vec3),
        AttrValue::QuatArray(v) => array(v, fmt_quat),
        AttrValue::QuathArray(v) => array(v, fmt_quath),
        AttrValue::MatrixArray(v) => array(v, fmt_matrix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TimeCode;

    #[test]
    fn test_written_stage_parses_back() {
        let mut stage = Stage::new("out.usda");
        let root = stage.define_prim("/Root", "Xform").unwrap();
        stage.set_default_prim(root);
        let mesh = stage.define_prim("/Root/Cube", "Mesh").unwrap();
        stage.set_custom(
            mesh,
            "unrealAssetReference",
            AttrValue::String("/Game/Cube.Cube".into()),
            TimeCode::Default,
        );
        stage.set_typed(
            mesh,
            "points",
            "point3f[]",
            AttrValue::Vec3Array(vec![Vec3::new(0.5, -1.0, 2.0)]),
            TimeCode::Default,
            false,
        );
        stage.set(
            mesh,
            "xformOp:transform",
            AttrValue::Matrix(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))),
            TimeCode::Default,
        );
        stage.set(
            mesh,
            "orientations",
            AttrValue::QuathArray(vec![Quath::from_quat(Quat::from_rotation_x(0.5))]),
            TimeCode::At(3.0),
        );
        stage.set_relationship(mesh, "prototypes", vec!["/Root/Cube".into()]);

        let text = stage.to_usda();
        let back = Stage::from_usda("out.usda", &text).unwrap();

        assert_eq!(back.metadata(), stage.metadata());
        let mesh_back = back.prim_at_path("/Root/Cube").unwrap();
        assert_eq!(back.get_str(mesh_back, "unrealAssetReference"), Some("/Game/Cube.Cube"));
        assert!(back.attribute(mesh_back, "unrealAssetReference").unwrap().custom);
        assert_eq!(
            back.get(mesh_back, "points", TimeCode::Default),
            stage.get(mesh, "points", TimeCode::Default)
        );
        assert_eq!(
            back.get(mesh_back, "orientations", TimeCode::At(3.0)),
            stage.get(mesh, "orientations", TimeCode::At(3.0))
        );
        let m = back
            .get(mesh_back, "xformOp:transform", TimeCode::Default)
            .and_then(AttrValue::as_matrix)
            .unwrap();
        assert!((m.transform_point3(Vec3::ZERO) - Vec3::new(1.0, 2.0, 3.0)).length() < 0.001);
        assert_eq!(back.relationship(mesh_back, "prototypes").unwrap(), ["/Root/Cube".to_string()]);
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }
}
