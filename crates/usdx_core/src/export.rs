//! World → document export, one component at a time.
//!
//! Each conversion writes onto the prim at a caller-supplied path, creating
//! it as an override when missing. Nothing here walks the runtime hierarchy;
//! see [`crate::exporter::LevelExporter`] for whole-level export.

use crate::classify::{ConversionMethod, Usage};
use crate::document::{AttrValue, PrimId, Stage, TimeCode};
use crate::error::{ConversionError, ConversionResult};
use crate::geometry::brush_mesh::brush_to_mesh_description;
use crate::geometry::foliage::write_foliage;
use crate::geometry::geom_mesh::write_mesh_description;
use crate::geometry::instancing::write_instanced_batch;
use crate::registry::Registry;
use crate::schema::{attr, geom, prim_type, visibility};
use crate::world::{ActorId, ComponentData, ComponentId, World};
use crate::xform::write_local_transform;

fn set_string(stage: &mut Stage, prim: PrimId, name: &str, value: impl Into<String>) {
    stage.set_custom(prim, name, AttrValue::String(value.into()), TimeCode::Default);
}

fn set_visibility(stage: &mut Stage, prim: PrimId, visible: bool) {
    let token = if visible {
        visibility::INHERITED
    } else {
        visibility::INVISIBLE
    };
    stage.set_typed(
        prim,
        geom::VISIBILITY,
        "token",
        AttrValue::Token(token.to_string()),
        TimeCode::Default,
        false,
    );
}

/// Usage, method, instance and class attributes shared by every component.
///
/// A root component stands for its actor: it is tagged `actor`, keyed by the
/// actor's path name and carries the actor class.
fn write_node_attributes(stage: &mut Stage, prim: PrimId, world: &World, component: ComponentId) {
    let node = world.component(component);
    let (usage, instance, class_path) = if world.is_root(component) {
        let actor = world.actor(node.owner);
        (
            Usage::Actor,
            world.actor_path_name(node.owner),
            actor.class_path.clone(),
        )
    } else {
        (Usage::Component, node.name.clone(), node.class_path.clone())
    };

    set_string(stage, prim, attr::PRIM_USAGE, usage.token());
    set_string(
        stage,
        prim,
        attr::CONVERSION_METHOD,
        ConversionMethod::Spawn.token(),
    );
    set_string(stage, prim, attr::INSTANCE_REFERENCE, instance);
    set_string(stage, prim, attr::CLASS_REFERENCE, class_path);
}

/// Write a component's tags and transform onto `path`.
pub fn convert_scene_component(
    stage: &mut Stage,
    world: &World,
    component: ComponentId,
    path: &str,
    time: TimeCode,
) -> ConversionResult<PrimId> {
    let node = world.component(component);
    let prim = stage.override_typed(path, node.kind().prim_type())?;
    let axes = stage.axes();

    write_node_attributes(stage, prim, world, component);
    write_local_transform(stage, prim, &node.relative, axes, time);
    set_visibility(stage, prim, node.visible);
    Ok(prim)
}

/// Scene attributes plus mesh asset and material override.
pub fn convert_mesh_component(
    stage: &mut Stage,
    world: &World,
    component: ComponentId,
    path: &str,
    time: TimeCode,
) -> ConversionResult<PrimId> {
    let slot = world
        .component(component)
        .data
        .mesh_slot()
        .ok_or_else(|| ConversionError::mismatch(path, "mesh component"))?;
    let prim = convert_scene_component(stage, world, component, path, time)?;

    if let Some(mesh) = &slot.mesh {
        set_string(stage, prim, attr::ASSET_REFERENCE, mesh.as_str());
    }
    if let Some(material) = slot.material(0) {
        set_string(stage, prim, attr::MATERIAL_REFERENCE, material);
    }
    Ok(prim)
}

/// Scene attributes plus brush polygons as mesh geometry.
pub fn convert_brush_component(
    stage: &mut Stage,
    world: &World,
    component: ComponentId,
    path: &str,
    time: TimeCode,
) -> ConversionResult<PrimId> {
    let node = world.component(component);
    let ComponentData::Brush(brush) = &node.data else {
        return Err(ConversionError::mismatch(path, "brush component"));
    };
    let pivot = world.actor(node.owner).pivot_offset;
    let desc = brush_to_mesh_description(&brush.model, pivot)?;

    let prim = convert_scene_component(stage, world, component, path, time)?;
    let axes = stage.axes();
    write_mesh_description(stage, prim, &desc, axes)?;

    set_string(stage, prim, attr::PRIM_TYPE, prim_type::BSP);
    set_string(stage, prim, attr::BSP_BRUSH_TYPE, brush.op.token());
    set_visibility(stage, prim, !node.hidden_in_editor);

    log::debug!(
        "Exported brush {} as {} triangles",
        world.component_path_name(component),
        desc.triangle_count()
    );
    Ok(prim)
}

/// Scene attributes plus the batch's instances under `HISMInstance`.
pub fn convert_hism_component(
    stage: &mut Stage,
    world: &World,
    registry: &Registry,
    component: ComponentId,
    path: &str,
    time: TimeCode,
) -> ConversionResult<PrimId> {
    let ComponentData::InstancedBatch(batch) = &world.component(component).data else {
        return Err(ConversionError::mismatch(path, "instanced batch component"));
    };
    let prim = convert_scene_component(stage, world, component, path, time)?;
    write_instanced_batch(stage, path, batch, registry, time)?;
    Ok(prim)
}

/// The level's foliage as one point instancer tagged with the actor.
pub fn convert_instanced_foliage_actor(
    stage: &mut Stage,
    world: &World,
    registry: &Registry,
    actor: ActorId,
    path: &str,
    time: TimeCode,
) -> ConversionResult<PrimId> {
    write_foliage(stage, path, world, actor, registry, time)?;
    let prim = stage
        .prim_at_path(path)
        .ok_or_else(|| ConversionError::MissingPrim(path.to_string()))?;
    write_node_attributes(stage, prim, world, world.actor(actor).root);
    Ok(prim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Specifier;
    use crate::geometry::{BrushOp, Model};
    use crate::import::import_stage;
    use crate::registry::ClassRegistry;
    use crate::schema::class;
    use crate::world::ComponentKind;
    use usdx_math::{Transform, Vec3};

    fn text<'a>(stage: &'a Stage, prim: PrimId, name: &str) -> &'a str {
        stage.get_str(prim, name).unwrap()
    }

    #[test]
    fn test_root_component_stands_for_actor() {
        let classes = ClassRegistry::with_defaults();
        let mut world = World::new("Level");
        let cube = world.spawn_actor(classes.actor(class::STATIC_MESH_ACTOR).unwrap(), "Cube1");
        let root = world.actor(cube).root;
        let slot = world.component_mut(root).data.mesh_slot_mut().unwrap();
        slot.mesh = Some("/Game/Meshes/Cube.Cube".into());
        slot.set_material(0, Some("/Game/M_Red.M_Red".into()));

        let mut stage = Stage::new("out.usda");
        let prim =
            convert_mesh_component(&mut stage, &world, root, "/Level/Cube1", TimeCode::Default)
                .unwrap();

        assert_eq!(stage.prim(prim).type_name, prim_type::MESH);
        assert_eq!(stage.prim(prim).specifier, Specifier::Over);
        assert_eq!(text(&stage, prim, attr::PRIM_USAGE), "actor");
        assert_eq!(text(&stage, prim, attr::CONVERSION_METHOD), "spawn");
        assert_eq!(text(&stage, prim, attr::INSTANCE_REFERENCE), "Level.Cube1");
        assert_eq!(text(&stage, prim, attr::CLASS_REFERENCE), class::STATIC_MESH_ACTOR);
        assert_eq!(text(&stage, prim, attr::ASSET_REFERENCE), "/Game/Meshes/Cube.Cube");
        assert_eq!(text(&stage, prim, attr::MATERIAL_REFERENCE), "/Game/M_Red.M_Red");
        assert_eq!(text(&stage, prim, geom::VISIBILITY), visibility::INHERITED);
    }

    #[test]
    fn test_child_component_uses_local_name() {
        let classes = ClassRegistry::with_defaults();
        let mut world = World::new("Level");
        let fan = world.spawn_actor(classes.actor(class::ACTOR).unwrap(), "Fan");
        let root = world.actor(fan).root;
        let blade = world.add_component(
            fan,
            "Blade",
            class::STATIC_MESH_COMPONENT,
            ComponentKind::StaticMesh,
        );
        world.attach(blade, root);
        world.component_mut(blade).relative = Transform::from_translation(Vec3::new(0.0, 0.0, 50.0));
        world.component_mut(blade).visible = false;

        let mut stage = Stage::new("out.usda");
        let prim = convert_mesh_component(
            &mut stage,
            &world,
            blade,
            "/Level/Fan/Blade",
            TimeCode::Default,
        )
        .unwrap();

        assert_eq!(text(&stage, prim, attr::PRIM_USAGE), "component");
        assert_eq!(text(&stage, prim, attr::INSTANCE_REFERENCE), "Blade");
        assert_eq!(text(&stage, prim, attr::CLASS_REFERENCE), class::STATIC_MESH_COMPONENT);
        assert_eq!(text(&stage, prim, geom::VISIBILITY), visibility::INVISIBLE);
        assert!(stage.attribute(prim, attr::ASSET_REFERENCE).is_none());
        assert!(stage.get(prim, geom::XFORM_TRANSLATE, TimeCode::Default).is_some());
    }

    #[test]
    fn test_mesh_export_needs_mesh_component() {
        let classes = ClassRegistry::with_defaults();
        let mut world = World::new("Level");
        let actor = world.spawn_actor(classes.actor(class::ACTOR).unwrap(), "Empty");
        let root = world.actor(actor).root;

        let mut stage = Stage::new("out.usda");
        let result = convert_mesh_component(&mut stage, &world, root, "/Empty", TimeCode::Default);
        assert!(matches!(
            result,
            Err(ConversionError::StructuralMismatch { .. })
        ));
        assert!(stage.prim_at_path("/Empty").is_none());
    }

    #[test]
    fn test_brush_round_trips_through_import() {
        let registry = Registry::default();
        let mut world = World::new("Level");
        let brush_actor = world.spawn_actor(registry.classes.actor(class::BRUSH).unwrap(), "Box");
        let root = world.actor(brush_actor).root;
        {
            let node = world.component_mut(root);
            node.hidden_in_editor = true;
            let ComponentData::Brush(brush) = &mut node.data else {
                panic!("expected a brush");
            };
            brush.model = Model::cube(50.0, Some("/Game/Brick.Brick".to_string())).unwrap();
            brush.op = BrushOp::Subtract;
        }

        let mut stage = Stage::new("brush.usda");
        let prim =
            convert_brush_component(&mut stage, &world, root, "/Level/Box", TimeCode::Default)
                .unwrap();
        assert_eq!(text(&stage, prim, attr::PRIM_TYPE), prim_type::BSP);
        assert_eq!(text(&stage, prim, attr::BSP_BRUSH_TYPE), "subtract");
        assert_eq!(text(&stage, prim, geom::VISIBILITY), visibility::INVISIBLE);

        let mut imported = World::new("Level");
        let report = import_stage(&stage, &mut imported, &registry);
        assert!(report.is_clean(), "{:?}", report.failures);

        let actor = imported.find_actor("Box").unwrap();
        let node = imported.component(imported.actor(actor).root);
        assert!(node.hidden_in_editor);
        let ComponentData::Brush(brush) = &node.data else {
            panic!("expected a brush");
        };
        assert_eq!(brush.op, BrushOp::Subtract);
        assert_eq!(brush.model.polys.len(), 12);
        assert_eq!(brush.model.merged_face_count(), 6);
        assert!(brush
            .model
            .polys
            .iter()
            .all(|p| p.material.as_deref() == Some("/Game/Brick.Brick")));
    }
}
