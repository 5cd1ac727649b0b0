//! Scatter instances as a point instancer with base-surface bookkeeping.
//!
//! The foliage actor's mesh types become prototypes in order, so the
//! prototype index of an instance is the index of its mesh type. The
//! children of `Prototypes` must therefore stay in mesh-type order; the
//! writer creates them that way and the reader relies on it.
//!
//! Each instance's base surface is stored as an index into a string array
//! of component path names. Index 0 is reserved for "no base".

use indexmap::IndexSet;
use usdx_math::{Transform, Vec3};

use super::asset_name;
use super::instancing::{ensure_prototype, read_instancer_samples, write_instancer_arrays};
use crate::document::{make_valid_identifier, AttrValue, PrimId, Stage, TimeCode};
use crate::error::{ConversionError, ConversionResult, ReferenceKind};
use crate::name_index::NameIndex;
use crate::registry::Registry;
use crate::schema::{attr, child, geom, is_none_reference, prim_type, NONE_REFERENCE};
use crate::world::{ActorId, ComponentId, FoliageInstance, FoliageType, World};

/// Half length of the vertical trace used to find an instance's surface.
pub const FOLIAGE_TRACE_HALF_LENGTH: f32 = 500.0;

/// Distinct base surfaces in first-seen order, "no base" first.
#[derive(Clone, Debug)]
pub struct FoliageIndex {
    bases: IndexSet<Option<ComponentId>>,
}

impl Default for FoliageIndex {
    fn default() -> Self {
        let mut bases = IndexSet::new();
        bases.insert(None);
        Self { bases }
    }
}

impl FoliageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `base`, adding it on first use.
    pub fn index_of(&mut self, base: Option<ComponentId>) -> i32 {
        self.bases.insert_full(base).0 as i32
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Serialized references, `None` for the reserved entry.
    pub fn references(&self, world: &World) -> Vec<String> {
        self.bases
            .iter()
            .map(|base| match base {
                Some(id) => world.component_path_name(*id),
                None => NONE_REFERENCE.to_string(),
            })
            .collect()
    }
}

/// Write the foliage of `actor` onto a point instancer at `instancer_path`.
///
/// Export only reads the foliage actor; its instances are left untouched.
pub fn write_foliage(
    stage: &mut Stage,
    instancer_path: &str,
    world: &World,
    actor: ActorId,
    registry: &Registry,
    time: TimeCode,
) -> ConversionResult<()> {
    let foliage = world
        .actor(actor)
        .foliage
        .as_ref()
        .ok_or_else(|| ConversionError::mismatch(world.actor_path_name(actor), "foliage actor"))?;
    let axes = stage.axes();

    let mut proto_indices = Vec::new();
    let mut transforms = Vec::new();
    let mut base_indices = Vec::new();
    let mut index = FoliageIndex::new();

    for (proto_index, (_, info)) in foliage.mesh_types().enumerate() {
        for (base, members) in info.component_hash() {
            for &member in members {
                let instance = &info.instances()[member];
                proto_indices.push(proto_index as i32);
                transforms.push(instance.transform());
                base_indices.push(index.index_of(*base));
            }
        }
    }

    let instancer = stage.define_prim(instancer_path, prim_type::POINT_INSTANCER)?;
    write_instancer_arrays(stage, instancer, proto_indices, &transforms, axes, time);
    stage.set_custom(
        instancer,
        attr::BASE_COMPONENT_REFERENCES,
        AttrValue::StringArray(index.references(world)),
        time,
    );
    stage.set_custom(
        instancer,
        attr::BASE_COMPONENT_INDICES,
        AttrValue::IntArray(base_indices),
        time,
    );

    let prototypes_path = format!("{}/{}", instancer_path, child::PROTOTYPES);
    stage.define_prim(&prototypes_path, prim_type::SCOPE)?;
    let mut names = IndexSet::new();
    let mut targets = Vec::new();
    for (proto_index, (foliage_type, _)) in foliage.mesh_types().enumerate() {
        let mut name = make_valid_identifier(asset_name(&foliage_type.mesh));
        if !names.insert(name.clone()) {
            name = format!("{}_{}", name, proto_index);
            names.insert(name.clone());
        }
        let path = ensure_prototype(stage, &prototypes_path, &name, &foliage_type.mesh, registry, axes)?;
        if let (Some(material), Some(prim)) =
            (&foliage_type.material_override, stage.prim_at_path(&path))
        {
            stage.set_custom(
                prim,
                attr::MATERIAL_REFERENCE,
                AttrValue::String(material.clone()),
                TimeCode::Default,
            );
        }
        targets.push(path);
    }
    stage.set_relationship(instancer, geom::PROTOTYPES_REL, targets);

    log::info!(
        "Wrote {} foliage instances of {} mesh types ({} bases) to {}",
        transforms.len(),
        foliage.mesh_type_count(),
        index.len() - 1,
        instancer_path
    );
    Ok(())
}

/// Outcome of reading a scatter instancer.
#[derive(Debug, Default)]
pub struct FoliageRead {
    /// Instances added to the foliage actor
    pub added: usize,

    /// Prototype references that could not be resolved, by prototype path.
    /// An unresolved mesh drops that prototype and its instances; an
    /// unresolved material only drops the override.
    pub skipped: Vec<(String, ConversionError)>,
}

/// Replace the foliage of `actor` with the instances stored on `instancer`.
///
/// Existing mesh types are removed first. Prototypes keep their index slot
/// even when their mesh cannot be resolved, so the remaining prototypes
/// still receive their own instances.
///
/// An instance's base is the landscape found by a vertical trace through
/// its location, else the surface recorded by its stored index.
pub fn read_foliage(
    stage: &Stage,
    instancer: PrimId,
    world: &mut World,
    actor: ActorId,
    names: &NameIndex,
    registry: &Registry,
) -> ConversionResult<FoliageRead> {
    let path = &stage.prim(instancer).path;
    world
        .actor_mut(actor)
        .foliage
        .as_mut()
        .ok_or_else(|| ConversionError::mismatch(path.clone(), "foliage actor"))?
        .remove_all_mesh_types();

    let prototypes = stage
        .child_named(instancer, child::PROTOTYPES)
        .ok_or_else(|| ConversionError::mismatch(path.clone(), "Prototypes child"))?;

    let mut read = FoliageRead::default();
    let mut types: Vec<Option<FoliageType>> = Vec::new();
    for &prototype in stage.children(prototypes) {
        if stage.prim(prototype).type_name != prim_type::MESH {
            continue;
        }
        let prototype_path = &stage.prim(prototype).path;
        let mesh = stage
            .get_str(prototype, attr::ASSET_REFERENCE)
            .unwrap_or(NONE_REFERENCE);
        if registry.assets.static_mesh(mesh).is_none() {
            log::warn!("Skipping foliage prototype {}: no mesh {}", prototype_path, mesh);
            read.skipped.push((
                prototype_path.clone(),
                ConversionError::unresolved(ReferenceKind::Asset, mesh),
            ));
            types.push(None);
            continue;
        }
        let mut foliage_type = FoliageType::new(mesh);
        if let Some(material) = stage
            .get_str(prototype, attr::MATERIAL_REFERENCE)
            .filter(|m| !is_none_reference(m))
        {
            if registry.assets.has_material(material) {
                foliage_type.material_override = Some(material.to_string());
            } else {
                read.skipped.push((
                    prototype_path.clone(),
                    ConversionError::unresolved(ReferenceKind::Material, material),
                ));
            }
        }
        types.push(Some(foliage_type));
    }

    let samples = read_instancer_samples(stage, instancer, TimeCode::Default)?;
    let root = world.actor(actor).root;
    let bases: Vec<Option<ComponentId>> = stage
        .get(instancer, attr::BASE_COMPONENT_REFERENCES, TimeCode::Default)
        .and_then(AttrValue::as_string_array)
        .unwrap_or_default()
        .iter()
        .map(|reference| {
            if is_none_reference(reference) {
                None
            } else {
                Some(names.get(reference).unwrap_or_else(|| {
                    log::warn!("Unresolved foliage base {}, using foliage actor", reference);
                    root
                }))
            }
        })
        .collect();
    let indices = stage
        .get(instancer, attr::BASE_COMPONENT_INDICES, TimeCode::Default)
        .and_then(AttrValue::as_int_array)
        .unwrap_or_default();

    let mut placed: Vec<Vec<FoliageInstance>> = vec![Vec::new(); types.len()];
    for (i, sample) in samples.iter().enumerate() {
        let Some(slot) = usize::try_from(sample.proto_index)
            .ok()
            .and_then(|p| placed.get_mut(p))
        else {
            log::warn!("Instance {} of {} has no prototype {}", i, path, sample.proto_index);
            continue;
        };

        let stored = indices
            .get(i)
            .and_then(|&index| usize::try_from(index).ok())
            .and_then(|index| bases.get(index).copied())
            .flatten();
        let base = trace_base(world, &sample.transform).or(stored);
        slot.push(FoliageInstance::from_transform(&sample.transform, base));
    }

    let foliage = world
        .actor_mut(actor)
        .foliage
        .as_mut()
        .ok_or_else(|| ConversionError::mismatch(path.clone(), "foliage actor"))?;

    for (foliage_type, instances) in types.into_iter().zip(placed) {
        let Some(foliage_type) = foliage_type else {
            continue;
        };
        let info = foliage.add_mesh_type(foliage_type);
        for instance in instances {
            info.add_instance(instance);
            read.added += 1;
        }
        info.refresh();
    }

    log::info!(
        "Read {} foliage instances of {} mesh types from {} ({} skipped)",
        read.added,
        foliage.mesh_type_count(),
        path,
        read.skipped.len()
    );
    Ok(read)
}

/// Landscape directly above or below a placement.
fn trace_base(world: &World, transform: &Transform) -> Option<ComponentId> {
    let up = Vec3::Z * FOLIAGE_TRACE_HALF_LENGTH;
    let location = transform.translation;
    world
        .trace_landscape(location + up, location - up)
        .map(|hit| hit.component)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::brush_mesh::brush_to_static_mesh;
    use crate::geometry::{Mesh, Model};
    use crate::schema::class;
    use crate::world::{ComponentData, LandscapeData};
    use usdx_math::{Quat, StageAxes, UpAxis};

    const TREE: &str = "/Game/Foliage/Tree.Tree";
    const ROCK: &str = "/Game/Foliage/Rock.Rock";

    struct Fixture {
        world: World,
        registry: Registry,
        foliage: ActorId,
        bases: [ComponentId; 2],
    }

    fn fixture() -> Fixture {
        let mut registry = Registry::default();
        for path in [TREE, ROCK] {
            let model = Model::cube(10.0, None).unwrap();
            registry
                .assets
                .add_static_mesh(brush_to_static_mesh(&model, Vec3::ZERO, path).unwrap());
        }

        let mut world = World::new("Level");
        let sma = registry.classes.actor(class::STATIC_MESH_ACTOR).unwrap().clone();
        let a = world.spawn_actor(&sma, "Hill");
        let b = world.spawn_actor(&sma, "Ledge");
        let ifa = registry.classes.actor(class::INSTANCED_FOLIAGE_ACTOR).unwrap().clone();
        let foliage = world.spawn_actor(&ifa, "InstancedFoliageActor");
        let bases = [world.actor(a).root, world.actor(b).root];

        Fixture {
            world,
            registry,
            foliage,
            bases,
        }
    }

    fn place(x: f32, base: Option<ComponentId>) -> FoliageInstance {
        FoliageInstance::from_transform(
            &Transform::new(
                Vec3::new(x, 20.0, 5.0),
                Quat::from_rotation_z(x * 0.01),
                Vec3::new(1.0, 1.0, 1.5),
            ),
            base,
        )
    }

    fn populate(f: &mut Fixture) {
        let [a, b] = f.bases;
        let foliage = f.world.actor_mut(f.foliage).foliage.as_mut().unwrap();
        let trees = foliage.add_mesh_type(FoliageType::new(TREE));
        trees.add_instance(place(0.0, Some(a)));
        trees.add_instance(place(100.0, Some(b)));
        trees.add_instance(place(200.0, Some(a)));
        let rocks = foliage.add_mesh_type(FoliageType::new(ROCK));
        rocks.add_instance(place(300.0, None));
        rocks.add_instance(place(400.0, Some(b)));
    }

    fn bindings(world: &World, actor: ActorId) -> Vec<Vec<(i32, Option<ComponentId>)>> {
        world
            .actor(actor)
            .foliage
            .as_ref()
            .unwrap()
            .mesh_types()
            .map(|(_, info)| {
                info.instances()
                    .iter()
                    .map(|i| (i.location.x.round() as i32, i.base))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_foliage_index_reserves_none() {
        let mut index = FoliageIndex::new();
        assert_eq!(index.index_of(None), 0);
        assert_eq!(index.index_of(Some(ComponentId::new(4))), 1);
        assert_eq!(index.index_of(Some(ComponentId::new(9))), 2);
        assert_eq!(index.index_of(Some(ComponentId::new(4))), 1);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_base_indices_round_trip() {
        let mut f = fixture();
        populate(&mut f);
        let mut before = bindings(&f.world, f.foliage);
        for group in &mut before {
            group.sort_by_key(|(x, _)| *x);
        }

        let mut stage = Stage::new("foliage.usda");
        stage.set_axes(StageAxes::new(UpAxis::Y, 1.0));
        write_foliage(&mut stage, "/Root/Foliage", &f.world, f.foliage, &f.registry, TimeCode::Default)
            .unwrap();

        let instancer = stage.prim_at_path("/Root/Foliage").unwrap();
        let refs = stage
            .get(instancer, attr::BASE_COMPONENT_REFERENCES, TimeCode::Default)
            .and_then(AttrValue::as_string_array)
            .unwrap()
            .to_vec();
        assert_eq!(refs, vec!["None", "Level.Hill.Mesh", "Level.Ledge.Mesh"]);

        let names = NameIndex::from_world(&f.world);
        let read = read_foliage(&stage, instancer, &mut f.world, f.foliage, &names, &f.registry)
            .unwrap();
        assert_eq!(read.added, 5);
        assert!(read.skipped.is_empty());

        let mut after = bindings(&f.world, f.foliage);
        for group in &mut after {
            group.sort_by_key(|(x, _)| *x);
        }
        assert_eq!(after, before);
    }

    #[test]
    fn test_trace_hit_overrides_stored_base() {
        let mut f = fixture();
        populate(&mut f);

        let mut stage = Stage::new("foliage.usda");
        write_foliage(&mut stage, "/Foliage", &f.world, f.foliage, &f.registry, TimeCode::Default)
            .unwrap();

        let land_class = f.registry.classes.actor(class::LANDSCAPE).unwrap().clone();
        let land = f.world.spawn_actor(&land_class, "Landscape");
        let ground = f.world.actor(land).root;
        f.world.component_mut(ground).data =
            ComponentData::Landscape(LandscapeData::new(Mesh::grid(Vec3::new(150.0, -100.0, 0.0), 200.0, 2)));

        let instancer = stage.prim_at_path("/Foliage").unwrap();
        let names = NameIndex::from_world(&f.world);
        read_foliage(&stage, instancer, &mut f.world, f.foliage, &names, &f.registry).unwrap();

        let trees = &bindings(&f.world, f.foliage)[0];
        let at = |x: i32| trees.iter().find(|(px, _)| *px == x).map(|(_, b)| *b);
        assert_eq!(at(200), Some(Some(ground)));
        assert_eq!(at(0), Some(Some(f.bases[0])));
    }

    #[test]
    fn test_point_instancer_scenario() {
        let usda = r#"#usda 1.0
(
    metersPerUnit = 0.01
    upAxis = "Z"
)

def PointInstancer "Foliage"
{
    int[] protoIndices = [0, 1, 0]
    point3f[] positions = [(0, 0, 0), (100, 0, 0), (200, 0, 0)]
    custom string[] unrealBaseComponentReferences = ["None", "Level.Hill.Mesh", "Level.Gone.Mesh"]
    custom int[] unrealBaseComponentIndices = [1, 2, 7]

    def Scope "Prototypes"
    {
        def Mesh "Tree"
        {
            custom string unrealAssetReference = "/Game/Foliage/Tree.Tree"
        }

        def Mesh "Rock"
        {
            custom string unrealAssetReference = "/Game/Foliage/Rock.Rock"
        }
    }
}
"#;
        let mut f = fixture();
        populate(&mut f);
        let stage = Stage::from_usda("scatter.usda", usda).unwrap();
        let instancer = stage.prim_at_path("/Foliage").unwrap();
        let names = NameIndex::from_world(&f.world);
        read_foliage(&stage, instancer, &mut f.world, f.foliage, &names, &f.registry).unwrap();

        let foliage = f.world.actor(f.foliage).foliage.as_ref().unwrap();
        assert_eq!(foliage.mesh_type_count(), 2);
        assert_eq!(foliage.info(0).unwrap().instance_count(), 2);
        assert_eq!(foliage.info(1).unwrap().instance_count(), 1);

        let trees = foliage.info(0).unwrap().instances();
        assert_eq!(trees[0].base, Some(f.bases[0]));
        // Out of range index means no base
        assert_eq!(trees[1].base, None);
        // Unresolved reference falls back to the foliage actor
        let rock = foliage.info(1).unwrap().instances()[0];
        assert_eq!(rock.base, Some(f.world.actor(f.foliage).root));
        assert!(!foliage.info(0).unwrap().needs_refresh());
    }

    #[test]
    fn test_unresolved_prototype_keeps_its_slot() {
        let usda = r#"#usda 1.0

def PointInstancer "Foliage"
{
    int[] protoIndices = [0, 1, 0, 2]
    point3f[] positions = [(0, 0, 0), (100, 0, 0), (200, 0, 0), (300, 0, 0)]

    def Scope "Prototypes"
    {
        def Mesh "Tree"
        {
            custom string unrealAssetReference = "/Game/Foliage/Tree.Tree"
        }

        def Mesh "Gone"
        {
            custom string unrealAssetReference = "/Game/Gone.Gone"
        }

        def Mesh "Rock"
        {
            custom string unrealAssetReference = "/Game/Foliage/Rock.Rock"
            custom string unrealMaterial = "/Game/M_Missing.M_Missing"
        }
    }
}
"#;
        let mut f = fixture();
        populate(&mut f);
        let stage = Stage::from_usda("scatter.usda", usda).unwrap();
        let instancer = stage.prim_at_path("/Foliage").unwrap();
        let names = NameIndex::from_world(&f.world);
        let read = read_foliage(&stage, instancer, &mut f.world, f.foliage, &names, &f.registry)
            .unwrap();

        assert_eq!(read.added, 3);
        assert_eq!(read.skipped.len(), 2);
        assert_eq!(read.skipped[0].0, "/Foliage/Prototypes/Gone");
        assert!(matches!(
            read.skipped[0].1,
            ConversionError::UnresolvableReference { kind: ReferenceKind::Asset, .. }
        ));
        assert!(matches!(
            read.skipped[1].1,
            ConversionError::UnresolvableReference { kind: ReferenceKind::Material, .. }
        ));

        // Previous mesh types are gone; Tree and Rock keep their own instances
        let foliage = f.world.actor(f.foliage).foliage.as_ref().unwrap();
        assert_eq!(foliage.mesh_type_count(), 2);
        let (tree, trees) = foliage.mesh_types().next().unwrap();
        assert_eq!(tree.mesh, TREE);
        assert_eq!(trees.instance_count(), 2);
        let rock = foliage.info(1).unwrap();
        assert_eq!(rock.instance_count(), 1);
        assert_eq!(rock.instances()[0].location.x.round() as i32, 300);
        assert_eq!(foliage.mesh_types().nth(1).unwrap().0.material_override, None);
    }
}
