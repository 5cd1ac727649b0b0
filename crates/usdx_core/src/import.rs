//! Document → world import.
//!
//! The walk visits the children of the stage's default prim (or its root
//! prims) depth first. Each prim is classified, resolved against the
//! components already in the world through a [`NameIndex`], and either bound
//! to an existing component, spawned, or skipped. A failure is scoped to the
//! prim that raised it: its subtree is marked visited, the error is recorded
//! in the [`ImportReport`] and the walk moves on to the next sibling.

use indexmap::IndexSet;

use crate::classify::{classify, ConversionMethod, NodeKind, PrimInfo, Usage};
use crate::document::{PrimId, Stage, TimeCode};
use crate::error::{ConversionError, ConversionResult, ReferenceKind};
use crate::geometry::brush_mesh::rebuild_brush_from_mesh;
use crate::geometry::foliage::read_foliage;
use crate::geometry::geom_mesh::read_mesh_description;
use crate::geometry::instancing::read_instanced_batch;
use crate::name_index::NameIndex;
use crate::registry::{Registry, ResolvedClass};
use crate::schema::{child, class, geom, visibility};
use crate::world::{join_folder_path, ActorId, ComponentData, ComponentId, World};
use crate::xform::read_local_transform;

/// A prim whose conversion failed.
#[derive(Debug)]
pub struct NodeFailure {
    pub path: String,
    pub error: ConversionError,
}

/// Outcome of one import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Prims marked visited, including consumed subtrees
    pub visited: usize,

    /// Path names of actors created by the run
    pub spawned_actors: Vec<String>,

    /// Path names of components created by the run, excluding actor roots
    pub spawned_components: Vec<String>,

    /// Path names of pre-existing components the run bound to
    pub reused: Vec<String>,

    pub failures: Vec<NodeFailure>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Where in the runtime hierarchy the walk currently is.
#[derive(Clone, Debug, Default)]
struct Scope {
    parent: Option<ComponentId>,
    folder: String,
}

/// State of one import walk.
pub struct ImportSession<'a> {
    stage: &'a Stage,
    world: &'a mut World,
    registry: &'a Registry,
    names: NameIndex,
    visited: IndexSet<PrimId>,
    report: ImportReport,
}

impl<'a> ImportSession<'a> {
    pub fn new(stage: &'a Stage, world: &'a mut World, registry: &'a Registry) -> Self {
        let names = NameIndex::from_world(world);
        Self {
            stage,
            world,
            registry,
            names,
            visited: IndexSet::new(),
            report: ImportReport::default(),
        }
    }

    pub fn names(&self) -> &NameIndex {
        &self.names
    }

    pub fn visited(&self) -> &IndexSet<PrimId> {
        &self.visited
    }

    pub fn report(&self) -> &ImportReport {
        &self.report
    }

    pub fn into_report(self) -> ImportReport {
        self.report
    }

    /// Walk the whole stage, then rebuild the world's brush geometry.
    pub fn run(&mut self) {
        let stage = self.stage;
        let roots: Vec<PrimId> = match stage.default_prim() {
            Some(default) => {
                self.mark(default);
                stage.children(default).to_vec()
            }
            None => stage.root_prims().to_vec(),
        };
        log::info!(
            "Importing {} into level {}",
            stage.identifier(),
            self.world.level_name()
        );

        self.walk_children(&roots, &Scope::default());
        self.world.build_geometry();
        self.report.visited = self.visited.len();

        log::info!(
            "Import done: {} prims visited, {} actors spawned, {} failures",
            self.report.visited,
            self.report.spawned_actors.len(),
            self.report.failures.len()
        );
    }

    /// Convert `children` in order, with foliage actors moved last.
    fn walk_children(&mut self, children: &[PrimId], scope: &Scope) {
        let mut classified: Vec<(PrimId, PrimInfo)> = children
            .iter()
            .filter(|&&prim| !self.visited.contains(&prim))
            .map(|&prim| (prim, classify(self.stage, prim, self.registry)))
            .collect();
        // Stable: relative order within each group is kept
        classified.sort_by_key(|(_, info)| info.is_foliage_actor());

        for (prim, info) in classified {
            // An earlier sibling's handler may have consumed this prim
            if self.visited.contains(&prim) {
                continue;
            }
            self.convert_prim(prim, &info, scope);
        }
    }

    fn convert_prim(&mut self, prim: PrimId, info: &PrimInfo, scope: &Scope) {
        if info.kind == NodeKind::Folder {
            self.convert_folder(prim, info, scope);
            return;
        }
        if info.method == ConversionMethod::Ignore {
            log::debug!("Ignoring {}", self.stage.prim(prim).path);
            self.walk_inert(prim, scope);
            return;
        }

        let result = match info.usage {
            Usage::Actor => self.convert_actor(prim, info, scope),
            Usage::Component => self.convert_component(prim, info, scope),
            Usage::Folder | Usage::Data => {
                self.walk_inert(prim, scope);
                return;
            }
        };

        if let Err(error) = result {
            self.fail(prim, error);
        }
    }

    fn convert_folder(&mut self, prim: PrimId, info: &PrimInfo, scope: &Scope) {
        self.mark(prim);
        let segment = if info.folder_path.is_empty() {
            self.stage.prim(prim).name.as_str()
        } else {
            info.folder_path.as_str()
        };
        let folder = join_folder_path(&scope.folder, segment);
        self.world.add_folder(&folder);

        let inner = Scope {
            parent: scope.parent,
            folder,
        };
        let children = self.stage.children(prim).to_vec();
        self.walk_children(&children, &inner);
    }

    /// Mark a prim that produces no runtime object and walk on below it.
    fn walk_inert(&mut self, prim: PrimId, scope: &Scope) {
        self.mark(prim);
        let children = self.stage.children(prim).to_vec();
        self.walk_children(&children, scope);
    }

    fn convert_actor(
        &mut self,
        prim: PrimId,
        info: &PrimInfo,
        scope: &Scope,
    ) -> ConversionResult<()> {
        let key = self.instance_key(prim, info);
        let actor = match self.lookup(&key) {
            Some(existing) => {
                let owner = self.world.component(existing).owner;
                self.reuse(existing);
                owner
            }
            None => self.spawn_actor(prim, info, &key, scope)?,
        };
        let root = self.world.actor(actor).root;
        self.convert_component_node(prim, info, root, scope)
    }

    fn convert_component(
        &mut self,
        prim: PrimId,
        info: &PrimInfo,
        scope: &Scope,
    ) -> ConversionResult<()> {
        let Some(parent) = scope.parent else {
            return Err(ConversionError::OwnerlessConversion {
                prim: self.stage.prim(prim).path.clone(),
            });
        };
        let owner = self.world.component(parent).owner;
        let owner_path = self.world.actor_path_name(owner);

        // Component keys are scoped to their owner unless already level-qualified
        let level_prefix = format!("{}.", self.world.level_name());
        let key = if info.instance_key.is_empty() {
            format!("{}.{}", owner_path, self.stage.prim(prim).name)
        } else if info.instance_key.starts_with(&level_prefix) {
            info.instance_key.clone()
        } else {
            format!("{}.{}", owner_path, info.instance_key)
        };

        let component = match self.names.get(&key) {
            Some(existing) => {
                self.reuse(existing);
                existing
            }
            None => self.spawn_component(prim, info, &key, owner)?,
        };
        self.convert_component_node(prim, info, component, scope)
    }

    /// Shared tail of actor and component conversion.
    fn convert_component_node(
        &mut self,
        prim: PrimId,
        info: &PrimInfo,
        component: ComponentId,
        scope: &Scope,
    ) -> ConversionResult<()> {
        if let Some(parent) = scope.parent {
            let already = self.world.component(component).parent == Some(parent);
            if parent != component && !already {
                self.world.attach(component, parent);
            }
        }

        self.convert_kind(prim, info, component)?;

        if info.kind != NodeKind::SolidGeometry {
            if let Some(token) = self.stage.get_str(prim, geom::VISIBILITY) {
                self.world.component_mut(component).visible = token != visibility::INVISIBLE;
            }
        }

        if let Some(transform) = read_local_transform(self.stage, prim, TimeCode::Default) {
            self.world.component_mut(component).relative = transform;
        }
        self.mark(prim);

        let inner = Scope {
            parent: Some(component),
            folder: scope.folder.clone(),
        };
        let children = self.stage.children(prim).to_vec();
        self.walk_children(&children, &inner);
        Ok(())
    }

    fn convert_kind(
        &mut self,
        prim: PrimId,
        info: &PrimInfo,
        component: ComponentId,
    ) -> ConversionResult<()> {
        let stage = self.stage;
        let path = stage.prim(prim).path.clone();

        match info.kind {
            NodeKind::StaticMesh | NodeKind::SkeletalMesh => {
                if let Some(unresolved) = info.unresolved(ReferenceKind::Asset) {
                    return Err(unresolved.to_error());
                }
                let slot = self
                    .world
                    .component_mut(component)
                    .data
                    .mesh_slot_mut()
                    .ok_or_else(|| ConversionError::mismatch(path, "mesh component"))?;
                if let Some(asset) = &info.asset {
                    slot.mesh = Some(asset.clone());
                }
                if let Some(material) = &info.material {
                    slot.set_material(0, Some(material.clone()));
                }
            }
            NodeKind::SolidGeometry => {
                let desc = read_mesh_description(stage, prim, TimeCode::Default)?;
                let owner = self.world.component(component).owner;
                let pivot = self.world.actor(owner).pivot_offset;
                let hidden = stage.get_str(prim, geom::VISIBILITY) == Some(visibility::INVISIBLE);

                let target = self.world.component_mut(component);
                let ComponentData::Brush(brush) = &mut target.data else {
                    return Err(ConversionError::mismatch(path, "brush component"));
                };
                rebuild_brush_from_mesh(&mut brush.model, &desc, pivot)?;
                brush.op = info.brush_op;
                target.hidden_in_editor = hidden;

                self.mark_subtree(prim);
            }
            NodeKind::InstancedBatch => {
                let target = self.world.component_mut(component);
                let ComponentData::InstancedBatch(batch) = &mut target.data else {
                    return Err(ConversionError::mismatch(path, "instanced batch component"));
                };
                let count = read_instanced_batch(stage, prim, batch, self.registry)?;
                log::debug!("Read {} batch instances into {}", count, path);

                if let Some(instancer) = stage.child_named(prim, child::HISM_INSTANCE) {
                    self.mark_subtree(instancer);
                }
            }
            NodeKind::ScatterSystem => {
                let owner = self.world.component(component).owner;
                let actor = if self.world.actor(owner).foliage.is_some() {
                    owner
                } else {
                    self.foliage_actor()?
                };
                let read = read_foliage(stage, prim, self.world, actor, &self.names, self.registry)?;
                log::debug!("Read {} foliage instances from {}", read.added, path);
                for (prototype, error) in read.skipped {
                    self.report.failures.push(NodeFailure {
                        path: prototype,
                        error,
                    });
                }

                if let Some(prototypes) = stage.child_named(prim, child::PROTOTYPES) {
                    self.mark_subtree(prototypes);
                }
            }
            NodeKind::None | NodeKind::Folder | NodeKind::Scene => {}
        }
        Ok(())
    }

    fn spawn_actor(
        &mut self,
        prim: PrimId,
        info: &PrimInfo,
        key: &str,
        scope: &Scope,
    ) -> ConversionResult<ActorId> {
        let class_path = match info.runtime_class.as_deref() {
            Some(path) => path,
            None => return Err(self.unresolved_class(info, key)),
        };
        let actor_class = match self.registry.classes.resolve(class_path) {
            Some(ResolvedClass::Actor(actor_class)) => actor_class,
            _ => return Err(ConversionError::unresolved(ReferenceKind::Class, class_path)),
        };

        let actor = if class_path == class::INSTANCED_FOLIAGE_ACTOR {
            self.world.get_or_spawn_foliage_actor(actor_class)
        } else {
            let label = self.label_for(prim, key);
            self.world.spawn_actor(actor_class, &label)
        };

        let folder = join_folder_path(&scope.folder, &info.folder_path);
        if !folder.is_empty() {
            self.world.set_actor_folder(actor, &folder);
        }

        let root = self.world.actor(actor).root;
        self.names.insert(key, root);
        self.names.insert(self.world.actor_path_name(actor), root);
        for &id in &self.world.actor(actor).components {
            self.names.insert(self.world.component_path_name(id), id);
        }

        let actor_path = self.world.actor_path_name(actor);
        log::debug!("Spawned {} for {}", actor_path, self.stage.prim(prim).path);
        self.report.spawned_actors.push(actor_path);
        Ok(actor)
    }

    fn spawn_component(
        &mut self,
        prim: PrimId,
        info: &PrimInfo,
        key: &str,
        owner: ActorId,
    ) -> ConversionResult<ComponentId> {
        if info.method != ConversionMethod::Spawn {
            return Err(ConversionError::unresolved(ReferenceKind::Instance, key));
        }
        let class_path = match info.runtime_class.as_deref() {
            Some(path) => path,
            None => return Err(self.unresolved_class(info, key)),
        };
        let component_class = match self.registry.classes.resolve(class_path) {
            Some(ResolvedClass::Component(component_class)) => component_class,
            _ => return Err(ConversionError::unresolved(ReferenceKind::Class, class_path)),
        };

        let name = &self.stage.prim(prim).name;
        let id = self
            .world
            .add_component(owner, name, &component_class.path, component_class.kind);

        let path = self.world.component_path_name(id);
        self.names.insert(key, id);
        self.names.insert(path.clone(), id);
        self.report.spawned_components.push(path);
        Ok(id)
    }

    /// The level's foliage actor, spawned when the level has none.
    fn foliage_actor(&mut self) -> ConversionResult<ActorId> {
        let foliage_class = self
            .registry
            .classes
            .actor(class::INSTANCED_FOLIAGE_ACTOR)
            .ok_or_else(|| {
                ConversionError::unresolved(ReferenceKind::Class, class::INSTANCED_FOLIAGE_ACTOR)
            })?;
        let existed = self.world.foliage_actor().is_some();
        let actor = self.world.get_or_spawn_foliage_actor(foliage_class);
        if !existed {
            let root = self.world.actor(actor).root;
            self.names.insert(self.world.actor_path_name(actor), root);
            self.report.spawned_actors.push(self.world.actor_path_name(actor));
        }
        Ok(actor)
    }

    /// Authored key, or `<level>.<prim name>`.
    fn instance_key(&self, prim: PrimId, info: &PrimInfo) -> String {
        if info.instance_key.is_empty() {
            format!("{}.{}", self.world.level_name(), self.stage.prim(prim).name)
        } else {
            info.instance_key.clone()
        }
    }

    fn lookup(&self, key: &str) -> Option<ComponentId> {
        self.names
            .get(key)
            .or_else(|| self.names.get(&format!("{}.{}", self.world.level_name(), key)))
    }

    /// Actor label from a `<level>.<label>` key, else the prim name.
    fn label_for(&self, prim: PrimId, key: &str) -> String {
        let prefix = format!("{}.", self.world.level_name());
        match key.strip_prefix(&prefix) {
            Some(label) if !label.is_empty() && !label.contains('.') => label.to_string(),
            _ => self.stage.prim(prim).name.clone(),
        }
    }

    fn unresolved_class(&self, info: &PrimInfo, key: &str) -> ConversionError {
        match info.unresolved(ReferenceKind::Class) {
            Some(unresolved) => unresolved.to_error(),
            None => ConversionError::unresolved(ReferenceKind::Instance, key),
        }
    }

    fn reuse(&mut self, component: ComponentId) {
        self.report
            .reused
            .push(self.world.component_path_name(component));
    }

    fn fail(&mut self, prim: PrimId, error: ConversionError) {
        let path = self.stage.prim(prim).path.clone();
        log::warn!("Failed to import {}: {}", path, error);
        self.mark_subtree(prim);
        self.report.failures.push(NodeFailure { path, error });
    }

    fn mark(&mut self, prim: PrimId) {
        self.visited.insert(prim);
    }

    fn mark_subtree(&mut self, prim: PrimId) {
        for id in self.stage.subtree(prim) {
            self.visited.insert(id);
        }
    }
}

/// Import every prim of `stage` into `world`.
pub fn import_stage(stage: &Stage, world: &mut World, registry: &Registry) -> ImportReport {
    let mut session = ImportSession::new(stage, world, registry);
    session.run();
    session.into_report()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BrushOp, MeshDescription, StaticMesh};
    use crate::world::ComponentKind;
    use usdx_math::Vec3;

    const CUBE: &str = r#"#usda 1.0
(
    defaultPrim = "Root"
    metersPerUnit = 0.01
    upAxis = "Z"
)

def Xform "Root"
{
    def Xform "Cube1"
    {
        custom string unrealPrimUsage = "actor"
        custom string unrealConversionMethod = "spawn"
        custom string unrealClassReference = "/Script/Engine.StaticMeshActor"
        custom string unrealInstanceReference = "Level.Cube1"
        double3 xformOp:translate = (100, 0, 0)
        uniform token[] xformOpOrder = ["xformOp:translate"]

        def Mesh "Mesh"
        {
            custom string unrealPrimUsage = "component"
            custom string unrealConversionMethod = "spawn"
            custom string unrealInstanceReference = "Level.Cube1.Mesh"
            custom string unrealAssetReference = "/Game/Meshes/Cube.Cube"
        }
    }
}
"#;

    fn registry() -> Registry {
        let mut registry = Registry::default();
        registry.assets.add_static_mesh(StaticMesh::new(
            "/Game/Meshes/Cube.Cube",
            MeshDescription::new(),
        ));
        registry
    }

    #[test]
    fn test_cube_scenario() {
        let stage = Stage::from_usda("cube.usda", CUBE).unwrap();
        let registry = registry();
        let mut world = World::new("Level");

        let mut session = ImportSession::new(&stage, &mut world, &registry);
        session.run();
        assert_eq!(session.names().len(), 2);
        let report = session.into_report();
        assert!(report.is_clean(), "{:?}", report.failures);

        assert_eq!(world.actor_count(), 1);
        assert_eq!(world.component_count(), 1);
        let actor = world.find_actor("Cube1").unwrap();
        assert_eq!(world.actor(actor).folder_path, "");

        let root = world.component(world.actor(actor).root);
        assert_eq!(root.kind(), ComponentKind::StaticMesh);
        let slot = root.data.mesh_slot().unwrap();
        assert_eq!(slot.mesh.as_deref(), Some("/Game/Meshes/Cube.Cube"));
        assert!((root.relative.translation - Vec3::new(100.0, 0.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let stage = Stage::from_usda("cube.usda", CUBE).unwrap();
        let registry = registry();
        let mut world = World::new("Level");

        let first = import_stage(&stage, &mut world, &registry);
        assert_eq!(first.spawned_actors, vec!["Level.Cube1".to_string()]);

        let second = import_stage(&stage, &mut world, &registry);
        assert!(second.spawned_actors.is_empty());
        assert!(second.spawned_components.is_empty());
        assert_eq!(world.actor_count(), 1);
        assert_eq!(world.component_count(), 1);
    }

    #[test]
    fn test_every_prim_visited_once() {
        let usda = r#"#usda 1.0

def Scope "Props"
{
    custom string unrealPrimUsage = "folder"

    def Xform "Lamp"
    {
        custom string unrealPrimUsage = "actor"
        custom string unrealConversionMethod = "spawn"
        custom string unrealClassReference = "/Script/Engine.Actor"

        def Xform "Shade"
        {
            custom string unrealPrimUsage = "component"
            custom string unrealConversionMethod = "spawn"
            custom string unrealClassReference = "/Script/Engine.SceneComponent"
        }
    }

    def Xform "Broken"
    {
        custom string unrealPrimUsage = "actor"
        custom string unrealConversionMethod = "spawn"
        custom string unrealClassReference = "/Script/Missing.Thing"

        def Xform "Child"
        {
        }
    }
}

def Xform "Loose"
{
}
"#;
        let stage = Stage::from_usda("visit.usda", usda).unwrap();
        let registry = Registry::default();
        let mut world = World::new("Level");

        let mut session = ImportSession::new(&stage, &mut world, &registry);
        session.run();
        assert_eq!(session.visited().len(), stage.prim_count());

        let report = session.into_report();
        assert_eq!(report.visited, stage.prim_count());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "/Props/Broken");
        assert!(matches!(
            report.failures[0].error,
            ConversionError::UnresolvableReference {
                kind: ReferenceKind::Class,
                ..
            }
        ));

        let lamp = world.find_actor("Lamp").unwrap();
        assert_eq!(world.actor(lamp).folder_path, "Props");
        assert_eq!(world.actor(lamp).components.len(), 2);
        assert!(world.has_folder("Props"));
    }

    #[test]
    fn test_ignore_does_not_propagate() {
        let usda = r#"#usda 1.0

def Xform "Skipped"
{
    custom string unrealPrimUsage = "actor"
    custom string unrealConversionMethod = "ignore"
    custom string unrealClassReference = "/Script/Engine.Actor"

    def Xform "Kept"
    {
        custom string unrealPrimUsage = "actor"
        custom string unrealConversionMethod = "spawn"
        custom string unrealClassReference = "/Script/Engine.Actor"
    }
}
"#;
        let stage = Stage::from_usda("ignore.usda", usda).unwrap();
        let registry = Registry::default();
        let mut world = World::new("Level");

        let report = import_stage(&stage, &mut world, &registry);
        assert!(report.is_clean());
        assert!(world.find_actor("Skipped").is_none());
        assert!(world.find_actor("Kept").is_some());
        assert_eq!(report.visited, 2);
    }

    #[test]
    fn test_component_without_owner_fails() {
        let usda = r#"#usda 1.0

def Xform "Orphan"
{
    custom string unrealPrimUsage = "component"
    custom string unrealConversionMethod = "spawn"
    custom string unrealClassReference = "/Script/Engine.SceneComponent"
}
"#;
        let stage = Stage::from_usda("orphan.usda", usda).unwrap();
        let registry = Registry::default();
        let mut world = World::new("Level");

        let report = import_stage(&stage, &mut world, &registry);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            ConversionError::OwnerlessConversion { .. }
        ));
        assert_eq!(world.actor_count(), 0);
    }

    #[test]
    fn test_foliage_deferred_after_siblings() {
        let usda = r#"#usda 1.0

def PointInstancer "Foliage"
{
    custom string unrealPrimUsage = "actor"
    custom string unrealConversionMethod = "spawn"
    custom string unrealClassReference = "/Script/Foliage.InstancedFoliageActor"
    int[] protoIndices = [0]
    point3f[] positions = [(20, -20, 5)]
    custom string[] unrealBaseComponentReferences = ["None", "Level.Ground.RootComponent"]
    custom int[] unrealBaseComponentIndices = [1]
    rel prototypes = [</Foliage/Prototypes/Tree>]

    def Scope "Prototypes"
    {
        def Mesh "Tree"
        {
            custom string unrealAssetReference = "/Game/Meshes/Cube.Cube"
        }
    }
}

def Xform "Ground"
{
    custom string unrealPrimUsage = "actor"
    custom string unrealConversionMethod = "spawn"
    custom string unrealClassReference = "/Script/Landscape.Landscape"
}
"#;
        let stage = Stage::from_usda("foliage.usda", usda).unwrap();
        let registry = registry();
        let mut world = World::new("Level");

        let mut session = ImportSession::new(&stage, &mut world, &registry);
        session.run();
        assert_eq!(session.visited().len(), stage.prim_count());
        let report = session.into_report();
        assert!(report.is_clean(), "{:?}", report.failures);

        let ground = world.find_actor("Ground").unwrap();
        let ground_root = world.actor(ground).root;
        let foliage = world.foliage_actor().unwrap();
        let data = world.actor(foliage).foliage.as_ref().unwrap();
        assert_eq!(data.mesh_type_count(), 1);
        let info = data.info(0).unwrap();
        assert_eq!(info.instance_count(), 1);
        assert_eq!(info.instances()[0].base, Some(ground_root));
        assert_eq!(
            report.spawned_actors,
            vec!["Level.Ground".to_string(), "Level.InstancedFoliageActor".to_string()]
        );
    }

    #[test]
    fn test_unresolved_foliage_prototype_is_reported() {
        let usda = r#"#usda 1.0

def PointInstancer "Foliage"
{
    custom string unrealPrimUsage = "actor"
    custom string unrealConversionMethod = "spawn"
    custom string unrealClassReference = "/Script/Foliage.InstancedFoliageActor"
    int[] protoIndices = [0, 1, 0]
    point3f[] positions = [(0, 0, 0), (100, 0, 0), (200, 0, 0)]

    def Scope "Prototypes"
    {
        def Mesh "Cube"
        {
            custom string unrealAssetReference = "/Game/Meshes/Cube.Cube"
        }

        def Mesh "Gone"
        {
            custom string unrealAssetReference = "/Game/Gone.Gone"
        }
    }
}
"#;
        let stage = Stage::from_usda("foliage.usda", usda).unwrap();
        let registry = registry();
        let mut world = World::new("Level");

        let report = import_stage(&stage, &mut world, &registry);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "/Foliage/Prototypes/Gone");

        let foliage = world.foliage_actor().unwrap();
        let data = world.actor(foliage).foliage.as_ref().unwrap();
        assert_eq!(data.mesh_type_count(), 1);
        assert_eq!(data.info(0).unwrap().instance_count(), 2);
    }

    #[test]
    fn test_solid_geometry_rebuilds_brush() {
        let usda = r#"#usda 1.0

def Mesh "Wall"
{
    custom string unrealPrimUsage = "actor"
    custom string unrealConversionMethod = "spawn"
    custom string unrealClassReference = "/Script/Engine.Brush"
    custom string unrealPrimType = "BSP"
    custom string unrealBSPBrushType = "subtract"
    token visibility = "invisible"
    point3f[] points = [(0, 0, 0), (100, 0, 0), (100, 0, 100), (0, 0, 100)]
    int[] faceVertexCounts = [4]
    int[] faceVertexIndices = [0, 1, 2, 3]
}
"#;
        let stage = Stage::from_usda("wall.usda", usda).unwrap();
        let registry = Registry::default();
        let mut world = World::new("Level");

        let report = import_stage(&stage, &mut world, &registry);
        assert!(report.is_clean(), "{:?}", report.failures);

        let wall = world.find_actor("Wall").unwrap();
        let root = world.component(world.actor(wall).root);
        assert!(root.hidden_in_editor);
        let ComponentData::Brush(brush) = &root.data else {
            panic!("expected a brush");
        };
        assert_eq!(brush.op, BrushOp::Subtract);
        assert_eq!(brush.model.polys.len(), 2);
        assert_eq!(brush.model.merged_face_count(), 1);
        assert!(brush.render.is_some());
    }
}
