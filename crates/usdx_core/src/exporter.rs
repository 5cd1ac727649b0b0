//! Whole-level export.
//!
//! Lays a world out under one default prim:
//!
//! ```text
//! /<root>/<folder>/<sub folder>/<actor label>/<child component>/...
//! ```
//!
//! Folders become `Scope` prims tagged with their own path segment. Each
//! component becomes one prim typed by its kind; an actor's root component is
//! the actor prim itself. The foliage actor is written as a single point
//! instancer.

use indexmap::IndexSet;

use crate::config::ConversionSettings;
use crate::document::{make_valid_identifier, AttrValue, Stage, TimeCode};
use crate::error::ConversionResult;
use crate::export::{
    convert_brush_component, convert_hism_component, convert_instanced_foliage_actor,
    convert_mesh_component, convert_scene_component,
};
use crate::import::NodeFailure;
use crate::registry::Registry;
use crate::schema::{attr, prim_type, usage};
use crate::world::{ActorId, ComponentId, ComponentKind, World};

/// What a level export wrote.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Prim paths written, one per actor or component
    pub exported: Vec<String>,
    pub failures: Vec<NodeFailure>,
}

/// Writes every actor of a world to a stage.
pub struct LevelExporter<'a> {
    world: &'a World,
    registry: &'a Registry,
    settings: &'a ConversionSettings,
    time: TimeCode,
    used_paths: IndexSet<String>,
    report: ExportReport,
}

impl<'a> LevelExporter<'a> {
    pub fn new(world: &'a World, registry: &'a Registry, settings: &'a ConversionSettings) -> Self {
        Self {
            world,
            registry,
            settings,
            time: TimeCode::Default,
            used_paths: IndexSet::new(),
            report: ExportReport::default(),
        }
    }

    pub fn with_time(mut self, time: TimeCode) -> Self {
        self.time = time;
        self
    }

    /// Export into `stage`, which receives the configured axes and a default
    /// prim named after the settings' root.
    pub fn export(mut self, stage: &mut Stage) -> ConversionResult<ExportReport> {
        stage.set_axes(self.settings.stage.axes());
        let root_path = format!("/{}", make_valid_identifier(&self.settings.root_prim_name));
        let root = stage.define_prim(&root_path, prim_type::XFORM)?;
        stage.set_default_prim(root);

        if self.settings.export_actor_folders {
            for folder in self.world.folder_names() {
                self.write_folder(stage, &root_path, &folder)?;
            }
        }

        let world = self.world;
        for (actor, _) in world.actors() {
            self.export_actor(stage, &root_path, actor);
        }

        log::info!(
            "Exported {} prims from level {} ({} failures)",
            self.report.exported.len(),
            world.level_name(),
            self.report.failures.len()
        );
        Ok(self.report)
    }

    fn folder_prim_path(&self, root_path: &str, folder: &str) -> String {
        folder
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(root_path.to_string(), |path, segment| {
                format!("{}/{}", path, make_valid_identifier(segment))
            })
    }

    fn write_folder(&mut self, stage: &mut Stage, root_path: &str, folder: &str) -> ConversionResult<()> {
        let path = self.folder_prim_path(root_path, folder);
        let prim = stage.define_prim(&path, prim_type::SCOPE)?;
        let tail = folder.rsplit('/').next().unwrap_or(folder);

        stage.set_custom(
            prim,
            attr::PRIM_USAGE,
            AttrValue::String(usage::FOLDER.to_string()),
            TimeCode::Default,
        );
        stage.set_custom(
            prim,
            attr::ACTOR_FOLDER_PATH,
            AttrValue::String(tail.to_string()),
            TimeCode::Default,
        );
        self.used_paths.insert(path);
        Ok(())
    }

    fn export_actor(&mut self, stage: &mut Stage, root_path: &str, actor: ActorId) {
        let world = self.world;
        let data = world.actor(actor);
        let parent = if self.settings.export_actor_folders {
            self.folder_prim_path(root_path, &data.folder_path)
        } else {
            root_path.to_string()
        };
        let path = self.claim_path(&parent, &data.label);

        if data.foliage.is_some() {
            let result = convert_instanced_foliage_actor(
                stage,
                world,
                self.registry,
                actor,
                &path,
                self.time,
            );
            self.record(path, result.map(|_| ()));
            return;
        }

        self.export_component(stage, data.root, path.clone());
        // Components never attached below the root still get written
        for &component in &data.components {
            if component != data.root && world.component(component).parent.is_none() {
                let child_path = self.claim_path(&path, &world.component(component).name);
                self.export_component(stage, component, child_path);
            }
        }
    }

    fn export_component(&mut self, stage: &mut Stage, component: ComponentId, path: String) {
        let world = self.world;
        let node = world.component(component);
        let result = match node.kind() {
            ComponentKind::StaticMesh | ComponentKind::SkeletalMesh => {
                convert_mesh_component(stage, world, component, &path, self.time)
            }
            ComponentKind::Brush => convert_brush_component(stage, world, component, &path, self.time),
            ComponentKind::InstancedBatch => convert_hism_component(
                stage,
                world,
                self.registry,
                component,
                &path,
                self.time,
            ),
            ComponentKind::Scene | ComponentKind::Landscape => {
                convert_scene_component(stage, world, component, &path, self.time)
            }
        };
        let written = result.is_ok();
        self.record(path.clone(), result.map(|_| ()));
        if !written {
            return;
        }

        for &child in &node.children {
            let child_path = self.claim_path(&path, &world.component(child).name);
            self.export_component(stage, child, child_path);
        }
    }

    /// A unique child path of `parent` for `name`.
    fn claim_path(&mut self, parent: &str, name: &str) -> String {
        let base = format!("{}/{}", parent, make_valid_identifier(name));
        let mut path = base.clone();
        let mut suffix = 1;
        while self.used_paths.contains(&path) {
            path = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        self.used_paths.insert(path.clone());
        path
    }

    fn record(&mut self, path: String, result: ConversionResult<()>) {
        match result {
            Ok(()) => self.report.exported.push(path),
            Err(error) => {
                log::warn!("Failed to export {}: {}", path, error);
                self.report.failures.push(NodeFailure { path, error });
            }
        }
    }
}

/// Export `world` into `stage` with `settings`.
pub fn export_world(
    stage: &mut Stage,
    world: &World,
    registry: &Registry,
    settings: &ConversionSettings,
    time: TimeCode,
) -> ConversionResult<ExportReport> {
    LevelExporter::new(world, registry, settings)
        .with_time(time)
        .export(stage)
}
