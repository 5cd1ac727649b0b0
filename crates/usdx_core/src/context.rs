//! Stateful conversion façade around one open stage.
//!
//! A [`ConversionContext`] owns a world, the registries its references
//! resolve against, and at most one open stage shared through a
//! [`StageCache`]. Opening a new root layer releases the previous stage. A
//! stage the context put into the cache is erased from it again on release;
//! a stage that was already cached is left there.

use std::path::Path;
use std::rc::Rc;

use crate::config::ConversionSettings;
use crate::document::{Stage, StageCache, StageRef, TimeCode};
use crate::error::{ConversionError, ConversionResult};
use crate::export;
use crate::exporter::{ExportReport, LevelExporter};
use crate::import::{import_stage, ImportReport};
use crate::registry::Registry;
use crate::world::{path_is_child_of, ActorFolder, ActorId, ComponentId, World};

pub struct ConversionContext {
    cache: Rc<StageCache>,
    stage: Option<StageRef>,
    erase_from_cache: bool,
    world: World,
    registry: Registry,
    settings: ConversionSettings,
}

impl ConversionContext {
    pub fn new(world: World, registry: Registry, cache: Rc<StageCache>) -> Self {
        Self {
            cache,
            stage: None,
            erase_from_cache: false,
            world,
            registry,
            settings: ConversionSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ConversionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    /// The open stage, if any.
    pub fn stage(&self) -> Option<StageRef> {
        self.stage.clone()
    }

    /// Open `path` as the stage's root layer, releasing any previous stage.
    ///
    /// A cached stage with the same identifier is reused. Otherwise the file
    /// is read if it exists, or a new empty stage is created with the
    /// configured axes.
    pub fn set_stage_root_layer(&mut self, path: impl AsRef<Path>) -> ConversionResult<()> {
        self.cleanup();

        let identifier = path.as_ref().to_string_lossy().to_string();
        if let Some(cached) = self.cache.find(&identifier) {
            log::debug!("Reusing cached stage {}", identifier);
            self.stage = Some(cached);
            self.erase_from_cache = false;
            return Ok(());
        }

        let stage = if path.as_ref().exists() {
            Stage::open(path.as_ref())?
        } else {
            let mut stage = Stage::new(identifier.as_str());
            stage.set_axes(self.settings.stage.axes());
            log::info!("Created stage {}", identifier);
            stage
        };
        self.stage = Some(self.cache.insert(stage));
        self.erase_from_cache = true;
        Ok(())
    }

    /// Direct edits to `layer`, a layer of the open stage.
    pub fn set_edit_target(&mut self, layer: impl AsRef<Path>) -> ConversionResult<()> {
        let stage = self.active_stage()?;
        let layer = layer.as_ref().to_string_lossy();
        stage.borrow_mut().set_edit_target(&layer)?;
        Ok(())
    }

    /// Release the open stage. Calling it again does nothing.
    pub fn cleanup(&mut self) {
        let Some(stage) = self.stage.take() else {
            return;
        };
        if self.erase_from_cache {
            let identifier = stage.borrow().identifier().to_string();
            self.cache.erase(&identifier);
            log::debug!("Released stage {}", identifier);
        }
        self.erase_from_cache = false;
    }

    /// Write the open stage to its root layer.
    pub fn save(&self) -> ConversionResult<()> {
        self.active_stage()?.borrow().save()?;
        Ok(())
    }

    pub fn convert_scene_component(
        &self,
        component: ComponentId,
        prim_path: &str,
    ) -> ConversionResult<()> {
        let stage = self.stage_with_prim(prim_path)?;
        let mut stage = stage.borrow_mut();
        export::convert_scene_component(
            &mut stage,
            &self.world,
            component,
            prim_path,
            TimeCode::Default,
        )?;
        Ok(())
    }

    pub fn convert_mesh_component(
        &self,
        component: ComponentId,
        prim_path: &str,
    ) -> ConversionResult<()> {
        let stage = self.stage_with_prim(prim_path)?;
        let mut stage = stage.borrow_mut();
        export::convert_mesh_component(
            &mut stage,
            &self.world,
            component,
            prim_path,
            TimeCode::Default,
        )?;
        Ok(())
    }

    pub fn convert_brush_component(
        &self,
        component: ComponentId,
        prim_path: &str,
    ) -> ConversionResult<()> {
        let stage = self.stage_with_prim(prim_path)?;
        let mut stage = stage.borrow_mut();
        export::convert_brush_component(
            &mut stage,
            &self.world,
            component,
            prim_path,
            TimeCode::Default,
        )?;
        Ok(())
    }

    pub fn convert_hism_component(
        &self,
        component: ComponentId,
        prim_path: &str,
        time: TimeCode,
    ) -> ConversionResult<()> {
        let stage = self.stage_with_prim(prim_path)?;
        let mut stage = stage.borrow_mut();
        export::convert_hism_component(
            &mut stage,
            &self.world,
            &self.registry,
            component,
            prim_path,
            time,
        )?;
        Ok(())
    }

    pub fn convert_instanced_foliage_actor(
        &self,
        actor: ActorId,
        prim_path: &str,
        time: TimeCode,
    ) -> ConversionResult<()> {
        let stage = self.stage_with_prim(prim_path)?;
        let mut stage = stage.borrow_mut();
        export::convert_instanced_foliage_actor(
            &mut stage,
            &self.world,
            &self.registry,
            actor,
            prim_path,
            time,
        )?;
        Ok(())
    }

    /// Import the open stage into the world.
    pub fn import_into_world(&mut self) -> ConversionResult<ImportReport> {
        let stage = self.active_stage()?;
        let stage = stage.borrow();
        Ok(import_stage(&stage, &mut self.world, &self.registry))
    }

    /// Export the whole world into the open stage.
    pub fn export_world(&self, time: TimeCode) -> ConversionResult<ExportReport> {
        let stage = self.active_stage()?;
        let mut stage = stage.borrow_mut();
        LevelExporter::new(&self.world, &self.registry, &self.settings)
            .with_time(time)
            .export(&mut stage)
    }

    /// The world's folders as a tree under a `Root` node.
    pub fn world_root_folder(&self) -> ActorFolder {
        self.world.folder_tree()
    }

    pub fn path_is_child_of(&self, child: &str, parent: &str) -> bool {
        path_is_child_of(child, parent)
    }

    pub fn world_folder_names(&self) -> Vec<String> {
        self.world.folder_names()
    }

    fn active_stage(&self) -> ConversionResult<StageRef> {
        self.stage.clone().ok_or(ConversionError::NoActiveDocument)
    }

    /// The open stage, provided it has a prim at `path`.
    fn stage_with_prim(&self, path: &str) -> ConversionResult<StageRef> {
        let stage = self.active_stage()?;
        if stage.borrow().prim_at_path(path).is_none() {
            return Err(ConversionError::MissingPrim(path.to_string()));
        }
        Ok(stage)
    }
}

impl Drop for ConversionContext {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::AttrValue;
    use crate::schema::{attr, class, prim_type};
    use usdx_math::UpAxis;

    fn context(cache: &Rc<StageCache>) -> ConversionContext {
        let registry = Registry::default();
        let mut world = World::new("Level");
        let cube = world.spawn_actor(registry.classes.actor(class::STATIC_MESH_ACTOR).unwrap(), "Cube1");
        world.set_actor_folder(cube, "Props/Rocks");
        ConversionContext::new(world, registry, Rc::clone(cache))
    }

    #[test]
    fn test_conversion_without_stage() {
        let cache = Rc::new(StageCache::new());
        let mut ctx = context(&cache);
        let cube = ctx.world().find_actor("Cube1").unwrap();
        let root = ctx.world().actor(cube).root;

        assert!(matches!(
            ctx.convert_scene_component(root, "/Cube1"),
            Err(ConversionError::NoActiveDocument)
        ));
        assert!(matches!(
            ctx.set_edit_target("layer.usda"),
            Err(ConversionError::NoActiveDocument)
        ));
        assert!(matches!(ctx.save(), Err(ConversionError::NoActiveDocument)));
    }

    #[test]
    fn test_cleanup_erases_own_stage_once() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene.usda");
        let cache = Rc::new(StageCache::new());
        let mut ctx = context(&cache);

        ctx.set_stage_root_layer(&path)?;
        assert_eq!(cache.len(), 1);
        ctx.cleanup();
        assert!(cache.is_empty());
        ctx.cleanup();
        assert!(ctx.stage().is_none());
        Ok(())
    }

    #[test]
    fn test_previously_cached_stage_survives() {
        let cache = Rc::new(StageCache::new());
        cache.insert(Stage::new("shared.usda"));
        {
            let mut ctx = context(&cache);
            ctx.set_stage_root_layer("shared.usda").unwrap();
            assert!(ctx.stage().is_some());
        }
        assert!(cache.contains("shared.usda"));
    }

    #[test]
    fn test_drop_releases_stage() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = Rc::new(StageCache::new());
        {
            let mut ctx = context(&cache);
            ctx.set_stage_root_layer(dir.path().join("a.usda"))?;
            // Opening another layer releases the first
            ctx.set_stage_root_layer(dir.path().join("b.usda"))?;
            assert_eq!(cache.len(), 1);
        }
        assert!(cache.is_empty());
        Ok(())
    }

    #[test]
    fn test_convert_requires_existing_prim() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = Rc::new(StageCache::new());
        let mut ctx = context(&cache)
            .with_settings(ConversionSettings::default().with_stage(UpAxis::Y, 1.0));
        ctx.set_stage_root_layer(dir.path().join("scene.usda"))?;
        let cube = ctx.world().find_actor("Cube1").unwrap();
        let root = ctx.world().actor(cube).root;

        assert!(matches!(
            ctx.convert_scene_component(root, "/Cube1"),
            Err(ConversionError::MissingPrim(_))
        ));

        let stage = ctx.stage().unwrap();
        stage.borrow_mut().define_prim("/Cube1", prim_type::XFORM)?;
        ctx.convert_scene_component(root, "/Cube1")?;

        let stage = stage.borrow();
        let prim = stage.prim_at_path("/Cube1").unwrap();
        assert_eq!(stage.axes().up_axis, UpAxis::Y);
        assert_eq!(
            stage.get(prim, attr::INSTANCE_REFERENCE, TimeCode::Default),
            Some(&AttrValue::String("Level.Cube1".into()))
        );
        Ok(())
    }

    #[test]
    fn test_save_then_import_into_new_world() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("level.usda");
        let cache = Rc::new(StageCache::new());

        let mut ctx = context(&cache);
        ctx.set_stage_root_layer(&path)?;
        let report = ctx.export_world(TimeCode::Default)?;
        assert!(report.failures.is_empty());
        ctx.save()?;
        ctx.cleanup();

        let mut target = ConversionContext::new(World::new("Level"), Registry::default(), Rc::clone(&cache));
        target.set_stage_root_layer(&path)?;
        let report = target.import_into_world()?;
        assert!(report.is_clean(), "{:?}", report.failures);

        let cube = target.world().find_actor("Cube1").unwrap();
        assert_eq!(target.world().actor(cube).folder_path, "Props/Rocks");
        assert_eq!(target.world_folder_names(), vec!["Props", "Props/Rocks"]);
        assert!(target.path_is_child_of("Props/Rocks", "Props"));
        assert!(target.world_root_folder().find("Props/Rocks").is_some());
        Ok(())
    }
}
