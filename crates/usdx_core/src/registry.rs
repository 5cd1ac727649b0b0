//! Runtime class and asset registries.
//!
//! References in a document name classes and assets by path. Instead of
//! resolving those paths through reflection, the converters look them up in
//! explicit registries populated before a conversion run. A lookup miss is an
//! ordinary unresolvable-reference error.

use indexmap::{IndexMap, IndexSet};

use crate::geometry::StaticMesh;
use crate::schema::{class, DEFAULT_MATERIAL};
use crate::world::ComponentKind;

/// Spawnable actor class: the root component every instance starts with.
#[derive(Clone, Debug, PartialEq)]
pub struct ActorClass {
    pub path: String,
    pub root_name: String,
    pub root_class: String,
    pub root_kind: ComponentKind,
}

/// Component class that can be created under an existing actor.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentClass {
    pub path: String,
    pub kind: ComponentKind,
}

/// A class reference resolved against the registry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResolvedClass<'a> {
    Actor(&'a ActorClass),
    Component(&'a ComponentClass),
}

impl ResolvedClass<'_> {
    pub fn path(&self) -> &str {
        match self {
            ResolvedClass::Actor(a) => &a.path,
            ResolvedClass::Component(c) => &c.path,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClassRegistry {
    actors: IndexMap<String, ActorClass>,
    components: IndexMap<String, ComponentClass>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the engine's built-in classes.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        let actors = [
            (class::ACTOR, "DefaultSceneRoot", class::SCENE_COMPONENT, ComponentKind::Scene),
            (
                class::STATIC_MESH_ACTOR,
                "Mesh",
                class::STATIC_MESH_COMPONENT,
                ComponentKind::StaticMesh,
            ),
            (
                class::SKELETAL_MESH_ACTOR,
                "SkeletalMeshComponent0",
                class::SKELETAL_MESH_COMPONENT,
                ComponentKind::SkeletalMesh,
            ),
            (class::BRUSH, "BrushComponent0", class::BRUSH_COMPONENT, ComponentKind::Brush),
            (
                class::LANDSCAPE,
                "RootComponent",
                class::LANDSCAPE_COMPONENT,
                ComponentKind::Landscape,
            ),
            (
                class::INSTANCED_FOLIAGE_ACTOR,
                "RootComponent",
                class::SCENE_COMPONENT,
                ComponentKind::Scene,
            ),
        ];
        for (path, root_name, root_class, root_kind) in actors {
            registry.register_actor(ActorClass {
                path: path.to_string(),
                root_name: root_name.to_string(),
                root_class: root_class.to_string(),
                root_kind,
            });
        }

        let components = [
            (class::SCENE_COMPONENT, ComponentKind::Scene),
            (class::STATIC_MESH_COMPONENT, ComponentKind::StaticMesh),
            (class::SKELETAL_MESH_COMPONENT, ComponentKind::SkeletalMesh),
            (class::HISM_COMPONENT, ComponentKind::InstancedBatch),
            (class::BRUSH_COMPONENT, ComponentKind::Brush),
            (class::LANDSCAPE_COMPONENT, ComponentKind::Landscape),
        ];
        for (path, kind) in components {
            registry.register_component(ComponentClass {
                path: path.to_string(),
                kind,
            });
        }

        registry
    }

    pub fn register_actor(&mut self, actor: ActorClass) {
        self.actors.insert(actor.path.clone(), actor);
    }

    pub fn register_component(&mut self, component: ComponentClass) {
        self.components.insert(component.path.clone(), component);
    }

    pub fn actor(&self, path: &str) -> Option<&ActorClass> {
        self.actors.get(path)
    }

    pub fn component(&self, path: &str) -> Option<&ComponentClass> {
        self.components.get(path)
    }

    /// Look a class path up, preferring actor classes.
    pub fn resolve(&self, path: &str) -> Option<ResolvedClass<'_>> {
        self.actor(path)
            .map(ResolvedClass::Actor)
            .or_else(|| self.component(path).map(ResolvedClass::Component))
    }
}

/// Loaded assets, by object path.
#[derive(Clone, Debug, Default)]
pub struct AssetRegistry {
    static_meshes: IndexMap<String, StaticMesh>,
    skeletal_meshes: IndexSet<String>,
    materials: IndexSet<String>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        let mut assets = Self::default();
        assets.add_material(DEFAULT_MATERIAL);
        assets
    }

    pub fn add_static_mesh(&mut self, mesh: StaticMesh) {
        self.static_meshes.insert(mesh.path.clone(), mesh);
    }

    pub fn static_mesh(&self, path: &str) -> Option<&StaticMesh> {
        self.static_meshes.get(path)
    }

    pub fn static_meshes(&self) -> impl Iterator<Item = &StaticMesh> {
        self.static_meshes.values()
    }

    pub fn add_skeletal_mesh(&mut self, path: impl Into<String>) {
        self.skeletal_meshes.insert(path.into());
    }

    pub fn has_skeletal_mesh(&self, path: &str) -> bool {
        self.skeletal_meshes.contains(path)
    }

    pub fn add_material(&mut self, path: impl Into<String>) {
        self.materials.insert(path.into());
    }

    pub fn has_material(&self, path: &str) -> bool {
        self.materials.contains(path)
    }

    /// Whether any kind of asset is registered at `path`.
    pub fn has_asset(&self, path: &str) -> bool {
        self.static_meshes.contains_key(path)
            || self.skeletal_meshes.contains(path)
            || self.materials.contains(path)
    }
}

/// Everything a conversion resolves references against.
#[derive(Clone, Debug)]
pub struct Registry {
    pub classes: ClassRegistry,
    pub assets: AssetRegistry,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            classes: ClassRegistry::with_defaults(),
            assets: AssetRegistry::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MeshDescription;

    #[test]
    fn test_builtin_classes() {
        let classes = ClassRegistry::with_defaults();
        let sma = classes.actor(class::STATIC_MESH_ACTOR).unwrap();
        assert_eq!(sma.root_name, "Mesh");
        assert_eq!(sma.root_kind, ComponentKind::StaticMesh);

        assert!(matches!(
            classes.resolve(class::HISM_COMPONENT),
            Some(ResolvedClass::Component(c)) if c.kind == ComponentKind::InstancedBatch
        ));
        assert!(classes.resolve("/Script/Engine.Nope").is_none());
    }

    #[test]
    fn test_assets() {
        let mut assets = AssetRegistry::new();
        assert!(assets.has_material(DEFAULT_MATERIAL));

        assets.add_static_mesh(StaticMesh::new("/Game/Cube.Cube", MeshDescription::new()));
        assert!(assets.static_mesh("/Game/Cube.Cube").is_some());
        assert!(assets.has_asset("/Game/Cube.Cube"));
        assert!(!assets.has_asset("/Game/Sphere.Sphere"));
    }
}
