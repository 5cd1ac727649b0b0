//! In-memory runtime scene graph.
//!
//! A level holds actors; each actor owns a tree of attached components,
//! rooted at its root component. Actors and components are addressed by
//! stable path names, `<level>.<actor>` and `<level>.<actor>.<component>`.

mod cluster_tree;
mod components;
mod foliage;
mod folders;

use usdx_math::{Interval, Ray, Transform, Vec3};

use crate::geometry::brush_mesh::brush_to_static_mesh;
use crate::registry::ActorClass;
use crate::schema::class;

pub use cluster_tree::ClusterTree;
pub use components::{
    BrushData, ComponentData, ComponentKind, InstancedBatch, LandscapeData, MeshSlot,
};
pub use foliage::{FoliageActorData, FoliageInfo, FoliageInstance, FoliageType};
pub use folders::{
    join_folder_path, normalize_folder_path, path_is_child_of, ActorFolder, ROOT_FOLDER_NAME,
};

/// Identity of an actor within one world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(usize);

/// Identity of a component within one world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(usize);

impl ComponentId {
    #[cfg(test)]
    pub(crate) fn new(index: usize) -> Self {
        ComponentId(index)
    }
}

/// A top-level runtime node.
#[derive(Clone, Debug)]
pub struct Actor {
    pub label: String,
    pub class_path: String,

    /// Slash-separated organizational folder, empty at the root
    pub folder_path: String,

    pub root: ComponentId,

    /// Every component owned by the actor, root first
    pub components: Vec<ComponentId>,

    /// Offset from the actor origin to the brush pivot
    pub pivot_offset: Vec3,

    /// Present on the level's foliage actor
    pub foliage: Option<FoliageActorData>,
}

/// A node attached within an actor's tree.
#[derive(Clone, Debug)]
pub struct Component {
    pub name: String,
    pub owner: ActorId,
    pub class_path: String,
    pub parent: Option<ComponentId>,
    pub children: Vec<ComponentId>,

    /// Transform relative to the parent, or to the world for roots
    pub relative: Transform,

    pub visible: bool,
    pub hidden_in_editor: bool,
    pub data: ComponentData,
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        self.data.kind()
    }
}

/// Surface hit by a trace.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceHit {
    pub component: ComponentId,
    pub location: Vec3,
}

/// A level and everything in it.
#[derive(Clone, Debug)]
pub struct World {
    level: String,
    actors: Vec<Actor>,
    components: Vec<Component>,
    folders: indexmap::IndexSet<String>,
}

impl World {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            actors: Vec::new(),
            components: Vec::new(),
            folders: indexmap::IndexSet::new(),
        }
    }

    pub fn level_name(&self) -> &str {
        &self.level
    }

    pub fn actor(&self, id: ActorId) -> &Actor {
        &self.actors[id.0]
    }

    pub fn actor_mut(&mut self, id: ActorId) -> &mut Actor {
        &mut self.actors[id.0]
    }

    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }

    pub fn component_mut(&mut self, id: ComponentId) -> &mut Component {
        &mut self.components[id.0]
    }

    pub fn actors(&self) -> impl Iterator<Item = (ActorId, &Actor)> {
        self.actors.iter().enumerate().map(|(i, a)| (ActorId(i), a))
    }

    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &Component)> {
        self.components
            .iter()
            .enumerate()
            .map(|(i, c)| (ComponentId(i), c))
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn find_actor(&self, label: &str) -> Option<ActorId> {
        self.actors
            .iter()
            .position(|a| a.label == label)
            .map(ActorId)
    }

    /// Spawn an actor of `class` with its root component.
    ///
    /// The label is made unique within the level.
    pub fn spawn_actor(&mut self, class: &ActorClass, label: &str) -> ActorId {
        let label = self.unique_label(label);
        let id = ActorId(self.actors.len());
        let root = ComponentId(self.components.len());

        self.components.push(Component {
            name: class.root_name.clone(),
            owner: id,
            class_path: class.root_class.clone(),
            parent: None,
            children: Vec::new(),
            relative: Transform::IDENTITY,
            visible: true,
            hidden_in_editor: false,
            data: ComponentData::new(class.root_kind),
        });

        let foliage = (class.path == class::INSTANCED_FOLIAGE_ACTOR)
            .then(FoliageActorData::default);

        log::debug!("Spawned actor {} ({})", label, class.path);
        self.actors.push(Actor {
            label,
            class_path: class.path.clone(),
            folder_path: String::new(),
            root,
            components: vec![root],
            pivot_offset: Vec3::ZERO,
            foliage,
        });
        id
    }

    /// Create an unattached component owned by `owner`.
    ///
    /// The name is made unique within the actor.
    pub fn add_component(
        &mut self,
        owner: ActorId,
        name: &str,
        class_path: &str,
        kind: ComponentKind,
    ) -> ComponentId {
        let name = self.unique_component_name(owner, name);
        let id = ComponentId(self.components.len());
        self.components.push(Component {
            name,
            owner,
            class_path: class_path.to_string(),
            parent: None,
            children: Vec::new(),
            relative: Transform::IDENTITY,
            visible: true,
            hidden_in_editor: false,
            data: ComponentData::new(kind),
        });
        self.actors[owner.0].components.push(id);
        id
    }

    /// Attach `child` under `parent`, snapping it onto the parent.
    ///
    /// Returns false, leaving the hierarchy unchanged, when the attachment
    /// would create a cycle.
    pub fn attach(&mut self, child: ComponentId, parent: ComponentId) -> bool {
        if child == parent || self.is_ancestor(child, parent) {
            log::warn!(
                "Refusing to attach {} under its descendant {}",
                self.component_path_name(child),
                self.component_path_name(parent)
            );
            return false;
        }

        if let Some(old) = self.components[child.0].parent {
            self.components[old.0].children.retain(|&c| c != child);
        }
        self.components[parent.0].children.push(child);

        let component = &mut self.components[child.0];
        component.parent = Some(parent);
        component.relative = Transform::IDENTITY;
        true
    }

    /// Whether `ancestor` is above `id` in its attachment chain.
    pub fn is_ancestor(&self, ancestor: ComponentId, id: ComponentId) -> bool {
        let mut current = self.components[id.0].parent;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.components[p.0].parent;
        }
        false
    }

    pub fn is_root(&self, id: ComponentId) -> bool {
        let component = &self.components[id.0];
        self.actors[component.owner.0].root == id
    }

    /// Component transform composed up the attachment chain.
    pub fn world_transform(&self, id: ComponentId) -> Transform {
        let mut matrix = self.components[id.0].relative.to_matrix();
        let mut current = self.components[id.0].parent;
        while let Some(p) = current {
            matrix = self.components[p.0].relative.to_matrix() * matrix;
            current = self.components[p.0].parent;
        }
        Transform::from_matrix(matrix)
    }

    pub fn actor_path_name(&self, id: ActorId) -> String {
        format!("{}.{}", self.level, self.actors[id.0].label)
    }

    pub fn component_path_name(&self, id: ComponentId) -> String {
        let component = &self.components[id.0];
        format!(
            "{}.{}",
            self.actor_path_name(component.owner),
            component.name
        )
    }

    /// The level's foliage actor, if one exists.
    pub fn foliage_actor(&self) -> Option<ActorId> {
        self.actors
            .iter()
            .position(|a| a.foliage.is_some())
            .map(ActorId)
    }

    /// The level's foliage actor, spawned from `class` on first use.
    pub fn get_or_spawn_foliage_actor(&mut self, class: &ActorClass) -> ActorId {
        match self.foliage_actor() {
            Some(existing) => existing,
            None => self.spawn_actor(class, "InstancedFoliageActor"),
        }
    }

    /// Nearest landscape hit along the segment `start..end`.
    pub fn trace_landscape(&self, start: Vec3, end: Vec3) -> Option<TraceHit> {
        let segment = Interval::new(0.0, 1.0);
        let mut best: Option<(f32, ComponentId)> = None;

        for (id, component) in self.components() {
            let ComponentData::Landscape(landscape) = &component.data else {
                continue;
            };
            let to_local = self.world_transform(id).to_matrix().inverse();
            let local = Ray::segment(
                to_local.transform_point3(start),
                to_local.transform_point3(end),
            );
            if let Some(t) = landscape.intersect(&local, segment) {
                if best.map_or(true, |(best_t, _)| t < best_t) {
                    best = Some((t, id));
                }
            }
        }

        best.map(|(t, component)| TraceHit {
            component,
            location: Ray::segment(start, end).at(t),
        })
    }

    /// Refresh derived geometry after bulk edits.
    ///
    /// Brush polygons are re-merged and each brush gets a fresh render mesh.
    pub fn build_geometry(&mut self) {
        let mut brushes = 0;
        for index in 0..self.components.len() {
            if !matches!(self.components[index].data, ComponentData::Brush(_)) {
                continue;
            }
            let id = ComponentId(index);
            let path = self.component_path_name(id);
            let pivot = self.actors[self.components[index].owner.0].pivot_offset;

            let ComponentData::Brush(brush) = &mut self.components[index].data else {
                continue;
            };
            brush.model.validate_brush();
            brush.model.build_bound();
            brush.render = match brush_to_static_mesh(&brush.model, pivot, &path) {
                Ok(mesh) => Some(mesh),
                Err(e) => {
                    log::warn!("No render mesh for {}: {}", path, e);
                    None
                }
            };
            brushes += 1;
        }
        log::debug!("Rebuilt geometry for {} brushes", brushes);
    }

    fn unique_label(&self, label: &str) -> String {
        let taken = |candidate: &str| self.actors.iter().any(|a| a.label == candidate);
        unique_name(label, taken)
    }

    fn unique_component_name(&self, owner: ActorId, name: &str) -> String {
        let taken = |candidate: &str| {
            self.actors[owner.0]
                .components
                .iter()
                .any(|c| self.components[c.0].name == candidate)
        };
        unique_name(name, taken)
    }
}

fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
