//! Instance key lookup for one import run.

use indexmap::IndexMap;

use crate::world::{ComponentId, World};

/// Maps instance keys to existing components.
///
/// Actors are keyed by their path name and resolve to their root component;
/// components are keyed by their own path name.
#[derive(Clone, Debug, Default)]
pub struct NameIndex {
    entries: IndexMap<String, ComponentId>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index everything already present in `world`.
    pub fn from_world(world: &World) -> Self {
        let mut index = Self::new();
        for (id, actor) in world.actors() {
            index.insert(world.actor_path_name(id), actor.root);
            for &component in &actor.components {
                index.insert(world.component_path_name(component), component);
            }
        }
        index
    }

    pub fn get(&self, key: &str) -> Option<ComponentId> {
        self.entries.get(key).copied()
    }

    pub fn insert(&mut self, key: impl Into<String>, component: ComponentId) {
        self.entries.insert(key.into(), component);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
