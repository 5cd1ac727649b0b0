//! Organizational actor folders.
//!
//! Folders are slash-separated paths such as `Props/Rocks`. They carry no
//! transform; they only group actors for display and export.

use indexmap::IndexMap;

use super::{ActorId, World};

/// Name of the node at the top of a folder tree.
pub const ROOT_FOLDER_NAME: &str = "Root";

/// A folder and its sub folders, keyed by leaf name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActorFolder {
    pub name: String,
    pub children: IndexMap<String, ActorFolder>,
}

impl ActorFolder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: IndexMap::new(),
        }
    }

    /// Add the folders of a slash-separated path below this one.
    pub fn insert_path(&mut self, path: &str) {
        let mut current = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .children
                .entry(segment.to_string())
                .or_insert_with(|| ActorFolder::new(segment));
        }
    }

    /// Folder at a slash-separated path below this one.
    pub fn find(&self, path: &str) -> Option<&ActorFolder> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |folder, segment| folder.children.get(segment))
    }
}

/// Normalize a folder path: no leading, trailing or doubled separators.
pub fn normalize_folder_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a parent folder path and a child segment.
pub fn join_folder_path(parent: &str, child: &str) -> String {
    normalize_folder_path(&format!("{}/{}", parent, child))
}

/// Whether `child` is strictly below `parent` in the folder hierarchy.
pub fn path_is_child_of(child: &str, parent: &str) -> bool {
    let child = normalize_folder_path(child);
    let parent = normalize_folder_path(parent);
    if parent.is_empty() {
        return !child.is_empty();
    }
    child.len() > parent.len()
        && child.starts_with(&parent)
        && child.as_bytes()[parent.len()] == b'/'
}

impl World {
    /// Register a folder and all of its ancestors.
    pub fn add_folder(&mut self, path: &str) {
        let path = normalize_folder_path(path);
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            self.folders.insert(current.clone());
        }
    }

    /// Move an actor into `path`, creating the folder if needed.
    pub fn set_actor_folder(&mut self, actor: ActorId, path: &str) {
        let path = normalize_folder_path(path);
        self.add_folder(&path);
        self.actors[actor.0].folder_path = path;
    }

    /// Every registered folder, in creation order.
    pub fn folder_names(&self) -> Vec<String> {
        self.folders.iter().cloned().collect()
    }

    /// Folders directly below the level root.
    pub fn root_folders(&self) -> Vec<String> {
        self.folders
            .iter()
            .filter(|f| !f.contains('/'))
            .cloned()
            .collect()
    }

    /// Folders directly below `parent`.
    pub fn child_folders(&self, parent: &str) -> Vec<String> {
        let parent = normalize_folder_path(parent);
        self.folders
            .iter()
            .filter(|f| {
                path_is_child_of(f, &parent) && !f[parent.len()..].trim_start_matches('/').contains('/')
            })
            .cloned()
            .collect()
    }

    pub fn has_folder(&self, path: &str) -> bool {
        self.folders.contains(&normalize_folder_path(path))
    }

    /// All folders as a tree under a node named `Root`.
    pub fn folder_tree(&self) -> ActorFolder {
        let mut root = ActorFolder::new(ROOT_FOLDER_NAME);
        for folder in &self.folders {
            root.insert_path(folder);
        }
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ClassRegistry;
    use crate::schema::class;

    #[test]
    fn test_child_of() {
        assert!(path_is_child_of("Props/Rocks", "Props"));
        assert!(path_is_child_of("/Props/Rocks/", "Props"));
        assert!(!path_is_child_of("PropsExtra", "Props"));
        assert!(!path_is_child_of("Props", "Props"));
        assert!(path_is_child_of("Props", ""));
    }

    #[test]
    fn test_set_actor_folder_adds_ancestors() {
        let classes = ClassRegistry::with_defaults();
        let mut world = World::new("Level");
        let actor = world.spawn_actor(classes.actor(class::ACTOR).unwrap(), "Rock");
        world.set_actor_folder(actor, "/Props/Rocks/");

        assert_eq!(world.actor(actor).folder_path, "Props/Rocks");
        assert_eq!(world.folder_names(), vec!["Props", "Props/Rocks"]);
        assert_eq!(world.root_folders(), vec!["Props"]);
        assert_eq!(world.child_folders("Props"), vec!["Props/Rocks"]);
        assert!(world.child_folders("Props/Rocks").is_empty());
        assert_eq!(join_folder_path("Props", "Trees"), "Props/Trees");
    }

    #[test]
    fn test_folder_tree() {
        let mut world = World::new("Level");
        world.add_folder("Props/Rocks");
        world.add_folder("Props/Trees");
        world.add_folder("Lights");

        let tree = world.folder_tree();
        assert_eq!(tree.name, "Root");
        assert_eq!(tree.children.len(), 2);
        let props = tree.find("Props").unwrap();
        assert_eq!(props.children.keys().collect::<Vec<_>>(), vec!["Rocks", "Trees"]);
        assert_eq!(tree.find("Props/Rocks").unwrap().name, "Rocks");
        assert!(tree.find("Props/Bushes").is_none());
    }
}
