use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::Stage;

/// Shared handle to an open stage.
pub type StageRef = Rc<RefCell<Stage>>;

/// Open stages shared between callers, keyed by root layer identifier.
#[derive(Default)]
pub struct StageCache {
    stages: RefCell<IndexMap<String, StageRef>>,
}

impl StageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, identifier: &str) -> Option<StageRef> {
        self.stages.borrow().get(identifier).cloned()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.stages.borrow().contains_key(identifier)
    }

    /// Insert a stage, returning the shared handle.
    pub fn insert(&self, stage: Stage) -> StageRef {
        let identifier = stage.identifier().to_string();
        let handle = Rc::new(RefCell::new(stage));
        self.stages
            .borrow_mut()
            .insert(identifier, Rc::clone(&handle));
        handle
    }

    /// Remove a stage. Returns false if it was not cached.
    pub fn erase(&self, identifier: &str) -> bool {
        self.stages.borrow_mut().shift_remove(identifier).is_some()
    }

    pub fn len(&self) -> usize {
        self.stages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_find_erase() {
        let cache = StageCache::new();
        let handle = cache.insert(Stage::new("a.usda"));
        assert!(cache.contains("a.usda"));

        let found = cache.find("a.usda").unwrap();
        assert!(Rc::ptr_eq(&handle, &found));

        assert!(cache.erase("a.usda"));
        assert!(!cache.erase("a.usda"));
        assert!(cache.is_empty());
    }
}
