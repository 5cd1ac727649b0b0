//! Scatter instances held by the level's foliage actor.

use indexmap::{IndexMap, IndexSet};
use usdx_math::{Aabb, Quat, Transform, Vec3};

use super::ComponentId;

/// Mesh and optional material override of one scatter mesh type.
#[derive(Clone, Debug, PartialEq)]
pub struct FoliageType {
    pub mesh: String,
    pub material_override: Option<String>,
}

impl FoliageType {
    pub fn new(mesh: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            material_override: None,
        }
    }
}

/// One placed scatter instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FoliageInstance {
    pub location: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    /// Surface the instance rests on
    pub base: Option<ComponentId>,
}

impl FoliageInstance {
    pub fn from_transform(transform: &Transform, base: Option<ComponentId>) -> Self {
        Self {
            location: transform.translation,
            rotation: transform.rotation,
            scale: transform.scale,
            base,
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.location, self.rotation, self.scale)
    }
}

/// Instances of one mesh type, indexed by base surface.
#[derive(Clone, Debug, Default)]
pub struct FoliageInfo {
    instances: Vec<FoliageInstance>,
    component_hash: IndexMap<Option<ComponentId>, IndexSet<usize>>,
    bounds: Aabb,
    refreshed: usize,
}

impl FoliageInfo {
    pub fn add_instance(&mut self, instance: FoliageInstance) -> usize {
        let index = self.instances.len();
        self.component_hash
            .entry(instance.base)
            .or_default()
            .insert(index);
        self.instances.push(instance);
        index
    }

    pub fn instances(&self) -> &[FoliageInstance] {
        &self.instances
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Instance indices grouped by base surface, in first-seen order.
    pub fn component_hash(&self) -> &IndexMap<Option<ComponentId>, IndexSet<usize>> {
        &self.component_hash
    }

    /// Fold instances added since the last refresh into the bounds.
    pub fn refresh(&mut self) {
        for instance in &self.instances[self.refreshed..] {
            self.bounds.include(instance.location);
        }
        self.refreshed = self.instances.len();
    }

    pub fn needs_refresh(&self) -> bool {
        self.refreshed != self.instances.len()
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}

/// Mesh types of a foliage actor, in prototype order.
#[derive(Clone, Debug, Default)]
pub struct FoliageActorData {
    types: Vec<(FoliageType, FoliageInfo)>,
}

impl FoliageActorData {
    pub fn remove_all_mesh_types(&mut self) {
        self.types.clear();
    }

    /// Register a mesh type, returning its fresh instance container.
    pub fn add_mesh_type(&mut self, foliage_type: FoliageType) -> &mut FoliageInfo {
        self.types.push((foliage_type, FoliageInfo::default()));
        let last = self.types.len() - 1;
        &mut self.types[last].1
    }

    pub fn mesh_types(&self) -> impl Iterator<Item = (&FoliageType, &FoliageInfo)> {
        self.types.iter().map(|(t, i)| (t, i))
    }

    pub fn mesh_type_count(&self) -> usize {
        self.types.len()
    }

    pub fn info(&self, index: usize) -> Option<&FoliageInfo> {
        self.types.get(index).map(|(_, info)| info)
    }

    pub fn info_mut(&mut self, index: usize) -> Option<&mut FoliageInfo> {
        self.types.get_mut(index).map(|(_, info)| info)
    }

    pub fn instance_count(&self) -> usize {
        self.types.iter().map(|(_, i)| i.instance_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, base: Option<ComponentId>) -> FoliageInstance {
        FoliageInstance::from_transform(&Transform::from_translation(Vec3::new(x, 0.0, 0.0)), base)
    }

    #[test]
    fn test_component_hash_groups_by_base() {
        let (a, b) = (ComponentId::new(3), ComponentId::new(8));
        let mut info = FoliageInfo::default();
        info.add_instance(at(0.0, Some(a)));
        info.add_instance(at(1.0, None));
        info.add_instance(at(2.0, Some(a)));
        info.add_instance(at(3.0, Some(b)));

        let groups: Vec<(Option<ComponentId>, Vec<usize>)> = info
            .component_hash()
            .iter()
            .map(|(k, v)| (*k, v.iter().copied().collect()))
            .collect();
        assert_eq!(
            groups,
            vec![(Some(a), vec![0, 2]), (None, vec![1]), (Some(b), vec![3])]
        );
    }

    #[test]
    fn test_refresh_is_incremental() {
        let mut info = FoliageInfo::default();
        info.add_instance(at(5.0, None));
        assert!(info.needs_refresh());
        info.refresh();
        assert!(!info.needs_refresh());

        info.add_instance(at(-5.0, None));
        info.refresh();
        assert!((info.bounds().min().x + 5.0).abs() < 0.001);
        assert!((info.bounds().max().x - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_mesh_types_keep_order() {
        let mut actor = FoliageActorData::default();
        actor.add_mesh_type(FoliageType::new("/Game/Tree.Tree")).add_instance(at(0.0, None));
        actor.add_mesh_type(FoliageType::new("/Game/Rock.Rock"));
        assert_eq!(actor.mesh_type_count(), 2);
        assert_eq!(actor.instance_count(), 1);

        let meshes: Vec<&str> = actor.mesh_types().map(|(t, _)| t.mesh.as_str()).collect();
        assert_eq!(meshes, ["/Game/Tree.Tree", "/Game/Rock.Rock"]);

        actor.remove_all_mesh_types();
        assert_eq!(actor.mesh_type_count(), 0);
    }
}
