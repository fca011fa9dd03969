//! Minimal entity/component store: typed component maps keyed by entity id,
//! query helpers, and registered systems run once per `progress` tick.

pub mod components;

use log::error;
use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};

pub use components::*;

pub type EntityId = u64;

trait ComponentStore {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove_entity(&mut self, entity: EntityId);
}

struct Store<T: 'static> {
    items: HashMap<EntityId, T>,
}

impl<T: 'static> Store<T> {
    fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }
}

impl<T: 'static> ComponentStore for Store<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove_entity(&mut self, entity: EntityId) {
        self.items.remove(&entity);
    }
}

type SystemFn = Box<dyn FnMut(&mut World, f32) + Send>;

pub struct World {
    next_entity: EntityId,
    alive: BTreeSet<EntityId>,
    stores: HashMap<TypeId, Box<dyn ComponentStore>>,
    systems: Vec<(String, SystemFn)>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            next_entity: 1,
            alive: BTreeSet::new(),
            stores: HashMap::new(),
            systems: Vec::new(),
        }
    }

    /// Pre-create the store for a component type. Stores are also created
    /// lazily on first insert, so this is optional but keeps registration
    /// explicit at startup.
    pub fn register_component<T: 'static>(&mut self) {
        self.stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Store::<T>::new()));
    }

    pub fn create_entity(&mut self) -> EntityId {
        let id = self.next_entity;
        self.next_entity += 1;
        self.alive.insert(id);
        id
    }

    /// A scene entity carries Position + Rotation + Scale + the SceneEntity
    /// tag, plus a Name when given.
    pub fn create_scene_entity(&mut self, name: Option<&str>) -> EntityId {
        let entity = self.create_entity();
        self.set(entity, Position::default());
        self.set(entity, Rotation::default());
        self.set(entity, Scale::default());
        self.set(entity, SceneEntity);
        if let Some(name) = name {
            self.set(entity, Name(name.to_string()));
        }
        entity
    }

    /// Children are only ever created under an existing parent, which keeps
    /// the ChildOf relation acyclic by construction.
    pub fn create_child_entity(&mut self, parent: EntityId, name: Option<&str>) -> EntityId {
        let entity = self.create_scene_entity(name);
        self.set(entity, ChildOf(parent));
        entity
    }

    pub fn destroy_entity(&mut self, entity: EntityId) -> bool {
        if !self.alive.remove(&entity) {
            return false;
        }
        for store in self.stores.values_mut() {
            store.remove_entity(entity);
        }
        true
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.alive.contains(&entity)
    }

    pub fn entity_count(&self) -> usize {
        self.alive.len()
    }

    pub fn set<T: 'static>(&mut self, entity: EntityId, component: T) {
        self.register_component::<T>();
        let store = self
            .stores
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<Store<T>>())
            .expect("store registered above");
        store.items.insert(entity, component);
    }

    pub fn get<T: 'static>(&self, entity: EntityId) -> Option<&T> {
        self.stores
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<Store<T>>())
            .and_then(|s| s.items.get(&entity))
    }

    pub fn get_mut<T: 'static>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<Store<T>>())
            .and_then(|s| s.items.get_mut(&entity))
    }

    pub fn has<T: 'static>(&self, entity: EntityId) -> bool {
        self.get::<T>(entity).is_some()
    }

    pub fn remove<T: 'static>(&mut self, entity: EntityId) -> bool {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<Store<T>>())
            .map_or(false, |s| s.items.remove(&entity).is_some())
    }

    /// Entity ids carrying `T`, ascending for deterministic iteration.
    pub fn entities_with<T: 'static>(&self) -> Vec<EntityId> {
        let Some(store) = self
            .stores
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<Store<T>>())
        else {
            return Vec::new();
        };
        let mut ids: Vec<EntityId> = store
            .items
            .keys()
            .filter(|id| self.alive.contains(*id))
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn entities_with2<A: 'static, B: 'static>(&self) -> Vec<EntityId> {
        self.entities_with::<A>()
            .into_iter()
            .filter(|&id| self.has::<B>(id))
            .collect()
    }

    pub fn entities_with3<A: 'static, B: 'static, C: 'static>(&self) -> Vec<EntityId> {
        self.entities_with2::<A, B>()
            .into_iter()
            .filter(|&id| self.has::<C>(id))
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.entities_with::<Name>()
            .into_iter()
            .find(|&id| self.get::<Name>(id).map(|n| n.0.as_str()) == Some(name))
    }

    pub fn add_system<F>(&mut self, name: &str, system: F)
    where
        F: FnMut(&mut World, f32) + Send + 'static,
    {
        self.systems.push((name.to_string(), Box::new(system)));
    }

    /// Run every registered system once. A panicking system is logged and
    /// skipped; the remaining systems still run.
    pub fn progress(&mut self, dt: f32) -> bool {
        let mut systems = std::mem::take(&mut self.systems);
        for (name, system) in &mut systems {
            if catch_unwind(AssertUnwindSafe(|| system(self, dt))).is_err() {
                error!("system '{}' panicked; skipping for this tick", name);
            }
        }
        // Systems added from within a system land after the existing ones
        let added = std::mem::take(&mut self.systems);
        self.systems = systems;
        self.systems.extend(added);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_set_get() {
        let mut world = World::new();
        let e = world.create_entity();
        world.set(e, Position { x: 1.0, y: 2.0, z: 3.0 });

        let pos = world.get::<Position>(e).unwrap();
        assert_eq!((pos.x, pos.y, pos.z), (1.0, 2.0, 3.0));
        assert!(world.has::<Position>(e));
        assert!(!world.has::<Scale>(e));
    }

    #[test]
    fn test_destroy_removes_components() {
        let mut world = World::new();
        let e = world.create_scene_entity(Some("doomed"));
        assert!(world.destroy_entity(e));
        assert!(!world.destroy_entity(e));
        assert!(world.get::<Position>(e).is_none());
        assert!(world.find_by_name("doomed").is_none());
    }

    #[test]
    fn test_queries_filter_by_component_sets() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        world.set(a, Position::default());
        world.set(b, Position::default());
        world.set(b, Renderable { sort_key: 1 });

        assert_eq!(world.entities_with::<Position>(), vec![a, b]);
        assert_eq!(world.entities_with2::<Position, Renderable>(), vec![b]);
        assert!(world.entities_with::<BoundingBox>().is_empty());
    }

    #[test]
    fn test_scene_entity_has_core_components() {
        let mut world = World::new();
        let e = world.create_scene_entity(Some("root"));
        assert!(world.has::<Position>(e));
        assert!(world.has::<Rotation>(e));
        assert!(world.has::<Scale>(e));
        assert!(world.has::<SceneEntity>(e));
        assert_eq!(world.find_by_name("root"), Some(e));
    }

    #[test]
    fn test_child_entities_record_parent() {
        let mut world = World::new();
        let parent = world.create_scene_entity(None);
        let child = world.create_child_entity(parent, Some("leaf"));
        assert_eq!(world.get::<ChildOf>(child).unwrap().0, parent);
    }

    #[test]
    fn test_systems_run_and_panics_are_isolated() {
        let mut world = World::new();
        let e = world.create_entity();
        world.set(e, Position::default());

        world.add_system("exploder", |_world, _dt| panic!("system bug"));
        world.add_system("mover", move |world, dt| {
            if let Some(pos) = world.get_mut::<Position>(e) {
                pos.x += dt;
            }
        });

        assert!(world.progress(1.0));
        assert!(world.progress(1.0));
        assert_eq!(world.get::<Position>(e).unwrap().x, 2.0);
    }

    #[test]
    fn test_remove_component() {
        let mut world = World::new();
        let e = world.create_entity();
        world.set(e, TransparentTag);
        assert!(world.remove::<TransparentTag>(e));
        assert!(!world.remove::<TransparentTag>(e));
    }
}
