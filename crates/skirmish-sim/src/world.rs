//! Entity/component store.
//!
//! Wraps a hecs world behind `EntityId` handles so that the rest of the
//! workspace only ever stores plain ids. Storage and lookup only; behaviour
//! lives in systems. Lookups on stale ids return `None`, never panic.

use hecs::{Component, DynamicBundle, Entity};

use skirmish_core::components::{Health, Transform};
use skirmish_core::types::EntityId;

/// Convert a hecs entity into the public id.
pub fn id_of(entity: Entity) -> EntityId {
    EntityId(entity.to_bits().get())
}

/// Resolve a public id back into a hecs entity handle. The handle may be
/// stale; hecs checks the generation on every access.
pub fn entity_of(id: EntityId) -> Option<Entity> {
    Entity::from_bits(id.0)
}

#[derive(Default)]
pub struct World {
    ecs: hecs::World,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, components: impl DynamicBundle) -> EntityId {
        id_of(self.ecs.spawn(components))
    }

    /// Remove an entity and all its components. Returns false for stale ids.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        entity_of(id).is_some_and(|e| self.ecs.despawn(e).is_ok())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        entity_of(id).is_some_and(|e| self.ecs.contains(e))
    }

    pub fn len(&self) -> usize {
        self.ecs.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.ecs.len() == 0
    }

    /// Shared borrow of one component.
    pub fn get<T: Component>(&self, id: EntityId) -> Option<hecs::Ref<'_, T>> {
        self.ecs.get::<&T>(entity_of(id)?).ok()
    }

    /// Unique borrow of one component. hecs checks borrows dynamically, so
    /// this takes `&self`; do not hold two of the same component at once.
    pub fn get_mut<T: Component>(&self, id: EntityId) -> Option<hecs::RefMut<'_, T>> {
        self.ecs.get::<&mut T>(entity_of(id)?).ok()
    }

    pub fn has<T: Component>(&self, id: EntityId) -> bool {
        entity_of(id)
            .and_then(|e| self.ecs.entity(e).ok())
            .is_some_and(|e| e.has::<T>())
    }

    /// Attach or replace a component. Returns false for stale ids.
    pub fn insert<T: Component>(&mut self, id: EntityId, component: T) -> bool {
        entity_of(id).is_some_and(|e| self.ecs.insert_one(e, component).is_ok())
    }

    pub fn remove<T: Component>(&mut self, id: EntityId) -> Option<T> {
        self.ecs.remove_one::<T>(entity_of(id)?).ok()
    }

    /// All live ids in ascending order.
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.ecs.iter().map(|e| id_of(e.entity())).collect();
        ids.sort_unstable();
        ids
    }

    pub fn transform(&self, id: EntityId) -> Option<Transform> {
        self.get::<Transform>(id).map(|t| *t)
    }

    pub fn health(&self, id: EntityId) -> Option<Health> {
        self.get::<Health>(id).map(|h| *h)
    }

    /// True if the entity has Health and is flagged dead.
    pub fn is_dead(&self, id: EntityId) -> bool {
        self.get::<Health>(id).is_some_and(|h| h.dead)
    }

    /// Read-only access for queries.
    pub fn ecs(&self) -> &hecs::World {
        &self.ecs
    }

    /// Mutable access for systems running queries.
    pub fn ecs_mut(&mut self) -> &mut hecs::World {
        &mut self.ecs
    }
}
