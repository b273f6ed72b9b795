//! Entity store — the arena that owns every component bag.
//!
//! Entity IDs are dense and never reused, so bags live in a `Vec` indexed
//! directly by ID. Anything else that wants to see an entity's components
//! holds the ID and borrows the bag from here on demand; bags are never
//! copied out.

use std::collections::HashMap;

use serde_json::Value;
use tracing::trace;

use crate::bag::ComponentBag;
use crate::entity::{Entity, EntityAllocator};

/// Entity storage: identity allocation plus one bag per entity.
#[derive(Debug, Default)]
pub struct EntityStore {
    allocator: EntityAllocator,
    bags: Vec<ComponentBag>,
}

impl EntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new entity with an empty bag.
    pub fn allocate(&mut self) -> Entity {
        self.insert_bag(ComponentBag::new())
    }

    /// Allocate a new entity with initial components.
    pub fn insert_with(&mut self, components: HashMap<String, Value>) -> Entity {
        self.insert_bag(ComponentBag::from(components))
    }

    fn insert_bag(&mut self, bag: ComponentBag) -> Entity {
        let entity = self.allocator.allocate();
        self.bags.push(bag);
        trace!(entity = entity.id(), "entity allocated");
        entity
    }

    /// Borrow an entity's bag.
    #[must_use]
    pub fn bag(&self, entity: Entity) -> Option<&ComponentBag> {
        self.bags.get(entity.index()?)
    }

    /// Mutably borrow an entity's bag.
    pub fn bag_mut(&mut self, entity: Entity) -> Option<&mut ComponentBag> {
        let index = entity.index()?;
        self.bags.get_mut(index)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.bag(entity).is_some()
    }

    /// All known entity IDs in ascending order.
    #[must_use]
    pub fn known_ids(&self) -> Vec<Entity> {
        (0..self.allocator.count()).map(Entity).collect()
    }

    /// IDs of entities whose bag currently holds `component`, ascending.
    #[must_use]
    pub fn ids_with(&self, component: &str) -> Vec<Entity> {
        self.bags
            .iter()
            .zip(0u64..)
            .filter(|(bag, _)| bag.contains(component))
            .map(|(_, id)| Entity(id))
            .collect()
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bags.is_empty()
    }
}
