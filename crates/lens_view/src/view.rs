//! Live views and their accessor handles.
//!
//! A [`View`] holds entity IDs, never bag copies. Each [`AccessorHandle`]
//! borrows its entity's bag from the shared store for the duration of a
//! single read or write, so two handles over the same entity, from any two
//! views, always agree.

use std::rc::Rc;

use lens_component::{ComponentBag, Entity};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::ViewError;
use crate::registry::ViewId;
use crate::scope::Scope;
use crate::world::Shared;

/// A live, registered selection result.
///
/// Dropping the view (or calling [`View::dispose`]) removes it from the
/// broadcast registry.
pub struct View {
    id: ViewId,
    scope: Scope,
    watched: Option<String>,
    tracked: Vec<AccessorHandle>,
    shared: Rc<Shared>,
}

impl View {
    /// Wrap resolved `ids` in handles and register the view.
    pub(crate) fn register(
        shared: Rc<Shared>,
        scope: Scope,
        watched: Option<String>,
        ids: Vec<Entity>,
    ) -> Self {
        let id = shared
            .registry
            .borrow_mut()
            .register(scope, watched.clone(), &ids);
        debug!(
            view = id.0,
            %scope,
            watched = watched.as_deref().unwrap_or(""),
            entities = ids.len(),
            "view registered"
        );

        let tracked = ids
            .into_iter()
            .map(|entity| AccessorHandle {
                entity,
                shared: Rc::clone(&shared),
            })
            .collect();

        Self {
            id,
            scope,
            watched,
            tracked,
            shared,
        }
    }

    #[must_use]
    pub fn id(&self) -> ViewId {
        self.id
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Component name given at selection time, if any.
    #[must_use]
    pub fn watched(&self) -> Option<&str> {
        self.watched.as_deref()
    }

    /// One handle per resolved entity, ascending by ID.
    #[must_use]
    pub fn tracked(&self) -> &[AccessorHandle] {
        &self.tracked
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AccessorHandle> {
        self.tracked.iter()
    }

    /// The resolved entity IDs, ascending.
    #[must_use]
    pub fn ids(&self) -> Vec<Entity> {
        self.tracked.iter().map(AccessorHandle::entity).collect()
    }

    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.handle(entity).is_some()
    }

    /// The handle for `entity`, if this view resolved it.
    #[must_use]
    pub fn handle(&self, entity: Entity) -> Option<&AccessorHandle> {
        self.tracked
            .binary_search_by_key(&entity, AccessorHandle::entity)
            .ok()
            .map(|i| &self.tracked[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Write the watched component on every tracked entity.
    ///
    /// # Errors
    ///
    /// [`ViewError::NoWatchedComponent`] if the view was selected without a
    /// component name; otherwise the first failing write.
    pub fn write_watched(&self, value: Value) -> Result<(), ViewError> {
        let name = self
            .watched
            .as_deref()
            .ok_or(ViewError::NoWatchedComponent(self.id))?;
        for handle in &self.tracked {
            handle.set(name, value.clone())?;
        }
        Ok(())
    }

    /// Release this view's registry slot.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for View {
    fn drop(&mut self) {
        if self.shared.registry.borrow_mut().unregister(self.id) {
            debug!(view = self.id.0, "view unregistered");
        }
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("watched", &self.watched)
            .field("ids", &self.ids())
            .finish_non_exhaustive()
    }
}

impl<'a> IntoIterator for &'a View {
    type Item = &'a AccessorHandle;
    type IntoIter = std::slice::Iter<'a, AccessorHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracked.iter()
    }
}

/// A live read/write proxy over one entity's component bag.
#[derive(Clone)]
pub struct AccessorHandle {
    entity: Entity,
    shared: Rc<Shared>,
}

impl AccessorHandle {
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Current value of a component.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.shared
            .store
            .borrow()
            .bag(self.entity)
            .and_then(|bag| bag.get(name).cloned())
    }

    /// Current value of a component, decoded into `T`.
    ///
    /// # Errors
    ///
    /// [`ViewError::Decode`] if the stored value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ViewError> {
        self.get(name)
            .map(|value| {
                serde_json::from_value(value).map_err(|source| ViewError::Decode {
                    component: name.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Check if the bag currently has a component.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.shared
            .store
            .borrow()
            .bag(self.entity)
            .is_some_and(|bag| bag.contains(name))
    }

    /// Run `f` against the live bag.
    ///
    /// `f` must not touch the world; the store is borrowed while it runs.
    ///
    /// # Errors
    ///
    /// [`ViewError::EntityNotFound`] if the entity is unknown to the store.
    pub fn with_bag<R>(&self, f: impl FnOnce(&ComponentBag) -> R) -> Result<R, ViewError> {
        let store = self.shared.store.borrow();
        let bag = store
            .bag(self.entity)
            .ok_or(ViewError::EntityNotFound(self.entity))?;
        Ok(f(bag))
    }

    /// Assign a component, creating it if absent. Returns the previous value.
    ///
    /// # Errors
    ///
    /// [`ViewError::EntityNotFound`] for an unknown entity, or a failing
    /// instrumentation handler. A handler failure happens after the write
    /// has been applied.
    pub fn set(&self, name: &str, value: Value) -> Result<Option<Value>, ViewError> {
        self.write(name, |bag| bag.insert(name, value))
    }

    /// Encode `value` and assign it.
    ///
    /// # Errors
    ///
    /// [`ViewError::Encode`] if `value` cannot be represented as JSON, or
    /// any error from [`AccessorHandle::set`].
    pub fn set_as<T: Serialize>(&self, name: &str, value: &T) -> Result<Option<Value>, ViewError> {
        let value = serde_json::to_value(value).map_err(|source| ViewError::Encode {
            component: name.to_string(),
            source,
        })?;
        self.set(name, value)
    }

    /// Mutate a component in place (inserting `null` first if absent).
    /// Counts as one write.
    ///
    /// `f` must not touch the world; the store is borrowed while it runs.
    ///
    /// # Errors
    ///
    /// As for [`AccessorHandle::set`].
    pub fn update<R>(&self, name: &str, f: impl FnOnce(&mut Value) -> R) -> Result<R, ViewError> {
        self.write(name, |bag| f(bag.entry(name)))
    }

    /// Remove a component. Counts as a write only if something was removed.
    ///
    /// # Errors
    ///
    /// As for [`AccessorHandle::set`].
    pub fn remove(&self, name: &str) -> Result<Option<Value>, ViewError> {
        let removed = {
            let mut store = self.shared.store.borrow_mut();
            let bag = store
                .bag_mut(self.entity)
                .ok_or(ViewError::EntityNotFound(self.entity))?;
            bag.remove(name)
        };
        if removed.is_some() {
            trace!(entity = self.entity.id(), component = name, "component removed");
            self.shared.broadcast(self.entity, name)?;
        }
        Ok(removed)
    }

    /// Apply `f` to the bag, release the store, then broadcast.
    fn write<R>(&self, name: &str, f: impl FnOnce(&mut ComponentBag) -> R) -> Result<R, ViewError> {
        let out = {
            let mut store = self.shared.store.borrow_mut();
            let bag = store
                .bag_mut(self.entity)
                .ok_or(ViewError::EntityNotFound(self.entity))?;
            f(bag)
        };
        trace!(entity = self.entity.id(), component = name, "component written");
        self.shared.broadcast(self.entity, name)?;
        Ok(out)
    }
}

impl std::fmt::Debug for AccessorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessorHandle")
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}
