//! Mutation broadcast registry — tracks live views and fans writes out to
//! them.
//!
//! Every [`View`](crate::View) registers here when it is created and
//! unregisters when it is dropped. On each write through an accessor handle
//! the world asks the registry for a [`BroadcastPlan`]: which views contain
//! the written entity, in registration order. Delivering the plan emits one
//! `changeDetected` followed by one `changeResolved` per observing view.
//!
//! Planning and delivery are split so that no registry borrow is held while
//! event handlers run; a handler may create or drop views mid-dispatch.

use std::collections::{BTreeMap, HashMap};

use lens_component::Entity;
use lens_event::{CHANGE_DETECTED, CHANGE_RESOLVED, EventBus, EventError};
use tracing::trace;

use crate::config::Instrumentation;
use crate::scope::Scope;

/// Identifier of a registered view. Increases with registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "View({})", self.0)
    }
}

/// What the registry remembers about one live view.
#[derive(Debug, Clone)]
struct ViewEntry {
    scope: Scope,
    watched: Option<String>,
    ids: Vec<Entity>,
}

/// Registry of all live views.
#[derive(Debug)]
pub struct BroadcastRegistry {
    instrumentation: Instrumentation,
    /// Views keyed by ID; `BTreeMap` iteration is registration order.
    views: BTreeMap<ViewId, ViewEntry>,
    /// Entity -> views that resolved it, in registration order.
    observers: HashMap<Entity, Vec<ViewId>>,
    next_id: u64,
}

impl BroadcastRegistry {
    /// Create an empty registry with the given instrumentation mode.
    #[must_use]
    pub fn new(instrumentation: Instrumentation) -> Self {
        Self {
            instrumentation,
            views: BTreeMap::new(),
            observers: HashMap::new(),
            next_id: 0,
        }
    }

    #[must_use]
    pub fn instrumentation(&self) -> Instrumentation {
        self.instrumentation
    }

    /// Register a view over `ids` and return its ID.
    pub fn register(&mut self, scope: Scope, watched: Option<String>, ids: &[Entity]) -> ViewId {
        let id = ViewId(self.next_id);
        self.next_id += 1;

        for entity in ids {
            self.observers.entry(*entity).or_default().push(id);
        }
        self.views.insert(
            id,
            ViewEntry {
                scope,
                watched,
                ids: ids.to_vec(),
            },
        );
        id
    }

    /// Remove a view.
    ///
    /// Returns `true` if the view was found and removed.
    pub fn unregister(&mut self, id: ViewId) -> bool {
        let Some(entry) = self.views.remove(&id) else {
            return false;
        };
        for entity in &entry.ids {
            if let Some(list) = self.observers.get_mut(entity) {
                list.retain(|v| *v != id);
                if list.is_empty() {
                    self.observers.remove(entity);
                }
            }
        }
        true
    }

    /// Views whose resolved IDs contain `entity`, oldest first.
    #[must_use]
    pub fn observers_of(&self, entity: Entity) -> Vec<ViewId> {
        self.observers.get(&entity).cloned().unwrap_or_default()
    }

    /// The signals a write of `component` on `entity` must produce, or
    /// `None` when instrumentation is off.
    #[must_use]
    pub fn plan(&self, entity: Entity, component: &str) -> Option<BroadcastPlan> {
        if !self.instrumentation.is_enabled() {
            return None;
        }
        Some(BroadcastPlan {
            entity,
            component: component.to_string(),
            observers: self.observers_of(entity),
        })
    }

    /// Scope a view was created with.
    #[must_use]
    pub fn scope(&self, id: ViewId) -> Option<Scope> {
        self.views.get(&id).map(|e| e.scope)
    }

    /// Watched component of a view, if any.
    #[must_use]
    pub fn watched(&self, id: ViewId) -> Option<&str> {
        self.views.get(&id).and_then(|e| e.watched.as_deref())
    }

    /// IDs of all live views, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.views.keys().copied()
    }

    /// Number of live views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

/// The signals owed for one write, computed while the registry was borrowed
/// and delivered after the borrow was released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastPlan {
    pub entity: Entity,
    pub component: String,
    pub observers: Vec<ViewId>,
}

impl BroadcastPlan {
    /// Emit `changeDetected` once, then `changeResolved` once per observer.
    ///
    /// # Errors
    ///
    /// Propagates the first failing handler; signals after it are not sent.
    pub fn deliver(&self, bus: &EventBus) -> Result<(), EventError> {
        trace!(
            entity = self.entity.id(),
            component = %self.component,
            observers = self.observers.len(),
            "change detected"
        );
        bus.emit(CHANGE_DETECTED, None)?;

        for view in &self.observers {
            trace!(
                entity = self.entity.id(),
                component = %self.component,
                view = view.0,
                "change resolved"
            );
            bus.emit(CHANGE_RESOLVED, None)?;
        }
        Ok(())
    }
}
