//! Synchronous publish/subscribe bus.
//!
//! Handlers are plain closures keyed by event name. `emit` runs every handler
//! subscribed to that name, in subscription order, before it returns. There
//! is no queue and no isolation between subscribers: the first handler that
//! fails stops the dispatch and its error is returned to the emitter.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use crate::error::EventError;

/// Handle returned by [`EventBus::on`], used to unsubscribe.
pub type HandlerId = u64;

/// A subscribed event handler.
pub type Handler = Rc<dyn Fn(Option<&Value>) -> anyhow::Result<()>>;

/// An in-process event bus.
///
/// All methods take `&self`: the handler table is only borrowed while it is
/// read or updated, never while a handler runs, so handlers are free to
/// subscribe, unsubscribe, or emit from inside a dispatch.
#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<HashMap<String, Vec<(HandlerId, Handler)>>>,
    next_id: Cell<HandlerId>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to events named `event`.
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(Option<&Value>) -> anyhow::Result<()> + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let handler: Handler = Rc::new(handler);
        self.handlers
            .borrow_mut()
            .entry(event.into())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove a handler.
    ///
    /// Returns `true` if the handler was found and removed.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        for list in handlers.values_mut() {
            if let Some(pos) = list.iter().position(|(hid, _)| *hid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Dispatch an event to every handler subscribed to `event`.
    ///
    /// The handler list is snapshotted before the first handler runs;
    /// subscriptions made during the dispatch take effect from the next emit.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Handler`] for the first handler that fails.
    /// Handlers after it are not called.
    pub fn emit(&self, event: &str, payload: Option<&Value>) -> Result<(), EventError> {
        let snapshot: Vec<Handler> = match self.handlers.borrow().get(event) {
            Some(list) => list.iter().map(|(_, h)| Rc::clone(h)).collect(),
            None => return Ok(()),
        };
        trace!(event, handlers = snapshot.len(), "dispatching event");

        for handler in snapshot {
            handler(payload).map_err(|source| EventError::Handler {
                event: event.to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Number of handlers currently subscribed to `event`.
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.borrow().get(event).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.borrow();
        let mut counts: Vec<(&str, usize)> =
            handlers.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        counts.sort_unstable();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}
