//! Error types for views and the world facade.

use lens_component::Entity;
use lens_event::EventError;

use crate::registry::ViewId;

/// Errors raised by operations on the [`World`](crate::World).
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("entity {0} not found")]
    EntityNotFound(Entity),
    #[error("component '{0}' not found on entity {1}")]
    ComponentNotFound(String, Entity),
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Errors raised by reads and writes through a view's handles.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("entity {0} not found")]
    EntityNotFound(Entity),
    #[error("{0} has no watched component")]
    NoWatchedComponent(ViewId),
    #[error("failed to decode component '{component}': {source}")]
    Decode {
        component: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode component '{component}': {source}")]
    Encode {
        component: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Event(#[from] EventError),
}
