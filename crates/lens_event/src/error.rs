//! Event bus error types.

/// Errors that can occur while dispatching an event.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// A handler returned an error; the remaining handlers were skipped.
    #[error("handler for '{event}' failed: {source}")]
    Handler {
        event: String,
        #[source]
        source: anyhow::Error,
    },
}
