//! Well-known event names.

/// Coarse world change: an entity was added (payload: its id), or a
/// payload-less flush after a batch of suppressed additions.
pub const CHANGE: &str = "change";

/// Instrumentation: one raw write through an accessor handle.
pub const CHANGE_DETECTED: &str = "changeDetected";

/// Instrumentation: one live view observed a write.
pub const CHANGE_RESOLVED: &str = "changeResolved";
