//! # lens_event
//!
//! A small, synchronous, in-process event bus.
//!
//! - [`EventBus`] — `on` / `off` / `emit` with ordered, fire-and-forget dispatch.
//! - [`EventError`] — a handler failure propagated back to the emitter.
//! - [`names`] — the well-known event names used by the world.

pub mod bus;
pub mod error;
pub mod names;

pub use bus::{EventBus, Handler, HandlerId};
pub use error::EventError;
pub use names::{CHANGE, CHANGE_DETECTED, CHANGE_RESOLVED};
