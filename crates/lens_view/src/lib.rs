//! # lens_view
//!
//! Live, reactive query views over an entity store.
//!
//! A [`View`] is not a snapshot: its [`AccessorHandle`]s read and write the
//! very bags the [`EntityStore`](lens_component::EntityStore) owns, so every
//! view that selected an entity sees every write to it immediately. Which
//! entities a view covers is fixed when it is created; what their components
//! contain is always current.
//!
//! This crate provides:
//!
//! - [`Scope`] and [`resolve`] — turning a selection into entity IDs.
//! - [`View`] / [`AccessorHandle`] — the live handles.
//! - [`BroadcastRegistry`] — the set of live views, consulted on every write
//!   to emit `changeDetected` / `changeResolved` when instrumentation is on.
//! - [`World`] — the facade tying store, bus, and registry together.
//!
//! ## Usage
//!
//! ```rust
//! use lens_view::{EngineConfig, World};
//! use serde_json::json;
//!
//! let world = World::new(EngineConfig::debug());
//! let e = world.spawn(None).unwrap();
//! world.set_component(e, "tag", json!(true)).unwrap();
//!
//! let a = world.query("tag");
//! let b = world.entity(e).unwrap().view();
//! a.tracked()[0].set("hp", json!(10)).unwrap();
//! assert_eq!(b.tracked()[0].get("hp"), Some(json!(10)));
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod scope;
pub mod selector;
pub mod view;
pub mod world;

pub use config::{EngineConfig, Instrumentation};
pub use error::{ViewError, WorldError};
pub use registry::{BroadcastPlan, BroadcastRegistry, ViewId};
pub use scope::Scope;
pub use selector::resolve;
pub use view::{AccessorHandle, View};
pub use world::{EntityScope, World};

pub use lens_component::{ComponentBag, Entity};
pub use lens_event::{CHANGE, CHANGE_DETECTED, CHANGE_RESOLVED, EventError, HandlerId};
