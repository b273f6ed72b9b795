//! # lens_component
//!
//! The storage half of the live-query ECS: who the entities are and where
//! their components live.
//!
//! This crate provides:
//!
//! - [`Entity`] — lightweight `u64` entity identifiers.
//! - [`EntityAllocator`] — monotonically increasing ID allocator.
//! - [`ComponentBag`] — an open-ended, name-keyed set of JSON component values.
//! - [`EntityStore`] — the arena that exclusively owns every bag.

pub mod bag;
pub mod entity;
pub mod store;

pub use bag::ComponentBag;
pub use entity::{Entity, EntityAllocator};
pub use store::EntityStore;
