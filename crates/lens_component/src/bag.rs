//! Component bags.
//!
//! Components are not Rust types: a bag maps a component name to an
//! arbitrary `serde_json::Value`, so any entity may carry any component at
//! any time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single entity's component set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentBag {
    components: HashMap<String, Value>,
}

impl ComponentBag {
    /// Create an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a component value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.components.get(name)
    }

    /// Get a mutable reference to a component value.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.components.get_mut(name)
    }

    /// Insert or replace a component, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.components.insert(name.into(), value)
    }

    /// Get a component for in-place mutation, inserting `null` if absent.
    pub fn entry(&mut self, name: &str) -> &mut Value {
        self.components.entry(name.to_string()).or_insert(Value::Null)
    }

    /// Remove a component, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.components.remove(name)
    }

    /// Check if the bag has a component with this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// All component names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.components.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of components in the bag.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterate over `(name, value)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.components.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<HashMap<String, Value>> for ComponentBag {
    fn from(components: HashMap<String, Value>) -> Self {
        Self { components }
    }
}
