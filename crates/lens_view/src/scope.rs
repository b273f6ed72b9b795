//! Selection scope.

use lens_component::Entity;
use serde::{Deserialize, Serialize};

/// Which entities a selection starts from. Fixed for the lifetime of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Every entity known to the store at selection time.
    Universe,
    /// Exactly one entity.
    SingleId(Entity),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Universe => write!(f, "universe"),
            Self::SingleId(entity) => write!(f, "{entity}"),
        }
    }
}
