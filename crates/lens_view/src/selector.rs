//! Selector resolution: `(scope, component?)` to an ordered list of IDs.
//!
//! - `Universe`, no component: every known ID.
//! - `Universe`, component `N`: IDs whose bag holds `N` right now.
//! - `SingleId(id)`, any component: `[id]`. The component name is not a
//!   filter here, so a caller can scope to an entity and then assign a
//!   component it does not have yet.
//!
//! Resolution happens once; later changes to the store do not alter a list
//! that was already returned.

use lens_component::{Entity, EntityStore};

use crate::scope::Scope;

/// Resolve a selection against the current store contents, ascending by ID.
#[must_use]
pub fn resolve(store: &EntityStore, scope: Scope, component: Option<&str>) -> Vec<Entity> {
    match (scope, component) {
        (Scope::Universe, None) => store.known_ids(),
        (Scope::Universe, Some(name)) => store.ids_with(name),
        (Scope::SingleId(entity), _) => vec![entity],
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn store_with(n: usize) -> EntityStore {
        let mut store = EntityStore::new();
        for _ in 0..n {
            store.allocate();
        }
        store
    }

    #[test]
    fn test_universe_without_component_returns_all() {
        let store = store_with(3);
        assert_eq!(
            resolve(&store, Scope::Universe, None),
            vec![Entity(0), Entity(1), Entity(2)]
        );
    }

    #[test]
    fn test_universe_on_empty_store() {
        let store = EntityStore::new();
        assert!(resolve(&store, Scope::Universe, None).is_empty());
        assert!(resolve(&store, Scope::Universe, Some("pos")).is_empty());
    }

    #[test]
    fn test_universe_filters_by_presence() {
        let mut store = store_with(5);
        store.bag_mut(Entity(4)).unwrap().insert("tag", json!(1));
        store.bag_mut(Entity(2)).unwrap().insert("tag", json!(2));
        assert_eq!(
            resolve(&store, Scope::Universe, Some("tag")),
            vec![Entity(2), Entity(4)]
        );
    }

    #[test]
    fn test_unknown_component_resolves_empty() {
        let store = store_with(4);
        assert!(resolve(&store, Scope::Universe, Some("nobody")).is_empty());
    }

    #[test]
    fn test_single_id_ignores_component_filter() {
        let store = store_with(2);
        assert_eq!(
            resolve(&store, Scope::SingleId(Entity(1)), Some("pos")),
            vec![Entity(1)]
        );
        assert_eq!(
            resolve(&store, Scope::SingleId(Entity(0)), None),
            vec![Entity(0)]
        );
    }

    #[test]
    fn test_resolution_is_a_snapshot() {
        let mut store = store_with(2);
        store.bag_mut(Entity(0)).unwrap().insert("tag", json!(true));
        let ids = resolve(&store, Scope::Universe, Some("tag"));
        store.bag_mut(Entity(1)).unwrap().insert("tag", json!(true));
        store.allocate();
        assert_eq!(ids, vec![Entity(0)]);
    }
}
