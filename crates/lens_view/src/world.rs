/// World — entity storage, live views, and the events that tie them together.
///
/// Components are dynamically typed: each entity owns a bag of
/// `serde_json::Value`s keyed by component name. The store, the event bus,
/// and the broadcast registry sit behind one shared, single-threaded cell so
/// that views and their handles can reach them after `select` returns.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use lens_component::{ComponentBag, Entity, EntityStore};
use lens_event::{CHANGE, EventBus, EventError, HandlerId};
use serde_json::Value;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::WorldError;
use crate::registry::BroadcastRegistry;
use crate::scope::Scope;
use crate::selector;
use crate::view::View;

/// State shared by the world and every view and handle it hands out.
pub(crate) struct Shared {
    pub(crate) store: RefCell<EntityStore>,
    pub(crate) registry: RefCell<BroadcastRegistry>,
    pub(crate) bus: EventBus,
    emit_changes: Cell<bool>,
    config: EngineConfig,
}

impl Shared {
    /// Emit the instrumentation signals for one write, if enabled.
    ///
    /// Must be called after the write was applied and the store borrow
    /// released.
    pub(crate) fn broadcast(&self, entity: Entity, component: &str) -> Result<(), EventError> {
        let plan = self.registry.borrow().plan(entity, component);
        match plan {
            Some(plan) => plan.deliver(&self.bus),
            None => Ok(()),
        }
    }
}

/// The ECS world. Cloning is cheap; clones share the same entities, views,
/// and subscribers.
#[derive(Clone)]
pub struct World {
    shared: Rc<Shared>,
}

impl World {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                store: RefCell::new(EntityStore::new()),
                registry: RefCell::new(BroadcastRegistry::new(config.instrumentation)),
                bus: EventBus::new(),
                emit_changes: Cell::new(config.emit_changes),
                config,
            }),
        }
    }

    /// The configuration this world was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    // -- Entity lifecycle --

    /// Spawn a new entity, optionally with initial components.
    ///
    /// Emits `change` with the new ID as payload while emit-changes is on.
    pub fn spawn(
        &self,
        components: Option<HashMap<String, Value>>,
    ) -> Result<Entity, WorldError> {
        let entity = {
            let mut store = self.shared.store.borrow_mut();
            match components {
                Some(comps) => store.insert_with(comps),
                None => store.allocate(),
            }
        };
        debug!(entity = entity.id(), "entity spawned");

        if self.shared.emit_changes.get() {
            self.shared.bus.emit(CHANGE, Some(&Value::from(entity.id())))?;
        }
        Ok(entity)
    }

    /// Check if an entity exists.
    pub fn exists(&self, id: Entity) -> bool {
        self.shared.store.borrow().contains(id)
    }

    /// Return all entity IDs, ascending.
    pub fn known_ids(&self) -> Vec<Entity> {
        self.shared.store.borrow().known_ids()
    }

    /// Return the count of entities.
    pub fn entity_count(&self) -> usize {
        self.shared.store.borrow().len()
    }

    // -- Coarse change notification --

    pub fn emit_changes(&self) -> bool {
        self.shared.emit_changes.get()
    }

    /// Toggle `change` events for spawns. Turning the toggle back on emits a
    /// single payload-less `change` as a flush for the suppressed batch.
    pub fn set_emit_changes(&self, enabled: bool) -> Result<(), WorldError> {
        let was = self.shared.emit_changes.replace(enabled);
        if enabled && !was {
            debug!("change notifications resumed, flushing");
            self.shared.bus.emit(CHANGE, None)?;
        }
        Ok(())
    }

    // -- Component operations (uninstrumented) --

    /// Set a component on an entity directly in the store.
    ///
    /// Not routed through the broadcast registry; only writes through an
    /// [`AccessorHandle`](crate::AccessorHandle) are instrumented.
    pub fn set_component(
        &self,
        id: Entity,
        component: &str,
        value: Value,
    ) -> Result<(), WorldError> {
        let mut store = self.shared.store.borrow_mut();
        let bag = store.bag_mut(id).ok_or(WorldError::EntityNotFound(id))?;
        bag.insert(component, value);
        Ok(())
    }

    /// Get a copy of a component value from an entity.
    pub fn get_component(&self, id: Entity, component: &str) -> Result<Value, WorldError> {
        let store = self.shared.store.borrow();
        let bag = store.bag(id).ok_or(WorldError::EntityNotFound(id))?;
        bag.get(component)
            .cloned()
            .ok_or_else(|| WorldError::ComponentNotFound(component.to_string(), id))
    }

    /// Remove a component from an entity, returning its value.
    pub fn remove_component(&self, id: Entity, component: &str) -> Result<Value, WorldError> {
        let mut store = self.shared.store.borrow_mut();
        let bag = store.bag_mut(id).ok_or(WorldError::EntityNotFound(id))?;
        bag.remove(component)
            .ok_or_else(|| WorldError::ComponentNotFound(component.to_string(), id))
    }

    /// Check if an entity has a specific component.
    pub fn has_component(&self, id: Entity, component: &str) -> bool {
        self.shared
            .store
            .borrow()
            .bag(id)
            .is_some_and(|bag| bag.contains(component))
    }

    /// Get all component names on an entity, sorted.
    pub fn entity_components(&self, id: Entity) -> Result<Vec<String>, WorldError> {
        let store = self.shared.store.borrow();
        let bag = store.bag(id).ok_or(WorldError::EntityNotFound(id))?;
        Ok(bag.names())
    }

    /// Get a copy of an entity's whole bag.
    pub fn entity_snapshot(&self, id: Entity) -> Result<ComponentBag, WorldError> {
        let store = self.shared.store.borrow();
        store.bag(id).cloned().ok_or(WorldError::EntityNotFound(id))
    }

    // -- Selection --

    /// Resolve a selection and wrap it in a registered live view.
    ///
    /// Never fails: a selection that matches nothing yields an empty view.
    pub fn select(&self, scope: Scope, component: Option<&str>) -> View {
        let ids = selector::resolve(&self.shared.store.borrow(), scope, component);
        View::register(
            Rc::clone(&self.shared),
            scope,
            component.map(str::to_string),
            ids,
        )
    }

    /// View over every entity known right now.
    pub fn all(&self) -> View {
        self.select(Scope::Universe, None)
    }

    /// View over the entities that have `component` right now.
    pub fn query(&self, component: &str) -> View {
        self.select(Scope::Universe, Some(component))
    }

    /// Scope subsequent selections to one entity.
    pub fn entity(&self, id: Entity) -> Result<EntityScope<'_>, WorldError> {
        if !self.exists(id) {
            return Err(WorldError::EntityNotFound(id));
        }
        Ok(EntityScope { world: self, id })
    }

    /// Number of live views.
    pub fn view_count(&self) -> usize {
        self.shared.registry.borrow().len()
    }

    // -- Events --

    /// Subscribe to a bus event.
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(Option<&Value>) -> anyhow::Result<()> + 'static,
    {
        self.shared.bus.on(event, handler)
    }

    /// Remove a bus subscription.
    pub fn off(&self, id: HandlerId) -> bool {
        self.shared.bus.off(id)
    }

    /// Emit an application event on the world's bus.
    pub fn emit(&self, event: &str, payload: Option<&Value>) -> Result<(), WorldError> {
        self.shared.bus.emit(event, payload)?;
        Ok(())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entity_count())
            .field("views", &self.view_count())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

/// Selections pinned to one existing entity.
#[derive(Debug, Clone, Copy)]
pub struct EntityScope<'w> {
    world: &'w World,
    id: Entity,
}

impl EntityScope<'_> {
    pub fn id(&self) -> Entity {
        self.id
    }

    /// View over just this entity.
    pub fn view(&self) -> View {
        self.world.select(Scope::SingleId(self.id), None)
    }

    /// View over just this entity, watching `component`. The entity is
    /// included whether or not it has the component yet.
    pub fn query(&self, component: &str) -> View {
        self.world.select(Scope::SingleId(self.id), Some(component))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::Instrumentation;
    use lens_event::{CHANGE_DETECTED, CHANGE_RESOLVED};

    fn counter(world: &World, event: &str) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        world.on(event, move |_| {
            c.set(c.get() + 1);
            Ok(())
        });
        count
    }

    fn spawn_n(world: &World, n: usize) -> Vec<Entity> {
        (0..n).map(|_| world.spawn(None).unwrap()).collect()
    }

    #[test]
    fn test_spawn_ids_are_zero_based_and_dense() {
        let world = World::default();
        let ids = spawn_n(&world, 6);
        assert_eq!(ids, (0..6).map(Entity::from_raw).collect::<Vec<_>>());
        assert_eq!(world.known_ids(), ids);
        assert_eq!(world.entity_count(), 6);
    }

    #[test]
    fn test_spawn_and_get() {
        let world = World::default();
        let mut comps = HashMap::new();
        comps.insert("transform".to_string(), json!({"x": 1.0, "y": 2.0, "z": 3.0}));
        let id = world.spawn(Some(comps)).unwrap();
        assert!(world.exists(id));
        let t = world.get_component(id, "transform").unwrap();
        assert_eq!(t["x"], 1.0);
    }

    #[test]
    fn test_component_errors() {
        let world = World::default();
        let id = world.spawn(None).unwrap();
        assert!(matches!(
            world.get_component(id, "nope"),
            Err(WorldError::ComponentNotFound(_, e)) if e == id
        ));
        assert!(matches!(
            world.set_component(Entity(42), "x", json!(1)),
            Err(WorldError::EntityNotFound(Entity(42)))
        ));
        assert!(world.remove_component(id, "nope").is_err());
        assert!(world.entity(Entity(42)).is_err());
    }

    #[test]
    fn test_remove_and_list_components() {
        let world = World::default();
        let id = world.spawn(None).unwrap();
        world.set_component(id, "b", json!(2)).unwrap();
        world.set_component(id, "a", json!(1)).unwrap();
        assert_eq!(world.entity_components(id).unwrap(), vec!["a", "b"]);
        assert_eq!(world.remove_component(id, "a").unwrap(), json!(1));
        assert!(!world.has_component(id, "a"));
        assert_eq!(
            serde_json::to_value(world.entity_snapshot(id).unwrap()).unwrap(),
            json!({"b": 2})
        );
    }

    #[test]
    fn test_query_by_component_presence() {
        let world = World::default();
        let ids = spawn_n(&world, 5);
        world.set_component(ids[1], "tag", json!(true)).unwrap();
        world.set_component(ids[3], "tag", json!(true)).unwrap();

        let view = world.query("tag");
        assert_eq!(view.ids(), vec![Entity(1), Entity(3)]);
        assert!(world.query("absent").is_empty());
    }

    #[test]
    fn test_query_does_not_grow_after_creation() {
        let world = World::default();
        let ids = spawn_n(&world, 3);
        world.set_component(ids[0], "tag", json!(1)).unwrap();
        let view = world.query("tag");

        world.set_component(ids[2], "tag", json!(1)).unwrap();
        world.spawn(None).unwrap();
        assert_eq!(view.ids(), vec![Entity(0)]);

        let all = world.all();
        world.spawn(None).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_scope_then_assign_through_store() {
        let world = World::default();
        let e = world.spawn(None).unwrap();
        let view = world.entity(e).unwrap().query("pos");
        assert_eq!(view.ids(), vec![e]);
        assert_eq!(view.watched(), Some("pos"));
        assert_eq!(view.scope(), Scope::SingleId(e));

        world.set_component(e, "pos", json!({"x": 3})).unwrap();
        let pos = view.tracked()[0].get("pos").unwrap();
        assert_eq!(pos["x"], 3);
    }

    #[test]
    fn test_views_share_bags() {
        let world = World::default();
        let ids = spawn_n(&world, 3);
        world.set_component(ids[1], "tag", json!(0)).unwrap();

        let by_tag = world.query("tag");
        let by_tag_again = world.query("tag");
        let by_id = world.entity(ids[1]).unwrap().view();

        by_tag.tracked()[0].set("hp", json!(10)).unwrap();
        assert_eq!(by_tag_again.tracked()[0].get("hp"), Some(json!(10)));
        assert_eq!(by_id.tracked()[0].get("hp"), Some(json!(10)));

        by_id.tracked()[0].set("tag", json!(7)).unwrap();
        assert_eq!(by_tag.tracked()[0].get("tag"), Some(json!(7)));
        assert_eq!(world.get_component(ids[1], "tag").unwrap(), json!(7));
    }

    #[test]
    fn test_silent_world_emits_no_signals() {
        let world = World::default();
        let detected = counter(&world, CHANGE_DETECTED);
        let resolved = counter(&world, CHANGE_RESOLVED);
        spawn_n(&world, 2);
        let a = world.all();
        let _b = world.all();

        for i in 0..10 {
            a.tracked()[0].set("n", json!(i)).unwrap();
        }
        assert_eq!(detected.get(), 0);
        assert_eq!(resolved.get(), 0);
        assert_eq!(world.get_component(Entity(0), "n").unwrap(), json!(9));
    }

    #[test]
    fn test_single_write_fans_out_to_k_views() {
        let world = World::new(EngineConfig::debug());
        let e = world.spawn(None).unwrap();
        let views: Vec<View> = (0..4).map(|_| world.entity(e).unwrap().view()).collect();
        let detected = counter(&world, CHANGE_DETECTED);
        let resolved = counter(&world, CHANGE_RESOLVED);

        views[2].tracked()[0].set("pos", json!({"x": 1})).unwrap();
        assert_eq!(detected.get(), 1);
        assert_eq!(resolved.get(), 4);
    }

    #[test]
    fn test_m_writes_k_views() {
        let world = World::new(EngineConfig::debug());
        let ids = spawn_n(&world, 3);
        world.set_component(ids[0], "tag", json!(true)).unwrap();
        let _all = world.all();
        let _tagged = world.query("tag");
        let single = world.entity(ids[0]).unwrap().query("tag");
        let detected = counter(&world, CHANGE_DETECTED);
        let resolved = counter(&world, CHANGE_RESOLVED);

        let m = 5;
        for i in 0..m {
            single.tracked()[0].set("hp", json!(i)).unwrap();
        }
        assert_eq!(detected.get(), m);
        assert_eq!(resolved.get(), m * 3);
    }

    #[test]
    fn test_resolution_only_counts_views_containing_entity() {
        let world = World::new(EngineConfig::debug());
        let ids = spawn_n(&world, 2);
        let all = world.all();
        let _other = world.entity(ids[1]).unwrap().view();
        let resolved = counter(&world, CHANGE_RESOLVED);

        all.tracked()[0].set("x", json!(1)).unwrap();
        assert_eq!(resolved.get(), 1);
        all.tracked()[1].set("x", json!(1)).unwrap();
        assert_eq!(resolved.get(), 3);
    }

    #[test]
    fn test_direct_store_writes_are_not_instrumented() {
        let world = World::new(EngineConfig::debug());
        let e = world.spawn(None).unwrap();
        let _view = world.all();
        let detected = counter(&world, CHANGE_DETECTED);
        world.set_component(e, "pos", json!(1)).unwrap();
        assert_eq!(detected.get(), 0);
    }

    #[test]
    fn test_dropped_views_stop_resolving() {
        let world = World::new(EngineConfig::debug());
        world.spawn(None).unwrap();
        let keep = world.all();
        let gone = world.all();
        let resolved = counter(&world, CHANGE_RESOLVED);

        drop(gone);
        keep.tracked()[0].set("x", json!(1)).unwrap();
        assert_eq!(resolved.get(), 1);
        assert_eq!(world.view_count(), 1);
    }

    #[test]
    fn test_signal_order_and_visibility() {
        let world = World::new(EngineConfig::debug());
        let e = world.spawn(None).unwrap();
        let a = world.all();
        let b = world.entity(e).unwrap().view();
        let reader = b.tracked()[0].clone();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = Rc::clone(&log);
        world.on(CHANGE_DETECTED, move |_| {
            l.borrow_mut().push("detected".to_string());
            Ok(())
        });
        let l = Rc::clone(&log);
        world.on(CHANGE_RESOLVED, move |_| {
            let hp = reader.get("hp").unwrap_or(Value::Null);
            l.borrow_mut().push(format!("resolved:{hp}"));
            Ok(())
        });

        a.tracked()[0].set("hp", json!(3)).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["detected", "resolved:3", "resolved:3"]
        );
    }

    #[test]
    fn test_instrumented_and_silent_worlds_side_by_side() {
        let loud = World::new(EngineConfig::debug());
        let quiet = World::new(EngineConfig::default());
        for w in [&loud, &quiet] {
            w.spawn(None).unwrap();
        }
        let loud_view = loud.all();
        let quiet_view = quiet.all();
        let loud_count = counter(&loud, CHANGE_DETECTED);
        let quiet_count = counter(&quiet, CHANGE_DETECTED);

        loud_view.tracked()[0].set("x", json!(1)).unwrap();
        quiet_view.tracked()[0].set("x", json!(1)).unwrap();
        assert_eq!(loud_count.get(), 1);
        assert_eq!(quiet_count.get(), 0);
        assert_eq!(loud.config().instrumentation, Instrumentation::On);
    }

    #[test]
    fn test_handler_failure_propagates_after_write() {
        let world = World::new(EngineConfig::debug());
        let e = world.spawn(None).unwrap();
        let view = world.all();
        world.on(CHANGE_RESOLVED, |_| Err(anyhow::anyhow!("observer rejected write")));

        let err = view.tracked()[0].set("hp", json!(1)).unwrap_err();
        assert!(err.to_string().contains("observer rejected write"));
        assert_eq!(world.get_component(e, "hp").unwrap(), json!(1));
    }

    #[test]
    fn test_spawn_emits_change_with_id() {
        let world = World::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        world.on(CHANGE, move |payload| {
            s.borrow_mut().push(payload.cloned());
            Ok(())
        });
        spawn_n(&world, 2);
        assert_eq!(*seen.borrow(), vec![Some(json!(0)), Some(json!(1))]);
    }

    #[test]
    fn test_emit_changes_toggle_flushes_once() {
        let world = World::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        world.on(CHANGE, move |payload| {
            s.borrow_mut().push(payload.cloned());
            Ok(())
        });

        world.set_emit_changes(false).unwrap();
        assert!(!world.emit_changes());
        spawn_n(&world, 3);
        assert!(seen.borrow().is_empty());

        world.set_emit_changes(true).unwrap();
        assert_eq!(*seen.borrow(), vec![None]);

        // Already on: no second flush.
        world.set_emit_changes(true).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_emit_changes_initial_state_from_config() {
        let world = World::new(EngineConfig::default().with_emit_changes(false));
        let changes = counter(&world, CHANGE);
        world.spawn(None).unwrap();
        assert_eq!(changes.get(), 0);
    }

    #[test]
    fn test_spawn_surfaces_handler_failure() {
        let world = World::default();
        world.on(CHANGE, |_| Err(anyhow::anyhow!("no more entities")));
        assert!(matches!(world.spawn(None), Err(WorldError::Event(_))));
        // The entity was still allocated.
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn test_application_events_and_off() {
        let world = World::default();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let id = world.on("custom", move |_| {
            h.set(h.get() + 1);
            Ok(())
        });
        world.emit("custom", Some(&json!({"any": "payload"}))).unwrap();
        assert!(world.off(id));
        world.emit("custom", None).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_handler_can_select_during_dispatch() {
        let world = World::new(EngineConfig::debug());
        world.spawn(None).unwrap();
        let view = world.all();
        let inner = world.clone();
        let created = Rc::new(RefCell::new(Vec::new()));
        let c = Rc::clone(&created);
        world.on(CHANGE_DETECTED, move |_| {
            c.borrow_mut().push(inner.all());
            Ok(())
        });

        view.tracked()[0].set("x", json!(1)).unwrap();
        assert_eq!(world.view_count(), 2);
    }
}
