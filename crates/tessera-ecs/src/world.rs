//! The [`World`] is the top-level container. It owns the actor pool, the
//! property registry with one chunk per property type, the deduplicated
//! filters, the reactive triggers and the temporary-property queue, and it
//! routes every property mutation to all of them.

use std::fmt;

use crate::actor::{Actor, ActorPool, Observer};
use crate::chunk::{AnyChunk, Chunk, EMPTY_SLOT};
use crate::config::WorldConfig;
use crate::events::{ActorEvent, EventLog, ListenerId, PropertyEvent};
use crate::filter::{Filter, FilterId, FilterOption};
use crate::property::{Property, PropertyRegistry, PropertyType, PropertyTypeId, PropertyValue};
use crate::temporary::{LifeStep, TemporaryPropertyLifeData};
use crate::trigger::{Trigger, TriggerAction, TriggerId};
use crate::EcsError;

type LifecycleHook = Box<dyn FnMut(Actor)>;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Registry of actors, property storage, filters and triggers.
pub struct World {
    config: WorldConfig,
    pool: ActorPool,
    registry: PropertyRegistry,
    /// Indexed by `PropertyTypeId`; one entry per registered type.
    chunks: Vec<Box<dyn AnyChunk>>,
    filters: Vec<Filter>,
    triggers: Vec<Trigger>,
    temporary: Vec<TemporaryPropertyLifeData>,
    history: EventLog,
    created_hooks: Vec<LifecycleHook>,
    destroyed_hooks: Vec<LifecycleHook>,
    next_listener: u64,
    cycle: u64,
}

impl World {
    /// Create a world with the default configuration.
    pub fn new() -> Self {
        Self::build(WorldConfig::default())
    }

    /// Create a world with a validated custom configuration.
    pub fn with_config(config: WorldConfig) -> Result<Self, EcsError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: WorldConfig) -> Self {
        Self {
            pool: ActorPool::new(config.max_actor_id),
            history: EventLog::new(config.history_capacity),
            config,
            registry: PropertyRegistry::new(),
            chunks: Vec::new(),
            filters: Vec::new(),
            triggers: Vec::new(),
            temporary: Vec::new(),
            created_hooks: Vec::new(),
            destroyed_hooks: Vec::new(),
            next_listener: 0,
            cycle: 0,
        }
    }

    /// The configuration this world was built with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Registered property types.
    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    /// Number of completed cycle boundaries.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    // -- actor lifecycle ----------------------------------------------------

    /// Obtain an actor from the pool.
    ///
    /// # Panics
    ///
    /// Panics if every id up to `max_actor_id` is live. Use
    /// [`try_create_actor`](Self::try_create_actor) to handle that case.
    pub fn create_actor(&mut self) -> Actor {
        match self.try_create_actor() {
            Ok(actor) => actor,
            Err(err) => panic!("{err}"),
        }
    }

    /// Obtain an actor from the pool, reusing the most recently released id.
    pub fn try_create_actor(&mut self) -> Result<Actor, EcsError> {
        let actor = self.pool.obtain()?;
        // A fresh actor carries no properties but may still satisfy options
        // made only of exclusions.
        let types = self.pool.property_types(actor);
        for filter in &mut self.filters {
            filter.on_actor_changed(actor, types);
        }
        for hook in &mut self.created_hooks {
            hook(actor);
        }
        tracing::debug!(actor = ?actor, "actor created");
        Ok(actor)
    }

    /// Return an actor to the pool.
    ///
    /// The actor leaves every filter and trigger, its observers are dropped
    /// and every chunk slot it held is cleared before the id can be reused.
    /// No per-property notifications are raised.
    pub fn destroy_actor(&mut self, actor: Actor) -> Result<(), EcsError> {
        self.ensure_alive(actor)?;
        for filter in &mut self.filters {
            filter.on_actor_released(actor);
        }
        for trigger in &mut self.triggers {
            trigger.forget(actor);
        }
        let types = self.pool.release(actor).unwrap_or_default();
        for ty in types {
            if let Some(id) = self.registry.lookup(ty) {
                self.chunks[id.index()].remove(actor.id());
            }
        }
        for hook in &mut self.destroyed_hooks {
            hook(actor);
        }
        tracing::debug!(actor = ?actor, "actor destroyed");
        Ok(())
    }

    /// Whether `actor` is live and its handle is current.
    pub fn is_alive(&self, actor: Actor) -> bool {
        self.pool.is_alive(actor)
    }

    /// Number of live actors.
    pub fn actor_count(&self) -> usize {
        self.pool.alive_count()
    }

    /// All live actors in id order.
    pub fn actors(&self) -> impl Iterator<Item = Actor> + '_ {
        self.pool.iter_alive()
    }

    /// The live actor currently owning `id`.
    pub fn get_actor_by_id(&self, id: u32) -> Option<Actor> {
        self.pool.get_by_id(id)
    }

    /// Property types attached to `actor`, in attachment order.
    pub fn property_types(&self, actor: Actor) -> &[PropertyType] {
        self.pool.property_types(actor)
    }

    /// Register a hook fired after every actor creation.
    pub fn on_actor_created(&mut self, hook: impl FnMut(Actor) + 'static) {
        self.created_hooks.push(Box::new(hook));
    }

    /// Register a hook fired after every actor destruction.
    pub fn on_actor_destroyed(&mut self, hook: impl FnMut(Actor) + 'static) {
        self.destroyed_hooks.push(Box::new(hook));
    }

    /// Chained mutation view over one actor.
    pub fn actor_mut(&mut self, actor: Actor) -> Result<ActorMut<'_>, EcsError> {
        self.ensure_alive(actor)?;
        Ok(ActorMut { world: self, actor })
    }

    fn ensure_alive(&self, actor: Actor) -> Result<(), EcsError> {
        if self.pool.is_alive(actor) {
            Ok(())
        } else {
            tracing::warn!(actor = ?actor, "operation on dead or stale actor");
            Err(EcsError::StaleActor { actor })
        }
    }

    // -- property storage ---------------------------------------------------

    /// Register property type `T` and create its chunk.
    pub fn register_property<T: Property>(&mut self) -> PropertyTypeId {
        let index = self.typed_chunk_index::<T>();
        PropertyTypeId(index as u32)
    }

    /// Resolve a registered property type from its fully qualified name.
    pub fn property_type_by_name(&self, name: &str) -> Result<PropertyType, EcsError> {
        self.registry
            .lookup_by_name(name)
            .and_then(|id| self.registry.get_info(id))
            .map(|info| info.ty)
            .ok_or_else(|| EcsError::UnknownProperty {
                name: name.to_owned(),
                registered: self.registry.registered_names().join(", "),
            })
    }

    /// The chunk storing `T`, if the type has been used.
    pub fn chunk<T: Property>(&self) -> Option<&Chunk<T>> {
        let id = self.registry.lookup(PropertyType::of::<T>())?;
        self.chunks[id.index()].as_any().downcast_ref::<Chunk<T>>()
    }

    fn ensure_chunk(
        &mut self,
        ty: PropertyType,
        size: usize,
        make: impl FnOnce(usize) -> Box<dyn AnyChunk>,
    ) -> usize {
        let index = self.registry.register_type(ty, size).index();
        if index == self.chunks.len() {
            self.chunks.push(make(self.config.chunk_capacity));
        }
        index
    }

    fn typed_chunk_index<T: Property>(&mut self) -> usize {
        self.ensure_chunk(PropertyType::of::<T>(), std::mem::size_of::<T>(), |capacity| {
            Box::new(Chunk::<T>::with_capacity(capacity))
        })
    }

    /// The chunk storing `T`, created on first use.
    pub(crate) fn get_chunk<T: Property>(&mut self) -> &mut Chunk<T> {
        let index = self.typed_chunk_index::<T>();
        self.chunks[index]
            .as_any_mut()
            .downcast_mut::<Chunk<T>>()
            .expect("chunk table entry does not match its registered type")
    }

    // -- typed mutation surface ---------------------------------------------

    /// Whether `actor` currently carries a `T`.
    pub fn has_prop<T: Property>(&self, actor: Actor) -> bool {
        self.has_type(actor, PropertyType::of::<T>())
    }

    fn has_type(&self, actor: Actor, ty: PropertyType) -> bool {
        self.pool.property_types(actor).contains(&ty)
    }

    /// Strict read access to `actor`'s `T`.
    pub fn prop<T: Property>(&self, actor: Actor) -> Option<&T> {
        if !self.has_prop::<T>(actor) {
            return None;
        }
        self.chunk::<T>()?.try_get(actor.id())
    }

    /// Fail-soft mutable access to `actor`'s `T`.
    ///
    /// A missing property (or a dead handle) is logged and a reference to a
    /// reset default value is returned instead; writes to it are discarded.
    pub fn get_prop<T: Property>(&mut self, actor: Actor) -> &mut T {
        let id = if self.pool.is_alive(actor) {
            actor.id()
        } else {
            tracing::warn!(actor = ?actor, property = %PropertyType::of::<T>(), "read on dead or stale actor");
            EMPTY_SLOT
        };
        self.get_chunk::<T>().get(id)
    }

    /// Attach `value` to `actor`. Replaces the value if `T` is already present.
    pub fn add_prop<T: Property>(&mut self, actor: Actor, value: T) -> Result<(), EcsError> {
        self.ensure_alive(actor)?;
        self.store_typed(actor, value);
        Ok(())
    }

    /// Overwrite `actor`'s `T`. Attaches it if absent.
    pub fn replace_prop<T: Property>(&mut self, actor: Actor, value: T) -> Result<(), EcsError> {
        self.ensure_alive(actor)?;
        self.store_typed(actor, value);
        Ok(())
    }

    /// Detach `T` from `actor`. Detaching an absent type does nothing.
    pub fn remove_prop<T: Property>(&mut self, actor: Actor) -> Result<(), EcsError> {
        self.remove_prop_object(actor, PropertyType::of::<T>())
    }

    /// Ensure the presence (`true`) or absence (`false`) of marker `T`.
    pub fn set_property_enabled<T: Property>(
        &mut self,
        actor: Actor,
        enabled: bool,
    ) -> Result<(), EcsError> {
        self.ensure_alive(actor)?;
        self.toggle::<T>(actor, enabled);
        Ok(())
    }

    /// Attach `value` now and expire it after `lifecycles` cycles (plus the
    /// grace cycle described in [`crate::temporary`]).
    pub fn add_temporary_prop<T: Property>(
        &mut self,
        actor: Actor,
        value: T,
        lifecycles: u32,
    ) -> Result<(), EcsError> {
        self.ensure_alive(actor)?;
        self.store_temporary(actor, value, lifecycles);
        Ok(())
    }

    fn store_typed<T: Property>(&mut self, actor: Actor, value: T) {
        let ty = PropertyType::of::<T>();
        let existed = self.has_type(actor, ty);
        self.get_chunk::<T>().insert(actor.id(), value);
        self.commit(actor, ty, existed);
    }

    fn toggle<T: Property>(&mut self, actor: Actor, enabled: bool) {
        let ty = PropertyType::of::<T>();
        match (enabled, self.has_type(actor, ty)) {
            (true, false) => self.store_typed(actor, T::default()),
            (false, true) => self.detach(actor, ty),
            _ => {}
        }
    }

    fn store_temporary<T: Property>(&mut self, actor: Actor, value: T, lifecycles: u32) {
        self.store_typed(actor, value.clone());
        self.temporary
            .push(TemporaryPropertyLifeData::new(actor, Box::new(value), lifecycles));
    }

    /// Record the type on the actor and raise the matching notification.
    fn commit(&mut self, actor: Actor, ty: PropertyType, existed: bool) {
        if existed {
            self.notify(actor, ty, TriggerAction::Replaced);
        } else {
            if let Some(slot) = self.pool.slot_mut(actor) {
                slot.property_types.push(ty);
            }
            self.notify(actor, ty, TriggerAction::Added);
        }
    }

    fn detach(&mut self, actor: Actor, ty: PropertyType) {
        if let Some(id) = self.registry.lookup(ty) {
            self.chunks[id.index()].remove(actor.id());
        }
        if let Some(slot) = self.pool.slot_mut(actor) {
            slot.property_types.retain(|&t| t != ty);
        }
        self.notify(actor, ty, TriggerAction::Removed);
    }

    // -- erased mutation surface --------------------------------------------

    /// Clone `actor`'s property of type `ty` into a box.
    pub fn get_prop_object(&self, actor: Actor, ty: PropertyType) -> Option<Box<dyn PropertyValue>> {
        if !self.has_type(actor, ty) {
            return None;
        }
        let id = self.registry.lookup(ty)?;
        self.chunks[id.index()].get_boxed(actor.id())
    }

    /// Push an opaque value into `actor`'s property set: replaces the
    /// property of the same type if present, attaches it otherwise.
    pub fn restore_prop_from_object(
        &mut self,
        actor: Actor,
        value: Box<dyn PropertyValue>,
    ) -> Result<(), EcsError> {
        self.ensure_alive(actor)?;
        self.store_erased(actor, value)
    }

    /// Attach an opaque value declared to be of type `ty`.
    ///
    /// Fails with [`EcsError::PropertyTypeMismatch`] when the value's
    /// concrete type differs from `ty`.
    pub fn add_prop_object(
        &mut self,
        actor: Actor,
        ty: PropertyType,
        value: Box<dyn PropertyValue>,
    ) -> Result<(), EcsError> {
        self.ensure_alive(actor)?;
        if value.property_type() != ty {
            return Err(EcsError::PropertyTypeMismatch {
                expected: ty.name().to_owned(),
            });
        }
        self.store_erased(actor, value)
    }

    /// Detach the property of type `ty`. Detaching an absent type does nothing.
    pub fn remove_prop_object(&mut self, actor: Actor, ty: PropertyType) -> Result<(), EcsError> {
        self.ensure_alive(actor)?;
        if !self.has_type(actor, ty) {
            tracing::debug!(actor = ?actor, property = %ty, "remove of absent property ignored");
            return Ok(());
        }
        self.detach(actor, ty);
        Ok(())
    }

    fn store_erased(&mut self, actor: Actor, value: Box<dyn PropertyValue>) -> Result<(), EcsError> {
        let ty = value.property_type();
        let size = std::mem::size_of_val(value.as_any());
        let index = self.ensure_chunk(ty, size, |capacity| value.new_chunk(capacity));
        let existed = self.has_type(actor, ty);
        self.chunks[index].insert_boxed(actor.id(), value)?;
        self.commit(actor, ty, existed);
        Ok(())
    }

    // -- change routing -----------------------------------------------------

    /// Route one mutation: filters, triggers, history, then observers.
    fn notify(&mut self, actor: Actor, ty: PropertyType, action: TriggerAction) {
        let types = self.pool.property_types(actor);
        if action != TriggerAction::Replaced {
            for filter in &mut self.filters {
                filter.on_actor_changed(actor, types);
            }
        }
        for trigger in &mut self.triggers {
            trigger.validate_for_trigger(actor, ty, action);
        }

        if self.history.is_enabled() {
            let value = match action {
                TriggerAction::Removed => None,
                _ => self
                    .registry
                    .lookup(ty)
                    .and_then(|id| self.chunks[id.index()].debug_value(actor.id())),
            };
            self.history.record(ActorEvent {
                cycle: self.cycle,
                actor,
                action,
                property: ty.name().to_owned(),
                value,
            });
        }

        if let Some(slot) = self.pool.slot_mut(actor) {
            let event = PropertyEvent {
                actor,
                property: ty,
                action,
            };
            for observer in &mut slot.observers {
                (observer.callback)(&event);
            }
        }
        tracing::trace!(actor = ?actor, property = %ty, action = ?action, "property changed");
    }

    /// Register a callback fired on every property change of `actor`.
    ///
    /// Observers are dropped when the actor is destroyed.
    pub fn observe(
        &mut self,
        actor: Actor,
        callback: impl FnMut(&PropertyEvent) + 'static,
    ) -> Result<ListenerId, EcsError> {
        self.ensure_alive(actor)?;
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        if let Some(slot) = self.pool.slot_mut(actor) {
            slot.observers.push(Observer {
                id,
                callback: Box::new(callback),
            });
        }
        Ok(id)
    }

    /// Remove an observer. Returns whether it was registered on `actor`.
    pub fn unobserve(&mut self, actor: Actor, listener: ListenerId) -> bool {
        let Some(slot) = self.pool.slot_mut(actor) else {
            return false;
        };
        let before = slot.observers.len();
        slot.observers.retain(|o| o.id != listener);
        slot.observers.len() != before
    }

    /// Recorded change history. Empty unless `history_capacity > 0`.
    pub fn history(&self) -> &EventLog {
        &self.history
    }

    // -- filters and triggers -----------------------------------------------

    /// An empty option sized from the world configuration.
    pub fn filter_option(&self) -> FilterOption {
        FilterOption::with_capacity(self.config.option_capacity)
    }

    /// The filter for `option`, built on first request.
    ///
    /// Structurally equal options share one filter.
    pub fn get_filter(&mut self, option: FilterOption) -> FilterId {
        if let Some(index) = self.filters.iter().position(|f| f.option() == &option) {
            return FilterId(index as u32);
        }
        let mut filter = Filter::new();
        let pool = &self.pool;
        filter.build(option, pool.iter_alive().map(|a| (a, pool.property_types(a))));
        let id = FilterId(self.filters.len() as u32);
        tracing::debug!(filter = id.0, members = filter.len(), "filter built");
        self.filters.push(filter);
        id
    }

    /// A filter previously returned by [`get_filter`](Self::get_filter).
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by another world.
    pub fn filter(&self, id: FilterId) -> &Filter {
        &self.filters[id.index()]
    }

    /// Number of distinct filters.
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Register a trigger. Its matched set starts filling immediately.
    pub fn add_trigger(&mut self, trigger: Trigger) -> TriggerId {
        let id = TriggerId(self.triggers.len() as u32);
        self.triggers.push(trigger);
        id
    }

    /// A trigger previously returned by [`add_trigger`](Self::add_trigger).
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by another world.
    pub fn trigger(&self, id: TriggerId) -> &Trigger {
        &self.triggers[id.index()]
    }

    /// Number of registered triggers.
    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    // -- cycle boundary -----------------------------------------------------

    /// Pending temporary-property records.
    pub fn temporary_properties(&self) -> &[TemporaryPropertyLifeData] {
        &self.temporary
    }

    /// Number of pending temporary-property records.
    pub fn temporary_count(&self) -> usize {
        self.temporary.len()
    }

    /// Close the current cycle: clear every trigger, then age temporary
    /// properties and remove the ones that expired.
    ///
    /// Records of dead actors are dropped. The queue is compacted in place and
    /// keeps its order.
    pub fn abilities_cycle_finished(&mut self) {
        for trigger in &mut self.triggers {
            trigger.clear();
        }

        let len = self.temporary.len();
        let mut offset = 0;
        for i in 0..len {
            let actor = self.temporary[i].actor();
            let keep = if !self.pool.is_alive(actor) {
                false
            } else {
                if self.temporary[i].step() == LifeStep::Materialize {
                    let value = self.temporary[i].value().clone_value();
                    if let Err(err) = self.store_erased(actor, value) {
                        tracing::error!(actor = ?actor, %err, "failed to materialize temporary property");
                    }
                }
                if self.temporary[i].is_expired() {
                    // Removed in queue order so a later record for the same
                    // property restores it afterwards.
                    let ty = self.temporary[i].property_type();
                    if let Err(err) = self.remove_prop_object(actor, ty) {
                        tracing::warn!(actor = ?actor, property = %ty, %err, "failed to expire temporary property");
                    }
                    false
                } else {
                    true
                }
            };
            if !keep {
                offset += 1;
            } else if offset > 0 {
                self.temporary.swap(i - offset, i);
            }
        }
        self.temporary.truncate(len - offset);

        self.cycle += 1;
        tracing::trace!(cycle = self.cycle, pending = self.temporary.len(), "cycle finished");
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("actors", &self.pool.alive_count())
            .field("property_types", &self.registry.len())
            .field("filters", &self.filters.len())
            .field("triggers", &self.triggers.len())
            .field("temporary", &self.temporary.len())
            .field("cycle", &self.cycle)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ActorMut -- chained per-actor mutation
// ---------------------------------------------------------------------------

/// Mutation view over one live actor, obtained from
/// [`World::actor_mut`]. The actor stays alive for the lifetime of the view,
/// so its methods cannot fail.
///
/// ```
/// use tessera_ecs::prelude::*;
///
/// #[derive(Debug, Clone, Default)]
/// struct Health(u32);
/// #[derive(Debug, Clone, Default)]
/// struct Burning;
///
/// let mut world = World::new();
/// let actor = world.create_actor();
/// world
///     .actor_mut(actor)
///     .unwrap()
///     .add_prop(Health(10))
///     .set_property_enabled::<Burning>(true);
/// assert!(world.has_prop::<Burning>(actor));
/// ```
pub struct ActorMut<'w> {
    world: &'w mut World,
    actor: Actor,
}

impl<'w> ActorMut<'w> {
    /// The actor this view mutates.
    pub fn actor(&self) -> Actor {
        self.actor
    }

    /// Property types the actor holds, in insertion order.
    pub fn property_types(&self) -> &[PropertyType] {
        self.world.property_types(self.actor)
    }

    /// Whether the actor holds a `T`.
    pub fn has_prop<T: Property>(&self) -> bool {
        self.world.has_prop::<T>(self.actor)
    }

    /// The actor's `T`, if present.
    pub fn prop<T: Property>(&self) -> Option<&T> {
        self.world.prop::<T>(self.actor)
    }

    /// Fail-soft mutable access, as [`World::get_prop`].
    pub fn get_prop<T: Property>(&mut self) -> &mut T {
        self.world.get_prop::<T>(self.actor)
    }

    /// See [`World::add_prop`].
    pub fn add_prop<T: Property>(&mut self, value: T) -> &mut Self {
        self.world.store_typed(self.actor, value);
        self
    }

    /// See [`World::replace_prop`].
    pub fn replace_prop<T: Property>(&mut self, value: T) -> &mut Self {
        self.world.store_typed(self.actor, value);
        self
    }

    /// See [`World::remove_prop`].
    pub fn remove_prop<T: Property>(&mut self) -> &mut Self {
        let ty = PropertyType::of::<T>();
        if self.world.has_type(self.actor, ty) {
            self.world.detach(self.actor, ty);
        }
        self
    }

    /// See [`World::set_property_enabled`].
    pub fn set_property_enabled<T: Property>(&mut self, enabled: bool) -> &mut Self {
        self.world.toggle::<T>(self.actor, enabled);
        self
    }

    /// See [`World::add_temporary_prop`].
    pub fn add_temporary_prop<T: Property>(&mut self, value: T, lifecycles: u32) -> &mut Self {
        self.world.store_temporary(self.actor, value, lifecycles);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
