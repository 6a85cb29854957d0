//! Actor handles and the actor pool.
//!
//! An [`Actor`] is a copyable handle: the reusable integer `id` plus a
//! `generation` that is bumped every time the id is returned to the pool.
//! Once an id has been handed to a new actor, handles to the previous owner
//! report as dead.
//!
//! The [`ActorPool`] is an arena of slots (slot index = `id - 1`) with a LIFO
//! free list. Each slot holds the actor's ordered list of attached property
//! types, which is the single source of truth consulted by filters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::events::{ListenerId, PropertyEvent};
use crate::property::PropertyType;
use crate::EcsError;

/// Largest id handed out by default before the id counter wraps back to 1.
pub const DEFAULT_MAX_ACTOR_ID: u32 = i32::MAX as u32;

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// A generational actor handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Actor {
    id: u32,
    generation: u32,
}

impl Actor {
    /// Construct a handle from its parts.
    #[inline]
    pub fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }

    /// The actor id. Ids are unique among live actors and reused after
    /// release.
    #[inline]
    pub fn id(self) -> u32 {
        self.id
    }

    /// How many times this id had been released before this handle was issued.
    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Actor({}v{})", self.id, self.generation)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.id, self.generation)
    }
}

// ---------------------------------------------------------------------------
// ActorSlot
// ---------------------------------------------------------------------------

pub(crate) type ObserverFn = Box<dyn FnMut(&PropertyEvent)>;

pub(crate) struct Observer {
    pub id: ListenerId,
    pub callback: ObserverFn,
}

/// Pool slot backing one actor id.
pub(crate) struct ActorSlot {
    pub generation: u32,
    pub alive: bool,
    pub property_types: Vec<PropertyType>,
    pub observers: Vec<Observer>,
}

impl ActorSlot {
    fn new() -> Self {
        Self {
            generation: 0,
            alive: true,
            property_types: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Return the slot to its pooled state.
    fn release(&mut self) -> Vec<PropertyType> {
        self.alive = false;
        self.observers.clear();
        self.generation = self.generation.wrapping_add(1);
        std::mem::take(&mut self.property_types)
    }
}

impl fmt::Debug for ActorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSlot")
            .field("generation", &self.generation)
            .field("alive", &self.alive)
            .field("property_types", &self.property_types)
            .field("observers", &self.observers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ActorPool
// ---------------------------------------------------------------------------

/// Arena of actor slots with id recycling.
#[derive(Debug)]
pub struct ActorPool {
    slots: Vec<ActorSlot>,
    /// Released ids, most recently released last.
    free: Vec<u32>,
    last_id: u32,
    max_id: u32,
    alive_count: usize,
}

impl ActorPool {
    /// Create a pool that mints ids in `1..=max_id`.
    pub fn new(max_id: u32) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            last_id: 1,
            max_id: max_id.max(1),
            alive_count: 0,
        }
    }

    /// Advance the id counter, wrapping back to 1 after `max_id`.
    fn next_id(&mut self) -> u32 {
        let id = self.last_id;
        self.last_id = if id >= self.max_id { 1 } else { id + 1 };
        id
    }

    /// Hand out an actor, reusing the most recently released id if any.
    pub fn obtain(&mut self) -> Result<Actor, EcsError> {
        if let Some(id) = self.free.pop() {
            let slot = &mut self.slots[id as usize - 1];
            slot.alive = true;
            self.alive_count += 1;
            return Ok(Actor::new(id, slot.generation));
        }

        let id = self.next_id();
        let index = id as usize - 1;
        if index < self.slots.len() {
            // The counter wrapped onto an id that is still in use, and the
            // free list is empty: every id in 1..=max_id is live.
            return Err(EcsError::ActorCapacityExhausted { max_id: self.max_id });
        }
        self.slots.push(ActorSlot::new());
        self.alive_count += 1;
        Ok(Actor::new(id, 0))
    }

    /// Return an actor to the pool.
    ///
    /// Returns the property types it carried, or `None` if the handle was
    /// already dead or stale.
    pub(crate) fn release(&mut self, actor: Actor) -> Option<Vec<PropertyType>> {
        let slot = self.slot_mut(actor)?;
        let types = slot.release();
        self.free.push(actor.id);
        self.alive_count -= 1;
        Some(types)
    }

    /// Whether `actor` is live and its generation is current.
    pub fn is_alive(&self, actor: Actor) -> bool {
        self.slot(actor).is_some()
    }

    pub(crate) fn slot(&self, actor: Actor) -> Option<&ActorSlot> {
        let index = (actor.id as usize).checked_sub(1)?;
        self.slots
            .get(index)
            .filter(|slot| slot.alive && slot.generation == actor.generation)
    }

    pub(crate) fn slot_mut(&mut self, actor: Actor) -> Option<&mut ActorSlot> {
        let index = (actor.id as usize).checked_sub(1)?;
        self.slots
            .get_mut(index)
            .filter(|slot| slot.alive && slot.generation == actor.generation)
    }

    /// Property types currently attached to `actor` (empty if dead).
    pub fn property_types(&self, actor: Actor) -> &[PropertyType] {
        self.slot(actor)
            .map(|slot| slot.property_types.as_slice())
            .unwrap_or(&[])
    }

    /// The live handle currently owning `id`.
    pub fn get_by_id(&self, id: u32) -> Option<Actor> {
        let index = (id as usize).checked_sub(1)?;
        let slot = self.slots.get(index)?;
        slot.alive.then(|| Actor::new(id, slot.generation))
    }

    /// All live actors in id order.
    pub fn iter_alive(&self) -> impl Iterator<Item = Actor> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(index, slot)| Actor::new(index as u32 + 1, slot.generation))
    }

    /// Number of live actors.
    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Number of released actors waiting for reuse.
    pub fn pooled_count(&self) -> usize {
        self.free.len()
    }
}

impl Default for ActorPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ACTOR_ID)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
