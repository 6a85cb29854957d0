//! Per-type property storage.
//!
//! A [`Chunk`] maps actor ids to property values using two parallel arrays:
//! `values[slot]` and `owners[slot]`. Lookup is a linear scan for the owning
//! slot, which stays cheap at the tens-to-hundreds of live actors per type
//! this storage targets and keeps the hot data contiguous.
//!
//! [`AnyChunk`] is the object-safe view the [`World`](crate::world::World)
//! keeps in its chunk table, so chunks of different value types can live in a
//! single collection and be driven through the erased mutation surface.

use std::any::Any;

use crate::property::{Property, PropertyType, PropertyValue};
use crate::EcsError;

/// Owner value of a free slot. Actor ids start at 1.
pub const EMPTY_SLOT: u32 = 0;

/// Default number of slots a chunk starts with.
pub const DEFAULT_CHUNK_CAPACITY: usize = 128;

// ---------------------------------------------------------------------------
// Chunk<T>
// ---------------------------------------------------------------------------

/// Column store for a single property type.
///
/// Invariant: `values.len() == owners.len()`, and at most one slot is owned by
/// any given actor id.
#[derive(Debug)]
pub struct Chunk<T: Property> {
    values: Vec<T>,
    owners: Vec<u32>,
    occupied: usize,
    /// Handed out by fail-soft reads. Reset before every use.
    fallback: T,
}

impl<T: Property> Chunk<T> {
    /// Create a chunk with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHUNK_CAPACITY)
    }

    /// Create a chunk with `capacity` empty slots.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: vec![T::default(); capacity],
            owners: vec![EMPTY_SLOT; capacity],
            occupied: 0,
            fallback: T::default(),
        }
    }

    #[inline]
    fn slot_of(&self, actor_id: u32) -> Option<usize> {
        if actor_id == EMPTY_SLOT {
            return None;
        }
        self.owners.iter().position(|&owner| owner == actor_id)
    }

    fn grow_to(&mut self, new_capacity: usize) {
        let old = self.owners.len();
        if new_capacity <= old {
            return;
        }
        self.values.resize(new_capacity, T::default());
        self.owners.resize(new_capacity, EMPTY_SLOT);
        tracing::trace!(
            property = %PropertyType::of::<T>(),
            from = old,
            to = new_capacity,
            "chunk grown"
        );
    }

    /// Store `value` for `actor_id`.
    ///
    /// Grows the storage (doubling past the id) when the id does not fit the
    /// current capacity, then writes into the first free slot. If the id
    /// already owns a slot, that slot is overwritten.
    pub fn insert(&mut self, actor_id: u32, value: T) {
        debug_assert_ne!(actor_id, EMPTY_SLOT, "actor id 0 is the empty-slot sentinel");
        if let Some(slot) = self.slot_of(actor_id) {
            self.values[slot] = value;
            return;
        }
        if self.owners.len() <= actor_id as usize {
            self.grow_to(actor_id as usize * 2);
        }
        let slot = match self.owners.iter().position(|&owner| owner == EMPTY_SLOT) {
            Some(slot) => slot,
            None => {
                let slot = self.owners.len();
                self.grow_to(slot * 2);
                slot
            }
        };
        self.values[slot] = value;
        self.owners[slot] = actor_id;
        self.occupied += 1;
    }

    /// Clear the slot owned by `actor_id`, returning its value.
    pub fn remove(&mut self, actor_id: u32) -> Option<T> {
        let slot = self.slot_of(actor_id)?;
        self.owners[slot] = EMPTY_SLOT;
        self.occupied -= 1;
        Some(std::mem::take(&mut self.values[slot]))
    }

    /// Whether `actor_id` owns a slot.
    pub fn has(&self, actor_id: u32) -> bool {
        self.slot_of(actor_id).is_some()
    }

    /// Strict read access.
    pub fn try_get(&self, actor_id: u32) -> Option<&T> {
        self.slot_of(actor_id).map(|slot| &self.values[slot])
    }

    /// Strict write access.
    pub fn try_get_mut(&mut self, actor_id: u32) -> Option<&mut T> {
        self.slot_of(actor_id).map(move |slot| &mut self.values[slot])
    }

    /// Mutable reference to the value stored for `actor_id`.
    ///
    /// Missing values are not fatal: the miss is logged and a reference to a
    /// freshly reset default value is returned. Writes through that reference
    /// are discarded.
    pub fn get(&mut self, actor_id: u32) -> &mut T {
        match self.slot_of(actor_id) {
            Some(slot) => &mut self.values[slot],
            None => {
                tracing::error!(
                    property = %PropertyType::of::<T>(),
                    actor_id,
                    "property not found for actor; returning default"
                );
                self.fallback = T::default();
                &mut self.fallback
            }
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.owners.len()
    }

    /// Iterate `(actor_id, &value)` over occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        self.owners
            .iter()
            .zip(self.values.iter())
            .filter(|(&owner, _)| owner != EMPTY_SLOT)
            .map(|(&owner, value)| (owner, value))
    }
}

impl<T: Property> Default for Chunk<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// AnyChunk -- erased chunk access
// ---------------------------------------------------------------------------

/// Object-safe access to a chunk whose value type is not known statically.
pub trait AnyChunk: Any {
    /// Token of the stored value type.
    fn property_type(&self) -> PropertyType;

    /// Whether `actor_id` owns a slot.
    fn has(&self, actor_id: u32) -> bool;

    /// Clear the slot owned by `actor_id`. Returns whether a slot was cleared.
    fn remove(&mut self, actor_id: u32) -> bool;

    /// Clone the stored value into a box.
    fn get_boxed(&self, actor_id: u32) -> Option<Box<dyn PropertyValue>>;

    /// Store an erased value, failing if its type differs from the chunk's.
    fn insert_boxed(&mut self, actor_id: u32, value: Box<dyn PropertyValue>)
        -> Result<(), EcsError>;

    /// `Debug` rendering of the stored value.
    fn debug_value(&self, actor_id: u32) -> Option<String>;

    /// Number of occupied slots.
    fn len(&self) -> usize;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Property> AnyChunk for Chunk<T> {
    fn property_type(&self) -> PropertyType {
        PropertyType::of::<T>()
    }

    fn has(&self, actor_id: u32) -> bool {
        Chunk::has(self, actor_id)
    }

    fn remove(&mut self, actor_id: u32) -> bool {
        Chunk::remove(self, actor_id).is_some()
    }

    fn get_boxed(&self, actor_id: u32) -> Option<Box<dyn PropertyValue>> {
        self.try_get(actor_id)
            .map(|value| Box::new(value.clone()) as Box<dyn PropertyValue>)
    }

    fn insert_boxed(
        &mut self,
        actor_id: u32,
        value: Box<dyn PropertyValue>,
    ) -> Result<(), EcsError> {
        match value.into_any().downcast::<T>() {
            Ok(typed) => {
                self.insert(actor_id, *typed);
                Ok(())
            }
            Err(_) => Err(EcsError::PropertyTypeMismatch {
                expected: PropertyType::of::<T>().name().to_owned(),
            }),
        }
    }

    fn debug_value(&self, actor_id: u32) -> Option<String> {
        self.try_get(actor_id).map(|value| format!("{value:?}"))
    }

    fn len(&self) -> usize {
        self.occupied
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
