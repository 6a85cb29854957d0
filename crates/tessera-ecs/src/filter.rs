//! Declarative queries and their incrementally maintained results.
//!
//! A [`FilterOption`] describes a set of actors by property types:
//!
//! - `required`: the actor must carry every listed type,
//! - `any_of`: if non-empty, the actor must carry at least one listed type,
//! - `excluded`: the actor must carry none of the listed types.
//!
//! A [`Filter`] binds one option and keeps the set of matching actors up to
//! date as the world routes property changes and releases through it. The
//! world deduplicates filters, so equal options share a single [`Filter`].

use std::collections::BTreeSet;

use crate::actor::Actor;
use crate::property::{Property, PropertyType};
use crate::trigger::same_multiset;

/// Initial capacity of each type list in a new option.
pub const DEFAULT_OPTION_CAPACITY: usize = 7;

// ---------------------------------------------------------------------------
// FilterOption
// ---------------------------------------------------------------------------

/// Query descriptor over required / any-of / excluded property types.
///
/// Two options are equal when each of the three lists holds the same
/// multiset of types, regardless of order or reserved capacity.
#[derive(Debug, Clone)]
pub struct FilterOption {
    required: Vec<PropertyType>,
    any_of: Vec<PropertyType>,
    excluded: Vec<PropertyType>,
}

impl FilterOption {
    /// An empty option (matches every actor).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_OPTION_CAPACITY)
    }

    /// An empty option with room for `capacity` types per list before the
    /// first reallocation.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            required: Vec::with_capacity(capacity),
            any_of: Vec::with_capacity(capacity),
            excluded: Vec::with_capacity(capacity),
        }
    }

    /// Require `T`.
    pub fn with<T: Property>(mut self) -> Self {
        self.required.push(PropertyType::of::<T>());
        self
    }

    /// Accept actors carrying `T` (OR-ed with other `with_any` types).
    pub fn with_any<T: Property>(mut self) -> Self {
        self.any_of.push(PropertyType::of::<T>());
        self
    }

    /// Reject actors carrying `T`.
    pub fn without<T: Property>(mut self) -> Self {
        self.excluded.push(PropertyType::of::<T>());
        self
    }

    /// Require every type in `types`.
    pub fn with_types(mut self, types: &[PropertyType]) -> Self {
        self.required.extend_from_slice(types);
        self
    }

    /// Require at least one type in `types`.
    pub fn with_any_types(mut self, types: &[PropertyType]) -> Self {
        self.any_of.extend_from_slice(types);
        self
    }

    /// Reject actors holding any type in `types`.
    pub fn without_types(mut self, types: &[PropertyType]) -> Self {
        self.excluded.extend_from_slice(types);
        self
    }

    /// Types an actor must all hold.
    pub fn required(&self) -> &[PropertyType] {
        &self.required
    }

    /// Types of which an actor must hold at least one.
    pub fn any_of(&self) -> &[PropertyType] {
        &self.any_of
    }

    /// Types an actor must not hold.
    pub fn excluded(&self) -> &[PropertyType] {
        &self.excluded
    }

    /// Whether an actor carrying `types` satisfies this option.
    ///
    /// Checks required, then any-of, then excluded, stopping at the first
    /// failure.
    pub fn is_valid(&self, types: &[PropertyType]) -> bool {
        if !self.required.iter().all(|ty| types.contains(ty)) {
            return false;
        }
        if !self.any_of.is_empty() && !self.any_of.iter().any(|ty| types.contains(ty)) {
            return false;
        }
        !self.excluded.iter().any(|ty| types.contains(ty))
    }

    /// Multiset equality of all three lists.
    pub fn is_equals(&self, other: &FilterOption) -> bool {
        same_multiset(&self.required, &other.required)
            && same_multiset(&self.any_of, &other.any_of)
            && same_multiset(&self.excluded, &other.excluded)
    }
}

impl Default for FilterOption {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for FilterOption {
    fn eq(&self, other: &Self) -> bool {
        self.is_equals(other)
    }
}

impl Eq for FilterOption {}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Handle to a filter registered in a [`World`](crate::world::World).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(pub(crate) u32);

impl FilterId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Live membership set for one [`FilterOption`].
#[derive(Debug, Clone, Default)]
pub struct Filter {
    option: FilterOption,
    actors: BTreeSet<Actor>,
    built: bool,
}

impl Filter {
    /// An unbuilt filter. It matches nothing until [`build`](Self::build).
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `option` and collect every matching actor from `candidates`.
    ///
    /// Only the first call has an effect; later calls keep the original
    /// binding and membership.
    pub fn build<'a, I>(&mut self, option: FilterOption, candidates: I) -> &Self
    where
        I: IntoIterator<Item = (Actor, &'a [PropertyType])>,
    {
        if self.built {
            return self;
        }
        self.option = option;
        self.built = true;
        for (actor, types) in candidates {
            if self.option.is_valid(types) {
                self.actors.insert(actor);
            }
        }
        self
    }

    /// Whether [`build`](Self::build) has run.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// The bound option.
    pub fn option(&self) -> &FilterOption {
        &self.option
    }

    /// Re-evaluate `actor` after one of its properties was added or removed.
    pub fn on_actor_changed(&mut self, actor: Actor, types: &[PropertyType]) {
        if !self.built {
            return;
        }
        if self.option.is_valid(types) {
            self.actors.insert(actor);
        } else {
            self.actors.remove(&actor);
        }
    }

    /// Drop `actor`, which is returning to the pool.
    pub fn on_actor_released(&mut self, actor: Actor) {
        self.actors.remove(&actor);
    }

    /// The live membership set.
    ///
    /// The set cannot change while this borrow is held; take
    /// [`get_copy`](Self::get_copy) to mutate the world while walking the
    /// result.
    pub fn get(&self) -> &BTreeSet<Actor> {
        &self.actors
    }

    /// Point-in-time copy of the membership, in actor order.
    pub fn get_copy(&self) -> Vec<Actor> {
        self.actors.iter().copied().collect()
    }

    /// Whether `actor` is currently a member.
    pub fn contains(&self, actor: Actor) -> bool {
        self.actors.contains(&actor)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Whether the filter has no members.
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
