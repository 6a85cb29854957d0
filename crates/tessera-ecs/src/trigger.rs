//! Reactive triggers.
//!
//! A [`Trigger`] declares interest in `(property type, action)` pairs. The
//! world feeds every property mutation through
//! [`Trigger::validate_for_trigger`]; matching actors accumulate in the
//! trigger's matched set until the next cycle boundary clears it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::property::{Property, PropertyType};

/// The kind of property mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerAction {
    Added,
    Replaced,
    Removed,
}

/// Handle to a trigger registered in a [`World`](crate::world::World).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(pub(crate) u32);

impl TriggerId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declarative subscription to property mutations with a per-cycle matched
/// set.
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    on_add: Vec<PropertyType>,
    on_replace: Vec<PropertyType>,
    on_remove: Vec<PropertyType>,
    matched: BTreeSet<Actor>,
}

impl Trigger {
    /// A trigger with no declared interest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match actors that gain a `T`.
    pub fn added<T: Property>(mut self) -> Self {
        self.on_add.push(PropertyType::of::<T>());
        self
    }

    /// Match actors whose `T` is replaced.
    pub fn replaced<T: Property>(mut self) -> Self {
        self.on_replace.push(PropertyType::of::<T>());
        self
    }

    /// Match actors that lose their `T`.
    pub fn removed<T: Property>(mut self) -> Self {
        self.on_remove.push(PropertyType::of::<T>());
        self
    }

    /// Shorthand for `added::<T>().replaced::<T>().removed::<T>()`.
    pub fn any_action<T: Property>(self) -> Self {
        self.added::<T>().replaced::<T>().removed::<T>()
    }

    /// Declare interest in `action` on each of `types`.
    pub fn on_types(mut self, action: TriggerAction, types: &[PropertyType]) -> Self {
        self.list_mut(action).extend_from_slice(types);
        self
    }

    fn list(&self, action: TriggerAction) -> &[PropertyType] {
        match action {
            TriggerAction::Added => &self.on_add,
            TriggerAction::Replaced => &self.on_replace,
            TriggerAction::Removed => &self.on_remove,
        }
    }

    fn list_mut(&mut self, action: TriggerAction) -> &mut Vec<PropertyType> {
        match action {
            TriggerAction::Added => &mut self.on_add,
            TriggerAction::Replaced => &mut self.on_replace,
            TriggerAction::Removed => &mut self.on_remove,
        }
    }

    /// Whether this trigger reacts to `action` on `property`.
    pub fn is_interested(&self, property: PropertyType, action: TriggerAction) -> bool {
        self.list(action).contains(&property)
    }

    /// Record `actor` if `(property, action)` matches a declared interest.
    ///
    /// Liveness is checked by the caller; the world never routes mutations of
    /// released actors.
    pub fn validate_for_trigger(&mut self, actor: Actor, property: PropertyType, action: TriggerAction) {
        if self.is_interested(property, action) {
            self.matched.insert(actor);
        }
    }

    /// Matched actors for which `predicate` holds, in actor order.
    pub fn get_valid_actors<F>(&self, mut predicate: F) -> Vec<Actor>
    where
        F: FnMut(Actor) -> bool,
    {
        self.matched.iter().copied().filter(|&a| predicate(a)).collect()
    }

    /// The raw matched set for this cycle.
    pub fn matched(&self) -> &BTreeSet<Actor> {
        &self.matched
    }

    /// Number of actors matched this cycle.
    pub fn matched_len(&self) -> usize {
        self.matched.len()
    }

    /// Drop `actor` from the matched set.
    pub fn forget(&mut self, actor: Actor) {
        self.matched.remove(&actor);
    }

    /// Empty the matched set. Called once per cycle boundary.
    pub fn clear(&mut self) {
        self.matched.clear();
    }
}

pub(crate) fn same_multiset(a: &[PropertyType], b: &[PropertyType]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// Declarations compare as multisets; the matched set is not compared.
impl PartialEq for Trigger {
    fn eq(&self, other: &Self) -> bool {
        same_multiset(&self.on_add, &other.on_add)
            && same_multiset(&self.on_replace, &other.on_replace)
            && same_multiset(&self.on_remove, &other.on_remove)
    }
}

impl Eq for Trigger {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Health(u32);

    #[derive(Debug, Clone, Default)]
    struct Stunned;

    #[test]
    fn matches_only_declared_action() {
        let mut trigger = Trigger::new().added::<Health>();
        let a = Actor::new(1, 0);
        trigger.validate_for_trigger(a, PropertyType::of::<Health>(), TriggerAction::Removed);
        assert_eq!(trigger.matched_len(), 0);
        trigger.validate_for_trigger(a, PropertyType::of::<Stunned>(), TriggerAction::Added);
        assert_eq!(trigger.matched_len(), 0);
        trigger.validate_for_trigger(a, PropertyType::of::<Health>(), TriggerAction::Added);
        assert_eq!(trigger.get_valid_actors(|_| true), vec![a]);
    }

    #[test]
    fn any_action_covers_all_three() {
        let trigger = Trigger::new().any_action::<Stunned>();
        let ty = PropertyType::of::<Stunned>();
        assert!(trigger.is_interested(ty, TriggerAction::Added));
        assert!(trigger.is_interested(ty, TriggerAction::Replaced));
        assert!(trigger.is_interested(ty, TriggerAction::Removed));
    }

    #[test]
    fn predicate_gates_result() {
        let mut trigger = Trigger::new().replaced::<Health>();
        for id in 1..=4 {
            trigger.validate_for_trigger(
                Actor::new(id, 0),
                PropertyType::of::<Health>(),
                TriggerAction::Replaced,
            );
        }
        let even: Vec<u32> = trigger
            .get_valid_actors(|a| a.id() % 2 == 0)
            .into_iter()
            .map(Actor::id)
            .collect();
        assert_eq!(even, vec![2, 4]);
    }

    #[test]
    fn clear_and_forget() {
        let mut trigger = Trigger::new().removed::<Health>();
        let a = Actor::new(1, 0);
        let b = Actor::new(2, 0);
        for actor in [a, b] {
            trigger.validate_for_trigger(actor, PropertyType::of::<Health>(), TriggerAction::Removed);
        }
        trigger.forget(a);
        assert_eq!(trigger.get_valid_actors(|_| true), vec![b]);
        trigger.clear();
        assert!(trigger.matched().is_empty());
    }

    #[test]
    fn equality_ignores_declaration_order() {
        let a = Trigger::new().added::<Health>().added::<Stunned>();
        let b = Trigger::new().added::<Stunned>().added::<Health>();
        let c = Trigger::new().added::<Health>().removed::<Stunned>();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
