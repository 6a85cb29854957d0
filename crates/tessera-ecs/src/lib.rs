//! Tessera ECS -- actor/property storage with incrementally maintained
//! queries and per-cycle reactive triggers.
//!
//! Actors are generational handles into a pooled arena. Each property type
//! lives in its own [`Chunk`](chunk::Chunk). [`Filter`](filter::Filter)s keep
//! the set of actors matching a [`FilterOption`](filter::FilterOption) up to
//! date as properties come and go, and [`Trigger`](trigger::Trigger)s collect
//! the actors that saw a given add/replace/remove since the last cycle
//! boundary.
//!
//! # Quick Start
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Health(u32);
//!
//! #[derive(Debug, Clone, Default)]
//! struct Poisoned;
//!
//! let mut world = World::new();
//! let poisoned = world.get_filter(FilterOption::new().with::<Health>().with::<Poisoned>());
//!
//! let actor = world.create_actor();
//! world.add_prop(actor, Health(100)).unwrap();
//! assert!(!world.filter(poisoned).contains(actor));
//!
//! world.add_temporary_prop(actor, Poisoned, 1).unwrap();
//! assert!(world.filter(poisoned).contains(actor));
//! assert_eq!(world.prop::<Health>(actor), Some(&Health(100)));
//! ```

#![deny(unsafe_code)]

pub mod actor;
pub mod chunk;
pub mod config;
pub mod events;
pub mod filter;
pub mod property;
pub mod temporary;
pub mod trigger;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by world operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The actor handle is dead, or its id now belongs to another actor.
    #[error("actor {actor:?} is not alive (destroyed or stale handle)")]
    StaleActor { actor: actor::Actor },

    /// A property type name was looked up that has never been registered.
    #[error("property type '{name}' not registered. Registered properties: [{registered}]")]
    UnknownProperty { name: String, registered: String },

    /// An erased value did not have the declared property type.
    #[error("property value does not match declared type '{expected}'")]
    PropertyTypeMismatch { expected: String },

    /// Every actor id up to the configured maximum is in use.
    #[error("actor pool exhausted: all ids up to {max_id} are live")]
    ActorCapacityExhausted { max_id: u32 },

    /// A configuration value was rejected.
    #[error("invalid world configuration: {0}")]
    InvalidConfig(String),

    /// JSON encoding or decoding failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::actor::Actor;
    pub use crate::chunk::Chunk;
    pub use crate::config::WorldConfig;
    pub use crate::events::{ActorEvent, EventLog, ListenerId, PropertyEvent};
    pub use crate::filter::{Filter, FilterId, FilterOption};
    pub use crate::property::{Property, PropertyType, PropertyTypeId, PropertyValue};
    pub use crate::trigger::{Trigger, TriggerAction, TriggerId};
    pub use crate::world::{ActorMut, World};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    // -- test property types ------------------------------------------------

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Empty;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct IntProp(i32);

    #[derive(Debug, Clone, Default, PartialEq)]
    struct BoolProp(bool);

    // -- actor pooling ------------------------------------------------------

    #[test]
    fn destroyed_id_is_reused() {
        let mut world = World::new();
        let a = world.create_actor();
        assert_eq!(a.id(), 1);
        world.destroy_actor(a).unwrap();

        let b = world.create_actor();
        assert_eq!(b.id(), 1);
        assert!(world.is_alive(b));
        assert!(!world.is_alive(a));
    }

    #[test]
    fn ids_are_unique_among_live_actors() {
        let mut world = World::new();
        let actors: Vec<Actor> = (0..10).map(|_| world.create_actor()).collect();
        for a in &actors[2..5] {
            world.destroy_actor(*a).unwrap();
        }
        let fresh: Vec<Actor> = (0..6).map(|_| world.create_actor()).collect();
        let mut ids: Vec<u32> = world.actors().map(Actor::id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 13);
        assert!(fresh.iter().all(|a| world.is_alive(*a)));
    }

    // -- properties ---------------------------------------------------------

    #[test]
    fn add_remove_round_trip() {
        let mut world = World::new();
        let a = world.create_actor();
        world.add_prop(a, IntProp(1)).unwrap();
        assert!(world.has_prop::<IntProp>(a));
        world.remove_prop::<IntProp>(a).unwrap();
        assert!(!world.has_prop::<IntProp>(a));
        world.add_prop(a, IntProp(2)).unwrap();
        assert!(world.has_prop::<IntProp>(a));
        assert_eq!(world.prop::<IntProp>(a), Some(&IntProp(2)));
    }

    #[test]
    fn replace_prop_updates_value() {
        let mut world = World::new();
        let a = world.create_actor();
        world.add_prop(a, IntProp(1)).unwrap();
        world.replace_prop(a, IntProp(5)).unwrap();
        assert_eq!(*world.get_prop::<IntProp>(a), IntProp(5));
    }

    #[test]
    fn missing_prop_reads_default() {
        let mut world = World::new();
        let a = world.create_actor();
        assert_eq!(*world.get_prop::<IntProp>(a), IntProp::default());
        assert!(!world.has_prop::<IntProp>(a));
    }

    // -- filters ------------------------------------------------------------

    #[test]
    fn filter_tracks_membership_without_rebuild() {
        let mut world = World::new();
        let a = world.create_actor();
        world.add_prop(a, Empty).unwrap();
        let filter = world.get_filter(FilterOption::new().with::<Empty>().with::<IntProp>());
        assert!(!world.filter(filter).contains(a));

        world.add_prop(a, IntProp(3)).unwrap();
        assert!(world.filter(filter).contains(a));

        world.remove_prop::<IntProp>(a).unwrap();
        assert!(!world.filter(filter).contains(a));
    }

    #[test]
    fn filter_with_any() {
        let mut world = World::new();
        let a = world.create_actor();
        world.add_prop(a, Empty).unwrap();
        let filter = world.get_filter(
            FilterOption::new()
                .with::<Empty>()
                .with_any::<IntProp>()
                .with_any::<BoolProp>(),
        );
        assert!(world.filter(filter).is_empty());
        world.add_prop(a, BoolProp(true)).unwrap();
        assert_eq!(world.filter(filter).get_copy(), vec![a]);
    }

    #[test]
    fn filter_without() {
        let mut world = World::new();
        let a = world.create_actor();
        world.add_prop(a, Empty).unwrap();
        let filter = world.get_filter(FilterOption::new().with::<Empty>().without::<IntProp>());
        assert!(world.filter(filter).contains(a));
        world.add_prop(a, IntProp(0)).unwrap();
        assert!(!world.filter(filter).contains(a));
    }

    #[test]
    fn destroyed_actor_leaves_filter() {
        let mut world = World::new();
        let a = world.create_actor();
        world.add_prop(a, Empty).unwrap();
        let filter = world.get_filter(FilterOption::new().with::<Empty>());
        assert_eq!(world.filter(filter).len(), 1);
        world.destroy_actor(a).unwrap();
        assert!(world.filter(filter).is_empty());
    }

    #[test]
    fn equal_options_share_one_filter() {
        let mut world = World::new();
        let a = world.get_filter(FilterOption::new().with::<Empty>().without::<BoolProp>());
        let b = world.get_filter(world.filter_option().without::<BoolProp>().with::<Empty>());
        let c = world.get_filter(FilterOption::new().with::<Empty>());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn replace_does_not_touch_filter_membership() {
        let mut world = World::new();
        let a = world.create_actor();
        let filter = world.get_filter(FilterOption::new().with::<IntProp>());
        world.add_prop(a, IntProp(1)).unwrap();
        world.replace_prop(a, IntProp(2)).unwrap();
        assert_eq!(world.filter(filter).get_copy(), vec![a]);
    }

    // -- triggers -----------------------------------------------------------

    #[test]
    fn trigger_matches_only_within_cycle() {
        let mut world = World::new();
        let added = world.add_trigger(Trigger::new().added::<IntProp>());
        let a = world.create_actor();
        world.add_prop(a, IntProp(1)).unwrap();
        assert_eq!(world.trigger(added).get_valid_actors(|_| true), vec![a]);

        world.abilities_cycle_finished();
        assert!(world.trigger(added).get_valid_actors(|_| true).is_empty());
    }

    #[test]
    fn trigger_distinguishes_actions() {
        let mut world = World::new();
        let added = world.add_trigger(Trigger::new().added::<IntProp>());
        let replaced = world.add_trigger(Trigger::new().replaced::<IntProp>());
        let removed = world.add_trigger(Trigger::new().removed::<IntProp>());
        let a = world.create_actor();

        world.add_prop(a, IntProp(1)).unwrap();
        world.abilities_cycle_finished();
        world.replace_prop(a, IntProp(2)).unwrap();
        assert_eq!(world.trigger(added).matched_len(), 0);
        assert_eq!(world.trigger(replaced).matched_len(), 1);

        world.abilities_cycle_finished();
        world.remove_prop::<IntProp>(a).unwrap();
        assert_eq!(world.trigger(replaced).matched_len(), 0);
        assert_eq!(world.trigger(removed).matched_len(), 1);
    }

    // -- temporary properties -----------------------------------------------

    #[test]
    fn temporary_property_law() {
        let mut world = World::new();
        let a = world.create_actor();
        let filter = world.get_filter(FilterOption::new().with::<BoolProp>());
        world.add_temporary_prop(a, BoolProp(true), 1).unwrap();
        assert!(world.has_prop::<BoolProp>(a));

        world.abilities_cycle_finished();
        assert!(world.has_prop::<BoolProp>(a));
        assert!(world.filter(filter).contains(a));

        world.abilities_cycle_finished();
        assert!(!world.has_prop::<BoolProp>(a));
        assert!(!world.filter(filter).contains(a));
    }
}
