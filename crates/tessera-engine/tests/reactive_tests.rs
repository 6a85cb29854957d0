//! Reactive ability tests.
//!
//! Each scenario registers one reactive ability against a fresh world and
//! checks which mutations it sees, and that what it saw is forgotten at the
//! cycle boundary.

use proptest::prelude::*;
use tessera_engine::prelude::*;

// ---------------------------------------------------------------------------
// Test property types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
struct Value(i32);

#[derive(Debug, Clone, Default)]
struct Marker;

fn manager() -> WorldAbilityManager {
    WorldAbilityManager::new(World::new(), ManagerConfig::default())
}

// ---------------------------------------------------------------------------
// Test abilities
// ---------------------------------------------------------------------------

/// Sets `Value(1)` on actors that gained a `Value`.
struct OnAdded;

impl Ability for OnAdded {
    fn capabilities(&self) -> Capabilities {
        Capabilities::REACTIVE
    }

    fn trigger_by(&self) -> Trigger {
        Trigger::new().added::<Value>()
    }

    fn execute(&mut self, world: &mut World, actors: &[Actor]) {
        for &actor in actors {
            world.replace_prop(actor, Value(1)).unwrap();
        }
    }
}

/// Increments `Value` on actors whose `Value` was replaced.
struct OnReplaced;

impl Ability for OnReplaced {
    fn capabilities(&self) -> Capabilities {
        Capabilities::REACTIVE
    }

    fn trigger_by(&self) -> Trigger {
        Trigger::new().replaced::<Value>()
    }

    fn execute(&mut self, world: &mut World, actors: &[Actor]) {
        for &actor in actors {
            let next = world.get_prop::<Value>(actor).0 + 1;
            world.replace_prop(actor, Value(next)).unwrap();
        }
    }
}

/// Puts `Value(1)` back on actors that lost theirs.
struct OnRemoved;

impl Ability for OnRemoved {
    fn capabilities(&self) -> Capabilities {
        Capabilities::REACTIVE
    }

    fn trigger_by(&self) -> Trigger {
        Trigger::new().removed::<Value>()
    }

    fn execute(&mut self, world: &mut World, actors: &[Actor]) {
        for &actor in actors {
            world.add_prop(actor, Value(1)).unwrap();
        }
    }
}

/// Counts how many actors it was handed, in total.
#[derive(Default)]
struct CountMarkers {
    seen: std::rc::Rc<std::cell::Cell<usize>>,
}

impl Ability for CountMarkers {
    fn capabilities(&self) -> Capabilities {
        Capabilities::REACTIVE
    }

    fn trigger_by(&self) -> Trigger {
        Trigger::new().any_action::<Marker>()
    }

    fn execute(&mut self, _world: &mut World, actors: &[Actor]) {
        self.seen.set(self.seen.get() + actors.len());
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn added_after_registration_is_seen() {
    let mut m = manager();
    let actor = m.world_mut().create_actor();
    m.add_ability(OnAdded);
    m.world_mut().add_prop(actor, Value(0)).unwrap();

    m.perform_update();
    assert_eq!(*m.world_mut().get_prop::<Value>(actor), Value(1));
}

#[test]
fn added_before_registration_is_not_seen() {
    let mut m = manager();
    let actor = m.world_mut().create_actor();
    m.world_mut().add_prop(actor, Value(0)).unwrap();
    m.add_ability(OnAdded);

    m.perform_update();
    assert_ne!(*m.world_mut().get_prop::<Value>(actor), Value(1));
}

#[test]
fn replaced_is_seen_only_for_replacements() {
    let mut m = manager();
    let actor = m.world_mut().create_actor();
    m.add_ability(OnReplaced);

    m.world_mut().add_prop(actor, Value(0)).unwrap();
    m.perform_update();
    assert_eq!(*m.world_mut().get_prop::<Value>(actor), Value(0));

    m.world_mut().replace_prop(actor, Value(1)).unwrap();
    m.perform_update();
    assert_eq!(*m.world_mut().get_prop::<Value>(actor), Value(2));
}

#[test]
fn removed_is_seen() {
    let mut m = manager();
    let actor = m.world_mut().create_actor();
    m.world_mut().add_prop(actor, Value(0)).unwrap();
    m.add_ability(OnRemoved);

    m.world_mut().remove_prop::<Value>(actor).unwrap();
    m.perform_update();
    assert_eq!(*m.world_mut().get_prop::<Value>(actor), Value(1));
}

#[test]
fn matches_are_forgotten_at_the_boundary() {
    let mut m = manager();
    let counter = CountMarkers::default();
    let seen = std::rc::Rc::clone(&counter.seen);
    let id = m.add_ability(counter);
    let trigger = m.trigger_of(id).unwrap();

    let actor = m.world_mut().create_actor();
    m.world_mut().set_property_enabled::<Marker>(actor, true).unwrap();
    assert_eq!(m.world().trigger(trigger).matched_len(), 1);

    m.run_cycle();
    assert_eq!(seen.get(), 1);
    assert_eq!(m.world().trigger(trigger).matched_len(), 0);

    m.run_cycle();
    assert_eq!(seen.get(), 1);
}

#[test]
fn temporary_marker_is_seen_on_add_and_on_expiry() {
    let mut m = manager();
    let counter = CountMarkers::default();
    let seen = std::rc::Rc::clone(&counter.seen);
    m.add_ability(counter);

    let actor = m.world_mut().create_actor();
    m.world_mut().add_temporary_prop(actor, Marker, 1).unwrap();

    // Added.
    m.run_cycle();
    assert_eq!(seen.get(), 1);
    // Grace-step restore raises a replacement.
    m.run_cycle();
    assert_eq!(seen.get(), 2);
    assert!(!m.world().has_prop::<Marker>(actor));
    // Expiry raises a removal.
    m.run_cycle();
    assert_eq!(seen.get(), 3);
    m.run_cycle();
    assert_eq!(seen.get(), 3);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Over any toggle schedule, the reactive ability is handed exactly the
    /// actors whose marker changed during each cycle.
    #[test]
    fn reactive_sees_each_cycles_changes(schedule in prop::collection::vec(prop::collection::vec(any::<bool>(), 4), 1..12)) {
        let mut m = manager();
        let counter = CountMarkers::default();
        let seen = std::rc::Rc::clone(&counter.seen);
        m.add_ability(counter);
        let actors: Vec<Actor> = (0..4).map(|_| m.world_mut().create_actor()).collect();

        let mut expected = 0;
        for toggles in schedule {
            for (&actor, &enabled) in actors.iter().zip(&toggles) {
                let before = m.world().has_prop::<Marker>(actor);
                m.world_mut().set_property_enabled::<Marker>(actor, enabled).unwrap();
                if before != enabled {
                    expected += 1;
                }
            }
            m.run_cycle();
            prop_assert_eq!(seen.get(), expected);
        }
    }
}
