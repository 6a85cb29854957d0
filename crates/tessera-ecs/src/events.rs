//! Change notifications and the bounded event history.
//!
//! Every property add/replace/remove produces a [`PropertyEvent`], delivered
//! to the observers registered on the affected actor. When history is enabled
//! in [`WorldConfig`](crate::config::WorldConfig), the world also records an
//! [`ActorEvent`] per change into an [`EventLog`] that external history
//! tooling can query or export as JSON.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::property::PropertyType;
use crate::trigger::TriggerAction;
use crate::EcsError;

/// Handle returned by [`World::observe`](crate::world::World::observe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// A single property change, as seen by per-actor observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PropertyEvent {
    /// The actor whose property changed.
    pub actor: Actor,
    /// The property type involved.
    pub property: PropertyType,
    /// What happened to it.
    pub action: TriggerAction,
}

/// A recorded property change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorEvent {
    /// Number of completed cycles when the change happened.
    pub cycle: u64,
    pub actor: Actor,
    pub action: TriggerAction,
    /// Fully qualified property type name.
    pub property: String,
    /// `Debug` rendering of the value after the change; `None` for removals.
    pub value: Option<String>,
}

/// Bounded FIFO of [`ActorEvent`]s. A capacity of zero disables recording.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    capacity: usize,
    events: VecDeque<ActorEvent>,
}

impl EventLog {
    /// Create a log keeping at most `capacity` events; `0` disables it.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    /// Whether events are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    /// Append an event, evicting the oldest one when full.
    pub fn record(&mut self, event: ActorEvent) {
        if !self.is_enabled() {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// All recorded events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ActorEvent> + '_ {
        self.events.iter()
    }

    /// Events recorded for one actor, oldest first.
    pub fn for_actor(&self, actor: Actor) -> Vec<&ActorEvent> {
        self.events.iter().filter(|e| e.actor == actor).collect()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no event has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every recorded event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Serialize the whole history as a JSON array.
    pub fn to_json(&self) -> Result<String, EcsError> {
        serde_json::to_string(&self.events).map_err(EcsError::from)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn event(actor: Actor, action: TriggerAction) -> ActorEvent {
        ActorEvent {
            cycle: 0,
            actor,
            action,
            property: "Health".to_owned(),
            value: None,
        }
    }

    #[test]
    fn disabled_log_records_nothing() {
        let mut log = EventLog::new(0);
        log.record(event(Actor::new(1, 0), TriggerAction::Added));
        assert!(log.is_empty());
    }

    #[test]
    fn oldest_event_is_evicted() {
        let mut log = EventLog::new(2);
        log.record(event(Actor::new(1, 0), TriggerAction::Added));
        log.record(event(Actor::new(2, 0), TriggerAction::Added));
        log.record(event(Actor::new(3, 0), TriggerAction::Removed));
        let ids: Vec<u32> = log.iter().map(|e| e.actor.id()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn filter_by_actor() {
        let mut log = EventLog::new(8);
        let a = Actor::new(1, 0);
        log.record(event(a, TriggerAction::Added));
        log.record(event(Actor::new(2, 0), TriggerAction::Added));
        log.record(event(a, TriggerAction::Replaced));
        let actions: Vec<TriggerAction> = log.for_actor(a).iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![TriggerAction::Added, TriggerAction::Replaced]);
    }

    #[test]
    fn json_export_round_trips() {
        let mut log = EventLog::new(4);
        log.record(event(Actor::new(1, 2), TriggerAction::Removed));
        let json = log.to_json().unwrap();
        let back: Vec<ActorEvent> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log.iter().cloned().collect::<Vec<_>>());
    }
}
