//! Lifecycle-counted temporary properties.
//!
//! A temporary property is stored on its actor immediately and queued with a
//! [`TemporaryPropertyLifeData`] record. At every cycle boundary the world
//! steps each record once:
//!
//! 1. The first step is a grace step: the value is materialized again as an
//!    ordinary property and the counter is left untouched.
//! 2. Every later step decrements the counter. Once it reaches zero the
//!    record expires and the property is removed from the actor.
//!
//! With `lifecycles = 1` the property therefore survives the cycle it was
//! added in plus one full cycle.

use std::fmt;

use crate::actor::Actor;
use crate::property::{PropertyType, PropertyValue};

/// Outcome of one cycle-boundary step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeStep {
    /// First boundary after creation: write the value back to the actor.
    Materialize,
    /// The counter was decremented.
    Aged,
}

/// Expiry record for one temporary property.
pub struct TemporaryPropertyLifeData {
    actor: Actor,
    value: Box<dyn PropertyValue>,
    remaining_cycles: u32,
    just_created: bool,
}

impl TemporaryPropertyLifeData {
    /// Record `value` on `actor` for `lifecycles` cycles after its grace step.
    pub fn new(actor: Actor, value: Box<dyn PropertyValue>, lifecycles: u32) -> Self {
        Self {
            actor,
            value,
            remaining_cycles: lifecycles,
            just_created: true,
        }
    }

    /// The actor the property belongs to.
    pub fn actor(&self) -> Actor {
        self.actor
    }

    /// The type of the stored value.
    pub fn property_type(&self) -> PropertyType {
        self.value.property_type()
    }

    /// The value that is restored on the grace step.
    pub fn value(&self) -> &dyn PropertyValue {
        self.value.as_ref()
    }

    /// Cycles left before expiry.
    pub fn remaining_cycles(&self) -> u32 {
        self.remaining_cycles
    }

    /// Whether the grace step has not run yet.
    pub fn is_just_created(&self) -> bool {
        self.just_created
    }

    /// Advance by one cycle boundary.
    pub fn step(&mut self) -> LifeStep {
        if self.just_created {
            self.just_created = false;
            LifeStep::Materialize
        } else {
            self.remaining_cycles = self.remaining_cycles.saturating_sub(1);
            LifeStep::Aged
        }
    }

    /// Whether the record should be dropped and its property removed.
    pub fn is_expired(&self) -> bool {
        !self.just_created && self.remaining_cycles == 0
    }
}

impl fmt::Debug for TemporaryPropertyLifeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryPropertyLifeData")
            .field("actor", &self.actor)
            .field("value", &self.value)
            .field("remaining_cycles", &self.remaining_cycles)
            .field("just_created", &self.just_created)
            .finish()
    }
}
