//! Abilities: units of per-cycle behavior.
//!
//! An ability declares which scheduling phases it takes part in through its
//! [`Capabilities`]. The [`WorldAbilityManager`](crate::manager::WorldAbilityManager)
//! only calls the hooks whose capability bit is set; every hook has a no-op
//! default so an ability implements just the phases it needs.
//!
//! Reactive abilities describe a [`Trigger`] in [`Ability::trigger_by`]. The
//! manager registers it once when the ability is added, and during the update
//! phase hands [`Ability::execute`] the actors the trigger matched this cycle
//! that pass [`Ability::can_execute`].

use std::fmt;

use tessera_ecs::actor::Actor;
use tessera_ecs::trigger::Trigger;
use tessera_ecs::world::World;

bitflags::bitflags! {
    /// Scheduling phases an ability takes part in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const INITIALIZE = 1 << 0;
        const UPDATE = 1 << 1;
        const FIXED_UPDATE = 1 << 2;
        const TEAR_DOWN = 1 << 3;
        const REACTIVE = 1 << 4;
    }
}

/// Handle returned by [`WorldAbilityManager::add_ability`](crate::manager::WorldAbilityManager::add_ability).
///
/// Ids are never reused within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbilityId(pub(crate) u32);

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ability#{}", self.0)
    }
}

/// A unit of behavior scheduled by the ability manager.
pub trait Ability: 'static {
    /// Which phases this ability runs in.
    fn capabilities(&self) -> Capabilities;

    /// Name used in logs and diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs in the initialization phase.
    fn initialize(&mut self, _world: &mut World) {}

    /// Runs in the update phase, before reactive abilities.
    fn update(&mut self, _world: &mut World) {}

    /// Runs in the fixed-update phase.
    fn fixed_update(&mut self, _world: &mut World) {}

    /// Runs in the tear-down phase, before the cycle boundary.
    fn tear_down(&mut self, _world: &mut World) {}

    /// The trigger a reactive ability listens to. Called once, at registration.
    fn trigger_by(&self) -> Trigger {
        Trigger::new()
    }

    /// Per-actor gate applied to the trigger's matches.
    fn can_execute(&self, _world: &World, _actor: Actor) -> bool {
        true
    }

    /// Handle this cycle's matched actors. Never called with an empty slice.
    fn execute(&mut self, _world: &mut World, _actors: &[Actor]) {}
}
