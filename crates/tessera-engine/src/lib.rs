//! Tessera Engine -- ability scheduling on top of [`tessera_ecs`].
//!
//! Behavior is written as [`Ability`](ability::Ability) implementations and
//! driven by the [`WorldAbilityManager`](manager::WorldAbilityManager), which
//! owns the world and runs each cycle's phases in order: initialize, update
//! (with reactive execution at its tail), fixed update and tear down, followed
//! by the cycle boundary where triggers are cleared and temporary properties
//! age.
//!
//! # Quick Start
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! #[derive(Debug, Clone, Default)]
//! struct Damage(u32);
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Health(u32);
//!
//! /// Applies damage the cycle it lands, then drops it.
//! struct ApplyDamage;
//!
//! impl Ability for ApplyDamage {
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::REACTIVE
//!     }
//!
//!     fn trigger_by(&self) -> Trigger {
//!         Trigger::new().added::<Damage>()
//!     }
//!
//!     fn can_execute(&self, world: &World, actor: Actor) -> bool {
//!         world.has_prop::<Health>(actor)
//!     }
//!
//!     fn execute(&mut self, world: &mut World, actors: &[Actor]) {
//!         for &actor in actors {
//!             let amount = world.get_prop::<Damage>(actor).0;
//!             let health = world.get_prop::<Health>(actor);
//!             health.0 = health.0.saturating_sub(amount);
//!             world.remove_prop::<Damage>(actor).ok();
//!         }
//!     }
//! }
//!
//! let mut manager = WorldAbilityManager::new(World::new(), ManagerConfig::default());
//! manager.add_ability(ApplyDamage);
//!
//! let world = manager.world_mut();
//! let actor = world.create_actor();
//! world.add_prop(actor, Health(10)).unwrap();
//! world.add_prop(actor, Damage(3)).unwrap();
//!
//! manager.run_cycle();
//! assert_eq!(manager.world().prop::<Health>(actor), Some(&Health(7)));
//! ```

#![deny(unsafe_code)]

pub mod ability;
pub mod manager;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use tessera_ecs;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the ability manager.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The ability id is not (or no longer) registered.
    #[error("{id} is not registered")]
    UnknownAbility { id: ability::AbilityId },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ECS prelude.
    pub use tessera_ecs::prelude::*;

    // Engine-specific exports.
    pub use crate::ability::{Ability, AbilityId, Capabilities};
    pub use crate::manager::{CycleDiagnostics, ManagerConfig, Phase, WorldAbilityManager};
    pub use crate::EngineError;
}
