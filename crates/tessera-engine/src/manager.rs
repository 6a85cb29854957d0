//! Phase scheduler for abilities.
//!
//! The [`WorldAbilityManager`] owns a [`World`] and the abilities registered
//! against it. The host calls the phases once per frame, in order:
//!
//! 1. [`perform_initialization`](WorldAbilityManager::perform_initialization)
//!    (typically once, before the first frame),
//! 2. [`perform_update`](WorldAbilityManager::perform_update): update
//!    abilities, then reactive abilities fed from their triggers,
//! 3. [`perform_fixed_update`](WorldAbilityManager::perform_fixed_update),
//! 4. [`perform_tear_down`](WorldAbilityManager::perform_tear_down): tear-down
//!    abilities, then the cycle boundary (triggers cleared, temporary
//!    properties aged).
//!
//! Within a phase abilities run in registration order. A disabled ability
//! keeps its place but is skipped in every phase.
//!
//! # Example
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! #[derive(Debug, Clone, Default)]
//! struct Age(u32);
//!
//! struct Aging;
//!
//! impl Ability for Aging {
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::UPDATE
//!     }
//!
//!     fn update(&mut self, world: &mut World) {
//!         let actors: Vec<Actor> = world.actors().collect();
//!         for actor in actors {
//!             world.get_prop::<Age>(actor).0 += 1;
//!         }
//!     }
//! }
//!
//! let mut world = World::new();
//! let actor = world.create_actor();
//! world.add_prop(actor, Age(0)).unwrap();
//!
//! let mut manager = WorldAbilityManager::new(world, ManagerConfig::default());
//! manager.add_ability(Aging);
//! manager.run_cycles(3);
//!
//! assert_eq!(manager.world().prop::<Age>(actor).map(|a| a.0), Some(3));
//! assert_eq!(manager.cycle_count(), 3);
//! ```

use std::any::TypeId;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tessera_ecs::actor::Actor;
use tessera_ecs::trigger::TriggerId;
use tessera_ecs::world::World;

use crate::ability::{Ability, AbilityId, Capabilities};
use crate::EngineError;

// ---------------------------------------------------------------------------
// ManagerConfig
// ---------------------------------------------------------------------------

/// Configuration for the ability manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Run the initialization phase automatically on the first
    /// [`run_cycle`](WorldAbilityManager::run_cycle).
    pub auto_initialize: bool,
    /// Record per-ability and per-phase timings into [`CycleDiagnostics`].
    /// Execution counts and the boundary time are always recorded.
    pub collect_diagnostics: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            auto_initialize: true,
            collect_diagnostics: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Scheduling phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Between cycles.
    Idle,
    Initialize,
    Update,
    /// Reactive execution, the tail of the update phase.
    Reactive,
    FixedUpdate,
    TearDown,
}

impl Phase {
    fn capability(self) -> Capabilities {
        match self {
            Phase::Idle => Capabilities::empty(),
            Phase::Initialize => Capabilities::INITIALIZE,
            Phase::Update => Capabilities::UPDATE,
            Phase::Reactive => Capabilities::REACTIVE,
            Phase::FixedUpdate => Capabilities::FIXED_UPDATE,
            Phase::TearDown => Capabilities::TEAR_DOWN,
        }
    }
}

// ---------------------------------------------------------------------------
// CycleDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleDiagnostics {
    /// Wall-clock time per ability invocation, in execution order.
    pub ability_times: Vec<(String, Phase, Duration)>,
    /// Wall-clock time per phase, in execution order.
    pub phase_times: Vec<(Phase, Duration)>,
    /// Number of reactive `execute` calls.
    pub reactive_executions: usize,
    /// Total number of actors handed to reactive abilities.
    pub reactive_actors: usize,
    /// Time spent in the cycle boundary sweep.
    pub boundary_time: Duration,
}

impl CycleDiagnostics {
    /// Sum of all phase times plus the boundary sweep.
    pub fn total_time(&self) -> Duration {
        self.phase_times.iter().map(|(_, d)| *d).sum::<Duration>() + self.boundary_time
    }
}

// ---------------------------------------------------------------------------
// RegisteredAbility
// ---------------------------------------------------------------------------

struct RegisteredAbility {
    id: AbilityId,
    type_id: TypeId,
    name: String,
    capabilities: Capabilities,
    enabled: bool,
    trigger: Option<TriggerId>,
    ability: Box<dyn Ability>,
}

impl fmt::Debug for RegisteredAbility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredAbility")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("enabled", &self.enabled)
            .field("trigger", &self.trigger)
            .finish()
    }
}

type CycleHook = Box<dyn FnMut(&World)>;

// ---------------------------------------------------------------------------
// WorldAbilityManager
// ---------------------------------------------------------------------------

/// Owns a [`World`] and drives its abilities through the phases of a cycle.
pub struct WorldAbilityManager {
    world: World,
    config: ManagerConfig,
    /// Registration order is execution order within every phase.
    abilities: Vec<RegisteredAbility>,
    next_id: u32,
    phase: Phase,
    initialized: bool,
    cycle_counter: u64,
    current: CycleDiagnostics,
    last_diagnostics: CycleDiagnostics,
    cycle_hooks: Vec<CycleHook>,
}

impl WorldAbilityManager {
    /// Create a manager driving `world`.
    pub fn new(world: World, config: ManagerConfig) -> Self {
        Self {
            world,
            config,
            abilities: Vec::new(),
            next_id: 0,
            phase: Phase::Idle,
            initialized: false,
            cycle_counter: 0,
            current: CycleDiagnostics::default(),
            last_diagnostics: CycleDiagnostics::default(),
            cycle_hooks: Vec::new(),
        }
    }

    // -- registration -------------------------------------------------------

    /// Register an ability, enabled.
    ///
    /// A reactive ability's trigger is built from [`Ability::trigger_by`] and
    /// registered with the world here, once.
    pub fn add_ability<A: Ability>(&mut self, ability: A) -> AbilityId {
        let id = AbilityId(self.next_id);
        self.next_id += 1;
        let capabilities = ability.capabilities();
        let trigger = capabilities
            .contains(Capabilities::REACTIVE)
            .then(|| self.world.add_trigger(ability.trigger_by()));
        let name = ability.name().to_owned();
        tracing::debug!(%id, name = %name, ?capabilities, "ability added");
        self.abilities.push(RegisteredAbility {
            id,
            type_id: TypeId::of::<A>(),
            name,
            capabilities,
            enabled: true,
            trigger,
            ability: Box::new(ability),
        });
        id
    }

    /// Unregister an ability, handing it back.
    ///
    /// A reactive ability's trigger stays registered with the world; it is
    /// simply no longer read.
    pub fn remove_ability(&mut self, id: AbilityId) -> Result<Box<dyn Ability>, EngineError> {
        let index = self.index_of(id)?;
        let entry = self.abilities.remove(index);
        tracing::debug!(%id, name = %entry.name, "ability removed");
        Ok(entry.ability)
    }

    /// Unregister every ability of concrete type `A`. Returns how many were
    /// removed.
    pub fn remove_abilities_of<A: Ability>(&mut self) -> usize {
        let before = self.abilities.len();
        self.abilities.retain(|entry| entry.type_id != TypeId::of::<A>());
        before - self.abilities.len()
    }

    /// Enable or disable one ability.
    pub fn set_ability_enabled(&mut self, id: AbilityId, enabled: bool) -> Result<(), EngineError> {
        let index = self.index_of(id)?;
        self.abilities[index].enabled = enabled;
        Ok(())
    }

    /// Enable or disable every ability of concrete type `A`. Returns how many
    /// were affected.
    pub fn set_active_ability<A: Ability>(&mut self, enabled: bool) -> usize {
        let mut count = 0;
        for entry in &mut self.abilities {
            if entry.type_id == TypeId::of::<A>() {
                entry.enabled = enabled;
                count += 1;
            }
        }
        count
    }

    /// Whether the ability is enabled, or `None` if it is not registered.
    pub fn is_enabled(&self, id: AbilityId) -> Option<bool> {
        self.abilities
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.enabled)
    }

    /// The trigger registered for a reactive ability.
    pub fn trigger_of(&self, id: AbilityId) -> Option<TriggerId> {
        self.abilities
            .iter()
            .find(|entry| entry.id == id)
            .and_then(|entry| entry.trigger)
    }

    fn index_of(&self, id: AbilityId) -> Result<usize, EngineError> {
        self.abilities
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(EngineError::UnknownAbility { id })
    }

    /// Register a hook fired after every cycle boundary.
    pub fn on_cycle_finished(&mut self, hook: impl FnMut(&World) + 'static) {
        self.cycle_hooks.push(Box::new(hook));
    }

    // -- phases -------------------------------------------------------------

    fn enter(&mut self, phase: Phase) {
        if phase < self.phase {
            tracing::warn!(
                current = ?self.phase,
                requested = ?phase,
                "phase performed out of order"
            );
        }
        self.phase = phase;
    }

    /// Run the hook for `phase` on every enabled ability in its bucket.
    fn run_bucket(&mut self, phase: Phase) {
        let phase_start = Instant::now();
        let capability = phase.capability();
        let collect = self.config.collect_diagnostics;
        for entry in &mut self.abilities {
            if !entry.enabled || !entry.capabilities.contains(capability) {
                continue;
            }
            let start = Instant::now();
            match phase {
                Phase::Initialize => entry.ability.initialize(&mut self.world),
                Phase::Update => entry.ability.update(&mut self.world),
                Phase::FixedUpdate => entry.ability.fixed_update(&mut self.world),
                Phase::TearDown => entry.ability.tear_down(&mut self.world),
                Phase::Idle | Phase::Reactive => {}
            }
            if collect {
                self.current
                    .ability_times
                    .push((entry.name.clone(), phase, start.elapsed()));
            }
        }
        if collect {
            self.current.phase_times.push((phase, phase_start.elapsed()));
        }
    }

    /// Run every enabled initialize ability.
    pub fn perform_initialization(&mut self) {
        self.enter(Phase::Initialize);
        self.run_bucket(Phase::Initialize);
        self.initialized = true;
    }

    /// Run every enabled update ability, then every enabled reactive ability
    /// whose trigger matched live actors that pass its gate.
    pub fn perform_update(&mut self) {
        self.enter(Phase::Update);
        self.run_bucket(Phase::Update);

        self.enter(Phase::Reactive);
        let phase_start = Instant::now();
        let collect = self.config.collect_diagnostics;
        for entry in &mut self.abilities {
            if !entry.enabled {
                continue;
            }
            let Some(trigger) = entry.trigger else {
                continue;
            };
            let world = &self.world;
            let ability = &entry.ability;
            let actors: Vec<Actor> = world
                .trigger(trigger)
                .get_valid_actors(|actor| world.is_alive(actor) && ability.can_execute(world, actor));
            if actors.is_empty() {
                continue;
            }
            let start = Instant::now();
            entry.ability.execute(&mut self.world, &actors);
            self.current.reactive_executions += 1;
            self.current.reactive_actors += actors.len();
            if collect {
                self.current
                    .ability_times
                    .push((entry.name.clone(), Phase::Reactive, start.elapsed()));
            }
            tracing::trace!(name = %entry.name, actors = actors.len(), "reactive ability executed");
        }
        if collect {
            self.current
                .phase_times
                .push((Phase::Reactive, phase_start.elapsed()));
        }
    }

    /// Run every enabled fixed-update ability.
    pub fn perform_fixed_update(&mut self) {
        self.enter(Phase::FixedUpdate);
        self.run_bucket(Phase::FixedUpdate);
    }

    /// Run every enabled tear-down ability, then close the cycle: the world
    /// clears its triggers and ages temporary properties.
    pub fn perform_tear_down(&mut self) {
        self.enter(Phase::TearDown);
        self.run_bucket(Phase::TearDown);

        let boundary_start = Instant::now();
        self.world.abilities_cycle_finished();
        self.current.boundary_time = boundary_start.elapsed();

        self.cycle_counter += 1;
        self.phase = Phase::Idle;
        self.last_diagnostics = std::mem::take(&mut self.current);
        for hook in &mut self.cycle_hooks {
            hook(&self.world);
        }
        tracing::debug!(
            cycle = self.cycle_counter,
            total_us = self.last_diagnostics.total_time().as_micros() as u64,
            "cycle finished"
        );
    }

    /// Run one full cycle: update, fixed update, tear down. The first call
    /// also runs initialization when `auto_initialize` is set.
    pub fn run_cycle(&mut self) {
        if self.config.auto_initialize && !self.initialized {
            self.perform_initialization();
        }
        self.perform_update();
        self.perform_fixed_update();
        self.perform_tear_down();
    }

    /// Run `count` cycles in sequence.
    pub fn run_cycles(&mut self, count: u64) {
        for _ in 0..count {
            self.run_cycle();
        }
    }

    // -- accessors ----------------------------------------------------------

    /// The phase most recently entered in the current cycle, or
    /// [`Phase::Idle`] at a cycle boundary.
    pub fn current_phase(&self) -> Phase {
        self.phase
    }

    /// Number of completed cycles.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_counter
    }

    /// The manager configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Shared access to the world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world, for setup and host-side mutation
    /// between phases.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Give the world back, dropping every ability.
    pub fn into_world(self) -> World {
        self.world
    }

    /// Number of registered abilities.
    pub fn ability_count(&self) -> usize {
        self.abilities.len()
    }

    /// Names of the registered abilities, in execution order.
    pub fn ability_names(&self) -> Vec<&str> {
        self.abilities.iter().map(|e| e.name.as_str()).collect()
    }

    /// Ids of the abilities taking part in any of `capabilities`, in
    /// execution order.
    pub fn abilities_with(&self, capabilities: Capabilities) -> Vec<AbilityId> {
        self.abilities
            .iter()
            .filter(|e| e.capabilities.intersects(capabilities))
            .map(|e| e.id)
            .collect()
    }

    /// Diagnostics of the last completed cycle.
    pub fn last_diagnostics(&self) -> &CycleDiagnostics {
        &self.last_diagnostics
    }
}

impl fmt::Debug for WorldAbilityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldAbilityManager")
            .field("world", &self.world)
            .field("abilities", &self.abilities)
            .field("phase", &self.phase)
            .field("cycle_counter", &self.cycle_counter)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
