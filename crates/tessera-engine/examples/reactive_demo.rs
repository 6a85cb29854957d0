//! Poison demo -- temporary properties, filters and reactive abilities.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example reactive_demo -p tessera-engine
//!
//! Every few cycles a random actor is poisoned for a short while. An update
//! ability drains health from poisoned actors, and a reactive ability removes
//! actors whose health reached zero. The change history is printed as JSON at
//! the end.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tessera_engine::prelude::*;

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
struct Health(u32);

#[derive(Debug, Clone, Default)]
struct Poisoned;

// ---------------------------------------------------------------------------
// Abilities
// ---------------------------------------------------------------------------

/// Creates the population once.
struct Spawn {
    count: usize,
}

impl Ability for Spawn {
    fn capabilities(&self) -> Capabilities {
        Capabilities::INITIALIZE
    }

    fn initialize(&mut self, world: &mut World) {
        for i in 0..self.count {
            let actor = world.create_actor();
            if let Ok(mut view) = world.actor_mut(actor) {
                view.add_prop(Health(3 + i as u32 * 2));
            }
        }
    }
}

/// Poisons a random actor every `interval` cycles. Seeded, so every run
/// plays out the same.
struct PoisonCloud {
    interval: u64,
    duration: u32,
    rng: Pcg64,
}

impl Ability for PoisonCloud {
    fn capabilities(&self) -> Capabilities {
        Capabilities::UPDATE
    }

    fn update(&mut self, world: &mut World) {
        if world.cycle() % self.interval != 0 {
            return;
        }
        let actors: Vec<Actor> = world.actors().collect();
        if actors.is_empty() {
            return;
        }
        let target = actors[self.rng.gen_range(0..actors.len())];
        if let Err(err) = world.add_temporary_prop(target, Poisoned, self.duration) {
            tracing::warn!(%err, "poison missed");
        }
    }
}

/// Drains one point of health per cycle from poisoned actors. Runs in the
/// update phase so the reaper sees the change before the cycle boundary.
#[derive(Default)]
struct PoisonDamage {
    filter: Option<FilterId>,
}

impl Ability for PoisonDamage {
    fn capabilities(&self) -> Capabilities {
        Capabilities::INITIALIZE | Capabilities::UPDATE
    }

    fn initialize(&mut self, world: &mut World) {
        let option = world.filter_option().with::<Health>().with::<Poisoned>();
        self.filter = Some(world.get_filter(option));
    }

    fn update(&mut self, world: &mut World) {
        let Some(filter) = self.filter else {
            return;
        };
        for actor in world.filter(filter).get_copy() {
            let left = world.get_prop::<Health>(actor).0.saturating_sub(1);
            if let Err(err) = world.replace_prop(actor, Health(left)) {
                tracing::warn!(%err, "damage failed");
            }
        }
    }
}

/// Destroys actors whose health was just set to zero.
struct Reaper;

impl Ability for Reaper {
    fn capabilities(&self) -> Capabilities {
        Capabilities::REACTIVE
    }

    fn trigger_by(&self) -> Trigger {
        Trigger::new().replaced::<Health>()
    }

    fn can_execute(&self, world: &World, actor: Actor) -> bool {
        world.prop::<Health>(actor).is_some_and(|h| h.0 == 0)
    }

    fn execute(&mut self, world: &mut World, actors: &[Actor]) {
        for &actor in actors {
            tracing::info!(%actor, "actor died");
            world.destroy_actor(actor).ok();
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = WorldConfig::from_json(r#"{ "history_capacity": 512, "chunk_capacity": 16 }"#)?;
    let world = World::with_config(config)?;
    let mut manager = WorldAbilityManager::new(world, ManagerConfig::default());

    manager.add_ability(Spawn { count: 4 });
    manager.add_ability(PoisonCloud {
        interval: 2,
        duration: 3,
        rng: Pcg64::seed_from_u64(7),
    });
    manager.add_ability(PoisonDamage::default());
    manager.add_ability(Reaper);

    for _ in 0..24 {
        manager.run_cycle();
        let world = manager.world();
        let alive: Vec<String> = world
            .actors()
            .map(|a| {
                let hp = world.prop::<Health>(a).map_or(0, |h| h.0);
                let mark = if world.has_prop::<Poisoned>(a) { "*" } else { "" };
                format!("{a}:{hp}{mark}")
            })
            .collect();
        tracing::info!(
            cycle = manager.cycle_count(),
            reactive = manager.last_diagnostics().reactive_executions,
            "alive [{}]",
            alive.join(" ")
        );
    }

    println!("{}", manager.world().history().to_json()?);
    Ok(())
}
