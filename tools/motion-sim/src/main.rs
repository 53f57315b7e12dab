use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use motion::{Effect, Entity, EntityId, PhysicsConfig, Simulation};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

use crate::scenario::Scenario;

mod scenario;

/// Runs an entity motion scenario and logs what happens
#[derive(Parser, Debug)]
struct Args {
    /// The TOML scenario to run
    scenario: PathBuf,
    /// Physics configuration. Written with defaults if it does not exist
    #[clap(short, long, default_value = "physics.toml")]
    config: PathBuf,
    /// Overrides the number of ticks in the scenario
    #[clap(short, long)]
    ticks: Option<u64>,
    /// Log entity state every this many ticks
    #[clap(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    every: u64,
}

fn setup_logging() -> anyhow::Result<()> {
    tracing::subscriber::set_global_default(
        Registry::default().with(EnvFilter::from_default_env()).with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        ),
    )
    .context("setup tracing subscribers")
}

fn log_state(tick: u64, entity: &Entity) {
    let state = &entity.state;
    info!(
        tick,
        entity = %entity.id,
        position = ?state.position(),
        motion = ?state.motion(),
        on_ground = state.on_ground,
        horizontal_collision = state.horizontal_collision,
        fall_distance = state.fall_distance,
        fire_ticks = state.fire_ticks,
        ticks_frozen = state.ticks_frozen,
        in_water = state.is_in_water(),
        "state"
    );
}

fn main() -> anyhow::Result<()> {
    setup_logging()?;

    let Args {
        scenario,
        config,
        ticks,
        every,
    } = Args::parse();

    let config = PhysicsConfig::load(&config)?;
    let scenario = Scenario::load(&scenario)?;

    let world = scenario.world();
    let mut entities = scenario.entities()?;
    let mut simulation = Simulation::new(config, scenario.side);
    let ticks = ticks.unwrap_or(scenario.ticks);

    let mut effects = Vec::<(EntityId, Effect)>::new();
    let mut frozen = 0_usize;
    for _ in 0..ticks {
        let report = simulation.tick(&world, &mut entities, &mut effects);
        let now = simulation.clock().now();

        for (id, effect) in effects.drain(..) {
            debug!(tick = now, entity = %id, ?effect, "effect");
        }
        if !report.frozen.is_empty() {
            warn!(tick = now, frozen = ?report.frozen, "entities skipped this tick");
            frozen += report.frozen.len();
        }
        if now % every == 0 {
            for entity in &entities {
                log_state(now, entity);
            }
        }
    }

    info!(ticks, entities = entities.len(), frozen, "scenario finished");
    Ok(())
}
