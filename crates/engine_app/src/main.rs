//! # engine_app
//!
//! Owns a [`Registry`], registers the demo systems, spawns a small scene and
//! drives it with the fixed-timestep tick loop. The registry is flushed
//! exactly once per tick.
//!
//! Log verbosity follows `RUST_LOG` (default `engine_app=info`).

mod systems;
mod tick;

use anyhow::Result;
use clap::Parser;
use engine_ecs::{Registry, RegistryConfig, TracingListener};
use tracing::info;
use tracing_subscriber::EnvFilter;

use systems::{LifetimeSystem, MovementSystem};
use tick::{TickConfig, TickLoop};

/// Run the ECS demo scene.
#[derive(Debug, Parser)]
#[command(name = "engine_app", version, about)]
struct Args {
    /// Number of ticks to run (0 = run until interrupted).
    #[arg(long, default_value_t = 300)]
    ticks: u64,

    /// Target ticks per second.
    #[arg(long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Number of root entities to spawn.
    #[arg(long, default_value_t = 16)]
    entities: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.tick_rate > 0.0, "--tick-rate must be positive");
    info!(?args, "engine starting");

    let registry_config = RegistryConfig::default().with_capacity(args.entities * 2);
    let mut registry = Registry::with_config(registry_config);
    registry.add_listener(TracingListener);
    MovementSystem::register(&mut registry)?;
    LifetimeSystem::register(&mut registry)?;
    let roots = systems::populate(&mut registry, args.entities)?;
    info!(roots = roots.len(), systems = ?registry.system_names(), "scene populated");

    let config = TickConfig {
        tick_rate: args.tick_rate,
        max_ticks: args.ticks,
    };
    let mut tick_loop = TickLoop::new(config, registry);
    tick_loop.run();

    let registry = tick_loop.registry();
    let expired = registry.get_system::<LifetimeSystem>().map_or(0, LifetimeSystem::expired);
    info!(
        live = registry.entity_count(),
        free_ids = registry.free_id_count(),
        expired,
        "engine shut down"
    );
    Ok(())
}
