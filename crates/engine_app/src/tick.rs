//! Fixed-timestep tick loop.
//!
//! Each tick:
//!
//! 1. Run every system against the membership it had at the start of the tick.
//! 2. Flush the registry, applying all creations and kills queued in step 1.
//! 3. Advance the tick counter.

use std::time::{Duration, Instant};

use engine_ecs::{Registry, UpdateSummary};
use tracing::{debug, info, warn};

use crate::systems::{LifetimeSystem, MovementSystem};

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// Owns the registry and drives it one tick at a time.
#[derive(Debug)]
pub struct TickLoop {
    tick_id: u64,
    config: TickConfig,
    registry: Registry,
}

impl TickLoop {
    #[must_use]
    pub fn new(config: TickConfig, registry: Registry) -> Self {
        Self {
            tick_id: 0,
            config,
            registry,
        }
    }

    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Run one tick and return what the flush applied.
    pub fn tick(&mut self, dt: f64) -> UpdateSummary {
        self.tick_id += 1;
        let dt = dt as f32;

        self.registry
            .with_system::<MovementSystem, _, _>(|system, registry| system.run(registry, dt));
        self.registry
            .with_system::<LifetimeSystem, _, _>(|system, registry| system.run(registry, dt));

        let summary = self.registry.update();
        debug!(
            tick_id = self.tick_id,
            live = self.registry.entity_count(),
            created = summary.created.len(),
            destroyed = summary.destroyed.len(),
            "tick complete"
        );
        summary
    }

    /// Run for the configured number of ticks, or indefinitely.
    pub fn run(&mut self) {
        let tick_duration = Duration::from_secs_f64(1.0 / self.config.tick_rate);
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();
            self.tick(tick_duration.as_secs_f64());

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(
                    ticks = tick_count,
                    live = self.registry.entity_count(),
                    "tick loop complete"
                );
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use engine_ecs::Transform;

    use super::*;
    use crate::systems::{Lifetime, Velocity, populate};

    fn demo_loop(config: TickConfig) -> TickLoop {
        let mut registry = Registry::new();
        MovementSystem::register(&mut registry).unwrap();
        LifetimeSystem::register(&mut registry).unwrap();
        TickLoop::new(config, registry)
    }

    #[test]
    fn test_tick_advances_counter_and_flushes() {
        let mut tick_loop = demo_loop(TickConfig::default());
        let e = tick_loop.registry_mut().create_entity();
        assert_eq!(tick_loop.tick_id(), 0);

        let summary = tick_loop.tick(1.0 / 60.0);
        assert_eq!(tick_loop.tick_id(), 1);
        assert_eq!(summary.created, vec![e]);
        assert!(tick_loop.registry().is_active(e));
    }

    #[test]
    fn test_entities_move_only_once_active() {
        let mut tick_loop = demo_loop(TickConfig::default());
        let registry = tick_loop.registry_mut();
        let e = registry.create_entity();
        registry.add_component(e, Velocity(glam::Vec3::X)).unwrap();

        // Pending during the first tick's systems.
        tick_loop.tick(1.0);
        assert_eq!(
            tick_loop.registry().get_component::<Transform>(e).unwrap().position,
            glam::Vec3::ZERO
        );
        tick_loop.tick(1.0);
        assert_eq!(
            tick_loop.registry().get_component::<Transform>(e).unwrap().position,
            glam::Vec3::X
        );
    }

    #[test]
    fn test_expired_entities_are_recycled() {
        let mut tick_loop = demo_loop(TickConfig::default());
        let e = tick_loop.registry_mut().create_entity();
        tick_loop
            .registry_mut()
            .add_component(e, Lifetime { remaining: 0.5 })
            .unwrap();

        tick_loop.tick(1.0);
        let summary = tick_loop.tick(1.0);
        assert_eq!(summary.destroyed, vec![e]);
        assert_eq!(tick_loop.registry_mut().create_entity(), e);
    }

    #[test]
    fn test_run_limited_ticks() {
        let config = TickConfig {
            tick_rate: 1000.0,
            max_ticks: 5,
        };
        let mut tick_loop = demo_loop(config);
        populate(tick_loop.registry_mut(), 3).unwrap();
        tick_loop.run();
        assert_eq!(tick_loop.tick_id(), 5);
        assert_eq!(tick_loop.registry().pending_add_count(), 0);
    }
}
