//! Demo systems driven by the tick loop.

use engine_ecs::{Component, EcsError, Entity, Registry, System, SystemBase, Transform};
use glam::Vec3;
use tracing::debug;

/// Linear velocity in units per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec3);

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

/// Seconds until the entity and its subtree are killed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime {
    pub remaining: f32,
}

impl Component for Lifetime {
    fn type_name() -> &'static str {
        "Lifetime"
    }
}

/// Integrates [`Velocity`] into [`Transform::position`].
pub struct MovementSystem {
    base: SystemBase,
}

impl MovementSystem {
    /// Register the system with `registry`.
    pub fn register(registry: &mut Registry) -> Result<(), EcsError> {
        registry.add_system_with(|types| {
            let mut base = SystemBase::new();
            base.require_component::<Transform>(types)?;
            base.require_component::<Velocity>(types)?;
            Ok(Self { base })
        })
    }

    pub fn run(&mut self, registry: &mut Registry, dt: f32) {
        for entity in self.base.iter() {
            let Some(&Velocity(velocity)) = registry.get_component::<Velocity>(entity) else {
                continue;
            };
            if let Some(transform) = registry.get_component_mut::<Transform>(entity) {
                transform.position += velocity * dt;
            }
        }
    }
}

impl System for MovementSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "movement"
    }
}

/// Counts down [`Lifetime`] and kills expired subtrees.
pub struct LifetimeSystem {
    base: SystemBase,
    expired: u64,
}

impl LifetimeSystem {
    pub fn register(registry: &mut Registry) -> Result<(), EcsError> {
        registry.add_system_with(|types| {
            let mut base = SystemBase::new();
            base.require_component::<Lifetime>(types)?;
            Ok(Self { base, expired: 0 })
        })
    }

    /// Total number of entities whose lifetime ran out.
    #[must_use]
    pub fn expired(&self) -> u64 {
        self.expired
    }

    pub fn run(&mut self, registry: &mut Registry, dt: f32) {
        // Kills are deferred, so the membership list stays stable while we walk it.
        for entity in self.base.iter() {
            let Some(lifetime) = registry.get_component_mut::<Lifetime>(entity) else {
                continue;
            };
            let was_alive = lifetime.remaining > 0.0;
            lifetime.remaining -= dt;
            if was_alive && lifetime.remaining <= 0.0 {
                let queued = registry.kill_entity_runtime(entity);
                self.expired += 1;
                debug!(%entity, queued, "lifetime expired");
            }
        }
    }
}

impl System for LifetimeSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "lifetime"
    }
}

/// Spawn `count` moving entities. Every other one gets a short-lived child
/// that is parented to it; odd ones carry a lifetime of their own.
pub fn populate(registry: &mut Registry, count: usize) -> Result<Vec<Entity>, EcsError> {
    let mut roots = Vec::with_capacity(count);
    for i in 0..count {
        let step = i as f32;
        let entity = registry.create_entity();
        registry.add_component(entity, Velocity(Vec3::new(1.0, 0.0, step)))?;
        registry.group_entity(entity, "movers")?;
        if i % 2 == 0 {
            let child = registry.create_entity();
            registry.add_component(child, Lifetime { remaining: 0.5 + step * 0.1 })?;
            registry.set_parent(child, entity)?;
        } else {
            registry.add_component(entity, Lifetime { remaining: 1.0 + step * 0.25 })?;
        }
        roots.push(entity);
    }
    if let Some(&first) = roots.first() {
        registry.tag_entity(first, "leader")?;
    }
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_integrates_velocity() {
        let mut registry = Registry::new();
        MovementSystem::register(&mut registry).unwrap();
        let e = registry.create_entity();
        registry.add_component(e, Velocity(Vec3::new(2.0, 0.0, 0.0))).unwrap();
        registry.update();

        registry.with_system::<MovementSystem, _, _>(|system, registry| system.run(registry, 0.5));
        let position = registry.get_component::<Transform>(e).unwrap().position;
        assert_eq!(position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_lifetime_kills_subtree_once() {
        let mut registry = Registry::new();
        LifetimeSystem::register(&mut registry).unwrap();
        let parent = registry.create_entity();
        let child = registry.create_entity();
        registry.add_component(parent, Lifetime { remaining: 0.1 }).unwrap();
        registry.set_parent(child, parent).unwrap();
        registry.update();

        registry.with_system::<LifetimeSystem, _, _>(|system, registry| system.run(registry, 0.2));
        assert_eq!(registry.pending_kill_count(), 2);
        // Still a member until the flush; must not count twice.
        registry.with_system::<LifetimeSystem, _, _>(|system, registry| system.run(registry, 0.2));
        assert_eq!(registry.get_system::<LifetimeSystem>().unwrap().expired(), 1);

        registry.update();
        assert_eq!(registry.entity_count(), 0);
        assert!(registry.get_system::<LifetimeSystem>().unwrap().base().is_empty());
    }

    #[test]
    fn test_populate_builds_hierarchy() {
        let mut registry = Registry::new();
        let roots = populate(&mut registry, 4).unwrap();
        assert_eq!(roots.len(), 4);
        assert_eq!(registry.pending_add_count(), 6);
        assert_eq!(registry.get_entity_by_tag("leader"), Some(roots[0]));
        assert_eq!(registry.children_of(roots[0]).len(), 1);
        assert!(registry.children_of(roots[1]).is_empty());
        assert_eq!(registry.get_entities_by_group("movers"), roots);
    }
}
