//! Entity lifecycle hooks.
//!
//! Collaborators outside the ECS core (script runtimes, audio, editor
//! selection) register a [`LifecycleListener`] to hear about entities being
//! created and destroyed. The registry calls listeners in registration order.

use engine_component::Entity;

use crate::registry::Registry;

/// Receives entity lifecycle notifications from a [`Registry`].
///
/// Every method has an empty default so listeners only implement what they
/// care about. Listeners get read-only access to the registry; any structural
/// change they want must be requested later, outside the callback.
pub trait LifecycleListener {
    /// `entity` has just become visible to systems.
    fn on_entity_created(&mut self, _registry: &Registry, _entity: Entity) {}

    /// `entity` is about to be torn down. Its components are still readable.
    fn on_entity_destroyed(&mut self, _registry: &Registry, _entity: Entity) {}

    /// `entity` is part of a subtree being killed at runtime. Fired top-down
    /// for the whole subtree before any of it is queued for destruction.
    fn on_kill_requested(&mut self, _registry: &Registry, _entity: Entity) {}
}

/// A listener that logs every notification through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl LifecycleListener for TracingListener {
    fn on_entity_created(&mut self, registry: &Registry, entity: Entity) {
        tracing::debug!(%entity, tag = registry.entity_tag(entity), "entity created");
    }

    fn on_entity_destroyed(&mut self, registry: &Registry, entity: Entity) {
        tracing::debug!(%entity, tag = registry.entity_tag(entity), "entity destroyed");
    }

    fn on_kill_requested(&mut self, _registry: &Registry, entity: Entity) {
        tracing::trace!(%entity, "kill requested");
    }
}
