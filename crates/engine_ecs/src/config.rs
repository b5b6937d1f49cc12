//! Registry configuration.

use engine_component::{Component, Entity};

use crate::builtin::{Active, Transform};
use crate::error::EcsError;
use crate::registry::Registry;

/// Attaches one baseline component to a freshly created entity.
pub type SeedFn = fn(&mut Registry, Entity) -> Result<(), EcsError>;

/// A component every new entity receives at creation time.
#[derive(Clone, Copy)]
pub struct BaselineComponent {
    /// Component name, for logs.
    pub name: &'static str,
    /// Inserts the component's default value.
    pub seed: SeedFn,
}

impl BaselineComponent {
    /// Baseline entry inserting `T::default()`.
    #[must_use]
    pub fn of<T: Component + Default>() -> Self {
        Self {
            name: T::type_name(),
            seed: seed_default::<T>,
        }
    }
}

impl std::fmt::Debug for BaselineComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BaselineComponent").field(&self.name).finish()
    }
}

fn seed_default<T: Component + Default>(
    registry: &mut Registry,
    entity: Entity,
) -> Result<(), EcsError> {
    registry.add_component(entity, T::default())
}

/// Configuration for a [`Registry`].
///
/// The default configuration gives every entity an [`Active`] flag and a
/// [`Transform`], which also guarantees that a freshly created entity has a
/// non-empty signature and therefore exists.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Components attached to every entity on creation, in order.
    pub baseline: Vec<BaselineComponent>,
    /// Number of entity slots to reserve up front.
    pub initial_capacity: usize,
    /// Upper bound on allocated entity ids. Ids run from `0` to
    /// `max_entities - 1`, so the default never reaches [`Entity::INVALID`].
    pub max_entities: u32,
}

impl RegistryConfig {
    /// A configuration with no baseline components.
    ///
    /// Entities created under this configuration do not exist (in the
    /// [`Registry::entity_exists`] sense) until a component is added.
    #[must_use]
    pub fn bare() -> Self {
        Self {
            baseline: Vec::new(),
            initial_capacity: 0,
            max_entities: u32::MAX,
        }
    }

    /// Add `T::default()` to the baseline set.
    #[must_use]
    pub fn with_baseline<T: Component + Default>(mut self) -> Self {
        self.baseline.push(BaselineComponent::of::<T>());
        self
    }

    /// Drop every baseline component.
    #[must_use]
    pub fn without_baseline(mut self) -> Self {
        self.baseline.clear();
        self
    }

    /// Reserve `capacity` entity slots.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Cap the number of entity ids the registry may hand out.
    #[must_use]
    pub fn with_max_entities(mut self, max_entities: u32) -> Self {
        self.max_entities = max_entities;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::bare()
            .with_baseline::<Active>()
            .with_baseline::<Transform>()
    }
}
