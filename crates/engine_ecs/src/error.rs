//! Registry error types.

use engine_component::{ComponentError, Entity};

/// Errors returned by [`Registry`](crate::Registry) operations.
///
/// Stale references are not errors: killing, untagging or removing components
/// from an entity that is already gone is a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// Component type registration failed.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// An explicit entity id was requested but is already occupied. This
    /// indicates a corrupted scene and the load should be aborted.
    #[error("entity id {0} is already in use (scene corruption)")]
    DuplicateEntityId(Entity),

    /// The invalid sentinel was used where a real entity id is required.
    #[error("the invalid entity sentinel cannot be used here")]
    InvalidEntity,

    /// An explicit entity id lies outside the range the registry accepts.
    /// Like a duplicate id, this indicates a corrupted scene.
    #[error("entity id {entity} is out of range (limit {limit})")]
    EntityIdOutOfRange {
        /// The requested id.
        entity: Entity,
        /// The first id that is not accepted.
        limit: u32,
    },

    /// Every entity id up to the configured maximum is in use.
    #[error("entity limit of {0} reached")]
    EntityLimitReached(u32),

    /// The entity is not allocated (never created, or already destroyed).
    #[error("{0} not found")]
    EntityNotFound(Entity),

    /// A system of this type is already registered.
    #[error("system `{0}` is already registered")]
    SystemAlreadyRegistered(&'static str),

    /// Parenting would make an entity its own ancestor.
    #[error("cannot parent {child} under {parent}: {child} is an ancestor of {parent}")]
    HierarchyCycle {
        /// The entity that was to be re-parented.
        child: Entity,
        /// The requested parent.
        parent: Entity,
    },
}
