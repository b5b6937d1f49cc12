//! Core [`Component`] trait and the per-registry component type table.
//!
//! Every piece of data attached to an entity implements [`Component`]. Each
//! component type is assigned a small [`ComponentTypeId`] the first time a
//! registry sees it; that id is the type's bit in a [`Signature`].
//!
//! ## Type identity is per table
//!
//! Ids come from a [`ComponentTypes`] table owned by one registry, not from a
//! process-wide counter. Two registries in the same process may assign
//! different ids to the same Rust type and never interfere with each other.
//!
//! [`Signature`]: crate::Signature

use std::any::TypeId;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ComponentError;
use crate::signature::MAX_COMPONENTS;

/// The bit index assigned to a component type within one [`ComponentTypes`]
/// table. Always `< MAX_COMPONENTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentTypeId(pub u8);

impl ComponentTypeId {
    /// Returns the id as a table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The core component trait.
///
/// Components are plain data records. `Clone` is required so that entities
/// can be duplicated by the clone collaborator.
///
/// # Examples
///
/// ```rust
/// use engine_component::Component;
///
/// #[derive(Debug, Clone)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component: Clone + 'static {
    /// A human-readable name for this component type, used in logs and errors.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Metadata recorded for a registered component type.
#[derive(Debug, Clone)]
pub struct ComponentMeta {
    /// The assigned bit index.
    pub id: ComponentTypeId,
    /// The Rust type this entry describes.
    pub rust_type: TypeId,
    /// The human-readable name of the component.
    pub name: &'static str,
}

/// Registration table mapping Rust component types to [`ComponentTypeId`]s.
///
/// Ids are handed out in registration order, starting at zero, and are never
/// reused. Registering more than [`MAX_COMPONENTS`] types fails instead of
/// silently truncating.
#[derive(Debug, Default, Clone)]
pub struct ComponentTypes {
    by_type: HashMap<TypeId, ComponentTypeId>,
    metas: Vec<ComponentMeta>,
}

impl ComponentTypes {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `T`, registering it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::CapacityExceeded`] when all
    /// [`MAX_COMPONENTS`] slots are taken.
    pub fn register<T: Component>(&mut self) -> Result<ComponentTypeId, ComponentError> {
        if let Some(&id) = self.by_type.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        if self.metas.len() >= MAX_COMPONENTS {
            return Err(ComponentError::CapacityExceeded {
                type_name: T::type_name(),
            });
        }
        // Bounded by MAX_COMPONENTS above, so the cast cannot truncate.
        let id = ComponentTypeId(self.metas.len() as u8);
        self.by_type.insert(TypeId::of::<T>(), id);
        self.metas.push(ComponentMeta {
            id,
            rust_type: TypeId::of::<T>(),
            name: T::type_name(),
        });
        Ok(id)
    }

    /// Returns the id for `T` if it has been registered.
    #[must_use]
    pub fn id_of<T: Component>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the metadata for a registered id.
    #[must_use]
    pub fn meta(&self, id: ComponentTypeId) -> Option<&ComponentMeta> {
        self.metas.get(id.index())
    }

    /// Returns the component name for an id, or `"<unregistered>"`.
    #[must_use]
    pub fn name(&self, id: ComponentTypeId) -> &'static str {
        self.meta(id).map_or("<unregistered>", |m| m.name)
    }

    /// Number of registered component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    /// Returns `true` if no component type has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    /// Iterate over registered component types in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentMeta> {
        self.metas.iter()
    }
}
