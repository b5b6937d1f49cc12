//! Entity identifiers.
//!
//! An [`Entity`] is a plain index into registry-owned tables. It carries no
//! data and no lifetime: two entities with the same index are the same entity,
//! no matter where the value came from.

use serde::{Deserialize, Serialize};

/// A lightweight entity identifier.
///
/// Entities are keys, not owners. All component data lives in the registry's
/// pools, indexed by [`Entity::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u32);

impl Entity {
    /// The invalid / "no entity" sentinel.
    pub const INVALID: Entity = Entity(u32::MAX);

    /// Create an entity from a raw `u32` identifier.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` identifier.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns the identifier as a table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` unless this is [`Entity::INVALID`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::INVALID
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "Entity({})", self.0)
        } else {
            f.write_str("Entity(invalid)")
        }
    }
}

impl From<u32> for Entity {
    fn from(id: u32) -> Self {
        Self(id)
    }
}
