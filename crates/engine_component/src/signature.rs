//! Component signatures.
//!
//! A [`Signature`] is a fixed-width bitset with one bit per registered
//! component type. Entities carry one describing what they have; systems carry
//! one describing what they require. A system is interested in an entity when
//! `entity & system == system`.

use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

use crate::component::ComponentTypeId;

/// Maximum number of component types a single registry can hold.
pub const MAX_COMPONENTS: usize = 32;

/// A bitset of component-type membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(u32);

impl Signature {
    /// The empty signature.
    pub const EMPTY: Signature = Signature(0);

    /// Build a signature from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Set or clear the bit for `id`.
    pub fn set(&mut self, id: ComponentTypeId, value: bool) {
        debug_assert!(id.index() < MAX_COMPONENTS);
        let mask = 1u32 << id.0;
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    /// Returns a copy with the bit for `id` set.
    #[must_use]
    pub fn with(mut self, id: ComponentTypeId) -> Self {
        self.set(id, true);
        self
    }

    /// Returns `true` if the bit for `id` is set.
    #[must_use]
    pub const fn test(self, id: ComponentTypeId) -> bool {
        id.0 < MAX_COMPONENTS as u8 && self.0 & (1u32 << id.0) != 0
    }

    /// Returns `true` if every bit of `required` is also set here.
    #[must_use]
    pub const fn contains(self, required: Signature) -> bool {
        self.0 & required.0 == required.0
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Clear every bit.
    pub fn reset(&mut self) {
        self.0 = 0;
    }

    /// Iterate over the component ids whose bits are set, lowest first.
    pub fn iter(self) -> impl Iterator<Item = ComponentTypeId> {
        (0..MAX_COMPONENTS as u8)
            .map(ComponentTypeId)
            .filter(move |&id| self.test(id))
    }
}

impl BitAnd for Signature {
    type Output = Signature;

    fn bitand(self, rhs: Self) -> Self::Output {
        Signature(self.0 & rhs.0)
    }
}

impl BitOr for Signature {
    type Output = Signature;

    fn bitor(self, rhs: Self) -> Self::Output {
        Signature(self.0 | rhs.0)
    }
}

impl FromIterator<ComponentTypeId> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self {
        iter.into_iter().fold(Signature::EMPTY, Signature::with)
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#034b}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ComponentTypeId = ComponentTypeId(0);
    const B: ComponentTypeId = ComponentTypeId(1);
    const C: ComponentTypeId = ComponentTypeId(31);

    #[test]
    fn test_set_and_test() {
        let mut sig = Signature::EMPTY;
        assert!(sig.is_empty());
        sig.set(B, true);
        sig.set(C, true);
        assert!(sig.test(B));
        assert!(sig.test(C));
        assert!(!sig.test(A));
        assert_eq!(sig.len(), 2);

        sig.set(B, false);
        assert!(!sig.test(B));
        assert_eq!(sig.iter().collect::<Vec<_>>(), vec![C]);
    }

    #[test]
    fn test_out_of_range_bit_is_never_set() {
        let sig = Signature::from_bits(u32::MAX);
        assert!(!sig.test(ComponentTypeId(32)));
    }

    #[test]
    fn test_interest_matching() {
        let system: Signature = [A, B].into_iter().collect();
        let full = system.with(C);
        let partial = Signature::EMPTY.with(A);

        assert!(full.contains(system));
        assert_eq!(full & system, system);
        assert!(!partial.contains(system));
        // The empty requirement matches everything.
        assert!(partial.contains(Signature::EMPTY));
        assert_eq!(partial | Signature::EMPTY.with(B), system);
    }

    #[test]
    fn test_reset() {
        let mut sig = Signature::EMPTY.with(A).with(C);
        sig.reset();
        assert_eq!(sig, Signature::EMPTY);
    }
}
