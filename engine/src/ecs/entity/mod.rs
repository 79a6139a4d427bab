//! Entity handles and the entity registry.
//!
//! An [`Entity`] is a packed `u32`: the low 24 bits are a slot index into the
//! [`Registry`], the high byte is a version. The registry stores the version of each slot next
//! to the entity's location, so a handle whose version does not match is detected as stale.
//!
//! Slots are allocated from a monotonic counter and are never reused, so every version is
//! currently `0`. The version check is still performed on every lookup, which keeps the handle
//! format ready for recycling without changing any call site.

mod registry;

use std::fmt;

use bitflags::bitflags;

pub use registry::{Ref, Registry};

/// An entity handle: a slot index plus a version byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(u32);

impl Entity {
    /// The number of low bits holding the slot index.
    pub const INDEX_BITS: u32 = 24;

    /// Mask selecting the slot index.
    pub const INDEX_MASK: u32 = (1 << Self::INDEX_BITS) - 1;

    /// The largest representable slot index.
    pub const MAX_INDEX: usize = Self::INDEX_MASK as usize;

    /// Construct an entity from a slot index and version.
    ///
    /// Index bits above [`Self::INDEX_BITS`] are discarded.
    #[inline]
    pub const fn new(index: u32, version: u8) -> Self {
        Self((index & Self::INDEX_MASK) | ((version as u32) << Self::INDEX_BITS))
    }

    /// Reconstruct an entity from its raw bits.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Get the raw bits of this handle.
    #[inline]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Get the index of this entity's slot in the registry.
    #[inline]
    pub const fn index(self) -> usize {
        (self.0 & Self::INDEX_MASK) as usize
    }

    /// Get the version of this handle.
    #[inline]
    pub const fn version(self) -> u8 {
        (self.0 >> Self::INDEX_BITS) as u8
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.version())
    }
}

bitflags! {
    /// Entity-level state flags.
    ///
    /// `CREATED` is set for the tick an entity was born in, `DESTROYED` from the moment it is
    /// destroyed until the next reset drops it, `DISABLED` until the entity is enabled again.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        const CREATED = 0b001;
        const DESTROYED = 0b010;
        const DISABLED = 0b100;
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::ecs::component::write_codes(
            f,
            *self,
            &[(Flags::CREATED, 'C'), (Flags::DESTROYED, 'X'), (Flags::DISABLED, 'D')],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_index_and_version() {
        // Given
        let entity = Entity::new(0x00AB_CDEF, 7);

        // Then
        assert_eq!(entity.index(), 0x00AB_CDEF);
        assert_eq!(entity.version(), 7);
        assert_eq!(entity.to_bits(), 0x07AB_CDEF);
        assert_eq!(Entity::from_bits(entity.to_bits()), entity);
    }

    #[test]
    fn index_overflow_is_masked() {
        let entity = Entity::new(Entity::INDEX_MASK + 2, 0);
        assert_eq!(entity.index(), 1);
    }

    #[test]
    fn entity_ordering_and_display() {
        // Given
        let e1 = Entity::new(1, 0);
        let e2 = Entity::new(2, 0);

        // Then
        assert!(e1 < e2);
        assert_eq!(e2.to_string(), "2v0");
        assert_eq!(Entity::new(3, 1).to_string(), "3v1");
    }

    #[test]
    fn entity_flags_display() {
        assert_eq!((Flags::CREATED | Flags::DISABLED).to_string(), "CD");
        assert_eq!(Flags::DESTROYED.to_string(), "X");
    }
}
