//! Component identity, change flags and shapes.
//!
//! Components are plain Rust types implementing [`Component`] (usually through
//! `#[derive(Component)]`). Every [`Storage`](crate::ecs::Storage) owns a [`Registry`] that
//! interns component types into dense [`Id`]s the first time they are seen, so columns and shapes
//! are keyed by small integers rather than type ids or names.
//!
//! A [`Shape`] maps each component an entity holds to the [`Flags`] describing what happened to it
//! during the current tick. Shapes, together with entity flags, are the identity of a storage
//! state.

use std::fmt;

use bitflags::bitflags;

mod registry;
mod set;
mod shape;

pub use registry::{Info, Registry};
pub use set::{Set, Target, Value, Values};
pub use shape::Shape;

/// A component identifier, assigned densely by a [`Registry`] in registration order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Construct a new component Id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this component if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Id {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A trait representing a component in the ECS.
///
/// At present this only sets the required trait bounds for a type to be stored in a column.
pub trait Component: 'static + Sized + Send + Sync {}

bitflags! {
    /// What happened to a component during the current tick.
    ///
    /// `CREATED` and `UPDATED` accumulate; `DELETED` replaces everything else. All flags are
    /// cleared by [`Storage::reset`](crate::ecs::Storage::reset).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        const CREATED = 0b001;
        const UPDATED = 0b010;
        const DELETED = 0b100;
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_codes(
            f,
            *self,
            &[(Flags::CREATED, 'C'), (Flags::UPDATED, 'U'), (Flags::DELETED, 'D')],
        )
    }
}

/// Write the code of every flag in `codes` that `flags` holds, or `-` when it holds none.
pub(crate) fn write_codes<F: bitflags::Flags + Copy>(
    f: &mut fmt::Formatter<'_>,
    flags: F,
    codes: &[(F, char)],
) -> fmt::Result {
    if flags.is_empty() {
        return f.write_str("-");
    }
    for (flag, code) in codes {
        if flags.contains(*flag) {
            write!(f, "{code}")?;
        }
    }
    Ok(())
}
