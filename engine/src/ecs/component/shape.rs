use std::fmt;

use fixedbitset::FixedBitSet;

use crate::ecs::component::{Flags, Id};

/// An ordered mapping from component id to the component's change flags.
///
/// Entries are kept sorted by id so two shapes holding the same mapping compare and hash equal
/// regardless of the order components were added in. A component flagged `DELETED` is still
/// listed (so the deletion is observable for the rest of the tick) but is not *present*.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    entries: Vec<(Id, Flags)>,
}

impl Shape {
    /// The empty shape.
    pub const EMPTY: Self = Shape {
        entries: Vec::new(),
    };

    /// Construct a shape from `(id, flags)` pairs. A later duplicate id replaces an earlier one.
    pub fn new(entries: impl IntoIterator<Item = (Id, Flags)>) -> Self {
        let mut shape = Self::EMPTY;
        for (id, flags) in entries {
            shape = shape.with(id, flags);
        }
        shape
    }

    /// Get the flags recorded for a component, if it is listed at all.
    #[inline]
    pub fn get(&self, id: Id) -> Option<Flags> {
        self.entries
            .binary_search_by_key(&id, |(id, _)| *id)
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    /// Returns `true` if the component is listed and not deleted.
    #[inline]
    pub fn contains(&self, id: Id) -> bool {
        self.get(id)
            .is_some_and(|flags| !flags.contains(Flags::DELETED))
    }

    /// Get a copy of this shape with `id` mapped to `flags`, inserting it if needed.
    pub fn with(&self, id: Id, flags: Flags) -> Self {
        let mut entries = self.entries.clone();
        match entries.binary_search_by_key(&id, |(id, _)| *id) {
            Ok(pos) => entries[pos].1 = flags,
            Err(pos) => entries.insert(pos, (id, flags)),
        }
        Self { entries }
    }

    /// Get a copy of this shape with every entry passed through `f`; entries mapped to `None`
    /// are dropped.
    pub fn filter_map(&self, mut f: impl FnMut(Id, Flags) -> Option<Flags>) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter_map(|&(id, flags)| f(id, flags).map(|flags| (id, flags)))
                .collect(),
        }
    }

    /// Iterate over every listed `(id, flags)` pair in id order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (Id, Flags)> + '_ {
        self.entries.iter().copied()
    }

    /// Iterate over the ids of present (non-deleted) components in id order.
    #[inline]
    pub fn present(&self) -> impl Iterator<Item = Id> + '_ {
        self.entries
            .iter()
            .filter(|(_, flags)| !flags.contains(Flags::DELETED))
            .map(|(id, _)| *id)
    }

    /// The physical layout of this shape: a bitset of present component ids.
    ///
    /// The bitset is sized to the largest present id so equal component sets always produce
    /// equal (and equally hashed) bitsets.
    pub fn stripped(&self) -> FixedBitSet {
        let len = self.present().last().map_or(0, |id| id.index() + 1);
        let mut mask = FixedBitSet::with_capacity(len);
        for id in self.present() {
            mask.insert(id.index());
        }
        mask
    }

    /// The number of listed components, deleted ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no components are listed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (id, flags)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}:{flags}")?;
        }
        f.write_str("}")
    }
}
