use crate::ecs::{
    entity::Entity,
    storage::{StateId, TableId},
};

/// The identifier for a component set in storage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Create a new Id with the given unique identifier.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Id(id)
    }

    /// Get the index for this Id.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// One membership entry: the entity and the table row holding its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub entity: Entity,
    pub row: usize,
}

/// The live membership of one realized state.
///
/// A set binds a [`State`](super::State) to the [`Table`](super::Table) its values live in.
/// Removing an entry leaves a tombstone in place so the indices of other entries (which the
/// entity registry points at) stay valid. Tombstones are only dropped when the set is drained by
/// [`take_entries`](Self::take_entries) or [`clear`](Self::clear).
#[derive(Debug)]
pub struct Set {
    id: Id,
    state: StateId,
    table: TableId,
    entries: Vec<Option<Entry>>,
    live: usize,
}

impl Set {
    /// Create an empty set binding `state` to `table`.
    pub fn new(id: Id, state: StateId, table: TableId) -> Self {
        Self {
            id,
            state,
            table,
            entries: Vec::new(),
            live: 0,
        }
    }

    /// Get the unique identifier for this set.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the state this set realizes.
    #[inline]
    pub fn state(&self) -> StateId {
        self.state
    }

    /// Get the table holding this set's values.
    #[inline]
    pub fn table(&self) -> TableId {
        self.table
    }

    /// The number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if the set has no live entries. It may still hold tombstones.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// The number of slots, tombstones included.
    #[inline]
    pub fn slots(&self) -> usize {
        self.entries.len()
    }

    /// Get a live entry.
    #[inline]
    pub fn get(&self, entry: usize) -> Option<Entry> {
        self.entries.get(entry).copied().flatten()
    }

    /// Append an entry and return its index.
    pub fn create_entry(&mut self, entity: Entity, row: usize) -> usize {
        self.entries.push(Some(Entry { entity, row }));
        self.live += 1;
        self.entries.len() - 1
    }

    /// Tombstone an entry, returning what it held.
    pub fn destroy_entry(&mut self, entry: usize) -> Option<Entry> {
        let removed = self.entries.get_mut(entry).and_then(Option::take);
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    /// Iterate over live entries along with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Entry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.map(|entry| (index, entry)))
    }

    /// Rewrite the row of every live entry after its table was compacted.
    pub fn remap_rows(&mut self, remap: &[Option<usize>]) {
        for entry in self.entries.iter_mut().flatten() {
            if let Some(Some(row)) = remap.get(entry.row) {
                entry.row = *row;
            }
        }
    }

    /// Drain every live entry in order, leaving the set empty with no tombstones.
    pub fn take_entries(&mut self) -> Vec<Entry> {
        self.live = 0;
        self.entries.drain(..).flatten().collect()
    }

    /// Drop every entry and tombstone.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.live = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> Set {
        Set::new(Id::new(0), StateId::new(0), TableId::new(0))
    }

    #[test]
    fn destroy_entry_tombstones_in_place() {
        // Given
        let mut set = set();
        let e0 = set.create_entry(Entity::new(0, 0), 0);
        let e1 = set.create_entry(Entity::new(1, 0), 1);

        // When
        let removed = set.destroy_entry(e0);

        // Then
        assert_eq!(removed, Some(Entry { entity: Entity::new(0, 0), row: 0 }));
        assert_eq!(set.len(), 1);
        assert_eq!(set.slots(), 2);
        assert_eq!(set.get(e0), None);
        assert_eq!(set.get(e1).map(|e| e.row), Some(1));
        assert_eq!(set.destroy_entry(e0), None);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn iter_skips_tombstones() {
        // Given
        let mut set = set();
        for i in 0..4 {
            set.create_entry(Entity::new(i, 0), i as usize);
        }
        set.destroy_entry(1);
        set.destroy_entry(2);

        // When
        let indices: Vec<usize> = set.iter().map(|(index, _)| index).collect();

        // Then
        assert_eq!(indices, vec![0, 3]);
    }

    #[test]
    fn take_entries_compacts() {
        // Given
        let mut set = set();
        set.create_entry(Entity::new(0, 0), 4);
        set.create_entry(Entity::new(1, 0), 5);
        set.destroy_entry(0);

        // When
        let entries = set.take_entries();

        // Then
        assert_eq!(entries, vec![Entry { entity: Entity::new(1, 0), row: 5 }]);
        assert!(set.is_empty());
        assert_eq!(set.slots(), 0);
    }
}
