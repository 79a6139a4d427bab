use fixedbitset::FixedBitSet;

use crate::ecs::{
    component::{self, Component, Value},
    entity::Entity,
    error::{Error, Result},
    storage::column::Column,
};

/// The identifier for a table in storage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
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

/// Physical columnar storage for every entity whose present components are exactly this table's
/// component set.
///
/// A table is shared by all states with the same stripped shape and destroyed marker: the change
/// flags of a state never influence where its data lives. Rows are appended; destroying a row
/// overwrites it with the empty sentinel and leaves the slot in place until
/// [`compact`](Self::compact) packs the live rows.
///
/// # Invariants
/// - `entities.len()` equals the length of every column.
/// - `live` equals the number of `Some` entries in `entities`.
pub struct Table {
    /// The unique identifier for this table.
    id: Id,

    /// The present-component mask this table is keyed by.
    mask: FixedBitSet,

    /// One column per component, sorted by component id.
    columns: Vec<(component::Id, Column)>,

    /// The entity owning each row, `None` for destroyed rows.
    entities: Vec<Option<Entity>>,

    /// The number of non-destroyed rows.
    live: usize,

    /// Whether this is the terminal table for destroyed entities.
    destroyed: bool,
}

impl Table {
    /// Create a table with one column per bit set in `mask`.
    pub fn new(id: Id, mask: FixedBitSet, destroyed: bool) -> Self {
        let columns = mask
            .ones()
            .map(|index| (component::Id::new(index as u32), Column::new()))
            .collect();
        Self {
            id,
            mask,
            columns,
            entities: Vec::new(),
            live: 0,
            destroyed,
        }
    }

    /// Get the unique identifier for this table.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the component mask of this table.
    #[inline]
    pub fn mask(&self) -> &FixedBitSet {
        &self.mask
    }

    /// Returns `true` if this is the terminal table for destroyed entities.
    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Returns `true` if this table has a column for the component.
    #[inline]
    pub fn has_column(&self, id: component::Id) -> bool {
        self.mask.contains(id.index())
    }

    /// Iterate over the component ids of this table's columns.
    pub fn component_ids(&self) -> impl Iterator<Item = component::Id> + '_ {
        self.columns.iter().map(|(id, _)| *id)
    }

    /// The number of live rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no row is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// The number of rows ever created since the last clear, destroyed ones included.
    #[inline]
    pub fn rows(&self) -> usize {
        self.entities.len()
    }

    /// The entity owning a row, if the row is live.
    #[inline]
    pub fn entity(&self, row: usize) -> Option<Entity> {
        self.entities.get(row).copied().flatten()
    }

    /// Append an empty row for `entity` and return its index.
    pub fn create_entry(&mut self, entity: Entity) -> usize {
        let row = self.entities.len();
        self.entities.push(Some(entity));
        for (_, column) in self.columns.iter_mut() {
            column.push_empty();
        }
        self.live += 1;
        row
    }

    /// Overwrite a row with the empty sentinel, dropping its values. The row is reclaimed by the
    /// next [`compact`](Self::compact).
    pub fn destroy_entry(&mut self, row: usize) {
        if let Some(slot) = self.entities.get_mut(row)
            && slot.take().is_some()
        {
            for (_, column) in self.columns.iter_mut() {
                column.clear_row(row);
            }
            self.live -= 1;
        }
    }

    /// Move every component value this table has a column for from `src_row` of `src` into
    /// `dest_row`. Components `src` does not hold are left empty.
    pub fn copy_components(&mut self, dest_row: usize, src: &mut Table, src_row: usize) {
        for (id, column) in self.columns.iter_mut() {
            if let Some(value) = src.column_mut(*id).and_then(|c| c.take(src_row)) {
                column.put(dest_row, value);
            }
        }
    }

    /// Store a type-erased value in a row.
    ///
    /// # Panics
    /// - If the table has no column for `id` or the row does not exist.
    pub fn put(&mut self, id: component::Id, row: usize, value: Value) {
        match self.column_mut(id) {
            Some(column) => column.put(row, value),
            None => panic!("table {:?} has no column for component {id}", self.id),
        }
    }

    /// Get a typed component value from a row. Missing columns and empty slots are `Ok(None)`.
    pub fn get<C: Component>(&self, id: component::Id, row: usize) -> Result<Option<&C>> {
        match self.column(id).and_then(|c| c.get(row)) {
            Some(value) => value
                .downcast_ref::<C>()
                .map(Some)
                .ok_or(Error::ComponentTypeMismatch { component: id }),
            None => Ok(None),
        }
    }

    /// Get a typed component value from a row mutably. Missing columns and empty slots are
    /// `Ok(None)`.
    pub fn get_mut<C: Component>(
        &mut self,
        id: component::Id,
        row: usize,
    ) -> Result<Option<&mut C>> {
        match self.column_mut(id).and_then(|c| c.get_mut(row)) {
            Some(value) => value
                .downcast_mut::<C>()
                .map(Some)
                .ok_or(Error::ComponentTypeMismatch { component: id }),
            None => Ok(None),
        }
    }

    /// Drop destroyed rows and pack live ones to the front, keeping their order.
    ///
    /// Returns the new index of every old row, `None` for the dropped ones. Anything holding row
    /// indices into this table must be rewritten with it.
    pub fn compact(&mut self) -> Vec<Option<usize>> {
        let keep: Vec<bool> = self.entities.iter().map(Option::is_some).collect();
        let mut remap = Vec::with_capacity(keep.len());
        let mut next = 0;
        for kept in &keep {
            if *kept {
                remap.push(Some(next));
                next += 1;
            } else {
                remap.push(None);
            }
        }
        for (_, column) in self.columns.iter_mut() {
            column.retain_rows(&keep);
        }
        self.entities.retain(Option::is_some);
        remap
    }

    /// Drop every row.
    pub fn clear(&mut self) {
        self.entities.clear();
        for (_, column) in self.columns.iter_mut() {
            column.clear();
        }
        self.live = 0;
    }

    fn column(&self, id: component::Id) -> Option<&Column> {
        self.columns
            .binary_search_by_key(&id, |(id, _)| *id)
            .ok()
            .map(|pos| &self.columns[pos].1)
    }

    fn column_mut(&mut self, id: component::Id) -> Option<&mut Column> {
        self.columns
            .binary_search_by_key(&id, |(id, _)| *id)
            .ok()
            .map(|pos| &mut self.columns[pos].1)
    }
}
