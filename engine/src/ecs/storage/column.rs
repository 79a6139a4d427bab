use crate::ecs::component::Value;

/// One component's values for every row of a [`Table`](super::Table).
///
/// Values are type-erased. An empty slot (`None`) is the shared sentinel used both for freshly
/// created rows and for destroyed ones.
#[derive(Default)]
pub struct Column {
    values: Vec<Option<Value>>,
}

impl Column {
    /// Create an empty column.
    #[inline]
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Append an empty slot.
    #[inline]
    pub fn push_empty(&mut self) {
        self.values.push(None);
    }

    /// Get the value stored at a row, if any.
    #[inline]
    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row).and_then(Option::as_ref)
    }

    /// Get the value stored at a row mutably, if any.
    #[inline]
    pub fn get_mut(&mut self, row: usize) -> Option<&mut Value> {
        self.values.get_mut(row).and_then(Option::as_mut)
    }

    /// Store a value at an existing row, replacing what was there.
    ///
    /// # Panics
    /// - If the row does not exist.
    #[inline]
    pub fn put(&mut self, row: usize, value: Value) {
        self.values[row] = Some(value);
    }

    /// Move the value out of a row, leaving the sentinel behind.
    #[inline]
    pub fn take(&mut self, row: usize) -> Option<Value> {
        self.values.get_mut(row).and_then(Option::take)
    }

    /// Overwrite a row with the sentinel, dropping its value.
    #[inline]
    pub fn clear_row(&mut self, row: usize) {
        if let Some(slot) = self.values.get_mut(row) {
            *slot = None;
        }
    }

    /// Keep only the rows flagged in `keep`, preserving their order.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        let mut row = 0;
        self.values.retain(|_| {
            let kept = keep.get(row).copied().unwrap_or(false);
            row += 1;
            kept
        });
    }

    /// The number of rows, sentinels included.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the column has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop every row.
    #[inline]
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
