use crate::ecs::storage::{SetId, StateId, TableId};

/// Where a live entity is stored, fully resolved: its state, the set realizing that state, the
/// entry within the set, and the table row holding its component values.
///
/// Locations are computed from the entity registry on every facade call and are only valid
/// until the next mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Location {
    /// The state the entity is in.
    pub state: StateId,

    /// The set realizing `state`.
    pub set: SetId,

    /// The entry index within `set`.
    pub entry: usize,

    /// The table backing `set`.
    pub table: TableId,

    /// The table row holding the entity's values.
    pub row: usize,
}
