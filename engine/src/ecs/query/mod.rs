//! Shape-filtered iteration over storage.
//!
//! A query is built from a predicate over [`State`]. The predicate is evaluated once per state
//! when the query is built, not once per entity: every entity in a state shares the same shape
//! and flags, so the answer is the same for all of them. Matching sets are captured up front and
//! walked in order, skipping tombstoned entries.
//!
//! Sets with no live entries and states flagged `DISABLED` never match.
//!
//! # Usage
//!
//! ```
//! use morph_engine::ecs::{Storage, component::Flags};
//! use morph_macros::Component;
//!
//! #[derive(Component)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Component)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! let mut storage = Storage::new();
//! storage.create_entity(Position { x: 0.0, y: 0.0 }).unwrap();
//! storage.create_entity((Position { x: 1.0, y: 1.0 }, Velocity { dx: 1.0, dy: 0.0 })).unwrap();
//!
//! let velocity = storage.component_id::<Velocity>().unwrap();
//! let moving = storage.query(|state| state.has_component(velocity));
//! for entity in moving {
//!     let position = entity.get_component::<Position>().unwrap();
//!     assert_eq!(position.x, 1.0);
//!     assert!(entity.has_component_flags(velocity, Flags::CREATED));
//! }
//! ```

use crate::ecs::{
    Component,
    component,
    entity::{self, Entity},
    error::{Error, Result},
    storage::{Set, State, Storage, Table},
};

/// Iterator over the entities of every matching set.
pub struct Iter<'s> {
    storage: &'s Storage,
    sets: Vec<&'s Set>,
    set: usize,
    entry: usize,
}

impl<'s> Iter<'s> {
    /// Capture every non-empty, enabled set whose state satisfies `predicate`.
    pub fn new<P>(storage: &'s Storage, mut predicate: P) -> Self
    where
        P: FnMut(&State) -> bool,
    {
        let sets = storage
            .states()
            .iter()
            .filter_map(|state| state.set().map(|set| (state, &storage.sets()[set.index()])))
            .filter(|(state, set)| !set.is_empty() && !state.is_disabled())
            .filter(|(state, _)| predicate(state))
            .map(|(_, set)| set)
            .collect();
        Self {
            storage,
            sets,
            set: 0,
            entry: 0,
        }
    }

    /// The number of sets this query walks.
    #[inline]
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }
}

impl<'s> Iterator for Iter<'s> {
    type Item = EntityRef<'s>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(set) = self.sets.get(self.set) {
            while self.entry < set.slots() {
                let index = self.entry;
                self.entry += 1;
                if let Some(entry) = set.get(index) {
                    return Some(EntityRef {
                        entity: entry.entity,
                        row: entry.row,
                        state: self.storage.states().get(set.state()),
                        table: &self.storage.tables()[set.table().index()],
                        storage: self.storage,
                    });
                }
            }
            self.set += 1;
            self.entry = 0;
        }
        None
    }
}

/// A read-only view of one entity yielded by a query.
#[derive(Clone, Copy)]
pub struct EntityRef<'s> {
    entity: Entity,
    row: usize,
    state: &'s State,
    table: &'s Table,
    storage: &'s Storage,
}

impl<'s> EntityRef<'s> {
    #[inline]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// The state the entity is in.
    #[inline]
    pub fn state(&self) -> &'s State {
        self.state
    }

    /// Returns `true` if the entity holds the component.
    pub fn has_component<C: Component>(&self) -> bool {
        self.storage
            .component_id::<C>()
            .is_some_and(|id| self.state.has_component(id))
    }

    #[inline]
    pub fn has_component_by_id(&self, id: component::Id) -> bool {
        self.state.has_component(id)
    }

    #[inline]
    pub fn has_component_flags(&self, id: component::Id, flags: component::Flags) -> bool {
        self.state.has_component_flags(id, flags)
    }

    #[inline]
    pub fn has_entity_flags(&self, flags: entity::Flags) -> bool {
        self.state.has_entity_flags(flags)
    }

    #[inline]
    pub fn is_entity_destroyed(&self) -> bool {
        self.state.is_destroyed()
    }

    /// Get a component the entity is expected to hold.
    pub fn get_component<C: Component>(&self) -> Result<&'s C> {
        let id = self.storage.component_id::<C>();
        id.and_then(|id| self.table.get::<C>(id, self.row).transpose())
            .unwrap_or_else(|| {
                Err(Error::ComponentNotFound {
                    entity: self.entity,
                    component: self.storage.register::<C>(),
                })
            })
    }

    /// Get a component if the entity holds it.
    pub fn find_component<C: Component>(&self) -> Option<&'s C> {
        let id = self.storage.component_id::<C>()?;
        self.table.get::<C>(id, self.row).ok().flatten()
    }
}
