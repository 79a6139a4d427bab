//! Shape-grouped storage for entities and their components.
//!
//! [`Storage`] is the facade every system talks to. Underneath it sit three layers that are
//! deliberately keyed differently:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Storage (this module)                                           │
//! │  - entity registry: Entity → (set, entry)                        │
//! │  - resolves transitions and moves entities between sets/tables   │
//! └────────┬───────────────────────┬──────────────────────┬──────────┘
//!          │                       │                      │
//! ┌────────▼─────────┐   ┌─────────▼────────┐   ┌─────────▼────────┐
//! │  States          │   │  Sets            │   │  Tables          │
//! │  (shape, flags)  │──▶│  one per state   │──▶│  one per         │
//! │  memoized edges  │   │  (entity, row)   │   │  mask+destroyed  │
//! └──────────────────┘   │  tombstones      │   │  columns         │
//!                        └──────────────────┘   └──────────────────┘
//! ```
//!
//! A **state** is what happened to an entity this tick: which components it holds, each
//! component's change [`Flags`](crate::ecs::component::Flags), and the entity's own flags. A
//! **table** only knows which components exist. Many states therefore share one table: an
//! entity whose `Position` was just updated lives in a different state but the same table as one
//! whose `Position` is untouched, and moving between them touches only set membership.
//!
//! ## Moves
//!
//! Every mutation resolves `(current state, transition) → next state` and then performs one of:
//!
//! 1. **No-op**: the state did not change.
//! 2. **Metadata move**: the next set shares the table; the row is reused as-is.
//! 3. **Full move**: a row is allocated in the next table and overlapping columns are moved over.
//!
//! ## Ticks
//!
//! Change flags accumulate until [`Storage::reset`] folds every set into its reset state, drops
//! destroyed entities, and releases tables with no live rows.
//!
//! # Example
//!
//! ```
//! use morph_engine::ecs::{Storage, component::Flags};
//! use morph_macros::Component;
//!
//! #[derive(Component)]
//! struct Position(f32, f32);
//!
//! let mut storage = Storage::new();
//! let entity = storage.create_entity(Position(0.0, 0.0)).unwrap();
//! storage.set_component(entity, Position(1.0, 2.0)).unwrap();
//!
//! let id = storage.component_id::<Position>().unwrap();
//! assert!(storage.has_component_flags(entity, id, Flags::CREATED | Flags::UPDATED).unwrap());
//!
//! storage.reset().unwrap();
//! assert!(!storage.has_component_flags(entity, id, Flags::UPDATED).unwrap());
//! assert!(storage.has_component::<Position>(entity).unwrap());
//! ```

use std::collections::HashMap;

use fixedbitset::FixedBitSet;
use log::{debug, warn};

use crate::ecs::{
    component::{self, Component, Values},
    entity::{self, Entity, Ref},
    error::{Error, Result},
    query,
    util::pair_mut,
};

mod column;
pub mod graph;
mod location;
mod set;
mod state;
mod table;

pub use column::Column;
pub use set::{Entry, Id as SetId, Set};
pub use state::{ComponentTransition, EntityTransition, Id as StateId, State, States};
pub use table::{Id as TableId, Table};

use location::Location;

/// Counts of the structures currently held by a [`Storage`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Interned states.
    pub states: usize,
    /// Realized sets.
    pub sets: usize,
    /// Allocated tables, the terminal table included.
    pub tables: usize,
    /// Live entities.
    pub entities: usize,
}

/// The entity/component store.
pub struct Storage {
    components: component::Registry,
    entities: entity::Registry,
    states: States,
    sets: Vec<Set>,
    tables: Vec<Table>,
    table_index: HashMap<(FixedBitSet, bool), TableId>,
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage {
    /// The table receiving destroyed entities until the next reset.
    pub const DESTROYED_TABLE: TableId = TableId::new(0);

    /// Create an empty storage.
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Create an empty storage with room for `states` states (and as many sets) before
    /// reallocating.
    pub fn with_capacity(states: usize) -> Self {
        let mut storage = Self {
            components: component::Registry::new(),
            entities: entity::Registry::new(),
            states: States::with_capacity(states),
            sets: Vec::with_capacity(states),
            tables: Vec::new(),
            table_index: HashMap::new(),
        };
        storage.find_or_create_table(FixedBitSet::new(), true);
        storage
    }

    /// Register a component type, returning its id.
    #[inline]
    pub fn register<C: Component>(&self) -> component::Id {
        self.components.register::<C>()
    }

    /// Get the id of a component type, if it has been registered.
    #[inline]
    pub fn component_id<C: Component>(&self) -> Option<component::Id> {
        self.components.get::<C>()
    }

    /// The component registry of this storage.
    #[inline]
    pub fn components(&self) -> &component::Registry {
        &self.components
    }

    /// The state transition graph.
    #[inline]
    pub fn states(&self) -> &States {
        &self.states
    }

    /// Every realized set.
    #[inline]
    pub fn sets(&self) -> &[Set] {
        &self.sets
    }

    /// Every allocated table. The first is the terminal table for destroyed entities.
    #[inline]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// The number of live entities, destroyed ones awaiting reset included.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if there are no live entities.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Structure counts for diagnostics.
    pub fn stats(&self) -> Stats {
        Stats {
            states: self.states.len(),
            sets: self.sets.len(),
            tables: self.tables.len(),
            entities: self.entities.len(),
        }
    }

    /// Create an entity holding the given components.
    ///
    /// The entity's state is resolved one `Add` per component from the root state, then the
    /// entity is placed in its final set with a single row allocation.
    pub fn create_entity<S: component::Set>(&mut self, set: S) -> Result<Entity> {
        let values = Values::of(set, &self.components);
        let mut state = States::ROOT;
        for id in values.ids() {
            state = self
                .states
                .component_transition(state, id, ComponentTransition::Add)?;
        }

        let entity = self.entities.create_entity_id()?;
        let set_id = self.find_or_create_set(state);
        let set = &mut self.sets[set_id.index()];
        let table = &mut self.tables[set.table().index()];
        let row = table.create_entry(entity);
        for (id, value) in values.into_entries() {
            table.put(id, row, value);
        }
        let entry = set.create_entry(entity, row);
        self.entities.create_entry(entity, Ref::new(set_id, entry))?;
        Ok(entity)
    }

    /// Destroy an entity. Its components are dropped immediately; the handle keeps resolving,
    /// with every component flagged deleted, until the next [`reset`](Self::reset).
    ///
    /// Destroying an already destroyed entity does nothing.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<()> {
        let location = self.locate(entity)?;
        if self.states.get(location.state).is_destroyed() {
            warn!("Entity {entity} destroyed twice in one tick");
            return Ok(());
        }
        let next = self
            .states
            .entity_transition(location.state, EntityTransition::Destroy);
        self.move_entity(entity, location, next)?;
        Ok(())
    }

    /// Attach a component the entity does not hold yet.
    pub fn add_component<C: Component>(&mut self, entity: Entity, component: C) -> Result<()> {
        self.put_component(entity, component, ComponentTransition::Add)
    }

    /// Attach a component, overwriting the current value if the entity already holds one.
    pub fn set_component<C: Component>(&mut self, entity: Entity, component: C) -> Result<()> {
        self.put_component(entity, component, ComponentTransition::Set)
    }

    /// Flag a held component as updated.
    pub fn update_component<C: Component>(&mut self, entity: Entity) -> Result<()> {
        let id = self.components.register::<C>();
        self.update_component_by_id(entity, id)
    }

    /// Flag a held component as updated.
    pub fn update_component_by_id(&mut self, entity: Entity, id: component::Id) -> Result<()> {
        self.transition_component(entity, id, ComponentTransition::Update)?;
        Ok(())
    }

    /// Modify a held component in place and flag it as updated.
    pub fn update_component_with<C: Component>(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut C),
    ) -> Result<()> {
        let id = self.components.register::<C>();
        let location = self.transition_component(entity, id, ComponentTransition::Update)?;
        let value = self.tables[location.table.index()]
            .get_mut::<C>(id, location.row)?
            .ok_or(Error::ComponentNotFound {
                entity,
                component: id,
            })?;
        f(value);
        Ok(())
    }

    /// Remove a held component. Its value is dropped; the deletion stays observable through
    /// [`has_component_flags`](Self::has_component_flags) until the next reset.
    pub fn delete_component<C: Component>(&mut self, entity: Entity) -> Result<()> {
        let id = self.components.register::<C>();
        self.delete_component_by_id(entity, id)
    }

    /// Remove a held component.
    pub fn delete_component_by_id(&mut self, entity: Entity, id: component::Id) -> Result<()> {
        self.transition_component(entity, id, ComponentTransition::Delete)?;
        Ok(())
    }

    /// Include a disabled entity in queries again.
    pub fn enable_entity(&mut self, entity: Entity) -> Result<()> {
        self.transition_entity(entity, EntityTransition::Enable)
    }

    /// Exclude an entity from queries until it is enabled.
    pub fn disable_entity(&mut self, entity: Entity) -> Result<()> {
        self.transition_entity(entity, EntityTransition::Disable)
    }

    /// Returns `true` if the entity holds the component.
    pub fn has_component<C: Component>(&self, entity: Entity) -> Result<bool> {
        let location = self.locate(entity)?;
        Ok(self
            .components
            .get::<C>()
            .is_some_and(|id| self.states.get(location.state).has_component(id)))
    }

    /// Returns `true` if the entity holds the component.
    pub fn has_component_by_id(&self, entity: Entity, id: component::Id) -> Result<bool> {
        Ok(self.state_of(entity)?.has_component(id))
    }

    /// Returns `true` if the component's change flags this tick include all of `flags`.
    pub fn has_component_flags(
        &self,
        entity: Entity,
        id: component::Id,
        flags: component::Flags,
    ) -> Result<bool> {
        Ok(self.state_of(entity)?.has_component_flags(id, flags))
    }

    /// Returns `true` if the entity's flags include all of `flags`.
    pub fn has_entity_flags(&self, entity: Entity, flags: entity::Flags) -> Result<bool> {
        Ok(self.state_of(entity)?.has_entity_flags(flags))
    }

    /// Returns `true` if the handle refers to an entity that has not died.
    #[inline]
    pub fn is_entity_alive(&self, entity: Entity) -> bool {
        self.locate(entity).is_ok()
    }

    /// Get a component of an entity. `Ok(None)` means the entity does not hold it.
    pub fn get_component<C: Component>(&self, entity: Entity) -> Result<Option<&C>> {
        let location = self.locate(entity)?;
        match self.components.get::<C>() {
            Some(id) => self.tables[location.table.index()].get::<C>(id, location.row),
            None => Ok(None),
        }
    }

    /// Get a component of an entity mutably. The component is not flagged as updated; pair this
    /// with [`update_component`](Self::update_component) or use
    /// [`update_component_with`](Self::update_component_with).
    pub fn get_component_mut<C: Component>(&mut self, entity: Entity) -> Result<Option<&mut C>> {
        let location = self.locate(entity)?;
        match self.components.get::<C>() {
            Some(id) => self.tables[location.table.index()].get_mut::<C>(id, location.row),
            None => Ok(None),
        }
    }

    /// Get a component the entity is expected to hold.
    pub fn require_component<C: Component>(&self, entity: Entity) -> Result<&C> {
        self.get_component::<C>(entity)?
            .ok_or_else(|| Error::ComponentNotFound {
                entity,
                component: self.components.register::<C>(),
            })
    }

    /// Get a component if both the entity and the component exist.
    #[inline]
    pub fn find_component<C: Component>(&self, entity: Entity) -> Option<&C> {
        self.get_component::<C>(entity).ok().flatten()
    }

    /// Iterate over live, enabled entities whose state satisfies `predicate`.
    ///
    /// The predicate runs once per state when the query is built, never per entity.
    pub fn query<P>(&self, predicate: P) -> query::Iter<'_>
    where
        P: FnMut(&State) -> bool,
    {
        query::Iter::new(self, predicate)
    }

    /// Collect the entities a [`query`](Self::query) would visit, releasing the borrow on
    /// storage so the caller can mutate while walking them.
    pub fn query_entities<P>(&self, predicate: P) -> Vec<Entity>
    where
        P: FnMut(&State) -> bool,
    {
        self.query(predicate).map(|e| e.entity()).collect()
    }

    /// End the tick: clear every change flag, drop destroyed entities and pack every table that
    /// holds destroyed rows.
    pub fn reset(&mut self) -> Result<()> {
        for index in 0..self.sets.len() {
            let set_id = SetId::new(index as u32);
            let set = &mut self.sets[index];
            if set.is_empty() {
                if set.slots() > 0 {
                    set.clear();
                }
                continue;
            }

            let state = set.state();
            if self.states.get(state).is_destroyed() {
                let table = &mut self.tables[set.table().index()];
                for entry in set.take_entries() {
                    table.destroy_entry(entry.row);
                    self.entities.remove_entry(entry.entity);
                }
                continue;
            }

            let next = self.states.entity_transition(state, EntityTransition::Reset);
            if next == state {
                if set.slots() > set.len() {
                    self.move_set(set_id, set_id)?;
                }
                continue;
            }
            let dest = self.find_or_create_set(next);
            self.move_set(set_id, dest)?;
        }

        for table in self.tables.iter_mut() {
            if table.rows() == table.len() {
                continue;
            }
            if table.is_empty() {
                debug!("Releasing {} rows of table {:?}", table.rows(), table.id());
                table.clear();
                continue;
            }
            debug!(
                "Compacting table {:?} from {} to {} rows",
                table.id(),
                table.rows(),
                table.len()
            );
            let id = table.id();
            let remap = table.compact();
            for set in self.sets.iter_mut().filter(|set| set.table() == id) {
                set.remap_rows(&remap);
            }
        }
        Ok(())
    }

    /// Kill every entity and empty every set and table. Handles issued before the call stop
    /// resolving. With `prune`, every state, set and table except the root state and the terminal
    /// table is forgotten as well. Component registrations survive either way.
    pub fn clear(&mut self, prune: bool) {
        self.entities.clear();
        for set in self.sets.iter_mut() {
            set.clear();
        }
        for table in self.tables.iter_mut() {
            table.clear();
        }
        if prune {
            self.states.prune();
            self.sets.clear();
            self.tables.truncate(1);
            self.table_index.retain(|_, id| *id == Self::DESTROYED_TABLE);
        }
    }

    /// Bulk export of all entities.
    pub fn save(&self) -> Result<Vec<u8>> {
        Err(Error::Unimplemented("save"))
    }

    /// Bulk import of entities.
    pub fn load(&mut self, _bytes: &[u8]) -> Result<()> {
        Err(Error::Unimplemented("load"))
    }

    /// Resolve where an entity is stored.
    fn locate(&self, entity: Entity) -> Result<Location> {
        let Ref { set, entry } = self.entities.get_ref(entity)?;
        let set_ref = self.sets.get(set.index()).ok_or(Error::EntityNotFound(entity))?;
        let Some(Entry { row, .. }) = set_ref.get(entry) else {
            return Err(Error::EntityNotFound(entity));
        };
        Ok(Location {
            state: set_ref.state(),
            set,
            entry,
            table: set_ref.table(),
            row,
        })
    }

    /// Resolve where an entity is stored, treating destroyed entities as gone.
    fn locate_mutable(&self, entity: Entity) -> Result<Location> {
        let location = self.locate(entity)?;
        if self.states.get(location.state).is_destroyed() {
            return Err(Error::EntityNotFound(entity));
        }
        Ok(location)
    }

    fn state_of(&self, entity: Entity) -> Result<&State> {
        Ok(self.states.get(self.locate(entity)?.state))
    }

    fn put_component<C: Component>(
        &mut self,
        entity: Entity,
        component: C,
        kind: ComponentTransition,
    ) -> Result<()> {
        let id = self.components.register::<C>();
        let location = self.transition_component(entity, id, kind)?;
        self.tables[location.table.index()].put(id, location.row, Box::new(component));
        Ok(())
    }

    fn transition_component(
        &mut self,
        entity: Entity,
        id: component::Id,
        kind: ComponentTransition,
    ) -> Result<Location> {
        let location = self.locate_mutable(entity)?;
        let next = self.states.component_transition(location.state, id, kind)?;
        self.move_entity(entity, location, next)
    }

    fn transition_entity(&mut self, entity: Entity, kind: EntityTransition) -> Result<()> {
        let location = self.locate_mutable(entity)?;
        let next = self.states.entity_transition(location.state, kind);
        self.move_entity(entity, location, next)?;
        Ok(())
    }

    /// Move one entity into the set realizing `next`, copying its values only if the table
    /// changes.
    fn move_entity(&mut self, entity: Entity, from: Location, next: StateId) -> Result<Location> {
        if next == from.state {
            return Ok(from);
        }

        let set = self.find_or_create_set(next);
        let table = self.sets[set.index()].table();
        self.sets[from.set.index()].destroy_entry(from.entry);

        let row = if table == from.table {
            from.row
        } else {
            let (dest, src) = pair_mut(&mut self.tables, table.index(), from.table.index());
            let row = dest.create_entry(entity);
            dest.copy_components(row, src, from.row);
            src.destroy_entry(from.row);
            row
        };

        let entry = self.sets[set.index()].create_entry(entity, row);
        self.entities.update_entry(entity, Ref::new(set, entry))?;
        Ok(Location {
            state: next,
            set,
            entry,
            table,
            row,
        })
    }

    /// Move every live entry of `src` to the end of `dest`, reusing table rows. Moving a set onto
    /// itself compacts away its tombstones.
    fn move_set(&mut self, src: SetId, dest: SetId) -> Result<()> {
        debug_assert_eq!(
            self.sets[src.index()].table(),
            self.sets[dest.index()].table(),
            "sets can only be moved within a table"
        );
        let entries = self.sets[src.index()].take_entries();
        let dest_set = &mut self.sets[dest.index()];
        for Entry { entity, row } in entries {
            let entry = dest_set.create_entry(entity, row);
            self.entities.update_entry(entity, Ref::new(dest, entry))?;
        }
        Ok(())
    }

    fn find_or_create_set(&mut self, state: StateId) -> SetId {
        if let Some(set) = self.states.get(state).set() {
            return set;
        }
        let (mask, destroyed) = {
            let state = self.states.get(state);
            (state.shape().stripped(), state.is_destroyed())
        };
        let table = self.find_or_create_table(mask, destroyed);
        let id = SetId::new(self.sets.len() as u32);
        debug!("Created set {:?} for state {:?} in table {:?}", id, state, table);
        self.sets.push(Set::new(id, state, table));
        self.states.bind(state, id);
        id
    }

    fn find_or_create_table(&mut self, mask: FixedBitSet, destroyed: bool) -> TableId {
        if let Some(id) = self.table_index.get(&(mask.clone(), destroyed)) {
            return *id;
        }
        let id = TableId::new(self.tables.len() as u32);
        debug!("Created table {:?} with {} columns", id, mask.count_ones(..));
        self.table_index.insert((mask.clone(), destroyed), id);
        self.tables.push(Table::new(id, mask, destroyed));
        id
    }
}

#[cfg(test)]
mod tests {
    use morph_macros::Component;

    use super::*;
    use crate::ecs::component::Flags;

    #[derive(Component, Debug, Clone, PartialEq)]
    struct Position(i32, i32);

    #[derive(Component, Debug, Clone, PartialEq)]
    struct Velocity(i32, i32);

    #[derive(Component, Debug, Clone, PartialEq)]
    struct Health(u32);

    fn id<C: Component>(storage: &Storage) -> component::Id {
        storage.component_id::<C>().unwrap()
    }

    #[test]
    fn create_entity_places_values_in_one_row() {
        // Given
        let mut storage = Storage::new();

        // When
        let entity = storage
            .create_entity((Position(1, 2), Velocity(3, 4)))
            .unwrap();

        // Then
        assert_eq!(
            storage.get_component::<Position>(entity),
            Ok(Some(&Position(1, 2)))
        );
        assert_eq!(
            storage.get_component::<Velocity>(entity),
            Ok(Some(&Velocity(3, 4)))
        );
        assert!(storage.has_entity_flags(entity, entity::Flags::CREATED).unwrap());
        assert!(
            storage
                .has_component_flags(entity, id::<Position>(&storage), Flags::CREATED)
                .unwrap()
        );
        // The terminal table plus the entity's own table.
        assert_eq!(storage.tables().len(), 2);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn create_empty_entity_uses_the_root_state() {
        // Given
        let mut storage = Storage::new();

        // When
        let entity = storage.create_entity(()).unwrap();

        // Then
        assert!(storage.is_entity_alive(entity));
        assert_eq!(storage.stats().states, 1);
        assert_eq!(storage.has_component::<Position>(entity), Ok(false));
    }

    #[test]
    fn duplicate_components_are_rejected_without_allocating() {
        // Given
        let mut storage = Storage::new();

        // When
        let result = storage.create_entity((Position(0, 0), Position(1, 1)));

        // Then
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
        assert!(storage.is_empty());
        let entity = storage.create_entity(()).unwrap();
        assert_eq!(entity.index(), 0);
    }

    #[test]
    fn set_after_create_merges_flags() {
        // Given
        let mut storage = Storage::new();
        let entity = storage
            .create_entity((Position(0, 0), Velocity(1, 1)))
            .unwrap();
        let position = id::<Position>(&storage);

        // When
        storage.set_component(entity, Position(5, 5)).unwrap();

        // Then
        assert!(
            storage
                .has_component_flags(entity, position, Flags::CREATED | Flags::UPDATED)
                .unwrap()
        );
        assert_eq!(storage.require_component::<Position>(entity), Ok(&Position(5, 5)));

        // When
        storage.reset().unwrap();

        // Then
        assert!(!storage.has_component_flags(entity, position, Flags::UPDATED).unwrap());
        assert!(storage.has_component::<Position>(entity).unwrap());
        assert_eq!(storage.find_component::<Position>(entity), Some(&Position(5, 5)));
        assert!(!storage.has_entity_flags(entity, entity::Flags::CREATED).unwrap());
    }

    #[test]
    fn net_presence_follows_add_update_delete() {
        // Given
        let mut storage = Storage::new();
        let entity = storage.create_entity(Position(0, 0)).unwrap();
        storage.reset().unwrap();
        let health = storage.register::<Health>();

        // When: add, update, delete, add again within one tick
        storage.add_component(entity, Health(10)).unwrap();
        assert!(storage.has_component_flags(entity, health, Flags::CREATED).unwrap());
        storage.update_component::<Health>(entity).unwrap();
        storage.delete_component::<Health>(entity).unwrap();

        // Then
        assert_eq!(storage.has_component::<Health>(entity), Ok(false));
        assert!(storage.has_component_flags(entity, health, Flags::DELETED).unwrap());
        assert_eq!(storage.get_component::<Health>(entity), Ok(None));

        // When
        storage.add_component(entity, Health(3)).unwrap();

        // Then
        assert_eq!(storage.has_component::<Health>(entity), Ok(true));
        assert!(!storage.has_component_flags(entity, health, Flags::DELETED).unwrap());
        assert_eq!(storage.get_component::<Health>(entity), Ok(Some(&Health(3))));

        // When
        storage.reset().unwrap();

        // Then
        assert!(!storage.has_component_flags(entity, health, Flags::CREATED).unwrap());
        assert_eq!(storage.get_component::<Position>(entity), Ok(Some(&Position(0, 0))));
    }

    #[test]
    fn invalid_transitions_fail() {
        // Given
        let mut storage = Storage::new();
        let entity = storage.create_entity(Position(0, 0)).unwrap();

        // Then
        assert!(matches!(
            storage.add_component(entity, Position(1, 1)),
            Err(Error::InvalidTransition {
                kind: ComponentTransition::Add,
                ..
            })
        ));
        assert!(matches!(
            storage.update_component::<Health>(entity),
            Err(Error::InvalidTransition {
                kind: ComponentTransition::Update,
                ..
            })
        ));
        assert!(matches!(
            storage.delete_component::<Velocity>(entity),
            Err(Error::InvalidTransition {
                kind: ComponentTransition::Delete,
                ..
            })
        ));
        assert_eq!(storage.get_component::<Position>(entity), Ok(Some(&Position(0, 0))));
    }

    #[test]
    fn update_is_a_metadata_only_move() {
        // Given
        let mut storage = Storage::new();
        let entity = storage.create_entity(Position(0, 0)).unwrap();
        storage.reset().unwrap();
        let before = storage.locate(entity).unwrap();

        // When
        storage
            .update_component_with::<Position>(entity, |p| p.0 = 9)
            .unwrap();

        // Then
        let after = storage.locate(entity).unwrap();
        assert_ne!(before.state, after.state);
        assert_eq!(before.table, after.table);
        assert_eq!(before.row, after.row);
        assert_eq!(storage.get_component::<Position>(entity), Ok(Some(&Position(9, 0))));
        assert!(
            storage
                .has_component_flags(entity, id::<Position>(&storage), Flags::UPDATED)
                .unwrap()
        );
    }

    #[test]
    fn add_is_a_full_move_that_keeps_values() {
        // Given
        let mut storage = Storage::new();
        let entity = storage.create_entity(Position(1, 1)).unwrap();
        let before = storage.locate(entity).unwrap();

        // When
        storage.add_component(entity, Velocity(2, 2)).unwrap();

        // Then
        let after = storage.locate(entity).unwrap();
        assert_ne!(before.table, after.table);
        assert_eq!(storage.tables()[before.table.index()].len(), 0);
        assert_eq!(storage.get_component::<Position>(entity), Ok(Some(&Position(1, 1))));
        assert_eq!(storage.get_component::<Velocity>(entity), Ok(Some(&Velocity(2, 2))));
    }

    #[test]
    fn unknown_handles_fail() {
        // Given
        let mut storage = Storage::new();
        let bogus = Entity::new(42, 0);

        // Then
        assert_eq!(storage.has_component::<Position>(bogus), Err(Error::EntityNotFound(bogus)));
        assert_eq!(storage.destroy_entity(bogus), Err(Error::EntityNotFound(bogus)));
        assert!(!storage.is_entity_alive(bogus));

        // Given
        let entity = storage.create_entity(()).unwrap();
        let stale = Entity::new(entity.index() as u32, 1);

        // Then
        assert_eq!(storage.get_component::<Position>(stale), Err(Error::EntityNotFound(stale)));
    }

    #[test]
    fn require_component_reports_missing() {
        // Given
        let mut storage = Storage::new();
        let entity = storage.create_entity(Position(0, 0)).unwrap();

        // When
        let result = storage.require_component::<Health>(entity);

        // Then
        assert_eq!(
            result,
            Err(Error::ComponentNotFound {
                entity,
                component: id::<Health>(&storage)
            })
        );
        assert_eq!(storage.find_component::<Health>(entity), None);
    }

    #[test]
    fn get_component_mut_does_not_flag() {
        // Given
        let mut storage = Storage::new();
        let entity = storage.create_entity(Health(1)).unwrap();
        storage.reset().unwrap();

        // When
        if let Some(health) = storage.get_component_mut::<Health>(entity).unwrap() {
            health.0 = 7;
        }

        // Then
        assert_eq!(storage.get_component::<Health>(entity), Ok(Some(&Health(7))));
        assert!(
            !storage
                .has_component_flags(entity, id::<Health>(&storage), Flags::UPDATED)
                .unwrap()
        );
    }

    #[test]
    fn destroy_fills_the_terminal_table_until_reset() {
        // Given
        let mut storage = Storage::new();
        let entities: Vec<Entity> = (0..5)
            .map(|i| storage.create_entity((Position(i, i), Health(1))).unwrap())
            .collect();

        // When
        for entity in &entities {
            storage.destroy_entity(*entity).unwrap();
        }

        // Then
        let terminal = &storage.tables()[Storage::DESTROYED_TABLE.index()];
        assert_eq!(terminal.len(), 5);
        for set in storage.sets() {
            if set.table() != Storage::DESTROYED_TABLE {
                assert_eq!(set.len(), 0);
            }
        }
        let entity = entities[0];
        assert!(storage.has_entity_flags(entity, entity::Flags::DESTROYED).unwrap());
        assert_eq!(storage.has_component::<Position>(entity), Ok(false));
        assert!(
            storage
                .has_component_flags(entity, id::<Position>(&storage), Flags::DELETED)
                .unwrap()
        );
        assert_eq!(
            storage.add_component(entity, Velocity(0, 0)),
            Err(Error::EntityNotFound(entity))
        );
        assert_eq!(storage.destroy_entity(entity), Ok(()));

        // When
        storage.reset().unwrap();

        // Then
        assert_eq!(storage.tables()[Storage::DESTROYED_TABLE.index()].rows(), 0);
        assert!(entities.iter().all(|e| !storage.is_entity_alive(*e)));
        assert_eq!(storage.has_component::<Position>(entity), Err(Error::EntityNotFound(entity)));
        assert!(storage.is_empty());
        assert!(storage.tables().iter().all(|t| t.rows() == 0));
    }

    #[test]
    fn repeated_reset_creates_nothing() {
        // Given
        let mut storage = Storage::new();
        let a = storage.create_entity((Position(0, 0), Velocity(0, 0))).unwrap();
        let b = storage.create_entity(Health(3)).unwrap();
        storage.update_component::<Health>(b).unwrap();
        storage.disable_entity(a).unwrap();
        storage.reset().unwrap();
        let stats = storage.stats();

        // When
        storage.reset().unwrap();

        // Then
        assert_eq!(storage.stats(), stats);
        assert!(storage.has_entity_flags(a, entity::Flags::DISABLED).unwrap());
        assert_eq!(storage.get_component::<Health>(b), Ok(Some(&Health(3))));
    }

    #[test]
    fn reset_compacts_tombstones() {
        // Given: churn entities out of and back into the same clean state
        let mut storage = Storage::new();
        let entities: Vec<Entity> = (0..3)
            .map(|i| storage.create_entity(Health(i)).unwrap())
            .collect();
        storage.reset().unwrap();

        // When
        for _ in 0..4 {
            for entity in &entities {
                storage.update_component::<Health>(*entity).unwrap();
            }
            storage.reset().unwrap();
        }

        // Then
        let set = storage.locate(entities[0]).unwrap().set;
        assert_eq!(storage.sets()[set.index()].slots(), 3);
        for (i, entity) in entities.iter().enumerate() {
            assert_eq!(storage.get_component::<Health>(*entity), Ok(Some(&Health(i as u32))));
        }
    }

    #[test]
    fn reset_compacts_tables_that_keep_live_rows() {
        // Given: two entities share a table, one of them churns a component every tick
        let mut storage = Storage::new();
        let a = storage.create_entity(Health(1)).unwrap();
        let b = storage.create_entity(Health(2)).unwrap();
        storage.reset().unwrap();

        // When
        for _ in 0..100 {
            storage.add_component(a, Velocity(1, 1)).unwrap();
            storage.delete_component::<Velocity>(a).unwrap();
            storage.reset().unwrap();
        }

        // Then
        assert!(storage.tables().iter().all(|t| t.rows() == t.len()));
        let table = storage.locate(b).unwrap().table;
        assert_eq!(storage.tables()[table.index()].rows(), 2);
        assert_eq!(storage.get_component::<Health>(a), Ok(Some(&Health(1))));
        assert_eq!(storage.get_component::<Health>(b), Ok(Some(&Health(2))));
        assert_eq!(storage.has_component::<Velocity>(a), Ok(false));
    }

    #[test]
    fn states_sharing_a_stripped_shape_share_a_table() {
        // Given
        let mut storage = Storage::new();
        let a = storage.create_entity(Position(0, 0)).unwrap();
        let b = storage.create_entity(Position(1, 1)).unwrap();
        storage.reset().unwrap();

        // When
        storage.update_component::<Position>(a).unwrap();
        storage.disable_entity(b).unwrap();

        // Then
        let la = storage.locate(a).unwrap();
        let lb = storage.locate(b).unwrap();
        assert_ne!(la.state, lb.state);
        assert_eq!(la.table, lb.table);
    }

    #[test]
    fn clear_forgets_entities_but_keeps_registrations() {
        // Given
        let mut storage = Storage::new();
        let entity = storage.create_entity((Position(0, 0), Health(1))).unwrap();
        let position = id::<Position>(&storage);

        // When
        storage.clear(false);

        // Then
        assert!(!storage.is_entity_alive(entity));
        assert!(storage.is_empty());
        assert_eq!(storage.component_id::<Position>(), Some(position));
        assert!(storage.sets().iter().all(Set::is_empty));
        assert!(storage.stats().states > 1);

        // When
        let again = storage.create_entity(Position(2, 2)).unwrap();

        // Then
        assert_ne!(again, entity);
        assert_eq!(storage.get_component::<Position>(again), Ok(Some(&Position(2, 2))));
    }

    #[test]
    fn clear_with_prune_starts_a_fresh_graph() {
        // Given
        let mut storage = Storage::new();
        let entity = storage.create_entity((Position(0, 0), Health(1))).unwrap();
        storage.destroy_entity(entity).unwrap();

        // When
        storage.clear(true);

        // Then
        assert_eq!(
            storage.stats(),
            Stats {
                states: 1,
                sets: 0,
                tables: 1,
                entities: 0
            }
        );
        assert!(storage.tables()[0].is_destroyed());

        // When
        let fresh = storage.create_entity(Health(5)).unwrap();
        storage.destroy_entity(fresh).unwrap();

        // Then
        assert_eq!(storage.tables().len(), 2);
        assert_eq!(storage.tables()[Storage::DESTROYED_TABLE.index()].len(), 1);
    }

    #[test]
    fn save_and_load_are_unimplemented() {
        let mut storage = Storage::new();
        assert_eq!(storage.save(), Err(Error::Unimplemented("save")));
        assert_eq!(storage.load(&[]), Err(Error::Unimplemented("load")));
    }
}
