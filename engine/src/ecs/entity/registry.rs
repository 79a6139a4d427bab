use crate::ecs::{
    entity::Entity,
    error::{Error, Result},
    storage::SetId,
};

/// Where a live entity currently sits: a component set and the entry within that set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ref {
    /// The component set holding the entity.
    pub set: SetId,

    /// The entry index within the set.
    pub entry: usize,
}

impl Ref {
    #[inline]
    pub const fn new(set: SetId, entry: usize) -> Self {
        Self { set, entry }
    }
}

/// One registry slot. `location` is `None` before materialization and after death.
#[derive(Debug, Clone, Copy)]
struct Slot {
    version: u8,
    location: Option<Ref>,
}

/// The collection of all entity slots ever allocated.
///
/// Ids come from a monotonic counter (the slot count). There is no free list: a dead entity's
/// slot keeps an empty location forever, so stale handles keep failing lookups.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    slots: Vec<Slot>,
    live: usize,
}

impl Registry {
    /// Construct a new empty registry.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }

    /// Allocate the next entity id. The entity has no location until [`create_entry`] is
    /// called for it.
    ///
    /// [`create_entry`]: Self::create_entry
    pub fn create_entity_id(&mut self) -> Result<Entity> {
        let index = self.slots.len();
        if index > Entity::MAX_INDEX {
            return Err(Error::EntityLimit);
        }
        self.slots.push(Slot {
            version: 0,
            location: None,
        });
        Ok(Entity::new(index as u32, 0))
    }

    /// Record the initial location of a freshly allocated entity.
    pub fn create_entry(&mut self, entity: Entity, location: Ref) -> Result<()> {
        let slot = self.slot_mut(entity)?;
        debug_assert!(slot.location.is_none(), "entity {entity} already placed");
        slot.location = Some(location);
        self.live += 1;
        Ok(())
    }

    /// Move a live entity's back-reference to a new location.
    pub fn update_entry(&mut self, entity: Entity, location: Ref) -> Result<()> {
        let slot = self.slot_mut(entity)?;
        match slot.location.as_mut() {
            Some(current) => {
                *current = location;
                Ok(())
            }
            None => Err(Error::EntityNotFound(entity)),
        }
    }

    /// Mark an entity dead. Returns `false` if it was not live.
    pub fn remove_entry(&mut self, entity: Entity) -> bool {
        match self.slot_mut(entity) {
            Ok(slot) if slot.location.is_some() => {
                slot.location = None;
                self.live -= 1;
                true
            }
            _ => false,
        }
    }

    /// Get the location of a live entity, failing with [`Error::EntityNotFound`] for an
    /// out-of-range index, a version mismatch, or a dead entity.
    pub fn get_ref(&self, entity: Entity) -> Result<Ref> {
        self.slots
            .get(entity.index())
            .filter(|slot| slot.version == entity.version())
            .and_then(|slot| slot.location)
            .ok_or(Error::EntityNotFound(entity))
    }

    /// Returns `true` if the handle refers to a live entity.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.get_ref(entity).is_ok()
    }

    /// The number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no entity is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// The number of slots ever allocated.
    #[inline]
    pub fn allocated(&self) -> usize {
        self.slots.len()
    }

    /// Mark every entity dead. Slots are kept, so old handles stay invalid and new ids continue
    /// from the current counter.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.location = None;
        }
        self.live = 0;
    }

    fn slot_mut(&mut self, entity: Entity) -> Result<&mut Slot> {
        self.slots
            .get_mut(entity.index())
            .filter(|slot| slot.version == entity.version())
            .ok_or(Error::EntityNotFound(entity))
    }
}
