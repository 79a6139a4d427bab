use std::collections::HashMap;

use log::debug;

use crate::ecs::{
    component::{self, Shape},
    entity,
    error::{Error, Result},
    storage::SetId,
};

/// The identifier for a state in the transition graph.
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

/// A transition applied to a single component of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentTransition {
    /// Attach a component that is not present.
    Add,
    /// Attach or overwrite a component.
    Set,
    /// Mark a present component as changed.
    Update,
    /// Remove a present component.
    Delete,
}

/// A transition applied to an entity as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityTransition {
    /// Clear all change flags at the end of a tick.
    Reset,
    /// Delete every component and mark the entity destroyed.
    Destroy,
    /// Exclude the entity from queries.
    Disable,
    /// Include the entity in queries again.
    Enable,
}

/// A node in the transition graph: one exact (shape, entity flags) combination.
///
/// Each state caches the outgoing edges computed so far, so resolving a transition that was seen
/// before is a short scan of the edge list rather than a shape computation.
#[derive(Debug)]
pub struct State {
    id: Id,
    shape: Shape,
    flags: entity::Flags,
    component_transitions: Vec<(component::Id, ComponentTransition, Id)>,
    entity_transitions: Vec<(EntityTransition, Id)>,
    set: Option<SetId>,
}

impl State {
    fn new(id: Id, shape: Shape, flags: entity::Flags) -> Self {
        Self {
            id,
            shape,
            flags,
            component_transitions: Vec::new(),
            entity_transitions: Vec::new(),
            set: None,
        }
    }

    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn flags(&self) -> entity::Flags {
        self.flags
    }

    /// The set realizing this state, once an entity has landed in it.
    #[inline]
    pub fn set(&self) -> Option<SetId> {
        self.set
    }

    /// Returns `true` if the component is present (listed and not deleted).
    #[inline]
    pub fn has_component(&self, id: component::Id) -> bool {
        self.shape.contains(id)
    }

    /// Returns `true` if the component is listed with all of `flags` set.
    #[inline]
    pub fn has_component_flags(&self, id: component::Id, flags: component::Flags) -> bool {
        self.shape.get(id).is_some_and(|f| f.contains(flags))
    }

    /// Returns `true` if the entity flags include all of `flags`.
    #[inline]
    pub fn has_entity_flags(&self, flags: entity::Flags) -> bool {
        self.flags.contains(flags)
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.flags.contains(entity::Flags::DESTROYED)
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.flags.contains(entity::Flags::DISABLED)
    }

    /// The cached component edges leaving this state.
    pub fn component_transitions(
        &self,
    ) -> impl Iterator<Item = (component::Id, ComponentTransition, Id)> + '_ {
        self.component_transitions.iter().copied()
    }

    /// The cached entity edges leaving this state.
    pub fn entity_transitions(&self) -> impl Iterator<Item = (EntityTransition, Id)> + '_ {
        self.entity_transitions.iter().copied()
    }
}

/// The memoized transition graph.
///
/// States are interned by their canonical `(shape, flags)` key and never removed, except by
/// [`prune`](Self::prune). State 0 is always the root: the empty shape with `CREATED` set,
/// which every entity starts from.
#[derive(Debug)]
pub struct States {
    states: Vec<State>,
    index: HashMap<(Shape, entity::Flags), Id>,
}

impl Default for States {
    fn default() -> Self {
        Self::new()
    }
}

impl States {
    /// The root state every new entity starts from.
    pub const ROOT: Id = Id::new(0);

    /// Create a graph holding only the root state.
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Create a graph holding only the root state, with room for `capacity` states.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut states = Self {
            states: Vec::with_capacity(capacity.max(1)),
            index: HashMap::with_capacity(capacity.max(1)),
        };
        states.intern(Shape::EMPTY, entity::Flags::CREATED);
        states
    }

    /// Get a state.
    ///
    /// # Panics
    /// - If `id` was not issued by this graph.
    #[inline]
    pub fn get(&self, id: Id) -> &State {
        &self.states[id.index()]
    }

    /// Find an interned state by its key.
    pub fn find(&self, shape: &Shape, flags: entity::Flags) -> Option<Id> {
        self.index.get(&(shape.clone(), flags)).copied()
    }

    /// The number of interned states.
    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Always `false`: the root state is never removed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Iterate over every state in interning order.
    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    /// Resolve a component transition from `state`, interning the destination if needed.
    ///
    /// Fails with [`Error::InvalidTransition`] when the transition is illegal for the shape;
    /// failures are not cached.
    pub fn component_transition(
        &mut self,
        state: Id,
        component: component::Id,
        kind: ComponentTransition,
    ) -> Result<Id> {
        let source = self.get(state);
        if let Some((_, _, next)) = source
            .component_transitions
            .iter()
            .find(|(id, k, _)| *id == component && *k == kind)
        {
            return Ok(*next);
        }

        use component::Flags as F;
        let present = source.shape.contains(component);
        let flags = match (kind, present) {
            (ComponentTransition::Add, false) | (ComponentTransition::Set, false) => {
                F::CREATED | F::UPDATED
            }
            (ComponentTransition::Set, true) | (ComponentTransition::Update, true) => {
                source.shape.get(component).unwrap_or(F::empty()) | F::UPDATED
            }
            (ComponentTransition::Delete, true) => F::DELETED,
            _ => return Err(Error::InvalidTransition { component, kind }),
        };
        let shape = source.shape.with(component, flags);
        let entity_flags = source.flags;

        let next = self.intern(shape, entity_flags);
        self.states[state.index()]
            .component_transitions
            .push((component, kind, next));
        Ok(next)
    }

    /// Resolve an entity transition from `state`, interning the destination if needed.
    pub fn entity_transition(&mut self, state: Id, kind: EntityTransition) -> Id {
        let source = self.get(state);
        if let Some((_, next)) = source.entity_transitions.iter().find(|(k, _)| *k == kind) {
            return *next;
        }

        use component::Flags as F;
        use entity::Flags as E;
        let (shape, flags) = match kind {
            EntityTransition::Reset => (
                source
                    .shape
                    .filter_map(|_, f| (!f.contains(F::DELETED)).then_some(F::empty())),
                source.flags.difference(E::CREATED),
            ),
            EntityTransition::Destroy => (
                source.shape.filter_map(|_, _| Some(F::DELETED)),
                source.flags | E::DESTROYED,
            ),
            EntityTransition::Disable => (source.shape.clone(), source.flags | E::DISABLED),
            EntityTransition::Enable => {
                (source.shape.clone(), source.flags.difference(E::DISABLED))
            }
        };

        let next = self.intern(shape, flags);
        self.states[state.index()]
            .entity_transitions
            .push((kind, next));
        next
    }

    /// Drop every state except the root, and forget the root's edges and set.
    pub fn prune(&mut self) {
        self.states.truncate(1);
        self.index.retain(|_, id| *id == Self::ROOT);
        if let Some(root) = self.states.first_mut() {
            root.component_transitions.clear();
            root.entity_transitions.clear();
            root.set = None;
        }
    }

    /// Bind a state to the set realizing it.
    pub(crate) fn bind(&mut self, state: Id, set: SetId) {
        self.states[state.index()].set = Some(set);
    }

    fn intern(&mut self, shape: Shape, flags: entity::Flags) -> Id {
        if let Some(id) = self.index.get(&(shape.clone(), flags)) {
            return *id;
        }
        let id = Id::new(self.states.len() as u32);
        debug!("Interned state {:?}: {shape} [{flags}]", id);
        self.index.insert((shape.clone(), flags), id);
        self.states.push(State::new(id, shape, flags));
        id
    }
}
