use std::any::Any;

use crate::{
    all_tuples,
    ecs::component::{Component, Id, Registry},
};

/// Trait describing a target that can have component values applied to it from a [`Set`].
pub trait Target {
    fn apply<C: Component>(&mut self, id: Id, value: C);
}

/// A set of component values used to create an entity.
///
/// Sets are a single component, `()`, or (possibly nested) tuples of sets. Applying a set
/// registers each component type with the registry and hands every value to the target, in
/// declaration order.
pub trait Set: Sized + 'static {
    /// Apply the component values in this set to the given target. This takes ownership of self.
    fn apply<T: Target>(self, registry: &Registry, target: &mut T);
}

/// Implement Set for single component types.
impl<C: Component> Set for C {
    fn apply<T: Target>(self, registry: &Registry, target: &mut T) {
        target.apply::<C>(registry.register::<C>(), self);
    }
}

impl Set for () {
    fn apply<T: Target>(self, _registry: &Registry, _target: &mut T) {}
}

/// Implement Set for tuples of sets.
macro_rules! tuple_set {
    ($($name: ident),*) => {
        impl<$($name: Set),*> Set for ($($name,)*) {
            fn apply<CT: Target>(self, registry: &Registry, target: &mut CT) {
                #[allow(non_snake_case)]
                let ( $($name,)* ) = self;
                $(<$name as Set>::apply($name, registry, target);)*
            }
        }
    }
}

all_tuples!(tuple_set);

/// A type-erased component value as stored in a column.
pub type Value = Box<dyn Any + Send + Sync>;

/// A [`Target`] that collects component values in a type-erased form.
#[derive(Default)]
pub struct Values {
    entries: Vec<(Id, Value)>,
}

impl Values {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the values of a set.
    pub fn of<S: Set>(set: S, registry: &Registry) -> Self {
        let mut values = Self::new();
        set.apply(registry, &mut values);
        values
    }

    /// The component ids collected so far, in application order.
    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// The number of collected values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (Id, Value)> {
        self.entries.into_iter()
    }
}

impl Target for Values {
    fn apply<C: Component>(&mut self, id: Id, value: C) {
        self.entries.push((id, Box::new(value)));
    }
}
