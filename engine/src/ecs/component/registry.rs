use std::{
    any::{TypeId, type_name},
    sync::{PoisonError, RwLock},
};

use dashmap::DashMap;
use log::debug;

use crate::ecs::{
    component::{Component, Id},
    util::short_name,
};

/// Metadata recorded for a registered component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Info {
    id: Id,
    type_id: TypeId,
    name: &'static str,
}

impl Info {
    fn new<C: Component>(id: Id) -> Self {
        Self {
            id,
            type_id: TypeId::of::<C>(),
            name: short_name(type_name::<C>()),
        }
    }

    /// The component's id.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// The Rust type id of the component.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The component's type name without its module path, for diagnostics.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The component interner owned by a storage instance.
///
/// Lookups by type go through a `DashMap`, so a shared `&Registry` can both read and register
/// component types. Ids are handed out densely in registration order and are stable for the
/// registry's lifetime.
pub struct Registry {
    /// Map from TypeId to component Id.
    type_map: DashMap<TypeId, Id>,

    /// Registered component metadata, indexed by component id.
    components: RwLock<Vec<Info>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a new, empty component registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            type_map: DashMap::new(),
            components: RwLock::new(Vec::new()),
        }
    }

    /// Register a component type and get its id. Registering the same type again returns the
    /// existing id.
    pub fn register<C: Component>(&self) -> Id {
        let type_id = TypeId::of::<C>();

        // Fast path: already registered.
        if let Some(id) = self.type_map.get(&type_id) {
            return *id;
        }

        // Entry API so two racing registrations agree on one id.
        *self
            .type_map
            .entry(type_id)
            .or_insert_with(|| {
                let mut components = self
                    .components
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                let id = Id::new(components.len() as u32);
                let info = Info::new::<C>(id);
                debug!("registered component {} as {}", info.name(), id);
                components.push(info);
                id
            })
            .value()
    }

    /// Get the id of component type `C`, if registered.
    #[inline]
    pub fn get<C: Component>(&self) -> Option<Id> {
        self.type_map
            .get(&TypeId::of::<C>())
            .map(|entry| *entry.value())
    }

    /// Get the metadata for a component id.
    pub fn info(&self, id: Id) -> Option<Info> {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.index())
            .copied()
    }

    /// Get a printable name for a component id. Unknown ids print as the id itself.
    pub fn name(&self, id: Id) -> String {
        self.info(id)
            .map(|info| info.name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    /// The number of registered component types.
    pub fn len(&self) -> usize {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no component type has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
