//! Storage-layer errors.
//!
//! Every variant describes a broken assumption on the caller's side (a stale handle, a missing
//! component, an illegal transition). None of them are retried; systems propagate them with `?`
//! and the scheduler surfaces them as a failed tick.

use thiserror::Error;

use crate::ecs::{component, entity::Entity, storage::ComponentTransition};

/// Errors raised by [`Storage`](crate::ecs::Storage) and its query views.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The handle is stale, out of range, or belongs to an entity that has since died.
    #[error("entity {0} not found")]
    EntityNotFound(Entity),

    /// The entity exists but does not hold the component.
    #[error("entity {entity} has no component {component}")]
    ComponentNotFound {
        entity: Entity,
        component: component::Id,
    },

    /// The transition is not legal for the entity's current shape, e.g. updating an absent
    /// component or adding one that is already present.
    #[error("cannot apply {kind:?} to component {component}")]
    InvalidTransition {
        component: component::Id,
        kind: ComponentTransition,
    },

    /// A typed accessor asked for a type other than the one registered for the component id.
    #[error("component {component} is not of the requested type")]
    ComponentTypeMismatch { component: component::Id },

    /// Every slot index representable in an entity handle is in use.
    #[error("entity index space exhausted")]
    EntityLimit,

    /// The operation exists on the API but has no implementation yet.
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),
}

/// Convenience result for storage operations.
pub type Result<T> = std::result::Result<T, Error>;
