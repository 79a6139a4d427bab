use thiserror::Error;

use crate::ecs;

/// A problem found while building a stage's order. Build errors are collected, logged and
/// returned together; the previously built order stays in effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A dependency names a system that was never added to the stage.
    #[error("stage {stage}: dependency on {system}, which is not in the stage")]
    MissingDependency {
        stage: &'static str,
        system: &'static str,
    },

    /// A dependency names a system that was added to the stage more than once.
    #[error("stage {stage}: dependency on {system} matches {matches} systems")]
    AmbiguousDependency {
        stage: &'static str,
        system: &'static str,
        matches: usize,
    },

    /// The dependencies of a stage form a cycle.
    #[error("stage {stage}: dependency cycle between {}", systems.join(", "))]
    CyclicDependency {
        stage: &'static str,
        systems: Vec<&'static str>,
    },
}

/// The failure of a system while a tick runs. The first one stops the tick.
#[derive(Debug, Error)]
pub enum SystemError {
    /// A storage call made by the system failed.
    #[error(transparent)]
    Storage(#[from] ecs::Error),

    /// The system reported a failure of its own.
    #[error("system failed: {0}")]
    Failed(String),

    /// The future of an async system panicked.
    #[error("system panicked: {0}")]
    Panicked(String),
}

impl From<tokio::task::JoinError> for SystemError {
    fn from(err: tokio::task::JoinError) -> Self {
        SystemError::Panicked(err.to_string())
    }
}

/// The outcome of one system invocation.
pub type SystemResult = Result<(), SystemError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Entity;

    #[test]
    fn errors_render_readably() {
        let missing = Error::MissingDependency {
            stage: "Update",
            system: "movement",
        };
        assert_eq!(
            missing.to_string(),
            "stage Update: dependency on movement, which is not in the stage"
        );

        let cycle = Error::CyclicDependency {
            stage: "Update",
            systems: vec!["a", "b"],
        };
        assert_eq!(cycle.to_string(), "stage Update: dependency cycle between a, b");
    }

    #[test]
    fn storage_errors_convert() {
        let entity = Entity::new(3, 0);
        let err: SystemError = ecs::Error::EntityNotFound(entity).into();
        assert!(matches!(err, SystemError::Storage(ecs::Error::EntityNotFound(e)) if e == entity));
        assert_eq!(err.to_string(), "entity 3v0 not found");
    }
}
