//! Registry error taxonomy
//!
//! Structural operations return these typed errors; system `update` bodies
//! wrap them in `anyhow` at the scheduler boundary.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    /// A registry can track at most this many distinct component types.
    #[error("component type limit of {limit} reached")]
    ComponentTypeLimit { limit: usize },

    /// The entity id is free or was never handed out.
    #[error("entity {id} is not alive")]
    UnknownEntity { id: u32 },

    /// The entity is alive but has no component of the requested type.
    #[error("entity {entity} has no {component} component")]
    MissingComponent {
        entity: u32,
        component: &'static str,
    },

    /// A system of this type is already registered.
    #[error("system {name} is already registered")]
    DuplicateSystem { name: &'static str },

    /// No system of this type is registered.
    #[error("no system {name} registered")]
    UnknownSystem { name: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = EcsError::MissingComponent {
            entity: 7,
            component: "Health",
        };
        assert_eq!(err.to_string(), "entity 7 has no Health component");

        let err = EcsError::ComponentTypeLimit { limit: 32 };
        assert_eq!(err.to_string(), "component type limit of 32 reached");
    }
}
