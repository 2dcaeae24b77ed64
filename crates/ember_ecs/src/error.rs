//! # ECS Error Types
//!
//! All errors that can occur while driving a world.

use thiserror::Error;

use crate::ecs::{CompositionId, EntityId};

/// Errors that can occur in the ECS runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Structural operation on an entity that is not active.
    #[error("cannot {operation} entity {entity}: not active")]
    InactiveEntity {
        /// The entity that was addressed.
        entity: EntityId,
        /// The call that was rejected.
        operation: &'static str,
    },

    /// Composition id not present in the identity table.
    #[error("unknown {0}")]
    InvalidComposition(CompositionId),

    /// Read of a component the entity does not hold.
    #[error("entity {entity} has no {component}")]
    UnsafeComponentAccess {
        /// The entity that was read.
        entity: EntityId,
        /// Type name of the component.
        component: &'static str,
    },

    /// Subscription handle not issued by this world.
    #[error("subscription not found: {0}")]
    UnknownSubscription(usize),

    /// Invalid configuration value or file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
