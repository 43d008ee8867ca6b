//! Error types for the store and configuration.

use crate::components::{ComponentKind, EntityId};
use thiserror::Error;

/// Failures reported by [`GameState`](crate::state::GameState) mutations.
///
/// Lookups never fail; they return `None` or an empty set instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("entity capacity exceeded: at most {limit} live entities")]
    CapacityExceeded { limit: usize },
    #[error("entity id space exhausted")]
    IdSpaceExhausted,
    #[error("entity {0} does not exist")]
    NoSuchEntity(EntityId),
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse simulation config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid simulation config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// The store's indexes disagree with its component data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("entity {entity} has {kind:?} in its mask but no stored component")]
    MaskWithoutComponent { entity: EntityId, kind: ComponentKind },
    #[error("type index for {kind:?} disagrees with entity {entity}")]
    TypeIndexMismatch { entity: EntityId, kind: ComponentKind },
    #[error("type index for {kind:?} lists unknown entity {entity}")]
    TypeIndexOrphan { entity: EntityId, kind: ComponentKind },
    #[error("spatial hash places entity {entity} in cell {cell:?}, expected {expected:?}")]
    SpatialMismatch {
        entity: EntityId,
        cell: Option<(i32, i32)>,
        expected: Option<(i32, i32)>,
    },
    #[error("spatial hash keeps an empty cell at {0:?}")]
    EmptySpatialCell((i32, i32)),
}
