//! Error types shared by the store and the engine.

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Kind of entity a lookup or conflict refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntityKind {
    Match,
    Tournament,
    Player,
    Team,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Match => write!(f, "Match"),
            EntityKind::Tournament => write!(f, "Tournament"),
            EntityKind::Player => write!(f, "Player"),
            EntityKind::Team => write!(f, "Team"),
        }
    }
}

/// Errors raised by a [`Store`](crate::store::Store) implementation.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum StoreError {
    /// The document changed since it was read (stale version).
    #[error("{kind} {id} was modified concurrently")]
    Conflict { kind: EntityKind, id: Uuid },

    /// A write referred to a document that does not exist.
    #[error("{0} {1} does not exist")]
    Missing(EntityKind, Uuid),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found: {1}")]
    NotFound(EntityKind, Uuid),

    #[error("{0}")]
    BadRequest(String),

    /// Optimistic retries ran out; the caller may retry the operation.
    #[error("{kind} {id} kept changing; gave up after {attempts} attempts")]
    Conflict {
        kind: EntityKind,
        id: Uuid,
        attempts: u32,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        EngineError::BadRequest(reason.into())
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::Conflict { .. } | EngineError::Store(StoreError::Conflict { .. })
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
