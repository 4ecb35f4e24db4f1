//! # Pool Error Types
//!
//! All errors that can occur while driving a pool.
//!
//! None of these are fatal. Exhaustion and unknown identities are the normal,
//! anticipated outcomes of capacity-bounded concurrent allocation; they are
//! handed back as values and leave the pool untouched.

use thiserror::Error;

use crate::entity::EntityId;

/// Errors that can occur in the pool and its collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Every entity the pool may construct is already handed out.
    #[error("pool exhausted: all {capacity} entities are in use")]
    Exhausted {
        /// The capacity bound that was hit.
        capacity: usize,
    },

    /// The identity is not present in the in-use registry.
    ///
    /// Covers unknown identities and releases of an entity whose count
    /// already reached zero.
    #[error("entity {0} is not in use")]
    InvalidHandle(EntityId),

    /// Invalid pool configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading configuration or starting a reporter thread failed.
    #[error("io error: {0}")]
    Io(String),

    /// A consistency check over the pool state failed.
    #[error("pool invariant violated: {0}")]
    InvariantViolated(String),
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
