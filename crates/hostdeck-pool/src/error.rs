//! Error types for the pool crate.

use std::time::Duration;

use thiserror::Error;

/// Reasons a worker could not be acquired.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// No worker became free before the deadline.
    #[error("timed out after {waited:?} waiting for a {pool} worker")]
    Timeout {
        /// Pool name.
        pool: String,
        /// How long the caller waited.
        waited: Duration,
    },

    /// The caller gave up before a worker became free.
    #[error("canceled while waiting for a {pool} worker")]
    Canceled {
        /// Pool name.
        pool: String,
    },
}

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
