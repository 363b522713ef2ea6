//! Bounded worker pools for hostdeck.
//!
//! A `WorkerPool` caps how many callers may use a scarce external resource
//! at once. Callers check out a `Worker` token and give it back when done;
//! the token returns itself on drop, so it cannot be returned twice.

pub mod error;
pub mod pool;

pub use error::{PoolError, Result};
pub use pool::{Worker, WorkerPool};
