//! Fixed-capacity pool of named worker tokens.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{PoolError, Result};

struct Shared {
    name: String,
    capacity: usize,
    permits: Arc<Semaphore>,
    /// Indices of idle workers, oldest first.
    idle: Mutex<VecDeque<usize>>,
}

impl Shared {
    /// Turn a permit into a token. A permit guarantees an idle index exists.
    fn check_out(self: &Arc<Self>, permit: OwnedSemaphorePermit) -> Worker {
        let index = self
            .idle
            .lock()
            .pop_front()
            .unwrap_or_else(|| unreachable!("permit held with no idle worker"));

        let worker = Worker {
            pool: Arc::clone(self),
            index,
            _permit: permit,
        };
        trace!(worker = %worker, "worker acquired");
        worker
    }
}

/// A fixed set of interchangeable worker tokens.
///
/// Cloning yields another handle to the same pool.
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Create a pool holding `capacity` workers named `name:1` to `name:N`.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let name = name.into();
        debug!(pool = %name, capacity, "worker pool created");

        Self {
            shared: Arc::new(Shared {
                name,
                capacity,
                permits: Arc::new(Semaphore::new(capacity)),
                idle: Mutex::new((1..=capacity).collect()),
            }),
        }
    }

    /// Pool name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Configured number of workers.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of workers not currently checked out.
    pub fn available(&self) -> usize {
        self.shared.permits.available_permits()
    }

    /// Wait for a worker until `deadline`.
    pub async fn acquire_until(&self, deadline: Instant) -> Result<Worker> {
        let started = Instant::now();
        let permits = Arc::clone(&self.shared.permits);

        match tokio::time::timeout_at(deadline, permits.acquire_owned()).await {
            Ok(Ok(permit)) => Ok(self.shared.check_out(permit)),
            Ok(Err(_closed)) => Err(self.canceled()),
            Err(_elapsed) => {
                let waited = started.elapsed();
                debug!(pool = %self.shared.name, ?waited, "timed out waiting for worker");
                Err(PoolError::Timeout {
                    pool: self.shared.name.clone(),
                    waited,
                })
            }
        }
    }

    /// Wait for a worker for at most `timeout`.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<Worker> {
        self.acquire_until(Instant::now() + timeout).await
    }

    /// Wait for a worker until one is free or `cancel` completes.
    pub async fn acquire_or_cancel<F>(&self, cancel: F) -> Result<Worker>
    where
        F: Future<Output = ()>,
    {
        let permits = Arc::clone(&self.shared.permits);

        tokio::select! {
            permit = permits.acquire_owned() => match permit {
                Ok(permit) => Ok(self.shared.check_out(permit)),
                Err(_closed) => Err(self.canceled()),
            },
            () = cancel => {
                debug!(pool = %self.shared.name, "worker wait canceled");
                Err(self.canceled())
            }
        }
    }

    /// Take a worker only if one is free right now.
    pub fn try_acquire(&self) -> Option<Worker> {
        let permit = Arc::clone(&self.shared.permits).try_acquire_owned().ok()?;
        Some(self.shared.check_out(permit))
    }

    fn canceled(&self) -> PoolError {
        PoolError::Canceled {
            pool: self.shared.name.clone(),
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.shared.name)
            .field("capacity", &self.shared.capacity)
            .field("available", &self.available())
            .finish()
    }
}

/// A checked-out worker. Returns itself to its pool when dropped.
pub struct Worker {
    pool: Arc<Shared>,
    index: usize,
    // Dropped after `Drop::drop` has put the index back.
    _permit: OwnedSemaphorePermit,
}

impl Worker {
    /// Display identity, `<pool>:<n>`.
    pub fn name(&self) -> String {
        format!("{}:{}", self.pool.name, self.index)
    }

    /// Position of this worker in its pool, starting at 1.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Give the worker back. Equivalent to dropping it.
    pub fn release(self) {}
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.pool.idle.lock().push_back(self.index);
        trace!(pool = %self.pool.name, index = self.index, "worker released");
    }
}

impl fmt::Display for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pool.name, self.index)
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Worker").field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_acquire_names_in_order() {
        let pool = WorkerPool::new("mylabel", 2);

        let a = pool.try_acquire().unwrap();
        let b = pool.try_acquire().unwrap();
        assert_eq!(a.name(), "mylabel:1");
        assert_eq!(b.name(), "mylabel:2");
        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_release_returns_worker() {
        let pool = WorkerPool::new("nix", 1);

        let worker = pool.try_acquire().unwrap();
        assert_eq!(pool.available(), 0);
        worker.release();
        assert_eq!(pool.available(), 1);

        let again = pool.try_acquire().unwrap();
        assert_eq!(again.to_string(), "nix:1");
    }

    #[test]
    fn test_released_worker_goes_to_back() {
        let pool = WorkerPool::new("p", 3);

        let first = pool.try_acquire().unwrap();
        drop(first);

        let names: Vec<_> = (0..3).map(|_| pool.try_acquire().unwrap()).collect();
        let names: Vec<_> = names.iter().map(Worker::name).collect();
        assert_eq!(names, vec!["p:2", "p:3", "p:1"]);
    }

    #[test]
    fn test_zero_capacity() {
        let pool = WorkerPool::new("empty", 0);
        assert_eq!(pool.capacity(), 0);
        assert!(pool.try_acquire().is_none());
    }
}
