//! # Context-aware mutual exclusion.
//!
//! [`ContextLock`] is a mutex whose acquisition honours a [`Context`]: a
//! canceled acquirer gets the cancellation cause back and holds nothing.
//! The event loop uses it to keep submission order aligned with generation
//! assignment.
//!
//! Backed by a one-permit [`Semaphore`]; release is the guard's drop, so a
//! double release is unrepresentable.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::context::Context;
use crate::error::TaskError;

/// Mutex with cancellable acquisition.
pub struct ContextLock {
    semaphore: Arc<Semaphore>,
}

/// Holds the lock until dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard {
    _permit: OwnedSemaphorePermit,
}

impl ContextLock {
    /// Creates an unlocked lock.
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Acquires the lock, honouring `ctx`.
    ///
    /// Returns the cancellation cause if `ctx` cancels before acquisition;
    /// the failed acquirer holds nothing. The cause is checked both before
    /// and during the wait because `select!` picks among ready branches
    /// nondeterministically.
    pub async fn acquire(&self, ctx: &Context) -> Result<LockGuard, TaskError> {
        if let Some(cause) = ctx.cause() {
            return Err(cause);
        }

        tokio::select! {
            _ = ctx.cancelled() => Err(ctx.cause().unwrap_or(TaskError::Canceled)),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                // The semaphore is owned by this lock and never closed.
                let permit = permit.expect("lock semaphore closed");
                Ok(LockGuard { _permit: permit })
            }
        }
    }

    /// Acquires the lock unconditionally.
    pub async fn lock(&self) -> LockGuard {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("lock semaphore closed");

        LockGuard { _permit: permit }
    }
}

impl Default for ContextLock {
    fn default() -> Self {
        Self::new()
    }
}
