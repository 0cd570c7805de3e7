// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! The single compile lock.
//!
//! Exactly one caller may drive the external toolchain at a time. Waiters
//! are served in arrival order (tokio's semaphore queue is FIFO), every
//! wait is bounded, and a caller that gives up (timeout or cancellation)
//! leaves the queue without disturbing the order of the others.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Failed lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("timed out after {waited_ms}ms waiting for the compiler")]
    Timeout { waited_ms: u64 },

    #[error("cancelled while waiting for the compiler")]
    Cancelled,
}

/// Proof of exclusive access to the compiler. Dropping it releases the
/// lock.
#[derive(Debug)]
pub struct CompileToken {
    _permit: OwnedSemaphorePermit,
}

/// FIFO mutual-exclusion gate around the external compiler.
pub struct CompileLock {
    sem: Arc<Semaphore>,
}

impl CompileLock {
    pub fn new() -> Self {
        Self {
            sem: Arc::new(Semaphore::new(1)),
        }
    }

    /// Wait at most `wait` for exclusive access.
    ///
    /// Cancellation (or dropping the returned future) removes this caller
    /// from the wait queue immediately.
    pub async fn acquire(
        &self,
        wait: Duration,
        cancel: &CancellationToken,
    ) -> Result<CompileToken, LockError> {
        let sem = Arc::clone(&self.sem);
        tokio::select! {
            acquired = tokio::time::timeout(wait, sem.acquire_owned()) => match acquired {
                Ok(Ok(permit)) => Ok(CompileToken { _permit: permit }),
                // The semaphore is never closed.
                Ok(Err(_)) => Err(LockError::Cancelled),
                Err(_elapsed) => Err(LockError::Timeout {
                    waited_ms: wait.as_millis() as u64,
                }),
            },
            () = cancel.cancelled() => Err(LockError::Cancelled),
        }
    }

    /// Take the lock only if it is free right now.
    pub fn try_acquire(&self) -> Option<CompileToken> {
        Arc::clone(&self.sem)
            .try_acquire_owned()
            .ok()
            .map(|permit| CompileToken { _permit: permit })
    }

    /// Whether a compile (or sync cycle) currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.sem.available_permits() == 0
    }
}

impl Default for CompileLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
