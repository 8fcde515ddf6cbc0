//! Single-permit execution lock with bounded acquisition.
//!
//! Exactly one command line may be in flight system-wide. Acquisition waits
//! at most the configured timeout and never queues: on timeout the caller
//! gets `None` and reports "busy". The permit is released when the returned
//! [`ExecutionPermit`] is dropped, on every exit path including unwinding.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

pub struct ExecutionLock {
    held: Mutex<bool>,
    released: Condvar,
}

/// Proof that the caller owns the execution lock. Releases on drop.
#[must_use = "the lock is released as soon as the permit is dropped"]
pub struct ExecutionPermit<'a> {
    lock: &'a ExecutionLock,
}

impl ExecutionLock {
    pub const fn new() -> Self {
        Self {
            held: Mutex::new(false),
            released: Condvar::new(),
        }
    }

    /// Take the permit if it is free right now.
    pub fn try_acquire(&self) -> Option<ExecutionPermit<'_>> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if *held {
            return None;
        }
        *held = true;
        Some(ExecutionPermit { lock: self })
    }

    /// Wait up to `timeout` for the permit.
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<ExecutionPermit<'_>> {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut held, _) = self
            .released
            .wait_timeout_while(held, timeout, |held| *held)
            .unwrap_or_else(PoisonError::into_inner);
        if *held {
            return None;
        }
        *held = true;
        Some(ExecutionPermit { lock: self })
    }

    /// Whether a command is currently in flight.
    pub fn is_held(&self) -> bool {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ExecutionLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ExecutionPermit<'_> {
    fn drop(&mut self) {
        let mut held = self
            .lock
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *held = false;
        drop(held);
        self.lock.released.notify_one();
    }
}
