// src/pool.rs

// permit pool: a fixed-capacity counting gate

// dependencies
use crate::errors::WindowLimiterError;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, TryAcquireError};

/// Counting gate with a fixed number of permits.
///
/// Permits leave the semaphore as plain counts (the tokio guard is forgotten)
/// because they are returned from a different place than they were taken:
/// either an explicit release or the sweeper. `outstanding` tracks how many are
/// out so a release without a matching acquire can never push availability
/// past `capacity`.
#[derive(Debug)]
pub(crate) struct PermitPool {
    semaphore: Semaphore,
    capacity: usize,
    outstanding: AtomicUsize,
}

impl PermitPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            semaphore: Semaphore::new(capacity),
            capacity,
            outstanding: AtomicUsize::new(0),
        }
    }

    /// Wait for a permit. Waiters are served in FIFO order.
    ///
    /// Cancel safe: dropping the future before it resolves consumes nothing.
    pub(crate) async fn acquire(&self) -> Result<(), WindowLimiterError> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| WindowLimiterError::Closed)?;
        permit.forget();
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub(crate) fn try_acquire(&self) -> Result<bool, WindowLimiterError> {
        match self.semaphore.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.outstanding.fetch_add(1, Ordering::AcqRel);
                Ok(true)
            }
            Err(TryAcquireError::NoPermits) => Ok(false),
            Err(TryAcquireError::Closed) => Err(WindowLimiterError::Closed),
        }
    }

    /// Return one permit. Never blocks.
    ///
    /// Returns false, and changes nothing, if no permit is outstanding.
    pub(crate) fn release(&self) -> bool {
        let returned = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if returned {
            self.semaphore.add_permits(1);
        } else {
            tracing::error!(
                capacity = self.capacity,
                "Permit released without a matching acquire; ignoring"
            );
        }
        returned
    }

    /// Wake every waiter with `Closed` and refuse new acquires.
    pub(crate) fn close(&self) {
        self.semaphore.close();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}
