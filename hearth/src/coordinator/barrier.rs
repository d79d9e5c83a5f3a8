//! Process-wide lock barrier.
//!
//! While the count is above zero no app initializes, whatever triggered its
//! check. Locks are anonymous: any caller may release a lock taken by any
//! other caller. Releasing goes through [`Coordinator::unlock`] so that the
//! registry is re-checked once the count drops.
//!
//! The count never goes below zero. An unbalanced release is logged and
//! otherwise ignored.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{error, warn};

use super::Coordinator;
use crate::error::LifecycleResult;

/// Counter gating every initialization.
#[derive(Debug, Default)]
pub struct LockBarrier {
    count: AtomicUsize,
}

impl LockBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a lock. Returns the new count.
    pub fn acquire(&self) -> usize {
        self.count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drop a lock. Returns the remaining count.
    ///
    /// Releasing with no outstanding lock leaves the count at zero.
    pub fn release(&self) -> usize {
        match self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1))
        {
            Ok(previous) => previous - 1,
            Err(_) => {
                warn!("Lock barrier released with no outstanding lock; count stays at 0");
                0
            }
        }
    }

    /// Current number of outstanding locks.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Whether initialization is currently suspended.
    pub fn is_locked(&self) -> bool {
        self.count() > 0
    }
}

/// Scoped lock on a coordinator's barrier.
///
/// Call [`release`](BarrierGuard::release) to unlock and observe any
/// failure from the re-check broadcast. A guard that is simply dropped still
/// unlocks, but can only log such failures.
#[must_use = "dropping the guard releases the lock immediately"]
pub struct BarrierGuard {
    coordinator: Option<Coordinator>,
}

impl BarrierGuard {
    pub(super) fn new(coordinator: Coordinator) -> Self {
        coordinator.lock();
        Self {
            coordinator: Some(coordinator),
        }
    }

    /// Unlock and re-check every app.
    pub fn release(mut self) -> LifecycleResult<()> {
        match self.coordinator.take() {
            Some(coordinator) => coordinator.unlock(),
            None => Ok(()),
        }
    }
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        if let Some(coordinator) = self.coordinator.take() {
            if let Err(e) = coordinator.unlock() {
                error!(error = %e, "App initialization failed while releasing barrier guard");
            }
        }
    }
}

impl fmt::Debug for BarrierGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarrierGuard")
            .field("held", &self.coordinator.is_some())
            .finish()
    }
}
