//! Per-app lifecycle state.
//!
//! # State Machine
//!
//! ```text
//! Registered --[check passes]--> Initialized --[unload / smother]--> Unloaded
//! Registered --[unload / smother]--> Registered (no-op)
//! ```
//!
//! Each arrow is guarded by its own one-shot flag. The guards are claimed
//! with a compare-and-swap at the start of the transition, so concurrent or
//! re-entrant triggers observe the transition as already taken and return
//! without side effects.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::App;
use crate::config::Config;
use crate::error::CallbackResult;

/// The single start action of an app.
pub type StartFn = Box<dyn FnOnce(&Config) -> CallbackResult + Send>;

/// The single end action of an app.
pub type EndFn = Box<dyn FnOnce(&App, &Config) -> CallbackResult + Send>;

/// Coarse lifecycle phase, derived from the one-shot flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppPhase {
    /// Constructed, waiting for its gating check to pass.
    Registered,
    /// Initialization ran (possibly partially, if a callback failed).
    Initialized,
    /// Unload ran, or the app was silently discarded.
    Unloaded,
}

impl AppPhase {
    /// Short label for status output.
    pub fn display_status(&self) -> &'static str {
        match self {
            AppPhase::Registered => "waiting",
            AppPhase::Initialized => "running",
            AppPhase::Unloaded => "ended",
        }
    }
}

impl fmt::Display for AppPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_status())
    }
}

/// A single-callback slot: empty, armed, or spent.
///
/// Registering again while armed replaces the callback. Once the slot has
/// been taken it is spent and refuses new callbacks.
pub struct CallbackSlot<F> {
    inner: Mutex<SlotState<F>>,
}

enum SlotState<F> {
    Empty,
    Armed(F),
    Spent,
}

impl<F> CallbackSlot<F> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SlotState::Empty),
        }
    }

    /// Arm the slot with `callback`, replacing any previous one.
    ///
    /// Returns the callback back as `Err` if the slot is already spent.
    pub fn replace(&self, callback: F) -> Result<(), F> {
        let mut inner = self.inner.lock();
        if matches!(*inner, SlotState::Spent) {
            return Err(callback);
        }
        *inner = SlotState::Armed(callback);
        Ok(())
    }

    /// Take the callback (if any) and mark the slot spent.
    pub fn take(&self) -> Option<F> {
        match std::mem::replace(&mut *self.inner.lock(), SlotState::Spent) {
            SlotState::Armed(callback) => Some(callback),
            SlotState::Empty | SlotState::Spent => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(*self.inner.lock(), SlotState::Armed(_))
    }

    pub fn is_spent(&self) -> bool {
        matches!(*self.inner.lock(), SlotState::Spent)
    }
}

impl<F> Default for CallbackSlot<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot flags plus the start/end callback slots.
///
/// Start and end are slots, not queues: registering again replaces the
/// previous callback.
pub struct LifecycleState {
    initialized: AtomicBool,
    ignited: AtomicBool,
    unloaded: AtomicBool,
    pub(crate) start: CallbackSlot<StartFn>,
    pub(crate) end: CallbackSlot<EndFn>,
}

impl LifecycleState {
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            ignited: AtomicBool::new(false),
            unloaded: AtomicBool::new(false),
            start: CallbackSlot::new(),
            end: CallbackSlot::new(),
        }
    }

    /// Claim the initialization guard. Returns `true` exactly once.
    pub fn claim_initialize(&self) -> bool {
        self.initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claim the unload guard. Returns `true` at most once, and never before
    /// initialization.
    pub fn claim_unload(&self) -> bool {
        if !self.is_initialized() {
            return false;
        }
        self.unloaded
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Mark the app ignited. Returns `true` if this call set the flag.
    pub fn ignite(&self) -> bool {
        !self.ignited.swap(true, Ordering::AcqRel)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_ignited(&self) -> bool {
        self.ignited.load(Ordering::Acquire)
    }

    pub fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::Acquire)
    }

    /// Current phase.
    pub fn phase(&self) -> AppPhase {
        if self.is_unloaded() {
            AppPhase::Unloaded
        } else if self.is_initialized() {
            AppPhase::Initialized
        } else {
            AppPhase::Registered
        }
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleState")
            .field("phase", &self.phase())
            .field("ignited", &self.is_ignited())
            .field("has_start", &self.start.is_armed())
            .field("has_end", &self.end.is_armed())
            .finish()
    }
}
