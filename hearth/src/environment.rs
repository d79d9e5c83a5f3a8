//! Environment readiness and unload signals.
//!
//! The bridge sits between the raw signal sources (whatever decides that the
//! host is ready, or about to shut down) and the apps. Each source is
//! expected to fire once; the bridge latches the first delivery and ignores
//! repeats, then republishes the event to its subscribers.
//!
//! ```text
//! raw ready source ──► notify_ready() ──► EnvironmentEvent::Ready ──► auto-start apps
//! raw unload source ─► notify_unload() ─► EnvironmentEvent::Unload ─► auto-end apps
//! ```
//!
//! Subscribers only see deliveries that happen after they subscribed. The
//! ready latch, however, stays visible through [`EnvironmentBridge::is_ready`],
//! which is what later gating checks consult.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::error::{LifecycleError, LifecycleResult};
use crate::event::Observable;

/// Events republished by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvironmentEvent {
    /// The environment finished starting up.
    Ready,
    /// The environment is about to shut down.
    Unload,
}

impl fmt::Display for EnvironmentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentEvent::Ready => f.write_str("ready"),
            EnvironmentEvent::Unload => f.write_str("unload"),
        }
    }
}

/// One-shot ready/unload latches plus their subscribers.
#[derive(Debug, Default)]
pub struct EnvironmentBridge {
    ready: AtomicBool,
    unloaded: AtomicBool,
    events: Observable<EnvironmentEvent, (), LifecycleError>,
}

impl EnvironmentBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to an environment event.
    pub fn on<F>(&self, event: EnvironmentEvent, handler: F)
    where
        F: Fn(&()) -> LifecycleResult<()> + Send + Sync + 'static,
    {
        self.events.on(event, handler);
    }

    /// Deliver the ready signal. Only the first call has any effect.
    ///
    /// Dispatch stops at the first subscriber that fails.
    pub fn notify_ready(&self) -> LifecycleResult<()> {
        self.deliver(&self.ready, EnvironmentEvent::Ready)
    }

    /// Deliver the unload signal. Only the first call has any effect.
    pub fn notify_unload(&self) -> LifecycleResult<()> {
        self.deliver(&self.unloaded, EnvironmentEvent::Unload)
    }

    fn deliver(&self, latch: &AtomicBool, event: EnvironmentEvent) -> LifecycleResult<()> {
        if latch.swap(true, Ordering::AcqRel) {
            debug!(%event, "Environment signal already delivered; ignoring");
            return Ok(());
        }

        info!(
            %event,
            subscribers = self.events.listener_count(event),
            "Environment signal received"
        );
        self.events.trigger(event, &())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::Acquire)
    }
}
