//! The coordinator: one per process (or per test).
//!
//! A [`Coordinator`] owns the three pieces of shared lifecycle state:
//!
//! 1. The [`LockBarrier`] suspending every initialization while held
//! 2. The [`EnvironmentBridge`] latching ready/unload signals
//! 3. The [`AppRegistry`] listing every app it built
//!
//! Apps are created through [`Coordinator::app`], which injects the barrier
//! and bridge into the app and wires its environment subscriptions. Several
//! coordinators can coexist; their apps never interact.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────── Coordinator ─────────────────────────────┐
//! │                                                                        │
//! │  notify_ready() ──► EnvironmentBridge ──► Ready ──► app.check()  (auto_start)
//! │  notify_unload() ─► EnvironmentBridge ──► Unload ─► app.unload() (auto_end)
//! │                                                                        │
//! │  lock()   ──► LockBarrier += 1                                         │
//! │  unlock() ──► LockBarrier -= 1 ──► AppRegistry::broadcast_check()      │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use hearth::{AppOptions, Coordinator};
//!
//! let coordinator = Coordinator::new();
//! let app = coordinator.app(AppOptions::new("search"));
//!
//! coordinator.lock();
//! coordinator.notify_ready().unwrap();
//! assert!(!app.is_initialized()); // held back by the barrier
//!
//! coordinator.unlock().unwrap();
//! assert!(app.is_initialized());
//! ```

mod barrier;
mod registry;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

pub use barrier::{BarrierGuard, LockBarrier};
pub use registry::AppRegistry;

use crate::app::{App, AppOptions};
use crate::environment::{EnvironmentBridge, EnvironmentEvent};
use crate::error::LifecycleResult;

struct Shared {
    barrier: Arc<LockBarrier>,
    environment: Arc<EnvironmentBridge>,
    registry: AppRegistry,
}

/// Process-wide lifecycle coordinator.
///
/// Cloning is cheap; clones share the same barrier, environment and
/// registry.
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl Coordinator {
    /// Create a coordinator with a clear barrier and an environment that is
    /// neither ready nor unloaded.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                barrier: Arc::new(LockBarrier::new()),
                environment: Arc::new(EnvironmentBridge::new()),
                registry: AppRegistry::new(),
            }),
        }
    }

    /// Construct and register an app.
    ///
    /// With `auto_start` the app runs its gating check when the environment
    /// becomes ready; with `auto_end` it unloads when the environment
    /// unloads. An app created after the ready signal was delivered waits
    /// for the next check (`ignite`, or a barrier release).
    pub fn app(&self, options: AppOptions) -> App {
        let app = App::new(
            options,
            Arc::clone(&self.shared.barrier),
            Arc::clone(&self.shared.environment),
        );

        let environment = &self.shared.environment;
        if app.options().auto_start {
            let weak = app.downgrade();
            environment.on(EnvironmentEvent::Ready, move |_| match weak.upgrade() {
                Some(app) => app.check(),
                None => Ok(()),
            });
        }
        if app.options().auto_end {
            let weak = app.downgrade();
            environment.on(EnvironmentEvent::Unload, move |_| match weak.upgrade() {
                Some(app) => app.unload(),
                None => Ok(()),
            });
        }

        debug!(
            app = %app.name(),
            auto_start = app.options().auto_start,
            auto_end = app.options().auto_end,
            "App registered"
        );
        self.shared.registry.register(app.clone());
        app
    }

    // ------------------------------------------------------------------
    // Lock barrier
    // ------------------------------------------------------------------

    /// Suspend every initialization until a matching [`unlock`](Self::unlock).
    pub fn lock(&self) {
        let count = self.shared.barrier.acquire();
        debug!(locks = count, "Lock barrier acquired");
    }

    /// Release one lock and re-check every app.
    ///
    /// If the count reaches zero, apps whose conditions were met while the
    /// barrier was held initialize now. All apps are visited; failures are
    /// aggregated.
    pub fn unlock(&self) -> LifecycleResult<()> {
        let remaining = self.shared.barrier.release();
        debug!(locks = remaining, "Lock barrier released");
        if remaining == 0 {
            info!("Lock barrier clear; re-checking apps");
        }
        self.shared.registry.broadcast_check()
    }

    /// Take a lock that is released when the guard is released or dropped.
    pub fn hold(&self) -> BarrierGuard {
        BarrierGuard::new(self.clone())
    }

    /// Outstanding barrier locks.
    pub fn lock_count(&self) -> usize {
        self.shared.barrier.count()
    }

    pub fn is_locked(&self) -> bool {
        self.shared.barrier.is_locked()
    }

    // ------------------------------------------------------------------
    // Environment
    // ------------------------------------------------------------------

    /// Deliver the environment-ready signal.
    pub fn notify_ready(&self) -> LifecycleResult<()> {
        self.shared.environment.notify_ready()
    }

    /// Deliver the environment-unload signal.
    pub fn notify_unload(&self) -> LifecycleResult<()> {
        self.shared.environment.notify_unload()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.environment.is_ready()
    }

    pub fn environment(&self) -> Arc<EnvironmentBridge> {
        Arc::clone(&self.shared.environment)
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Every app, in registration order.
    pub fn apps(&self) -> Vec<App> {
        self.shared.registry.apps()
    }

    /// First app registered under `name`.
    pub fn find(&self, name: &str) -> Option<App> {
        self.shared.registry.find(name)
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.shared.registry
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("locks", &self.lock_count())
            .field("ready", &self.is_ready())
            .field("apps", &self.shared.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AppPhase, SmotherOptions};
    use crate::error::LifecycleError;
    use parking_lot::Mutex;

    fn counting_start(app: &App) -> Arc<Mutex<u32>> {
        let starts = Arc::new(Mutex::new(0));
        let s = Arc::clone(&starts);
        app.start(move |_| {
            *s.lock() += 1;
            Ok(())
        });
        starts
    }

    #[test]
    fn test_ready_initializes_auto_start_apps() {
        let coordinator = Coordinator::new();
        let auto = coordinator.app(AppOptions::new("auto"));
        let manual = coordinator.app(AppOptions::new("manual").with_auto_start(false));

        coordinator.notify_ready().unwrap();

        assert!(auto.is_initialized());
        assert!(!manual.is_initialized());

        manual.ignite().unwrap();
        assert!(manual.is_initialized());
    }

    #[test]
    fn test_lock_defers_ready() {
        let coordinator = Coordinator::new();
        let app = coordinator.app(AppOptions::new("held"));
        let starts = counting_start(&app);

        coordinator.lock();
        coordinator.lock();
        coordinator.notify_ready().unwrap();
        assert_eq!(*starts.lock(), 0);

        coordinator.unlock().unwrap();
        assert_eq!(*starts.lock(), 0);
        assert_eq!(coordinator.lock_count(), 1);

        coordinator.unlock().unwrap();
        assert_eq!(*starts.lock(), 1);
        assert!(!coordinator.is_locked());
    }

    #[test]
    fn test_lock_defers_ignite() {
        let coordinator = Coordinator::new();
        let app = coordinator.app(AppOptions::new("manual").with_auto_start(false));

        coordinator.lock();
        app.ignite().unwrap();
        assert!(!app.is_initialized());

        coordinator.unlock().unwrap();
        assert!(app.is_initialized());
    }

    #[test]
    fn test_unlock_without_condition_does_nothing() {
        let coordinator = Coordinator::new();
        let app = coordinator.app(AppOptions::new("waiting"));

        coordinator.lock();
        coordinator.unlock().unwrap();
        assert_eq!(app.phase(), AppPhase::Registered);
    }

    #[test]
    fn test_unbalanced_unlock_is_clamped() {
        let coordinator = Coordinator::new();
        let app = coordinator.app(AppOptions::new("clamped"));

        coordinator.unlock().unwrap();
        assert_eq!(coordinator.lock_count(), 0);

        // One lock still suspends after the extra unlock.
        coordinator.lock();
        coordinator.notify_ready().unwrap();
        assert!(!app.is_initialized());
        coordinator.unlock().unwrap();
        assert!(app.is_initialized());
    }

    #[test]
    fn test_hold_guard_release() {
        let coordinator = Coordinator::new();
        let app = coordinator.app(AppOptions::new("guarded"));

        let guard = coordinator.hold();
        assert_eq!(coordinator.lock_count(), 1);
        coordinator.notify_ready().unwrap();
        assert!(!app.is_initialized());

        guard.release().unwrap();
        assert_eq!(coordinator.lock_count(), 0);
        assert!(app.is_initialized());
    }

    #[test]
    fn test_hold_guard_drop_unlocks() {
        let coordinator = Coordinator::new();
        let app = coordinator.app(AppOptions::new("dropped"));
        app.start(|_| Err("start failed".into()));

        {
            let _guard = coordinator.hold();
            coordinator.notify_ready().unwrap();
        }

        assert_eq!(coordinator.lock_count(), 0);
        assert!(app.is_initialized());
    }

    #[test]
    fn test_unlock_aggregates_failures() {
        let coordinator = Coordinator::new();
        let a = coordinator.app(AppOptions::new("a"));
        let b = coordinator.app(AppOptions::new("b"));
        let c = coordinator.app(AppOptions::new("c"));
        a.start(|_| Err("a failed".into()));
        c.start(|_| Err("c failed".into()));
        let b_starts = counting_start(&b);

        coordinator.lock();
        coordinator.notify_ready().unwrap();
        let err = coordinator.unlock().unwrap_err();

        match err {
            LifecycleError::Multiple(errors) => {
                let names: Vec<_> = errors.iter().filter_map(|e| e.app()).collect();
                assert_eq!(names, vec!["a", "c"]);
            }
            other => panic!("expected aggregated failure, got {other:?}"),
        }
        assert_eq!(*b_starts.lock(), 1);
    }

    #[test]
    fn test_ready_failure_stops_dispatch() {
        let coordinator = Coordinator::new();
        let a = coordinator.app(AppOptions::new("a"));
        let b = coordinator.app(AppOptions::new("b"));
        a.start(|_| Err("a failed".into()));

        let err = coordinator.notify_ready().unwrap_err();
        assert_eq!(err.app(), Some("a"));
        assert!(!b.is_initialized());

        // The next broadcast picks up the app that was skipped.
        coordinator.lock();
        coordinator.unlock().unwrap();
        assert!(b.is_initialized());
    }

    #[test]
    fn test_unload_only_initialized_auto_end_apps() {
        let coordinator = Coordinator::new();
        let started = coordinator.app(AppOptions::new("started"));
        let never = coordinator.app(AppOptions::new("never").with_auto_start(false));
        let keep = coordinator.app(AppOptions::new("keep").with_auto_end(false));

        let ended = Arc::new(Mutex::new(Vec::new()));
        for app in [&started, &never, &keep] {
            let ended = Arc::clone(&ended);
            app.end(move |app, _| {
                ended.lock().push(app.name().to_string());
                Ok(())
            });
        }

        coordinator.notify_ready().unwrap();
        coordinator.notify_unload().unwrap();

        assert_eq!(*ended.lock(), vec!["started".to_string()]);
        assert_eq!(never.phase(), AppPhase::Registered);
        assert_eq!(keep.phase(), AppPhase::Initialized);

        keep.smother(SmotherOptions::default()).unwrap();
        assert_eq!(ended.lock().len(), 2);
    }

    #[test]
    fn test_app_created_after_ready_waits_for_next_check() {
        let coordinator = Coordinator::new();
        coordinator.notify_ready().unwrap();

        let late = coordinator.app(AppOptions::new("late"));
        assert!(!late.is_initialized());

        coordinator.lock();
        coordinator.unlock().unwrap();
        assert!(late.is_initialized());
    }

    #[test]
    fn test_unlock_after_ready_skips_manual_apps() {
        let coordinator = Coordinator::new();
        let manual = coordinator.app(AppOptions::new("manual").with_auto_start(false));

        coordinator.notify_ready().unwrap();
        coordinator.lock();
        coordinator.unlock().unwrap();
        assert!(!manual.is_initialized());

        manual.ignite().unwrap();
        assert!(manual.is_initialized());
    }

    #[test]
    fn test_coordinators_are_independent() {
        let first = Coordinator::new();
        let second = Coordinator::new();
        let a = first.app(AppOptions::new("a"));
        let b = second.app(AppOptions::new("b"));

        second.lock();
        first.notify_ready().unwrap();

        assert!(a.is_initialized());
        assert!(!b.is_initialized());
        assert_eq!(first.apps().len(), 1);
        assert!(second.find("a").is_none());
    }

    #[test]
    fn test_find_returns_registered_app() {
        let coordinator = Coordinator::new();
        let app = coordinator.app(AppOptions::new("needle"));
        coordinator.app(AppOptions::new("hay"));

        let found = coordinator.find("needle").unwrap();
        assert!(found.ptr_eq(&app));
        assert_eq!(coordinator.registry().len(), 2);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Step {
            Ready,
            Ignite,
            Lock,
            Unlock,
        }

        fn step() -> impl Strategy<Value = Step> {
            prop_oneof![
                Just(Step::Ready),
                Just(Step::Ignite),
                Just(Step::Lock),
                Just(Step::Unlock),
            ]
        }

        proptest! {
            #[test]
            fn test_initialize_at_most_once(steps in proptest::collection::vec(step(), 0..40)) {
                let coordinator = Coordinator::new();
                let app = coordinator.app(AppOptions::new("prop"));
                let starts = counting_start(&app);

                for step in &steps {
                    match step {
                        Step::Ready => coordinator.notify_ready().unwrap(),
                        Step::Ignite => {
                            app.ignite().unwrap();
                        }
                        Step::Lock => coordinator.lock(),
                        Step::Unlock => coordinator.unlock().unwrap(),
                    }
                }

                prop_assert!(*starts.lock() <= 1);
                let expected = !coordinator.is_locked()
                    && steps.iter().any(|s| matches!(s, Step::Ready | Step::Ignite));
                // Once triggered with a clear barrier the app must have started;
                // a held barrier can only delay it.
                if expected {
                    prop_assert_eq!(*starts.lock(), 1);
                }
            }
        }
    }
}
