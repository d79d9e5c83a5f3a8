//! Apps and their lifecycle transitions.
//!
//! An [`App`] bundles a configuration map, an ordered queue of setup
//! callbacks and single start/end callbacks. It moves through two one-shot
//! transitions:
//!
//! - **initialize**: runs setup callbacks in order, then the start callback.
//!   Gated on the coordinator's lock barrier being clear AND the app being
//!   ignited or (auto-starting and the environment being ready).
//! - **unload**: runs the end callback. Only ever happens after initialize.
//!
//! # Initialization Steps
//!
//! ```text
//! claim guard ─► setup:before ─► setup callbacks (FIFO) ─► setup:after
//!             ─► start:before ─► start callback ─► start:after
//! ```
//!
//! A failing callback or handler aborts the remaining steps and the error is
//! returned to whoever triggered the check. The guard stays claimed: there is
//! no rollback and no retry.
//!
//! # Example
//!
//! ```
//! use hearth::{AppOptions, Coordinator};
//!
//! let coordinator = Coordinator::new();
//! let app = coordinator.app(AppOptions::new("search"));
//!
//! app.configure("endpoint", "/api/search")
//!     .setup(|config| {
//!         config.set("ready", true);
//!         Ok(())
//!     })
//!     .start(|config| {
//!         assert_eq!(config.get_bool("ready"), Some(true));
//!         Ok(())
//!     });
//!
//! app.ignite().unwrap();
//! assert!(app.is_initialized());
//! ```

mod queue;
mod state;

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

pub use queue::{CallbackQueue, SetupFn};
pub use state::{AppPhase, CallbackSlot, EndFn, LifecycleState, StartFn};

use crate::config::Config;
use crate::coordinator::LockBarrier;
use crate::environment::EnvironmentBridge;
use crate::error::{CallbackResult, LifecycleError, LifecycleResult};
use crate::event::{LifecycleEvent, LifecycleEvents};

/// Construction options for an app.
///
/// Both auto flags default to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppOptions {
    /// Name used in logs and errors.
    pub name: String,

    /// Initialize when the environment becomes ready.
    pub auto_start: bool,

    /// Unload when the environment unloads.
    pub auto_end: bool,
}

impl AppOptions {
    /// Options for an app named `name` with both auto flags on.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auto_start: true,
            auto_end: true,
        }
    }

    /// Set whether the app follows environment readiness.
    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Set whether the app follows environment unload.
    pub fn with_auto_end(mut self, auto_end: bool) -> Self {
        self.auto_end = auto_end;
        self
    }
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::new("app")
    }
}

/// Options for [`App::smother`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmotherOptions {
    /// Discard the app without running its end callback or emitting `end`.
    pub is_silent: bool,
}

impl SmotherOptions {
    /// Discard without end-of-life side effects.
    pub fn silent() -> Self {
        Self { is_silent: true }
    }
}

struct AppInner {
    options: AppOptions,
    config: Mutex<Config>,
    setup: CallbackQueue,
    state: LifecycleState,
    events: LifecycleEvents,
    barrier: Arc<LockBarrier>,
    environment: Arc<EnvironmentBridge>,
}

/// Handle to a registered app.
///
/// Cloning is cheap; every clone refers to the same app.
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

/// Non-owning handle used by environment subscriptions.
#[derive(Clone)]
pub(crate) struct WeakApp {
    inner: Weak<AppInner>,
}

impl WeakApp {
    pub(crate) fn upgrade(&self) -> Option<App> {
        self.inner.upgrade().map(|inner| App { inner })
    }
}

impl App {
    pub(crate) fn new(
        options: AppOptions,
        barrier: Arc<LockBarrier>,
        environment: Arc<EnvironmentBridge>,
    ) -> Self {
        Self {
            inner: Arc::new(AppInner {
                options,
                config: Mutex::new(Config::new()),
                setup: CallbackQueue::new(),
                state: LifecycleState::new(),
                events: LifecycleEvents::new(),
                barrier,
                environment,
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakApp {
        WeakApp {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.options.name
    }

    pub fn options(&self) -> &AppOptions {
        &self.inner.options
    }

    /// Whether both handles refer to the same app.
    pub fn ptr_eq(&self, other: &App) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Set a single config value.
    pub fn configure(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.inner.config.lock().set(key, value);
        self
    }

    /// Shallow-merge several config values; existing keys are overwritten.
    pub fn configure_many<I, K, V>(&self, entries: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.inner.config.lock().merge(entries);
        self
    }

    /// Queue a setup callback. Setup callbacks run in registration order.
    ///
    /// A callback queued after initialization never runs; a warning is
    /// logged and the callback is dropped.
    pub fn setup<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&mut Config) -> CallbackResult + Send + 'static,
    {
        if !self.inner.setup.push(Box::new(callback)) {
            warn!(
                app = %self.name(),
                "Setup callback registered after initialization; it will never run"
            );
        }
        self
    }

    /// Set the start callback, replacing any previous one.
    pub fn start<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&Config) -> CallbackResult + Send + 'static,
    {
        if self.inner.state.start.replace(Box::new(callback)).is_err() {
            warn!(
                app = %self.name(),
                "Start callback registered after the app started; it will never run"
            );
        }
        self
    }

    /// Set the end callback, replacing any previous one.
    pub fn end<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&App, &Config) -> CallbackResult + Send + 'static,
    {
        if self.inner.state.end.replace(Box::new(callback)).is_err() {
            warn!(
                app = %self.name(),
                "End callback registered after the app ended; it will never run"
            );
        }
        self
    }

    /// Subscribe to one of this app's lifecycle events.
    pub fn on<F>(&self, event: LifecycleEvent, handler: F) -> &Self
    where
        F: Fn(&Config) -> CallbackResult + Send + Sync + 'static,
    {
        self.inner.events.on(event, handler);
        self
    }

    // ------------------------------------------------------------------
    // Manual controls
    // ------------------------------------------------------------------

    /// Force the app past the "wait for environment ready" condition.
    ///
    /// The lock barrier is still honored: while it is held the app stays
    /// pending and initializes on the release broadcast.
    pub fn ignite(&self) -> LifecycleResult<&Self> {
        if self.inner.state.ignite() {
            debug!(app = %self.name(), "App ignited");
        }
        self.check()?;
        Ok(self)
    }

    /// Unload the app ahead of the environment unload signal.
    ///
    /// Does nothing if the app never initialized. With
    /// [`SmotherOptions::silent`] the app is discarded without running its
    /// end callback or emitting `end`, and a later environment unload will
    /// not run them either.
    pub fn smother(&self, options: SmotherOptions) -> LifecycleResult<&Self> {
        if !self.is_initialized() {
            debug!(app = %self.name(), "Smother ignored; app never started");
            return Ok(self);
        }

        if options.is_silent {
            if self.inner.state.claim_unload() {
                drop(self.inner.state.end.take());
                info!(app = %self.name(), "App discarded silently");
            }
            return Ok(self);
        }

        self.unload()?;
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Gating check: initialize if the barrier is clear and the app is
    /// ignited, or follows environment readiness and the environment is
    /// ready.
    pub(crate) fn check(&self) -> LifecycleResult<()> {
        if self.inner.barrier.is_locked() {
            debug!(
                app = %self.name(),
                locks = self.inner.barrier.count(),
                "Check deferred by lock barrier"
            );
            return Ok(());
        }

        let ready = self.inner.options.auto_start && self.inner.environment.is_ready();
        if self.is_ignited() || ready {
            self.initialize()
        } else {
            Ok(())
        }
    }

    fn initialize(&self) -> LifecycleResult<()> {
        if !self.inner.state.claim_initialize() {
            return Ok(());
        }

        info!(
            app = %self.name(),
            setup_callbacks = self.inner.setup.len(),
            "Initializing app"
        );

        let result = self.run_initialize();
        match &result {
            Ok(()) => info!(app = %self.name(), "App started"),
            Err(e) => warn!(app = %self.name(), error = %e, "App initialization aborted"),
        }
        result
    }

    // The config stays in its shared slot between steps so callbacks can
    // re-enter this app (configure, config, ignite, smother) and see the
    // current state. No step runs with the config lock held.
    fn run_initialize(&self) -> LifecycleResult<()> {
        self.emit(LifecycleEvent::SetupBefore)?;

        for (index, callback) in self.inner.setup.drain().into_iter().enumerate() {
            let before = self.config();
            let mut working = before.clone();
            let result = callback(&mut working);
            self.inner.config.lock().apply_changes(&before, working);
            result.map_err(|source| LifecycleError::Setup {
                app: self.name().to_string(),
                index,
                source,
            })?;
        }

        self.emit(LifecycleEvent::SetupAfter)?;
        self.emit(LifecycleEvent::StartBefore)?;

        if let Some(start) = self.inner.state.start.take() {
            start(&self.config()).map_err(|source| LifecycleError::Start {
                app: self.name().to_string(),
                source,
            })?;
        }

        self.emit(LifecycleEvent::StartAfter)
    }

    /// One-shot unload; a no-op unless the app initialized.
    pub(crate) fn unload(&self) -> LifecycleResult<()> {
        if !self.inner.state.claim_unload() {
            return Ok(());
        }

        info!(app = %self.name(), "Unloading app");

        if let Some(end) = self.inner.state.end.take() {
            end(self, &self.config()).map_err(|source| LifecycleError::End {
                app: self.name().to_string(),
                source,
            })?;
        }

        self.emit(LifecycleEvent::End)
    }

    /// Dispatch `event` with a snapshot of the current config.
    fn emit(&self, event: LifecycleEvent) -> LifecycleResult<()> {
        debug!(app = %self.name(), %event, "Emitting lifecycle event");
        self.inner
            .events
            .trigger(event, &self.config())
            .map_err(|source| LifecycleError::Handler {
                app: self.name().to_string(),
                event,
                source,
            })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Snapshot of the current config.
    pub fn config(&self) -> Config {
        self.inner.config.lock().clone()
    }

    /// Look up one config value.
    pub fn config_value(&self, key: &str) -> Option<Value> {
        self.inner.config.lock().get(key).cloned()
    }

    pub fn phase(&self) -> AppPhase {
        self.inner.state.phase()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.is_initialized()
    }

    pub fn is_ignited(&self) -> bool {
        self.inner.state.is_ignited()
    }

    pub fn is_unloaded(&self) -> bool {
        self.inner.state.is_unloaded()
    }

    /// Setup callbacks still waiting to run.
    pub fn pending_setup(&self) -> usize {
        self.inner.setup.len()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name())
            .field("auto_start", &self.inner.options.auto_start)
            .field("auto_end", &self.inner.options.auto_end)
            .field("state", &self.inner.state)
            .field("pending_setup", &self.pending_setup())
            .finish_non_exhaustive()
    }
}
