//! Hearth - application lifecycle coordination
//!
//! This library lets independent apps register setup, start and end
//! callbacks and activates them in step with two host-level signals,
//! "environment ready" and "environment unload". Activation can also be
//! forced manually (`ignite`, `smother`) and suspended globally with a lock
//! barrier.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Coordinator                             │
//! │                                                                   │
//! │  LockBarrier ─────────┐                                           │
//! │  EnvironmentBridge ───┼──► App ──► CallbackQueue (setup, FIFO)    │
//! │  AppRegistry ─────────┘        ├─► LifecycleState (one-shot flags) │
//! │                                └─► LifecycleEvents (Observable)   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An app initializes at most once, when its gating check passes:
//! the barrier is clear AND (the app was ignited OR it auto-starts and the
//! environment is ready). It unloads at most once, and only if it initialized.
//!
//! # Example
//!
//! ```
//! use hearth::{AppOptions, Coordinator, LifecycleEvent};
//!
//! let coordinator = Coordinator::new();
//! let app = coordinator.app(AppOptions::new("search"));
//! app.setup(|config| {
//!         config.set("index", "ready");
//!         Ok(())
//!     })
//!     .on(LifecycleEvent::StartAfter, |config| {
//!         println!("search started with {:?}", config.get("index"));
//!         Ok(())
//!     });
//!
//! coordinator.notify_ready().unwrap();
//! assert!(app.is_initialized());
//!
//! coordinator.notify_unload().unwrap();
//! assert!(app.is_unloaded());
//! ```

pub mod app;
pub mod config;
pub mod coordinator;
pub mod environment;
pub mod error;
pub mod event;
pub mod logging;
pub mod manifest;

pub use app::{App, AppOptions, AppPhase, SmotherOptions};
pub use config::Config;
pub use coordinator::{AppRegistry, BarrierGuard, Coordinator, LockBarrier};
pub use environment::{EnvironmentBridge, EnvironmentEvent};
pub use error::{
    BoxError, CallbackResult, LifecycleError, LifecycleResult, ManifestError, ManifestResult,
};
pub use event::{LifecycleEvent, Observable};
pub use manifest::{AppSpec, Manifest};
