//! Append-only registry of every app a coordinator built.

use parking_lot::RwLock;
use tracing::debug;

use crate::app::App;
use crate::error::{LifecycleError, LifecycleResult};

/// Ordered list of apps. Apps are never removed.
#[derive(Debug, Default)]
pub struct AppRegistry {
    apps: RwLock<Vec<App>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, app: App) {
        self.apps.write().push(app);
    }

    /// Snapshot of every app, in registration order.
    pub fn apps(&self) -> Vec<App> {
        self.apps.read().clone()
    }

    /// First app registered under `name`.
    pub fn find(&self, name: &str) -> Option<App> {
        self.apps.read().iter().find(|app| app.name() == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.apps.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.read().is_empty()
    }

    /// Re-run the gating check of every app.
    ///
    /// Every app is visited even if an earlier one fails; failures are
    /// returned together once the sweep is done.
    pub(crate) fn broadcast_check(&self) -> LifecycleResult<()> {
        let apps = self.apps();
        debug!(apps = apps.len(), "Broadcasting gating check");

        let errors: Vec<LifecycleError> = apps
            .iter()
            .filter_map(|app| app.check().err())
            .collect();
        LifecycleError::collect(errors)
    }
}
