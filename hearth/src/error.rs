//! Error types for app lifecycles and manifests.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::event::LifecycleEvent;

/// Error type returned by user callbacks and event handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by setup, start and end callbacks.
pub type CallbackResult = Result<(), BoxError>;

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Failures surfaced while an app transitions.
///
/// Transitions are not rolled back. When one of these is returned the app
/// keeps whatever one-shot flag the transition already consumed, and the
/// remaining steps of that transition were skipped.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A setup callback failed; later setup callbacks and the start callback did not run.
    #[error("app '{app}': setup callback #{index} failed: {source}")]
    Setup {
        app: String,
        index: usize,
        #[source]
        source: BoxError,
    },

    /// The start callback failed.
    #[error("app '{app}': start callback failed: {source}")]
    Start {
        app: String,
        #[source]
        source: BoxError,
    },

    /// The end callback failed; the `end` event was not emitted.
    #[error("app '{app}': end callback failed: {source}")]
    End {
        app: String,
        #[source]
        source: BoxError,
    },

    /// A lifecycle event handler failed.
    #[error("app '{app}': handler for '{event}' failed: {source}")]
    Handler {
        app: String,
        event: LifecycleEvent,
        #[source]
        source: BoxError,
    },

    /// Several apps failed during one broadcast.
    #[error("{} apps failed during broadcast", .0.len())]
    Multiple(Vec<LifecycleError>),
}

impl LifecycleError {
    /// Name of the failing app, or `None` for aggregated failures.
    pub fn app(&self) -> Option<&str> {
        match self {
            Self::Setup { app, .. }
            | Self::Start { app, .. }
            | Self::End { app, .. }
            | Self::Handler { app, .. } => Some(app),
            Self::Multiple(_) => None,
        }
    }

    /// Collapse a list of failures into a single result.
    pub(crate) fn collect(mut errors: Vec<LifecycleError>) -> LifecycleResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }
}

/// Errors raised while reading an app manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The manifest is not valid INI.
    #[error("failed to parse manifest: {0}")]
    Parse(String),

    /// A section that is not `[app:<name>]`.
    #[error("unknown section '{0}' (expected [app:<name>])")]
    UnknownSection(String),

    /// A key the app section does not understand.
    #[error("app '{app}': unknown key '{key}'")]
    UnknownKey { app: String, key: String },

    /// A value that could not be interpreted.
    #[error("app '{app}': invalid value '{value}' for '{key}'")]
    InvalidValue {
        app: String,
        key: String,
        value: String,
    },

    /// The same app name was declared twice.
    #[error("app '{0}' declared more than once")]
    DuplicateApp(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(msg: &str) -> BoxError {
        msg.to_string().into()
    }

    #[test]
    fn test_setup_error_display() {
        let err = LifecycleError::Setup {
            app: "search".to_string(),
            index: 2,
            source: boxed("boom"),
        };
        let msg = err.to_string();
        assert!(msg.contains("search"));
        assert!(msg.contains("#2"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_handler_error_uses_event_name() {
        let err = LifecycleError::Handler {
            app: "nav".to_string(),
            event: LifecycleEvent::StartBefore,
            source: boxed("nope"),
        };
        assert!(err.to_string().contains("start:before"));
    }

    #[test]
    fn test_collect_single_and_many() {
        assert!(LifecycleError::collect(Vec::new()).is_ok());

        let one = LifecycleError::collect(vec![LifecycleError::Start {
            app: "a".to_string(),
            source: boxed("x"),
        }])
        .unwrap_err();
        assert_eq!(one.app(), Some("a"));

        let many = LifecycleError::collect(vec![
            LifecycleError::Start {
                app: "a".to_string(),
                source: boxed("x"),
            },
            LifecycleError::End {
                app: "b".to_string(),
                source: boxed("y"),
            },
        ])
        .unwrap_err();
        assert!(matches!(many, LifecycleError::Multiple(ref v) if v.len() == 2));
        assert_eq!(many.app(), None);
        assert!(many.to_string().contains("2 apps failed"));
    }

    #[test]
    fn test_manifest_error_display() {
        let err = ManifestError::UnknownKey {
            app: "search".to_string(),
            key: "colour".to_string(),
        };
        assert!(err.to_string().contains("colour"));
    }
}
