//! CLI error type.

use std::fmt;

use hearth::{LifecycleError, ManifestError};

/// Errors surfaced to the user by `hearth` commands.
#[derive(Debug)]
pub enum CliError {
    /// Manifest could not be loaded or parsed
    Manifest(ManifestError),
    /// A lifecycle callback or handler failed
    Lifecycle(LifecycleError),
    /// Invalid command-line input
    Config(String),
    /// Signal handler installation failed
    Signal(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Manifest(e) => write!(f, "Manifest error: {}", e),
            CliError::Lifecycle(e) => write!(f, "Lifecycle error: {}", e),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Signal(msg) => write!(f, "Signal handler error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Manifest(e) => Some(e),
            CliError::Lifecycle(e) => Some(e),
            CliError::Config(_) | CliError::Signal(_) => None,
        }
    }
}

impl From<ManifestError> for CliError {
    fn from(e: ManifestError) -> Self {
        CliError::Manifest(e)
    }
}

impl From<LifecycleError> for CliError {
    fn from(e: LifecycleError) -> Self {
        CliError::Lifecycle(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let err = CliError::Config("unknown app 'x'".to_string());
        assert_eq!(err.to_string(), "Configuration error: unknown app 'x'");

        let err: CliError = ManifestError::DuplicateApp("x".to_string()).into();
        assert!(err.to_string().starts_with("Manifest error: "));
        assert!(std::error::Error::source(&err).is_some());
    }
}
