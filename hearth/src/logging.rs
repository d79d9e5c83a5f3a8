//! Logging setup.
//!
//! The library only emits `tracing` events; binaries (and tests that want to
//! see them) install a subscriber through this module. `RUST_LOG` always
//! takes precedence over the defaults chosen here.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

/// Filter used for verbose output.
pub const VERBOSE_FILTER: &str = "info,hearth=debug";

/// Build the env filter for the requested verbosity.
pub fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        })
    })
}

/// Install a formatted subscriber writing to stderr.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(verbose: bool) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Install a subscriber that writes through the test harness capture.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(true))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_for_tests_is_idempotent() {
        init_for_tests();
        init_for_tests();
        // A global subscriber now exists, so a second install must fail.
        assert!(!init(false));
    }
}
