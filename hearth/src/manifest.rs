//! INI manifests describing a set of apps.
//!
//! A manifest lets a host declare its apps (names, auto flags and initial
//! config) in a file instead of code. Callbacks are still attached in code
//! after registration.
//!
//! # Format
//!
//! ```ini
//! [app:search]
//! auto_start = true
//! auto_end = true
//! config.endpoint = /api/search
//! config.retries = 3
//!
//! [app:admin]
//! auto_start = false
//! ```
//!
//! - One `[app:<name>]` section per app, registered in file order
//! - `auto_start` / `auto_end` accept `true` or `false` (default `true`)
//! - `config.<key>` values are parsed as JSON when they are valid JSON
//!   (`3`, `true`, `[1, 2]`), otherwise kept as plain strings
//! - Anything else is rejected

use std::fs;
use std::path::Path;
use std::str::FromStr;

use ini::{Ini, ParseOption};
use serde_json::Value;
use tracing::info;

use crate::app::{App, AppOptions};
use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::{ManifestError, ManifestResult};

/// Prefix of app section names.
pub const APP_SECTION_PREFIX: &str = "app:";

/// Prefix of keys that land in the app's config.
pub const CONFIG_KEY_PREFIX: &str = "config.";

/// One app declared by a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSpec {
    pub options: AppOptions,
    pub config: Config,
}

/// Parsed manifest: apps in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    apps: Vec<AppSpec>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: impl AsRef<Path>) -> ManifestResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// Declared apps, in file order.
    pub fn apps(&self) -> &[AppSpec] {
        &self.apps
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Create every declared app on `coordinator` and apply its config.
    pub fn register(&self, coordinator: &Coordinator) -> Vec<App> {
        self.apps
            .iter()
            .map(|spec| {
                let app = coordinator.app(spec.options.clone());
                app.configure_many(spec.config.clone());
                app
            })
            .inspect(|app| info!(app = %app.name(), "Registered app from manifest"))
            .collect()
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(text: &str) -> ManifestResult<Self> {
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini =
            Ini::load_from_str_opt(text, options).map_err(|e| ManifestError::Parse(e.to_string()))?;

        let mut apps: Vec<AppSpec> = Vec::new();
        for (section, props) in ini.iter() {
            let Some(section) = section else {
                if props.iter().next().is_some() {
                    return Err(ManifestError::UnknownSection("(general)".to_string()));
                }
                continue;
            };

            let name = section
                .strip_prefix(APP_SECTION_PREFIX)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| ManifestError::UnknownSection(section.to_string()))?;

            if apps.iter().any(|spec| spec.options.name == name) {
                return Err(ManifestError::DuplicateApp(name.to_string()));
            }

            let mut spec = AppSpec {
                options: AppOptions::new(name),
                config: Config::new(),
            };
            for (key, value) in props.iter() {
                match key {
                    "auto_start" => spec.options.auto_start = parse_bool(name, key, value)?,
                    "auto_end" => spec.options.auto_end = parse_bool(name, key, value)?,
                    _ => match key.strip_prefix(CONFIG_KEY_PREFIX) {
                        Some(config_key) if !config_key.is_empty() => {
                            spec.config.set(config_key, parse_value(value));
                        }
                        _ => {
                            return Err(ManifestError::UnknownKey {
                                app: name.to_string(),
                                key: key.to_string(),
                            })
                        }
                    },
                }
            }
            apps.push(spec);
        }

        Ok(Self { apps })
    }
}

fn parse_bool(app: &str, key: &str, value: &str) -> ManifestResult<bool> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ManifestError::InvalidValue {
            app: app.to_string(),
            key: key.to_string(),
            value: other.to_string(),
        }),
    }
}

/// JSON when it parses, string otherwise.
fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = "\
[app:search]
auto_start = true
config.endpoint = /api/search
config.retries = 3
config.tags = [\"a\", \"b\"]

[app:admin]
auto_start = false
auto_end = false
";

    #[test]
    fn test_parse_sample() {
        let manifest: Manifest = SAMPLE.parse().unwrap();
        assert_eq!(manifest.len(), 2);

        let search = &manifest.apps()[0];
        assert_eq!(search.options, AppOptions::new("search"));
        assert_eq!(search.config.get_str("endpoint"), Some("/api/search"));
        assert_eq!(search.config.get_i64("retries"), Some(3));
        assert_eq!(search.config.get("tags"), Some(&json!(["a", "b"])));

        let admin = &manifest.apps()[1];
        assert_eq!(admin.options.name, "admin");
        assert!(!admin.options.auto_start);
        assert!(!admin.options.auto_end);
        assert!(admin.config.is_empty());
    }

    #[test]
    fn test_empty_manifest() {
        let manifest: Manifest = "".parse().unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = "[app:x]\ncolour = red\n".parse::<Manifest>().unwrap_err();
        assert!(matches!(err, ManifestError::UnknownKey { ref key, .. } if key == "colour"));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = "[service:x]\n".parse::<Manifest>().unwrap_err();
        assert!(matches!(err, ManifestError::UnknownSection(ref s) if s == "service:x"));

        let err = "stray = 1\n".parse::<Manifest>().unwrap_err();
        assert!(matches!(err, ManifestError::UnknownSection(_)));
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let err = "[app:x]\nauto_start = yes\n".parse::<Manifest>().unwrap_err();
        assert!(matches!(err, ManifestError::InvalidValue { ref value, .. } if value == "yes"));
    }

    #[test]
    fn test_duplicate_app_rejected() {
        let err = "[app:x]\n[app:y]\n[app:x]\n".parse::<Manifest>().unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateApp(ref n) if n == "x"));
    }

    #[test]
    fn test_register_applies_options_and_config() {
        let manifest: Manifest = SAMPLE.parse().unwrap();
        let coordinator = Coordinator::new();
        let apps = manifest.register(&coordinator);

        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].config_value("retries"), Some(json!(3)));
        assert!(!apps[1].options().auto_start);

        coordinator.notify_ready().unwrap();
        assert!(apps[0].is_initialized());
        assert!(!apps[1].is_initialized());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Manifest::load("/nonexistent/hearth/apps.ini").unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
    }
}
