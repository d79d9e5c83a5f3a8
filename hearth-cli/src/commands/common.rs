//! Helpers shared by commands.

use hearth::{App, Coordinator};

use crate::error::CliError;

/// Look up apps by name, failing on the first unknown one.
pub fn resolve_apps(coordinator: &Coordinator, names: &[String]) -> Result<Vec<App>, CliError> {
    names
        .iter()
        .map(|name| {
            coordinator
                .find(name)
                .ok_or_else(|| CliError::Config(format!("No app named '{}' in manifest", name)))
        })
        .collect()
}

/// Print one line per app with its lifecycle status.
pub fn print_phases(heading: &str, apps: &[App]) {
    println!("{}", heading);
    let width = apps.iter().map(|app| app.name().len()).max().unwrap_or(0);
    for app in apps {
        println!("  {:<width$}  {}", app.name(), app.phase(), width = width);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth::AppOptions;

    #[test]
    fn test_resolve_apps() {
        let coordinator = Coordinator::new();
        coordinator.app(AppOptions::new("a"));
        coordinator.app(AppOptions::new("b"));

        let apps = resolve_apps(&coordinator, &["b".to_string()]).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name(), "b");

        let err = resolve_apps(&coordinator, &["a".to_string(), "zz".to_string()]).unwrap_err();
        assert!(matches!(err, CliError::Config(ref msg) if msg.contains("zz")));
    }
}
