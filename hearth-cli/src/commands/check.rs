//! Check command - validate a manifest.

use std::path::Path;

use hearth::Manifest;

use crate::error::CliError;

/// Run the check command.
pub fn run(path: &Path) -> Result<(), CliError> {
    let manifest = Manifest::load(path)?;

    println!("Manifest: {}", path.display());
    println!("Apps:     {}", manifest.len());
    println!();
    for spec in manifest.apps() {
        println!(
            "  {} (auto_start={}, auto_end={}, {} config keys)",
            spec.options.name,
            spec.options.auto_start,
            spec.options.auto_end,
            spec.config.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_check_valid_manifest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[app:one]\nconfig.port = 8080").unwrap();
        assert!(run(file.path()).is_ok());
    }

    #[test]
    fn test_check_rejects_bad_manifest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[app:one]\nauto_start = maybe").unwrap();
        assert!(matches!(run(file.path()), Err(CliError::Manifest(_))));
    }
}
