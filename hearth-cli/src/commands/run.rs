//! Run command - play a manifest's apps through a full lifecycle.

use std::path::PathBuf;
use std::sync::mpsc;

use hearth::{App, BarrierGuard, Coordinator, Manifest, SmotherOptions};
use tracing::info;

use super::common::{print_phases, resolve_apps};
use crate::error::CliError;

/// Arguments for the run command.
pub struct RunArgs {
    pub manifest: PathBuf,
    pub locked: usize,
    pub ignite: Vec<String>,
    pub smother: Vec<String>,
    pub silent: bool,
    pub wait: bool,
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let manifest = Manifest::load(&args.manifest)?;
    let coordinator = Coordinator::new();
    let apps = manifest.register(&coordinator);
    for app in &apps {
        attach_reporting(app);
    }

    // Resolve names up front so a typo fails before anything starts.
    let to_ignite = resolve_apps(&coordinator, &args.ignite)?;
    let to_smother = resolve_apps(&coordinator, &args.smother)?;

    println!("Hearth v{}", env!("CARGO_PKG_VERSION"));
    println!("================================");
    println!();
    println!("Manifest: {}", args.manifest.display());
    println!("Apps:     {}", apps.len());
    println!("Locks:    {}", args.locked);
    println!();

    let guards: Vec<BarrierGuard> = (0..args.locked).map(|_| coordinator.hold()).collect();

    coordinator.notify_ready()?;
    for app in &to_ignite {
        app.ignite()?;
    }
    print_phases(
        &format!("After ready ({} locks held):", coordinator.lock_count()),
        &apps,
    );

    if !guards.is_empty() {
        for guard in guards {
            guard.release()?;
        }
        print_phases("After unlock:", &apps);
    }

    let options = SmotherOptions {
        is_silent: args.silent,
    };
    for app in &to_smother {
        app.smother(options)?;
    }
    if !to_smother.is_empty() {
        print_phases("After smother:", &apps);
    }

    if args.wait {
        wait_for_interrupt()?;
    }

    coordinator.notify_unload()?;
    print_phases("After unload:", &apps);
    Ok(())
}

/// Log each app's setup, start and end as they happen.
fn attach_reporting(app: &App) {
    app.setup(|config| {
        info!(config_keys = config.len(), "Setup");
        Ok(())
    })
    .start(|config| {
        info!(config = %config.to_json(), "Started");
        Ok(())
    })
    .end(|app, _| {
        info!(app = %app.name(), "Ended");
        Ok(())
    });
}

fn wait_for_interrupt() -> Result<(), CliError> {
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, unloading...");
        let _ = tx.send(());
    })
    .map_err(|e| CliError::Signal(format!("Failed to set signal handler: {}", e)))?;

    println!("Press Ctrl+C to unload and exit");
    println!();
    rx.recv()
        .map_err(|e| CliError::Signal(format!("Signal channel closed: {}", e)))
}
