//! Hearth CLI - drive app lifecycles from a manifest
//!
//! `hearth run` plays a full lifecycle (ready, ignite, unlock, unload) over
//! the apps declared in an INI manifest and prints their phases.
//! `hearth check` validates a manifest without running anything.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "hearth")]
#[command(version, about = "Application lifecycle coordinator", long_about = None)]
struct Cli {
    /// Enable debug logging for hearth
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the apps declared in a manifest through their lifecycle
    Run {
        /// Path to the INI manifest
        manifest: PathBuf,

        /// Hold this many barrier locks across the ready signal
        #[arg(long, default_value_t = 0)]
        locked: usize,

        /// Ignite an app by name (repeatable)
        #[arg(long, value_name = "NAME")]
        ignite: Vec<String>,

        /// Smother an app by name before unload (repeatable)
        #[arg(long, value_name = "NAME")]
        smother: Vec<String>,

        /// Smother without running end callbacks
        #[arg(long)]
        silent: bool,

        /// Wait for Ctrl+C before firing the unload signal
        #[arg(long)]
        wait: bool,
    },

    /// Validate a manifest and list its apps
    Check {
        /// Path to the INI manifest
        manifest: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    hearth::logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            manifest,
            locked,
            ignite,
            smother,
            silent,
            wait,
        } => commands::run::run(RunArgs {
            manifest,
            locked,
            ignite,
            smother,
            silent,
            wait,
        }),
        Commands::Check { manifest } => commands::check::run(&manifest),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
