//! Segstore CLI
//!
//! Command-line driver for segmented store maintenance.
//!
//! # Commands
//!
//! - `shuffle` - Move data sets away from full or withdrawing shares
//! - `balance` - Report share occupancy
//! - `group` - Select the next archive candidate group
//! - `orphans` - Reconcile archive directory against metadata

mod commands;
mod error;
mod inventory;
mod run_config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::run_config::RunConfig;

/// Segmented store maintenance tools.
#[derive(Parser)]
#[command(name = "segstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON run configuration
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move data sets away from full or withdrawing shares
    Shuffle,

    /// Report share occupancy and the largest data sets
    Balance,

    /// Select the next archive candidate group
    Group,

    /// Reconcile the archive directory against the metadata
    Orphans,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Shuffle => {
            let config = load_config(cli.config)?;
            commands::shuffle::run(&config)?;
        }
        Commands::Balance => {
            let config = load_config(cli.config)?;
            commands::balance::run(&config)?;
        }
        Commands::Group => {
            let config = load_config(cli.config)?;
            commands::group::run(&config)?;
        }
        Commands::Orphans => {
            let config = load_config(cli.config)?;
            commands::orphans::run(&config)?;
        }
        Commands::Version => {
            println!("segstore v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<RunConfig, Box<dyn std::error::Error>> {
    let path = path.ok_or("Config file required, pass --config <file.json>")?;
    Ok(RunConfig::load(&path)?)
}
