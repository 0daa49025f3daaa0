//! dbsync CLI
//!
//! Reference driver for the dbsync engine.
//!
//! # Commands
//!
//! - `replay` - Apply snapshot files in order and write one diff file each
//! - `version` - Show version information

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// dbsync snapshot replay tool.
#[derive(Parser)]
#[command(name = "dbsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply snapshot files to a table and write the diffs
    Replay {
        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Snapshot files, applied in the given order
        #[arg(short, long, value_delimiter = ',', required = true)]
        snapshots: Vec<PathBuf>,

        /// Directory receiving snapshot_<idx>.json files
        #[arg(short, long)]
        output: PathBuf,

        /// Print the persisted table after the last snapshot
        #[arg(short, long)]
        dump: bool,
    },

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
        Commands::Replay {
            config,
            snapshots,
            output,
            dump,
        } => {
            commands::replay::run(&config, &snapshots, &output, dump)?;
        }
        Commands::Version => {
            println!("dbsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("dbsync core v{}", dbsync_core::VERSION);
        }
    }

    Ok(())
}
