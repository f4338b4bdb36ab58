//! chip-scan - find, inspect and tag chiptune modules
//!
//! # Commands
//!
//! - `chip-scan scan` - Locate modules inside files or directory trees
//! - `chip-scan info` - Decode one module and print its structure
//! - `chip-scan tag` - Embed a title into a Sound Tracker Pro compiled module
//!
//! # Usage
//!
//! ```bash
//! # Scan a memory dump
//! chip-scan scan dump.bin
//!
//! # Scan a collection, descending into subdirectories
//! chip-scan scan --recursive --max-size 1048576 music/
//!
//! # Show module structure with decoder progress
//! RUST_LOG=debug chip-scan info song.pt2
//!
//! # Write a titled copy
//! chip-scan tag song.stp --title "Best tune" -o titled.stp
//! ```

mod info;
mod scan;
mod tag;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// chip-scan - find, inspect and tag chiptune modules
#[derive(Parser)]
#[command(name = "chip-scan")]
#[command(about = "Find, inspect and tag chiptune modules")]
#[command(version)]
struct Cli {
    /// Log decoder progress (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate modules inside files or directories
    Scan(scan::ScanArgs),

    /// Decode one module and print its structure
    Info(info::InfoArgs),

    /// Embed a title into a Sound Tracker Pro compiled module
    Tag(tag::TagArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan(args) => scan::execute(args),
        Commands::Info(args) => info::execute(args),
        Commands::Tag(args) => tag::execute(args),
    }
}
