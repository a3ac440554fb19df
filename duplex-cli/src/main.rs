//! duplex - scheduled sync orchestrator CLI.
//!
//! # Usage
//!
//! ```text
//! duplex run [--config PATH] [--dry-run]
//! duplex check [--config PATH]
//! duplex status [--config PATH] [--json] [--tail N]
//! duplex init [--config PATH] [--force]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, init::InitArgs, run::RunArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "duplex",
    version,
    about = "Keep a directory tree synchronized between two hosts on a schedule",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one orchestrated sync run (the cron entry point).
    Run(RunArgs),

    /// Validate the config, resolve the role, and verify the mount.
    Check(CheckArgs),

    /// Show the last heartbeat and the recent run-log lines.
    Status(StatusArgs),

    /// Write a commented starter config.
    Init(InitArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    duplex_runtime::init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Check(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Init(args) => args.run(),
    }
}
