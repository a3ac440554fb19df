//! `duplex run` - one orchestrated sync run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use duplex_core::types::RunStatus;
use duplex_runtime::{Orchestrator, RunReport, RuntimeError};

/// Arguments for `duplex run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Config file (defaults to $DUPLEX_CONFIG, else ~/.duplex/config.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Pass the transfer tool's no-op flag; skip heartbeat and alert delivery.
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let (_, cfg) = super::load_config(self.config.as_deref())?;

        duplex_runtime::install_signal_handlers()
            .context("failed to install signal handlers")?;

        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let report = match Orchestrator::new_at(cfg, &home, self.dry_run).run() {
            Ok(report) => report,
            Err(RuntimeError::LockBusy { path }) => {
                eprintln!("another run already holds the lock at {}", path.display());
                std::process::exit(1);
            }
            Err(error) => return Err(error).context("run failed before it started"),
        };

        print_report(&report, self.dry_run);
        std::process::exit(report.status.exit_code());
    }
}

fn print_report(report: &RunReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };

    for result in &report.results {
        let outcome = if result.success() {
            "ok".green().to_string()
        } else {
            format!("exit {}", result.exit_code).red().to_string()
        };
        println!(
            "{prefix}{}: {} -> {} ({outcome})",
            result.direction, result.source, result.dest
        );
    }
    if let Some(counts) = report.counts {
        println!(
            "{prefix}file counts: source {} dest {} (difference {})",
            counts.source,
            counts.dest,
            counts.diff()
        );
    }

    let status = match report.status {
        RunStatus::Succeeded => "succeeded".green().bold().to_string(),
        RunStatus::Failed => "failed".red().bold().to_string(),
        RunStatus::Aborted => "aborted".red().bold().to_string(),
        RunStatus::Interrupted => "interrupted".yellow().bold().to_string(),
    };
    println!("{prefix}run {status} in {} ms", report.duration_ms);
}
