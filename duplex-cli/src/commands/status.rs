//! `duplex status` - heartbeat and run-log visibility.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use duplex_core::runlog::RunLog;
use duplex_core::types::{HeartbeatRecord, HeartbeatStatus};
use duplex_core::{heartbeat, SyncConfig};

/// Arguments for `duplex status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Config file (defaults to $DUPLEX_CONFIG, else ~/.duplex/config.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// How many run-log lines to show.
    #[arg(long, default_value_t = 10, value_name = "N")]
    pub tail: usize,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let (path, cfg) = super::load_config(self.config.as_deref())?;
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let beat = heartbeat::read(&cfg.heartbeat_path_at(&home))
            .context("heartbeat file is unreadable or malformed")?;
        let tail = RunLog::new(cfg.log_path_at(&home))
            .tail(self.tail)
            .context("failed to read the run log")?;

        if self.json {
            print_json(&path.display().to_string(), beat.as_ref(), &tail)?;
            return Ok(());
        }

        print_human(&cfg, beat.as_ref(), &tail);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct StatusJson<'a> {
    config: &'a str,
    heartbeat: Option<&'a HeartbeatRecord>,
    log_tail: &'a [String],
}

fn print_json(config: &str, beat: Option<&HeartbeatRecord>, tail: &[String]) -> Result<()> {
    let payload = StatusJson {
        config,
        heartbeat: beat,
        log_tail: tail,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Human output
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct HeartbeatRow {
    #[tabled(rename = "host")]
    host: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "when")]
    when: String,
    #[tabled(rename = "last result")]
    last_result: String,
    #[tabled(rename = "message")]
    message: String,
}

fn print_human(cfg: &SyncConfig, beat: Option<&HeartbeatRecord>, tail: &[String]) {
    println!(
        "duplex v{} | {} <-> {} | mode {}",
        env!("CARGO_PKG_VERSION"),
        cfg.source_host,
        cfg.dest_host,
        cfg.features.mode,
    );

    match beat {
        Some(record) => {
            let row = HeartbeatRow {
                host: record.host.clone(),
                status: status_label(record.status),
                when: format!("{} ago", format_age(record.timestamp)),
                last_result: match record.last_result {
                    Some(status) => status.to_string(),
                    None => "-".to_string(),
                },
                message: record.message.clone(),
            };
            let mut table = Table::new(vec![row]);
            table.with(Style::rounded());
            println!("{table}");
        }
        None => println!("no heartbeat recorded yet"),
    }

    if tail.is_empty() {
        println!("run log is empty");
        return;
    }
    println!("recent run-log lines:");
    for line in tail {
        println!("  {line}");
    }
}

fn status_label(status: HeartbeatStatus) -> String {
    match status {
        HeartbeatStatus::Success => "SUCCESS".green().bold().to_string(),
        HeartbeatStatus::Failed => "FAILED".red().bold().to_string(),
        HeartbeatStatus::Interrupted => "INTERRUPTED".yellow().bold().to_string(),
    }
}

/// Compact age: `45s`, `12m`, `3h`, `2d`.
fn format_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    #[test]
    fn age_buckets() {
        let now = Utc::now();
        assert_eq!(format_age(now), "0s");
        assert_eq!(format_age(now - Duration::seconds(65)), "1m");
        assert_eq!(format_age(now - Duration::hours(3)), "3h");
        assert_eq!(format_age(now - Duration::days(2)), "2d");
        // A clock skewed into the future never goes negative.
        assert_eq!(format_age(now + Duration::seconds(30)), "0s");
    }
}
