//! `duplex check` - the preflight surface without a run.
//!
//! No lock, no transfers: config validation, role resolution, and mount
//! verification only. Exit 0 when everything passes.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use duplex_core::config::local_hostname;
use duplex_core::SyncConfig;
use duplex_preflight::{verify_mount, MountTable};

/// Arguments for `duplex check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Config file (defaults to $DUPLEX_CONFIG, else ~/.duplex/config.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let (path, cfg) = super::load_config(self.config.as_deref())?;
        println!("config: {}", path.display());

        let mut faults = 0usize;

        match cfg.validate() {
            Ok(()) => println!("{} config valid", ok_mark()),
            Err(error) => {
                faults += 1;
                println!("{} {error}", fault_mark());
            }
        }

        match local_hostname().and_then(|host| cfg.resolve_role(&host).map(|role| (host, role))) {
            Ok((host, role)) => println!("{} role: {role} (this host is {host})", ok_mark()),
            Err(error) => {
                faults += 1;
                println!("{} {error}", fault_mark());
            }
        }

        faults += check_mount(&cfg);

        if faults > 0 {
            println!("{faults} problem(s) found");
            std::process::exit(1);
        }
        Ok(())
    }
}

fn check_mount(cfg: &SyncConfig) -> usize {
    if !cfg.features.mount_check {
        println!("- mount check disabled");
        return 0;
    }
    // A missing spec was already counted by validate().
    let Some(spec) = cfg.mount.as_ref() else {
        return 0;
    };

    match MountTable::load_system() {
        Ok(table) => {
            let report = verify_mount(&table, spec);
            let lines = report.fault_lines();
            if lines.is_empty() {
                println!("{} mount {} looks healthy", ok_mark(), spec.point.display());
                0
            } else {
                for line in &lines {
                    println!("{} {line}", fault_mark());
                }
                lines.len()
            }
        }
        Err(error) => {
            println!("{} mount table unreadable: {error}", fault_mark());
            1
        }
    }
}

fn ok_mark() -> String {
    "✓".green().to_string()
}

fn fault_mark() -> String {
    "✗".red().to_string()
}
