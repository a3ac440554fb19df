//! The orchestrated run: one linear pass over every phase.
//!
//! Order is fixed: lock, startup checks (config + role), mount
//! verification, recent-error scan, transfers (push before pull), counts,
//! alerting, heartbeat, lock release by drop. Each phase appends to the
//! run log; the log is the durable record of what happened, diagnostics on
//! stderr are only for whoever is watching the terminal.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use tracing::warn;

use duplex_alert::{
    AlertKind, AlertRenderer, CountDriftCtx, Mailer, MountFailureCtx, RecentErrorsCtx,
    TransferResultCtx,
};
use duplex_core::config::local_hostname;
use duplex_core::runlog::RunLog;
use duplex_core::types::{
    CountComparison, HeartbeatRecord, HostName, Role, RunStatus, SyncResult,
};
use duplex_core::{heartbeat, SyncConfig};
use duplex_preflight::{scan_recent_errors, verify_mount, MountTable};
use duplex_transfer::{count_local, count_remote, run_direction, RunEnd};

use crate::append_line;
use crate::error::RuntimeError;
use crate::lock::RunLock;
use crate::signal;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What one run did, for callers that print a summary.
#[derive(Debug)]
pub struct RunReport {
    pub status: RunStatus,
    /// `None` when the run aborted before role resolution.
    pub role: Option<Role>,
    /// One entry per executed direction, in execution order.
    pub results: Vec<SyncResult>,
    /// File counts of both trees; `None` when no comparison ran.
    pub counts: Option<CountComparison>,
    pub duration_ms: u128,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Executes the full run for one sync pair.
pub struct Orchestrator {
    cfg: SyncConfig,
    home: PathBuf,
    log: RunLog,
    dry_run: bool,
}

impl Orchestrator {
    /// `home` roots every runtime file the config does not override.
    pub fn new_at(cfg: SyncConfig, home: &Path, dry_run: bool) -> Self {
        let log = RunLog::new(cfg.log_path_at(home));
        Self {
            cfg,
            home: home.to_path_buf(),
            log,
            dry_run,
        }
    }

    /// Run every phase once.
    ///
    /// A run that started always comes back as `Ok` with its outcome in
    /// [`RunReport::status`]; `Err` covers only a busy lock and setup
    /// failures that precede the run state machine.
    pub fn run(&self) -> Result<RunReport, RuntimeError> {
        let started = Instant::now();
        let renderer = AlertRenderer::new()?;

        let mut lock = RunLock::acquire(&self.cfg.lock_path_at(&self.home), self.log.clone())?;

        self.log_line(&format!(
            "run starting (mode {}{})",
            self.cfg.features.mode,
            if self.dry_run { ", dry run" } else { "" }
        ));

        // Startup checks: config semantics, then which peer this host is.
        let (host, role) = match self.startup_checks() {
            Ok(pair) => pair,
            Err(reason) => {
                let host = local_hostname().unwrap_or_else(|_| HostName::from("unknown"));
                self.log_line(&format!("aborting: {reason}"));
                self.deliver(
                    &renderer,
                    &host,
                    &AlertKind::RunAborted {
                        reason: reason.clone(),
                    },
                );
                self.write_heartbeat(&host, RunStatus::Aborted, &reason);
                self.log_line("run finished: aborted");
                return Ok(self.report(RunStatus::Aborted, None, Vec::new(), None, started));
            }
        };
        self.log_line(&format!("resolved role: {role} (this host is {host})"));

        // Mount verification. Any collected fault stops the run here.
        if let Some((point, faults)) = self.mount_faults() {
            for fault in &faults {
                self.log_line(&format!("mount check: {fault}"));
            }
            self.deliver(
                &renderer,
                &host,
                &AlertKind::MountFailure(MountFailureCtx { point, faults }),
            );
            self.write_heartbeat(&host, RunStatus::Aborted, "mount verification failed");
            self.log_line("run finished: aborted");
            return Ok(self.report(RunStatus::Aborted, Some(role), Vec::new(), None, started));
        }

        // Advisory scan of the log we are about to append to; it sees the
        // previous runs' lines, not this one's.
        self.scan_for_recent_errors(&renderer, &host);

        let (results, interrupted) = self.run_transfers(role);

        if signal::is_abort_requested() {
            self.log_line("second interrupt; exiting without cleanup");
            lock.note_release_reason("aborted by repeated signal");
            return Ok(self.report(
                RunStatus::Interrupted,
                Some(role),
                results,
                None,
                started,
            ));
        }

        // Count comparison is monitoring, not a correctness gate; skip it
        // once a shutdown was requested.
        let counts = if interrupted {
            None
        } else {
            Some(self.compare_counts(role))
        };
        if let Some(counts) = counts {
            self.log_line(&format!(
                "file counts: source {} dest {} (difference {})",
                counts.source,
                counts.dest,
                counts.diff()
            ));
            if counts.exceeds(self.cfg.count_diff_threshold) {
                self.deliver(
                    &renderer,
                    &host,
                    &AlertKind::CountDrift(CountDriftCtx::new(
                        counts,
                        self.cfg.count_diff_threshold,
                    )),
                );
            }
        }

        let failed = results.iter().any(|r| !r.success());
        let status = if interrupted {
            RunStatus::Interrupted
        } else if failed {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };

        if status == RunStatus::Interrupted {
            let reason = signal::shutdown_reason()
                .map(|r| r.description().to_owned())
                .unwrap_or_else(|| "interrupt requested".to_owned());
            self.log_line(&format!("run interrupted ({reason})"));
            lock.note_release_reason(&reason);
            self.write_heartbeat(&host, status, &reason);
        } else if failed {
            self.deliver(
                &renderer,
                &host,
                &AlertKind::TransferFailure(
                    results.iter().map(TransferResultCtx::from).collect(),
                ),
            );
            self.write_heartbeat(&host, status, &failure_message(&results));
        } else {
            if self.cfg.features.notify_on_success {
                self.deliver(
                    &renderer,
                    &host,
                    &AlertKind::SyncCompleted {
                        detail: success_detail(&results, counts),
                    },
                );
            }
            self.write_heartbeat(&host, status, &success_message(&results));
        }

        self.log_line(&format!("run finished: {status}"));
        Ok(self.report(status, Some(role), results, counts, started))
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    fn startup_checks(&self) -> Result<(HostName, Role), String> {
        self.cfg.validate().map_err(|e| e.to_string())?;
        let host = local_hostname().map_err(|e| e.to_string())?;
        let role = self.cfg.resolve_role(&host).map_err(|e| e.to_string())?;
        Ok((host, role))
    }

    /// Collected mount faults, or `None` when the check passed or is off.
    fn mount_faults(&self) -> Option<(String, Vec<String>)> {
        if !self.cfg.features.mount_check {
            return None;
        }
        // validate() already required a mount spec when the check is on.
        let spec = self.cfg.mount.as_ref()?;

        let faults = match MountTable::load_system() {
            Ok(table) => verify_mount(&table, spec).fault_lines(),
            Err(error) => vec![format!("mount table unreadable: {error}")],
        };

        if faults.is_empty() {
            self.log_line(&format!("mount check passed for {}", spec.point.display()));
            None
        } else {
            Some((spec.point.display().to_string(), faults))
        }
    }

    fn scan_for_recent_errors(&self, renderer: &AlertRenderer, host: &HostName) {
        let scan = match scan_recent_errors(&self.log) {
            Ok(scan) => scan,
            Err(error) => {
                warn!("error scan failed: {error}");
                return;
            }
        };
        if !scan.meets_threshold(self.cfg.max_recent_errors) {
            return;
        }
        self.log_line(&format!(
            "error scan: {} fault lines in the last {} log lines (threshold {})",
            scan.matched, scan.scanned, self.cfg.max_recent_errors
        ));
        self.deliver(
            renderer,
            host,
            &AlertKind::RecentErrors(RecentErrorsCtx {
                matched: scan.matched,
                window: scan.scanned,
                lines: scan.recent.clone(),
            }),
        );
    }

    /// Execute the configured directions in order. Push runs first, and a
    /// push failure never skips the pull; only an interrupt cuts the loop.
    fn run_transfers(&self, role: Role) -> (Vec<SyncResult>, bool) {
        let mut results = Vec::new();
        let mut interrupted = false;

        for &direction in self.cfg.features.mode.directions() {
            if signal::is_shutdown_requested() {
                interrupted = true;
                break;
            }

            self.log_line(&format!("{direction} transfer starting"));
            let mut sink = |line: &str| self.log_line(&format!("[{direction}] {line}"));
            let run = run_direction(
                &self.cfg,
                role,
                direction,
                self.dry_run,
                &mut sink,
                &signal::is_shutdown_requested,
            );

            match run.end {
                RunEnd::Completed => {
                    if run.result.success() {
                        self.log_line(&format!("{direction} completed (exit 0)"));
                    } else {
                        self.log_line(&format!(
                            "{direction} failed (exit {})",
                            run.result.exit_code
                        ));
                    }
                }
                RunEnd::TimedOut => {
                    self.log_line(&format!(
                        "{direction} timed out after {}s (exit {})",
                        self.cfg.timeouts.transfer_secs, run.result.exit_code
                    ));
                }
                RunEnd::Interrupted => {
                    self.log_line(&format!(
                        "{direction} interrupted (exit {})",
                        run.result.exit_code
                    ));
                    interrupted = true;
                }
            }
            results.push(run.result);

            if interrupted {
                break;
            }
        }

        (results, interrupted)
    }

    /// Count both trees: the local one by walking, the remote one through
    /// the remote shell. A failed remote count already degraded to 0.
    fn compare_counts(&self, role: Role) -> CountComparison {
        let remote = self.cfg.remote_host(role);
        let shell = &self.cfg.transfer.remote_shell;
        let timeout = self.cfg.timeouts.remote();

        let (source, dest) = match role {
            Role::Source => (
                count_local(&self.cfg.source_path),
                count_remote(
                    shell,
                    remote,
                    &self.cfg.dest_path,
                    timeout,
                    &signal::is_shutdown_requested,
                ),
            ),
            Role::Destination => (
                count_remote(
                    shell,
                    remote,
                    &self.cfg.source_path,
                    timeout,
                    &signal::is_shutdown_requested,
                ),
                count_local(&self.cfg.dest_path),
            ),
        };
        CountComparison { source, dest }
    }

    // -----------------------------------------------------------------------
    // Side channels: alerts, heartbeat, log
    // -----------------------------------------------------------------------

    /// Render and send one alert. Every attempted alert leaves a marker in
    /// the run log; none of the failure paths escalate.
    fn deliver(&self, renderer: &AlertRenderer, host: &HostName, kind: &AlertKind) {
        let subject = kind.subject(&host.0);

        if !self.cfg.features.email {
            self.log_line(&format!("alert suppressed (email disabled): {subject}"));
            return;
        }
        if self.dry_run {
            self.log_line(&format!("alert suppressed (dry run): {subject}"));
            return;
        }
        let Some(recipient) = self.cfg.alert_recipient.as_deref() else {
            self.log_line(&format!("alert dropped (no recipient configured): {subject}"));
            return;
        };

        self.log_line(&format!("alert ({}): {subject}", kind.severity()));
        let event = match renderer.build(host, recipient, kind) {
            Ok(event) => event,
            Err(error) => {
                self.log_line(&format!("alert rendering failed: {error}"));
                warn!("alert rendering failed: {error}");
                return;
            }
        };

        let mailer = Mailer::new(self.cfg.mailer.clone(), host);
        if let Err(error) = mailer.send(&event) {
            self.log_line(&format!("alert delivery failed: {error}"));
            warn!("alert delivery failed: {error}");
        }
    }

    /// Overwrite the heartbeat record, carrying the previous status along.
    /// Failures are logged and never change the run outcome.
    fn write_heartbeat(&self, host: &HostName, status: RunStatus, message: &str) {
        if self.dry_run || !self.cfg.features.heartbeat {
            return;
        }

        let path = self.cfg.heartbeat_path_at(&self.home);
        let record = HeartbeatRecord {
            timestamp: Utc::now(),
            host: host.0.clone(),
            status: status.heartbeat_status(),
            message: message.to_owned(),
            last_result: heartbeat::previous_status(&path),
        };

        match heartbeat::write(&path, &record) {
            Ok(()) => self.log_line(&format!("heartbeat written ({})", record.status)),
            Err(error) => {
                self.log_line(&format!("heartbeat write failed: {error}"));
                warn!("heartbeat write failed: {error}");
            }
        }
    }

    fn log_line(&self, message: &str) {
        append_line(&self.log, message);
    }

    fn report(
        &self,
        status: RunStatus,
        role: Option<Role>,
        results: Vec<SyncResult>,
        counts: Option<CountComparison>,
        started: Instant,
    ) -> RunReport {
        RunReport {
            status,
            role,
            results,
            counts,
            duration_ms: started.elapsed().as_millis(),
        }
    }
}

// ---------------------------------------------------------------------------
// Message helpers
// ---------------------------------------------------------------------------

fn success_message(results: &[SyncResult]) -> String {
    let names: Vec<String> = results.iter().map(|r| r.direction.to_string()).collect();
    format!("{} completed", names.join(" and "))
}

fn failure_message(results: &[SyncResult]) -> String {
    let failed: Vec<String> = results
        .iter()
        .filter(|r| !r.success())
        .map(|r| format!("{} exit {}", r.direction, r.exit_code))
        .collect();
    format!("transfer failed: {}", failed.join(", "))
}

fn success_detail(results: &[SyncResult], counts: Option<CountComparison>) -> String {
    match counts {
        Some(c) => format!(
            "{}; file counts source {} dest {}",
            success_message(results),
            c.source,
            c.dest
        ),
        None => success_message(results),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
