//! Typed alert events and their kind-specific payloads.
//!
//! The payload structs double as tera contexts (everything is
//! `Serialize`), so the body templates read their fields directly.

use serde::Serialize;

use duplex_core::types::{CountComparison, Severity, SyncResult};

// ---------------------------------------------------------------------------
// Kind payloads
// ---------------------------------------------------------------------------

/// Context for a fatal mount-verification report.
#[derive(Debug, Clone, Serialize)]
pub struct MountFailureCtx {
    pub point: String,
    /// One human line per collected fault.
    pub faults: Vec<String>,
}

/// One direction's outcome, as rendered into a transfer-failure body.
#[derive(Debug, Clone, Serialize)]
pub struct TransferResultCtx {
    pub direction: String,
    pub source: String,
    pub dest: String,
    pub exit_code: i32,
    pub excerpt: Vec<String>,
}

impl From<&SyncResult> for TransferResultCtx {
    fn from(result: &SyncResult) -> Self {
        Self {
            direction: result.direction.to_string(),
            source: result.source.clone(),
            dest: result.dest.clone(),
            exit_code: result.exit_code,
            excerpt: result.excerpt.clone(),
        }
    }
}

/// Context for a post-transfer file-count drift.
#[derive(Debug, Clone, Serialize)]
pub struct CountDriftCtx {
    pub source: u64,
    pub dest: u64,
    pub diff: u64,
    pub threshold: u64,
}

impl CountDriftCtx {
    pub fn new(counts: CountComparison, threshold: u64) -> Self {
        Self {
            source: counts.source,
            dest: counts.dest,
            diff: counts.diff(),
            threshold,
        }
    }
}

/// Context for the advisory recent-error scan.
#[derive(Debug, Clone, Serialize)]
pub struct RecentErrorsCtx {
    pub matched: usize,
    pub window: usize,
    /// The most recent matched lines, already capped upstream.
    pub lines: Vec<String>,
}

// ---------------------------------------------------------------------------
// AlertKind
// ---------------------------------------------------------------------------

/// Everything the orchestrator can alert about.
#[derive(Debug, Clone)]
pub enum AlertKind {
    /// Mount verification collected at least one fault; the run aborted.
    MountFailure(MountFailureCtx),
    /// At least one transfer direction exited nonzero.
    TransferFailure(Vec<TransferResultCtx>),
    /// File counts drifted past the threshold.
    CountDrift(CountDriftCtx),
    /// The error scan met the configured threshold.
    RecentErrors(RecentErrorsCtx),
    /// A precondition (config, role) failed before any transfer.
    RunAborted { reason: String },
    /// Optional success notice (`features.notify_on_success`).
    SyncCompleted { detail: String },
}

impl AlertKind {
    /// Severity is a property of the kind, not a caller choice.
    pub fn severity(&self) -> Severity {
        match self {
            AlertKind::MountFailure(_) | AlertKind::RunAborted { .. } => Severity::Critical,
            AlertKind::TransferFailure(_)
            | AlertKind::CountDrift(_)
            | AlertKind::RecentErrors(_) => Severity::High,
            AlertKind::SyncCompleted { .. } => Severity::Normal,
        }
    }

    /// Subject line. Subjects are plain `format!` strings; only bodies go
    /// through templates.
    pub fn subject(&self, host: &str) -> String {
        match self {
            AlertKind::MountFailure(_) => {
                format!("[duplex] CRITICAL: mount check failed on {host}")
            }
            AlertKind::RunAborted { .. } => {
                format!("[duplex] CRITICAL: sync aborted on {host}")
            }
            AlertKind::TransferFailure(_) => format!("[duplex] sync failed on {host}"),
            AlertKind::CountDrift(_) => format!("[duplex] file count drift on {host}"),
            AlertKind::RecentErrors(_) => format!("[duplex] recurring errors on {host}"),
            AlertKind::SyncCompleted { .. } => format!("[duplex] sync completed on {host}"),
        }
    }

    /// Embedded template the body renders from.
    pub(crate) fn template(&self) -> &'static str {
        match self {
            AlertKind::MountFailure(_) => "mount_failure.txt.tera",
            AlertKind::TransferFailure(_) => "transfer_failure.txt.tera",
            AlertKind::CountDrift(_) => "count_drift.txt.tera",
            AlertKind::RecentErrors(_) => "recent_errors.txt.tera",
            AlertKind::RunAborted { .. } => "run_aborted.txt.tera",
            AlertKind::SyncCompleted { .. } => "sync_completed.txt.tera",
        }
    }
}

// ---------------------------------------------------------------------------
// AlertEvent
// ---------------------------------------------------------------------------

/// A fully rendered alert, ready for delivery. Not persisted; the run log
/// only records that it was sent (or suppressed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub subject: String,
    pub body: String,
    pub severity: Severity,
    pub recipient: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use duplex_core::types::Direction;

    #[test]
    fn severity_follows_kind() {
        let mount = AlertKind::MountFailure(MountFailureCtx {
            point: "/mnt/mirror".into(),
            faults: vec![],
        });
        assert_eq!(mount.severity(), Severity::Critical);
        assert_eq!(
            AlertKind::RunAborted { reason: "no role".into() }.severity(),
            Severity::Critical
        );
        assert_eq!(AlertKind::TransferFailure(vec![]).severity(), Severity::High);
        assert_eq!(
            AlertKind::SyncCompleted { detail: String::new() }.severity(),
            Severity::Normal
        );
    }

    #[test]
    fn subjects_carry_the_host() {
        let drift = AlertKind::CountDrift(CountDriftCtx {
            source: 120,
            dest: 105,
            diff: 15,
            threshold: 10,
        });
        assert_eq!(drift.subject("alpha"), "[duplex] file count drift on alpha");
    }

    #[test]
    fn transfer_ctx_copies_the_result() {
        let result = SyncResult {
            direction: Direction::Pull,
            source: "beta:/mnt/mirror/data/".into(),
            dest: "/srv/data".into(),
            exit_code: 12,
            excerpt: vec!["rsync error: error in rsync protocol data stream".into()],
        };
        let ctx = TransferResultCtx::from(&result);
        assert_eq!(ctx.direction, "pull");
        assert_eq!(ctx.exit_code, 12);
        assert_eq!(ctx.excerpt.len(), 1);
    }

    #[test]
    fn drift_ctx_computes_diff() {
        let ctx = CountDriftCtx::new(CountComparison { source: 105, dest: 120 }, 10);
        assert_eq!(ctx.diff, 15);
    }
}
