//! Domain types for the Duplex orchestrator.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Everything that lands in a config or heartbeat file is serde-serializable.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed host identity as it appears in the sync-pair config.
///
/// Comparison goes through [`HostName::short`], so `alpha.example.com` and
/// `alpha` name the same host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostName(pub String);

impl HostName {
    /// The name up to the first dot, lowercased for comparison.
    pub fn short(&self) -> String {
        let bare = self.0.split('.').next().unwrap_or(&self.0);
        bare.to_ascii_lowercase()
    }

    /// Case-insensitive short-name equality.
    pub fn matches(&self, other: &HostName) -> bool {
        self.short() == other.short()
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for HostName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HostName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which end of the sync pair this process is running on.
///
/// Resolution compares the local hostname against the configured pair; a
/// hostname matching neither end is a fatal config error surfaced as
/// `ConfigError::UnknownRole`, so no `Unknown` variant exists here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Source,
    Destination,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Source => write!(f, "source"),
            Role::Destination => write!(f, "destination"),
        }
    }
}

/// One transfer direction, named from the data's perspective.
///
/// `Push` propagates the source tree to the destination tree; `Pull` brings
/// the destination tree back. Which end is local depends on [`Role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Push,
    Pull,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Push => write!(f, "push"),
            Direction::Pull => write!(f, "pull"),
        }
    }
}

/// Which directions a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    #[default]
    Bidirectional,
    Push,
    Pull,
}

impl SyncMode {
    /// The directions of one run, in execution order. Push always precedes pull.
    pub fn directions(self) -> &'static [Direction] {
        match self {
            SyncMode::Bidirectional => &[Direction::Push, Direction::Pull],
            SyncMode::Push => &[Direction::Push],
            SyncMode::Pull => &[Direction::Pull],
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Bidirectional => write!(f, "bidirectional"),
            SyncMode::Push => write!(f, "push"),
            SyncMode::Pull => write!(f, "pull"),
        }
    }
}

/// Terminal state of one orchestrated run.
///
/// `Aborted` means a precondition (config, role, mount) failed before any
/// transfer started; `Interrupted` means a shutdown signal was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    Failed,
    Aborted,
    Interrupted,
}

impl RunStatus {
    /// Process exit status: 0 only for a fully successful run.
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Succeeded => 0,
            _ => 1,
        }
    }

    /// How this outcome is recorded in the heartbeat file.
    pub fn heartbeat_status(self) -> HeartbeatStatus {
        match self {
            RunStatus::Succeeded => HeartbeatStatus::Success,
            RunStatus::Failed | RunStatus::Aborted => HeartbeatStatus::Failed,
            RunStatus::Interrupted => HeartbeatStatus::Interrupted,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Aborted => write!(f, "aborted"),
            RunStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Status field of a heartbeat record, as consumed by external monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatStatus {
    Success,
    Failed,
    Interrupted,
}

impl fmt::Display for HeartbeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeartbeatStatus::Success => write!(f, "success"),
            HeartbeatStatus::Failed => write!(f, "failed"),
            HeartbeatStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Alert severity, carried into the rendered subject line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Normal => write!(f, "normal"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Outcome of one direction's transfer-tool invocation.
///
/// `exit_code` is the tool's status captured verbatim; a child killed by a
/// signal is recorded as `128 + signal`. `excerpt` holds the last few output
/// lines of that invocation for alert bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub direction: Direction,
    pub source: String,
    pub dest: String,
    pub exit_code: i32,
    pub excerpt: Vec<String>,
}

impl SyncResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The single structured record overwritten atomically after each run.
///
/// Read only by external monitoring; the orchestrator never gates behavior
/// on its content. `last_result` carries the previous record's status
/// forward and is absent for the first run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRecord {
    pub timestamp: DateTime<Utc>,
    pub host: String,
    pub status: HeartbeatStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<HeartbeatStatus>,
}

/// File counts of the two trees after the transfers.
///
/// A failed remote count degrades to 0 upstream, so the comparison itself
/// never fails; it only answers whether the drift warrants an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountComparison {
    pub source: u64,
    pub dest: u64,
}

impl CountComparison {
    /// Absolute file-count difference.
    pub fn diff(&self) -> u64 {
        self.source.abs_diff(self.dest)
    }

    /// Strictly-exceeds check: a drift equal to the threshold does not alert.
    pub fn exceeds(&self, threshold: u64) -> bool {
        self.diff() > threshold
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
