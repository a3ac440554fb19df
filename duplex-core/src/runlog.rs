//! The append-only run log - the domain record every phase writes to.
//!
//! Line format (local time):
//!
//! ```text
//! YYYY-MM-DD HH:MM:SS: message
//! ```
//!
//! This file is a domain artifact, not process diagnostics: transfer-tool
//! output, lock events, preflight results, and final outcomes all land here,
//! and the recent-error scan reads the same file back through
//! [`RunLog::tail`]. Rotation is external; this module only appends and reads.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::StateError;

/// `strftime` pattern for the line prefix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format one log line. Pure, so tests can pin the exact shape.
pub fn format_line(now: DateTime<Local>, message: &str) -> String {
    format!("{}: {}", now.format(TIMESTAMP_FORMAT), message)
}

/// Handle on the run-log file. Construction does no I/O; the file (and its
/// parent directory) appear on first append.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line.
    pub fn append(&self, message: &str) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StateError::io(&self.path, e))?;
        writeln!(file, "{}", format_line(Local::now(), message))
            .map_err(|e| StateError::io(&self.path, e))?;
        Ok(())
    }

    /// The last `n` lines, oldest first. A missing log reads as empty.
    pub fn tail(&self, n: usize) -> Result<Vec<String>, StateError> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| StateError::io(&self.path, e))?;
        let lines: Vec<&str> = contents.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].iter().map(|s| (*s).to_owned()).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
