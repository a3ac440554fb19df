//! Preflight checks for `duplex-preflight`.
//!
//! Two inspections run after the lock is held and before any transfer:
//! - [`mount`] - verify the mirrored tree's mount point (fatal on any fault)
//! - [`errscan`] - scan the run log's recent lines for fault signatures
//!   (strictly advisory; it alerts, never blocks)
//!
//! Both are built from pure functions over already-read text so tests feed
//! literal mount tables and log lines.

pub mod errscan;
pub mod mount;

use thiserror::Error;

pub use errscan::{scan_lines, scan_recent_errors, ErrorScan};
pub use mount::{verify_mount, MountEntry, MountFault, MountReport, MountTable};

/// Errors from preflight inspections.
#[derive(Debug, Error)]
pub enum PreflightError {
    /// Underlying I/O failure (mount table unreadable, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run log could not be read back for scanning.
    #[error(transparent)]
    State(#[from] duplex_core::StateError),
}
