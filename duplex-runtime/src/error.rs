use std::path::PathBuf;

use thiserror::Error;

/// Error surface for lock management and the orchestrated run.
///
/// Outcomes of a run that *started* (transfer failures, aborted
/// preconditions, interruption) are not errors; they come back inside a
/// [`crate::RunReport`]. This enum covers only the cases where no run
/// state machine ever began.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Another invocation holds the run lock. Expected under schedule
    /// overlap; callers exit nonzero without alerting.
    #[error("another run already holds the lock at {path}")]
    LockBusy { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("alert setup error: {0}")]
    Alert(#[from] duplex_alert::AlertError),
}

impl RuntimeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RuntimeError::Io { path: path.into(), source }
    }
}
