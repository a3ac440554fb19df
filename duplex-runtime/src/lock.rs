//! Exclusive run lock shared by every invocation of a sync pair.
//!
//! Cron fires runs on a fixed schedule with no idea whether the previous
//! one finished, so overlap is routine: a slow transfer outlives its slot
//! and the next invocation starts anyway. The lock turns that overlap into
//! a clean no-op. Busy is an expected outcome, not a fault; the caller
//! appends one run-log line and exits without alerting.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use duplex_core::runlog::RunLog;

use crate::append_line;
use crate::error::RuntimeError;

/// Advisory exclusive lock held for the duration of one run.
///
/// The kernel drops the underlying lock when the file handle closes, so
/// release happens on every exit path: normal return, early abort, panic
/// and signal-driven teardown all end in the same drop. A lock file left
/// on disk by a dead process never blocks the next run.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    log: RunLog,
    release_reason: Option<String>,
    _file: File,
}

impl RunLock {
    /// Try to take the lock without waiting.
    ///
    /// On success the holder's PID is written into the file for operator
    /// inspection; the content is informational only and never consulted
    /// for liveness. When another process already holds the lock this
    /// appends one run-log line and returns [`RuntimeError::LockBusy`].
    pub fn acquire(path: &Path, log: RunLog) -> Result<Self, RuntimeError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| RuntimeError::io(path, e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| RuntimeError::io(path, e))?;

        if file.try_lock_exclusive().is_err() {
            append_line(
                &log,
                &format!("another run holds the lock at {}; exiting", path.display()),
            );
            return Err(RuntimeError::LockBusy { path: path.to_path_buf() });
        }

        file.set_len(0).map_err(|e| RuntimeError::io(path, e))?;
        writeln!(file, "{}", std::process::id()).map_err(|e| RuntimeError::io(path, e))?;

        append_line(&log, &format!("lock acquired (pid {})", std::process::id()));
        Ok(Self {
            path: path.to_path_buf(),
            log,
            release_reason: None,
            _file: file,
        })
    }

    /// Record why the lock is being given up early; the reason lands in
    /// the release log line.
    pub fn note_release_reason(&mut self, reason: &str) {
        self.release_reason = Some(reason.to_owned());
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match self.release_reason.take() {
            Some(reason) => append_line(&self.log, &format!("lock released ({reason})")),
            None => append_line(&self.log, "lock released"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
