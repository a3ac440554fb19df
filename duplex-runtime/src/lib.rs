//! Run loop for duplex: lock management, signal flags, and the
//! orchestrated sync run itself.
//!
//! The CLI loads and validates a [`duplex_core::SyncConfig`], installs the
//! signal handlers, and hands everything to [`Orchestrator::run`]. One
//! invocation is one run; scheduling stays outside (cron).

mod error;
pub mod lock;
pub mod orchestrator;
pub mod signal;

use duplex_core::runlog::RunLog;

pub use error::RuntimeError;
pub use lock::RunLock;
pub use orchestrator::{Orchestrator, RunReport};
pub use signal::{install as install_signal_handlers, ShutdownReason};

/// Append to the run log, degrading a write failure to a diagnostic.
/// Logging never aborts a run.
pub(crate) fn append_line(log: &RunLog, message: &str) {
    if let Err(error) = log.append(message) {
        tracing::warn!("run log append failed: {error}");
    }
}

/// Install the stderr diagnostics layer. Safe to call more than once;
/// later calls keep the first subscriber.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
