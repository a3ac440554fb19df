//! Error types for duplex-alert.

use thiserror::Error;

/// All errors that can arise from rendering or delivering alerts.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Tera template engine error, from registration, context building,
    /// or rendering.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// The MTA could not be launched, fed, or exited nonzero.
    #[error("mail delivery via {command} failed: {detail}")]
    Delivery { command: String, detail: String },
}
