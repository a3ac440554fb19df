//! Alerting for `duplex-alert`.
//!
//! An alert starts as a typed [`AlertKind`] carrying kind-specific data,
//! becomes an [`AlertEvent`] (subject, body, severity, recipient) through
//! the pure rendering step in [`render`], and reaches the operator through
//! the configured MTA in [`mailer`]. Rendering touches no I/O; delivery is
//! the only side effect, and the caller treats its failure as advisory.

pub mod error;
pub mod event;
pub mod mailer;
pub mod render;

pub use error::AlertError;
pub use event::{
    AlertEvent, AlertKind, CountDriftCtx, MountFailureCtx, RecentErrorsCtx, TransferResultCtx,
};
pub use mailer::Mailer;
pub use render::AlertRenderer;
