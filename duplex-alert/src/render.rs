//! Tera rendering engine - [`AlertRenderer`] turns an [`AlertKind`] into a
//! delivery-ready [`AlertEvent`].
//!
//! Rendering is pure: given the same kind, host, and timestamp it produces
//! the same subject and body, and it touches no I/O. Templates are baked
//! into the binary at compile time via `include_str!`.

use chrono::{DateTime, Local};
use tera::{Context, Tera};

use duplex_core::types::HostName;

use crate::error::AlertError;
use crate::event::{AlertEvent, AlertKind};

// ---------------------------------------------------------------------------
// Embedded templates
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("mount_failure.txt.tera", include_str!("templates/mount_failure.txt.tera")),
    (
        "transfer_failure.txt.tera",
        include_str!("templates/transfer_failure.txt.tera"),
    ),
    ("count_drift.txt.tera", include_str!("templates/count_drift.txt.tera")),
    ("recent_errors.txt.tera", include_str!("templates/recent_errors.txt.tera")),
    ("run_aborted.txt.tera", include_str!("templates/run_aborted.txt.tera")),
    ("sync_completed.txt.tera", include_str!("templates/sync_completed.txt.tera")),
];

/// Timestamp shape used inside alert bodies; matches the run-log prefix.
const BODY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Tera-based alert renderer. Create once with [`AlertRenderer::new`] and
/// reuse for every alert of a run.
pub struct AlertRenderer {
    tera: Tera,
}

impl AlertRenderer {
    /// Construct a renderer over the embedded templates.
    pub fn new() -> Result<Self, AlertError> {
        let mut tera = Tera::default();
        let items: Vec<(String, String)> = TPLS
            .iter()
            .map(|(name, content)| ((*name).to_owned(), (*content).to_owned()))
            .collect();
        tera.add_raw_templates(items)?;
        Ok(Self { tera })
    }

    /// Render `kind` into an event stamped with `now`.
    pub fn build_at(
        &self,
        now: DateTime<Local>,
        host: &HostName,
        recipient: &str,
        kind: &AlertKind,
    ) -> Result<AlertEvent, AlertError> {
        let mut ctx = kind_context(kind)?;
        ctx.insert("host", &host.0);
        ctx.insert("timestamp", &now.format(BODY_TIMESTAMP_FORMAT).to_string());

        let body = self.tera.render(kind.template(), &ctx)?;
        Ok(AlertEvent {
            subject: kind.subject(&host.0),
            body,
            severity: kind.severity(),
            recipient: recipient.to_owned(),
        })
    }

    /// `build_at` stamped with the current local time.
    pub fn build(
        &self,
        host: &HostName,
        recipient: &str,
        kind: &AlertKind,
    ) -> Result<AlertEvent, AlertError> {
        self.build_at(Local::now(), host, recipient, kind)
    }
}

fn kind_context(kind: &AlertKind) -> Result<Context, AlertError> {
    let ctx = match kind {
        AlertKind::MountFailure(payload) => Context::from_serialize(payload)?,
        AlertKind::CountDrift(payload) => Context::from_serialize(payload)?,
        AlertKind::RecentErrors(payload) => Context::from_serialize(payload)?,
        AlertKind::TransferFailure(results) => {
            let mut ctx = Context::new();
            ctx.insert("results", results);
            ctx
        }
        AlertKind::RunAborted { reason } => {
            let mut ctx = Context::new();
            ctx.insert("reason", reason);
            ctx
        }
        AlertKind::SyncCompleted { detail } => {
            let mut ctx = Context::new();
            ctx.insert("detail", detail);
            ctx
        }
    };
    Ok(ctx)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
