//! Heartbeat record persistence - one JSON file, overwritten atomically.
//!
//! Write flow: serialize, `.tmp` sibling, `rename`. The `.tmp` is always in
//! the same directory as the target (same filesystem - no EXDEV). External
//! monitoring polls this file; the orchestrator only writes it, except to
//! carry the previous status forward as `last_result`.

use std::path::Path;

use crate::error::StateError;
use crate::types::{HeartbeatRecord, HeartbeatStatus};

/// Load the record at `path`. Absent file reads as `Ok(None)`; malformed
/// JSON is an error so `duplex status` can surface it.
pub fn read(path: &Path) -> Result<Option<HeartbeatRecord>, StateError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| StateError::io(path, e))?;
    let record = serde_json::from_str(&contents)?;
    Ok(Some(record))
}

/// The status on disk, if any. Degrades every failure to `None`; used only
/// to fill the next record's `last_result`.
pub fn previous_status(path: &Path) -> Option<HeartbeatStatus> {
    read(path).ok().flatten().map(|r| r.status)
}

/// Atomically overwrite the record at `path`, creating the parent directory
/// on first use.
pub fn write(path: &Path, record: &HeartbeatRecord) -> Result<(), StateError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;
        }
    }
    let tmp = tmp_sibling(path);
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&tmp, json).map_err(|e| StateError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StateError::io(path, e))?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> std::path::PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "heartbeat.json".to_owned());
    path.with_file_name(format!("{name}.tmp"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
