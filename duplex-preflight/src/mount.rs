//! Mount-point verification for the mirrored tree.
//!
//! Four independent checks against the configured mount point:
//!
//! 1. the path appears in the system mount table;
//! 2. the mounted filesystem type matches the expected one (prefix match,
//!    so `nfs` accepts `nfs4`);
//! 3. the mount accepts a write (unique probe file, created then removed);
//! 4. the mount is not flagged `ro` in its options.
//!
//! All four run and every fault is collected into one [`MountReport`];
//! nothing short-circuits. Any fault is fatal to the run: the caller sends
//! one critical alert carrying the full list and never starts a transfer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use duplex_core::config::MountSpec;

use crate::PreflightError;

/// Where the kernel exposes the mount table.
const SYSTEM_MOUNT_TABLE: &str = "/proc/mounts";

// ---------------------------------------------------------------------------
// Mount table
// ---------------------------------------------------------------------------

/// One line of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub point: PathBuf,
    pub fstype: String,
    pub options: Vec<String>,
}

/// A parsed mount table. Production loads `/proc/mounts`; tests parse
/// literal text.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    entries: Vec<MountEntry>,
}

impl MountTable {
    /// Parse text in the `/proc/mounts` field layout:
    /// `device point fstype options dump pass`. Short lines are skipped.
    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let device = fields.next()?;
                let point = fields.next()?;
                let fstype = fields.next()?;
                let options = fields.next()?;
                Some(MountEntry {
                    device: device.to_owned(),
                    point: PathBuf::from(point),
                    fstype: fstype.to_owned(),
                    options: options.split(',').map(str::to_owned).collect(),
                })
            })
            .collect();
        Self { entries }
    }

    /// Read and parse the live system table.
    pub fn load_system() -> Result<Self, PreflightError> {
        let contents = std::fs::read_to_string(SYSTEM_MOUNT_TABLE)?;
        Ok(Self::parse(&contents))
    }

    /// The entry mounted exactly at `point`, if any.
    pub fn find(&self, point: &Path) -> Option<&MountEntry> {
        self.entries.iter().find(|e| e.point == point)
    }

    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }
}

// ---------------------------------------------------------------------------
// Faults and report
// ---------------------------------------------------------------------------

/// One failed mount check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountFault {
    /// No mount-table entry has this exact mount point.
    NotAMountPoint { point: PathBuf },
    /// Mounted filesystem type does not match the expected one.
    WrongFilesystem {
        point: PathBuf,
        expected: String,
        actual: String,
    },
    /// The write probe could not be created or removed.
    NotWritable { point: PathBuf, detail: String },
    /// The mount options carry the `ro` flag.
    ReadOnlyFlag { point: PathBuf },
}

impl fmt::Display for MountFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountFault::NotAMountPoint { point } => {
                write!(f, "{} is not a mount point", point.display())
            }
            MountFault::WrongFilesystem { point, expected, actual } => write!(
                f,
                "{} has filesystem type {actual}, expected {expected}",
                point.display()
            ),
            MountFault::NotWritable { point, detail } => {
                write!(f, "{} is not writable: {detail}", point.display())
            }
            MountFault::ReadOnlyFlag { point } => {
                write!(f, "{} is mounted read-only", point.display())
            }
        }
    }
}

/// Every fault found for one mount point. Empty means the mount is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountReport {
    pub point: PathBuf,
    pub faults: Vec<MountFault>,
}

impl MountReport {
    pub fn ok(&self) -> bool {
        self.faults.is_empty()
    }

    /// One human line per fault, for the run log and alert bodies.
    pub fn fault_lines(&self) -> Vec<String> {
        self.faults.iter().map(|f| f.to_string()).collect()
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Run all four checks against `spec`, collecting every fault.
pub fn verify_mount(table: &MountTable, spec: &MountSpec) -> MountReport {
    let mut faults = Vec::new();

    match table.find(&spec.point) {
        None => faults.push(MountFault::NotAMountPoint { point: spec.point.clone() }),
        Some(entry) => {
            if !fstype_matches(&entry.fstype, &spec.fstype) {
                faults.push(MountFault::WrongFilesystem {
                    point: spec.point.clone(),
                    expected: spec.fstype.clone(),
                    actual: entry.fstype.clone(),
                });
            }
            if entry.options.iter().any(|o| o == "ro") {
                faults.push(MountFault::ReadOnlyFlag { point: spec.point.clone() });
            }
        }
    }

    if let Err(detail) = probe_write(&spec.point) {
        faults.push(MountFault::NotWritable { point: spec.point.clone(), detail });
    }

    MountReport { point: spec.point.clone(), faults }
}

fn fstype_matches(actual: &str, expected: &str) -> bool {
    actual == expected || actual.starts_with(expected)
}

/// Create and remove a uniquely-named probe file directly under `point`.
fn probe_write(point: &Path) -> Result<(), String> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let probe = point.join(format!(".duplex-probe-{}-{nanos}", std::process::id()));
    std::fs::write(&probe, b"probe\n").map_err(|e| e.to_string())?;
    std::fs::remove_file(&probe).map_err(|e| e.to_string())?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
