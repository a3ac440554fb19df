//! Endpoint mapping and transfer-tool argument building. Pure functions,
//! no I/O; the runner feeds the result to `std::process::Command`.

use std::fmt;
use std::path::{Path, PathBuf};

use duplex_core::config::{SyncConfig, TransferOptions};
use duplex_core::types::{Direction, HostName, Role};

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// One end of a transfer: a bare local path, or `host:path` reached through
/// the remote shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub host: Option<HostName>,
    pub path: PathBuf,
}

impl Location {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self { host: None, path: path.into() }
    }

    pub fn remote(host: HostName, path: impl Into<PathBuf>) -> Self {
        Self { host: Some(host), path: path.into() }
    }

    pub fn is_remote(&self) -> bool {
        self.host.is_some()
    }

    /// `host:path` or `path`.
    pub fn render(&self) -> String {
        match &self.host {
            Some(host) => format!("{}:{}", host, self.path.display()),
            None => self.path.display().to_string(),
        }
    }

    /// Like [`render`](Self::render), with a trailing `/` so the tool copies
    /// the tree's contents rather than the directory itself.
    pub fn render_source(&self) -> String {
        let rendered = self.render();
        if rendered.ends_with('/') {
            rendered
        } else {
            format!("{rendered}/")
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// ---------------------------------------------------------------------------
// Endpoint mapping
// ---------------------------------------------------------------------------

/// Map (direction, role) to `(from, to)` endpoints.
///
/// Directions are fixed in the data's frame: push propagates the source
/// tree to the destination tree whichever host this process runs on. The
/// role only decides which end is local.
pub fn endpoints(cfg: &SyncConfig, role: Role, direction: Direction) -> (Location, Location) {
    let source = |local: bool| {
        if local {
            Location::local(&cfg.source_path)
        } else {
            Location::remote(cfg.source_host.clone(), &cfg.source_path)
        }
    };
    let dest = |local: bool| {
        if local {
            Location::local(&cfg.dest_path)
        } else {
            Location::remote(cfg.dest_host.clone(), &cfg.dest_path)
        }
    };

    let source_is_local = role == Role::Source;
    match direction {
        Direction::Push => (source(source_is_local), dest(!source_is_local)),
        Direction::Pull => (dest(!source_is_local), source(source_is_local)),
    }
}

// ---------------------------------------------------------------------------
// Argument building
// ---------------------------------------------------------------------------

/// Build the transfer-tool argv (everything after the binary name).
pub fn transfer_args(
    opts: &TransferOptions,
    dry_run: bool,
    from: &Location,
    to: &Location,
) -> Vec<String> {
    let mut args = Vec::new();
    if opts.archive {
        args.push("-a".to_owned());
    }
    if opts.verbose {
        args.push("-v".to_owned());
    }
    if opts.compress {
        args.push("-z".to_owned());
    }
    if opts.checksum {
        args.push("-c".to_owned());
    }
    if dry_run {
        args.push("-n".to_owned());
    }
    if opts.delete_extraneous {
        args.push("--delete".to_owned());
    }
    for pattern in &opts.exclude {
        args.push(format!("--exclude={pattern}"));
    }
    if from.is_remote() || to.is_remote() {
        args.push("-e".to_owned());
        args.push(opts.remote_shell.clone());
    }
    args.push(from.render_source());
    args.push(to.render());
    args
}

/// The remote command string that counts regular files under `path`.
pub fn remote_count_script(path: &Path) -> String {
    format!("find '{}' -type f 2>/dev/null | wc -l", path.display())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
