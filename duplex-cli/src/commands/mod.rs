//! Subcommand implementations.

pub mod check;
pub mod init;
pub mod run;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use duplex_core::{config, SyncConfig};

/// Resolve the config file location: `--config`, else `$DUPLEX_CONFIG`,
/// else `~/.duplex/config.yaml`.
pub(crate) fn resolve_config_path(flag: Option<&Path>) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(path.to_path_buf()),
        None => config::config_path().context("could not resolve the config location"),
    }
}

pub(crate) fn load_config(flag: Option<&Path>) -> Result<(PathBuf, SyncConfig)> {
    let path = resolve_config_path(flag)?;
    let cfg = config::load_from(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    Ok((path, cfg))
}
