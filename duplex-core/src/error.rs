//! Error types for duplex-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading and validating a sync-pair config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load - includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None` - cannot locate `~/.duplex/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// `source_host` and `dest_host` name the same machine.
    #[error("source_host and dest_host must differ (both are {host})")]
    HostsNotDistinct { host: String },

    /// Mount verification is enabled but the `mount` section is missing.
    #[error("features.mount_check is enabled but the mount section is missing")]
    MissingMountSpec,

    /// Email alerts are enabled but no recipient is configured.
    #[error("features.email is enabled but alert_recipient is missing")]
    MissingRecipient,

    /// The local hostname matches neither configured end of the pair.
    #[error("host {host} is neither source nor destination; cannot resolve role")]
    UnknownRole { host: String },
}

/// Errors from run-log and heartbeat persistence.
#[derive(Debug, Error)]
pub enum StateError {
    /// Underlying I/O failure, with the file involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Heartbeat JSON could not be serialized or parsed.
    #[error("heartbeat JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StateError::Io { path: path.into(), source }
    }
}
