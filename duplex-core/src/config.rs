//! Sync-pair configuration (YAML).
//!
//! # Storage layout
//!
//! ```text
//! ~/.duplex/
//!   config.yaml      (the sync-pair definition, read once per run)
//!   run.log          (append-only run log, unless paths.log overrides)
//!   duplex.lock      (advisory lock file, unless paths.lock overrides)
//!   heartbeat.json   (monitoring record, unless paths.heartbeat overrides)
//! ```
//!
//! # API pattern
//!
//! Functions touching the home directory come in two forms:
//! - `fn_at(home: &Path, ...)` - explicit home; used in tests with `TempDir`
//! - `fn(...)` - derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.
//!
//! The config is immutable after load: one `SyncConfig` value is built at
//! process start and threaded through every phase. No global state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{HostName, Role, SyncMode};

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV: &str = "DUPLEX_CONFIG";

/// Environment variable overriding the detected local hostname.
pub const HOSTNAME_ENV: &str = "DUPLEX_HOSTNAME";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// The real home directory. Tests must NEVER call this or the other
/// no-arg wrappers; they pass an explicit temp home to the `_at` variants.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

/// `<home>/.duplex/` - pure, no I/O.
pub fn state_dir_at(home: &Path) -> PathBuf {
    home.join(".duplex")
}

/// `<home>/.duplex/config.yaml` - pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    state_dir_at(home).join("config.yaml")
}

/// Default config location: `$DUPLEX_CONFIG` if set, else `~/.duplex/config.yaml`.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(config_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 2. Config types
// ---------------------------------------------------------------------------

/// One synchronized pair of directory trees on two hosts.
///
/// Loaded once per run; every field is read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Host holding the authoritative tree.
    pub source_host: HostName,
    /// Host holding the mirrored tree.
    pub dest_host: HostName,
    /// Directory tree on `source_host`.
    pub source_path: PathBuf,
    /// Directory tree on `dest_host`.
    pub dest_path: PathBuf,

    /// Where alert mail goes. Required when `features.email` is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_recipient: Option<String>,

    /// Allowed file-count drift between the two trees.
    #[serde(default = "default_count_diff_threshold")]
    pub count_diff_threshold: u64,

    /// Recent-error scan alert threshold (matches meet-or-exceed it).
    #[serde(default = "default_max_recent_errors")]
    pub max_recent_errors: usize,

    #[serde(default)]
    pub transfer: TransferOptions,

    /// Mount verification target. Required when `features.mount_check` is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount: Option<MountSpec>,

    #[serde(default)]
    pub features: Features,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub mailer: MailerSpec,

    #[serde(default)]
    pub paths: RuntimePaths,
}

/// Flags passed through to the delta-transfer tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    /// `-a`: recursive copy preserving permissions, times, links.
    pub archive: bool,
    /// `-v`: per-file output into the run log.
    pub verbose: bool,
    /// `-z`: compress in transit.
    pub compress: bool,
    /// `-c`: checksum-based change detection instead of size+mtime.
    pub checksum: bool,
    /// `--delete`: remove destination files absent from the source.
    pub delete_extraneous: bool,
    /// One `--exclude=PATTERN` per entry.
    pub exclude: Vec<String>,
    /// Transfer tool binary.
    pub tool: String,
    /// Remote shell binary, passed via `-e` and used for remote counts.
    pub remote_shell: String,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            archive: true,
            verbose: true,
            compress: true,
            checksum: false,
            delete_extraneous: false,
            exclude: vec![],
            tool: "rsync".to_owned(),
            remote_shell: "ssh".to_owned(),
        }
    }
}

/// The mounted filesystem the mirrored tree lives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    /// Mount point to verify before transferring.
    pub point: PathBuf,
    /// Expected filesystem type; prefix match, so `nfs` accepts `nfs4`.
    #[serde(default = "default_mount_fstype")]
    pub fstype: String,
}

/// Feature switches controlling which phases a run executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub mount_check: bool,
    pub email: bool,
    pub heartbeat: bool,
    /// Send a normal-severity notice after a fully successful run.
    pub notify_on_success: bool,
    pub mode: SyncMode,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            mount_check: true,
            email: true,
            heartbeat: true,
            notify_on_success: false,
            mode: SyncMode::Bidirectional,
        }
    }
}

/// Deadlines for remote operations. A child past its deadline is killed and
/// the operation counts as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub transfer_secs: u64,
    pub remote_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { transfer_secs: 3600, remote_secs: 60 }
    }
}

impl Timeouts {
    pub fn transfer(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.transfer_secs)
    }

    pub fn remote(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.remote_secs)
    }
}

/// How rendered alerts reach the MTA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailerSpec {
    /// MTA binary; the rendered message is piped to its stdin.
    pub command: String,
    pub args: Vec<String>,
    /// `From:` header; defaults to `duplex@<local host>` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl Default for MailerSpec {
    fn default() -> Self {
        Self {
            command: "sendmail".to_owned(),
            args: vec!["-t".to_owned()],
            from: None,
        }
    }
}

/// Optional overrides for the runtime files; everything defaults under
/// `<home>/.duplex/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuntimePaths {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Load a config from an explicit file path.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
/// Validation is separate; call [`SyncConfig::validate`] after loading.
pub fn load_from(path: &Path) -> Result<SyncConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound { path: path.to_path_buf() });
    }
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents)
        .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), source: e })
}

/// `load_from` at the default location (`$DUPLEX_CONFIG` / `~/.duplex/config.yaml`).
pub fn load() -> Result<SyncConfig, ConfigError> {
    load_from(&config_path()?)
}

// ---------------------------------------------------------------------------
// 4. Validation and role resolution
// ---------------------------------------------------------------------------

impl SyncConfig {
    /// Structural checks that must pass before anything else runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_host.matches(&self.dest_host) {
            return Err(ConfigError::HostsNotDistinct { host: self.source_host.0.clone() });
        }
        if self.features.mount_check && self.mount.is_none() {
            return Err(ConfigError::MissingMountSpec);
        }
        if self.features.email && self.alert_recipient.is_none() {
            return Err(ConfigError::MissingRecipient);
        }
        Ok(())
    }

    /// Which end of the pair `local` is. A hostname matching neither end is
    /// fatal: the caller aborts the run without transferring anything.
    pub fn resolve_role(&self, local: &HostName) -> Result<Role, ConfigError> {
        if local.matches(&self.source_host) {
            Ok(Role::Source)
        } else if local.matches(&self.dest_host) {
            Ok(Role::Destination)
        } else {
            Err(ConfigError::UnknownRole { host: local.0.clone() })
        }
    }

    /// The other end of the pair, from this role's point of view.
    pub fn remote_host(&self, role: Role) -> &HostName {
        match role {
            Role::Source => &self.dest_host,
            Role::Destination => &self.source_host,
        }
    }

    /// Resolved run-log location: `paths.log`, else `<home>/.duplex/run.log`.
    pub fn log_path_at(&self, home: &Path) -> PathBuf {
        self.paths
            .log
            .clone()
            .unwrap_or_else(|| state_dir_at(home).join("run.log"))
    }

    /// Resolved lock location: `paths.lock`, else `<home>/.duplex/duplex.lock`.
    pub fn lock_path_at(&self, home: &Path) -> PathBuf {
        self.paths
            .lock
            .clone()
            .unwrap_or_else(|| state_dir_at(home).join("duplex.lock"))
    }

    /// Resolved heartbeat location: `paths.heartbeat`, else
    /// `<home>/.duplex/heartbeat.json`.
    pub fn heartbeat_path_at(&self, home: &Path) -> PathBuf {
        self.paths
            .heartbeat
            .clone()
            .unwrap_or_else(|| state_dir_at(home).join("heartbeat.json"))
    }
}

/// Local host identity: `$DUPLEX_HOSTNAME` override, else the OS hostname.
pub fn local_hostname() -> Result<HostName, ConfigError> {
    if let Ok(name) = std::env::var(HOSTNAME_ENV) {
        if !name.is_empty() {
            return Ok(HostName::from(name));
        }
    }
    let name = hostname::get()?;
    Ok(HostName::from(name.to_string_lossy().into_owned()))
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn default_count_diff_threshold() -> u64 {
    50
}

fn default_max_recent_errors() -> usize {
    5
}

fn default_mount_fstype() -> String {
    "nfs".to_owned()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    const FULL_YAML: &str = r#"
source_host: alpha
dest_host: beta
source_path: /srv/data
dest_path: /mnt/mirror/data
alert_recipient: ops@example.com
count_diff_threshold: 10
max_recent_errors: 3
transfer:
  compress: false
  delete_extraneous: true
  exclude:
    - "*.tmp"
    - ".cache/"
mount:
  point: /mnt/mirror
  fstype: nfs
features:
  mode: push
timeouts:
  transfer_secs: 120
  remote_secs: 15
mailer:
  command: msmtp
  args: ["-t"]
  from: duplex@alpha
paths:
  log: /var/log/duplex/run.log
"#;

    const MINIMAL_YAML: &str = r#"
source_host: alpha
dest_host: beta
source_path: /srv/data
dest_path: /mnt/mirror/data
alert_recipient: ops@example.com
mount:
  point: /mnt/mirror
"#;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, contents).expect("write config fixture");
        path
    }

    #[test]
    fn full_config_parses() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(&dir, FULL_YAML);
        let cfg = load_from(&path).expect("load");
        assert_eq!(cfg.source_host, HostName::from("alpha"));
        assert_eq!(cfg.count_diff_threshold, 10);
        assert_eq!(cfg.max_recent_errors, 3);
        assert!(!cfg.transfer.compress);
        assert!(cfg.transfer.delete_extraneous);
        assert_eq!(cfg.transfer.exclude, vec!["*.tmp", ".cache/"]);
        assert_eq!(cfg.features.mode, SyncMode::Push);
        assert_eq!(cfg.timeouts.transfer_secs, 120);
        assert_eq!(cfg.mailer.command, "msmtp");
        assert_eq!(cfg.paths.log.as_deref(), Some(Path::new("/var/log/duplex/run.log")));
        cfg.validate().expect("valid");
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(&dir, MINIMAL_YAML);
        let cfg = load_from(&path).expect("load");
        assert_eq!(cfg.count_diff_threshold, 50);
        assert_eq!(cfg.max_recent_errors, 5);
        assert!(cfg.transfer.archive);
        assert!(cfg.transfer.verbose);
        assert!(cfg.transfer.compress);
        assert!(!cfg.transfer.checksum);
        assert_eq!(cfg.transfer.tool, "rsync");
        assert_eq!(cfg.transfer.remote_shell, "ssh");
        assert!(cfg.features.mount_check);
        assert!(cfg.features.email);
        assert!(cfg.features.heartbeat);
        assert_eq!(cfg.features.mode, SyncMode::Bidirectional);
        assert_eq!(cfg.timeouts.transfer_secs, 3600);
        assert_eq!(cfg.timeouts.remote_secs, 60);
        assert_eq!(cfg.mailer.command, "sendmail");
        assert_eq!(cfg.mailer.args, vec!["-t"]);
        assert_eq!(
            cfg.mount.as_ref().map(|m| m.fstype.as_str()),
            Some("nfs")
        );
        cfg.validate().expect("valid");
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let err = load_from(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigNotFound { .. }));
    }

    #[test]
    fn malformed_yaml_is_parse_error_with_path() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(&dir, "source_host: [unclosed");
        let err = load_from(&path).unwrap_err();
        match err {
            ConfigError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    fn minimal_config() -> SyncConfig {
        serde_yaml::from_str(MINIMAL_YAML).expect("parse fixture")
    }

    #[test]
    fn same_hosts_rejected() {
        let mut cfg = minimal_config();
        cfg.dest_host = HostName::from("Alpha.example.com");
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::HostsNotDistinct { .. }));
    }

    #[test]
    fn mount_spec_required_only_when_check_enabled() {
        let mut cfg = minimal_config();
        cfg.mount = None;
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingMountSpec)));
        cfg.features.mount_check = false;
        cfg.validate().expect("mount optional once check is off");
    }

    #[test]
    fn recipient_required_only_when_email_enabled() {
        let mut cfg = minimal_config();
        cfg.alert_recipient = None;
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingRecipient)));
        cfg.features.email = false;
        cfg.validate().expect("recipient optional once email is off");
    }

    #[rstest]
    #[case("alpha", Role::Source)]
    #[case("ALPHA.example.com", Role::Source)]
    #[case("beta", Role::Destination)]
    #[case("beta.internal.lan", Role::Destination)]
    fn role_resolution(#[case] local: &str, #[case] expected: Role) {
        let cfg = minimal_config();
        let role = cfg.resolve_role(&HostName::from(local)).expect("resolve");
        assert_eq!(role, expected);
    }

    #[test]
    fn unknown_host_cannot_resolve() {
        let cfg = minimal_config();
        let err = cfg.resolve_role(&HostName::from("gamma")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRole { .. }));
    }

    #[test]
    fn remote_host_is_the_other_end() {
        let cfg = minimal_config();
        assert_eq!(cfg.remote_host(Role::Source), &HostName::from("beta"));
        assert_eq!(cfg.remote_host(Role::Destination), &HostName::from("alpha"));
    }

    #[test]
    fn runtime_paths_default_under_state_dir() {
        let cfg = minimal_config();
        let home = Path::new("/home/op");
        assert_eq!(
            cfg.log_path_at(home),
            PathBuf::from("/home/op/.duplex/run.log")
        );
        assert_eq!(
            cfg.lock_path_at(home),
            PathBuf::from("/home/op/.duplex/duplex.lock")
        );
        assert_eq!(
            cfg.heartbeat_path_at(home),
            PathBuf::from("/home/op/.duplex/heartbeat.json")
        );
    }

    #[test]
    fn runtime_path_override_wins() {
        let mut cfg = minimal_config();
        cfg.paths.lock = Some(PathBuf::from("/run/lock/duplex.lock"));
        assert_eq!(
            cfg.lock_path_at(Path::new("/home/op")),
            PathBuf::from("/run/lock/duplex.lock")
        );
    }
}
