//! `duplex init` - write a commented starter config.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

/// Starter config: loadable as written, with the optional sections shown
/// as comments carrying their defaults.
const STARTER: &str = r#"# duplex configuration for one synchronized pair of directory trees.
#
# The two hosts must be distinct, and the host running duplex must be one
# of them. Push always copies source_path on source_host to dest_path on
# dest_host; pull copies the other way.

source_host: alpha
dest_host: beta
source_path: /srv/data
dest_path: /srv/data

# Where alert mail goes. Required while the email feature is on.
alert_recipient: ops@example.com

# Alert when the post-run file counts differ by strictly more than this.
#count_diff_threshold: 50

# Alert when the recent-error scan matches at least this many log lines.
#max_recent_errors: 5

#transfer:
#  tool: rsync
#  remote_shell: ssh
#  archive: true
#  verbose: true
#  compress: true
#  checksum: false            # true switches change detection to checksums
#  delete_extraneous: false   # true passes --delete
#  exclude: [".tmp/", "*.partial"]

features:
  # Enable after filling in the mount section below.
  mount_check: false
  #email: true
  #heartbeat: true
  #notify_on_success: false
  #mode: bidirectional        # bidirectional | push | pull

# Required when features.mount_check is true.
#mount:
#  point: /mnt/mirror
#  fstype: nfs

#timeouts:
#  transfer_secs: 3600
#  remote_secs: 60

#mailer:
#  command: sendmail
#  args: ["-t"]
#  from: duplex@alpha

# Runtime files default under ~/.duplex/.
#paths:
#  log: /var/log/duplex/run.log
#  lock: /run/lock/duplex.lock
#  heartbeat: /var/lib/duplex/heartbeat.json
"#;

/// Arguments for `duplex init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the config (defaults to $DUPLEX_CONFIG, else
    /// ~/.duplex/config.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Overwrite an existing config.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let path = super::resolve_config_path(self.config.as_deref())?;

        if path.exists() && !self.force {
            bail!(
                "config already exists at {}; pass --force to overwrite",
                path.display()
            );
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, STARTER)
            .with_context(|| format!("failed to write {}", path.display()))?;

        println!("✓ Wrote starter config to {}", path.display());
        println!("  Edit the hosts and paths, then try `duplex check`.");
        Ok(())
    }
}
