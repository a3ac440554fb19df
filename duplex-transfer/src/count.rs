//! File counting on both ends of the pair.
//!
//! The counts feed the post-transfer drift comparison, which is advisory:
//! every failure here degrades to 0 with a logged warning so the run keeps
//! going, and the threshold rule decides whether the resulting drift is
//! worth an alert.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::warn;

use duplex_core::types::HostName;

use crate::command::remote_count_script;
use crate::runner::{run_command, RunEnd};

/// Count regular files under `root`, walking subdirectories. Symlinks are
/// not followed, matching `find -type f` on the remote side. Unreadable
/// directories are skipped with a warning; a missing root counts 0.
pub fn count_local(root: &Path) -> u64 {
    let mut pending = vec![root.to_path_buf()];
    let mut count = 0u64;
    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) => {
                warn!("cannot read {}: {error}", dir.display());
                continue;
            }
        };
        for entry in entries.filter_map(|e| e.ok()) {
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => pending.push(entry.path()),
                Ok(kind) if kind.is_file() => count += 1,
                _ => {}
            }
        }
    }
    count
}

/// Count regular files under `path` on `host`, through the remote shell.
///
/// Runs `find <path> -type f | wc -l` remotely with `timeout` and parses
/// the trailing integer. Launch failure, timeout, interruption, a nonzero
/// exit, or unparseable output all degrade to 0.
pub fn count_remote(
    shell: &str,
    host: &HostName,
    path: &Path,
    timeout: Duration,
    interrupt: &dyn Fn() -> bool,
) -> u64 {
    let mut command = Command::new(shell);
    command.arg(&host.0);
    command.arg(remote_count_script(path));

    let mut output = String::new();
    let run = run_command(
        command,
        timeout,
        &mut |line| {
            output.push_str(line);
            output.push('\n');
        },
        interrupt,
    );

    if run.end != RunEnd::Completed {
        warn!("remote count on {host} did not finish ({:?}); counting 0", run.end);
        return 0;
    }
    if run.exit_code != 0 {
        warn!("remote count on {host} exited {}; counting 0", run.exit_code);
        return 0;
    }
    match output.split_whitespace().last().and_then(|t| t.parse::<u64>().ok()) {
        Some(n) => n,
        None => {
            warn!("remote count on {host} produced no number; counting 0");
            0
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populate(dir: &TempDir) {
        std::fs::write(dir.path().join("a.txt"), "a").expect("write");
        std::fs::write(dir.path().join("b.txt"), "b").expect("write");
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).expect("mkdir");
        std::fs::write(nested.join("c.txt"), "c").expect("write");
    }

    #[test]
    fn local_count_walks_subdirectories() {
        let dir = TempDir::new().expect("tempdir");
        populate(&dir);
        assert_eq!(count_local(dir.path()), 3);
    }

    #[test]
    fn local_count_of_missing_root_is_zero() {
        let dir = TempDir::new().expect("tempdir");
        assert_eq!(count_local(&dir.path().join("absent")), 0);
    }

    #[cfg(unix)]
    #[test]
    fn local_count_skips_symlinks() {
        let dir = TempDir::new().expect("tempdir");
        populate(&dir);
        std::os::unix::fs::symlink(dir.path().join("a.txt"), dir.path().join("link.txt"))
            .expect("symlink");
        assert_eq!(count_local(dir.path()), 3);
    }

    // `sh -c` stands in for `ssh <host>`: both take one command string and
    // run it through a shell, which is exactly what count_remote assumes.
    #[test]
    fn remote_count_through_a_shell() {
        let dir = TempDir::new().expect("tempdir");
        populate(&dir);
        let n = count_remote(
            "sh",
            &HostName::from("-c"),
            dir.path(),
            Duration::from_secs(10),
            &|| false,
        );
        assert_eq!(n, 3);
    }

    #[test]
    fn remote_count_degrades_on_nonzero_exit() {
        let n = count_remote(
            "false",
            &HostName::from("beta"),
            Path::new("/srv/data"),
            Duration::from_secs(5),
            &|| false,
        );
        assert_eq!(n, 0);
    }

    #[test]
    fn remote_count_degrades_on_missing_shell() {
        let n = count_remote(
            "/nonexistent/duplex-test-shell",
            &HostName::from("beta"),
            Path::new("/srv/data"),
            Duration::from_secs(5),
            &|| false,
        );
        assert_eq!(n, 0);
    }

    #[test]
    fn remote_count_degrades_on_unparseable_output() {
        // `echo` exits 0 but its output ends with the script text, not a number.
        let n = count_remote(
            "echo",
            &HostName::from("beta"),
            Path::new("/srv/data"),
            Duration::from_secs(5),
            &|| false,
        );
        assert_eq!(n, 0);
    }

    #[test]
    fn remote_count_degrades_on_interrupt() {
        let n = count_remote(
            "sh",
            &HostName::from("-c"),
            Path::new("/srv/data"),
            Duration::from_secs(5),
            &|| true,
        );
        assert_eq!(n, 0);
    }
}
