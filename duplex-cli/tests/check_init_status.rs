//! `duplex init`, `duplex check`, and `duplex status` against a throwaway
//! home directory, with the hostname pinned so role resolution is stable.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

use duplex_core::config;
use tempfile::TempDir;

fn duplex_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("duplex"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("DUPLEX_HOSTNAME", "alpha")
        .env_remove("DUPLEX_CONFIG");
    cmd
}

fn write_config(home: &Path, dest_host: &str) -> PathBuf {
    let tree = home.join("tree");
    fs::create_dir_all(&tree).expect("create tree");

    let dir = config::state_dir_at(home);
    fs::create_dir_all(&dir).expect("create state dir");
    let path = config::config_path_at(home);
    fs::write(
        &path,
        format!(
            "source_host: alpha\n\
             dest_host: {dest_host}\n\
             source_path: {tree}\n\
             dest_path: /srv/mirror\n\
             alert_recipient: ops@example.com\n\
             transfer:\n\
             \x20 tool: \"true\"\n\
             \x20 remote_shell: \"true\"\n\
             features:\n\
             \x20 mount_check: false\n",
            tree = tree.display()
        ),
    )
    .expect("write config");
    path
}

#[test]
fn init_refuses_to_clobber_then_force_overwrites() {
    let home = TempDir::new().expect("home");

    duplex_cmd(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("Wrote starter config"));

    duplex_cmd(home.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(contains("pass --force"));

    duplex_cmd(home.path())
        .args(["init", "--force"])
        .assert()
        .success();

    // The starter file is valid as written and resolves this host as source.
    duplex_cmd(home.path())
        .arg("check")
        .assert()
        .success()
        .stdout(contains("config valid"))
        .stdout(contains("role: source"));
}

#[test]
fn check_reports_identical_hosts() {
    let home = TempDir::new().expect("home");
    write_config(home.path(), "alpha");

    duplex_cmd(home.path())
        .arg("check")
        .assert()
        .failure()
        .code(1)
        .stdout(contains("must differ"))
        .stdout(contains("problem(s) found"));
}

#[test]
fn check_fails_without_a_config() {
    let home = TempDir::new().expect("home");

    duplex_cmd(home.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(contains("config"));
}

#[test]
fn status_before_and_after_a_run() {
    let home = TempDir::new().expect("home");
    write_config(home.path(), "beta");

    duplex_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("no heartbeat recorded yet"))
        .stdout(contains("run log is empty"));

    duplex_cmd(home.path()).arg("run").assert().success();

    duplex_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("SUCCESS"))
        .stdout(contains("recent run-log lines:"));
}

#[test]
fn status_json_carries_the_heartbeat() {
    let home = TempDir::new().expect("home");
    write_config(home.path(), "beta");
    duplex_cmd(home.path()).arg("run").assert().success();

    duplex_cmd(home.path())
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(contains("\"status\": \"success\""))
        .stdout(contains("\"log_tail\""));
}
