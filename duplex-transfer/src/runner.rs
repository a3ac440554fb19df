//! Child-process runner - spawn, stream, enforce the deadline, reap.
//!
//! The child's stdout and stderr are pumped by two reader threads over one
//! channel, so the wait loop can poll the deadline and the shutdown flag
//! between lines instead of blocking until exit. A child past its deadline
//! (or caught by an interrupt) is killed and reaped; its exit status is
//! still captured through the normal path.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

use tracing::{debug, warn};

use duplex_core::config::SyncConfig;
use duplex_core::types::{Direction, Role, SyncResult};

use crate::command::{endpoints, transfer_args};

/// Exit code reported when the child binary cannot be launched.
pub const COMMAND_NOT_FOUND_EXIT: i32 = 127;

/// Ceiling for synthesized exit codes.
pub const MAX_EXIT_CODE: i32 = 255;

/// How many trailing output lines a result keeps for alert bodies.
pub const EXCERPT_LINES: usize = 10;

/// Deadline and shutdown-flag poll interval while a child runs.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// How the wait loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The child exited on its own.
    Completed,
    /// The deadline expired and the child was killed.
    TimedOut,
    /// The shutdown flag was observed and the child was killed.
    Interrupted,
}

/// One child run: the reaped exit code, how the wait ended, and the last
/// output lines.
#[derive(Debug, Clone)]
pub struct ToolRun {
    pub exit_code: i32,
    pub end: RunEnd,
    pub excerpt: Vec<String>,
}

/// [`ToolRun`] folded into the domain result for one transfer direction.
#[derive(Debug, Clone)]
pub struct DirectionRun {
    pub result: SyncResult,
    pub end: RunEnd,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

enum StreamMessage {
    Line(String),
    Finished,
}

fn spawn_reader(
    stream: impl Read + Send + 'static,
    sender: mpsc::Sender<StreamMessage>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if sender.send(StreamMessage::Line(line)).is_err() {
                        return;
                    }
                }
                Err(_) => break,
            }
        }
        let _ = sender.send(StreamMessage::Finished);
    })
}

/// Run `command` to completion, streaming its merged output to `sink` line
/// by line. A launch failure becomes exit code 127 rather than an error:
/// every invocation yields a status the caller records verbatim.
pub fn run_command(
    mut command: Command,
    deadline: Duration,
    sink: &mut dyn FnMut(&str),
    interrupt: &dyn Fn() -> bool,
) -> ToolRun {
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(error) => {
            let program = command.get_program().to_string_lossy().into_owned();
            let line = format!("failed to launch {program}: {error}");
            warn!("{line}");
            sink(&line);
            return ToolRun {
                exit_code: COMMAND_NOT_FOUND_EXIT,
                end: RunEnd::Completed,
                excerpt: vec![line],
            };
        }
    };

    let (sender, receiver) = mpsc::channel();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, sender.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, sender.clone()));
    }
    drop(sender);

    let started = Instant::now();
    let mut open = readers.len();
    let mut excerpt = ExcerptBuffer::new(EXCERPT_LINES);
    let mut end = RunEnd::Completed;

    while open > 0 {
        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(StreamMessage::Line(line)) => {
                excerpt.push(&line);
                sink(&line);
            }
            Ok(StreamMessage::Finished) => open -= 1,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if end == RunEnd::Completed {
            if interrupt() {
                end = RunEnd::Interrupted;
                kill(&mut child);
            } else if started.elapsed() >= deadline && !already_exited(&mut child) {
                end = RunEnd::TimedOut;
                kill(&mut child);
            }
        }
    }

    for reader in readers {
        let _ = reader.join();
    }

    let exit_code = match child.wait() {
        Ok(status) => map_exit_status(status),
        Err(error) => {
            warn!("failed to reap child: {error}");
            MAX_EXIT_CODE
        }
    };

    ToolRun { exit_code, end, excerpt: excerpt.into_lines() }
}

/// Execute one direction's transfer, logging every tool line through `sink`.
pub fn run_direction(
    cfg: &SyncConfig,
    role: Role,
    direction: Direction,
    dry_run: bool,
    sink: &mut dyn FnMut(&str),
    interrupt: &dyn Fn() -> bool,
) -> DirectionRun {
    let (from, to) = endpoints(cfg, role, direction);
    debug!("{direction} transfer: {from} -> {to}");

    let mut command = Command::new(&cfg.transfer.tool);
    command.args(transfer_args(&cfg.transfer, dry_run, &from, &to));

    let run = run_command(command, cfg.timeouts.transfer(), sink, interrupt);
    DirectionRun {
        result: SyncResult {
            direction,
            source: from.render_source(),
            dest: to.render(),
            exit_code: run.exit_code,
            excerpt: run.excerpt,
        },
        end: run.end,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Exit code from a reaped status: the code itself, `128 + signal` for a
/// signal death, `MAX_EXIT_CODE` when the platform reports neither.
pub fn map_exit_status(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        if let Some(signal) = status.signal() {
            return (128 + signal).min(MAX_EXIT_CODE);
        }
    }
    MAX_EXIT_CODE
}

fn already_exited(child: &mut Child) -> bool {
    matches!(child.try_wait(), Ok(Some(_)))
}

fn kill(child: &mut Child) {
    if let Err(error) = child.kill() {
        debug!("failed to kill child: {error}");
    }
}

struct ExcerptBuffer {
    cap: usize,
    lines: VecDeque<String>,
}

impl ExcerptBuffer {
    fn new(cap: usize) -> Self {
        Self { cap, lines: VecDeque::with_capacity(cap) }
    }

    fn push(&mut self, line: &str) {
        if self.lines.len() == self.cap {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_owned());
    }

    fn into_lines(self) -> Vec<String> {
        self.lines.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    fn never() -> impl Fn() -> bool {
        || false
    }

    fn run_collecting(cmd: Command, deadline: Duration) -> (ToolRun, Vec<String>) {
        let mut lines = Vec::new();
        let run = run_command(cmd, deadline, &mut |line| lines.push(line.to_owned()), &never());
        (run, lines)
    }

    #[test]
    fn captures_exit_code_verbatim() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (run, lines) = run_collecting(
            sh("echo sending; echo 'rsync error: some files vanished' 1>&2; exit 23"),
            Duration::from_secs(5),
        );
        assert_eq!(run.exit_code, 23);
        assert_eq!(run.end, RunEnd::Completed);
        assert!(lines.iter().any(|l| l == "sending"));
        assert!(lines.iter().any(|l| l.contains("files vanished")));
    }

    #[test]
    fn zero_exit_is_zero() {
        let (run, _) = run_collecting(sh("exit 0"), Duration::from_secs(5));
        assert_eq!(run.exit_code, 0);
        assert_eq!(run.end, RunEnd::Completed);
    }

    #[test]
    fn missing_binary_reports_127() {
        let (run, lines) =
            run_collecting(Command::new("/nonexistent/duplex-test-tool"), Duration::from_secs(5));
        assert_eq!(run.exit_code, COMMAND_NOT_FOUND_EXIT);
        assert_eq!(run.end, RunEnd::Completed);
        assert!(lines[0].contains("failed to launch"));
        assert_eq!(run.excerpt, lines);
    }

    #[test]
    fn deadline_kills_the_child() {
        let (run, _) = run_collecting(sh("sleep 5"), Duration::from_millis(100));
        assert_eq!(run.end, RunEnd::TimedOut);
        #[cfg(unix)]
        assert_eq!(run.exit_code, 128 + 9, "SIGKILL death maps to 137");
    }

    #[test]
    fn interrupt_kills_the_child() {
        let mut lines = Vec::new();
        let run = run_command(
            sh("sleep 5"),
            Duration::from_secs(30),
            &mut |line| lines.push(line.to_owned()),
            &|| true,
        );
        assert_eq!(run.end, RunEnd::Interrupted);
        assert_ne!(run.exit_code, 0);
    }

    #[test]
    fn excerpt_keeps_the_last_lines() {
        let script = "for i in 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15; do echo line $i; done";
        let (run, lines) = run_collecting(sh(script), Duration::from_secs(5));
        assert_eq!(lines.len(), 15);
        assert_eq!(run.excerpt.len(), EXCERPT_LINES);
        assert_eq!(run.excerpt[0], "line 6");
        assert_eq!(run.excerpt[9], "line 15");
    }

    #[test]
    fn signal_death_maps_to_128_plus_signal() {
        #[cfg(unix)]
        {
            let (run, _) = run_collecting(sh("kill -TERM $$"), Duration::from_secs(5));
            assert_eq!(run.exit_code, 128 + 15);
            assert_eq!(run.end, RunEnd::Completed);
        }
    }

    #[test]
    fn run_direction_builds_and_captures() {
        let mut cfg: SyncConfig = serde_yaml::from_str(
            r#"
source_host: alpha
dest_host: beta
source_path: /srv/data
dest_path: /mnt/mirror/data
alert_recipient: ops@example.com
mount:
  point: /mnt/mirror
"#,
        )
        .expect("parse fixture");
        // `echo` stands in for the transfer tool: it prints the argv it was
        // given and exits 0, which is all this test needs.
        cfg.transfer.tool = "echo".to_owned();

        let mut lines = Vec::new();
        let run = run_direction(
            &cfg,
            Role::Source,
            Direction::Push,
            true,
            &mut |line| lines.push(line.to_owned()),
            &never(),
        );
        assert_eq!(run.result.exit_code, 0);
        assert_eq!(run.result.direction, Direction::Push);
        assert_eq!(run.result.source, "/srv/data/");
        assert_eq!(run.result.dest, "beta:/mnt/mirror/data");
        assert_eq!(run.end, RunEnd::Completed);
        let argv_line = &lines[0];
        assert!(argv_line.contains("-n"), "dry run flag missing: {argv_line}");
        assert!(argv_line.contains("beta:/mnt/mirror/data"));
    }
}
