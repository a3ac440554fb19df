//! Recent-error scan over the run log.
//!
//! Looks back over the last [`SCAN_WINDOW_LINES`] lines for a fixed set of
//! fault signatures, matched as case-insensitive substrings. The result is
//! strictly advisory: callers alert when the match count meets or exceeds
//! their threshold and then carry on regardless.

use duplex_core::runlog::RunLog;

use crate::PreflightError;

/// Fault signatures, matched case-insensitively anywhere in a line.
pub const ERROR_PATTERNS: &[&str] = &[
    "timeout",
    "permission denied",
    "connection refused",
    "no such file or directory",
    "failed",
];

/// How far back the scan looks.
pub const SCAN_WINDOW_LINES: usize = 100;

/// How many matched lines a report carries at most (the most recent ones).
pub const REPORT_LINE_CAP: usize = 10;

/// Result of one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorScan {
    /// Lines inspected (at most [`SCAN_WINDOW_LINES`]).
    pub scanned: usize,
    /// Total lines that matched a signature.
    pub matched: usize,
    /// The most recent matched lines, capped to [`REPORT_LINE_CAP`],
    /// oldest first.
    pub recent: Vec<String>,
}

impl ErrorScan {
    /// Whether the match count meets or exceeds `max`. An empty scan never
    /// alerts, whatever the threshold.
    pub fn meets_threshold(&self, max: usize) -> bool {
        self.matched > 0 && self.matched >= max
    }
}

/// Scan the last [`SCAN_WINDOW_LINES`] lines of `log`.
pub fn scan_recent_errors(log: &RunLog) -> Result<ErrorScan, PreflightError> {
    let lines = log.tail(SCAN_WINDOW_LINES)?;
    Ok(scan_lines(&lines))
}

/// Pure scan over already-read lines.
pub fn scan_lines(lines: &[String]) -> ErrorScan {
    let mut matched_lines: Vec<String> = lines
        .iter()
        .filter(|line| {
            let lower = line.to_lowercase();
            ERROR_PATTERNS.iter().any(|p| lower.contains(p))
        })
        .cloned()
        .collect();

    let matched = matched_lines.len();
    let start = matched.saturating_sub(REPORT_LINE_CAP);
    ErrorScan {
        scanned: lines.len(),
        matched,
        recent: matched_lines.split_off(start),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    #[rstest]
    #[case("2024-03-01 14:30:05: ssh: connect to host beta: Connection refused")]
    #[case("2024-03-01 14:30:05: rsync error: timeout in data send/receive")]
    #[case("2024-03-01 14:30:05: rsync: opendir failed: Permission denied (13)")]
    #[case("2024-03-01 14:30:05: rsync: link_stat: No such file or directory (2)")]
    #[case("2024-03-01 14:30:05: push FAILED with exit code 23")]
    fn each_signature_matches(#[case] line: &str) {
        let scan = scan_lines(&lines(&[line]));
        assert_eq!(scan.matched, 1, "line should match: {line}");
    }

    #[test]
    fn clean_lines_do_not_match() {
        let scan = scan_lines(&lines(&[
            "2024-03-01 14:30:05: starting sync",
            "2024-03-01 14:30:06: push completed",
            "2024-03-01 14:30:07: sync completed",
        ]));
        assert_eq!(scan.matched, 0);
        assert!(scan.recent.is_empty());
    }

    #[test]
    fn report_caps_at_most_recent_ten() {
        let raw: Vec<String> = (1..=15)
            .map(|i| format!("2024-03-01 14:30:{i:02}: transfer {i} failed"))
            .collect();
        let scan = scan_lines(&raw);
        assert_eq!(scan.matched, 15);
        assert_eq!(scan.recent.len(), REPORT_LINE_CAP);
        assert!(scan.recent[0].contains("transfer 6 failed"));
        assert!(scan.recent[9].contains("transfer 15 failed"));
    }

    #[test]
    fn threshold_is_meet_or_exceed() {
        let raw = lines(&[
            "a failed", "b failed", "c failed",
        ]);
        let scan = scan_lines(&raw);
        assert!(scan.meets_threshold(3));
        assert!(scan.meets_threshold(2));
        assert!(!scan.meets_threshold(4));
    }

    #[test]
    fn empty_scan_never_meets_threshold() {
        let scan = scan_lines(&[]);
        assert!(!scan.meets_threshold(0));
        assert!(!scan.meets_threshold(1));
    }

    #[test]
    fn scan_reads_only_the_window() {
        let dir = TempDir::new().expect("tempdir");
        let log = RunLog::new(dir.path().join("run.log"));
        // 150 old failing lines, then enough clean lines to push all but
        // ten of them out of the 100-line window.
        for i in 0..150 {
            log.append(&format!("old transfer {i} failed")).expect("append");
        }
        for i in 0..90 {
            log.append(&format!("clean line {i}")).expect("append");
        }
        let scan = scan_recent_errors(&log).expect("scan");
        assert_eq!(scan.scanned, SCAN_WINDOW_LINES);
        assert_eq!(scan.matched, 10);
    }

    #[test]
    fn missing_log_scans_empty() {
        let dir = TempDir::new().expect("tempdir");
        let log = RunLog::new(dir.path().join("absent.log"));
        let scan = scan_recent_errors(&log).expect("scan");
        assert_eq!(scan.scanned, 0);
        assert_eq!(scan.matched, 0);
    }
}
