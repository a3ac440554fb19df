//! MTA delivery - pipe a composed message to the configured mail command.
//!
//! The orchestrator never retries delivery and never lets it fail a run;
//! errors here surface as one warning in the run log. `sendmail -t` is the
//! default command, so recipients come from the composed `To:` header.

use std::io::Write;
use std::process::{Command, Stdio};

use duplex_core::config::MailerSpec;
use duplex_core::types::HostName;

use crate::error::AlertError;
use crate::event::AlertEvent;

/// Sender over one configured MTA command.
pub struct Mailer {
    spec: MailerSpec,
    default_from: String,
}

impl Mailer {
    pub fn new(spec: MailerSpec, local_host: &HostName) -> Self {
        let default_from = format!("duplex@{}", local_host.short());
        Self { spec, default_from }
    }

    /// The full message piped to the MTA: headers, blank line, body.
    pub fn compose(&self, event: &AlertEvent) -> String {
        let from = self.spec.from.as_deref().unwrap_or(&self.default_from);
        format!(
            "To: {}\nFrom: {}\nSubject: {}\n\n{}\n",
            event.recipient, from, event.subject, event.body
        )
    }

    /// Deliver `event` through the MTA. One attempt, no retry.
    pub fn send(&self, event: &AlertEvent) -> Result<(), AlertError> {
        let message = self.compose(event);

        let mut child = Command::new(&self.spec.command)
            .args(&self.spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.delivery_error(format!("failed to launch: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.as_bytes())
                .map_err(|e| self.delivery_error(format!("failed to write message: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| self.delivery_error(format!("failed to wait: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.delivery_error(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn delivery_error(&self, detail: String) -> AlertError {
        AlertError::Delivery { command: self.spec.command.clone(), detail }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use duplex_core::types::Severity;
    use tempfile::TempDir;

    fn event() -> AlertEvent {
        AlertEvent {
            subject: "[duplex] sync failed on alpha".into(),
            body: "push: exit 23\n".into(),
            severity: Severity::High,
            recipient: "ops@example.com".into(),
        }
    }

    fn mailer(spec: MailerSpec) -> Mailer {
        Mailer::new(spec, &HostName::from("alpha.example.com"))
    }

    #[test]
    fn compose_builds_headers_then_body() {
        let m = mailer(MailerSpec::default());
        let message = m.compose(&event());
        assert_eq!(
            message,
            "To: ops@example.com\nFrom: duplex@alpha\nSubject: [duplex] sync failed on alpha\n\npush: exit 23\n\n"
        );
    }

    #[test]
    fn configured_from_overrides_default() {
        let spec = MailerSpec { from: Some("sync-robot@example.com".into()), ..MailerSpec::default() };
        let message = mailer(spec).compose(&event());
        assert!(message.contains("From: sync-robot@example.com\n"));
    }

    // `sh -c 'cat > file'` stands in for the MTA: it consumes stdin the way
    // sendmail would and lets the test inspect what was delivered.
    #[test]
    fn send_pipes_the_message_to_the_command() {
        let dir = TempDir::new().expect("tempdir");
        let capture = dir.path().join("mail.txt");
        let spec = MailerSpec {
            command: "sh".into(),
            args: vec!["-c".into(), format!("cat > {}", capture.display())],
            from: None,
        };
        mailer(spec).send(&event()).expect("send");

        let delivered = std::fs::read_to_string(&capture).expect("read capture");
        assert!(delivered.starts_with("To: ops@example.com\n"));
        assert!(delivered.contains("Subject: [duplex] sync failed on alpha\n"));
        assert!(delivered.ends_with("push: exit 23\n\n"));
    }

    #[test]
    fn nonzero_exit_is_a_delivery_error() {
        let spec = MailerSpec { command: "false".into(), args: vec![], from: None };
        let err = mailer(spec).send(&event()).unwrap_err();
        assert!(matches!(err, AlertError::Delivery { .. }));
    }

    #[test]
    fn missing_command_is_a_delivery_error() {
        let spec = MailerSpec {
            command: "/nonexistent/duplex-test-mta".into(),
            args: vec![],
            from: None,
        };
        let err = mailer(spec).send(&event()).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("failed to launch"), "error was: {text}");
    }
}
