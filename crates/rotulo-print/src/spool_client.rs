// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CUPS spool fallback channel.
//
// Pipes the rendered payload into `lp -d <queue> -n <copies> -o raw`.
// The queue name is the printer's display name; `-o raw` keeps CUPS from
// filtering the ZPL. A single deadline covers feeding the payload and
// waiting for exit, so one bad queue cannot stall a whole batch.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use rotulo_core::error::{Result, RotuloError};

/// Deadline for one `lp` submission.
pub const SPOOL_TIMEOUT: Duration = Duration::from_secs(3);

/// Submits payloads to locally registered print queues.
#[derive(Debug, Clone)]
pub struct SpoolClient {
    program: String,
    timeout: Duration,
}

impl Default for SpoolClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SpoolClient {
    pub fn new() -> Self {
        Self {
            program: "lp".into(),
            timeout: SPOOL_TIMEOUT,
        }
    }

    /// Spool client over a different submitter binary with a custom
    /// deadline. Tests substitute argument-ignoring stand-ins here.
    pub fn with_command(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Submit a payload to `queue` with the given copy count.
    pub async fn submit(&self, queue: &str, payload: &str, copies: u32) -> Result<()> {
        debug!(queue, copies, bytes = payload.len(), "submitting to local spool");
        let args = [
            "-d".to_string(),
            queue.to_string(),
            "-n".to_string(),
            copies.to_string(),
            "-o".to_string(),
            "raw".to_string(),
        ];
        run_piped(&self.program, &args, payload, self.timeout).await?;
        info!(queue, copies, "spool submission accepted");
        Ok(())
    }
}

/// Spawn a command, feed `payload` to its stdin, and wait for exit, all
/// under one `timeout`. A non-zero exit reports captured stderr; hitting
/// the deadline kills the child. A clean exit with an unfed payload is
/// still a failure.
async fn run_piped(
    program: &str,
    args: &[String],
    payload: &str,
    timeout: Duration,
) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| RotuloError::Spool(format!("spawn {program}: {e}")))?;

    let stdin = child.stdin.take();
    // The deadline must cover the feed as well as the wait: a child that
    // stops draining its pipe blocks write_all for its whole lifetime
    // once the payload outgrows the pipe buffer.
    let submission = async {
        let mut feed_error = None;
        if let Some(mut stdin) = stdin {
            if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                // an early-exiting child breaks the pipe; its exit
                // status carries the real diagnostic, so judgment waits
                debug!(error = %e, "spool stdin feed interrupted");
                feed_error = Some(e);
            }
            // stdin drops here; the child sees EOF
        }
        child
            .wait_with_output()
            .await
            .map(|output| (output, feed_error))
            .map_err(|e| RotuloError::Spool(format!("wait for {program}: {e}")))
    };

    let (output, feed_error) = match tokio::time::timeout(timeout, submission).await {
        Ok(waited) => waited?,
        Err(_) => {
            return Err(RotuloError::Spool(format!(
                "{program} timed out after {}ms",
                timeout.as_millis()
            )));
        }
    };

    if output.status.success() {
        // a clean exit cannot vouch for a payload the child never took
        return match feed_error {
            None => Ok(()),
            Some(e) => Err(RotuloError::Spool(format!("feed {program}: {e}"))),
        };
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = if stderr.trim().is_empty() {
        format!("{program} exited with {}", output.status)
    } else {
        stderr.trim().to_string()
    };
    Err(RotuloError::Spool(detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    /// Executable stand-in for `lp`: accepts any arguments, runs `script`.
    fn fake_lp(dir: &TempDir, script: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join("fake-lp");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn clean_exit_is_success() {
        run_piped("sh", &sh("cat > /dev/null"), "^XA^XZ", Duration::from_secs(2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr() {
        let err = run_piped(
            "sh",
            &sh("echo queue does not exist >&2; exit 3"),
            "",
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("queue does not exist"));
    }

    #[tokio::test]
    async fn nonzero_exit_without_stderr_reports_status() {
        let err = run_piped("sh", &sh("exit 2"), "x", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[tokio::test]
    async fn hung_submission_is_killed_at_deadline() {
        let err = run_piped("sh", &sh("sleep 10"), "", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn stalled_feed_is_killed_at_deadline() {
        // payload past the pipe buffer, child never drains it: the feed
        // itself blocks and must hit the deadline, not the child's exit
        let payload = "x".repeat(256 * 1024);
        let started = Instant::now();
        let err = run_piped("sh", &sh("sleep 10"), &payload, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn unread_payload_with_clean_exit_is_a_failure() {
        // exits 0 without draining stdin; a payload past the pipe
        // buffer can never have reached the queue
        let payload = "x".repeat(256 * 1024);
        let err = run_piped("sh", &sh("exit 0"), &payload, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("feed"));
    }

    #[tokio::test]
    async fn missing_binary_reports_spawn_error() {
        let err = run_piped(
            "rotulo-test-no-such-binary",
            &[],
            "",
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("spawn"));
    }

    #[tokio::test]
    async fn submit_builds_lp_style_arguments() {
        let dir = TempDir::new().unwrap();
        let recorded = dir.path().join("argv");
        let client = SpoolClient::with_command(
            fake_lp(
                &dir,
                &format!("printf '%s ' \"$@\" > '{}'\ncat > /dev/null", recorded.display()),
            ),
            Duration::from_secs(2),
        );
        client.submit("Cozinha", "^XA^XZ", 2).await.unwrap();

        let argv = std::fs::read_to_string(&recorded).unwrap();
        assert_eq!(argv.trim_end(), "-d Cozinha -n 2 -o raw");
    }
}
