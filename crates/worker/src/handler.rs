//! Job execution.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use dispatch_core::job::Job;
use tokio::process::Command;

/// Failure reasons longer than this keep only their tail.
const MAX_REASON_CHARS: usize = 1024;

/// Runs one claimed job. `Err` carries the failure reason reported back.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), String>;
}

/// Runs `payload.command` through `sh -c`.
///
/// Exit status 0 completes the job. A non-zero exit fails it with the tail
/// of stderr; a run that exceeds the timeout is killed and failed.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    timeout: Duration,
}

impl CommandHandler {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl JobHandler for CommandHandler {
    async fn handle(&self, job: &Job) -> Result<(), String> {
        let command = job
            .payload
            .get("command")
            .and_then(|c| c.as_str())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| "payload has no command".to_string())?;

        tracing::info!(job_id = %job.id, command, "Executing job");

        let run = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to spawn command");
                return Err(format!("failed to spawn command: {e}"));
            }
            Err(_) => {
                tracing::warn!(job_id = %job.id, timeout_secs = self.timeout.as_secs(), "Command timed out");
                return Err(format!("timed out after {}s", self.timeout.as_secs()));
            }
        };

        let exit_code = output.status.code();
        if output.status.success() {
            tracing::info!(job_id = %job.id, "Command succeeded");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        tracing::info!(job_id = %job.id, exit_code = ?exit_code, "Command failed");
        if stderr.is_empty() {
            Err(match exit_code {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            })
        } else {
            Err(tail(stderr, MAX_REASON_CHARS).to_string())
        }
    }
}

/// Last `max` characters of `s`.
fn tail(s: &str, max: usize) -> &str {
    let skip = s.chars().count().saturating_sub(max);
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
