// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess CLI backend.
//!
//! Spawns an agent CLI in print mode, pipes stdio, and enforces timeout and
//! cancellation. Cancellation delivers SIGTERM exactly once; the result is
//! classified from the abort flag and exit status after the process ends.

use super::output::{parse_agent_output, parse_usage};
use super::{Backend, ExecStatus, ExecuteRequest, ExecuteResult};
use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// Backend that runs a CLI binary per task.
#[derive(Debug, Clone)]
pub struct CliBackend {
    id: String,
    bin: String,
}

impl CliBackend {
    /// Create a backend with an explicit binary path.
    pub fn new(id: impl Into<String>, bin: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bin: bin.into(),
        }
    }

    /// The Claude CLI backend, honoring `CLAUDE_BIN`.
    pub fn claude() -> Self {
        Self::new("claude-cli", crate::env::claude_bin())
    }

    fn build_command(&self, req: &ExecuteRequest) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-p").arg(&req.prompt);
        if let Some(model) = &req.model {
            cmd.arg("--model").arg(model);
        }
        cmd.arg("--output-format").arg("json");
        if !req.allowed_tools.is_empty() {
            cmd.arg("--allowedTools").arg(req.allowed_tools.join(","));
        }
        if let Some(cwd) = &req.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Send SIGTERM to a child process, if it still has a pid.
fn send_sigterm(child: &Child) {
    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::warn!(pid, error = %e, "failed to deliver SIGTERM");
        }
    }
}

/// Drain an async reader to a string, lossily.
async fn read_stream<R: tokio::io::AsyncRead + Unpin>(reader: Option<R>) -> String {
    let Some(mut reader) = reader else {
        return String::new();
    };
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

#[async_trait]
impl Backend for CliBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn execute(&self, req: ExecuteRequest) -> ExecuteResult {
        let mut child = match self.build_command(&req).spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecuteResult::failed(format!("failed to spawn {}: {}", self.bin, e));
            }
        };

        tracing::debug!(
            task_id = %req.task_id,
            backend = %self.id,
            bin = %self.bin,
            "agent subprocess spawned"
        );

        let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        let timeout = tokio::time::sleep(req.timeout);
        tokio::pin!(timeout);

        let mut aborted = false;
        let mut timed_out = false;

        let exit = loop {
            tokio::select! {
                status = child.wait() => break status,
                _ = req.cancel.cancelled(), if !aborted => {
                    aborted = true;
                    send_sigterm(&child);
                }
                _ = &mut timeout, if !timed_out && !aborted => {
                    timed_out = true;
                    send_sigterm(&child);
                }
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        if aborted {
            tracing::info!(task_id = %req.task_id, "agent subprocess cancelled");
            return ExecuteResult::cancelled();
        }
        if timed_out {
            return ExecuteResult::failed(format!(
                "agent timed out after {}s",
                req.timeout.as_secs()
            ));
        }

        let status = match exit {
            Ok(status) => status,
            Err(e) => return ExecuteResult::failed(format!("wait failed: {}", e)),
        };

        if !status.success() {
            let message = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return ExecuteResult::failed(format!(
                "agent exited with {}: {}",
                status.code().unwrap_or(-1),
                message
            ));
        }

        let (tokens_used, cost_usd) = parse_usage(&stdout);
        ExecuteResult {
            status: ExecStatus::Done,
            output: parse_agent_output(&stdout),
            tokens_used,
            cost_usd,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
