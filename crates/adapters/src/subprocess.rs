// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution with timeouts and captured output.
//!
//! Every external command the subsystem runs goes through here: argv-form
//! only, output captured, bounded by a timeout. `kill_on_drop` reaps the
//! child when a timeout abandons the wait future.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Timeout for git plumbing commands (worktree add/remove, branch, fetch).
pub const GIT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum SubprocessError {
    #[error("{label} timed out after {timeout:?}")]
    Timeout { label: String, timeout: Duration },
    #[error("{label} failed to start: {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of one subprocess run.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout and stderr concatenated, for persistence into error messages.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Run a command to completion, killing it if `timeout` elapses first.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<CmdOutput, SubprocessError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| SubprocessError::Spawn {
        label: label.to_string(),
        source,
    })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output()).await;
    match output {
        Ok(Ok(output)) => Ok(CmdOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Ok(Err(source)) => Err(SubprocessError::Spawn { label: label.to_string(), source }),
        // Dropping the wait future kills the child via kill_on_drop.
        Err(_) => Err(SubprocessError::Timeout { label: label.to_string(), timeout }),
    }
}

/// Run `git` with the given args in `root`.
///
/// `GIT_DIR`/`GIT_WORK_TREE` are scrubbed from the environment so invocations
/// inside worktrees resolve the repository from the working directory.
pub async fn run_git(
    root: &Path,
    args: &[&str],
    label: &str,
) -> Result<CmdOutput, SubprocessError> {
    let mut cmd = Command::new("git");
    cmd.args(args)
        .current_dir(root)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE");
    run_with_timeout(cmd, GIT_TIMEOUT, label).await
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
