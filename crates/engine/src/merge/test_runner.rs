// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test execution for the merge steward.

use super::MergeSteward;
use sf_adapters::{run_with_timeout, SubprocessError};
use sf_core::{Clock, Task, TestResult};
use std::path::PathBuf;
use tokio::process::Command;

/// Cap on the error text persisted into `last_test_result`.
const MAX_ERROR_CHARS: usize = 500;

impl<C: Clock> MergeSteward<C> {
    /// Run the configured test command in the task's worktree (or the
    /// workspace root when the worktree is missing). Failures — non-zero
    /// exit, timeout, spawn error — are all domain results.
    pub(crate) async fn run_tests(&self, task: &Task) -> TestResult {
        let start = self.clock.now();

        let cwd = match &task.orchestrator().worktree {
            Some(worktree) if PathBuf::from(worktree).is_dir() => PathBuf::from(worktree),
            Some(worktree) => {
                tracing::warn!(
                    task = %task.id,
                    worktree,
                    "task worktree missing, running tests in workspace root"
                );
                self.workspace_root.clone()
            }
            None => {
                tracing::warn!(
                    task = %task.id,
                    "task has no worktree, running tests in workspace root"
                );
                self.workspace_root.clone()
            }
        };

        let mut parts = self.config.test_command.split_whitespace();
        let Some(program) = parts.next() else {
            return self.test_failure(start, "test command is empty".to_string());
        };
        let mut cmd = Command::new(program);
        cmd.args(parts).current_dir(&cwd);

        tracing::info!(
            task = %task.id,
            command = %self.config.test_command,
            cwd = %cwd.display(),
            "running tests"
        );

        match run_with_timeout(cmd, self.config.test_timeout(), "test command").await {
            Ok(out) => {
                let passed = out.success();
                let duration_ms = self.elapsed_ms(start);
                TestResult {
                    passed,
                    completed_at: self.clock.now_utc(),
                    duration_ms: Some(duration_ms),
                    error_message: (!passed)
                        .then(|| truncate_output(&out.combined(), MAX_ERROR_CHARS)),
                }
            }
            Err(SubprocessError::Timeout { .. }) => self.test_failure(
                start,
                format!("Tests timed out after {}ms", self.config.test_timeout_ms),
            ),
            Err(err) => self.test_failure(start, err.to_string()),
        }
    }

    fn test_failure(&self, start: std::time::Instant, message: String) -> TestResult {
        TestResult {
            passed: false,
            completed_at: self.clock.now_utc(),
            duration_ms: Some(self.elapsed_ms(start)),
            error_message: Some(truncate_output(&message, MAX_ERROR_CHARS)),
        }
    }

    fn elapsed_ms(&self, start: std::time::Instant) -> u64 {
        self.clock.now().saturating_duration_since(start).as_millis() as u64
    }
}

/// Truncate to at most `max` characters on a char boundary.
pub(crate) fn truncate_output(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

#[cfg(test)]
#[path = "test_runner_tests.rs"]
mod tests;
