// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merge steward: drive tasks that passed review through test → merge →
//! cleanup, creating fix tasks when something blocks the way.
//!
//! `process_task` is idempotent: a task that is already closed and merged
//! returns immediately, and fix tasks are created at most once per
//! `(original task, fix type)` while a prior one is still active.

mod fix_task;
mod test_runner;

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use sf_adapters::{
    Dispatch, GitOps, MergeRequest, StewardRegistry, TaskFilter, TaskStore, WorktreeManager,
};
use sf_core::{
    Clock, FixType, MergeConfig, MergeStatus, MergeStrategy, SystemClock, Task, TaskId,
    TaskPatch, TaskStatus,
};
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) use fix_task::FixDetail;

/// Options for a single `process_task` call.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Skip the test phase entirely.
    pub skip_tests: bool,
    /// Merge even when `auto_merge` is off.
    pub force_merge: bool,
    /// Override the generated commit message.
    pub commit_message: Option<String>,
}

/// Terminal state of one `process_task` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeProcessStatus {
    Merged,
    Pending,
    TestFailed,
    Conflict,
    Failed,
}

sf_core::labels! {
    MergeProcessStatus {
        Merged => "merged",
        Pending => "pending",
        TestFailed => "test_failed",
        Conflict => "conflict",
        Failed => "failed",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeProcessResult {
    pub task_id: TaskId,
    pub status: MergeProcessStatus,
    pub merge_commit: Option<String>,
    pub fix_task_id: Option<TaskId>,
    pub error: Option<String>,
}

impl MergeProcessResult {
    fn new(task_id: &TaskId, status: MergeProcessStatus) -> Self {
        Self {
            task_id: task_id.clone(),
            status,
            merge_commit: None,
            fix_task_id: None,
            error: None,
        }
    }

    fn failed(task_id: &TaskId, error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), ..Self::new(task_id, MergeProcessStatus::Failed) }
    }
}

/// Aggregate of one `process_all_pending` sweep.
#[derive(Debug, Default)]
pub struct MergeBatchSummary {
    pub total: u32,
    pub merged: u32,
    pub test_failed: u32,
    pub conflicts: u32,
    pub pending: u32,
    pub failed: u32,
    pub results: Vec<MergeProcessResult>,
}

pub struct MergeSteward<C: Clock = SystemClock> {
    clock: C,
    store: Arc<dyn TaskStore>,
    registry: Arc<dyn StewardRegistry>,
    dispatch: Arc<dyn Dispatch>,
    git: Arc<dyn GitOps>,
    worktrees: Arc<dyn WorktreeManager>,
    config: MergeConfig,
    workspace_root: PathBuf,
}

impl<C: Clock> MergeSteward<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: C,
        store: Arc<dyn TaskStore>,
        registry: Arc<dyn StewardRegistry>,
        dispatch: Arc<dyn Dispatch>,
        git: Arc<dyn GitOps>,
        worktrees: Arc<dyn WorktreeManager>,
        config: MergeConfig,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            clock,
            store,
            registry,
            dispatch,
            git,
            worktrees,
            config,
            workspace_root: workspace_root.into(),
        }
    }

    /// Process one task through the merge pipeline. Never errors: anything
    /// unexpected is recorded on the task and reported in the result.
    pub async fn process_task(
        &self,
        task_id: &TaskId,
        opts: &ProcessOptions,
    ) -> MergeProcessResult {
        match self.process_inner(task_id, opts).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(task = %task_id, error = %err, "merge processing failed");
                let patch = TaskPatch::new()
                    .merge_status(MergeStatus::Failed)
                    .merge_failure_reason(err.to_string());
                if let Err(patch_err) = self.store.update_task(task_id, patch).await {
                    tracing::warn!(
                        task = %task_id,
                        error = %patch_err,
                        "could not record merge failure on task"
                    );
                }
                MergeProcessResult::failed(task_id, err.to_string())
            }
        }
    }

    async fn process_inner(
        &self,
        task_id: &TaskId,
        opts: &ProcessOptions,
    ) -> Result<MergeProcessResult, EngineError> {
        let Some(task) = self.store.get_task(task_id).await? else {
            return Ok(MergeProcessResult::failed(task_id, "Task not found"));
        };

        let Some(branch) = task.orchestrator().branch.clone() else {
            return Ok(MergeProcessResult::failed(task_id, "Task has no branch associated"));
        };

        // Already landed: nothing to do, report success.
        if task.status == TaskStatus::Closed && task.merge_status() == MergeStatus::Merged {
            tracing::debug!(task = %task_id, "task already merged and closed");
            return Ok(MergeProcessResult::new(task_id, MergeProcessStatus::Merged));
        }

        if !opts.skip_tests {
            self.store
                .update_task(task_id, TaskPatch::new().merge_status(MergeStatus::Testing))
                .await?;

            let test_result = self.run_tests(&task).await;
            let passed = test_result.passed;
            let run_count = task.orchestrator().test_run_count + 1;
            let mut patch = TaskPatch::new()
                .last_test_result(test_result.clone())
                .test_run_count(run_count);
            if !passed {
                patch = patch.merge_status(MergeStatus::TestFailed);
            }
            self.store.update_task(task_id, patch).await?;

            if !passed {
                let detail = FixDetail {
                    summary: test_result
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "tests failed".to_string()),
                    affected_files: Vec::new(),
                };
                let fix_task_id =
                    self.ensure_fix_task(&task, FixType::TestFailure, detail).await?;
                let mut result =
                    MergeProcessResult::new(task_id, MergeProcessStatus::TestFailed);
                result.fix_task_id = Some(fix_task_id);
                result.error = test_result.error_message;
                return Ok(result);
            }
        }

        if !self.config.auto_merge && !opts.force_merge {
            self.store
                .update_task(task_id, TaskPatch::new().merge_status(MergeStatus::Pending))
                .await?;
            return Ok(MergeProcessResult::new(task_id, MergeProcessStatus::Pending));
        }

        self.store
            .update_task(task_id, TaskPatch::new().merge_status(MergeStatus::Merging))
            .await?;

        let target = self.resolve_target_branch().await;
        let message = opts
            .commit_message
            .clone()
            .unwrap_or_else(|| default_commit_message(&self.config.merge_strategy, &task, &branch));

        let outcome = self
            .git
            .merge_branch(&MergeRequest {
                workspace_root: self.workspace_root.clone(),
                source_branch: branch.clone(),
                target_branch: target.clone(),
                strategy: self.config.merge_strategy,
                auto_push: self.config.auto_push_after_merge,
                commit_message: message,
                preflight: true,
                // The post-merge sync below is handled here, not by the
                // merge primitive.
                sync_local: false,
            })
            .await;

        if outcome.success {
            let now = self.now();
            self.store.update_task(task_id, TaskPatch::merged(now)).await?;

            if self.config.auto_cleanup {
                self.cleanup_after_merge(&task, &branch).await;
            }

            if self.git.has_remote(&self.workspace_root).await {
                if let Err(err) = self.git.sync_local_branch(&self.workspace_root, &target).await
                {
                    tracing::warn!(
                        branch = %target,
                        error = %err,
                        "post-merge sync failed (best-effort)"
                    );
                }
            }

            let mut result = MergeProcessResult::new(task_id, MergeProcessStatus::Merged);
            result.merge_commit = outcome.commit_hash;
            return Ok(result);
        }

        if outcome.has_conflict {
            let reason = format!(
                "Merge conflict in: {}",
                if outcome.conflict_files.is_empty() {
                    "(unknown files)".to_string()
                } else {
                    outcome.conflict_files.join(", ")
                }
            );
            self.store
                .update_task(
                    task_id,
                    TaskPatch::new()
                        .merge_status(MergeStatus::Conflict)
                        .merge_failure_reason(reason.clone()),
                )
                .await?;

            let detail = FixDetail {
                summary: outcome.error.clone().unwrap_or_else(|| "merge conflict".to_string()),
                affected_files: outcome.conflict_files.clone(),
            };
            let fix_task_id =
                self.ensure_fix_task(&task, FixType::MergeConflict, detail).await?;

            let mut result = MergeProcessResult::new(task_id, MergeProcessStatus::Conflict);
            result.fix_task_id = Some(fix_task_id);
            result.error = Some(reason);
            return Ok(result);
        }

        let reason = outcome.error.unwrap_or_else(|| "merge failed".to_string());
        self.store
            .update_task(
                task_id,
                TaskPatch::new()
                    .merge_status(MergeStatus::Failed)
                    .merge_failure_reason(reason.clone()),
            )
            .await?;
        Ok(MergeProcessResult::failed(task_id, reason))
    }

    /// Process every task awaiting merge, sequentially.
    pub async fn process_all_pending(&self) -> Result<MergeBatchSummary, EngineError> {
        let tasks = self.tasks_awaiting_merge().await?;
        let mut summary = MergeBatchSummary::default();
        for task in tasks {
            let result = self.process_task(&task.id, &ProcessOptions::default()).await;
            summary.total += 1;
            match result.status {
                MergeProcessStatus::Merged => summary.merged += 1,
                MergeProcessStatus::TestFailed => summary.test_failed += 1,
                MergeProcessStatus::Conflict => summary.conflicts += 1,
                MergeProcessStatus::Pending => summary.pending += 1,
                MergeProcessStatus::Failed => summary.failed += 1,
            }
            summary.results.push(result);
        }
        Ok(summary)
    }

    /// Tasks in review with a branch and no merge already in flight or
    /// landed.
    async fn tasks_awaiting_merge(&self) -> Result<Vec<Task>, EngineError> {
        let filter = TaskFilter::default().statuses([TaskStatus::Review]);
        let tasks = self.store.list_tasks(&filter).await?;
        Ok(tasks
            .into_iter()
            .filter(|t| t.orchestrator().branch.is_some())
            .filter(|t| {
                !matches!(
                    t.merge_status(),
                    MergeStatus::Merged | MergeStatus::Merging | MergeStatus::Testing
                )
            })
            .collect())
    }

    /// Explicit config, then the worktree manager, then git HEAD, then
    /// `main`.
    async fn resolve_target_branch(&self) -> String {
        if let Some(branch) = &self.config.target_branch {
            return branch.clone();
        }
        match self.worktrees.default_branch().await {
            Ok(Some(branch)) => return branch,
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(error = %err, "worktree manager could not name a default branch")
            }
        }
        if let Some(branch) = self.git.current_branch(&self.workspace_root).await {
            return branch;
        }
        "main".to_string()
    }

    /// Remove the task worktree and delete its branch (local, and remote
    /// when one exists). Best-effort throughout.
    async fn cleanup_after_merge(&self, task: &Task, branch: &str) {
        if let Some(worktree) = &task.orchestrator().worktree {
            let path = PathBuf::from(worktree);
            if let Err(err) = self.worktrees.remove_worktree(&path, true).await {
                tracing::warn!(task = %task.id, error = %err, "worktree removal failed");
            } else if let Err(err) = self
                .store
                .update_task(&task.id, TaskPatch::new().clear_worktree())
                .await
            {
                tracing::debug!(task = %task.id, error = %err, "could not clear worktree field");
            }
        }

        if self.config.delete_branch_after_merge {
            if let Err(err) = self.git.delete_local_branch(&self.workspace_root, branch).await {
                tracing::warn!(branch, error = %err, "local branch delete failed");
            }
            if self.git.has_remote(&self.workspace_root).await {
                if let Err(err) =
                    self.git.delete_remote_branch(&self.workspace_root, branch).await
                {
                    tracing::warn!(branch, error = %err, "remote branch delete failed");
                }
            }
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }
}

fn default_commit_message(strategy: &MergeStrategy, task: &Task, branch: &str) -> String {
    match strategy {
        MergeStrategy::Squash => format!("{} ({})", task.title, task.id),
        MergeStrategy::Merge => format!("Merge branch '{}' (Task: {})", branch, task.id),
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
