// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task records and the merge-pipeline state stored on them.
//!
//! Tasks live in the external entity store; the steward subsystem reads a
//! typed projection and writes back through [`TaskPatch`]. The orchestrator
//! sub-record carries the per-task merge pipeline state.

use crate::id::{AgentId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Open,
    InProgress,
    Review,
    Closed,
    Cancelled,
}

impl TaskStatus {
    /// Open, in-progress, and review tasks are active; closed and cancelled
    /// are terminal.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Open | TaskStatus::InProgress | TaskStatus::Review)
    }
}

crate::labels! {
    TaskStatus {
        Open => "OPEN",
        InProgress => "IN_PROGRESS",
        Review => "REVIEW",
        Closed => "CLOSED",
        Cancelled => "CANCELLED",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

/// Per-task state of the merge pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    Pending,
    Testing,
    Merging,
    Merged,
    Conflict,
    TestFailed,
    Failed,
    #[default]
    NotApplicable,
}

crate::labels! {
    MergeStatus {
        Pending => "pending",
        Testing => "testing",
        Merging => "merging",
        Merged => "merged",
        Conflict => "conflict",
        TestFailed => "test_failed",
        Failed => "failed",
        NotApplicable => "not_applicable",
    }
}

/// The category of failure a fix task addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixType {
    TestFailure,
    MergeConflict,
}

crate::labels! {
    FixType {
        TestFailure => "test_failure",
        MergeConflict => "merge_conflict",
    }
}

/// Outcome of one test-command run against a task worktree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Orchestrator metadata sub-record on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrchestratorMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<AgentId>,
    #[serde(default)]
    pub merge_status: MergeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_test_result: Option<TestResult>,
    #[serde(default)]
    pub test_run_count: u32,
}

/// Task metadata envelope: the orchestrator sub-record plus fix-task
/// provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TaskMeta {
    #[serde(default)]
    pub orchestrator: OrchestratorMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_type: Option<FixType>,
}

/// A task as read from the entity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<AgentId>,
    pub created_by: AgentId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: TaskMeta,
}

impl Task {
    pub fn orchestrator(&self) -> &OrchestratorMeta {
        &self.metadata.orchestrator
    }

    pub fn merge_status(&self) -> MergeStatus {
        self.metadata.orchestrator.merge_status
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Apply a patch, stamping `updated_at`.
    ///
    /// A patch that moves `merge_status` to `Merged` also closes the task,
    /// sets `closed_at`, and clears the assignee; the two transitions are a
    /// single write at the store boundary.
    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        let TaskPatch {
            status,
            assignee,
            closed_at,
            branch,
            worktree,
            merge_status,
            merged_at,
            merge_failure_reason,
            last_test_result,
            test_run_count,
        } = patch;

        if let Some(status) = status {
            self.status = status;
        }
        if let Some(assignee) = assignee {
            self.assignee = assignee;
        }
        if let Some(closed_at) = closed_at {
            self.closed_at = closed_at;
        }
        let orch = &mut self.metadata.orchestrator;
        if let Some(branch) = branch {
            orch.branch = branch;
        }
        if let Some(worktree) = worktree {
            orch.worktree = worktree;
        }
        if let Some(merge_status) = merge_status {
            orch.merge_status = merge_status;
        }
        if let Some(merged_at) = merged_at {
            orch.merged_at = Some(merged_at);
        }
        if let Some(reason) = merge_failure_reason {
            orch.merge_failure_reason = reason;
        }
        if let Some(result) = last_test_result {
            orch.last_test_result = Some(result);
        }
        if let Some(count) = test_run_count {
            orch.test_run_count = count;
        }

        if self.metadata.orchestrator.merge_status == MergeStatus::Merged {
            self.status = TaskStatus::Closed;
            if self.closed_at.is_none() {
                self.closed_at = Some(now);
            }
            self.assignee = None;
        }

        self.updated_at = now;
    }
}

/// A partial update to a task.
///
/// `None` fields are untouched; `Some(None)` on a double-optional field
/// clears it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub assignee: Option<Option<AgentId>>,
    pub closed_at: Option<Option<DateTime<Utc>>>,
    pub branch: Option<Option<String>>,
    pub worktree: Option<Option<String>>,
    pub merge_status: Option<MergeStatus>,
    pub merged_at: Option<DateTime<Utc>>,
    pub merge_failure_reason: Option<Option<String>>,
    pub last_test_result: Option<TestResult>,
    pub test_run_count: Option<u32>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    crate::setters! {
        option status: TaskStatus,
        option merge_status: MergeStatus,
        option merged_at: DateTime<Utc>,
        option last_test_result: TestResult,
        option test_run_count: u32,
    }

    pub fn assignee(mut self, v: impl Into<AgentId>) -> Self {
        self.assignee = Some(Some(v.into()));
        self
    }

    pub fn clear_assignee(mut self) -> Self {
        self.assignee = Some(None);
        self
    }

    pub fn closed_at(mut self, at: DateTime<Utc>) -> Self {
        self.closed_at = Some(Some(at));
        self
    }

    pub fn merge_failure_reason(mut self, v: impl Into<String>) -> Self {
        self.merge_failure_reason = Some(Some(v.into()));
        self
    }

    pub fn clear_worktree(mut self) -> Self {
        self.worktree = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// The full patch for a successful merge: merged status plus the task
    /// closure it implies.
    pub fn merged(commit_at: DateTime<Utc>) -> Self {
        Self::new()
            .merge_status(MergeStatus::Merged)
            .merged_at(commit_at)
            .status(TaskStatus::Closed)
            .closed_at(commit_at)
            .clear_assignee()
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
