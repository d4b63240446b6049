// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared by other crates' tests (behind `test-support`).

use crate::execution::{ExecutionEntry, ExecutionId};
use crate::id::{AgentId, TaskId};
use crate::steward::Trigger;
use crate::task::{
    Complexity, MergeStatus, Priority, Task, TaskMeta, TaskStatus, TestResult,
};
use chrono::{DateTime, TimeZone, Utc};

fn epoch(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Builder for [`Task`] fixtures.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self {
            task: Task {
                id: id.into(),
                title: "Test task".to_string(),
                status: TaskStatus::Open,
                priority: Priority::default(),
                complexity: Complexity::default(),
                assignee: None,
                created_by: AgentId::from_string("agt-author"),
                created_at: epoch(1_000),
                updated_at: epoch(1_000),
                closed_at: None,
                tags: Vec::new(),
                metadata: TaskMeta::default(),
            },
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.task.title = title.into();
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn assignee(mut self, agent: impl Into<AgentId>) -> Self {
        self.task.assignee = Some(agent.into());
        self
    }

    pub fn created_by(mut self, agent: impl Into<AgentId>) -> Self {
        self.task.created_by = agent.into();
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.task.metadata.orchestrator.branch = Some(branch.into());
        self
    }

    pub fn worktree(mut self, path: impl Into<String>) -> Self {
        self.task.metadata.orchestrator.worktree = Some(path.into());
        self
    }

    pub fn merge_status(mut self, status: MergeStatus) -> Self {
        self.task.metadata.orchestrator.merge_status = status;
        self
    }

    pub fn closed_at_ms(mut self, ms: i64) -> Self {
        self.task.closed_at = Some(epoch(ms));
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.task.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn metadata(mut self, metadata: TaskMeta) -> Self {
        self.task.metadata = metadata;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// A provisional (not yet finalized) execution entry.
pub fn entry(steward: impl Into<AgentId>, started_at_ms: i64) -> ExecutionEntry {
    let steward_id = steward.into();
    ExecutionEntry {
        execution_id: ExecutionId::new(),
        steward_name: steward_id.to_string(),
        steward_id,
        trigger: Trigger::manual(),
        manual: true,
        started_at: epoch(started_at_ms),
        completed_at: None,
        result: None,
        event_context: None,
    }
}

/// A passed/failed test result fixture.
pub fn test_result(passed: bool) -> TestResult {
    TestResult {
        passed,
        completed_at: epoch(2_000),
        duration_ms: Some(10),
        error_message: if passed { None } else { Some("assertion failed".to_string()) },
    }
}
