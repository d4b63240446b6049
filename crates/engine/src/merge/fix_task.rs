// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fix-task creation for blocked merges.

use super::MergeSteward;
use crate::error::EngineError;
use sf_adapters::{NewTask, TaskFilter};
use sf_core::{
    Clock, FixType, MergeStatus, OrchestratorMeta, Task, TaskId, TaskMeta, TaskStatus,
};

/// What went wrong, for the fix task body.
#[derive(Debug, Clone)]
pub(crate) struct FixDetail {
    pub summary: String,
    pub affected_files: Vec<String>,
}

impl<C: Clock> MergeSteward<C> {
    /// Find or create the fix task for `(original, fix_type)`.
    ///
    /// While a prior fix task for the same pair is still active (open, in
    /// progress, or review), its id is returned and nothing new is
    /// created.
    pub(crate) async fn ensure_fix_task(
        &self,
        original: &Task,
        fix_type: FixType,
        detail: FixDetail,
    ) -> Result<TaskId, EngineError> {
        if let Some(existing) = self.find_active_fix_task(&original.id, fix_type).await? {
            tracing::info!(
                task = %original.id,
                fix_task = %existing,
                fix_type = %fix_type,
                "reusing active fix task"
            );
            return Ok(existing);
        }

        let title = match fix_type {
            FixType::TestFailure => format!("Fix failing tests: {}", original.title),
            FixType::MergeConflict => format!("Resolve merge conflict: {}", original.title),
        };

        let created_by = self
            .config
            .steward_entity_id
            .clone()
            .unwrap_or_else(|| original.created_by.clone());

        let new_task = NewTask {
            title,
            description: fix_description(original, fix_type, &detail),
            status: TaskStatus::Open,
            priority: original.priority,
            complexity: original.complexity,
            assignee: original.assignee.clone(),
            created_by,
            tags: vec!["fix".to_string(), fix_type.as_str().to_string(), "auto-created".to_string()],
            metadata: TaskMeta {
                orchestrator: OrchestratorMeta {
                    merge_status: MergeStatus::Pending,
                    ..OrchestratorMeta::default()
                },
                original_task_id: Some(original.id.clone()),
                fix_type: Some(fix_type),
            },
        };

        let fix_task = self.store.create_task(new_task).await?;
        tracing::info!(
            task = %original.id,
            fix_task = %fix_task.id,
            fix_type = %fix_type,
            "created fix task"
        );

        self.notify_assignee(original, &fix_task.id, fix_type).await;
        Ok(fix_task.id)
    }

    async fn find_active_fix_task(
        &self,
        original_id: &TaskId,
        fix_type: FixType,
    ) -> Result<Option<TaskId>, EngineError> {
        let filter = TaskFilter::default().tag("fix");
        let candidates = self.store.list_tasks(&filter).await?;
        Ok(candidates
            .into_iter()
            .find(|t| {
                t.status.is_active()
                    && t.metadata.original_task_id.as_ref() == Some(original_id)
                    && t.metadata.fix_type == Some(fix_type)
            })
            .map(|t| t.id))
    }

    /// Tell the fix task's assignee, if it has a reachable channel.
    async fn notify_assignee(&self, original: &Task, fix_task_id: &TaskId, fix_type: FixType) {
        let Some(assignee) = original.assignee.clone() else { return };

        let channel = match self.registry.agent_channel(&assignee).await {
            Ok(channel) => channel,
            Err(err) => {
                tracing::warn!(agent = %assignee, error = %err, "channel lookup failed");
                return;
            }
        };
        if channel.is_none() {
            tracing::debug!(agent = %assignee, "assignee has no channel, skipping notification");
            return;
        }

        let body = format!(
            "A fix task was created for {}: {} ({})",
            original.id, fix_task_id, fix_type
        );
        let meta = serde_json::json!({
            "fixTaskId": fix_task_id,
            "originalTaskId": original.id,
            "fixType": fix_type,
        });
        if let Err(err) =
            self.dispatch.notify_agent(&assignee, "task-assignment", &body, meta).await
        {
            tracing::warn!(agent = %assignee, error = %err, "fix task notification failed");
        }
    }
}

fn fix_description(original: &Task, fix_type: FixType, detail: &FixDetail) -> String {
    let mut out = String::new();
    match fix_type {
        FixType::TestFailure => {
            out.push_str(&format!(
                "## Failing tests block the merge of {}\n\n",
                original.id
            ));
            out.push_str("Tests failed while preparing this task's branch for merge.\n\n");
        }
        FixType::MergeConflict => {
            out.push_str(&format!(
                "## Merge conflict blocks the merge of {}\n\n",
                original.id
            ));
            out.push_str("The task branch no longer merges cleanly into the target.\n\n");
        }
    }

    out.push_str("### Details\n\n```\n");
    out.push_str(&detail.summary);
    out.push_str("\n```\n");

    if !detail.affected_files.is_empty() {
        out.push_str("\n### Affected files\n\n");
        for file in &detail.affected_files {
            out.push_str(&format!("- `{file}`\n"));
        }
    }

    out.push_str("\n### Instructions\n\n");
    match fix_type {
        FixType::TestFailure => {
            out.push_str("1. Check out the task branch and reproduce the failure.\n");
            out.push_str("2. Fix the tests (or the code they exercise) until they pass.\n");
        }
        FixType::MergeConflict => {
            out.push_str("1. Rebase or merge the target branch into the task branch.\n");
            out.push_str("2. Resolve the conflicts and verify the tests still pass.\n");
        }
    }
    out.push_str("3. Close this task; the original will be re-processed on the next run.\n");
    out
}

#[cfg(test)]
#[path = "fix_task_tests.rs"]
mod tests;
