// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-file-backed store for standalone CLI runs.
//!
//! The production deployment talks to the platform's entity store; the CLI
//! works against a single `state.json` so stewards can be exercised on a
//! bare checkout. Load-on-open, save-on-write, no concurrency story beyond
//! the process-wide mutex — this is a development convenience, not a
//! database.

use crate::registry::StewardRegistry;
use crate::store::{Document, NewTask, StoreError, TaskFilter, TaskStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sf_core::{AgentId, ChannelId, DocumentId, Steward, Task, TaskId, TaskPatch};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LocalState {
    #[serde(default)]
    tasks: HashMap<TaskId, Task>,
    #[serde(default)]
    stewards: Vec<Steward>,
    #[serde(default)]
    documents: HashMap<DocumentId, Document>,
    #[serde(default)]
    role_prompts: HashMap<String, String>,
    #[serde(default)]
    next_task_id: u64,
}

pub struct LocalStore {
    path: PathBuf,
    state: Mutex<LocalState>,
}

impl LocalStore {
    /// Open (or initialize) the state file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            LocalState::default()
        };
        Ok(Self { path, state: Mutex::new(state) })
    }

    fn save(&self, state: &LocalState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for LocalStore {
    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.state.lock().tasks.get(id).cloned())
    }

    async fn create_task(&self, new: NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let mut state = self.state.lock();
        state.next_task_id += 1;
        let id = TaskId::from_string(format!("task-{:06}", state.next_task_id));
        let task = Task {
            id: id.clone(),
            title: new.title,
            status: new.status,
            priority: new.priority,
            complexity: new.complexity,
            assignee: new.assignee,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
            closed_at: None,
            tags: new.tags,
            metadata: new.metadata,
        };
        state.tasks.insert(id, task.clone());
        self.save(&state)?;
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let now = Utc::now();
        let mut state = self.state.lock();
        let task = state
            .tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        task.apply(patch, now);
        let task = task.clone();
        self.save(&state)?;
        Ok(task)
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let state = self.state.lock();
        let mut tasks: Vec<Task> =
            state.tasks.values().filter(|t| filter.matches(t)).cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state
            .tasks
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.save(&state)
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.state.lock().documents.get(id).cloned())
    }

    async fn get_role_prompt(&self, role: &str) -> Result<Option<String>, StoreError> {
        Ok(self.state.lock().role_prompts.get(role).cloned())
    }
}

#[async_trait]
impl StewardRegistry for LocalStore {
    async fn get_steward(&self, id: &AgentId) -> Result<Option<Steward>, StoreError> {
        Ok(self.state.lock().stewards.iter().find(|s| &s.id == id).cloned())
    }

    async fn stewards(&self) -> Result<Vec<Steward>, StoreError> {
        Ok(self.state.lock().stewards.clone())
    }

    async fn agent_channel(&self, _id: &AgentId) -> Result<Option<ChannelId>, StoreError> {
        // Local runs have no message channels.
        Ok(None)
    }

    async fn record_execution(
        &self,
        id: &AgentId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if let Some(steward) = state.stewards.iter_mut().find(|s| &s.id == id) {
            steward.last_executed_at = Some(at);
        }
        self.save(&state)
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
