// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task/document store contract.
//!
//! The store is an external collaborator: records are durable, ids and
//! timestamps are server-assigned, and updates go through typed patches.

use async_trait::async_trait;
use sf_core::{Clock, DocumentId, Task, TaskId, TaskPatch, TaskStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store backend: {0}")]
    Backend(String),
}

/// Input record for task creation; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: sf_core::Priority,
    pub complexity: sf_core::Complexity,
    pub assignee: Option<sf_core::AgentId>,
    pub created_by: sf_core::AgentId,
    pub tags: Vec<String>,
    pub metadata: sf_core::TaskMeta,
}

/// Conjunctive task filter: every listed status set and tag must match.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Match tasks whose status is any of these; empty = no constraint.
    pub statuses: Vec<TaskStatus>,
    /// Match tasks carrying all of these tags.
    pub tags: Vec<String>,
}

impl TaskFilter {
    pub fn statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&task.status))
            && self.tags.iter().all(|t| task.has_tag(t))
    }
}

/// A document record (playbooks and similar bodies of text).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;
    async fn create_task(&self, new: NewTask) -> Result<Task, StoreError>;
    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError>;
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;
    async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError>;
    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>, StoreError>;
    /// Role prompts live in role-definition storage; the store proxies them.
    async fn get_role_prompt(&self, role: &str) -> Result<Option<String>, StoreError>;
}

/// In-memory store for tests.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeTaskStore {
    clock: sf_core::FakeClock,
    inner: parking_lot::Mutex<FakeStoreInner>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
struct FakeStoreInner {
    tasks: std::collections::HashMap<TaskId, Task>,
    documents: std::collections::HashMap<DocumentId, Document>,
    role_prompts: std::collections::HashMap<String, String>,
    next_id: u64,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeTaskStore {
    pub fn new() -> Self {
        Self::with_clock(sf_core::FakeClock::new())
    }

    pub fn with_clock(clock: sf_core::FakeClock) -> Self {
        Self { clock, inner: parking_lot::Mutex::new(FakeStoreInner::default()) }
    }

    pub fn clock(&self) -> &sf_core::FakeClock {
        &self.clock
    }

    /// Seed an existing task.
    pub fn insert_task(&self, task: Task) {
        self.inner.lock().tasks.insert(task.id.clone(), task);
    }

    pub fn insert_document(&self, doc: Document) {
        self.inner.lock().documents.insert(doc.id.clone(), doc);
    }

    pub fn insert_role_prompt(&self, role: impl Into<String>, prompt: impl Into<String>) {
        self.inner.lock().role_prompts.insert(role.into(), prompt.into());
    }

    pub fn task_count(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    /// Tasks created through `create_task`, in creation order.
    pub fn created_tasks(&self) -> Vec<Task> {
        let inner = self.inner.lock();
        let mut created: Vec<&Task> =
            inner.tasks.values().filter(|t| t.id.as_str().starts_with("task-fake-")).collect();
        created.sort_by_key(|t| t.id.as_str().to_string());
        created.into_iter().cloned().collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl TaskStore for FakeTaskStore {
    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.inner.lock().tasks.get(id).cloned())
    }

    async fn create_task(&self, new: NewTask) -> Result<Task, StoreError> {
        let now = self.clock.now_utc();
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = TaskId::from_string(format!("task-fake-{:04}", inner.next_id));
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
        inner.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let now = self.clock.now_utc();
        let mut inner = self.inner.lock();
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        task.apply(patch, now);
        Ok(task.clone())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let inner = self.inner.lock();
        let mut tasks: Vec<Task> =
            inner.tasks.values().filter(|t| filter.matches(t)).cloned().collect();
        tasks.sort_by(|a, b| {
            a.created_at.cmp(&b.created_at).then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(tasks)
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        self.inner
            .lock()
            .tasks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.inner.lock().documents.get(id).cloned())
    }

    async fn get_role_prompt(&self, role: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().role_prompts.get(role).cloned())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
