// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Steward executor dispatch: map a steward's focus onto the component
//! that does the work.
//!
//! `merge` runs in-process through the merge steward. `docs` and `custom`
//! spawn a non-interactive agent session in the project root and hand the
//! event stream to the session monitor; the execution result reports the
//! spawn, not the session's eventual outcome.

use crate::error::EngineError;
use crate::merge::MergeSteward;
use crate::monitor::SessionMonitor;
use async_trait::async_trait;
use sf_adapters::{SessionManager, SessionOptions, TaskStore};
use sf_core::{
    Clock, ExecutionResult, Steward, StewardFocus, SystemClock, Trigger,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Fallback prompt for docs sessions when no role prompt is stored.
const DEFAULT_DOCS_PROMPT: &str = "You are the docs steward. Scan the documentation tree for \
broken file references, dead links, stale export names, and undocumented CLI changes, then \
commit corrections to your session branch and self-merge.";

/// Fallback base prompt for custom stewards.
const DEFAULT_CUSTOM_PROMPT: &str = "You are a custom steward. Follow your playbook.";

/// What the scheduler hands the executor for one run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub trigger: Trigger,
    pub manual: bool,
    pub event_context: Option<serde_json::Value>,
}

#[async_trait]
pub trait ExecuteSteward: Send + Sync {
    async fn execute(
        &self,
        steward: &Steward,
        context: &ExecutionContext,
    ) -> Result<ExecutionResult, EngineError>;
}

pub struct StewardExecutor<C: Clock = SystemClock> {
    clock: C,
    store: Arc<dyn TaskStore>,
    sessions: Arc<dyn SessionManager>,
    merge: Arc<MergeSteward<C>>,
    monitor: SessionMonitor,
    workspace_root: PathBuf,
    shutdown: CancellationToken,
}

impl<C: Clock> StewardExecutor<C> {
    pub fn new(
        clock: C,
        store: Arc<dyn TaskStore>,
        sessions: Arc<dyn SessionManager>,
        merge: Arc<MergeSteward<C>>,
        monitor: SessionMonitor,
        workspace_root: impl Into<PathBuf>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            clock,
            store,
            sessions,
            merge,
            monitor,
            workspace_root: workspace_root.into(),
            shutdown,
        }
    }

    fn elapsed_ms(&self, start: std::time::Instant) -> u64 {
        self.clock.now().saturating_duration_since(start).as_millis() as u64
    }

    async fn run_merge(
        &self,
        start: std::time::Instant,
    ) -> Result<ExecutionResult, EngineError> {
        let summary = self.merge.process_all_pending().await?;
        let failed_like = summary.test_failed + summary.conflicts + summary.failed;
        let output = format!(
            "Processed {} tasks ({} merged, {} failed)",
            summary.total, summary.merged, failed_like
        );
        Ok(ExecutionResult::success(output, self.elapsed_ms(start))
            .items_processed(summary.total))
    }

    async fn spawn_session(
        &self,
        steward: &Steward,
        prompt: String,
        start: std::time::Instant,
    ) -> Result<ExecutionResult, EngineError> {
        // One session per steward at a time; a live one means a previous
        // tick is still working.
        if let Some(active) = self.sessions.active_session(&steward.id).await? {
            let output = format!(
                "Steward {} already has active session {}, skipping",
                steward.name, active
            );
            tracing::info!(steward = %steward.id, session = %active, "session overlap, skipping");
            return Ok(ExecutionResult::success(output, self.elapsed_ms(start))
                .items_processed(0u32));
        }

        let spawn = self
            .sessions
            .start_session(
                &steward.id,
                SessionOptions {
                    working_dir: self.workspace_root.clone(),
                    initial_prompt: prompt,
                    interactive: false,
                },
            )
            .await?;

        let session_id = spawn.session_id.clone();
        self.monitor.watch(spawn.session_id, spawn.events, self.shutdown.child_token());

        let output = format!("Spawned docs steward session {session_id}");
        Ok(ExecutionResult::success(output, self.elapsed_ms(start)).items_processed(1u32))
    }

    async fn role_prompt(&self, role: &str, fallback: &str) -> String {
        match self.store.get_role_prompt(role).await {
            Ok(Some(prompt)) => prompt,
            Ok(None) => fallback.to_string(),
            Err(err) => {
                tracing::warn!(role, error = %err, "role prompt lookup failed, using fallback");
                fallback.to_string()
            }
        }
    }

    /// Playbook body: referenced document first (with logged fallback),
    /// then the inline playbook.
    async fn playbook_body(&self, steward: &Steward) -> Option<String> {
        if let Some(playbook_id) = &steward.playbook_id {
            match self.store.get_document(playbook_id).await {
                Ok(Some(doc)) => return Some(doc.content),
                Ok(None) => {
                    tracing::warn!(
                        steward = %steward.id,
                        playbook = %playbook_id,
                        "playbook document missing, falling back to inline playbook"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        steward = %steward.id,
                        playbook = %playbook_id,
                        error = %err,
                        "playbook lookup failed, falling back to inline playbook"
                    );
                }
            }
        }
        steward.playbook.clone()
    }
}

#[async_trait]
impl<C: Clock> ExecuteSteward for StewardExecutor<C> {
    async fn execute(
        &self,
        steward: &Steward,
        _context: &ExecutionContext,
    ) -> Result<ExecutionResult, EngineError> {
        let start = self.clock.now();
        match steward.focus {
            StewardFocus::Merge => self.run_merge(start).await,
            StewardFocus::Docs => {
                let prompt = self.role_prompt("steward/docs", DEFAULT_DOCS_PROMPT).await;
                self.spawn_session(steward, prompt, start).await
            }
            StewardFocus::Custom => {
                let Some(playbook) = self.playbook_body(steward).await else {
                    return Ok(ExecutionResult::failure(
                        "Custom steward has no playbook configured",
                        self.elapsed_ms(start),
                    ));
                };
                let base = self.role_prompt("steward/custom", DEFAULT_CUSTOM_PROMPT).await;
                let prompt =
                    format!("{base}\n\n---\n\n## Custom Steward Playbook\n\n{playbook}");
                self.spawn_session(steward, prompt, start).await
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
