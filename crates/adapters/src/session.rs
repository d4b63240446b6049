// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session manager contract: spawn, query, and stop agent sessions.
//!
//! A spawned session exposes its lifecycle on an event channel the session
//! monitor consumes. The manager itself is an external collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sf_core::{AgentId, SessionId};
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Starting,
    Running,
    Terminated,
}

/// Events a session emits on its stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Any session activity (tool call, output, state change).
    Event,
    Exit { exit_code: Option<i32> },
    Status { status: SessionStatus },
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub working_dir: PathBuf,
    pub initial_prompt: String,
    pub interactive: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StopOptions {
    pub graceful: bool,
    pub reason: Option<String>,
}

/// A freshly started session: its id plus the event stream.
pub struct SessionSpawn {
    pub session_id: SessionId,
    pub events: mpsc::Receiver<SessionEvent>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(SessionId),
    #[error("session backend: {0}")]
    Backend(String),
    #[error("session manager unavailable: {0}")]
    Unavailable(&'static str),
}

impl SessionError {
    /// "Not found" stop failures mean the session is already gone and are
    /// silently ignored by callers.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound(_))
            || self.to_string().contains("not found")
    }
}

#[async_trait]
pub trait SessionManager: Send + Sync {
    async fn start_session(
        &self,
        agent: &AgentId,
        opts: SessionOptions,
    ) -> Result<SessionSpawn, SessionError>;

    async fn active_session(&self, agent: &AgentId) -> Result<Option<SessionId>, SessionError>;

    async fn stop_session(&self, id: &SessionId, opts: StopOptions)
        -> Result<(), SessionError>;
}

/// Session manager that refuses to spawn. Used where the platform session
/// runtime is not wired in (one-shot CLI invocations).
#[derive(Default, Clone, Copy)]
pub struct NoopSessionManager;

impl NoopSessionManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionManager for NoopSessionManager {
    async fn start_session(
        &self,
        _agent: &AgentId,
        _opts: SessionOptions,
    ) -> Result<SessionSpawn, SessionError> {
        Err(SessionError::Unavailable("session runtime not configured"))
    }

    async fn active_session(
        &self,
        _agent: &AgentId,
    ) -> Result<Option<SessionId>, SessionError> {
        Ok(None)
    }

    async fn stop_session(
        &self,
        _id: &SessionId,
        _opts: StopOptions,
    ) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Scriptable session manager for tests.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeSessionManager {
    inner: parking_lot::Mutex<FakeSessionInner>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
struct FakeSessionInner {
    next: u64,
    active: std::collections::HashMap<AgentId, SessionId>,
    senders: std::collections::HashMap<SessionId, mpsc::Sender<SessionEvent>>,
    started: Vec<(AgentId, SessionOptions)>,
    stops: Vec<(SessionId, StopOptions)>,
    stop_fails_not_found: bool,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeSessionManager {
    pub fn new() -> Self {
        Self { inner: parking_lot::Mutex::new(FakeSessionInner::default()) }
    }

    /// Pretend this agent already has a live session.
    pub fn set_active(&self, agent: impl Into<AgentId>, session: impl Into<SessionId>) {
        self.inner.lock().active.insert(agent.into(), session.into());
    }

    /// Make every `stop_session` fail with `NotFound`.
    pub fn fail_stops_with_not_found(&self) {
        self.inner.lock().stop_fails_not_found = true;
    }

    /// The event sender for a spawned session, for injecting activity.
    pub fn sender(&self, id: &SessionId) -> Option<mpsc::Sender<SessionEvent>> {
        self.inner.lock().senders.get(id).cloned()
    }

    pub fn started(&self) -> Vec<(AgentId, SessionOptions)> {
        self.inner.lock().started.clone()
    }

    pub fn stops(&self) -> Vec<(SessionId, StopOptions)> {
        self.inner.lock().stops.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeSessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl SessionManager for FakeSessionManager {
    async fn start_session(
        &self,
        agent: &AgentId,
        opts: SessionOptions,
    ) -> Result<SessionSpawn, SessionError> {
        let mut inner = self.inner.lock();
        inner.next += 1;
        let id = SessionId::from_string(format!("sess-{}", inner.next));
        let (tx, rx) = mpsc::channel(64);
        inner.senders.insert(id.clone(), tx);
        inner.active.insert(agent.clone(), id.clone());
        inner.started.push((agent.clone(), opts));
        Ok(SessionSpawn { session_id: id, events: rx })
    }

    async fn active_session(&self, agent: &AgentId) -> Result<Option<SessionId>, SessionError> {
        Ok(self.inner.lock().active.get(agent).cloned())
    }

    async fn stop_session(
        &self,
        id: &SessionId,
        opts: StopOptions,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        if inner.stop_fails_not_found {
            return Err(SessionError::NotFound(id.clone()));
        }
        inner.stops.push((id.clone(), opts));
        inner.active.retain(|_, s| s != id);
        Ok(())
    }
}
