// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch service contract: post a message into an agent's channel.

use async_trait::async_trait;
use sf_core::AgentId;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("agent {0} has no channel")]
    NoChannel(AgentId),
    #[error("dispatch backend: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn notify_agent(
        &self,
        agent: &AgentId,
        kind: &str,
        body: &str,
        meta: serde_json::Value,
    ) -> Result<(), DispatchError>;
}

/// Dispatch that drops notifications with a log line. Used where the
/// platform messaging service is not wired in (one-shot CLI invocations).
#[derive(Default, Clone, Copy)]
pub struct NoopDispatch;

impl NoopDispatch {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dispatch for NoopDispatch {
    async fn notify_agent(
        &self,
        agent: &AgentId,
        kind: &str,
        _body: &str,
        _meta: serde_json::Value,
    ) -> Result<(), DispatchError> {
        tracing::info!(agent = %agent, kind, "dropping notification (no dispatch backend)");
        Ok(())
    }
}

/// Notification recorded by [`FakeDispatch`].
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub agent: AgentId,
    pub kind: String,
    pub body: String,
    pub meta: serde_json::Value,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeDispatch {
    sent: parking_lot::Mutex<Vec<Notification>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Dispatch for FakeDispatch {
    async fn notify_agent(
        &self,
        agent: &AgentId,
        kind: &str,
        body: &str,
        meta: serde_json::Value,
    ) -> Result<(), DispatchError> {
        self.sent.lock().push(Notification {
            agent: agent.clone(),
            kind: kind.to_string(),
            body: body.to_string(),
            meta,
        });
        Ok(())
    }
}
