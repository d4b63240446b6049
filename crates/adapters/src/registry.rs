// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent registry contract: steward lookup, channels, metadata write-back.

use crate::store::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sf_core::{AgentId, ChannelId, Steward};

#[async_trait]
pub trait StewardRegistry: Send + Sync {
    async fn get_steward(&self, id: &AgentId) -> Result<Option<Steward>, StoreError>;
    /// All registered steward agents.
    async fn stewards(&self) -> Result<Vec<Steward>, StoreError>;
    /// The message channel of an agent, if it has one.
    async fn agent_channel(&self, id: &AgentId) -> Result<Option<ChannelId>, StoreError>;
    /// Best-effort `last_executed_at` metadata write-back.
    async fn record_execution(&self, id: &AgentId, at: DateTime<Utc>)
        -> Result<(), StoreError>;
}

/// In-memory registry for tests.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeRegistry {
    inner: parking_lot::Mutex<FakeRegistryInner>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
struct FakeRegistryInner {
    stewards: Vec<Steward>,
    channels: std::collections::HashMap<AgentId, ChannelId>,
    executions: Vec<(AgentId, DateTime<Utc>)>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeRegistry {
    pub fn new() -> Self {
        Self { inner: parking_lot::Mutex::new(FakeRegistryInner::default()) }
    }

    pub fn insert_steward(&self, steward: Steward) {
        let mut inner = self.inner.lock();
        inner.stewards.retain(|s| s.id != steward.id);
        inner.stewards.push(steward);
    }

    pub fn set_channel(&self, agent: impl Into<AgentId>, channel: impl Into<ChannelId>) {
        self.inner.lock().channels.insert(agent.into(), channel.into());
    }

    /// `(steward, at)` pairs recorded through `record_execution`.
    pub fn recorded_executions(&self) -> Vec<(AgentId, DateTime<Utc>)> {
        self.inner.lock().executions.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl StewardRegistry for FakeRegistry {
    async fn get_steward(&self, id: &AgentId) -> Result<Option<Steward>, StoreError> {
        Ok(self.inner.lock().stewards.iter().find(|s| &s.id == id).cloned())
    }

    async fn stewards(&self) -> Result<Vec<Steward>, StoreError> {
        Ok(self.inner.lock().stewards.clone())
    }

    async fn agent_channel(&self, id: &AgentId) -> Result<Option<ChannelId>, StoreError> {
        Ok(self.inner.lock().channels.get(id).cloned())
    }

    async fn record_execution(
        &self,
        id: &AgentId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if let Some(steward) = inner.stewards.iter_mut().find(|s| &s.id == id) {
            steward.last_executed_at = Some(at);
        }
        inner.executions.push((id.clone(), at));
        Ok(())
    }
}
