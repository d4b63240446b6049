// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution records: the result a steward run returns and the history
//! entry the scheduler keeps for it.

use crate::id::AgentId;
use crate::steward::Trigger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier of one steward execution.
    ///
    /// Scheduler-minted ids are `exec-{seq}-{epoch_ms}` via
    /// [`ExecutionId::sequenced`]; `new()` exists for tests.
    pub struct ExecutionId("exec-");
}

impl ExecutionId {
    pub fn sequenced(seq: u64, epoch_ms: u64) -> Self {
        Self::from_string(format!("exec-{seq}-{epoch_ms}"))
    }
}

/// How an execution was triggered, for history filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Cron,
    Event,
    Manual,
}

crate::labels! {
    TriggerKind {
        Cron => "cron",
        Event => "event",
        Manual => "manual",
    }
}

/// What one steward run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<u32>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
            items_processed: None,
            duration_ms,
        }
    }

    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            items_processed: None,
            duration_ms,
        }
    }

    crate::setters! {
        option items_processed: u32,
    }
}

/// One entry in the bounded execution history.
///
/// Created provisionally when an execution starts and finalized exactly once
/// with its completion time and result; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEntry {
    pub execution_id: ExecutionId,
    pub steward_id: AgentId,
    pub steward_name: String,
    pub trigger: Trigger,
    pub manual: bool,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_context: Option<serde_json::Value>,
}

impl ExecutionEntry {
    pub fn is_finalized(&self) -> bool {
        self.completed_at.is_some()
    }

    /// `None` while in flight, `Some(success)` once finalized.
    pub fn succeeded(&self) -> Option<bool> {
        self.result.as_ref().map(|r| r.success)
    }

    pub fn trigger_kind(&self) -> TriggerKind {
        if self.manual {
            TriggerKind::Manual
        } else {
            self.trigger.kind()
        }
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
