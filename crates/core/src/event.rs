// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events the scheduler emits for observers.
//!
//! Serializes with `{"type": "execution:started", ...fields}` format.

use crate::execution::{ExecutionId, ExecutionResult};
use crate::id::AgentId;
use crate::steward::Trigger;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StewardEvent {
    #[serde(rename = "execution:started")]
    ExecutionStarted {
        execution_id: ExecutionId,
        steward_id: AgentId,
        steward_name: String,
        trigger: Trigger,
    },

    #[serde(rename = "execution:completed")]
    ExecutionCompleted {
        execution_id: ExecutionId,
        steward_id: AgentId,
        result: ExecutionResult,
    },

    #[serde(rename = "execution:failed")]
    ExecutionFailed {
        execution_id: ExecutionId,
        steward_id: AgentId,
        error: String,
    },

    #[serde(rename = "steward:registered")]
    StewardRegistered {
        steward_id: AgentId,
        steward_name: String,
        cron_jobs: usize,
        event_subscriptions: usize,
    },

    #[serde(rename = "steward:unregistered")]
    StewardUnregistered { steward_id: AgentId },
}

impl StewardEvent {
    /// Compact one-line summary for daemon logs.
    pub fn log_summary(&self) -> String {
        match self {
            StewardEvent::ExecutionStarted { execution_id, steward_name, .. } => {
                format!("execution:started exec={execution_id} steward={steward_name}")
            }
            StewardEvent::ExecutionCompleted { execution_id, result, .. } => {
                format!(
                    "execution:completed exec={execution_id} duration_ms={}",
                    result.duration_ms
                )
            }
            StewardEvent::ExecutionFailed { execution_id, error, .. } => {
                format!("execution:failed exec={execution_id} error={error}")
            }
            StewardEvent::StewardRegistered {
                steward_name, cron_jobs, event_subscriptions, ..
            } => {
                format!(
                    "steward:registered steward={steward_name} cron={cron_jobs} events={event_subscriptions}"
                )
            }
            StewardEvent::StewardUnregistered { steward_id } => {
                format!("steward:unregistered steward={steward_id}")
            }
        }
    }

    pub fn execution_id(&self) -> Option<&ExecutionId> {
        match self {
            StewardEvent::ExecutionStarted { execution_id, .. }
            | StewardEvent::ExecutionCompleted { execution_id, .. }
            | StewardEvent::ExecutionFailed { execution_id, .. } => Some(execution_id),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
