// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Steward entities and their triggers.
//!
//! A steward is an autonomous agent that runs on triggers to reconcile some
//! repository or workload state. The registry owns the entities; this module
//! only defines the read-through shape the scheduler consumes.

use crate::execution::TriggerKind;
use crate::id::{AgentId, DocumentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The family of work a steward performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StewardFocus {
    /// Merge tasks that passed review: test, merge, reconcile.
    Merge,
    /// Keep documentation referentially consistent with source.
    Docs,
    /// Playbook-driven steward running in an agent session.
    Custom,
}

crate::labels! {
    StewardFocus {
        Merge => "merge",
        Docs => "docs",
        Custom => "custom",
    }
}

/// When a steward runs: on a cron schedule or on a named event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trigger {
    /// 5- or 6-field cron expression (a leading seconds field is ignored).
    Cron { schedule: String },
    /// Named event channel with an optional boolean condition evaluated
    /// against the event payload.
    Event {
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
    },
}

impl Trigger {
    pub fn cron(schedule: impl Into<String>) -> Self {
        Trigger::Cron { schedule: schedule.into() }
    }

    pub fn event(event: impl Into<String>) -> Self {
        Trigger::Event { event: event.into(), condition: None }
    }

    pub fn event_when(event: impl Into<String>, condition: impl Into<String>) -> Self {
        Trigger::Event { event: event.into(), condition: Some(condition.into()) }
    }

    /// The synthetic trigger used for manual executions.
    pub fn manual() -> Self {
        Trigger::event("manual")
    }

    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::Cron { .. } => TriggerKind::Cron,
            Trigger::Event { event, .. } if event == "manual" => TriggerKind::Manual,
            Trigger::Event { .. } => TriggerKind::Event,
        }
    }
}

/// A steward entity as read from the agent registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Steward {
    pub id: AgentId,
    pub name: String,
    pub focus: StewardFocus,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    /// Reference to a playbook document specializing a custom steward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playbook_id: Option<DocumentId>,
    /// Inline playbook body; used when no `playbook_id` resolves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playbook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_executed_at: Option<DateTime<Utc>>,
}

impl Steward {
    pub fn new(id: impl Into<AgentId>, name: impl Into<String>, focus: StewardFocus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            focus,
            triggers: Vec::new(),
            playbook_id: None,
            playbook: None,
            last_executed_at: None,
        }
    }

    crate::setters! {
        triggers: Vec<Trigger>,
        option playbook_id: DocumentId,
        option playbook: String,
    }
}

#[cfg(test)]
#[path = "steward_tests.rs"]
mod tests;
