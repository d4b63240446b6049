// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded execution history.
//!
//! Entries are appended provisionally when an execution starts and
//! finalized exactly once. Retention is per steward: the newest
//! `max_per_steward` entries by start time survive, oldest pruned on
//! append. Queries copy out, so callers never observe partial mutation.

use chrono::{DateTime, Utc};
use sf_core::{AgentId, ExecutionEntry, ExecutionId, ExecutionResult, TriggerKind};

/// Filter for [`ExecutionHistory::query`]. All present fields must match.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub steward_id: Option<AgentId>,
    pub trigger_kind: Option<TriggerKind>,
    pub success: Option<bool>,
    pub started_after: Option<DateTime<Utc>>,
    pub started_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub fn steward(mut self, id: impl Into<AgentId>) -> Self {
        self.steward_id = Some(id.into());
        self
    }

    pub fn trigger_kind(mut self, kind: TriggerKind) -> Self {
        self.trigger_kind = Some(kind);
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &ExecutionEntry) -> bool {
        if let Some(id) = &self.steward_id {
            if &entry.steward_id != id {
                return false;
            }
        }
        if let Some(kind) = self.trigger_kind {
            if entry.trigger_kind() != kind {
                return false;
            }
        }
        if let Some(success) = self.success {
            if entry.succeeded() != Some(success) {
                return false;
            }
        }
        if let Some(after) = self.started_after {
            if entry.started_at <= after {
                return false;
            }
        }
        if let Some(before) = self.started_before {
            if entry.started_at >= before {
                return false;
            }
        }
        true
    }
}

/// Append-only bounded execution log.
#[derive(Debug)]
pub struct ExecutionHistory {
    max_per_steward: usize,
    entries: Vec<ExecutionEntry>,
}

impl ExecutionHistory {
    pub fn new(max_per_steward: usize) -> Self {
        Self { max_per_steward, entries: Vec::new() }
    }

    /// Record a provisional entry, pruning the owning steward's oldest
    /// entries past the retention cap.
    pub fn begin(&mut self, entry: ExecutionEntry) {
        let steward_id = entry.steward_id.clone();
        self.entries.push(entry);
        self.prune(&steward_id);
    }

    /// Seal an entry with its completion time and result. Returns false if
    /// the entry is unknown (already pruned) or already finalized.
    pub fn finalize(
        &mut self,
        id: &ExecutionId,
        completed_at: DateTime<Utc>,
        result: ExecutionResult,
    ) -> bool {
        match self.entries.iter_mut().find(|e| &e.execution_id == id) {
            Some(entry) if !entry.is_finalized() => {
                entry.completed_at = Some(completed_at);
                entry.result = Some(result);
                true
            }
            _ => false,
        }
    }

    fn prune(&mut self, steward_id: &AgentId) {
        loop {
            let count = self.entries.iter().filter(|e| &e.steward_id == steward_id).count();
            if count <= self.max_per_steward {
                return;
            }
            let oldest = self
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| &e.steward_id == steward_id)
                .min_by_key(|(_, e)| e.started_at)
                .map(|(i, _)| i);
            match oldest {
                Some(i) => {
                    self.entries.remove(i);
                }
                None => return,
            }
        }
    }

    /// Matching entries, newest first, bounded by the query limit.
    pub fn query(&self, query: &HistoryQuery) -> Vec<ExecutionEntry> {
        let mut found: Vec<ExecutionEntry> =
            self.entries.iter().filter(|e| query.matches(e)).cloned().collect();
        found.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry count for one steward.
    pub fn count_for(&self, steward_id: &AgentId) -> usize {
        self.entries.iter().filter(|e| &e.steward_id == steward_id).count()
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
