// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration for the steward subsystem.
//!
//! Every section deserializes with defaults, so a config file only needs the
//! keys it overrides.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Merge strategy used when landing a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    #[default]
    Squash,
    Merge,
}

crate::labels! {
    MergeStrategy {
        Squash => "squash",
        Merge => "merge",
    }
}

/// Merge steward configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Command run in the task worktree before merging.
    pub test_command: String,
    pub test_timeout_ms: u64,
    /// Attempt the merge after tests pass.
    pub auto_merge: bool,
    /// Remove the task worktree after a successful merge.
    pub auto_cleanup: bool,
    /// Delete the local branch after merge; also the remote one when a
    /// remote exists.
    pub delete_branch_after_merge: bool,
    pub merge_strategy: MergeStrategy,
    pub auto_push_after_merge: bool,
    /// Overrides target-branch auto-detection.
    pub target_branch: Option<String>,
    /// `created_by` for auto-created fix tasks.
    pub steward_entity_id: Option<crate::AgentId>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            test_command: "npm test".to_string(),
            test_timeout_ms: 300_000,
            auto_merge: true,
            auto_cleanup: true,
            delete_branch_after_merge: true,
            merge_strategy: MergeStrategy::Squash,
            auto_push_after_merge: true,
            target_branch: None,
            steward_entity_id: None,
        }
    }
}

impl MergeConfig {
    pub fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_timeout_ms)
    }
}

/// Docs steward configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    /// Documentation root, relative to the workspace.
    pub docs_dir: String,
    /// Directories whose package index files anchor export verification.
    pub source_dirs: Vec<String>,
    /// Push the target branch after a docs merge.
    pub auto_push: bool,
    /// Overrides target-branch auto-detection.
    pub target_branch: Option<String>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            docs_dir: "docs".to_string(),
            source_dirs: vec!["packages".to_string(), "apps".to_string()],
            auto_push: true,
            target_branch: None,
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// History retention cap per steward.
    pub max_history_per_steward: usize,
    pub default_timeout_ms: u64,
    /// Register all stewards from the registry on `start()`.
    pub start_immediately: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_history_per_steward: 100,
            default_timeout_ms: 300_000,
            start_immediately: false,
        }
    }
}

/// Bounds enforced on spawned steward sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_ms: u64,
    pub max_duration_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { idle_timeout_ms: 120_000, max_duration_ms: 1_800_000 }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }
}

/// Root configuration: one section per component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StewardConfig {
    pub merge: MergeConfig,
    pub docs: DocsConfig,
    pub scheduler: SchedulerConfig,
    pub session: SessionConfig,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
