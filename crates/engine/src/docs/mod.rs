// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docs steward: find referential drift in the documentation tree and
//! land corrections through a dedicated session worktree.
//!
//! Scanning is read-only and safe to run anywhere. Corrections go through
//! the session lifecycle: a worktree on a steward-owned branch, per-file
//! commits, then a squash self-merge into the target branch.

pub mod scan;

use crate::error::EngineError;
use sf_adapters::{GitOps, MergeRequest};
use sf_core::{Clock, DocsConfig, MergeStrategy, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use scan::{Confidence, DocIssue, IssueType};

/// Result of one full documentation scan.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DocsScanReport {
    pub issues: Vec<DocIssue>,
    pub files_scanned: usize,
    pub duration_ms: u64,
}

/// An active docs session worktree.
#[derive(Debug, Clone, PartialEq)]
pub struct DocsSession {
    pub path: PathBuf,
    pub branch: String,
    /// True when the branch was created by this session (as opposed to
    /// reattaching to a leftover branch).
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocsMergeResult {
    pub success: bool,
    pub commit_hash: Option<String>,
    pub error: Option<String>,
}

pub struct DocsSteward<C: Clock = SystemClock> {
    clock: C,
    git: Arc<dyn GitOps>,
    config: DocsConfig,
    workspace_root: PathBuf,
    session: parking_lot::Mutex<Option<DocsSession>>,
}

impl<C: Clock> DocsSteward<C> {
    pub fn new(
        clock: C,
        git: Arc<dyn GitOps>,
        config: DocsConfig,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            clock,
            git,
            config,
            workspace_root: workspace_root.into(),
            session: parking_lot::Mutex::new(None),
        }
    }

    pub fn active_session(&self) -> Option<DocsSession> {
        self.session.lock().clone()
    }

    /// Run every verification pass concurrently and aggregate the issues.
    pub async fn scan_all(&self) -> DocsScanReport {
        let start = self.clock.now();
        let docs_root = self.workspace_root.join(&self.config.docs_dir);
        let files = scan::markdown_files(&docs_root);
        let files_scanned = files.len();

        let root = self.workspace_root.clone();
        let files_for_paths = files.clone();
        let paths_pass =
            tokio::task::spawn_blocking(move || scan::paths::scan(&root, &files_for_paths));

        let root = self.workspace_root.clone();
        let files_for_links = files.clone();
        let links_pass =
            tokio::task::spawn_blocking(move || scan::links::scan(&root, &files_for_links));

        let root = self.workspace_root.clone();
        let source_dirs = self.config.source_dirs.clone();
        let exports_pass = tokio::task::spawn_blocking(move || {
            scan::exports::scan(&root, &files, &source_dirs)
        });

        let root = self.workspace_root.clone();
        let cli_pass = tokio::task::spawn_blocking(move || scan::cli::scan(&root));

        let (paths, links, exports, cli) =
            tokio::join!(paths_pass, links_pass, exports_pass, cli_pass);

        let mut issues = Vec::new();
        for pass in [paths, links, exports, cli] {
            match pass {
                Ok(found) => issues.extend(found),
                Err(err) => tracing::warn!(error = %err, "docs scan pass panicked"),
            }
        }
        // Type-field and API-method passes are reserved and contribute
        // nothing yet.
        issues.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));

        let duration_ms =
            self.clock.now().saturating_duration_since(start).as_millis() as u64;
        tracing::info!(files_scanned, issues = issues.len(), duration_ms, "docs scan done");
        DocsScanReport { issues, files_scanned, duration_ms }
    }

    /// Create (or reattach) the session worktree for this steward.
    pub async fn create_session_worktree(
        &self,
        steward_name: &str,
    ) -> Result<DocsSession, EngineError> {
        let branch = format!("{steward_name}/docs/auto-updates");
        let path = self
            .workspace_root
            .join(".stoneforge")
            .join(".worktrees")
            .join(format!("docs-steward-{}", self.clock.epoch_ms()));

        if path.exists() {
            // A stale directory from a crashed session; clear it first.
            let _ = self.git.remove_worktree(&self.workspace_root, &path, true).await;
            if path.exists() {
                if let Err(err) = std::fs::remove_dir_all(&path) {
                    tracing::warn!(path = %path.display(), error = %err, "stale worktree removal failed");
                }
            }
        }

        let reattach = self.git.branch_exists(&self.workspace_root, &branch).await;
        if reattach {
            self.git
                .add_worktree(&self.workspace_root, &path, &branch, false, None)
                .await?;
        } else {
            let target = self.resolve_target_branch().await;
            self.git
                .add_worktree(&self.workspace_root, &path, &branch, true, Some(&target))
                .await?;
        }

        let session = DocsSession { path, branch, created: !reattach };
        *self.session.lock() = Some(session.clone());
        tracing::info!(
            branch = %session.branch,
            path = %session.path.display(),
            reattached = reattach,
            "docs session worktree ready"
        );
        Ok(session)
    }

    /// Stage the listed files and commit them in the session worktree.
    ///
    /// Files are staged one at a time so a bad path fails alone rather
    /// than aborting the whole commit.
    pub async fn commit_fix(&self, message: &str, files: &[String]) -> Result<(), EngineError> {
        let session = self.active_session().ok_or(EngineError::NoActiveDocsSession)?;

        let mut staged = 0usize;
        for file in files {
            match self.git.stage(&session.path, file).await {
                Ok(()) => staged += 1,
                Err(err) => {
                    tracing::warn!(file, error = %err, "could not stage docs fix");
                }
            }
        }
        if staged == 0 && !files.is_empty() {
            return Err(EngineError::Git(sf_adapters::GitError::Command {
                op: "add",
                detail: "no listed file could be staged".to_string(),
            }));
        }

        self.git.commit(&session.path, message).await?;
        Ok(())
    }

    /// Squash-merge the session branch into the target and clean up.
    pub async fn merge_and_cleanup(&self, branch: &str, message: &str) -> DocsMergeResult {
        let target = self.resolve_target_branch().await;
        let outcome = self
            .git
            .merge_branch(&MergeRequest {
                workspace_root: self.workspace_root.clone(),
                source_branch: branch.to_string(),
                target_branch: target,
                strategy: MergeStrategy::Squash,
                auto_push: self.config.auto_push,
                commit_message: message.to_string(),
                preflight: false,
                sync_local: false,
            })
            .await;

        if outcome.success {
            if let Some(session) = self.active_session() {
                self.cleanup_session(&session.path, &session.branch).await;
            }
            DocsMergeResult { success: true, commit_hash: outcome.commit_hash, error: None }
        } else {
            tracing::warn!(branch, error = ?outcome.error, "docs self-merge failed");
            DocsMergeResult { success: false, commit_hash: None, error: outcome.error }
        }
    }

    /// Remove the session worktree and branch. Best-effort on both.
    pub async fn cleanup_session(&self, path: &Path, branch: &str) {
        if let Err(err) = self.git.remove_worktree(&self.workspace_root, path, true).await {
            tracing::warn!(path = %path.display(), error = %err, "worktree removal failed");
        }
        if let Err(err) = self.git.delete_local_branch(&self.workspace_root, branch).await {
            tracing::warn!(branch, error = %err, "session branch delete failed");
        }
        *self.session.lock() = None;
    }

    /// Config, then the remote default branch, then local main/master,
    /// then `main`.
    async fn resolve_target_branch(&self) -> String {
        if let Some(branch) = &self.config.target_branch {
            return branch.clone();
        }
        if let Some(head) = self.git.remote_head(&self.workspace_root).await {
            return head.strip_prefix("origin/").unwrap_or(&head).to_string();
        }
        for candidate in ["main", "master"] {
            if self.git.branch_exists(&self.workspace_root, candidate).await {
                return candidate.to_string();
            }
        }
        "main".to_string()
    }
}

#[cfg(test)]
#[path = "docs_tests.rs"]
mod tests;
