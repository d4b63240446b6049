// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worktree manager contract: default branch lookup and worktree removal.

use crate::git::GitError;
use crate::subprocess::run_git;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait WorktreeManager: Send + Sync {
    /// The repository's default branch, if it can be determined.
    async fn default_branch(&self) -> Result<Option<String>, GitError>;

    /// Remove a worktree registered under this repository.
    async fn remove_worktree(&self, path: &Path, force: bool) -> Result<(), GitError>;
}

/// Worktree manager backed by the git CLI.
pub struct GitWorktrees {
    workspace_root: PathBuf,
}

impl GitWorktrees {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self { workspace_root: workspace_root.into() }
    }
}

#[async_trait]
impl WorktreeManager for GitWorktrees {
    async fn default_branch(&self) -> Result<Option<String>, GitError> {
        // origin/HEAD names the default branch when a remote exists.
        let out = run_git(
            &self.workspace_root,
            &["symbolic-ref", "refs/remotes/origin/HEAD"],
            "git symbolic-ref",
        )
        .await?;
        if out.success() {
            let name = out
                .stdout
                .trim()
                .strip_prefix("refs/remotes/origin/")
                .map(str::to_string);
            if name.is_some() {
                return Ok(name);
            }
        }
        // Local-only repos: whatever HEAD points at.
        let out = run_git(
            &self.workspace_root,
            &["rev-parse", "--abbrev-ref", "HEAD"],
            "git rev-parse",
        )
        .await?;
        if out.success() {
            let branch = out.stdout.trim();
            if !branch.is_empty() && branch != "HEAD" {
                return Ok(Some(branch.to_string()));
            }
        }
        Ok(None)
    }

    async fn remove_worktree(&self, path: &Path, force: bool) -> Result<(), GitError> {
        let path_str = path.display().to_string();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path_str);
        let out = run_git(&self.workspace_root, &args, "git worktree remove").await?;
        if out.success() {
            Ok(())
        } else {
            Err(GitError::Command {
                op: "worktree remove",
                detail: out.stderr.trim().to_string(),
            })
        }
    }
}

/// Scriptable worktree manager for tests.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeWorktrees {
    inner: parking_lot::Mutex<FakeWorktreesInner>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
struct FakeWorktreesInner {
    default_branch: Option<String>,
    removed: Vec<PathBuf>,
    fail_removals: bool,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeWorktrees {
    pub fn new() -> Self {
        Self { inner: parking_lot::Mutex::new(FakeWorktreesInner::default()) }
    }

    pub fn set_default_branch(&self, branch: impl Into<String>) {
        self.inner.lock().default_branch = Some(branch.into());
    }

    pub fn fail_removals(&self) {
        self.inner.lock().fail_removals = true;
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.inner.lock().removed.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeWorktrees {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl WorktreeManager for FakeWorktrees {
    async fn default_branch(&self) -> Result<Option<String>, GitError> {
        Ok(self.inner.lock().default_branch.clone())
    }

    async fn remove_worktree(&self, path: &Path, _force: bool) -> Result<(), GitError> {
        let mut inner = self.inner.lock();
        if inner.fail_removals {
            return Err(GitError::Command { op: "worktree remove", detail: "locked".into() });
        }
        inner.removed.push(path.to_path_buf());
        Ok(())
    }
}
