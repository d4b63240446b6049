// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git operations: branch merging, remotes, worktrees, staging.
//!
//! All invocations are argv-form through [`crate::subprocess`], so
//! user-controlled strings (commit messages, branch names) never pass
//! through a shell. Merge failures and conflicts are domain outcomes, not
//! errors; only infrastructure surprises (spawn failure, timeout) surface
//! as [`GitError`].

use crate::subprocess::{run_git, SubprocessError};
use async_trait::async_trait;
use sf_core::MergeStrategy;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),
    #[error("git {op} failed: {detail}")]
    Command { op: &'static str, detail: String },
}

/// Escape double quotes in a user-provided message.
///
/// Argv-form execution already prevents injection; this is the minimum bar
/// for messages that may later be embedded in shell contexts downstream.
pub fn escape_quotes(message: &str) -> String {
    message.replace('"', "\\\"")
}

/// Parameters for one branch merge.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub workspace_root: PathBuf,
    pub source_branch: String,
    pub target_branch: String,
    pub strategy: MergeStrategy,
    pub auto_push: bool,
    pub commit_message: String,
    /// Verify branches exist and the tree is clean before touching anything.
    pub preflight: bool,
    /// Fast-forward the local target from its remote counterpart afterwards.
    pub sync_local: bool,
}

/// What a merge attempt produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeOutcome {
    pub success: bool,
    pub commit_hash: Option<String>,
    pub has_conflict: bool,
    pub conflict_files: Vec<String>,
    pub error: Option<String>,
}

impl MergeOutcome {
    pub fn merged(hash: impl Into<String>) -> Self {
        Self { success: true, commit_hash: Some(hash.into()), ..Self::default() }
    }

    pub fn conflict(files: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            has_conflict: true,
            conflict_files: files,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), ..Self::default() }
    }
}

#[async_trait]
pub trait GitOps: Send + Sync {
    /// Merge `source_branch` into `target_branch`. Conflicts and failures
    /// come back inside the outcome.
    async fn merge_branch(&self, req: &MergeRequest) -> MergeOutcome;

    async fn has_remote(&self, root: &Path) -> bool;
    /// Fetch from origin. Best-effort at call sites.
    async fn fetch(&self, root: &Path) -> Result<(), GitError>;
    /// Fast-forward the local `branch` from `origin/<branch>`.
    async fn sync_local_branch(&self, root: &Path, branch: &str) -> Result<(), GitError>;
    /// `git rev-parse --abbrev-ref HEAD`.
    async fn current_branch(&self, root: &Path) -> Option<String>;
    /// The remote default branch, e.g. `origin/main`, from
    /// `git symbolic-ref refs/remotes/origin/HEAD`.
    async fn remote_head(&self, root: &Path) -> Option<String>;
    async fn branch_exists(&self, root: &Path, branch: &str) -> bool;
    async fn delete_local_branch(&self, root: &Path, branch: &str) -> Result<(), GitError>;
    async fn delete_remote_branch(&self, root: &Path, branch: &str) -> Result<(), GitError>;

    /// Attach a worktree at `path`. With `create`, the branch is created
    /// from `start_point`; otherwise the existing branch is checked out.
    async fn add_worktree(
        &self,
        root: &Path,
        path: &Path,
        branch: &str,
        create: bool,
        start_point: Option<&str>,
    ) -> Result<(), GitError>;
    async fn remove_worktree(&self, root: &Path, path: &Path, force: bool)
        -> Result<(), GitError>;

    async fn stage(&self, worktree: &Path, file: &str) -> Result<(), GitError>;
    async fn commit(&self, worktree: &Path, message: &str) -> Result<(), GitError>;
}

/// Git CLI-backed implementation.
#[derive(Default, Clone, Copy)]
pub struct CliGit;

impl CliGit {
    pub fn new() -> Self {
        Self
    }

    async fn conflicted_files(&self, root: &Path) -> Vec<String> {
        match run_git(root, &["diff", "--name-only", "--diff-filter=U"], "git diff").await {
            Ok(out) if out.success() => {
                out.stdout.lines().map(str::to_string).filter(|l| !l.is_empty()).collect()
            }
            _ => Vec::new(),
        }
    }

    async fn preflight(&self, req: &MergeRequest) -> Option<MergeOutcome> {
        let root = &req.workspace_root;
        if !self.branch_exists(root, &req.source_branch).await {
            return Some(MergeOutcome::failed(format!(
                "source branch '{}' does not exist",
                req.source_branch
            )));
        }
        if !self.branch_exists(root, &req.target_branch).await {
            return Some(MergeOutcome::failed(format!(
                "target branch '{}' does not exist",
                req.target_branch
            )));
        }
        match run_git(root, &["status", "--porcelain"], "git status").await {
            Ok(out) if out.success() && out.stdout.trim().is_empty() => None,
            Ok(_) => Some(MergeOutcome::failed("working tree is not clean")),
            Err(err) => Some(MergeOutcome::failed(err.to_string())),
        }
    }

    /// Undo a half-applied merge and return to the original branch.
    async fn unwind(&self, root: &Path, strategy: MergeStrategy, original: &Option<String>) {
        let abort = match strategy {
            MergeStrategy::Squash => ["reset", "--merge"].as_slice(),
            MergeStrategy::Merge => ["merge", "--abort"].as_slice(),
        };
        let _ = run_git(root, abort, "git merge unwind").await;
        if let Some(branch) = original {
            let _ = run_git(root, &["checkout", branch], "git checkout").await;
        }
    }
}

#[async_trait]
impl GitOps for CliGit {
    async fn merge_branch(&self, req: &MergeRequest) -> MergeOutcome {
        let root = &req.workspace_root;

        if req.preflight {
            if let Some(outcome) = self.preflight(req).await {
                return outcome;
            }
        }

        let original = self.current_branch(root).await;
        let restore = original.as_deref().filter(|b| *b != req.target_branch);

        let checkout =
            run_git(root, &["checkout", &req.target_branch], "git checkout").await;
        match checkout {
            Ok(out) if out.success() => {}
            Ok(out) => {
                return MergeOutcome::failed(format!(
                    "checkout of '{}' failed: {}",
                    req.target_branch,
                    out.stderr.trim()
                ))
            }
            Err(err) => return MergeOutcome::failed(err.to_string()),
        }

        let merge = match req.strategy {
            MergeStrategy::Squash => {
                run_git(root, &["merge", "--squash", &req.source_branch], "git merge").await
            }
            MergeStrategy::Merge => {
                run_git(
                    root,
                    &["merge", "--no-ff", "-m", &req.commit_message, &req.source_branch],
                    "git merge",
                )
                .await
            }
        };

        let merge = match merge {
            Ok(out) => out,
            Err(err) => {
                self.unwind(root, req.strategy, &original).await;
                return MergeOutcome::failed(err.to_string());
            }
        };

        if !merge.success() {
            let files = self.conflicted_files(root).await;
            self.unwind(root, req.strategy, &original).await;
            let detail = merge.stderr.trim().to_string();
            return if files.is_empty() {
                MergeOutcome::failed(format!("merge failed: {detail}"))
            } else {
                MergeOutcome::conflict(files, format!("merge conflict: {detail}"))
            };
        }

        if req.strategy == MergeStrategy::Squash {
            let commit = run_git(
                root,
                &["commit", "--no-verify", "-m", &req.commit_message],
                "git commit",
            )
            .await;
            match commit {
                Ok(out) if out.success() => {}
                Ok(out) => {
                    self.unwind(root, req.strategy, &original).await;
                    return MergeOutcome::failed(format!(
                        "squash commit failed: {}",
                        out.stderr.trim()
                    ));
                }
                Err(err) => {
                    self.unwind(root, req.strategy, &original).await;
                    return MergeOutcome::failed(err.to_string());
                }
            }
        }

        let hash = match run_git(root, &["rev-parse", "HEAD"], "git rev-parse").await {
            Ok(out) if out.success() => out.stdout.trim().to_string(),
            _ => String::new(),
        };

        if req.auto_push && self.has_remote(root).await {
            let push =
                run_git(root, &["push", "origin", &req.target_branch], "git push").await;
            match push {
                Ok(out) if out.success() => {}
                Ok(out) => tracing::warn!(
                    branch = %req.target_branch,
                    stderr = %out.stderr.trim(),
                    "push after merge failed"
                ),
                Err(err) => {
                    tracing::warn!(error = %err, "push after merge failed")
                }
            }
        }

        if req.sync_local {
            let _ = self.sync_local_branch(root, &req.target_branch).await;
        }

        if let Some(branch) = restore {
            let _ = run_git(root, &["checkout", branch], "git checkout").await;
        }

        MergeOutcome::merged(hash)
    }

    async fn has_remote(&self, root: &Path) -> bool {
        match run_git(root, &["remote"], "git remote").await {
            Ok(out) => out.success() && !out.stdout.trim().is_empty(),
            Err(_) => false,
        }
    }

    async fn fetch(&self, root: &Path) -> Result<(), GitError> {
        let out = run_git(root, &["fetch", "origin"], "git fetch").await?;
        if out.success() {
            Ok(())
        } else {
            Err(GitError::Command { op: "fetch", detail: out.stderr.trim().to_string() })
        }
    }

    async fn sync_local_branch(&self, root: &Path, branch: &str) -> Result<(), GitError> {
        self.fetch(root).await?;
        let spec = format!("origin/{branch}:{branch}");
        let out = run_git(root, &["fetch", "origin", &spec], "git fetch branch").await;
        match out {
            Ok(out) if out.success() => Ok(()),
            Ok(out) => Err(GitError::Command {
                op: "sync-local-branch",
                detail: out.stderr.trim().to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn current_branch(&self, root: &Path) -> Option<String> {
        match run_git(root, &["rev-parse", "--abbrev-ref", "HEAD"], "git rev-parse").await {
            Ok(out) if out.success() => {
                let branch = out.stdout.trim();
                (!branch.is_empty()).then(|| branch.to_string())
            }
            _ => None,
        }
    }

    async fn remote_head(&self, root: &Path) -> Option<String> {
        let out = run_git(
            root,
            &["symbolic-ref", "refs/remotes/origin/HEAD"],
            "git symbolic-ref",
        )
        .await
        .ok()?;
        if !out.success() {
            return None;
        }
        out.stdout.trim().strip_prefix("refs/remotes/").map(str::to_string)
    }

    async fn branch_exists(&self, root: &Path, branch: &str) -> bool {
        let refname = format!("refs/heads/{branch}");
        match run_git(root, &["rev-parse", "--verify", "--quiet", &refname], "git rev-parse")
            .await
        {
            Ok(out) => out.success(),
            Err(_) => false,
        }
    }

    async fn delete_local_branch(&self, root: &Path, branch: &str) -> Result<(), GitError> {
        let out = run_git(root, &["branch", "-D", branch], "git branch -D").await?;
        if out.success() {
            Ok(())
        } else {
            Err(GitError::Command {
                op: "branch -D",
                detail: out.stderr.trim().to_string(),
            })
        }
    }

    async fn delete_remote_branch(&self, root: &Path, branch: &str) -> Result<(), GitError> {
        let out = run_git(root, &["push", "origin", "--delete", branch], "git push --delete")
            .await?;
        if out.success() {
            Ok(())
        } else {
            Err(GitError::Command {
                op: "push --delete",
                detail: out.stderr.trim().to_string(),
            })
        }
    }

    async fn add_worktree(
        &self,
        root: &Path,
        path: &Path,
        branch: &str,
        create: bool,
        start_point: Option<&str>,
    ) -> Result<(), GitError> {
        let path_str = path.display().to_string();
        let mut args = vec!["worktree", "add"];
        if create {
            args.push("-b");
            args.push(branch);
            args.push(&path_str);
            if let Some(start) = start_point {
                args.push(start);
            }
        } else {
            args.push(&path_str);
            args.push(branch);
        }
        let out = run_git(root, &args, "git worktree add").await?;
        if out.success() {
            Ok(())
        } else {
            Err(GitError::Command {
                op: "worktree add",
                detail: out.stderr.trim().to_string(),
            })
        }
    }

    async fn remove_worktree(
        &self,
        root: &Path,
        path: &Path,
        force: bool,
    ) -> Result<(), GitError> {
        let path_str = path.display().to_string();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path_str);
        let out = run_git(root, &args, "git worktree remove").await?;
        if out.success() {
            Ok(())
        } else {
            Err(GitError::Command {
                op: "worktree remove",
                detail: out.stderr.trim().to_string(),
            })
        }
    }

    async fn stage(&self, worktree: &Path, file: &str) -> Result<(), GitError> {
        let out = run_git(worktree, &["add", "--", file], "git add").await?;
        if out.success() {
            Ok(())
        } else {
            Err(GitError::Command { op: "add", detail: out.stderr.trim().to_string() })
        }
    }

    async fn commit(&self, worktree: &Path, message: &str) -> Result<(), GitError> {
        let message = escape_quotes(message);
        let out =
            run_git(worktree, &["commit", "--no-verify", "-m", &message], "git commit").await?;
        if out.success() {
            Ok(())
        } else {
            Err(GitError::Command { op: "commit", detail: out.stderr.trim().to_string() })
        }
    }
}

/// Scriptable git backend for tests.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeGit {
    inner: parking_lot::Mutex<FakeGitInner>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
struct FakeGitInner {
    merge_outcomes: std::collections::VecDeque<MergeOutcome>,
    merges: Vec<MergeRequest>,
    has_remote: bool,
    current_branch: Option<String>,
    remote_head: Option<String>,
    branches: std::collections::HashSet<String>,
    deleted_local: Vec<String>,
    deleted_remote: Vec<String>,
    added_worktrees: Vec<(PathBuf, String, bool)>,
    removed_worktrees: Vec<PathBuf>,
    staged: Vec<(PathBuf, String)>,
    commits: Vec<(PathBuf, String)>,
    fetches: usize,
    synced: Vec<String>,
    fail_stage_for: Option<String>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeGit {
    pub fn new() -> Self {
        Self { inner: parking_lot::Mutex::new(FakeGitInner::default()) }
    }

    /// Queue the outcome of the next `merge_branch` call.
    pub fn push_merge_outcome(&self, outcome: MergeOutcome) {
        self.inner.lock().merge_outcomes.push_back(outcome);
    }

    pub fn set_has_remote(&self, value: bool) {
        self.inner.lock().has_remote = value;
    }

    pub fn set_current_branch(&self, branch: impl Into<String>) {
        self.inner.lock().current_branch = Some(branch.into());
    }

    pub fn set_remote_head(&self, head: impl Into<String>) {
        self.inner.lock().remote_head = Some(head.into());
    }

    pub fn add_branch(&self, branch: impl Into<String>) {
        self.inner.lock().branches.insert(branch.into());
    }

    pub fn fail_stage_for(&self, file: impl Into<String>) {
        self.inner.lock().fail_stage_for = Some(file.into());
    }

    pub fn merges(&self) -> Vec<MergeRequest> {
        self.inner.lock().merges.clone()
    }

    pub fn deleted_local_branches(&self) -> Vec<String> {
        self.inner.lock().deleted_local.clone()
    }

    pub fn deleted_remote_branches(&self) -> Vec<String> {
        self.inner.lock().deleted_remote.clone()
    }

    pub fn added_worktrees(&self) -> Vec<(PathBuf, String, bool)> {
        self.inner.lock().added_worktrees.clone()
    }

    pub fn removed_worktrees(&self) -> Vec<PathBuf> {
        self.inner.lock().removed_worktrees.clone()
    }

    pub fn staged(&self) -> Vec<(PathBuf, String)> {
        self.inner.lock().staged.clone()
    }

    pub fn commits(&self) -> Vec<(PathBuf, String)> {
        self.inner.lock().commits.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.lock().fetches
    }

    pub fn synced_branches(&self) -> Vec<String> {
        self.inner.lock().synced.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeGit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl GitOps for FakeGit {
    async fn merge_branch(&self, req: &MergeRequest) -> MergeOutcome {
        let mut inner = self.inner.lock();
        inner.merges.push(req.clone());
        inner
            .merge_outcomes
            .pop_front()
            .unwrap_or_else(|| MergeOutcome::merged("fake-commit"))
    }

    async fn has_remote(&self, _root: &Path) -> bool {
        self.inner.lock().has_remote
    }

    async fn fetch(&self, _root: &Path) -> Result<(), GitError> {
        self.inner.lock().fetches += 1;
        Ok(())
    }

    async fn sync_local_branch(&self, _root: &Path, branch: &str) -> Result<(), GitError> {
        self.inner.lock().synced.push(branch.to_string());
        Ok(())
    }

    async fn current_branch(&self, _root: &Path) -> Option<String> {
        self.inner.lock().current_branch.clone()
    }

    async fn remote_head(&self, _root: &Path) -> Option<String> {
        self.inner.lock().remote_head.clone()
    }

    async fn branch_exists(&self, _root: &Path, branch: &str) -> bool {
        self.inner.lock().branches.contains(branch)
    }

    async fn delete_local_branch(&self, _root: &Path, branch: &str) -> Result<(), GitError> {
        let mut inner = self.inner.lock();
        inner.branches.remove(branch);
        inner.deleted_local.push(branch.to_string());
        Ok(())
    }

    async fn delete_remote_branch(&self, _root: &Path, branch: &str) -> Result<(), GitError> {
        self.inner.lock().deleted_remote.push(branch.to_string());
        Ok(())
    }

    async fn add_worktree(
        &self,
        _root: &Path,
        path: &Path,
        branch: &str,
        create: bool,
        _start_point: Option<&str>,
    ) -> Result<(), GitError> {
        let mut inner = self.inner.lock();
        if create {
            inner.branches.insert(branch.to_string());
        }
        inner.added_worktrees.push((path.to_path_buf(), branch.to_string(), create));
        Ok(())
    }

    async fn remove_worktree(
        &self,
        _root: &Path,
        path: &Path,
        _force: bool,
    ) -> Result<(), GitError> {
        self.inner.lock().removed_worktrees.push(path.to_path_buf());
        Ok(())
    }

    async fn stage(&self, worktree: &Path, file: &str) -> Result<(), GitError> {
        let mut inner = self.inner.lock();
        if inner.fail_stage_for.as_deref() == Some(file) {
            return Err(GitError::Command { op: "add", detail: format!("pathspec {file}") });
        }
        inner.staged.push((worktree.to_path_buf(), file.to_string()));
        Ok(())
    }

    async fn commit(&self, worktree: &Path, message: &str) -> Result<(), GitError> {
        self.inner.lock().commits.push((worktree.to_path_buf(), message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
