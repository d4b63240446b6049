// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;
use tempfile::TempDir;

async fn git(root: &Path, args: &[&str]) {
    let out = crate::subprocess::run_git(root, args, "test git").await.unwrap();
    assert!(out.success(), "git {args:?} failed: {}", out.stderr);
}

async fn write_and_commit(root: &Path, file: &str, content: &str, message: &str) {
    std::fs::write(root.join(file), content).unwrap();
    git(root, &["add", "--", file]).await;
    git(root, &["commit", "--no-verify", "-m", message]).await;
}

/// A repo on `main` with one commit, identity configured.
async fn init_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    git(root, &["init", "-b", "main"]).await;
    git(root, &["config", "user.email", "steward@example.com"]).await;
    git(root, &["config", "user.name", "Steward"]).await;
    write_and_commit(root, "README.md", "# repo\n", "init").await;
    dir
}

#[tokio::test]
async fn squash_merge_success() {
    let dir = init_repo().await;
    let root = dir.path();
    git(root, &["checkout", "-b", "feat/x"]).await;
    write_and_commit(root, "feature.txt", "feature\n", "add feature").await;
    git(root, &["checkout", "main"]).await;

    let outcome = CliGit::new()
        .merge_branch(&MergeRequest {
            workspace_root: root.to_path_buf(),
            source_branch: "feat/x".into(),
            target_branch: "main".into(),
            strategy: MergeStrategy::Squash,
            auto_push: false,
            commit_message: "Add feature (task-1)".into(),
            preflight: true,
            sync_local: false,
        })
        .await;

    assert!(outcome.success, "outcome: {outcome:?}");
    assert!(!outcome.has_conflict);
    assert!(outcome.commit_hash.is_some());
    assert!(root.join("feature.txt").exists());

    // Squash leaves a single new commit on main with the given message.
    let log = crate::subprocess::run_git(root, &["log", "-1", "--format=%s"], "git log")
        .await
        .unwrap();
    assert_eq!(log.stdout.trim(), "Add feature (task-1)");
}

#[tokio::test]
async fn conflicting_merge_reports_files_and_unwinds() {
    let dir = init_repo().await;
    let root = dir.path();
    git(root, &["checkout", "-b", "feat/y"]).await;
    write_and_commit(root, "README.md", "# branch version\n", "branch edit").await;
    git(root, &["checkout", "main"]).await;
    write_and_commit(root, "README.md", "# main version\n", "main edit").await;

    let outcome = CliGit::new()
        .merge_branch(&MergeRequest {
            workspace_root: root.to_path_buf(),
            source_branch: "feat/y".into(),
            target_branch: "main".into(),
            strategy: MergeStrategy::Squash,
            auto_push: false,
            commit_message: "msg".into(),
            preflight: true,
            sync_local: false,
        })
        .await;

    assert!(!outcome.success);
    assert!(outcome.has_conflict);
    assert_eq!(outcome.conflict_files, vec!["README.md".to_string()]);

    // The tree is clean again after the unwind.
    let status = crate::subprocess::run_git(root, &["status", "--porcelain"], "git status")
        .await
        .unwrap();
    assert_eq!(status.stdout.trim(), "");
}

#[tokio::test]
async fn merge_strategy_creates_merge_commit() {
    let dir = init_repo().await;
    let root = dir.path();
    git(root, &["checkout", "-b", "feat/z"]).await;
    write_and_commit(root, "z.txt", "z\n", "z").await;
    git(root, &["checkout", "main"]).await;

    let outcome = CliGit::new()
        .merge_branch(&MergeRequest {
            workspace_root: root.to_path_buf(),
            source_branch: "feat/z".into(),
            target_branch: "main".into(),
            strategy: MergeStrategy::Merge,
            auto_push: false,
            commit_message: "Merge branch 'feat/z' (Task: task-2)".into(),
            preflight: true,
            sync_local: false,
        })
        .await;

    assert!(outcome.success, "outcome: {outcome:?}");
    let log = crate::subprocess::run_git(root, &["log", "-1", "--format=%s"], "git log")
        .await
        .unwrap();
    assert_eq!(log.stdout.trim(), "Merge branch 'feat/z' (Task: task-2)");
}

#[tokio::test]
async fn preflight_rejects_missing_source_branch() {
    let dir = init_repo().await;
    let outcome = CliGit::new()
        .merge_branch(&MergeRequest {
            workspace_root: dir.path().to_path_buf(),
            source_branch: "feat/ghost".into(),
            target_branch: "main".into(),
            strategy: MergeStrategy::Squash,
            auto_push: false,
            commit_message: "msg".into(),
            preflight: true,
            sync_local: false,
        })
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap_or_default().contains("feat/ghost"));
}

#[tokio::test]
async fn preflight_rejects_dirty_tree() {
    let dir = init_repo().await;
    let root = dir.path();
    git(root, &["checkout", "-b", "feat/w"]).await;
    write_and_commit(root, "w.txt", "w\n", "w").await;
    git(root, &["checkout", "main"]).await;
    std::fs::write(root.join("dirty.txt"), "uncommitted").unwrap();
    git(root, &["add", "--", "dirty.txt"]).await;

    let outcome = CliGit::new()
        .merge_branch(&MergeRequest {
            workspace_root: root.to_path_buf(),
            source_branch: "feat/w".into(),
            target_branch: "main".into(),
            strategy: MergeStrategy::Squash,
            auto_push: false,
            commit_message: "msg".into(),
            preflight: true,
            sync_local: false,
        })
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap_or_default().contains("not clean"));
}

#[tokio::test]
async fn branch_queries() {
    let dir = init_repo().await;
    let root = dir.path();
    let git_ops = CliGit::new();

    assert_eq!(git_ops.current_branch(root).await.as_deref(), Some("main"));
    assert!(git_ops.branch_exists(root, "main").await);
    assert!(!git_ops.branch_exists(root, "nope").await);
    assert!(!git_ops.has_remote(root).await);
    assert_eq!(git_ops.remote_head(root).await, None);
}

#[tokio::test]
async fn delete_local_branch_works() {
    let dir = init_repo().await;
    let root = dir.path();
    git(root, &["branch", "doomed"]).await;
    let git_ops = CliGit::new();
    assert!(git_ops.branch_exists(root, "doomed").await);
    git_ops.delete_local_branch(root, "doomed").await.unwrap();
    assert!(!git_ops.branch_exists(root, "doomed").await);
}

#[tokio::test]
async fn worktree_add_and_remove() {
    let dir = init_repo().await;
    let root = dir.path();
    let wt = root.join(".worktrees").join("session");
    let git_ops = CliGit::new();

    git_ops.add_worktree(root, &wt, "docs/session", true, Some("main")).await.unwrap();
    assert!(wt.join("README.md").exists());
    assert!(git_ops.branch_exists(root, "docs/session").await);

    git_ops.remove_worktree(root, &wt, true).await.unwrap();
    assert!(!wt.exists());
}

#[tokio::test]
async fn stage_and_commit_in_worktree() {
    let dir = init_repo().await;
    let root = dir.path();
    let git_ops = CliGit::new();

    std::fs::write(root.join("doc.md"), "content\n").unwrap();
    git_ops.stage(root, "doc.md").await.unwrap();
    git_ops.commit(root, r#"docs: fix "broken" link"#).await.unwrap();

    let log = crate::subprocess::run_git(root, &["log", "-1", "--format=%s"], "git log")
        .await
        .unwrap();
    assert!(log.stdout.contains("broken"));
}

#[test]
fn escape_quotes_minimum_bar() {
    assert_eq!(escape_quotes(r#"fix "x" now"#), r#"fix \"x\" now"#);
    assert_eq!(escape_quotes("plain"), "plain");
}

#[test]
fn outcome_constructors() {
    let merged = MergeOutcome::merged("abc123");
    assert!(merged.success);
    assert_eq!(merged.commit_hash.as_deref(), Some("abc123"));

    let conflict = MergeOutcome::conflict(vec!["a.rs".into()], "conflict");
    assert!(!conflict.success);
    assert!(conflict.has_conflict);

    let failed = MergeOutcome::failed("nope");
    assert!(!failed.success);
    assert!(!failed.has_conflict);
}
