// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docs steward session lifecycle against a real git repository.

use sf_adapters::CliGit;
use sf_core::{DocsConfig, FakeClock};
use sf_engine::{DocsSteward, IssueType};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

async fn git(root: &Path, args: &[&str]) {
    let out = sf_adapters::subprocess::run_git(root, args, "spec git").await.unwrap();
    assert!(out.success(), "git {args:?} failed: {}", out.stderr);
}

async fn init_repo_with_docs() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    git(root, &["init", "-b", "main"]).await;
    git(root, &["config", "user.email", "steward@example.com"]).await;
    git(root, &["config", "user.name", "Steward"]).await;
    std::fs::create_dir_all(root.join("docs")).unwrap();
    std::fs::write(root.join("docs/guide.md"), "See [API](./api.md)\n").unwrap();
    git(root, &["add", "--", "docs/guide.md"]).await;
    git(root, &["commit", "--no-verify", "-m", "docs"]).await;
    dir
}

fn steward(repo: &TempDir) -> DocsSteward<FakeClock> {
    DocsSteward::new(
        FakeClock::new(),
        Arc::new(CliGit::new()),
        DocsConfig { auto_push: false, ..DocsConfig::default() },
        repo.path(),
    )
}

#[tokio::test]
async fn scan_finds_the_dead_link() {
    let repo = init_repo_with_docs().await;
    let steward = steward(&repo);

    let report = steward.scan_all().await;
    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.issues.len(), 1);
    let issue = &report.issues[0];
    assert_eq!(issue.issue_type, IssueType::InternalLink);
    assert_eq!(issue.file, "docs/guide.md");
    assert_eq!(issue.line, 1);
    assert_eq!(issue.current_value, "./api.md");
}

#[tokio::test]
async fn session_worktree_commit_and_self_merge() {
    let repo = init_repo_with_docs().await;
    let root = repo.path().to_path_buf();
    let steward = steward(&repo);

    let session = steward.create_session_worktree("docs-bot").await.unwrap();
    assert_eq!(session.branch, "docs-bot/docs/auto-updates");
    assert!(session.path.exists());

    // Fix the dead link inside the session worktree.
    std::fs::write(session.path.join("docs/api.md"), "# API\n").unwrap();
    std::fs::write(session.path.join("docs/guide.md"), "See [API](./api.md)\nDone.\n")
        .unwrap();
    steward
        .commit_fix(
            "docs: add missing api page",
            &["docs/api.md".to_string(), "docs/guide.md".to_string()],
        )
        .await
        .unwrap();

    let result = steward
        .merge_and_cleanup(&session.branch, "docs: automated updates")
        .await;
    assert!(result.success, "merge failed: {:?}", result.error);
    assert!(result.commit_hash.is_some());

    // The fix landed on main, the worktree and branch are gone, and the
    // scan comes back clean.
    assert!(root.join("docs/api.md").exists());
    assert!(!session.path.exists());
    let out = sf_adapters::subprocess::run_git(
        &root,
        &["rev-parse", "--verify", "--quiet", "refs/heads/docs-bot/docs/auto-updates"],
        "branch check",
    )
    .await
    .unwrap();
    assert!(!out.success(), "session branch should be deleted");
    assert_eq!(steward.active_session(), None);

    let report = steward.scan_all().await;
    assert!(report.issues.is_empty(), "issues: {:?}", report.issues);
}

#[tokio::test]
async fn reattaching_to_a_leftover_session_branch() {
    let repo = init_repo_with_docs().await;
    let root = repo.path().to_path_buf();
    let steward = steward(&repo);

    // A branch from a previous crashed session.
    git(&root, &["branch", "docs-bot/docs/auto-updates"]).await;

    let session = steward.create_session_worktree("docs-bot").await.unwrap();
    assert!(!session.created, "should reattach, not recreate");
    assert!(session.path.exists());

    steward.cleanup_session(&session.path, &session.branch).await;
    assert!(!session.path.exists());
}
