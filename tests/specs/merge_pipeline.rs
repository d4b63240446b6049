// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merge steward against a real git repository.

use sf_adapters::{
    CliGit, FakeDispatch, FakeRegistry, FakeTaskStore, GitWorktrees, TaskStore,
};
use sf_core::test_support::TaskBuilder;
use sf_core::{FakeClock, MergeConfig, MergeStatus, TaskId, TaskStatus};
use sf_engine::{MergeProcessStatus, MergeSteward, ProcessOptions};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

async fn git(root: &Path, args: &[&str]) {
    let out = sf_adapters::subprocess::run_git(root, args, "spec git").await.unwrap();
    assert!(out.success(), "git {args:?} failed: {}", out.stderr);
}

async fn commit_file(root: &Path, file: &str, content: &str, message: &str) {
    std::fs::write(root.join(file), content).unwrap();
    git(root, &["add", "--", file]).await;
    git(root, &["commit", "--no-verify", "-m", message]).await;
}

async fn init_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    git(root, &["init", "-b", "main"]).await;
    git(root, &["config", "user.email", "steward@example.com"]).await;
    git(root, &["config", "user.name", "Steward"]).await;
    commit_file(root, "README.md", "# repo\n", "init").await;
    dir
}

struct Pipeline {
    steward: MergeSteward<FakeClock>,
    store: Arc<FakeTaskStore>,
    _repo: TempDir,
}

fn pipeline(repo: TempDir, config: MergeConfig) -> Pipeline {
    let clock = FakeClock::new();
    let store = Arc::new(FakeTaskStore::with_clock(clock.clone()));
    let steward = MergeSteward::new(
        clock,
        Arc::clone(&store) as _,
        Arc::new(FakeRegistry::new()) as _,
        Arc::new(FakeDispatch::new()) as _,
        Arc::new(CliGit::new()) as _,
        Arc::new(GitWorktrees::new(repo.path())) as _,
        config,
        repo.path(),
    );
    Pipeline { steward, store, _repo: repo }
}

#[tokio::test]
async fn review_task_lands_on_main_and_closes() {
    let repo = init_repo().await;
    let root = repo.path().to_path_buf();

    git(&root, &["checkout", "-b", "feat/x"]).await;
    commit_file(&root, "feature.txt", "feature\n", "add feature").await;
    git(&root, &["checkout", "main"]).await;

    let config = MergeConfig {
        test_command: "true".into(),
        target_branch: Some("main".into()),
        ..MergeConfig::default()
    };
    let p = pipeline(repo, config);
    p.store.insert_task(
        TaskBuilder::new("task-1")
            .title("Ship feature X")
            .status(TaskStatus::Review)
            .assignee("agt-dev")
            .branch("feat/x")
            .build(),
    );

    let result = p
        .steward
        .process_task(&TaskId::from_string("task-1"), &ProcessOptions::default())
        .await;

    assert_eq!(result.status, MergeProcessStatus::Merged, "result: {result:?}");
    assert!(result.merge_commit.is_some());

    let task = p.store.get_task(&TaskId::from_string("task-1")).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Closed);
    assert!(task.closed_at.is_some());
    assert_eq!(task.assignee, None);
    assert_eq!(task.merge_status(), MergeStatus::Merged);
    assert_eq!(task.orchestrator().test_run_count, 1);

    // The branch was squashed into main and deleted.
    assert!(root.join("feature.txt").exists());
    let out = sf_adapters::subprocess::run_git(
        &root,
        &["rev-parse", "--verify", "--quiet", "refs/heads/feat/x"],
        "branch check",
    )
    .await
    .unwrap();
    assert!(!out.success(), "feat/x should be deleted after merge");

    // Re-processing the closed task is a no-op success.
    let again = p
        .steward
        .process_task(&TaskId::from_string("task-1"), &ProcessOptions::default())
        .await;
    assert_eq!(again.status, MergeProcessStatus::Merged);
    assert_eq!(p.store.created_tasks().len(), 0);
}

#[tokio::test]
async fn conflicting_branch_yields_conflict_and_fix_task() {
    let repo = init_repo().await;
    let root = repo.path().to_path_buf();

    git(&root, &["checkout", "-b", "feat/y"]).await;
    commit_file(&root, "README.md", "# branch version\n", "branch edit").await;
    git(&root, &["checkout", "main"]).await;
    commit_file(&root, "README.md", "# main version\n", "main edit").await;

    let config = MergeConfig {
        test_command: "true".into(),
        target_branch: Some("main".into()),
        ..MergeConfig::default()
    };
    let p = pipeline(repo, config);
    p.store.insert_task(
        TaskBuilder::new("task-2")
            .title("Rewrite the readme")
            .status(TaskStatus::Review)
            .branch("feat/y")
            .build(),
    );

    let result = p
        .steward
        .process_task(&TaskId::from_string("task-2"), &ProcessOptions::default())
        .await;

    assert_eq!(result.status, MergeProcessStatus::Conflict, "result: {result:?}");
    let fix_id = result.fix_task_id.clone().unwrap();

    let task = p.store.get_task(&TaskId::from_string("task-2")).await.unwrap().unwrap();
    assert_eq!(task.merge_status(), MergeStatus::Conflict);
    assert!(task
        .orchestrator()
        .merge_failure_reason
        .clone()
        .unwrap()
        .contains("README.md"));

    let fix = p.store.get_task(&fix_id).await.unwrap().unwrap();
    assert_eq!(fix.tags, vec!["fix", "merge_conflict", "auto-created"]);
    assert_eq!(fix.metadata.original_task_id, Some(TaskId::from_string("task-2")));

    // A second attempt with the same state reuses the fix task.
    let again = p
        .steward
        .process_task(&TaskId::from_string("task-2"), &ProcessOptions::default())
        .await;
    assert_eq!(again.status, MergeProcessStatus::Conflict);
    assert_eq!(again.fix_task_id, Some(fix_id));
    assert_eq!(p.store.created_tasks().len(), 1);

    // The conflicted merge never left debris on main.
    let status = sf_adapters::subprocess::run_git(&root, &["status", "--porcelain"], "status")
        .await
        .unwrap();
    assert_eq!(status.stdout.trim(), "");
}

#[tokio::test]
async fn failing_tests_block_the_merge_entirely() {
    let repo = init_repo().await;
    let root = repo.path().to_path_buf();

    git(&root, &["checkout", "-b", "feat/z"]).await;
    commit_file(&root, "z.txt", "z\n", "z").await;
    git(&root, &["checkout", "main"]).await;

    let config = MergeConfig {
        test_command: "cat /nonexistent-spec-file".into(),
        target_branch: Some("main".into()),
        ..MergeConfig::default()
    };
    let p = pipeline(repo, config);
    p.store.insert_task(
        TaskBuilder::new("task-3")
            .status(TaskStatus::Review)
            .branch("feat/z")
            .build(),
    );

    let result = p
        .steward
        .process_task(&TaskId::from_string("task-3"), &ProcessOptions::default())
        .await;

    assert_eq!(result.status, MergeProcessStatus::TestFailed);
    assert!(!root.join("z.txt").exists(), "branch must not be merged");
    let fix = p.store.get_task(&result.fix_task_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(fix.tags[1], "test_failure");
}
