// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler + executor + stewards wired together over fake adapters.

use sf_adapters::{
    FakeDispatch, FakeGit, FakeRegistry, FakeSessionManager, FakeTaskStore, FakeWorktrees,
    SessionManager, TaskStore,
};
use sf_core::test_support::TaskBuilder;
use sf_core::{
    AgentId, FakeClock, MergeConfig, MergeStatus, SessionConfig, SchedulerConfig, Steward,
    StewardEvent, StewardFocus, TaskId, TaskStatus, Trigger, TriggerKind,
};
use sf_engine::{
    HistoryQuery, MergeSteward, SessionMonitor, StewardExecutor, StewardScheduler,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct System {
    scheduler: StewardScheduler<FakeClock>,
    registry: Arc<FakeRegistry>,
    store: Arc<FakeTaskStore>,
    sessions: Arc<FakeSessionManager>,
}

fn system() -> System {
    let clock = FakeClock::new();
    let store = Arc::new(FakeTaskStore::with_clock(clock.clone()));
    let registry = Arc::new(FakeRegistry::new());
    let sessions = Arc::new(FakeSessionManager::new());
    let git = Arc::new(FakeGit::new());

    let merge = Arc::new(MergeSteward::new(
        clock.clone(),
        Arc::clone(&store) as _,
        Arc::clone(&registry) as _,
        Arc::new(FakeDispatch::new()) as _,
        Arc::clone(&git) as _,
        Arc::new(FakeWorktrees::new()) as _,
        MergeConfig { test_command: "true".into(), ..MergeConfig::default() },
        "/workspace",
    ));
    let monitor = SessionMonitor::new(
        Arc::clone(&sessions) as Arc<dyn SessionManager>,
        SessionConfig::default(),
    );
    let executor = Arc::new(StewardExecutor::new(
        clock.clone(),
        Arc::clone(&store) as _,
        Arc::clone(&sessions) as _,
        merge,
        monitor,
        "/workspace",
        CancellationToken::new(),
    ));
    let scheduler = StewardScheduler::new(
        clock,
        SchedulerConfig::default(),
        Arc::clone(&registry) as _,
        executor,
    );
    System { scheduler, registry, store, sessions }
}

async fn wait_for_completion(
    rx: &mut tokio::sync::broadcast::Receiver<StewardEvent>,
) -> StewardEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        if matches!(
            event,
            StewardEvent::ExecutionCompleted { .. } | StewardEvent::ExecutionFailed { .. }
        ) {
            return event;
        }
    }
}

#[tokio::test]
async fn published_event_drives_a_task_to_merged() {
    let s = system();
    s.registry.insert_steward(
        Steward::new("agt-merge", "merge-bot", StewardFocus::Merge).triggers(vec![
            Trigger::event_when("task:review", "task.status === 'review'"),
        ]),
    );
    s.store.insert_task(
        TaskBuilder::new("task-1")
            .title("Land it")
            .status(TaskStatus::Review)
            .branch("feat/x")
            .assignee("agt-dev")
            .build(),
    );

    s.scheduler.start().await.unwrap();
    s.scheduler.register_steward(&AgentId::from_string("agt-merge")).await.unwrap();
    let mut rx = s.scheduler.subscribe();

    let payload = serde_json::json!({ "task": { "status": "review" } });
    assert_eq!(s.scheduler.publish_event("task:review", &payload).await, 1);

    let done = wait_for_completion(&mut rx).await;
    assert!(matches!(done, StewardEvent::ExecutionCompleted { .. }), "event: {done:?}");

    let task = s.store.get_task(&TaskId::from_string("task-1")).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Closed);
    assert_eq!(task.merge_status(), MergeStatus::Merged);
    assert_eq!(task.assignee, None);

    // The run is in history as an event-triggered execution.
    let entries = s.scheduler.history(&HistoryQuery::default().steward("agt-merge"));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].trigger_kind(), TriggerKind::Event);
    assert_eq!(entries[0].event_context, Some(payload));

    // And the registry saw the last-executed write-back.
    assert_eq!(s.registry.recorded_executions().len(), 1);

    s.scheduler.stop();
}

#[tokio::test]
async fn non_matching_condition_filters_the_event_out() {
    let s = system();
    s.registry.insert_steward(
        Steward::new("agt-merge", "merge-bot", StewardFocus::Merge).triggers(vec![
            Trigger::event_when("task:review", "task.status === 'review'"),
        ]),
    );
    s.scheduler.start().await.unwrap();
    s.scheduler.register_steward(&AgentId::from_string("agt-merge")).await.unwrap();

    let payload = serde_json::json!({ "task": { "status": "open" } });
    assert_eq!(s.scheduler.publish_event("task:review", &payload).await, 0);
    s.scheduler.stop();
}

#[tokio::test]
async fn manual_docs_run_spawns_a_monitored_session() {
    let s = system();
    s.registry
        .insert_steward(Steward::new("agt-docs", "docs-bot", StewardFocus::Docs));

    let result = s
        .scheduler
        .execute_steward(&AgentId::from_string("agt-docs"), None)
        .await
        .unwrap();
    assert!(result.success);
    assert!(result.output.clone().unwrap().contains("Spawned docs steward session"));
    assert_eq!(s.sessions.started().len(), 1);

    // A second manual run while the session lives reports the overlap.
    let result = s
        .scheduler
        .execute_steward(&AgentId::from_string("agt-docs"), None)
        .await
        .unwrap();
    assert!(result.success);
    assert!(result.output.unwrap().contains("already has active session"));
    assert_eq!(s.sessions.started().len(), 1);
}

#[tokio::test]
async fn event_fan_out_runs_subscribers_independently() {
    let s = system();
    s.registry.insert_steward(
        Steward::new("agt-merge", "merge-bot", StewardFocus::Merge)
            .triggers(vec![Trigger::event("task:review")]),
    );
    s.registry.insert_steward(
        Steward::new("agt-docs", "docs-bot", StewardFocus::Docs)
            .triggers(vec![Trigger::event("task:review")]),
    );

    s.scheduler.start().await.unwrap();
    s.scheduler.register_steward(&AgentId::from_string("agt-merge")).await.unwrap();
    s.scheduler.register_steward(&AgentId::from_string("agt-docs")).await.unwrap();
    let mut rx = s.scheduler.subscribe();

    let launched = s.scheduler.publish_event("task:review", &serde_json::json!({})).await;
    assert_eq!(launched, 2);

    // Both complete (the docs one spawns a session, the merge one sweeps
    // zero tasks).
    wait_for_completion(&mut rx).await;
    wait_for_completion(&mut rx).await;
    assert_eq!(s.scheduler.stats().total_executions, 2);

    s.scheduler.stop();
}
