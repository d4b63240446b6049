// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sf_adapters::FakeRegistry;
use sf_core::{FakeClock, StewardFocus, TriggerKind};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// Scriptable executor: records calls, optionally blocks until released,
/// and replays queued results.
struct TestExecutor {
    calls: parking_lot::Mutex<Vec<AgentId>>,
    results: parking_lot::Mutex<VecDeque<Result<ExecutionResult, EngineError>>>,
    blocking: AtomicBool,
    release: tokio::sync::Semaphore,
}

impl TestExecutor {
    fn new() -> Self {
        Self {
            calls: parking_lot::Mutex::new(Vec::new()),
            results: parking_lot::Mutex::new(VecDeque::new()),
            blocking: AtomicBool::new(false),
            release: tokio::sync::Semaphore::new(0),
        }
    }

    fn calls(&self) -> Vec<AgentId> {
        self.calls.lock().clone()
    }

    fn queue(&self, result: Result<ExecutionResult, EngineError>) {
        self.results.lock().push_back(result);
    }

    fn set_blocking(&self) {
        self.blocking.store(true, Ordering::SeqCst);
    }

    fn release_one(&self) {
        self.release.add_permits(1);
    }
}

#[async_trait::async_trait]
impl ExecuteSteward for TestExecutor {
    async fn execute(
        &self,
        steward: &Steward,
        _context: &ExecutionContext,
    ) -> Result<ExecutionResult, EngineError> {
        self.calls.lock().push(steward.id.clone());
        if self.blocking.load(Ordering::SeqCst) {
            if let Ok(permit) = self.release.acquire().await {
                permit.forget();
            }
        }
        self.results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ExecutionResult::success("done", 1)))
    }
}

struct Harness {
    scheduler: StewardScheduler<FakeClock>,
    registry: Arc<FakeRegistry>,
    executor: Arc<TestExecutor>,
}

fn harness(config: SchedulerConfig) -> Harness {
    let registry = Arc::new(FakeRegistry::new());
    let executor = Arc::new(TestExecutor::new());
    let scheduler = StewardScheduler::new(
        FakeClock::new(),
        config,
        Arc::clone(&registry) as _,
        Arc::clone(&executor) as _,
    );
    Harness { scheduler, registry, executor }
}

fn merge_steward(id: &str, triggers: Vec<Trigger>) -> Steward {
    Steward::new(id, format!("{id}-bot"), StewardFocus::Merge).triggers(triggers)
}

async fn next_event(
    rx: &mut broadcast::Receiver<StewardEvent>,
) -> StewardEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for scheduler event")
        .expect("event channel closed")
}

#[tokio::test]
async fn registration_installs_jobs_and_subscriptions() {
    let h = harness(SchedulerConfig::default());
    h.registry.insert_steward(merge_steward(
        "agt-m",
        vec![Trigger::cron("0 * * * *"), Trigger::event("task:updated")],
    ));

    h.scheduler.register_steward(&AgentId::from_string("agt-m")).await.unwrap();

    let stats = h.scheduler.stats();
    assert_eq!(stats.registered_stewards, 1);
    assert_eq!(stats.active_cron_jobs, 1);
    // Not started yet, so the subscription is inactive.
    assert_eq!(stats.active_subscriptions, 0);
}

#[tokio::test]
async fn double_registration_does_not_duplicate() {
    let h = harness(SchedulerConfig::default());
    h.registry.insert_steward(merge_steward(
        "agt-m",
        vec![Trigger::cron("0 * * * *"), Trigger::event("task:updated")],
    ));

    let id = AgentId::from_string("agt-m");
    h.scheduler.register_steward(&id).await.unwrap();
    h.scheduler.register_steward(&id).await.unwrap();

    let stats = h.scheduler.stats();
    assert_eq!(stats.active_cron_jobs, 1);
    assert_eq!(stats.registered_stewards, 1);
    let state = h.scheduler.inner.state.lock();
    assert_eq!(state.subscriptions.get("task:updated").map(Vec::len), Some(1));
}

#[tokio::test]
async fn refresh_equals_unregister_plus_register() {
    let h = harness(SchedulerConfig::default());
    h.registry.insert_steward(merge_steward("agt-m", vec![Trigger::cron("0 * * * *")]));
    let id = AgentId::from_string("agt-m");
    h.scheduler.register_steward(&id).await.unwrap();

    // The definition changes: cron goes away, an event arrives.
    h.registry.insert_steward(merge_steward("agt-m", vec![Trigger::event("task:closed")]));
    h.scheduler.refresh_steward(&id).await.unwrap();

    let stats = h.scheduler.stats();
    assert_eq!(stats.active_cron_jobs, 0);
    let state = h.scheduler.inner.state.lock();
    assert_eq!(state.subscriptions.get("task:closed").map(Vec::len), Some(1));
}

#[tokio::test]
async fn unknown_steward_is_an_error() {
    let h = harness(SchedulerConfig::default());
    let err = h
        .scheduler
        .register_steward(&AgentId::from_string("agt-ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StewardNotFound(_)));
}

#[tokio::test]
async fn invalid_cron_triggers_are_skipped_not_fatal() {
    let h = harness(SchedulerConfig::default());
    h.registry.insert_steward(merge_steward(
        "agt-m",
        vec![Trigger::cron("*/0 * * * *"), Trigger::event("task:updated")],
    ));

    h.scheduler.register_steward(&AgentId::from_string("agt-m")).await.unwrap();
    let stats = h.scheduler.stats();
    assert_eq!(stats.active_cron_jobs, 0);
    assert_eq!(stats.registered_stewards, 1);
}

#[tokio::test]
async fn registration_events_are_emitted() {
    let h = harness(SchedulerConfig::default());
    let mut rx = h.scheduler.subscribe();
    h.registry.insert_steward(merge_steward("agt-m", vec![Trigger::cron("0 * * * *")]));
    let id = AgentId::from_string("agt-m");

    h.scheduler.register_steward(&id).await.unwrap();
    let event = next_event(&mut rx).await;
    assert!(matches!(
        event,
        StewardEvent::StewardRegistered { cron_jobs: 1, event_subscriptions: 0, .. }
    ));

    h.scheduler.unregister_steward(&id);
    let event = next_event(&mut rx).await;
    assert!(matches!(event, StewardEvent::StewardUnregistered { .. }));
}

#[tokio::test]
async fn manual_execution_runs_and_records_history() {
    let h = harness(SchedulerConfig::default());
    h.registry.insert_steward(merge_steward("agt-m", vec![]));
    let id = AgentId::from_string("agt-m");
    let mut rx = h.scheduler.subscribe();

    let result = h.scheduler.execute_steward(&id, None).await.unwrap();
    assert!(result.success);

    assert!(matches!(next_event(&mut rx).await, StewardEvent::ExecutionStarted { .. }));
    assert!(matches!(next_event(&mut rx).await, StewardEvent::ExecutionCompleted { .. }));

    let entries = h.scheduler.history(&HistoryQuery::default().steward("agt-m"));
    assert_eq!(entries.len(), 1);
    assert!(entries[0].manual);
    assert_eq!(entries[0].trigger_kind(), TriggerKind::Manual);
    assert_eq!(entries[0].succeeded(), Some(true));

    // Best-effort metadata write-back happened.
    assert_eq!(h.registry.recorded_executions().len(), 1);

    let stats = h.scheduler.stats();
    assert_eq!(stats.total_executions, 1);
    assert_eq!(stats.successful_executions, 1);
    assert_eq!(stats.failed_executions, 0);
    assert_eq!(stats.running_executions, 0);
}

#[tokio::test]
async fn executor_errors_become_failed_results() {
    let h = harness(SchedulerConfig::default());
    h.registry.insert_steward(merge_steward("agt-m", vec![]));
    h.executor.queue(Err(EngineError::NoActiveDocsSession));
    let mut rx = h.scheduler.subscribe();

    let result = h
        .scheduler
        .execute_steward(&AgentId::from_string("agt-m"), None)
        .await
        .unwrap();
    assert!(!result.success);

    assert!(matches!(next_event(&mut rx).await, StewardEvent::ExecutionStarted { .. }));
    assert!(matches!(next_event(&mut rx).await, StewardEvent::ExecutionFailed { .. }));

    let stats = h.scheduler.stats();
    assert_eq!(stats.failed_executions, 1);
}

#[tokio::test]
async fn every_started_execution_gets_exactly_one_completion() {
    let h = harness(SchedulerConfig::default());
    h.registry.insert_steward(merge_steward("agt-m", vec![]));
    h.executor.queue(Ok(ExecutionResult::success("one", 1)));
    h.executor.queue(Ok(ExecutionResult::failure("two", 1)));
    let mut rx = h.scheduler.subscribe();
    let id = AgentId::from_string("agt-m");

    h.scheduler.execute_steward(&id, None).await.unwrap();
    h.scheduler.execute_steward(&id, None).await.unwrap();

    let mut started = Vec::new();
    let mut finished = Vec::new();
    for _ in 0..4 {
        match next_event(&mut rx).await {
            StewardEvent::ExecutionStarted { execution_id, .. } => started.push(execution_id),
            StewardEvent::ExecutionCompleted { execution_id, .. }
            | StewardEvent::ExecutionFailed { execution_id, .. } => {
                finished.push(execution_id)
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    started.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    finished.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(started, finished);
    assert_eq!(started.len(), 2);
}

#[tokio::test]
async fn publish_event_requires_running_scheduler() {
    let h = harness(SchedulerConfig::default());
    h.registry
        .insert_steward(merge_steward("agt-m", vec![Trigger::event("task:updated")]));
    h.scheduler
        .register_steward(&AgentId::from_string("agt-m"))
        .await
        .unwrap();

    let launched = h.scheduler.publish_event("task:updated", &serde_json::json!({})).await;
    assert_eq!(launched, 0);
}

#[tokio::test]
async fn publish_event_filters_by_condition() {
    let h = harness(SchedulerConfig::default());
    h.registry.insert_steward(
        merge_steward("agt-yes", vec![Trigger::event_when(
            "task:updated",
            "task.status === 'review'",
        )]),
    );
    h.registry.insert_steward(
        merge_steward("agt-no", vec![Trigger::event_when(
            "task:updated",
            "task.status === 'open'",
        )]),
    );
    h.registry.insert_steward(merge_steward(
        "agt-always",
        vec![Trigger::event("task:updated")],
    ));

    h.scheduler.start().await.unwrap();
    for id in ["agt-yes", "agt-no", "agt-always"] {
        h.scheduler.register_steward(&AgentId::from_string(id)).await.unwrap();
    }

    let mut rx = h.scheduler.subscribe();
    let payload = serde_json::json!({ "task": { "status": "review" } });
    let launched = h.scheduler.publish_event("task:updated", &payload).await;
    assert_eq!(launched, 2);

    // Both launched executions complete; the filtered one never starts.
    let mut seen = std::collections::HashSet::new();
    for _ in 0..4 {
        match next_event(&mut rx).await {
            StewardEvent::ExecutionStarted { steward_id, .. } => {
                seen.insert(steward_id.as_str().to_string());
            }
            _ => {}
        }
    }
    assert_eq!(h.executor.calls().len(), 2);
    assert!(seen.contains("agt-yes"));
    assert!(seen.contains("agt-always"));
    assert!(!seen.contains("agt-no"));

    h.scheduler.stop();
}

#[tokio::test]
async fn publish_event_unsafe_condition_is_skipped() {
    let h = harness(SchedulerConfig::default());
    h.registry.insert_steward(merge_steward(
        "agt-m",
        vec![Trigger::event_when("task:updated", "process.exit(1)")],
    ));
    h.scheduler.start().await.unwrap();
    h.scheduler.register_steward(&AgentId::from_string("agt-m")).await.unwrap();

    let launched = h.scheduler.publish_event("task:updated", &serde_json::json!({})).await;
    assert_eq!(launched, 0);
    h.scheduler.stop();
}

#[tokio::test]
async fn stop_deactivates_subscriptions_and_cancels_timers() {
    let h = harness(SchedulerConfig::default());
    h.registry.insert_steward(merge_steward(
        "agt-m",
        vec![Trigger::cron("* * * * *"), Trigger::event("task:updated")],
    ));
    h.scheduler.start().await.unwrap();
    h.scheduler.register_steward(&AgentId::from_string("agt-m")).await.unwrap();

    // Timer task records the next fire time shortly after spawn.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.scheduler.next_run_at(&AgentId::from_string("agt-m"), 0).is_some());
    assert_eq!(h.scheduler.stats().active_subscriptions, 1);

    h.scheduler.stop();
    assert_eq!(h.scheduler.stats().active_subscriptions, 0);
    assert_eq!(
        h.scheduler.publish_event("task:updated", &serde_json::json!({})).await,
        0
    );
}

#[tokio::test]
async fn overlapping_cron_ticks_are_skipped_not_queued() {
    let h = harness(SchedulerConfig::default());
    h.registry.insert_steward(merge_steward("agt-m", vec![Trigger::cron("0 * * * *")]));
    h.scheduler.start().await.unwrap();
    h.scheduler.register_steward(&AgentId::from_string("agt-m")).await.unwrap();
    h.executor.set_blocking();

    let key = "agt-m-0".to_string();
    let inner = Arc::clone(&h.scheduler.inner);
    let first = {
        let inner = Arc::clone(&inner);
        let key = key.clone();
        tokio::spawn(async move { inner.cron_tick(&key).await })
    };
    // Give the first tick time to claim the gate and block in the executor.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.executor.calls().len(), 1);

    // A second tick while the first is in flight is dropped.
    inner.cron_tick(&key).await;
    assert_eq!(h.executor.calls().len(), 1);

    // After the first completes the gate reopens.
    h.executor.release_one();
    first.await.unwrap();
    h.executor.release_one(); // pre-arm the next run
    inner.cron_tick(&key).await;
    assert_eq!(h.executor.calls().len(), 2);

    let last = h.scheduler.last_run_at(&AgentId::from_string("agt-m"), 0);
    assert!(last.is_some());
    h.scheduler.stop();
}

#[tokio::test]
async fn history_is_bounded_per_steward() {
    let config = SchedulerConfig { max_history_per_steward: 3, ..Default::default() };
    let h = harness(config);
    h.registry.insert_steward(merge_steward("agt-m", vec![]));
    let id = AgentId::from_string("agt-m");

    for _ in 0..6 {
        h.scheduler.execute_steward(&id, None).await.unwrap();
    }

    let entries = h.scheduler.history(&HistoryQuery::default().steward("agt-m"));
    assert_eq!(entries.len(), 3);
    // The survivors are the newest three.
    assert!(entries.iter().all(|e| e.is_finalized()));
}

#[tokio::test]
async fn event_context_lands_in_history() {
    let h = harness(SchedulerConfig::default());
    h.registry.insert_steward(merge_steward("agt-m", vec![]));
    let payload = serde_json::json!({ "reason": "user request" });

    h.scheduler
        .execute_steward(&AgentId::from_string("agt-m"), Some(payload.clone()))
        .await
        .unwrap();

    let entries = h.scheduler.history(&HistoryQuery::default());
    assert_eq!(entries[0].event_context, Some(payload));
}

#[tokio::test]
async fn start_immediately_registers_all_stewards() {
    let config = SchedulerConfig { start_immediately: true, ..Default::default() };
    let h = harness(config);
    h.registry.insert_steward(merge_steward("agt-a", vec![Trigger::cron("0 * * * *")]));
    h.registry.insert_steward(merge_steward("agt-b", vec![Trigger::event("task:updated")]));

    h.scheduler.start().await.unwrap();
    let stats = h.scheduler.stats();
    assert_eq!(stats.registered_stewards, 2);
    assert_eq!(stats.active_cron_jobs, 1);
    assert_eq!(stats.active_subscriptions, 1);
    h.scheduler.stop();
}
