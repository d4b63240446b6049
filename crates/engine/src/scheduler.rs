// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Steward scheduler: cron timers, event subscriptions, and the shared
//! execution wrapper.
//!
//! All mutable state lives in one table behind a mutex; the lock is never
//! held across an await. Each cron job owns one detached timer task tied
//! to a child cancellation token, so `stop()` cancels pending timers
//! without touching in-flight executions — those finish, observe
//! `running == false`, and do not reschedule.

use crate::error::EngineError;
use crate::executor::{ExecuteSteward, ExecutionContext};
use crate::history::{ExecutionHistory, HistoryQuery};
use chrono::{DateTime, TimeZone, Utc};
use sf_adapters::StewardRegistry;
use sf_core::{
    AgentId, Clock, ExecutionEntry, ExecutionId, ExecutionResult, SchedulerConfig, Steward,
    StewardEvent, SystemClock, Trigger,
};
use sf_trigger::CronSchedule;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Snapshot of scheduler state for observers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SchedulerStats {
    pub registered_stewards: usize,
    pub active_cron_jobs: usize,
    pub active_subscriptions: usize,
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub running_executions: usize,
}

struct CronJob {
    steward_id: AgentId,
    steward_name: String,
    trigger: Trigger,
    schedule: CronSchedule,
    last_run_at: Option<DateTime<Utc>>,
    next_run_at: Option<DateTime<Utc>>,
    is_running: bool,
    timer: Option<CancellationToken>,
}

struct Subscription {
    steward_id: AgentId,
    condition: Option<String>,
    active: bool,
}

#[derive(Default)]
struct Totals {
    total: u64,
    succeeded: u64,
    failed: u64,
}

struct SchedState {
    running: bool,
    shutdown: CancellationToken,
    cron_jobs: HashMap<String, CronJob>,
    subscriptions: HashMap<String, Vec<Subscription>>,
    execution_seq: u64,
    running_executions: HashSet<ExecutionId>,
    totals: Totals,
}

struct Inner<C: Clock> {
    clock: C,
    config: SchedulerConfig,
    registry: Arc<dyn StewardRegistry>,
    executor: Arc<dyn ExecuteSteward>,
    history: parking_lot::Mutex<ExecutionHistory>,
    state: parking_lot::Mutex<SchedState>,
    events: broadcast::Sender<StewardEvent>,
}

/// The steward scheduler.
pub struct StewardScheduler<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for StewardScheduler<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

fn job_key(steward_id: &AgentId, trigger_index: usize) -> String {
    format!("{steward_id}-{trigger_index}")
}

impl<C: Clock> StewardScheduler<C> {
    pub fn new(
        clock: C,
        config: SchedulerConfig,
        registry: Arc<dyn StewardRegistry>,
        executor: Arc<dyn ExecuteSteward>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        let history = ExecutionHistory::new(config.max_history_per_steward);
        Self {
            inner: Arc::new(Inner {
                clock,
                config,
                registry,
                executor,
                history: parking_lot::Mutex::new(history),
                state: parking_lot::Mutex::new(SchedState {
                    running: false,
                    shutdown: CancellationToken::new(),
                    cron_jobs: HashMap::new(),
                    subscriptions: HashMap::new(),
                    execution_seq: 0,
                    running_executions: HashSet::new(),
                    totals: Totals::default(),
                }),
                events,
            }),
        }
    }

    /// Subscribe to scheduler lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<StewardEvent> {
        self.inner.events.subscribe()
    }

    /// Start timers and activate subscriptions. Optionally registers every
    /// steward in the registry first.
    pub async fn start(&self) -> Result<(), EngineError> {
        let keys = {
            let mut state = self.inner.state.lock();
            if state.running {
                return Ok(());
            }
            state.running = true;
            state.shutdown = CancellationToken::new();
            for subs in state.subscriptions.values_mut() {
                for sub in subs.iter_mut() {
                    sub.active = true;
                }
            }
            state.cron_jobs.keys().cloned().collect::<Vec<_>>()
        };

        for key in keys {
            Inner::spawn_timer(&self.inner, key);
        }

        if self.inner.config.start_immediately {
            let stewards = self.inner.registry.stewards().await?;
            for steward in stewards {
                if let Err(err) = self.register_steward(&steward.id).await {
                    tracing::warn!(steward = %steward.id, error = %err, "auto-registration failed");
                }
            }
        }

        tracing::info!("steward scheduler started");
        Ok(())
    }

    /// Cancel timers and deactivate subscriptions. In-flight executions
    /// finish on their own and do not reschedule.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        if !state.running {
            return;
        }
        state.running = false;
        state.shutdown.cancel();
        for job in state.cron_jobs.values_mut() {
            if let Some(timer) = job.timer.take() {
                timer.cancel();
            }
            job.next_run_at = None;
        }
        for subs in state.subscriptions.values_mut() {
            for sub in subs.iter_mut() {
                sub.active = false;
            }
        }
        tracing::info!("steward scheduler stopped");
    }

    /// Install the steward's triggers, replacing any prior registration.
    pub async fn register_steward(&self, id: &AgentId) -> Result<(), EngineError> {
        let steward = self
            .inner
            .registry
            .get_steward(id)
            .await?
            .ok_or_else(|| EngineError::StewardNotFound(id.clone()))?;

        self.unregister_internal(id);

        let mut new_keys = Vec::new();
        let mut cron_count = 0usize;
        let mut event_count = 0usize;
        {
            let mut state = self.inner.state.lock();
            let running = state.running;
            for (index, trigger) in steward.triggers.iter().enumerate() {
                match trigger {
                    Trigger::Cron { schedule } => {
                        let parsed = match CronSchedule::from_str(schedule) {
                            Ok(parsed) => parsed,
                            Err(err) => {
                                tracing::warn!(
                                    steward = %steward.id,
                                    schedule,
                                    error = %err,
                                    "skipping invalid cron trigger"
                                );
                                continue;
                            }
                        };
                        let key = job_key(&steward.id, index);
                        state.cron_jobs.insert(
                            key.clone(),
                            CronJob {
                                steward_id: steward.id.clone(),
                                steward_name: steward.name.clone(),
                                trigger: trigger.clone(),
                                schedule: parsed,
                                last_run_at: None,
                                next_run_at: None,
                                is_running: false,
                                timer: None,
                            },
                        );
                        cron_count += 1;
                        if running {
                            new_keys.push(key);
                        }
                    }
                    Trigger::Event { event, condition } => {
                        state.subscriptions.entry(event.clone()).or_default().push(
                            Subscription {
                                steward_id: steward.id.clone(),
                                condition: condition.clone(),
                                active: running,
                            },
                        );
                        event_count += 1;
                    }
                }
            }
        }

        for key in new_keys {
            Inner::spawn_timer(&self.inner, key);
        }

        self.inner.emit(StewardEvent::StewardRegistered {
            steward_id: steward.id.clone(),
            steward_name: steward.name.clone(),
            cron_jobs: cron_count,
            event_subscriptions: event_count,
        });
        tracing::info!(
            steward = %steward.id,
            cron = cron_count,
            events = event_count,
            "steward registered"
        );
        Ok(())
    }

    /// Remove the steward's jobs and subscriptions.
    pub fn unregister_steward(&self, id: &AgentId) {
        self.unregister_internal(id);
        self.inner.emit(StewardEvent::StewardUnregistered { steward_id: id.clone() });
    }

    fn unregister_internal(&self, id: &AgentId) {
        let mut state = self.inner.state.lock();
        state.cron_jobs.retain(|_, job| {
            if &job.steward_id == id {
                if let Some(timer) = job.timer.take() {
                    timer.cancel();
                }
                false
            } else {
                true
            }
        });
        for subs in state.subscriptions.values_mut() {
            subs.retain(|sub| &sub.steward_id != id);
        }
        state.subscriptions.retain(|_, subs| !subs.is_empty());
    }

    /// Unregister + register, picking up a changed definition.
    pub async fn refresh_steward(&self, id: &AgentId) -> Result<(), EngineError> {
        self.unregister_steward(id);
        self.register_steward(id).await
    }

    /// Dispatch an event to every matching active subscription. Returns
    /// how many executions were launched.
    pub async fn publish_event(&self, event: &str, payload: &serde_json::Value) -> usize {
        let matches: Vec<AgentId> = {
            let state = self.inner.state.lock();
            if !state.running {
                return 0;
            }
            let Some(subs) = state.subscriptions.get(event) else { return 0 };
            subs.iter()
                .filter(|sub| sub.active)
                .filter(|sub| match sub.condition.as_deref() {
                    Some(condition) if !condition.trim().is_empty() => {
                        sf_trigger::evaluate(condition, payload)
                    }
                    _ => true,
                })
                .map(|sub| sub.steward_id.clone())
                .collect()
        };

        let trigger_payload = payload.clone();
        for steward_id in &matches {
            let inner = Arc::clone(&self.inner);
            let steward_id = steward_id.clone();
            let event = event.to_string();
            let payload = trigger_payload.clone();
            tokio::spawn(async move {
                let steward = match inner.registry.get_steward(&steward_id).await {
                    Ok(Some(steward)) => steward,
                    Ok(None) => {
                        tracing::warn!(steward = %steward_id, "event subscriber vanished");
                        return;
                    }
                    Err(err) => {
                        tracing::warn!(steward = %steward_id, error = %err, "registry lookup failed");
                        return;
                    }
                };
                let trigger = Trigger::event(event);
                inner.run_execution(steward, trigger, false, Some(payload), None).await;
            });
        }
        matches.len()
    }

    /// Run a steward now, with a synthetic manual trigger.
    pub async fn execute_steward(
        &self,
        id: &AgentId,
        context: Option<serde_json::Value>,
    ) -> Result<ExecutionResult, EngineError> {
        let steward = self
            .inner
            .registry
            .get_steward(id)
            .await?
            .ok_or_else(|| EngineError::StewardNotFound(id.clone()))?;
        Ok(self
            .inner
            .run_execution(steward, Trigger::manual(), true, context, None)
            .await)
    }

    /// Query the execution history (consistent snapshot).
    pub fn history(&self, query: &HistoryQuery) -> Vec<ExecutionEntry> {
        self.inner.history.lock().query(query)
    }

    pub fn stats(&self) -> SchedulerStats {
        let state = self.inner.state.lock();
        let mut stewards: HashSet<&AgentId> = HashSet::new();
        for job in state.cron_jobs.values() {
            stewards.insert(&job.steward_id);
        }
        for subs in state.subscriptions.values() {
            for sub in subs {
                stewards.insert(&sub.steward_id);
            }
        }
        SchedulerStats {
            registered_stewards: stewards.len(),
            active_cron_jobs: state.cron_jobs.len(),
            active_subscriptions: state
                .subscriptions
                .values()
                .flat_map(|subs| subs.iter())
                .filter(|sub| sub.active)
                .count(),
            total_executions: state.totals.total,
            successful_executions: state.totals.succeeded,
            failed_executions: state.totals.failed,
            running_executions: state.running_executions.len(),
        }
    }

    /// Next scheduled run for a cron job, for observers.
    pub fn next_run_at(&self, steward_id: &AgentId, trigger_index: usize) -> Option<DateTime<Utc>> {
        let state = self.inner.state.lock();
        state.cron_jobs.get(&job_key(steward_id, trigger_index))?.next_run_at
    }

    /// When a cron job last completed a run.
    pub fn last_run_at(&self, steward_id: &AgentId, trigger_index: usize) -> Option<DateTime<Utc>> {
        let state = self.inner.state.lock();
        state.cron_jobs.get(&job_key(steward_id, trigger_index))?.last_run_at
    }
}

impl<C: Clock> Inner<C> {
    fn emit(&self, event: StewardEvent) {
        tracing::debug!("{}", event.log_summary());
        let _ = self.events.send(event);
    }

    fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Compute and record the job's next fire time; `None` ends the timer
    /// task.
    fn next_wait(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now_utc();
        let mut state = self.state.lock();
        if !state.running {
            return None;
        }
        let job = state.cron_jobs.get_mut(key)?;
        let next = job.schedule.next_after(now.naive_utc())?;
        let next_utc = Utc.from_utc_datetime(&next);
        job.next_run_at = Some(next_utc);
        Some((next_utc - now).to_std().unwrap_or(Duration::ZERO))
    }

    fn spawn_timer(inner: &Arc<Self>, key: String) {
        let token = {
            let mut state = inner.state.lock();
            if !state.running {
                return;
            }
            let token = state.shutdown.child_token();
            let Some(job) = state.cron_jobs.get_mut(&key) else { return };
            if let Some(previous) = job.timer.take() {
                previous.cancel();
            }
            job.timer = Some(token.clone());
            token
        };

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            loop {
                let Some(wait) = inner.next_wait(&key) else { break };
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
                inner.cron_tick(&key).await;
                if token.is_cancelled() {
                    break;
                }
            }
            tracing::debug!(job = %key, "cron timer task ended");
        });
    }

    /// One cron fire: gate on overlap, re-fetch the steward, execute.
    async fn cron_tick(&self, key: &str) {
        let (steward_id, trigger) = {
            let mut state = self.state.lock();
            if !state.running {
                return;
            }
            let Some(job) = state.cron_jobs.get_mut(key) else { return };
            if job.is_running {
                tracing::info!(
                    job = %key,
                    steward = %job.steward_name,
                    "previous run still active, skipping tick"
                );
                return;
            }
            job.is_running = true;
            (job.steward_id.clone(), job.trigger.clone())
        };

        // Definitions can change between registration and fire; always
        // re-fetch.
        let steward = match self.registry.get_steward(&steward_id).await {
            Ok(Some(steward)) => steward,
            Ok(None) => {
                tracing::warn!(steward = %steward_id, "cron steward vanished from registry");
                self.clear_gate(key);
                return;
            }
            Err(err) => {
                tracing::warn!(steward = %steward_id, error = %err, "registry lookup failed");
                self.clear_gate(key);
                return;
            }
        };

        self.run_execution(steward, trigger, false, None, Some(key)).await;
    }

    fn clear_gate(&self, key: &str) {
        let mut state = self.state.lock();
        if let Some(job) = state.cron_jobs.get_mut(key) {
            job.is_running = false;
        }
    }

    /// The shared execution wrapper: history entry, events, gate upkeep,
    /// metadata write-back.
    async fn run_execution(
        &self,
        steward: Steward,
        trigger: Trigger,
        manual: bool,
        event_context: Option<serde_json::Value>,
        gated_job: Option<&str>,
    ) -> ExecutionResult {
        let started_at = self.clock.now_utc();
        let start = self.clock.now();

        let execution_id = {
            let mut state = self.state.lock();
            state.execution_seq += 1;
            let id = ExecutionId::sequenced(state.execution_seq, self.clock.epoch_ms());
            state.running_executions.insert(id.clone());
            state.totals.total += 1;
            id
        };

        self.history.lock().begin(ExecutionEntry {
            execution_id: execution_id.clone(),
            steward_id: steward.id.clone(),
            steward_name: steward.name.clone(),
            trigger: trigger.clone(),
            manual,
            started_at,
            completed_at: None,
            result: None,
            event_context: event_context.clone(),
        });

        self.emit(StewardEvent::ExecutionStarted {
            execution_id: execution_id.clone(),
            steward_id: steward.id.clone(),
            steward_name: steward.name.clone(),
            trigger: trigger.clone(),
        });

        let context = ExecutionContext { trigger, manual, event_context };
        let result = match self.executor.execute(&steward, &context).await {
            Ok(result) => result,
            Err(err) => {
                let duration_ms =
                    self.clock.now().saturating_duration_since(start).as_millis() as u64;
                ExecutionResult::failure(err.to_string(), duration_ms)
            }
        };

        let completed_at = self.clock.now_utc();
        self.history.lock().finalize(&execution_id, completed_at, result.clone());

        if result.success {
            self.emit(StewardEvent::ExecutionCompleted {
                execution_id: execution_id.clone(),
                steward_id: steward.id.clone(),
                result: result.clone(),
            });
        } else {
            self.emit(StewardEvent::ExecutionFailed {
                execution_id: execution_id.clone(),
                steward_id: steward.id.clone(),
                error: result.error.clone().unwrap_or_else(|| "unknown failure".to_string()),
            });
        }

        {
            let mut state = self.state.lock();
            state.running_executions.remove(&execution_id);
            if result.success {
                state.totals.succeeded += 1;
            } else {
                state.totals.failed += 1;
            }
            if let Some(key) = gated_job {
                if let Some(job) = state.cron_jobs.get_mut(key) {
                    job.is_running = false;
                    job.last_run_at = Some(completed_at);
                }
            }
        }

        if let Err(err) = self.registry.record_execution(&steward.id, completed_at).await {
            tracing::debug!(steward = %steward.id, error = %err, "last-executed write-back failed");
        }

        result
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
