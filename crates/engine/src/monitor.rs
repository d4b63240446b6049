// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session monitoring for spawned steward sessions.
//!
//! Watches a session's event stream and force-terminates it when it goes
//! idle or outlives its hard duration bound. The watcher is a detached
//! task tied to a cancellation token, so it dies with the scheduler rather
//! than keeping the process alive.

use sf_adapters::{SessionEvent, SessionManager, SessionStatus, StopOptions};
use sf_core::{SessionConfig, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Watches steward sessions for idleness and overlong runs.
#[derive(Clone)]
pub struct SessionMonitor {
    sessions: Arc<dyn SessionManager>,
    config: SessionConfig,
}

impl SessionMonitor {
    pub fn new(sessions: Arc<dyn SessionManager>, config: SessionConfig) -> Self {
        Self { sessions, config }
    }

    /// Poll cadence: half the idle timeout, capped at 30 seconds.
    fn poll_interval(&self) -> Duration {
        (self.config.idle_timeout() / 2).min(Duration::from_secs(30))
    }

    /// Watch one session until it exits, is terminated, or the token
    /// cancels.
    pub fn watch(
        &self,
        session_id: SessionId,
        mut events: mpsc::Receiver<SessionEvent>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let sessions = Arc::clone(&self.sessions);
        let idle_timeout = self.config.idle_timeout();
        let max_duration = self.config.max_duration();
        let poll = self.poll_interval();

        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let mut last_activity = started;
            let mut ticker = tokio::time::interval(poll);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first interval tick fires immediately; consume it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = events.recv() => match event {
                        Some(SessionEvent::Event) => last_activity = tokio::time::Instant::now(),
                        Some(SessionEvent::Status { status: SessionStatus::Terminated })
                        | Some(SessionEvent::Exit { .. })
                        | None => {
                            tracing::debug!(session = %session_id, "session ended, detaching watcher");
                            break;
                        }
                        Some(SessionEvent::Status { .. }) => {
                            last_activity = tokio::time::Instant::now();
                        }
                    },
                    _ = ticker.tick() => {
                        let now = tokio::time::Instant::now();
                        let idle_for = now - last_activity;
                        if idle_for > idle_timeout {
                            let reason = format!(
                                "Steward session idle for {}s (timeout: {}s)",
                                idle_for.as_secs(),
                                idle_timeout.as_secs()
                            );
                            terminate(&*sessions, &session_id, reason).await;
                            break;
                        }
                        if now - started > max_duration {
                            let reason = format!(
                                "Steward session exceeded max duration ({}s)",
                                max_duration.as_secs()
                            );
                            terminate(&*sessions, &session_id, reason).await;
                            break;
                        }
                    }
                }
            }
        })
    }
}

async fn terminate(sessions: &dyn SessionManager, id: &SessionId, reason: String) {
    tracing::warn!(session = %id, reason = %reason, "force-terminating steward session");
    let opts = StopOptions { graceful: false, reason: Some(reason) };
    match sessions.stop_session(id, opts).await {
        Ok(()) => {}
        // Already gone — nothing to terminate.
        Err(err) if err.is_not_found() => {}
        Err(err) => {
            tracing::warn!(session = %id, error = %err, "failed to stop steward session");
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
