// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations.

use anyhow::Context;
use sf_adapters::{
    CliGit, GitWorktrees, LocalStore, NoopDispatch, NoopSessionManager, SessionManager,
    StewardRegistry, TaskStore,
};
use sf_core::{AgentId, StewardConfig, SystemClock};
use sf_engine::{
    DocsSteward, MergeSteward, SessionMonitor, StewardExecutor, StewardScheduler,
};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct Wiring {
    store: Arc<LocalStore>,
    scheduler: StewardScheduler,
    shutdown: CancellationToken,
}

/// Wire the engine to the local state file, the git CLI, and no-op
/// dispatch/session backends.
fn wire(workspace: &Path, config: StewardConfig) -> anyhow::Result<Wiring> {
    let store = Arc::new(
        LocalStore::open(workspace.join(".stoneforge").join("state.json"))
            .context("opening local state")?,
    );
    let git = Arc::new(CliGit::new());
    let worktrees = Arc::new(GitWorktrees::new(workspace));
    let sessions: Arc<dyn SessionManager> = Arc::new(NoopSessionManager::new());
    let shutdown = CancellationToken::new();

    let merge = Arc::new(MergeSteward::new(
        SystemClock,
        Arc::clone(&store) as Arc<dyn TaskStore>,
        Arc::clone(&store) as Arc<dyn StewardRegistry>,
        Arc::new(NoopDispatch::new()),
        git,
        worktrees,
        config.merge.clone(),
        workspace,
    ));
    let monitor = SessionMonitor::new(Arc::clone(&sessions), config.session.clone());
    let executor = Arc::new(StewardExecutor::new(
        SystemClock,
        Arc::clone(&store) as Arc<dyn TaskStore>,
        sessions,
        merge,
        monitor,
        workspace,
        shutdown.clone(),
    ));
    let scheduler = StewardScheduler::new(
        SystemClock,
        config.scheduler.clone(),
        Arc::clone(&store) as Arc<dyn StewardRegistry>,
        executor,
    );

    Ok(Wiring { store, scheduler, shutdown })
}

/// Run the scheduler until ctrl-c.
pub async fn daemon(workspace: &Path, config: StewardConfig) -> anyhow::Result<()> {
    let wiring = wire(workspace, config)?;
    let scheduler = wiring.scheduler;

    let mut events = scheduler.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!("{}", event.log_summary());
        }
    });

    scheduler.start().await?;
    for steward in wiring.store.stewards().await? {
        if let Err(err) = scheduler.register_steward(&steward.id).await {
            tracing::warn!(steward = %steward.id, error = %err, "registration failed");
        }
    }

    let stats = scheduler.stats();
    tracing::info!(
        stewards = stats.registered_stewards,
        cron_jobs = stats.active_cron_jobs,
        subscriptions = stats.active_subscriptions,
        "daemon ready"
    );

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("shutting down");
    scheduler.stop();
    wiring.shutdown.cancel();
    Ok(())
}

/// Execute one steward and print its result.
pub async fn run_steward(
    workspace: &Path,
    config: StewardConfig,
    steward_id: &str,
) -> anyhow::Result<()> {
    let wiring = wire(workspace, config)?;
    wiring.scheduler.start().await?;

    let result = wiring
        .scheduler
        .execute_steward(&AgentId::from_string(steward_id), None)
        .await?;

    wiring.scheduler.stop();
    wiring.shutdown.cancel();

    if result.success {
        println!("ok: {}", result.output.unwrap_or_default());
    } else {
        println!("failed: {}", result.error.unwrap_or_default());
        std::process::exit(1);
    }
    Ok(())
}

/// One-shot docs verification scan.
pub async fn docs_scan(workspace: &Path, config: StewardConfig) -> anyhow::Result<()> {
    let steward = DocsSteward::new(
        SystemClock,
        Arc::new(CliGit::new()),
        config.docs.clone(),
        workspace,
    );
    let report = steward.scan_all().await;

    println!(
        "scanned {} files in {}ms, {} issue(s)",
        report.files_scanned,
        report.duration_ms,
        report.issues.len()
    );
    for issue in &report.issues {
        println!(
            "{}:{} [{}] {} ({:?}/{:?})",
            issue.file,
            issue.line,
            serde_json::to_string(&issue.issue_type)
                .unwrap_or_default()
                .trim_matches('"'),
            issue.description,
            issue.confidence,
            issue.complexity,
        );
        if let Some(fix) = &issue.suggested_fix {
            println!("    suggested: {fix}");
        }
    }
    if !report.issues.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

/// Print the stewards known to the local registry.
pub async fn list_stewards(workspace: &Path) -> anyhow::Result<()> {
    let store = LocalStore::open(workspace.join(".stoneforge").join("state.json"))
        .context("opening local state")?;
    let stewards = store.stewards().await?;
    if stewards.is_empty() {
        println!("no stewards registered");
        return Ok(());
    }
    for steward in stewards {
        let last = steward
            .last_executed_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{}  {}  focus={}  triggers={}  last={}",
            steward.id,
            steward.name,
            steward.focus,
            steward.triggers.len(),
            last
        );
    }
    Ok(())
}
