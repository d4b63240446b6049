// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `sf`: run the Stoneforge steward subsystem against a local checkout.
//!
//! The production deployment embeds the engine next to the platform's
//! entity store and session runtime; this binary wires it to a local JSON
//! state file and the git CLI so stewards can be exercised standalone.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sf", about = "Stoneforge steward subsystem", version)]
struct Cli {
    /// Path to a stoneforge.toml config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root (a git checkout).
    #[arg(long, global = true, default_value = ".")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the steward scheduler until interrupted.
    Daemon,
    /// Execute one steward immediately and print the result.
    Run {
        /// Steward (agent) id to execute.
        steward_id: String,
    },
    /// Documentation steward utilities.
    Docs {
        #[command(subcommand)]
        command: DocsCommands,
    },
    /// List registered stewards.
    Stewards,
}

#[derive(Subcommand)]
enum DocsCommands {
    /// Scan the docs tree and print every issue found.
    Scan,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let workspace = cli.workspace.canonicalize().unwrap_or(cli.workspace.clone());
    let config = config::load(cli.config.as_deref(), &workspace)?;

    match cli.command {
        Commands::Daemon => commands::daemon(&workspace, config).await,
        Commands::Run { steward_id } => commands::run_steward(&workspace, config, &steward_id).await,
        Commands::Docs { command: DocsCommands::Scan } => {
            commands::docs_scan(&workspace, config).await
        }
        Commands::Stewards => commands::list_stewards(&workspace).await,
    }
}
