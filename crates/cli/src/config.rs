// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config file discovery and parsing.

use anyhow::Context;
use sf_core::StewardConfig;
use std::path::{Path, PathBuf};

/// Explicit path, then `<workspace>/stoneforge.toml`, then the user config
/// dir; defaults when nothing exists.
pub fn load(explicit: Option<&Path>, workspace: &Path) -> anyhow::Result<StewardConfig> {
    if let Some(path) = explicit {
        return read(path);
    }
    for candidate in candidates(workspace) {
        if candidate.exists() {
            return read(&candidate);
        }
    }
    Ok(StewardConfig::default())
}

fn candidates(workspace: &Path) -> Vec<PathBuf> {
    let mut paths = vec![workspace.join("stoneforge.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("stoneforge").join("config.toml"));
    }
    paths
}

fn read(path: &Path) -> anyhow::Result<StewardConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
