// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn missing_config_uses_defaults() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = load(None, dir.path()).unwrap();
    assert_eq!(config, StewardConfig::default());
}

#[test]
fn workspace_config_is_discovered() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("stoneforge.toml"),
        "[merge]\ntest_command = \"cargo test\"\n",
    )
    .unwrap();

    let config = load(None, dir.path()).unwrap();
    assert_eq!(config.merge.test_command, "cargo test");
    // Everything else keeps defaults.
    assert_eq!(config.scheduler.max_history_per_steward, 100);
}

#[test]
fn explicit_path_wins() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("stoneforge.toml"), "[merge]\nauto_merge = false\n").unwrap();
    let other = dir.path().join("other.toml");
    std::fs::write(&other, "[merge]\nauto_merge = true\n").unwrap();

    let config = load(Some(&other), dir.path()).unwrap();
    assert!(config.merge.auto_merge);
}

#[test]
fn malformed_config_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "not [valid toml").unwrap();
    assert!(load(Some(&path), dir.path()).is_err());
}
