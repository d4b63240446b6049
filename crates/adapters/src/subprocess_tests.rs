// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn captures_stdout_and_exit_code() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo hello"]);
    let out = run_with_timeout(cmd, Duration::from_secs(5), "echo").await.unwrap();
    assert!(out.success());
    assert_eq!(out.stdout.trim(), "hello");
}

#[tokio::test]
async fn captures_failure_and_stderr() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo oops >&2; exit 3"]);
    let out = run_with_timeout(cmd, Duration::from_secs(5), "fail").await.unwrap();
    assert!(!out.success());
    assert_eq!(out.exit_code, Some(3));
    assert_eq!(out.stderr.trim(), "oops");
}

#[tokio::test]
async fn combined_joins_streams() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo out; echo err >&2"]);
    let out = run_with_timeout(cmd, Duration::from_secs(5), "both").await.unwrap();
    let combined = out.combined();
    assert!(combined.contains("out"));
    assert!(combined.contains("err"));
}

#[tokio::test]
async fn timeout_kills_the_child() {
    let mut cmd = Command::new("sleep");
    cmd.arg("30");
    let err = run_with_timeout(cmd, Duration::from_millis(50), "sleep")
        .await
        .unwrap_err();
    assert!(matches!(err, SubprocessError::Timeout { .. }));
    assert!(err.to_string().contains("sleep"));
}

#[tokio::test]
async fn missing_binary_is_a_spawn_error() {
    let cmd = Command::new("definitely-not-a-real-binary-7f3a");
    let err = run_with_timeout(cmd, Duration::from_secs(1), "ghost").await.unwrap_err();
    assert!(matches!(err, SubprocessError::Spawn { .. }));
}
