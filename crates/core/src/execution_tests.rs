// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::entry;

#[test]
fn sequenced_id_format() {
    let id = ExecutionId::sequenced(7, 1_735_689_600_000);
    assert_eq!(id.as_str(), "exec-7-1735689600000");
}

#[test]
fn entry_finalization_state() {
    let mut e = entry("stw-1", 100);
    assert!(!e.is_finalized());
    assert_eq!(e.succeeded(), None);

    e.completed_at = Some(e.started_at);
    e.result = Some(ExecutionResult::success("ok", 5));
    assert!(e.is_finalized());
    assert_eq!(e.succeeded(), Some(true));
}

#[test]
fn manual_flag_wins_trigger_kind() {
    let mut e = entry("stw-1", 100);
    e.trigger = Trigger::manual();
    e.manual = true;
    assert_eq!(e.trigger_kind(), TriggerKind::Manual);

    e.manual = false;
    e.trigger = Trigger::cron("* * * * *");
    assert_eq!(e.trigger_kind(), TriggerKind::Cron);
}

#[test]
fn result_constructors() {
    let ok = ExecutionResult::success("Processed 3 tasks", 1200).items_processed(3u32);
    assert!(ok.success);
    assert_eq!(ok.items_processed, Some(3));
    assert_eq!(ok.error, None);

    let err = ExecutionResult::failure("boom", 4);
    assert!(!err.success);
    assert_eq!(err.error.as_deref(), Some("boom"));
    assert_eq!(err.output, None);
}

#[test]
fn entry_serde_skips_absent_fields() {
    let e = entry("stw-1", 100);
    let json = serde_json::to_value(&e).unwrap();
    assert!(json.get("completed_at").is_none());
    assert!(json.get("result").is_none());
    assert!(json.get("event_context").is_none());
}
