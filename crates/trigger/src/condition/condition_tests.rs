// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

#[test]
fn safe_condition_evaluates() {
    let ctx = json!({ "task": { "status": "closed" } });
    assert!(evaluate("task.status === 'closed'", &ctx));

    let ctx = json!({ "task": { "status": "open" } });
    assert!(!evaluate("task.status === 'closed'", &ctx));
}

#[test]
fn unsafe_condition_is_false_and_does_not_crash() {
    let ctx = json!({ "anything": 1 });
    assert!(!evaluate("process.exit(1)", &ctx));
}

#[parameterized(
    blocked_require = { "require('child_process')" },
    blocked_eval = { "eval('1')" },
    blocked_fetch = { "fetch" },
    blocked_settimeout = { "setTimeout" },
    subscript = { "context['secret']" },
    assignment = { "task.status = 'closed'" },
    statement = { "a; b" },
    arithmetic = { "1 + 1" },
)]
fn blocked_conditions_are_false_regardless_of_context(condition: &str) {
    assert!(!evaluate(condition, &json!({})));
    assert!(!evaluate(condition, &json!({ "a": true, "b": true, "task": {} })));
}

#[test]
fn parse_failures_are_false() {
    let ctx = json!({ "a": true });
    assert!(!evaluate("a &&", &ctx));
    assert!(!evaluate("(a", &ctx));
    assert!(!evaluate("", &ctx));
}

#[test]
fn missing_context_is_false_not_error() {
    assert!(!evaluate("task.status === 'closed'", &json!({})));
    assert!(!evaluate("deep.chain.of.missing.things", &json!(null)));
}

#[test]
fn compound_conditions() {
    let ctx = json!({
        "task": { "status": "review", "priority": "high", "testsPassed": true },
        "source": "cron",
    });
    assert!(evaluate(
        "task.status === 'review' && (task.priority === 'high' || task.testsPassed)",
        &ctx
    ));
    assert!(!evaluate("source !== 'cron'", &ctx));
}
