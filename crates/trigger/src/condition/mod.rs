// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restricted boolean predicates over event payloads.
//!
//! Conditions are user-authored strings attached to event triggers, e.g.
//! `task.status === 'closed' && task.priority != 'low'`. They are evaluated
//! with a purpose-built recursive-descent evaluator — never a language-level
//! eval. A syntactic guard rejects anything outside the permitted grammar
//! before parsing; the grammar itself admits only property reads, literals,
//! comparisons, and boolean connectives.

mod eval;
mod guard;
mod lexer;
mod parser;
mod token;

pub use eval::Value;
pub use parser::{CmpOp, Expr, Literal, ParseError, PathSeg};
pub use token::{LexError, Token};

/// Evaluate `condition` against an event payload.
///
/// Returns `true` iff the predicate holds. Any guard rejection, parse
/// error, or evaluation surprise yields `false` — a bad condition must
/// never take the scheduler down.
pub fn evaluate(condition: &str, context: &serde_json::Value) -> bool {
    if let Err(reason) = guard::check(condition) {
        tracing::warn!(condition, reason, "condition rejected by safety guard");
        return false;
    }
    match parser::parse(condition) {
        Ok(expr) => eval::eval(&expr, context).truthy(),
        Err(err) => {
            tracing::debug!(condition, error = %err, "condition failed to parse");
            false
        }
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
