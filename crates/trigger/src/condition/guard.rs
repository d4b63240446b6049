// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Syntactic safety guard applied before a condition is parsed.
//!
//! Condition strings come from steward definitions, which are authored by
//! users and must be treated as untrusted. The guard strips string literals
//! and then rejects every construct the grammar has no business containing:
//! statement separators, dangerous identifiers, call syntax, subscripting,
//! assignment. The recursive-descent parser is the definitive filter by
//! construction; the guard is the cheap early reject.

use regex::Regex;
use std::sync::LazyLock;

/// Identifiers that must never appear outside string literals.
const BLOCKED_IDENTIFIERS: &[&str] = &[
    "import",
    "require",
    "eval",
    "Function",
    "constructor",
    "__proto__",
    "prototype",
    "process",
    "global",
    "globalThis",
    "window",
    "document",
    "setTimeout",
    "setInterval",
    "fetch",
];

/// Keyword operators that enable construction, introspection, or scope
/// access.
const BLOCKED_KEYWORDS: &[&str] =
    &["this", "new", "delete", "void", "typeof", "in", "instanceof"];

/// Word-bounded match over [`BLOCKED_IDENTIFIERS`].
#[allow(clippy::expect_used)]
static BLOCKED_IDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    let words = BLOCKED_IDENTIFIERS.join("|");
    Regex::new(&format!(r"\b({words})\b")).expect("constant regex pattern is valid")
});

/// Word-bounded match over [`BLOCKED_KEYWORDS`].
#[allow(clippy::expect_used)]
static BLOCKED_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    let words = BLOCKED_KEYWORDS.join("|");
    Regex::new(&format!(r"\b({words})\b")).expect("constant regex pattern is valid")
});

/// An identifier immediately followed by `(` — call syntax.
#[allow(clippy::expect_used)]
static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*\s*\(").expect("constant regex pattern is valid")
});

/// Everything the permitted grammar can possibly contain, post-stripping.
#[allow(clippy::expect_used)]
static ALLOWED_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[\w\s.$?!&|><=()'",-]*$"#).expect("constant regex pattern is valid")
});

/// Check a condition string. `Err` carries the rejection reason.
pub(super) fn check(condition: &str) -> Result<(), &'static str> {
    let stripped = strip_string_literals(condition);

    if stripped.contains([';', '{', '}']) {
        return Err("statement separator");
    }
    if BLOCKED_IDENT_RE.is_match(&stripped) {
        return Err("blocked identifier");
    }
    if stripped.contains("...") {
        return Err("spread operator");
    }
    if stripped.contains("++") || stripped.contains("--") {
        return Err("increment operator");
    }
    if stripped.contains('`') {
        return Err("template literal");
    }
    if stripped.contains("=>") {
        return Err("arrow function");
    }
    if BLOCKED_KEYWORD_RE.is_match(&stripped) {
        return Err("blocked keyword");
    }
    if stripped.contains(['[', ']']) {
        return Err("bracket subscript");
    }
    if has_assignment(&stripped) {
        return Err("assignment");
    }
    if CALL_RE.is_match(&stripped) {
        return Err("function call");
    }
    if !ALLOWED_CHARS_RE.is_match(&stripped) {
        return Err("disallowed character");
    }
    Ok(())
}

/// Replace the contents of quoted literals, keeping the quotes, so the
/// checks above never fire on literal text.
fn strip_string_literals(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' || c == '"' {
            out.push(c);
            let quote = c;
            while let Some(inner) = chars.next() {
                if inner == '\\' {
                    chars.next();
                    continue;
                }
                if inner == quote {
                    out.push(quote);
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

/// True when a bare `=` appears that is not part of `==`, `===`, `!=`,
/// `<=`, or `>=`.
fn has_assignment(s: &str) -> bool {
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'=' {
            continue;
        }
        let prev = i.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(i + 1);
        let part_of_comparison = matches!(prev, Some(b'=' | b'!' | b'<' | b'>'))
            || next == Some(&b'=');
        if !part_of_comparison {
            return true;
        }
    }
    false
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
