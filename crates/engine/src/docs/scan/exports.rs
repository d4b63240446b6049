// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Export verification: identifiers documented under "Key Exports"
//! headings must appear in some package index file.

use super::{context_around, relative_path, Confidence, DocIssue, IssueType};
use regex::Regex;
use sf_core::Complexity;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// `Key Exports` / `Key Export` section headings, any level.
#[allow(clippy::expect_used)]
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^#+\s+key exports?\b").expect("constant regex pattern is valid")
});

/// Backticked exported-identifier shape.
#[allow(clippy::expect_used)]
static IDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`([A-Z][A-Za-z0-9]*)`").expect("constant regex pattern is valid")
});

pub(crate) fn scan(
    workspace_root: &Path,
    files: &[PathBuf],
    source_dirs: &[String],
) -> Vec<DocIssue> {
    let indexes = read_package_indexes(workspace_root, source_dirs);
    let mut issues = Vec::new();

    for file in files {
        let Ok(content) = std::fs::read_to_string(file) else { continue };
        let lines: Vec<&str> = content.lines().collect();
        for (index, ident) in documented_exports(&lines) {
            if indexes.iter().any(|content| content.contains(&ident)) {
                continue;
            }
            issues.push(DocIssue {
                issue_type: IssueType::Export,
                file: relative_path(workspace_root, file),
                line: index + 1,
                description: format!("Export `{ident}` not found in any package index"),
                current_value: ident,
                suggested_fix: None,
                confidence: Confidence::Medium,
                complexity: Complexity::Medium,
                context: context_around(&lines, index),
            });
        }
    }
    issues
}

/// `(line index, identifier)` pairs inside "Key Exports" sections.
fn documented_exports(lines: &[&str]) -> Vec<(usize, String)> {
    let mut found = Vec::new();
    let mut in_section = false;
    for (index, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with('#') {
            in_section = HEADING_RE.is_match(line.trim_start());
            continue;
        }
        if !in_section {
            continue;
        }
        for cap in IDENT_RE.captures_iter(line) {
            found.push((index, cap[1].to_string()));
        }
    }
    found
}

/// Contents of `<source_dir>/<pkg>/src/index.ts` for every package.
fn read_package_indexes(workspace_root: &Path, source_dirs: &[String]) -> Vec<String> {
    let mut indexes = Vec::new();
    for source_dir in source_dirs {
        let dir = workspace_root.join(source_dir);
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let index_file = entry.path().join("src").join("index.ts");
            if let Ok(content) = std::fs::read_to_string(&index_file) {
                indexes.push(content);
            }
        }
    }
    indexes
}

#[cfg(test)]
#[path = "exports_tests.rs"]
mod tests;
