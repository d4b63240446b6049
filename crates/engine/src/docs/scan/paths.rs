// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-path verification: backticked paths and table-row paths must exist.

use super::{
    context_around, relative_path, Confidence, DocIssue, IssueType, SUPPORTED_EXTENSIONS,
};
use regex::Regex;
use sf_core::Complexity;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Backticked spans, path-shaped or not.
#[allow(clippy::expect_used)]
static BACKTICK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("constant regex pattern is valid"));

pub(crate) fn scan(workspace_root: &Path, files: &[PathBuf]) -> Vec<DocIssue> {
    let mut issues = Vec::new();
    for file in files {
        let Ok(content) = std::fs::read_to_string(file) else { continue };
        let lines: Vec<&str> = content.lines().collect();
        for (index, line) in lines.iter().enumerate() {
            for candidate in candidates_in_line(line) {
                if let Some(issue) = check_candidate(
                    workspace_root,
                    file,
                    &lines,
                    index,
                    &candidate,
                ) {
                    issues.push(issue);
                }
            }
        }
    }
    issues
}

/// Path-looking strings on one line: backticked tokens and the first
/// column of table rows, filtered to supported extensions.
fn candidates_in_line(line: &str) -> Vec<String> {
    let mut found = Vec::new();
    for cap in BACKTICK_RE.captures_iter(line) {
        let text = cap[1].trim();
        if has_supported_extension(text) {
            found.push(text.to_string());
        }
    }
    if let Some(cell) = first_table_cell(line) {
        let text = cell.trim().trim_matches('`').trim();
        if has_supported_extension(text) && !found.iter().any(|f| f == text) {
            found.push(text.to_string());
        }
    }
    found
}

fn first_table_cell(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('|') {
        return None;
    }
    trimmed.trim_start_matches('|').split('|').next()
}

fn has_supported_extension(text: &str) -> bool {
    !text.contains(char::is_whitespace)
        && SUPPORTED_EXTENSIONS
            .iter()
            .any(|ext| text.strip_suffix(ext).is_some_and(|rest| rest.ends_with('.')))
}

fn check_candidate(
    workspace_root: &Path,
    file: &Path,
    lines: &[&str],
    index: usize,
    candidate: &str,
) -> Option<DocIssue> {
    // Globs can't be checked, and relative in-doc links belong to the
    // link pass.
    if candidate.contains('*') {
        return None;
    }
    if candidate.ends_with(".md") && (candidate.starts_with("./") || candidate.starts_with("../"))
    {
        return None;
    }

    let full = workspace_root.join(candidate);
    if full.exists() {
        return None;
    }

    let suggestion = suggest_similar(&full);
    let (confidence, complexity) = if suggestion.is_some() {
        (Confidence::Medium, Complexity::Low)
    } else {
        (Confidence::Low, Complexity::Medium)
    };

    Some(DocIssue {
        issue_type: IssueType::FilePath,
        file: relative_path(workspace_root, file),
        line: index + 1,
        description: format!("Referenced file does not exist: {candidate}"),
        current_value: candidate.to_string(),
        suggested_fix: suggestion
            .map(|name| full.with_file_name(name))
            .map(|p| relative_path(workspace_root, &p)),
        confidence,
        complexity,
        context: context_around(lines, index),
    })
}

/// A similar file in the same directory: same stem with another supported
/// extension, else the first entry whose lowercased name contains the stem.
fn suggest_similar(missing: &Path) -> Option<String> {
    let dir = missing.parent()?;
    let stem = missing.file_stem()?.to_str()?;
    let entries: Vec<String> = std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();

    for ext in SUPPORTED_EXTENSIONS {
        let sibling = format!("{stem}.{ext}");
        if entries.iter().any(|e| e == &sibling) {
            return Some(sibling);
        }
    }

    let stem_lower = stem.to_lowercase();
    entries.into_iter().find(|e| e.to_lowercase().contains(&stem_lower))
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
