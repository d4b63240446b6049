// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Verification passes over the documentation tree.
//!
//! Each pass is a pure function over the filesystem, run off the async
//! runtime via `spawn_blocking`. Issues carry enough context (file, line,
//! surrounding text) for a session agent to fix them without re-scanning.

pub(crate) mod cli;
pub(crate) mod exports;
pub(crate) mod links;
pub(crate) mod paths;

use serde::{Deserialize, Serialize};
use sf_core::Complexity;
use std::path::{Path, PathBuf};

/// File extensions a documentation path reference may point at.
pub(crate) const SUPPORTED_EXTENSIONS: &[&str] = &["ts", "js", "tsx", "jsx", "json", "md"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    FilePath,
    InternalLink,
    Export,
    CliCommand,
    /// Reserved: the pass currently reports nothing.
    TypeField,
    /// Reserved: the pass currently reports nothing.
    ApiMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// One referential-drift finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocIssue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    /// Path relative to the workspace root.
    pub file: String,
    /// 1-based line number.
    pub line: usize,
    pub description: String,
    pub current_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    pub confidence: Confidence,
    pub complexity: Complexity,
    /// ±2 lines of surrounding text.
    pub context: String,
}

/// All markdown files under `root`, recursively, in stable order.
pub(crate) fn markdown_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect_markdown(root, &mut files);
    files.sort();
    files
}

fn collect_markdown(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_markdown(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "md") {
            out.push(path);
        }
    }
}

/// Workspace-relative display path.
pub(crate) fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// The line plus two lines either side, for issue context.
pub(crate) fn context_around(lines: &[&str], index: usize) -> String {
    let start = index.saturating_sub(2);
    let end = (index + 3).min(lines.len());
    lines[start..end].join("\n")
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
