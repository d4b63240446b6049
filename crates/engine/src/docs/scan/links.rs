// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internal-link verification: markdown link targets and anchors.

use super::{context_around, relative_path, Confidence, DocIssue, IssueType};
use regex::{Regex, RegexBuilder};
use sf_core::Complexity;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// `[text](target)` markdown links.
#[allow(clippy::expect_used)]
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\(([^)\s]+)\)").expect("constant regex pattern is valid")
});

pub(crate) fn scan(workspace_root: &Path, files: &[PathBuf]) -> Vec<DocIssue> {
    let mut issues = Vec::new();
    for file in files {
        let Ok(content) = std::fs::read_to_string(file) else { continue };
        let lines: Vec<&str> = content.lines().collect();
        for (index, line) in lines.iter().enumerate() {
            for cap in LINK_RE.captures_iter(line) {
                let target = &cap[2];
                if let Some(issue) =
                    check_link(workspace_root, file, &content, &lines, index, target)
                {
                    issues.push(issue);
                }
            }
        }
    }
    issues
}

fn check_link(
    workspace_root: &Path,
    file: &Path,
    content: &str,
    lines: &[&str],
    index: usize,
    target: &str,
) -> Option<DocIssue> {
    if target.starts_with("http://") || target.starts_with("https://") {
        return None;
    }

    let issue = |description: String| DocIssue {
        issue_type: IssueType::InternalLink,
        file: relative_path(workspace_root, file),
        line: index + 1,
        description,
        current_value: target.to_string(),
        suggested_fix: None,
        confidence: Confidence::High,
        complexity: Complexity::Low,
        context: context_around(lines, index),
    };

    // Pure in-file anchor.
    if let Some(anchor) = target.strip_prefix('#') {
        if !anchor_exists(content, anchor) {
            return Some(issue(format!("Anchor #{anchor} not found in this file")));
        }
        return None;
    }

    let (path_part, anchor) = match target.split_once('#') {
        Some((path, anchor)) => (path, Some(anchor)),
        None => (target, None),
    };

    let base = file.parent().unwrap_or(workspace_root);
    let resolved = base.join(path_part);
    if !resolved.exists() {
        return Some(issue(format!("Link target does not exist: {path_part}")));
    }

    if let Some(anchor) = anchor {
        let target_content = std::fs::read_to_string(&resolved).unwrap_or_default();
        if !anchor_exists(&target_content, anchor) {
            return Some(issue(format!("Anchor #{anchor} not found in {path_part}")));
        }
    }

    None
}

/// Does a markdown heading matching `anchor` exist in `content`?
///
/// The anchor's `-` matches either `-` or whitespace; everything else is
/// matched literally, case-insensitively, at the start of a heading line.
pub(crate) fn anchor_exists(content: &str, anchor: &str) -> bool {
    let mut pattern = String::from(r"^#+\s+");
    for ch in anchor.chars() {
        if ch == '-' {
            pattern.push_str(r"[-\s]");
        } else {
            let mut buf = [0u8; 4];
            pattern.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
        }
    }
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "links_tests.rs"]
mod tests;
