// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI-command verification: every `sf <cmd>` in the CLI reference must
//! have a matching command source file.

use super::{context_around, Confidence, DocIssue, IssueType};
use regex::Regex;
use sf_core::Complexity;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

const CLI_DOC: &str = "docs/reference/cli.md";
const COMMANDS_DIR: &str = "packages/quarry/src/cli/commands";

/// Backticked `sf <cmd> [<sub>]` invocations in the reference doc.
#[allow(clippy::expect_used)]
static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`sf\s+([a-z][a-z0-9-]*)(?:\s+[a-z][a-z0-9-]*)?`")
        .expect("constant regex pattern is valid")
});

pub(crate) fn scan(workspace_root: &Path) -> Vec<DocIssue> {
    let doc_path = workspace_root.join(CLI_DOC);
    let commands_dir = workspace_root.join(COMMANDS_DIR);
    if !doc_path.exists() || !commands_dir.exists() {
        return Vec::new();
    }

    let implemented = implemented_commands(&commands_dir);
    let Ok(content) = std::fs::read_to_string(&doc_path) else { return Vec::new() };
    let lines: Vec<&str> = content.lines().collect();

    let mut issues = Vec::new();
    let mut reported = HashSet::new();
    for (index, line) in lines.iter().enumerate() {
        for cap in COMMAND_RE.captures_iter(line) {
            let main = cap[1].to_string();
            if implemented.contains(&main) || !reported.insert(main.clone()) {
                continue;
            }
            issues.push(DocIssue {
                issue_type: IssueType::CliCommand,
                file: CLI_DOC.to_string(),
                line: index + 1,
                description: format!("Documented command `sf {main}` has no implementation"),
                current_value: cap[0].trim_matches('`').to_string(),
                suggested_fix: None,
                confidence: Confidence::High,
                complexity: Complexity::Medium,
                context: context_around(&lines, index),
            });
        }
    }
    issues
}

/// Sub-command names from the implementation directory: `*.ts` filenames,
/// `index` excluded.
fn implemented_commands(dir: &Path) -> HashSet<String> {
    let Ok(entries) = std::fs::read_dir(dir) else { return HashSet::new() };
    entries
        .flatten()
        .filter_map(|e| {
            let path = e.path();
            if path.extension()? != "ts" {
                return None;
            }
            let stem = path.file_stem()?.to_str()?;
            (stem != "index").then(|| stem.to_string())
        })
        .collect()
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
