// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, path: &str, content: &str) {
        let full = self.root().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    fn scan(&self) -> Vec<DocIssue> {
        let files = super::super::markdown_files(&self.root().join("docs"));
        scan(self.root(), &files, &["packages".to_string(), "apps".to_string()])
    }
}

const DOC: &str = "\
# Module

## Key Exports

- `TaskQueue` — the queue
- `missingLowercase` is ignored by the identifier shape
- `GhostExport` — documented but gone

## Other Section

`NotAnExportSection` is outside the section.
";

#[test]
fn documented_exports_must_appear_in_some_index() {
    let f = Fixture::new();
    f.write("packages/quarry/src/index.ts", "export { TaskQueue } from './queue';\n");
    f.write("docs/module.md", DOC);

    let issues = f.scan();
    assert_eq!(issues.len(), 1);
    let issue = &issues[0];
    assert_eq!(issue.issue_type, IssueType::Export);
    assert_eq!(issue.current_value, "GhostExport");
    assert_eq!(issue.confidence, Confidence::Medium);
    assert_eq!(issue.complexity, Complexity::Medium);
    assert!(issue.description.contains("GhostExport"));
}

#[test]
fn identifiers_outside_key_exports_sections_are_ignored() {
    let f = Fixture::new();
    f.write("packages/quarry/src/index.ts", "export {};\n");
    f.write("docs/module.md", "# Module\n\n`RandomType` appears outside any section.\n");
    assert!(f.scan().is_empty());
}

#[test]
fn singular_key_export_heading_also_matches() {
    let f = Fixture::new();
    f.write("packages/quarry/src/index.ts", "export {};\n");
    f.write("docs/module.md", "# Module\n\n### Key Export\n\n- `LoneExport`\n");
    let issues = f.scan();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].current_value, "LoneExport");
}

#[test]
fn any_source_dir_index_satisfies_the_reference() {
    let f = Fixture::new();
    f.write("apps/web/src/index.ts", "export { TaskQueue };\n");
    f.write("docs/module.md", "## Key Exports\n\n`TaskQueue`\n");
    assert!(f.scan().is_empty());
}

#[test]
fn without_any_index_every_export_is_reported() {
    let f = Fixture::new();
    f.write("docs/module.md", "## Key Exports\n\n`SomeExport`\n");
    let issues = f.scan();
    assert_eq!(issues.len(), 1);
}
