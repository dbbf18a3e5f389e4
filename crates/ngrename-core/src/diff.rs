//! Unified diff generation for rename previews.

use std::collections::BTreeMap;

use crate::patch::{FileRename, OutputEdit};

/// Generate a unified diff from edit information.
///
/// Groups edits by file (in path order) and shows each edit as a single-line
/// hunk at its location. File renames are listed as `rename from`/`rename to`
/// headers before any hunks.
pub fn generate_unified_diff(edits: &[OutputEdit], renames: &[FileRename]) -> String {
    let mut by_file: BTreeMap<&str, Vec<&OutputEdit>> = BTreeMap::new();
    for edit in edits {
        by_file.entry(&edit.file).or_default().push(edit);
    }

    let mut diff = String::new();
    for rename in renames {
        diff.push_str(&format!("rename from {}\n", rename.old_path));
        diff.push_str(&format!("rename to {}\n", rename.new_path));
    }

    for (file, file_edits) in by_file {
        let target = renames
            .iter()
            .find(|r| r.old_path == file)
            .map(|r| r.new_path.as_str())
            .unwrap_or(file);
        diff.push_str(&format!("--- a/{}\n", file));
        diff.push_str(&format!("+++ b/{}\n", target));

        for edit in file_edits {
            diff.push_str(&format!("@@ -{},1 +{},1 @@\n", edit.line, edit.line));
            diff.push_str(&format!("-{}\n", edit.old_text));
            diff.push_str(&format!("+{}\n", edit.new_text));
        }
    }

    diff
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{EditProvenance, Span};

    fn edit(file: &str, line: u32) -> OutputEdit {
        OutputEdit {
            file: file.to_string(),
            span: Span::new(0, 3),
            old_text: "foo".to_string(),
            new_text: "bar".to_string(),
            provenance: EditProvenance::Structural,
            line,
            col: 1,
        }
    }

    #[test]
    fn generate_diff_groups_by_file() {
        let diff = generate_unified_diff(
            &[edit("b.html", 1), edit("a.ts", 1), edit("a.ts", 3)],
            &[],
        );
        assert_eq!(diff.matches("--- a/a.ts").count(), 1);
        assert_eq!(diff.matches("@@ -").count(), 3);
        assert!(diff.find("a/a.ts").unwrap() < diff.find("a/b.html").unwrap());
    }

    #[test]
    fn generate_diff_shows_renames() {
        let diff = generate_unified_diff(
            &[edit("foo.pipe.ts", 2)],
            &[FileRename::new("foo.pipe.ts", "bar.pipe.ts")],
        );
        assert!(diff.starts_with("rename from foo.pipe.ts\nrename to bar.pipe.ts\n"));
        assert!(diff.contains("--- a/foo.pipe.ts\n+++ b/bar.pipe.ts\n"));
        assert!(diff.contains("-foo\n+bar\n"));
    }

    #[test]
    fn generate_diff_empty() {
        assert!(generate_unified_diff(&[], &[]).is_empty());
    }
}
