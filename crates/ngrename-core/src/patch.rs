//! Rename plan IR: Span, Edit, FileRename and RenamePlan.
//!
//! A [`RenamePlan`] is the complete, inspectable description of one rename:
//! - Span-addressed text edits with their expected old text
//! - File renames derived from the new symbol name
//! - Content-hash preconditions captured at planning time
//!
//! Plans are data only. The [`crate::apply`] module executes them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::facts::SymbolId;
use crate::text::byte_offset_to_position;

/// Hash type for content verification (SHA-256, stored as hex string for JSON compatibility).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA-256 hash of the given bytes, returning hex-encoded string.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Span
// ============================================================================

/// Byte offsets into file content.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: u64,
    /// End byte offset (exclusive).
    pub end: u64,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: u64, end: u64) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Span of `len` bytes starting at `start`.
    pub fn at(start: usize, len: usize) -> Self {
        Span::new(start as u64, (start + len) as u64)
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if a byte offset falls inside the span (end inclusive, for cursor positions).
    pub fn touches(&self, offset: u64) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// The span as a `usize` range for slicing.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Edits
// ============================================================================

/// Why an edit is part of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditProvenance {
    /// Identifier bound to the symbol by the resolver.
    Structural,
    /// Word-boundary occurrence in a comment or string literal.
    Textual,
    /// Path literal pointing at a file that the plan renames.
    FileReference,
}

impl EditProvenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditProvenance::Structural => "structural",
            EditProvenance::Textual => "textual",
            EditProvenance::FileReference => "file_reference",
        }
    }
}

/// A single replacement of `span` in `file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Workspace-relative path of the file being edited.
    pub file: String,
    /// Byte range being replaced.
    pub span: Span,
    /// Text expected at `span` when the edit applies.
    pub old_text: String,
    /// Replacement text.
    pub new_text: String,
    pub provenance: EditProvenance,
}

impl Edit {
    /// Create a structural replacement.
    pub fn replace(
        file: impl Into<String>,
        span: Span,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
    ) -> Self {
        Edit {
            file: file.into(),
            span,
            old_text: old_text.into(),
            new_text: new_text.into(),
            provenance: EditProvenance::Structural,
        }
    }

    /// Set the provenance.
    pub fn with_provenance(mut self, provenance: EditProvenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Byte length change produced by this edit.
    pub fn delta(&self) -> i64 {
        self.new_text.len() as i64 - self.span.len() as i64
    }
}

/// Move of a file to a new workspace-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileRename {
    pub old_path: String,
    pub new_path: String,
}

impl FileRename {
    pub fn new(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        FileRename {
            old_path: old_path.into(),
            new_path: new_path.into(),
        }
    }
}

impl fmt::Display for FileRename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.old_path, self.new_path)
    }
}

// ============================================================================
// Preconditions and Conflicts
// ============================================================================

/// Checks that must pass before any edit can apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precondition {
    /// File content hash must match the hash observed at planning time.
    FileHashMatches {
        file: String,
        content_hash: ContentHash,
    },
}

/// A detected overlap that makes a plan unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conflict {
    /// Two edits have overlapping spans in the same file.
    OverlappingSpans {
        file: String,
        edit1_span: Span,
        edit2_span: Span,
    },
}

// ============================================================================
// RenamePlan
// ============================================================================

/// Transactional description of a rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePlan {
    pub symbol_id: SymbolId,
    pub old_name: String,
    pub new_name: String,
    /// Edits ordered by file path, then span start.
    pub edits: Vec<Edit>,
    pub file_renames: Vec<FileRename>,
    pub search_comments_and_text: bool,
    pub preconditions: Vec<Precondition>,
}

impl RenamePlan {
    /// Create an empty plan.
    pub fn new(
        symbol_id: SymbolId,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
        search_comments_and_text: bool,
    ) -> Self {
        RenamePlan {
            symbol_id,
            old_name: old_name.into(),
            new_name: new_name.into(),
            edits: Vec::new(),
            file_renames: Vec::new(),
            search_comments_and_text,
            preconditions: Vec::new(),
        }
    }

    /// Add an edit.
    pub fn with_edit(mut self, edit: Edit) -> Self {
        self.edits.push(edit);
        self
    }

    /// Add a file rename.
    pub fn with_file_rename(mut self, rename: FileRename) -> Self {
        self.file_renames.push(rename);
        self
    }

    /// Add a precondition.
    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// True when applying the plan would change nothing.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.file_renames.is_empty()
    }

    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }

    /// Paths of files that receive at least one edit.
    pub fn edited_files(&self) -> BTreeSet<String> {
        self.edits.iter().map(|e| e.file.clone()).collect()
    }

    /// Every path the plan reads or writes, including rename sources and targets.
    pub fn touched_files(&self) -> BTreeSet<String> {
        let mut files = self.edited_files();
        for rename in &self.file_renames {
            files.insert(rename.old_path.clone());
            files.insert(rename.new_path.clone());
        }
        files
    }

    /// Edits for one file, in plan order.
    pub fn edits_for<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Edit> + 'a {
        self.edits.iter().filter(move |e| e.file == file)
    }

    /// Sort edits in deterministic order: by file path, then span start, then span end.
    pub fn sort_edits(&mut self) {
        self.edits.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then(a.span.start.cmp(&b.span.start))
                .then(a.span.end.cmp(&b.span.end))
        });
        self.file_renames.sort();
    }

    /// Remove edits that replace the same span with the same text.
    ///
    /// Must run after [`RenamePlan::sort_edits`].
    pub fn dedup_edits(&mut self) {
        self.edits
            .dedup_by(|b, a| a.file == b.file && a.span == b.span && a.new_text == b.new_text);
        self.file_renames.dedup();
    }

    /// Detect overlapping edits within this plan.
    ///
    /// Returns a list of all detected conflicts. An empty list means no conflicts.
    #[must_use]
    pub fn detect_conflicts(&self) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        let mut edits_by_file: BTreeMap<&str, Vec<&Edit>> = BTreeMap::new();
        for edit in &self.edits {
            edits_by_file.entry(&edit.file).or_default().push(edit);
        }

        for (file, edits) in edits_by_file {
            for i in 0..edits.len() {
                for j in (i + 1)..edits.len() {
                    let span_i = edits[i].span;
                    let span_j = edits[j].span;
                    // Two identical zero-width spans are still a double write.
                    if span_i.overlaps(&span_j) || span_i == span_j {
                        conflicts.push(Conflict::OverlappingSpans {
                            file: file.to_string(),
                            edit1_span: span_i,
                            edit2_span: span_j,
                        });
                    }
                }
            }
        }

        conflicts
    }
}

// ============================================================================
// Preview Output
// ============================================================================

/// A single edit as it appears in output (for JSON serialization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputEdit {
    /// Workspace-relative file path.
    pub file: String,
    /// Byte range being replaced.
    pub span: Span,
    /// Original text.
    pub old_text: String,
    /// Replacement text.
    pub new_text: String,
    pub provenance: EditProvenance,
    /// 1-indexed line number (for display).
    pub line: u32,
    /// 1-indexed column (for display).
    pub col: u32,
}

impl RenamePlan {
    /// Render edits for display, resolving line/column against `content_of`.
    ///
    /// Files unknown to `content_of` are reported at 1:1.
    pub fn output_edits<'a, F>(&self, content_of: F) -> Vec<OutputEdit>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        self.edits
            .iter()
            .map(|edit| {
                let (line, col) = content_of(&edit.file)
                    .map(|c| byte_offset_to_position(c.as_bytes(), edit.span.start as usize))
                    .unwrap_or((1, 1));
                OutputEdit {
                    file: edit.file.clone(),
                    span: edit.span,
                    old_text: edit.old_text.clone(),
                    new_text: edit.new_text.clone(),
                    provenance: edit.provenance,
                    line,
                    col,
                }
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> RenamePlan {
        RenamePlan::new(SymbolId::new(1), "foo", "bar", true)
    }

    mod content_hash_tests {
        use super::*;

        #[test]
        fn content_hash_compute_produces_hex() {
            let hash = ContentHash::compute(b"hello");
            assert_eq!(hash.0.len(), 64);
            assert!(hash.0.chars().all(|c| c.is_ascii_hexdigit()));
        }

        #[test]
        fn content_hash_differs_for_different_content() {
            assert_ne!(ContentHash::compute(b"a"), ContentHash::compute(b"b"));
        }
    }

    mod span_tests {
        use super::*;

        #[test]
        fn span_creation() {
            let span = Span::new(10, 20);
            assert_eq!(span.len(), 10);
            assert!(!span.is_empty());
            assert_eq!(Span::at(10, 10), span);
        }

        #[test]
        fn adjacent_spans_do_not_overlap() {
            assert!(!Span::new(0, 5).overlaps(&Span::new(5, 10)));
            assert!(Span::new(0, 6).overlaps(&Span::new(5, 10)));
        }

        #[test]
        fn touches_includes_end() {
            let span = Span::new(3, 6);
            assert!(span.touches(3));
            assert!(span.touches(6));
            assert!(!span.touches(7));
        }

        #[test]
        #[should_panic]
        fn span_rejects_inverted_bounds() {
            let _ = Span::new(5, 1);
        }
    }

    mod plan_tests {
        use super::*;

        #[test]
        fn sort_orders_by_file_then_offset() {
            let mut plan = plan()
                .with_edit(Edit::replace("b.ts", Span::new(0, 3), "foo", "bar"))
                .with_edit(Edit::replace("a.ts", Span::new(10, 13), "foo", "bar"))
                .with_edit(Edit::replace("a.ts", Span::new(2, 5), "foo", "bar"));
            plan.sort_edits();

            let order: Vec<(&str, u64)> = plan
                .edits
                .iter()
                .map(|e| (e.file.as_str(), e.span.start))
                .collect();
            assert_eq!(order, vec![("a.ts", 2), ("a.ts", 10), ("b.ts", 0)]);
        }

        #[test]
        fn dedup_removes_identical_edits() {
            let mut plan = plan()
                .with_edit(Edit::replace("a.ts", Span::new(2, 5), "foo", "bar"))
                .with_edit(Edit::replace("a.ts", Span::new(2, 5), "foo", "bar"));
            plan.sort_edits();
            plan.dedup_edits();
            assert_eq!(plan.edit_count(), 1);
            assert!(plan.detect_conflicts().is_empty());
        }

        #[test]
        fn overlapping_edits_are_conflicts() {
            let plan = plan()
                .with_edit(Edit::replace("a.ts", Span::new(2, 5), "foo", "bar"))
                .with_edit(Edit::replace("a.ts", Span::new(4, 8), "o ba", "x"));
            let conflicts = plan.detect_conflicts();
            assert_eq!(conflicts.len(), 1);
            match &conflicts[0] {
                Conflict::OverlappingSpans { file, .. } => assert_eq!(file, "a.ts"),
            }
        }

        #[test]
        fn same_span_in_different_files_is_fine() {
            let plan = plan()
                .with_edit(Edit::replace("a.ts", Span::new(2, 5), "foo", "bar"))
                .with_edit(Edit::replace("b.ts", Span::new(2, 5), "foo", "bar"));
            assert!(plan.detect_conflicts().is_empty());
        }

        #[test]
        fn touched_files_include_rename_targets() {
            let plan = plan()
                .with_edit(Edit::replace("a.ts", Span::new(0, 3), "foo", "bar"))
                .with_file_rename(FileRename::new("foo.pipe.ts", "bar.pipe.ts"));
            let touched: Vec<String> = plan.touched_files().into_iter().collect();
            assert_eq!(touched, vec!["a.ts", "bar.pipe.ts", "foo.pipe.ts"]);
        }

        #[test]
        fn output_edits_resolve_positions() {
            let plan = plan().with_edit(Edit::replace("a.ts", Span::new(4, 7), "foo", "bar"));
            let out = plan.output_edits(|path| (path == "a.ts").then_some("ab\ncfoo"));
            assert_eq!((out[0].line, out[0].col), (2, 2));
        }
    }
}
