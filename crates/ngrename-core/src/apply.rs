//! Transactional edit applier.
//!
//! [`EditApplier::apply`] executes a [`RenamePlan`] against
//! [`WorkspaceBuffers`] as one all-or-nothing transaction:
//!
//! 1. Check that no two edits overlap.
//! 2. Check every file-hash precondition and the expected old text at every span.
//! 3. Check that every rename source exists and no rename target is taken.
//! 4. Stage the new content of each edited file in an arena.
//! 5. Commit staged content, then execute file renames.
//!
//! Nothing in the buffers changes until step 5, and step 5 cannot fail.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::patch::{Conflict, Edit, FileRename, Precondition, RenamePlan, Span};
use crate::text::extract_span;
use crate::workspace::WorkspaceBuffers;

/// Why an apply was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// Content changed since the plan was computed.
    #[error("stale edit in {file}: {reason}")]
    StaleEdit { file: String, reason: String },

    /// Two edits write the same bytes.
    #[error("overlapping edits in {file}: {first} and {second}")]
    OverlappingEdits {
        file: String,
        first: Span,
        second: Span,
    },

    /// A file rename would overwrite an existing file.
    #[error("cannot rename to {path}: file already exists")]
    FileRenameConflict { path: String },
}

/// Result of a successful apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedSummary {
    /// Edited files, by their path before renames, in path order.
    pub files_touched: Vec<String>,
    pub renames_performed: Vec<FileRename>,
    pub edits_applied: usize,
}

impl AppliedSummary {
    /// Where a pre-apply path lives after the renames.
    pub fn final_path<'a>(&'a self, path: &'a str) -> &'a str {
        self.renames_performed
            .iter()
            .find(|r| r.old_path == path)
            .map(|r| r.new_path.as_str())
            .unwrap_or(path)
    }
}

/// Executes rename plans against workspace buffers.
#[derive(Debug, Default, Clone, Copy)]
pub struct EditApplier;

impl EditApplier {
    pub fn new() -> Self {
        EditApplier
    }

    /// Apply `plan` to `buffers` atomically.
    pub fn apply(
        &self,
        plan: &RenamePlan,
        buffers: &mut WorkspaceBuffers,
    ) -> Result<AppliedSummary, ApplyError> {
        if let Some(Conflict::OverlappingSpans {
            file,
            edit1_span,
            edit2_span,
        }) = plan.detect_conflicts().into_iter().next()
        {
            return Err(ApplyError::OverlappingEdits {
                file,
                first: edit1_span,
                second: edit2_span,
            });
        }

        check_preconditions(plan, buffers)?;
        check_renames(plan, buffers)?;
        let staged = stage(plan, buffers)?;

        // Commit: nothing below can fail.
        let summary = AppliedSummary {
            files_touched: staged.keys().cloned().collect(),
            renames_performed: plan.file_renames.clone(),
            edits_applied: plan.edits.len(),
        };
        for (path, content) in staged {
            buffers.insert(path, content);
        }
        // Two-phase move so that swaps and chains (a -> b, b -> c) never clobber.
        let mut moving: Vec<(String, String)> = Vec::new();
        for rename in &plan.file_renames {
            if let Some(content) = buffers.remove(&rename.old_path) {
                moving.push((rename.new_path.clone(), content));
            }
        }
        for (path, content) in moving {
            buffers.insert(path, content);
        }

        debug!(
            files = summary.files_touched.len(),
            edits = summary.edits_applied,
            renames = summary.renames_performed.len(),
            "applied rename plan"
        );
        Ok(summary)
    }
}

fn check_preconditions(plan: &RenamePlan, buffers: &WorkspaceBuffers) -> Result<(), ApplyError> {
    for precondition in &plan.preconditions {
        match precondition {
            Precondition::FileHashMatches { file, content_hash } => {
                match buffers.content_hash(file) {
                    Some(actual) if &actual == content_hash => {}
                    Some(actual) => {
                        return Err(ApplyError::StaleEdit {
                            file: file.clone(),
                            reason: format!(
                                "content hash changed (expected {}, found {})",
                                content_hash, actual
                            ),
                        });
                    }
                    None => {
                        return Err(ApplyError::StaleEdit {
                            file: file.clone(),
                            reason: "file no longer exists".to_string(),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

fn check_renames(plan: &RenamePlan, buffers: &WorkspaceBuffers) -> Result<(), ApplyError> {
    let sources: BTreeSet<&str> = plan
        .file_renames
        .iter()
        .map(|r| r.old_path.as_str())
        .collect();
    let mut targets: BTreeSet<&str> = BTreeSet::new();

    for rename in &plan.file_renames {
        if !buffers.contains(&rename.old_path) {
            return Err(ApplyError::StaleEdit {
                file: rename.old_path.clone(),
                reason: "file to rename no longer exists".to_string(),
            });
        }
        let taken = buffers.contains(&rename.new_path) && !sources.contains(rename.new_path.as_str());
        if taken || !targets.insert(rename.new_path.as_str()) {
            return Err(ApplyError::FileRenameConflict {
                path: rename.new_path.clone(),
            });
        }
    }
    Ok(())
}

/// Build the post-edit content of every edited file without touching `buffers`.
fn stage(
    plan: &RenamePlan,
    buffers: &WorkspaceBuffers,
) -> Result<BTreeMap<String, String>, ApplyError> {
    let mut by_file: BTreeMap<&str, Vec<&Edit>> = BTreeMap::new();
    for edit in &plan.edits {
        by_file.entry(edit.file.as_str()).or_default().push(edit);
    }

    let mut staged = BTreeMap::new();
    for (file, mut edits) in by_file {
        let original = buffers.get(file).ok_or_else(|| ApplyError::StaleEdit {
            file: file.to_string(),
            reason: "file no longer exists".to_string(),
        })?;

        for edit in &edits {
            match extract_span(original, edit.span) {
                Some(found) if found == edit.old_text => {}
                Some(found) => {
                    return Err(ApplyError::StaleEdit {
                        file: file.to_string(),
                        reason: format!(
                            "expected '{}' at {}, found '{}'",
                            edit.old_text, edit.span, found
                        ),
                    });
                }
                None => {
                    return Err(ApplyError::StaleEdit {
                        file: file.to_string(),
                        reason: format!(
                            "span {} is outside the file ({} bytes)",
                            edit.span,
                            original.len()
                        ),
                    });
                }
            }
        }

        // Apply from the end so earlier offsets stay valid.
        edits.sort_by(|a, b| b.span.start.cmp(&a.span.start));
        let mut content = original.to_string();
        for edit in edits {
            content.replace_range(edit.span.range(), &edit.new_text);
        }
        staged.insert(file.to_string(), content);
    }
    Ok(staged)
}

// ============================================================================
// Tests
// ============================================================================
