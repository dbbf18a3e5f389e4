//! Rename engine: the facts store, workspace buffers and file locks behind
//! one pipeline.
//!
//! ```text
//! footprint ─► lock files ─► validate ─► confirm ─► plan ─► apply ─► commit
//! ```
//!
//! # Locking
//!
//! Locks are always taken in this order: file locks, then `facts`, then
//! `buffers`. File locks are never requested while an `RwLock` is held.
//! A rename holds the file locks of its whole footprint from validation to
//! the end of commit; indexing holds the lock of the file being indexed.
//! The confirmation callback runs with only file locks held, so queries keep
//! working while it blocks.

use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ngrename_core::adapter::AnalysisError;
use ngrename_core::apply::{AppliedSummary, EditApplier};
use ngrename_core::error::RenameError;
use ngrename_core::facts::{FactsStore, Reference, Symbol, SymbolId};
use ngrename_core::lock::FileLockTable;
use ngrename_core::patch::{Edit, RenamePlan};
use ngrename_core::text::position_to_byte_offset;
use ngrename_core::types::Location;
use ngrename_core::workspace::WorkspaceBuffers;

use crate::handlers::Handler;
use crate::naming::NamingPolicy;
use crate::ops::{
    plan_rename, validate_rename, ConfirmationHandler, Decision, RenameContext, RenameOptions,
};

/// Result of a completed rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameOutcome {
    pub decision: Decision,
    pub plan: RenamePlan,
    pub summary: AppliedSummary,
    /// Files whose facts could not be rebuilt from their new content.
    ///
    /// Their buffers hold the renamed text; their facts still describe the
    /// content from before the rename, shifted to the new offsets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unindexed: Vec<String>,
}

/// Owns project facts and buffers and runs renames against them.
#[derive(Debug, Default)]
pub struct RenameEngine {
    facts: RwLock<FactsStore>,
    buffers: RwLock<WorkspaceBuffers>,
    locks: FileLockTable,
    policy: NamingPolicy,
    options: RenameOptions,
}

impl RenameEngine {
    /// An engine with no files.
    pub fn new(policy: NamingPolicy, options: RenameOptions) -> Self {
        RenameEngine {
            policy,
            options,
            ..RenameEngine::default()
        }
    }

    /// Index every supported file in `buffers`.
    ///
    /// Analysis is strict: any file that fails to analyze fails the load.
    /// Files without a handler are kept so they can be renamed along with
    /// their component.
    pub fn from_buffers(
        buffers: WorkspaceBuffers,
        policy: NamingPolicy,
        options: RenameOptions,
    ) -> Result<Self, RenameError> {
        let mut facts = FactsStore::new();
        for (path, content) in buffers.iter() {
            let Some(handler) = Handler::for_path(path) else {
                continue;
            };
            let analysis = handler.analyze(path, content)?;
            facts.index_file(path, handler.kind(), content, &analysis)?;
        }
        debug!(
            files = facts.file_count(),
            symbols = facts.symbols().len(),
            "indexed workspace"
        );

        Ok(RenameEngine {
            facts: RwLock::new(facts),
            buffers: RwLock::new(buffers),
            locks: FileLockTable::new(),
            policy,
            options,
        })
    }

    pub fn policy(&self) -> &NamingPolicy {
        &self.policy
    }

    pub fn options(&self) -> &RenameOptions {
        &self.options
    }

    fn facts(&self) -> RwLockReadGuard<'_, FactsStore> {
        self.facts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn facts_mut(&self) -> RwLockWriteGuard<'_, FactsStore> {
        self.facts.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn buffers(&self) -> RwLockReadGuard<'_, WorkspaceBuffers> {
        self.buffers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn buffers_mut(&self) -> RwLockWriteGuard<'_, WorkspaceBuffers> {
        self.buffers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a read-only query against a consistent view of facts and buffers.
    pub fn read<R>(&self, f: impl FnOnce(RenameContext<'_>) -> R) -> R {
        let facts = self.facts();
        let buffers = self.buffers();
        f(RenameContext::new(&facts, &buffers, &self.policy))
    }

    /// Copy of the current buffers.
    pub fn snapshot(&self) -> WorkspaceBuffers {
        self.buffers().clone()
    }

    // ------------------------------------------------------------------------
    // Indexing
    // ------------------------------------------------------------------------

    /// Index (or re-index) one file with new content.
    pub fn index_file(&self, path: &str, content: &str) -> Result<(), RenameError> {
        let handler = Handler::for_path(path).ok_or_else(|| AnalysisError::Unsupported {
            path: path.to_string(),
        })?;
        let _guard = self.locks.acquire([path]);

        let analysis = handler.analyze(path, content)?;
        let mut facts = self.facts_mut();
        let mut buffers = self.buffers_mut();
        facts.index_file(path, handler.kind(), content, &analysis)?;
        buffers.insert(path, content);
        Ok(())
    }

    /// Forget a file and every symbol it declares.
    pub fn remove_file(&self, path: &str) -> bool {
        let _guard = self.locks.acquire([path]);
        let mut facts = self.facts_mut();
        let mut buffers = self.buffers_mut();
        let indexed = facts.remove_file(path);
        buffers.remove(path).is_some() || indexed
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// The symbol declared or referenced at a byte offset.
    pub fn symbol_at(&self, path: &str, offset: u64) -> Option<Symbol> {
        self.facts().symbol_at(path, offset).cloned()
    }

    /// The symbol at a 1-based `path:line:col` location.
    pub fn symbol_at_location(&self, location: &Location) -> Result<Symbol, RenameError> {
        self.read(|ctx| {
            let content = ctx
                .buffers
                .get(&location.file)
                .ok_or_else(|| RenameError::FileNotFound {
                    path: location.file.clone(),
                })?;
            let offset = position_to_byte_offset(content.as_bytes(), location.line, location.col);
            ctx.facts
                .symbol_at(&location.file, offset as u64)
                .cloned()
                .ok_or_else(|| RenameError::SymbolNotFound {
                    target: format!("{}:{}:{}", location.file, location.line, location.col),
                })
        })
    }

    pub fn symbol(&self, id: SymbolId) -> Option<Symbol> {
        self.facts().symbol(id).cloned()
    }

    pub fn references_of(&self, id: SymbolId) -> Vec<Reference> {
        self.facts().references_of(id)
    }

    /// Validate a proposed name without changing anything.
    pub fn validate(&self, id: SymbolId, new_name: &str) -> Result<Decision, RenameError> {
        self.read(|ctx| validate_rename(&ctx, id, new_name))
    }

    /// Plan a rename without applying it.
    pub fn plan_rename(
        &self,
        id: SymbolId,
        new_name: &str,
        search_comments_and_text: bool,
    ) -> Result<RenamePlan, RenameError> {
        let options = self.options.with_search(search_comments_and_text);
        self.read(|ctx| plan_rename(&ctx, id, new_name, &options))
    }

    // ------------------------------------------------------------------------
    // Rename
    // ------------------------------------------------------------------------

    /// Every path a rename of `id` may read or write.
    fn footprint(&self, id: SymbolId, new_name: &str) -> Result<BTreeSet<String>, RenameError> {
        self.read(|ctx| {
            let symbol = ctx.symbol(id)?;
            let mut paths = BTreeSet::new();
            paths.insert(ctx.declaring_path(symbol)?.to_string());
            for reference in ctx.facts.references_of(id) {
                if let Some(path) = ctx.facts.file_path(reference.file_id) {
                    paths.insert(path.to_string());
                }
            }
            if new_name != symbol.name {
                for rename in ctx.derived_renames(symbol, new_name)? {
                    for hit in ctx.facts.links_targeting(&rename.old_path) {
                        paths.insert(hit.file);
                    }
                    paths.insert(rename.old_path);
                    paths.insert(rename.new_path);
                }
            }
            Ok(paths)
        })
    }

    /// Validate, confirm, plan and apply a rename of `id` to `new_name`.
    ///
    /// `confirm` is asked only when validation returns
    /// [`Decision::AllowWithConfirmation`]; declining leaves every file and
    /// every fact untouched.
    pub fn rename(
        &self,
        id: SymbolId,
        new_name: &str,
        search_comments_and_text: bool,
        confirm: &mut dyn ConfirmationHandler,
    ) -> Result<RenameOutcome, RenameError> {
        let footprint = self.footprint(id, new_name)?;
        let guard = self.locks.acquire(footprint);

        let decision = self.validate(id, new_name)?;
        match &decision {
            Decision::Reject(reason) => return Err(reason.clone().into()),
            Decision::AllowWithConfirmation(reason) => {
                if !confirm.confirm(reason) {
                    info!(symbol = %id, new_name, "rename declined");
                    return Err(RenameError::ConfirmationDenied {
                        reason: reason.to_string(),
                    });
                }
            }
            Decision::Allow => {}
        }

        let plan = self.plan_rename(id, new_name, search_comments_and_text)?;
        if let Some(outside) = plan.touched_files().into_iter().find(|p| !guard.covers(p)) {
            return Err(RenameError::StaleEdit {
                file: outside,
                reason: "facts changed while waiting for file locks; retry".to_string(),
            });
        }
        if plan.is_empty() {
            return Ok(RenameOutcome {
                decision,
                plan,
                summary: AppliedSummary::default(),
                unindexed: Vec::new(),
            });
        }

        let mut facts = self.facts_mut();
        let mut buffers = self.buffers_mut();
        let summary = EditApplier::new().apply(&plan, &mut buffers)?;
        let unindexed = commit(&mut facts, &buffers, &plan, &summary);
        drop(buffers);
        drop(facts);
        drop(guard);

        info!(
            symbol = %id,
            old_name = %plan.old_name,
            new_name,
            edits = summary.edits_applied,
            files = summary.files_touched.len(),
            renames = summary.renames_performed.len(),
            "renamed symbol"
        );
        Ok(RenameOutcome {
            decision,
            plan,
            summary,
            unindexed,
        })
    }
}

/// Bring the facts in line with buffers after a successful apply.
///
/// Declarations are shifted first so re-indexing lands on their existing
/// sites and keeps every symbol ID. Returns the paths that failed to re-index.
fn commit(
    facts: &mut FactsStore,
    buffers: &WorkspaceBuffers,
    plan: &RenamePlan,
    summary: &AppliedSummary,
) -> Vec<String> {
    for file in &summary.files_touched {
        let edits: Vec<&Edit> = plan.edits_for(file).collect();
        facts.relocate_declarations(file, &edits);
    }
    facts.rename_symbol(plan.symbol_id, &plan.new_name);
    for rename in &summary.renames_performed {
        facts.rename_file(&rename.old_path, &rename.new_path);
    }

    let mut reindex: BTreeSet<&str> = summary
        .files_touched
        .iter()
        .map(|f| summary.final_path(f))
        .collect();
    reindex.extend(summary.renames_performed.iter().map(|r| r.new_path.as_str()));

    let mut unindexed = Vec::new();
    for path in reindex {
        let (Some(handler), Some(content)) = (Handler::for_path(path), buffers.get(path)) else {
            continue;
        };
        let result = handler
            .analyze(path, content)
            .and_then(|analysis| facts.index_file(path, handler.kind(), content, &analysis));
        if let Err(err) = result {
            warn!(path, error = %err, "re-index after rename failed");
            unindexed.push(path.to_string());
        }
    }
    debug!(symbol = %plan.symbol_id, "committed rename to facts");
    unindexed
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::ConfirmationReason;

    const COMPONENT: &str = "import { Component } from '@angular/core';\n\n@Component({\n  selector: 'app-test',\n  templateUrl: './test.component.html',\n})\nexport class TestComponent {\n  title = 'Hello';\n}\n";
    const TEMPLATE: &str = "<h1>{{ title }}</h1>\n";

    fn engine() -> RenameEngine {
        let buffers = WorkspaceBuffers::new()
            .with_file("src/test.component.ts", COMPONENT)
            .with_file("src/test.component.html", TEMPLATE);
        RenameEngine::from_buffers(buffers, NamingPolicy::default(), RenameOptions::default())
            .unwrap()
    }

    fn title(engine: &RenameEngine) -> SymbolId {
        let offset = COMPONENT.find("title").unwrap() as u64;
        engine.symbol_at("src/test.component.ts", offset).unwrap().symbol_id
    }

    fn yes(_: &ConfirmationReason) -> bool {
        true
    }

    mod query_tests {
        use super::*;

        #[test]
        fn symbol_at_location_is_one_based() {
            let engine = engine();
            let sym = engine
                .symbol_at_location(&Location::new("src/test.component.html", 1, 8))
                .unwrap();
            assert_eq!(sym.name, "title");
        }

        #[test]
        fn unknown_location_errors() {
            let engine = engine();
            let err = engine
                .symbol_at_location(&Location::new("src/missing.html", 1, 1))
                .unwrap_err();
            assert!(matches!(err, RenameError::FileNotFound { .. }));
            let err = engine
                .symbol_at_location(&Location::new("src/test.component.html", 1, 1))
                .unwrap_err();
            assert!(matches!(err, RenameError::SymbolNotFound { .. }));
        }

        #[test]
        fn strict_analysis_fails_load() {
            let buffers = WorkspaceBuffers::new().with_file("src/bad.html", "<!-- open");
            let err = RenameEngine::from_buffers(
                buffers,
                NamingPolicy::default(),
                RenameOptions::default(),
            )
            .unwrap_err();
            assert!(matches!(err, RenameError::Analysis { .. }));
        }
    }

    mod rename_tests {
        use super::*;

        #[test]
        fn rename_keeps_identity_and_updates_facts() {
            let engine = engine();
            let id = title(&engine);
            let outcome = engine.rename(id, "heading", true, &mut yes).unwrap();
            assert_eq!(outcome.summary.edits_applied, 2);

            let sym = engine.symbol(id).unwrap();
            assert_eq!(sym.name, "heading");
            let refs = engine.references_of(id);
            assert_eq!(refs.len(), 2);
            assert_eq!(
                engine.snapshot().get("src/test.component.html"),
                Some("<h1>{{ heading }}</h1>\n")
            );
        }

        #[test]
        fn rename_outcome_lists_no_unindexed_files() {
            let engine = engine();
            let outcome = engine.rename(title(&engine), "heading", true, &mut yes).unwrap();
            assert!(outcome.unindexed.is_empty());
        }

        #[test]
        fn commit_reports_files_that_fail_to_reindex() {
            let engine = engine();
            let id = title(&engine);
            let plan = engine.plan_rename(id, "heading", false).unwrap();
            let mut buffers = engine.snapshot().with_file("src/broken.html", "<p");
            let mut summary = EditApplier::new().apply(&plan, &mut buffers).unwrap();
            summary.files_touched.push("src/broken.html".to_string());

            let mut facts = engine.facts_mut();
            let unindexed = commit(&mut facts, &buffers, &plan, &summary);
            assert_eq!(unindexed, vec!["src/broken.html".to_string()]);
            assert_eq!(facts.symbol(id).unwrap().name, "heading");
        }

        #[test]
        fn index_file_reresolves_bindings() {
            let engine = engine();
            let id = title(&engine);
            engine
                .index_file("src/test.component.html", "<p>{{ title }} {{ title }}</p>")
                .unwrap();
            assert_eq!(engine.references_of(id).len(), 3);
            assert!(engine.remove_file("src/test.component.html"));
            assert_eq!(engine.references_of(id).len(), 1);
        }

        #[test]
        fn unsupported_index_is_an_error() {
            let engine = engine();
            let err = engine.index_file("src/a.css", "h1 {}").unwrap_err();
            assert!(matches!(err, RenameError::Analysis { .. }));
        }
    }
}
