//! Rename planning.
//!
//! Builds a [`RenamePlan`] from the reference set of a symbol:
//!
//! 1. Structural references, the declaration included, always become edits.
//! 2. Textual references become edits when text search is on and the
//!    [`LiteralPolicy`](super::LiteralPolicy) admits their region.
//! 3. Derived file renames are added, and every path literal pointing at a
//!    moved file is rewritten.
//! 4. Edits are sorted and deduplicated; any remaining overlap is fatal.

use std::collections::BTreeSet;

use tracing::debug;

use ngrename_core::error::RenameError;
use ngrename_core::facts::{Reference, Symbol, SymbolId};
use ngrename_core::patch::{
    Conflict, Edit, EditProvenance, FileRename, Precondition, RenamePlan, Span,
};
use ngrename_core::text::extract_span;
use ngrename_core::workspace::file_name;

use super::{RenameContext, RenameOptions};

/// Plan renaming symbol `id` to `new_name`.
///
/// Renaming to the current name yields an empty plan. Planning does not
/// validate the name; run [`super::validate_rename`] first.
pub fn plan_rename(
    ctx: &RenameContext<'_>,
    id: SymbolId,
    new_name: &str,
    options: &RenameOptions,
) -> Result<RenamePlan, RenameError> {
    let symbol = ctx.symbol(id)?;
    let mut plan = RenamePlan::new(id, &symbol.name, new_name, options.search_comments_and_text);
    if new_name == symbol.name {
        return Ok(plan);
    }

    for reference in ctx.facts.references_of(id) {
        let provenance = if reference.is_structural() {
            EditProvenance::Structural
        } else if options.search_comments_and_text && options.literal_policy.admits(&reference) {
            EditProvenance::Textual
        } else {
            continue;
        };
        plan.edits
            .push(reference_edit(ctx, symbol, &reference, new_name)?.with_provenance(provenance));
    }

    let renames = ctx.derived_renames(symbol, new_name)?;
    for rename in &renames {
        plan.edits.extend(link_edits(ctx, rename)?);
    }
    plan.file_renames = renames;

    let mut guarded: BTreeSet<String> = plan.edited_files();
    guarded.extend(plan.file_renames.iter().map(|r| r.old_path.clone()));
    for file in guarded {
        let content_hash = ctx
            .buffers
            .content_hash(&file)
            .ok_or_else(|| RenameError::FileNotFound { path: file.clone() })?;
        plan.preconditions
            .push(Precondition::FileHashMatches { file, content_hash });
    }

    plan.sort_edits();
    plan.dedup_edits();
    if let Some(Conflict::OverlappingSpans {
        file,
        edit1_span,
        edit2_span,
    }) = plan.detect_conflicts().into_iter().next()
    {
        return Err(RenameError::OverlappingEdits {
            file,
            first: edit1_span,
            second: edit2_span,
        });
    }

    debug!(
        symbol = %id,
        edits = plan.edits.len(),
        files = plan.edited_files().len(),
        renames = plan.file_renames.len(),
        "planned rename"
    );
    Ok(plan)
}

/// Replace one reference with `new_name`, checking the buffer still holds the old name.
fn reference_edit(
    ctx: &RenameContext<'_>,
    symbol: &Symbol,
    reference: &Reference,
    new_name: &str,
) -> Result<Edit, RenameError> {
    let path = ctx.facts.file_path(reference.file_id).ok_or_else(|| {
        RenameError::internal(format!("reference in unknown {}", reference.file_id))
    })?;
    let old_text = expect_text(ctx, path, reference.span, &symbol.name)?;
    Ok(Edit::replace(path, reference.span, old_text, new_name))
}

/// Rewrite every path literal that targets the source of `rename`.
fn link_edits(ctx: &RenameContext<'_>, rename: &FileRename) -> Result<Vec<Edit>, RenameError> {
    let old_name = file_name(&rename.old_path);
    let new_name = file_name(&rename.new_path);

    let mut edits = Vec::new();
    for hit in ctx.facts.links_targeting(&rename.old_path) {
        let specifier = &hit.link.specifier;
        let (dir, last) = match specifier.rfind('/') {
            Some(i) => specifier.split_at(i + 1),
            None => ("", specifier.as_str()),
        };
        let new_last = if last == old_name {
            new_name.to_string()
        } else if Some(last) == old_name.strip_suffix(".ts") {
            new_name.strip_suffix(".ts").unwrap_or(new_name).to_string()
        } else {
            continue;
        };

        let old_text = expect_text(ctx, &hit.file, hit.link.span, specifier)?;
        edits.push(
            Edit::replace(&hit.file, hit.link.span, old_text, format!("{}{}", dir, new_last))
                .with_provenance(EditProvenance::FileReference),
        );
    }
    Ok(edits)
}

/// Text at `span` in `path`, which must equal `expected`.
fn expect_text(
    ctx: &RenameContext<'_>,
    path: &str,
    span: Span,
    expected: &str,
) -> Result<String, RenameError> {
    let content = ctx
        .buffers
        .get(path)
        .ok_or_else(|| RenameError::FileNotFound {
            path: path.to_string(),
        })?;
    match extract_span(content, span) {
        Some(found) if found == expected => Ok(found.to_string()),
        Some(found) => Err(RenameError::StaleEdit {
            file: path.to_string(),
            reason: format!("expected '{}' at {}, found '{}'", expected, span, found),
        }),
        None => Err(RenameError::StaleEdit {
            file: path.to_string(),
            reason: format!("span {} is out of bounds", span),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::NamingPolicy;
    use crate::ops::fixtures::{load, symbol_named};
    use crate::ops::LiteralPolicy;

    const COMPONENT: &str = "import { Component } from '@angular/core';\n\n// FooBarComponent renders a title\n@Component({\n  selector: 'app-foo-bar',\n  templateUrl: './foo-bar.component.html',\n  styleUrls: ['./foo-bar.component.css'],\n})\nexport class FooBarComponent {\n  title = 'title';\n  label = 'the title here';\n}\n";
    const TEMPLATE: &str = "<!-- title goes here -->\n<h1 [title]=\"title\">{{ title }}</h1>\n";
    const MODULE: &str = "import { NgModule } from '@angular/core';\nimport { FooBarComponent } from './foo-bar.component';\n\n@NgModule({ declarations: [FooBarComponent] })\nexport class AppModule {}\n";

    fn files() -> Vec<(&'static str, &'static str)> {
        vec![
            ("src/app/foo-bar.component.ts", COMPONENT),
            ("src/app/foo-bar.component.html", TEMPLATE),
            ("src/app/foo-bar.component.css", "h1 { color: red; }\n"),
            ("src/app/app.module.ts", MODULE),
        ]
    }

    fn plan_for(name: &str, new_name: &str, options: RenameOptions) -> RenamePlan {
        let (facts, buffers) = load(&files());
        let policy = NamingPolicy::default();
        let ctx = RenameContext::new(&facts, &buffers, &policy);
        plan_rename(&ctx, symbol_named(&facts, name), new_name, &options).unwrap()
    }

    fn provenance_count(plan: &RenamePlan, provenance: EditProvenance) -> usize {
        plan.edits
            .iter()
            .filter(|e| e.provenance == provenance)
            .count()
    }

    mod field_tests {
        use super::*;

        #[test]
        fn structural_edits_only_without_search() {
            let plan = plan_for("title", "heading", RenameOptions::default().with_search(false));
            // Declaration, property binding, interpolation.
            assert_eq!(plan.edits.len(), 3);
            assert!(plan
                .edits
                .iter()
                .all(|e| e.provenance == EditProvenance::Structural && e.old_text == "title"));
            assert_eq!(
                plan.edited_files().into_iter().collect::<Vec<_>>(),
                vec![
                    "src/app/foo-bar.component.html".to_string(),
                    "src/app/foo-bar.component.ts".to_string(),
                ]
            );
            assert!(plan.file_renames.is_empty());
        }

        #[test]
        fn comments_follow_search_flag() {
            let plan = plan_for("title", "heading", RenameOptions::default());
            // Template comment plus the component's comment.
            assert_eq!(provenance_count(&plan, EditProvenance::Textual), 2);
        }

        #[test]
        fn literal_policy_widens_text_edits() {
            let exact = plan_for(
                "title",
                "heading",
                RenameOptions::default().with_literal_policy(LiteralPolicy::ExactMatch),
            );
            assert_eq!(provenance_count(&exact, EditProvenance::Textual), 3);

            let any = plan_for(
                "title",
                "heading",
                RenameOptions::default().with_literal_policy(LiteralPolicy::Any),
            );
            assert_eq!(provenance_count(&any, EditProvenance::Textual), 4);
        }

        #[test]
        fn plans_are_sorted_and_guarded() {
            let plan = plan_for("title", "heading", RenameOptions::default());
            let mut sorted = plan.edits.clone();
            sorted.sort_by(|a, b| a.file.cmp(&b.file).then(a.span.start.cmp(&b.span.start)));
            assert_eq!(plan.edits, sorted);
            assert_eq!(plan.preconditions.len(), 2);
        }
    }

    mod component_tests {
        use super::*;

        #[test]
        fn component_rename_moves_files_and_rewrites_links() {
            let plan = plan_for("FooBarComponent", "NewNameComponent", RenameOptions::default());

            let moved: Vec<&str> = plan.file_renames.iter().map(|r| r.new_path.as_str()).collect();
            assert_eq!(
                moved,
                vec![
                    "src/app/new-name.component.css",
                    "src/app/new-name.component.html",
                    "src/app/new-name.component.ts",
                ]
            );

            let links: Vec<&str> = plan
                .edits
                .iter()
                .filter(|e| e.provenance == EditProvenance::FileReference)
                .map(|e| e.new_text.as_str())
                .collect();
            assert_eq!(
                links,
                vec![
                    "./new-name.component",
                    "./new-name.component.html",
                    "./new-name.component.css",
                ]
            );

            // Class name, import and declarations array; the comment is textual.
            assert_eq!(provenance_count(&plan, EditProvenance::Structural), 3);
            assert_eq!(provenance_count(&plan, EditProvenance::Textual), 1);
        }

        #[test]
        fn same_name_is_empty() {
            let plan = plan_for("FooBarComponent", "FooBarComponent", RenameOptions::default());
            assert!(plan.is_empty());
            assert!(plan.preconditions.is_empty());
        }

        #[test]
        fn planning_is_deterministic() {
            let first = plan_for("FooBarComponent", "NewNameComponent", RenameOptions::default());
            let second = plan_for("FooBarComponent", "NewNameComponent", RenameOptions::default());
            assert_eq!(first, second);
        }
    }

    mod stale_tests {
        use super::*;

        #[test]
        fn changed_buffer_is_stale() {
            let (facts, mut buffers) = load(&files());
            buffers.insert(
                "src/app/foo-bar.component.html",
                TEMPLATE.replace("{{ title }}", "{{ tilte }}"),
            );
            let policy = NamingPolicy::default();
            let ctx = RenameContext::new(&facts, &buffers, &policy);
            let err = plan_rename(
                &ctx,
                symbol_named(&facts, "title"),
                "heading",
                &RenameOptions::default(),
            )
            .unwrap_err();
            assert!(matches!(err, RenameError::StaleEdit { .. }));
        }
    }
}
