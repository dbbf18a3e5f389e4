//! FactsStore: files, symbol table and reference index kept in step.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    File, FileId, FileKind, FileLink, LiteralRole, Namespace, Reference, ReferenceIndex,
    ScopeContext, ScopeId, Symbol, SymbolDecl, SymbolId, SymbolKind, SymbolTable, TextRegion,
};
use crate::adapter::{AnalysisError, FileAnalysis};
use crate::patch::{ContentHash, Edit, Span};
use crate::workspace::resolve_relative_path;

/// An identifier binding with its lexical context mapped to store IDs.
#[derive(Debug, Clone)]
struct RawBinding {
    name: String,
    span: Span,
    namespace: Namespace,
    scope: Option<ScopeId>,
    container: Option<SymbolId>,
}

/// A file link together with the path of the file that contains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkHit {
    pub file: String,
    pub link: FileLink,
}

/// In-memory facts for the whole project.
///
/// [`FactsStore::index_file`] replaces a file's contributions and then
/// re-resolves every binding in the project, so results never depend on the
/// order files were indexed in.
#[derive(Debug, Default)]
pub struct FactsStore {
    files: BTreeMap<FileId, File>,
    file_by_path: HashMap<String, FileId>,
    symbols: SymbolTable,
    references: ReferenceIndex,
    bindings: BTreeMap<FileId, Vec<RawBinding>>,
    next_file_id: u32,
}

impl FactsStore {
    pub fn new() -> Self {
        FactsStore::default()
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn references(&self) -> &ReferenceIndex {
        &self.references
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    pub fn file(&self, id: FileId) -> Option<&File> {
        self.files.get(&id)
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.file_by_path.get(path).copied()
    }

    pub fn file_path(&self, id: FileId) -> Option<&str> {
        self.files.get(&id).map(|f| f.path.as_str())
    }

    /// Indexed files in ID order.
    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.files.values()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Path of the file declaring a symbol.
    pub fn declaring_path(&self, symbol: &Symbol) -> Option<&str> {
        self.file_path(symbol.decl_file_id)
    }

    /// Resolve a name in a context.
    pub fn resolve(&self, name: &str, ctx: &ScopeContext) -> Option<&Symbol> {
        self.symbols.resolve(name, ctx)
    }

    // ------------------------------------------------------------------------
    // Indexing
    // ------------------------------------------------------------------------

    /// Index (or re-index) one file from its analysis.
    ///
    /// Idempotent: indexing the same content twice yields the same symbols
    /// and references.
    pub fn index_file(
        &mut self,
        path: &str,
        kind: FileKind,
        content: &str,
        analysis: &FileAnalysis,
    ) -> Result<FileId, AnalysisError> {
        analysis.check(path)?;

        let file_id = match self.file_by_path.get(path) {
            Some(id) => *id,
            None => {
                let id = FileId::new(self.next_file_id);
                self.next_file_id += 1;
                self.file_by_path.insert(path.to_string(), id);
                id
            }
        };
        self.files.insert(
            file_id,
            File {
                file_id,
                path: path.to_string(),
                kind,
                content_hash: ContentHash::compute(content.as_bytes()),
            },
        );

        self.symbols.clear_scopes(file_id);
        let mut scope_ids: Vec<ScopeId> = Vec::with_capacity(analysis.scopes.len());
        for scope in &analysis.scopes {
            let parent = scope.parent.map(|p| scope_ids[p]);
            scope_ids.push(self.symbols.add_scope(file_id, scope.span, parent));
        }

        let mut decl_ids: Vec<SymbolId> = Vec::with_capacity(analysis.declarations.len());
        for data in &analysis.declarations {
            let mut decl = SymbolDecl::new(data.kind, &data.name, file_id, data.span, kind);
            if let Some(scope) = data.scope {
                decl = decl.with_scope(scope_ids[scope]);
            }
            if let Some(container) = data.container {
                decl = decl.with_container(decl_ids[container]);
            }
            if let Some(template) = &data.template_path {
                decl = decl.with_template_path(template);
            }
            decl_ids.push(self.symbols.declare(decl));
        }
        let keep: HashSet<SymbolId> = decl_ids.iter().copied().collect();
        let retired = self.symbols.retire_file_except(file_id, &keep);

        let regions = analysis
            .regions
            .iter()
            .map(|r| TextRegion {
                span: r.span,
                kind: r.kind,
                text: r.text.clone(),
                owner: r.owner.map(|o| decl_ids[o]),
            })
            .collect();
        self.references.set_regions(file_id, kind, regions);

        let links = analysis
            .links
            .iter()
            .filter_map(|l| {
                resolve_relative_path(path, &l.specifier).map(|target| FileLink {
                    span: l.span,
                    specifier: l.specifier.clone(),
                    target,
                    role: l.role,
                })
            })
            .collect();
        self.references.set_links(file_id, links);

        let raw = analysis
            .bindings
            .iter()
            .map(|b| RawBinding {
                name: b.name.clone(),
                span: b.span,
                namespace: b.namespace,
                scope: b.scope.map(|s| scope_ids[s]),
                container: b.container.map(|c| decl_ids[c]),
            })
            .collect();
        self.bindings.insert(file_id, raw);

        self.rebuild_references();
        debug!(
            path,
            declarations = decl_ids.len(),
            retired = retired.len(),
            bindings = analysis.bindings.len(),
            "indexed file"
        );
        Ok(file_id)
    }

    /// Forget a file, retiring every symbol it declared.
    pub fn remove_file(&mut self, path: &str) -> bool {
        let Some(file_id) = self.file_by_path.remove(path) else {
            return false;
        };
        self.files.remove(&file_id);
        self.symbols.clear_scopes(file_id);
        self.symbols.retire_file_except(file_id, &HashSet::new());
        self.references.remove_file(file_id);
        self.bindings.remove(&file_id);
        self.rebuild_references();
        debug!(path, "removed file");
        true
    }

    /// Re-resolve every binding and rebuild structural references.
    fn rebuild_references(&mut self) {
        let mut found: Vec<Reference> = Vec::new();

        for symbol in self.symbols.iter() {
            found.push(
                Reference::structural(
                    symbol.symbol_id,
                    symbol.decl_file_id,
                    symbol.decl_span,
                    symbol.file_kind,
                )
                .as_declaration(),
            );
        }

        for (file_id, raws) in &self.bindings {
            let Some(file) = self.files.get(file_id) else {
                continue;
            };
            let owner = match file.kind {
                FileKind::Template => self
                    .symbols
                    .component_for_template(&file.path)
                    .map(|s| s.symbol_id),
                FileKind::Logic => None,
            };

            for raw in raws {
                let container = raw.container.or(owner);
                let template_file = match raw.namespace {
                    Namespace::TemplateLocal => container
                        .and_then(|c| self.symbols.get(c))
                        .and_then(|c| c.template_path.as_deref())
                        .and_then(|p| self.file_by_path.get(p))
                        .copied(),
                    _ => None,
                };
                let ctx = ScopeContext::new(raw.namespace)
                    .with_scope(raw.scope)
                    .with_container(container)
                    .with_template_file(template_file);

                if let Some(symbol) = self.symbols.resolve(&raw.name, &ctx) {
                    found.push(Reference::structural(
                        symbol.symbol_id,
                        *file_id,
                        raw.span,
                        file.kind,
                    ));
                }
            }
        }

        self.references.clear_structural();
        for reference in found {
            self.references.add_structural(reference);
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Every reference to a symbol, ordered by file path then offset.
    ///
    /// Includes the declaration site and textual occurrences of the current name.
    pub fn references_of(&self, id: SymbolId) -> Vec<Reference> {
        let Some(symbol) = self.symbols.get(id) else {
            return Vec::new();
        };
        let mut refs: Vec<Reference> = self
            .references
            .structural_of(id)
            .into_iter()
            .cloned()
            .collect();
        let files = self.textual_scope(symbol);
        refs.extend(self.references.textual_of(symbol, files.as_ref()));

        refs.sort_by(|a, b| {
            self.file_path(a.file_id)
                .cmp(&self.file_path(b.file_id))
                .then(a.span.start.cmp(&b.span.start))
                .then(a.span.end.cmp(&b.span.end))
        });
        refs.dedup_by(|b, a| a.file_id == b.file_id && a.span == b.span && a.kind == b.kind);
        refs
    }

    /// Files a textual search for `symbol` covers; `None` means every file.
    ///
    /// Fields and template locals are searched in their component's logic
    /// file and template only. Components, pipes and modules are project-wide.
    fn textual_scope(&self, symbol: &Symbol) -> Option<HashSet<FileId>> {
        let component = match symbol.kind {
            SymbolKind::Field => symbol.container.and_then(|c| self.symbols.get(c)),
            SymbolKind::TemplateLocal => self
                .declaring_path(symbol)
                .and_then(|path| self.symbols.component_for_template(path)),
            SymbolKind::Component | SymbolKind::Pipe | SymbolKind::Module => return None,
        };

        let mut files: HashSet<FileId> = [symbol.decl_file_id].into_iter().collect();
        if let Some(component) = component {
            files.insert(component.decl_file_id);
            if let Some(template) = component
                .template_path
                .as_deref()
                .and_then(|p| self.file_id(p))
            {
                files.insert(template);
            }
        }
        Some(files)
    }

    /// The symbol declared or referenced at `offset` in `path`.
    pub fn symbol_at(&self, path: &str, offset: u64) -> Option<&Symbol> {
        let file_id = self.file_id(path)?;
        if let Some(symbol) = self.symbols.lookup_by_declaration_site(file_id, offset) {
            return Some(symbol);
        }
        let reference = self.references.structural_at(file_id, offset)?;
        self.symbols.get(reference.symbol_id)
    }

    /// Links whose target is `path`.
    ///
    /// Module specifiers usually omit `.ts`, so `./foo.component` matches
    /// `foo.component.ts`.
    pub fn links_targeting(&self, path: &str) -> Vec<LinkHit> {
        let mut hits: Vec<LinkHit> = self
            .references
            .links()
            .filter(|(_, link)| {
                link.target == path
                    || (link.role == LiteralRole::ModuleSpecifier
                        && path.strip_suffix(".ts") == Some(link.target.as_str()))
            })
            .filter_map(|(file_id, link)| {
                Some(LinkHit {
                    file: self.file_path(file_id)?.to_string(),
                    link: link.clone(),
                })
            })
            .collect();
        hits.sort_by(|a, b| a.file.cmp(&b.file).then(a.link.span.cmp(&b.link.span)));
        hits
    }

    // ------------------------------------------------------------------------
    // Post-apply maintenance
    // ------------------------------------------------------------------------

    /// Shift declaration spans in `path` to account for applied edits.
    ///
    /// Run before re-indexing edited content so declarations land on their
    /// existing sites and keep their identity.
    pub fn relocate_declarations(&mut self, path: &str, edits: &[&Edit]) {
        let Some(file_id) = self.file_id(path) else {
            return;
        };
        let shift = |offset: u64| -> u64 {
            let delta: i64 = edits
                .iter()
                .filter(|e| e.span.end <= offset)
                .map(|e| e.delta())
                .sum();
            (offset as i64 + delta).max(0) as u64
        };
        let moves: Vec<(SymbolId, Span)> = self
            .symbols
            .in_file(file_id)
            .into_iter()
            .map(|s| {
                let start = shift(s.decl_span.start);
                let end = shift(s.decl_span.end).max(start);
                (s.symbol_id, Span::new(start, end))
            })
            .collect();
        self.symbols.relocate(&moves);
    }

    /// Give a symbol a new name.
    pub fn rename_symbol(&mut self, id: SymbolId, new_name: &str) -> bool {
        self.symbols.rename(id, new_name)
    }

    /// Record that a file moved, keeping its ID and declarations.
    pub fn rename_file(&mut self, old_path: &str, new_path: &str) -> bool {
        let Some(file_id) = self.file_by_path.remove(old_path) else {
            return false;
        };
        self.file_by_path.insert(new_path.to_string(), file_id);
        if let Some(file) = self.files.get_mut(&file_id) {
            file.path = new_path.to_string();
        }
        self.symbols.retarget_template(old_path, new_path);

        let old_module = old_path.strip_suffix(".ts");
        let new_module = new_path.strip_suffix(".ts");
        for link in self.references.links_mut() {
            if link.target == old_path {
                link.target = new_path.to_string();
            } else if let (Some(old), Some(new)) = (old_module, new_module) {
                if link.target == old {
                    link.target = new.to_string();
                }
            }
        }

        self.rebuild_references();
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{BindingData, DeclarationData, LinkData, RegionData};
    use crate::facts::ReferenceKind;

    const LOGIC: &str = "src/app.component.ts";
    const TEMPLATE: &str = "src/app.component.html";

    // class AppComponent { title = ''; } with templateUrl './app.component.html'
    fn logic_analysis() -> FileAnalysis {
        let mut analysis = FileAnalysis::default();
        let comp = analysis.push_declaration(
            DeclarationData::new(SymbolKind::Component, "AppComponent", Span::new(60, 72))
                .with_template_path(TEMPLATE),
        );
        analysis.push_declaration(
            DeclarationData::new(SymbolKind::Field, "title", Span::new(75, 80))
                .with_container(comp),
        );
        analysis.links.push(LinkData {
            span: Span::new(20, 40),
            specifier: "./app.component.html".to_string(),
            role: LiteralRole::ResourceUrl,
        });
        analysis.regions.push(RegionData::comment(
            Span::new(0, 16),
            " AppComponent! ",
        ));
        analysis
    }

    // <h1>{{ title }}</h1> <ng-template let-title>{{ title }}</ng-template>
    fn template_analysis() -> FileAnalysis {
        let mut analysis = FileAnalysis::default();
        let root = analysis.push_scope(Span::new(0, 200), None);
        let inner = analysis.push_scope(Span::new(50, 120), Some(root));
        analysis.push_declaration(
            DeclarationData::new(SymbolKind::TemplateLocal, "title", Span::new(66, 71))
                .in_scope(Some(inner)),
        );
        analysis.bindings.push(
            BindingData::new("title", Span::new(7, 12), Namespace::Value).in_scope(Some(root)),
        );
        analysis.bindings.push(
            BindingData::new("title", Span::new(80, 85), Namespace::Value).in_scope(Some(inner)),
        );
        analysis
    }

    fn indexed(template_first: bool) -> FactsStore {
        let mut store = FactsStore::new();
        if template_first {
            store
                .index_file(TEMPLATE, FileKind::Template, "t", &template_analysis())
                .unwrap();
            store
                .index_file(LOGIC, FileKind::Logic, "l", &logic_analysis())
                .unwrap();
        } else {
            store
                .index_file(LOGIC, FileKind::Logic, "l", &logic_analysis())
                .unwrap();
            store
                .index_file(TEMPLATE, FileKind::Template, "t", &template_analysis())
                .unwrap();
        }
        store
    }

    fn field(store: &FactsStore) -> SymbolId {
        store
            .symbols()
            .named("title")
            .find(|s| s.kind == SymbolKind::Field)
            .unwrap()
            .symbol_id
    }

    mod index_tests {
        use super::*;

        #[test]
        fn template_bindings_resolve_to_owner_fields() {
            let store = indexed(false);
            let refs = store.references_of(field(&store));
            let sites: Vec<(&str, Span)> = refs
                .iter()
                .map(|r| (store.file_path(r.file_id).unwrap(), r.span))
                .collect();
            assert_eq!(
                sites,
                vec![(TEMPLATE, Span::new(7, 12)), (LOGIC, Span::new(75, 80))]
            );
        }

        #[test]
        fn field_text_search_stays_with_its_component() {
            let mut store = indexed(false);
            let mut other = FileAnalysis::default();
            other.regions.push(RegionData::comment(
                Span::new(0, 25),
                " AppComponent shows title",
            ));
            store
                .index_file("src/other.component.ts", FileKind::Logic, "o", &other)
                .unwrap();

            let textual: Vec<&str> = store
                .references_of(field(&store))
                .iter()
                .filter(|r| r.kind == ReferenceKind::Textual)
                .map(|r| store.file_path(r.file_id).unwrap())
                .collect();
            assert!(textual.is_empty(), "unexpected text hits: {:?}", textual);

            let component = store.symbols().named("AppComponent").next().unwrap().symbol_id;
            let other_id = store.file_id("src/other.component.ts").unwrap();
            assert!(store
                .references_of(component)
                .iter()
                .any(|r| r.file_id == other_id && r.kind == ReferenceKind::Textual));
        }

        #[test]
        fn resolution_does_not_depend_on_index_order() {
            let a = indexed(false);
            let b = indexed(true);
            assert_eq!(
                a.references_of(field(&a)).len(),
                b.references_of(field(&b)).len()
            );
        }

        #[test]
        fn local_shadows_field_inside_its_scope() {
            let store = indexed(false);
            let local = store
                .symbols()
                .named("title")
                .find(|s| s.kind == SymbolKind::TemplateLocal)
                .unwrap()
                .symbol_id;
            let spans: Vec<Span> = store.references_of(local).iter().map(|r| r.span).collect();
            assert_eq!(spans, vec![Span::new(66, 71), Span::new(80, 85)]);
        }

        #[test]
        fn index_file_is_idempotent() {
            let mut store = indexed(false);
            let before_ids: Vec<SymbolId> = store.symbols().iter().map(|s| s.symbol_id).collect();
            let before_refs = store.references_of(field(&store));

            store
                .index_file(LOGIC, FileKind::Logic, "l", &logic_analysis())
                .unwrap();

            let after_ids: Vec<SymbolId> = store.symbols().iter().map(|s| s.symbol_id).collect();
            assert_eq!(before_ids, after_ids);
            assert_eq!(before_refs, store.references_of(field(&store)));
        }

        #[test]
        fn reindex_without_declaration_retires_it() {
            let mut store = indexed(false);
            let id = field(&store);
            let mut analysis = logic_analysis();
            analysis.declarations.truncate(1);
            store
                .index_file(LOGIC, FileKind::Logic, "l2", &analysis)
                .unwrap();
            assert!(store.symbol(id).is_none());
            assert!(store.references_of(id).is_empty());
        }

        #[test]
        fn remove_file_drops_declarations_and_references() {
            let mut store = indexed(false);
            assert!(store.remove_file(LOGIC));
            assert!(store.symbols().named("AppComponent").next().is_none());
            assert!(!store.remove_file(LOGIC));
        }

        #[test]
        fn textual_references_follow_the_current_name() {
            let store = indexed(false);
            let comp = store.symbols().named("AppComponent").next().unwrap().symbol_id;
            let refs = store.references_of(comp);
            assert_eq!(refs.len(), 2);
            assert_eq!(refs[0].kind, ReferenceKind::Textual);
            assert_eq!(refs[0].span, Span::new(1, 13));
            assert!(refs[1].declaration);
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn symbol_at_finds_declarations_and_usages() {
            let store = indexed(false);
            let id = field(&store);
            assert_eq!(store.symbol_at(LOGIC, 77).map(|s| s.symbol_id), Some(id));
            assert_eq!(store.symbol_at(TEMPLATE, 9).map(|s| s.symbol_id), Some(id));
            assert!(store.symbol_at(TEMPLATE, 30).is_none());
            assert!(store.symbol_at("missing.ts", 0).is_none());
        }

        #[test]
        fn links_targeting_matches_resource_urls() {
            let store = indexed(false);
            let hits = store.links_targeting(TEMPLATE);
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].file, LOGIC);
            assert_eq!(hits[0].link.specifier, "./app.component.html");
        }
    }

    mod maintenance_tests {
        use super::*;

        #[test]
        fn relocate_then_reindex_keeps_identity() {
            let mut store = indexed(false);
            let comp = store.symbols().named("AppComponent").next().unwrap().symbol_id;

            // The comment grows by 3 bytes before the class name.
            let edit = Edit::replace(LOGIC, Span::new(1, 13), "AppComponent", "ShellComponent1");
            let mut edit2 = edit.clone();
            edit2.span = Span::new(60, 72);
            edit2.new_text = "ShellComponent".to_string();
            store.relocate_declarations(LOGIC, &[&edit, &edit2]);

            let moved = store.symbol(comp).unwrap().decl_span;
            assert_eq!(moved, Span::new(63, 77));

            let mut analysis = logic_analysis();
            analysis.declarations[0] =
                DeclarationData::new(SymbolKind::Component, "ShellComponent", Span::new(63, 77))
                    .with_template_path(TEMPLATE);
            analysis.declarations[1].span = Span::new(80, 85);
            store
                .index_file(LOGIC, FileKind::Logic, "l3", &analysis)
                .unwrap();

            assert_eq!(store.symbol(comp).unwrap().name, "ShellComponent");
        }

        #[test]
        fn rename_file_retargets_templates_and_links() {
            let mut store = indexed(false);
            let id = field(&store);
            assert!(store.rename_file(TEMPLATE, "src/shell.component.html"));
            assert_eq!(store.links_targeting("src/shell.component.html").len(), 1);
            // Template bindings still resolve through the renamed owner link.
            assert_eq!(store.references_of(id).len(), 2);
            assert_eq!(store.file_id(TEMPLATE), None);
        }
    }
}
