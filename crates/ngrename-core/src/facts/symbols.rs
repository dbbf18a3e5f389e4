//! Symbol table: declarations, scopes and name resolution.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::{
    FileId, FileKind, Namespace, ScopeContext, ScopeId, ScopeInfo, Symbol, SymbolId, SymbolKind,
};
use crate::patch::Span;

/// Declaration identity: same file, same kind, same start offset.
type DeclSite = (FileId, SymbolKind, u64);

/// Input to [`SymbolTable::declare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDecl {
    pub kind: SymbolKind,
    pub name: String,
    pub decl_file_id: FileId,
    pub decl_span: Span,
    pub file_kind: FileKind,
    pub scope_id: Option<ScopeId>,
    pub container: Option<SymbolId>,
    pub template_path: Option<String>,
}

impl SymbolDecl {
    pub fn new(
        kind: SymbolKind,
        name: impl Into<String>,
        decl_file_id: FileId,
        decl_span: Span,
        file_kind: FileKind,
    ) -> Self {
        SymbolDecl {
            kind,
            name: name.into(),
            decl_file_id,
            decl_span,
            file_kind,
            scope_id: None,
            container: None,
            template_path: None,
        }
    }

    pub fn with_scope(mut self, scope_id: ScopeId) -> Self {
        self.scope_id = Some(scope_id);
        self
    }

    pub fn with_container(mut self, container: SymbolId) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_template_path(mut self, path: impl Into<String>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    fn site(&self) -> DeclSite {
        (self.decl_file_id, self.kind, self.decl_span.start)
    }
}

/// Declared symbols and template scopes.
///
/// Symbols keep their identity while their declaration site (file, kind,
/// start offset) stays the same. Two declarations with the same name in
/// different files are always distinct symbols.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: BTreeMap<SymbolId, Symbol>,
    by_site: HashMap<DeclSite, SymbolId>,
    by_name: HashMap<String, BTreeSet<SymbolId>>,
    by_file: HashMap<FileId, BTreeSet<SymbolId>>,
    scopes: BTreeMap<ScopeId, ScopeInfo>,
    next_symbol_id: u32,
    next_scope_id: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }

    /// All symbols in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Symbols currently named `name`, in ID order.
    pub fn named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.symbols.get(id))
    }

    /// Symbols declared in a file, in ID order.
    pub fn in_file(&self, file_id: FileId) -> Vec<&Symbol> {
        self.by_file
            .get(&file_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.symbols.get(id))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Declaration
    // ------------------------------------------------------------------------

    /// Declare a symbol, returning its identity.
    ///
    /// Re-declaring at an existing site updates that symbol in place.
    pub fn declare(&mut self, decl: SymbolDecl) -> SymbolId {
        if let Some(&id) = self.by_site.get(&decl.site()) {
            if let Some(existing) = self.symbols.get(&id) {
                if existing.name != decl.name {
                    let old = existing.name.clone();
                    self.unlink_name(&old, id);
                    self.by_name.entry(decl.name.clone()).or_default().insert(id);
                }
            }
            if let Some(symbol) = self.symbols.get_mut(&id) {
                symbol.name = decl.name;
                symbol.decl_span = decl.decl_span;
                symbol.file_kind = decl.file_kind;
                symbol.scope_id = decl.scope_id;
                symbol.container = decl.container;
                symbol.template_path = decl.template_path;
            }
            return id;
        }

        let id = SymbolId::new(self.next_symbol_id);
        self.next_symbol_id += 1;

        self.by_site.insert(decl.site(), id);
        self.by_name.entry(decl.name.clone()).or_default().insert(id);
        self.by_file.entry(decl.decl_file_id).or_default().insert(id);
        self.symbols.insert(
            id,
            Symbol {
                symbol_id: id,
                kind: decl.kind,
                name: decl.name,
                decl_file_id: decl.decl_file_id,
                decl_span: decl.decl_span,
                file_kind: decl.file_kind,
                scope_id: decl.scope_id,
                container: decl.container,
                template_path: decl.template_path,
            },
        );
        id
    }

    /// Find the symbol whose declaration name covers `offset` in `file_id`.
    ///
    /// The end of the name counts as inside, so a cursor right after the
    /// name still finds it.
    pub fn lookup_by_declaration_site(&self, file_id: FileId, offset: u64) -> Option<&Symbol> {
        self.in_file(file_id)
            .into_iter()
            .filter(|s| s.decl_span.touches(offset))
            .min_by_key(|s| s.decl_span.len())
    }

    /// Remove a symbol.
    pub fn retire(&mut self, id: SymbolId) -> Option<Symbol> {
        let symbol = self.symbols.remove(&id)?;
        self.by_site
            .remove(&(symbol.decl_file_id, symbol.kind, symbol.decl_span.start));
        self.unlink_name(&symbol.name, id);
        if let Some(ids) = self.by_file.get_mut(&symbol.decl_file_id) {
            ids.remove(&id);
        }
        Some(symbol)
    }

    /// Retire every symbol declared in `file_id` that is not in `keep`.
    pub fn retire_file_except(&mut self, file_id: FileId, keep: &HashSet<SymbolId>) -> Vec<SymbolId> {
        let stale: Vec<SymbolId> = self
            .by_file
            .get(&file_id)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| !keep.contains(id))
            .collect();
        for id in &stale {
            self.retire(*id);
        }
        stale
    }

    /// Change a symbol's name.
    pub fn rename(&mut self, id: SymbolId, new_name: &str) -> bool {
        let Some(old) = self.symbols.get(&id).map(|s| s.name.clone()) else {
            return false;
        };
        self.unlink_name(&old, id);
        self.by_name.entry(new_name.to_string()).or_default().insert(id);
        if let Some(symbol) = self.symbols.get_mut(&id) {
            symbol.name = new_name.to_string();
        }
        true
    }

    /// Move declaration spans, keeping identities.
    ///
    /// All old sites are released before any new site is claimed, so moves
    /// that swap positions within a file cannot clobber each other.
    pub fn relocate(&mut self, moves: &[(SymbolId, Span)]) {
        for (id, _) in moves {
            if let Some(symbol) = self.symbols.get(id) {
                self.by_site
                    .remove(&(symbol.decl_file_id, symbol.kind, symbol.decl_span.start));
            }
        }
        for (id, span) in moves {
            if let Some(symbol) = self.symbols.get_mut(id) {
                symbol.decl_span = *span;
                self.by_site
                    .insert((symbol.decl_file_id, symbol.kind, span.start), *id);
            }
        }
    }

    /// Point every component linked to `old_path` at `new_path`.
    pub fn retarget_template(&mut self, old_path: &str, new_path: &str) {
        for symbol in self.symbols.values_mut() {
            if symbol.template_path.as_deref() == Some(old_path) {
                symbol.template_path = Some(new_path.to_string());
            }
        }
    }

    fn unlink_name(&mut self, name: &str, id: SymbolId) {
        if let Some(ids) = self.by_name.get_mut(name) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_name.remove(name);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------------

    /// Register a scope and return its ID.
    pub fn add_scope(&mut self, file_id: FileId, span: Span, parent: Option<ScopeId>) -> ScopeId {
        let scope_id = ScopeId::new(self.next_scope_id);
        self.next_scope_id += 1;
        self.scopes.insert(
            scope_id,
            ScopeInfo {
                scope_id,
                file_id,
                span,
                parent,
            },
        );
        scope_id
    }

    /// Drop every scope of a file.
    pub fn clear_scopes(&mut self, file_id: FileId) {
        self.scopes.retain(|_, scope| scope.file_id != file_id);
    }

    pub fn scope(&self, id: ScopeId) -> Option<&ScopeInfo> {
        self.scopes.get(&id)
    }

    /// Scope IDs from `scope` outward to the file root.
    pub fn scope_chain(&self, scope: Option<ScopeId>) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = scope;
        while let Some(id) = current {
            // Parents are registered before children, so a cycle means corrupt input.
            if chain.contains(&id) {
                break;
            }
            chain.push(id);
            current = self.scopes.get(&id).and_then(|s| s.parent);
        }
        chain
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// The component whose `templateUrl` points at `template_path`.
    pub fn component_for_template(&self, template_path: &str) -> Option<&Symbol> {
        self.symbols.values().find(|s| {
            s.kind == SymbolKind::Component && s.template_path.as_deref() == Some(template_path)
        })
    }

    /// Resolve `name` in the given context.
    ///
    /// Ties between project-wide symbols go to the lowest ID.
    pub fn resolve(&self, name: &str, ctx: &ScopeContext) -> Option<&Symbol> {
        match ctx.namespace {
            Namespace::Value => {
                for scope in self.scope_chain(ctx.scope) {
                    let local = self.named(name).find(|s| {
                        s.kind == SymbolKind::TemplateLocal && s.scope_id == Some(scope)
                    });
                    if local.is_some() {
                        return local;
                    }
                }
                if let Some(field) = self.field_of(name, ctx.container) {
                    return Some(field);
                }
                self.named(name)
                    .find(|s| matches!(s.kind, SymbolKind::Component | SymbolKind::Module))
            }
            Namespace::Member => self.field_of(name, ctx.container),
            Namespace::Type => self
                .named(name)
                .find(|s| matches!(s.kind, SymbolKind::Component | SymbolKind::Module)),
            Namespace::Pipe => self.named(name).find(|s| s.kind == SymbolKind::Pipe),
            Namespace::TemplateLocal => {
                let template = ctx.template_file?;
                self.named(name).find(|s| {
                    s.kind == SymbolKind::TemplateLocal && s.decl_file_id == template
                })
            }
        }
    }

    fn field_of(&self, name: &str, container: Option<SymbolId>) -> Option<&Symbol> {
        let container = container?;
        self.named(name)
            .find(|s| s.kind == SymbolKind::Field && s.container == Some(container))
    }
}

// ============================================================================
// Tests
// ============================================================================
