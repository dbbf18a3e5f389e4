//! Facts model: symbols, scopes, references and text regions.
//!
//! This module provides the semantic data model for ngrename:
//! - [`File`]: indexed files with their kind and content hash
//! - [`Symbol`]: renamable declarations (components, fields, template locals, pipes, modules)
//! - [`ScopeInfo`]: template scopes that bound the visibility of locals
//! - [`Reference`]: structural and textual usages of symbols
//!
//! Storage is split the way the rename pipeline consumes it:
//! - [`SymbolTable`] owns declarations and name resolution
//! - [`ReferenceIndex`] owns usage sites, text regions and file links
//! - [`FactsStore`] ties both to file paths and keeps them consistent on re-index
//!
//! # Resolution Namespaces
//!
//! | Namespace | Used by | Candidates |
//! |-----------|---------|------------|
//! | `value` | template expressions | scope-chain locals, owner fields, components/modules |
//! | `member` | `this.x` in a class body | fields of that class |
//! | `type` | class names in logic files | components and modules |
//! | `pipe` | `expr \| name` | pipes |
//! | `template_local` | `@ViewChild('ref')` | locals of the class's template |

mod references;
mod store;
mod symbols;

pub use references::{FileLink, ReferenceIndex, TextRegion};
pub use store::{FactsStore, LinkHit};
pub use symbols::{SymbolDecl, SymbolTable};

use serde::{Deserialize, Serialize};

use crate::patch::{ContentHash, Span};

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// Create a new symbol ID.
    pub fn new(id: u32) -> Self {
        SymbolId(id)
    }
}

impl std::fmt::Display for SymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sym_{}", self.0)
    }
}

/// Unique identifier for an indexed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    /// Create a new file ID.
    pub fn new(id: u32) -> Self {
        FileId(id)
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "file_{}", self.0)
    }
}

/// Unique identifier for a template scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// Create a new scope ID.
    pub fn new(id: u32) -> Self {
        ScopeId(id)
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope_{}", self.0)
    }
}

/// Unique identifier for a structural reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ReferenceId(pub u32);

impl ReferenceId {
    /// Create a new reference ID.
    pub fn new(id: u32) -> Self {
        ReferenceId(id)
    }
}

impl std::fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ref_{}", self.0)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Kind of renamable symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Component,
    /// Property or method of a component, visible to its template.
    Field,
    /// `#ref`, `let x` and `as x` variables in a template.
    TemplateLocal,
    Pipe,
    Module,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Component => "component",
            SymbolKind::Field => "field",
            SymbolKind::TemplateLocal => "template_local",
            SymbolKind::Pipe => "pipe",
            SymbolKind::Module => "module",
        }
    }

    /// Components, pipes and modules are visible across the whole project.
    pub fn is_project_wide(&self) -> bool {
        matches!(
            self,
            SymbolKind::Component | SymbolKind::Pipe | SymbolKind::Module
        )
    }

    /// Kinds whose declaring file is named `<stem>.<kind>.<ext>`.
    pub fn has_derived_file_name(&self) -> bool {
        self.is_project_wide()
    }
}

/// Kind of file a symbol or reference lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// TypeScript component/module/pipe source.
    Logic,
    /// HTML template.
    Template,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Logic => "logic",
            FileKind::Template => "template",
        }
    }
}

/// How a reference was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Identifier bound to the symbol by the resolver.
    Structural,
    /// Word-boundary occurrence of the name inside a comment or string literal.
    Textual,
}

/// What a string literal is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralRole {
    /// Ordinary string with no known meaning.
    Plain,
    /// Decorator metadata such as a component selector.
    Metadata,
    /// `from '...'` module specifier.
    ModuleSpecifier,
    /// `templateUrl` / `styleUrls` resource path.
    ResourceUrl,
}

impl LiteralRole {
    /// Path-valued literals are rewritten by file renames, never by text search.
    pub fn is_path(&self) -> bool {
        matches!(self, LiteralRole::ModuleSpecifier | LiteralRole::ResourceUrl)
    }
}

/// Kind of text region searched for textual references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum RegionKind {
    Comment,
    Literal { role: LiteralRole },
}

/// Lookup namespace for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Value,
    Member,
    Type,
    Pipe,
    TemplateLocal,
}

// ============================================================================
// Facts Tables
// ============================================================================

/// An indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub file_id: FileId,
    /// Workspace-relative path.
    pub path: String,
    pub kind: FileKind,
    /// SHA-256 hash of the content that was indexed.
    pub content_hash: ContentHash,
}

/// A renamable declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub symbol_id: SymbolId,
    pub kind: SymbolKind,
    /// Current declared name.
    pub name: String,
    /// File where this symbol is declared.
    pub decl_file_id: FileId,
    /// Byte span of the name at the declaration.
    pub decl_span: Span,
    pub file_kind: FileKind,
    /// Innermost scope for template locals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<ScopeId>,
    /// Owning component for fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<SymbolId>,
    /// Template file linked to a component (`templateUrl`), workspace-relative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<String>,
}

/// A lexical scope inside a template file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeInfo {
    pub scope_id: ScopeId,
    pub file_id: FileId,
    pub span: Span,
    pub parent: Option<ScopeId>,
}

/// A usage site of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub symbol_id: SymbolId,
    pub file_id: FileId,
    /// Byte span of the occurrence.
    pub span: Span,
    pub kind: ReferenceKind,
    /// Kind of the file containing the reference.
    pub file_kind: FileKind,
    /// True for the declaration site itself.
    pub declaration: bool,
    /// Region the occurrence was found in (textual references only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionKind>,
    /// True when a textual occurrence is the entire content of its region.
    #[serde(default)]
    pub whole_region: bool,
}

impl Reference {
    /// A structural reference.
    pub fn structural(
        symbol_id: SymbolId,
        file_id: FileId,
        span: Span,
        file_kind: FileKind,
    ) -> Self {
        Reference {
            symbol_id,
            file_id,
            span,
            kind: ReferenceKind::Structural,
            file_kind,
            declaration: false,
            region: None,
            whole_region: false,
        }
    }

    /// Mark as the declaration site.
    pub fn as_declaration(mut self) -> Self {
        self.declaration = true;
        self
    }

    pub fn is_structural(&self) -> bool {
        self.kind == ReferenceKind::Structural
    }
}

/// Lookup context for [`SymbolTable::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeContext {
    pub namespace: Namespace,
    /// Innermost scope at the lookup site.
    pub scope: Option<ScopeId>,
    /// Component owning the lookup site (class body or the component using the template).
    pub container: Option<SymbolId>,
    /// Template file whose locals a `template_local` lookup searches.
    pub template_file: Option<FileId>,
}

impl ScopeContext {
    /// Context with only a namespace.
    pub fn new(namespace: Namespace) -> Self {
        ScopeContext {
            namespace,
            scope: None,
            container: None,
            template_file: None,
        }
    }

    pub fn with_scope(mut self, scope: Option<ScopeId>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_container(mut self, container: Option<SymbolId>) -> Self {
        self.container = container;
        self
    }

    pub fn with_template_file(mut self, template_file: Option<FileId>) -> Self {
        self.template_file = template_file;
        self
    }
}
