//! File handler trait and intermediate analysis data types.
//!
//! A [`FileHandler`] turns the content of one file into a [`FileAnalysis`]:
//! declarations, scopes, identifier bindings, searchable text regions and
//! path links. The [`crate::facts::FactsStore`] consumes analyses and owns
//! every ID.
//!
//! # ID Ownership
//!
//! - **Handlers do NOT allocate IDs** (FileId, SymbolId, ScopeId)
//! - Handlers use local indices (`usize`) for cross-references within a file:
//!   - `scope`: index into `FileAnalysis.scopes`
//!   - `container`, `owner`: index into `FileAnalysis.declarations`
//! - Parents and containers must appear before the entries that point at them
//!
//! # Bindings
//!
//! Handlers do not resolve names. Each [`BindingData`] records an identifier,
//! the namespace it is looked up in and its lexical context. The store
//! resolves bindings against the whole project after every re-index, so a
//! binding indexed before its declaration still resolves once the declaring
//! file arrives.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::facts::{FileKind, LiteralRole, Namespace, RegionKind, SymbolKind};
use crate::patch::Span;

/// Errors reported by a file handler.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{path}: {message}")]
    Malformed { path: String, message: String },

    #[error("{path}: unsupported file kind")]
    Unsupported { path: String },
}

// ============================================================================
// Analysis Data
// ============================================================================

/// A scope inside a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeData {
    pub span: Span,
    /// Index of the parent scope in `FileAnalysis.scopes`.
    pub parent: Option<usize>,
}

/// A declaration found in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationData {
    pub kind: SymbolKind,
    pub name: String,
    /// Span of the declared name.
    pub span: Span,
    pub scope: Option<usize>,
    /// Index of the owning declaration (fields point at their component).
    pub container: Option<usize>,
    /// Workspace-relative template path for components.
    pub template_path: Option<String>,
}

impl DeclarationData {
    pub fn new(kind: SymbolKind, name: impl Into<String>, span: Span) -> Self {
        DeclarationData {
            kind,
            name: name.into(),
            span,
            scope: None,
            container: None,
            template_path: None,
        }
    }

    pub fn in_scope(mut self, scope: Option<usize>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_container(mut self, container: usize) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_template_path(mut self, path: impl Into<String>) -> Self {
        self.template_path = Some(path.into());
        self
    }
}

/// An identifier that refers to some declaration by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingData {
    pub name: String,
    pub span: Span,
    pub namespace: Namespace,
    pub scope: Option<usize>,
    /// Index of the enclosing class declaration.
    pub container: Option<usize>,
}

impl BindingData {
    pub fn new(name: impl Into<String>, span: Span, namespace: Namespace) -> Self {
        BindingData {
            name: name.into(),
            span,
            namespace,
            scope: None,
            container: None,
        }
    }

    pub fn in_scope(mut self, scope: Option<usize>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_container(mut self, container: Option<usize>) -> Self {
        self.container = container;
        self
    }
}

/// A comment or literal body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionData {
    pub span: Span,
    pub kind: RegionKind,
    pub text: String,
    /// Index of the declaration a metadata literal describes.
    #[serde(default)]
    pub owner: Option<usize>,
}

impl RegionData {
    pub fn comment(span: Span, text: impl Into<String>) -> Self {
        RegionData {
            span,
            kind: RegionKind::Comment,
            text: text.into(),
            owner: None,
        }
    }

    pub fn literal(span: Span, role: LiteralRole, text: impl Into<String>) -> Self {
        RegionData {
            span,
            kind: RegionKind::Literal { role },
            text: text.into(),
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: Option<usize>) -> Self {
        self.owner = owner;
        self
    }
}

/// A path literal naming another file, relative to the containing file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    /// Span of the literal body.
    pub span: Span,
    pub specifier: String,
    pub role: LiteralRole,
}

/// Everything a handler reports about one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub scopes: Vec<ScopeData>,
    pub declarations: Vec<DeclarationData>,
    pub bindings: Vec<BindingData>,
    pub regions: Vec<RegionData>,
    pub links: Vec<LinkData>,
}

impl FileAnalysis {
    /// Add a scope, returning its index.
    pub fn push_scope(&mut self, span: Span, parent: Option<usize>) -> usize {
        self.scopes.push(ScopeData { span, parent });
        self.scopes.len() - 1
    }

    /// Add a declaration, returning its index.
    pub fn push_declaration(&mut self, decl: DeclarationData) -> usize {
        self.declarations.push(decl);
        self.declarations.len() - 1
    }

    /// Check index invariants: parents and containers point backwards.
    pub fn check(&self, path: &str) -> Result<(), AnalysisError> {
        let malformed = |message: String| AnalysisError::Malformed {
            path: path.to_string(),
            message,
        };

        for (i, scope) in self.scopes.iter().enumerate() {
            if scope.parent.is_some_and(|p| p >= i) {
                return Err(malformed(format!("scope {} has a forward parent", i)));
            }
        }
        for (i, decl) in self.declarations.iter().enumerate() {
            if decl.scope.is_some_and(|s| s >= self.scopes.len()) {
                return Err(malformed(format!("declaration {} has an unknown scope", i)));
            }
            if decl.container.is_some_and(|c| c >= i) {
                return Err(malformed(format!("declaration {} has a forward container", i)));
            }
        }
        for (i, binding) in self.bindings.iter().enumerate() {
            if binding.scope.is_some_and(|s| s >= self.scopes.len()) {
                return Err(malformed(format!("binding {} has an unknown scope", i)));
            }
            if binding
                .container
                .is_some_and(|c| c >= self.declarations.len())
            {
                return Err(malformed(format!("binding {} has an unknown container", i)));
            }
        }
        for (i, region) in self.regions.iter().enumerate() {
            if region.owner.is_some_and(|o| o >= self.declarations.len()) {
                return Err(malformed(format!("region {} has an unknown owner", i)));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// Narrow per-file-kind capability: parse, then report references.
pub trait FileHandler {
    /// Parsed form of a file.
    type Syntax;

    /// The file kind this handler produces.
    fn kind(&self) -> FileKind;

    /// Parse file content.
    fn parse(&self, path: &str, content: &str) -> Result<Self::Syntax, AnalysisError>;

    /// Report declarations, bindings, regions and links for a parsed file.
    fn index_references(&self, path: &str, syntax: &Self::Syntax) -> FileAnalysis;

    /// Parse and index in one step.
    fn analyze(&self, path: &str, content: &str) -> Result<FileAnalysis, AnalysisError> {
        let syntax = self.parse(path, content)?;
        let analysis = self.index_references(path, &syntax);
        analysis.check(path)?;
        Ok(analysis)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_accepts_backward_indices() {
        let mut analysis = FileAnalysis::default();
        let root = analysis.push_scope(Span::new(0, 100), None);
        analysis.push_scope(Span::new(10, 20), Some(root));
        let comp = analysis.push_declaration(DeclarationData::new(
            SymbolKind::Component,
            "AppComponent",
            Span::new(0, 12),
        ));
        analysis.push_declaration(
            DeclarationData::new(SymbolKind::Field, "title", Span::new(30, 35))
                .with_container(comp),
        );
        assert!(analysis.check("app.component.ts").is_ok());
    }

    #[test]
    fn check_rejects_forward_container() {
        let mut analysis = FileAnalysis::default();
        analysis.push_declaration(
            DeclarationData::new(SymbolKind::Field, "title", Span::new(30, 35)).with_container(0),
        );
        let err = analysis.check("app.component.ts").unwrap_err();
        assert!(err.to_string().contains("forward container"));
    }

    #[test]
    fn check_rejects_unknown_binding_scope() {
        let mut analysis = FileAnalysis::default();
        analysis
            .bindings
            .push(BindingData::new("x", Span::new(0, 1), Namespace::Value).in_scope(Some(3)));
        assert!(analysis.check("a.html").is_err());
    }

    #[test]
    fn check_rejects_unknown_region_owner() {
        let mut analysis = FileAnalysis::default();
        analysis.regions.push(
            RegionData::literal(Span::new(0, 3), LiteralRole::Metadata, "app").with_owner(Some(0)),
        );
        let err = analysis.check("a.component.ts").unwrap_err();
        assert!(err.to_string().contains("unknown owner"));
    }
}
