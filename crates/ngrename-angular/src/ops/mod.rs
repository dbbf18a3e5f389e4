//! Rename operations: validation and planning.
//!
//! Provides the options, policies and confirmation seam shared by
//! [`validate`] and [`plan`].

pub mod plan;
pub mod validate;

use std::fmt;

use serde::{Deserialize, Serialize};

use ngrename_core::error::RenameError;
use ngrename_core::facts::{FactsStore, LiteralRole, Reference, RegionKind, Symbol, SymbolId};
use ngrename_core::patch::FileRename;
use ngrename_core::workspace::WorkspaceBuffers;

use crate::naming::NamingPolicy;

pub use plan::plan_rename;
pub use validate::{validate_rename, Decision, RejectReason};

// ============================================================================
// Operation Context
// ============================================================================

/// Read-only view of everything validation and planning consult.
#[derive(Debug, Clone, Copy)]
pub struct RenameContext<'a> {
    pub facts: &'a FactsStore,
    pub buffers: &'a WorkspaceBuffers,
    pub policy: &'a NamingPolicy,
}

impl<'a> RenameContext<'a> {
    pub fn new(
        facts: &'a FactsStore,
        buffers: &'a WorkspaceBuffers,
        policy: &'a NamingPolicy,
    ) -> Self {
        RenameContext {
            facts,
            buffers,
            policy,
        }
    }

    /// Look up the rename target.
    pub fn symbol(&self, id: SymbolId) -> Result<&'a Symbol, RenameError> {
        self.facts.symbol(id).ok_or_else(|| RenameError::SymbolNotFound {
            target: id.to_string(),
        })
    }

    /// Path of the file declaring `symbol`.
    pub fn declaring_path(&self, symbol: &Symbol) -> Result<&'a str, RenameError> {
        self.facts
            .declaring_path(symbol)
            .ok_or_else(|| RenameError::internal(format!("{} has no declaring file", symbol.symbol_id)))
    }

    /// File moves implied by giving `symbol` the name `new_name`.
    pub fn derived_renames(
        &self,
        symbol: &Symbol,
        new_name: &str,
    ) -> Result<Vec<FileRename>, RenameError> {
        let decl_path = self.declaring_path(symbol)?;
        Ok(self.policy.derived_renames(
            symbol.kind,
            decl_path,
            &symbol.name,
            new_name,
            self.buffers.paths(),
        ))
    }
}

// ============================================================================
// Options
// ============================================================================

/// Which string literals a text search may rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralPolicy {
    /// Decorator metadata, such as a selector, of the renamed symbol itself.
    #[default]
    ReferenceBearing,
    /// Metadata plus plain literals that consist of exactly the old name.
    ExactMatch,
    /// Every word-boundary occurrence in any non-path literal.
    Any,
}

impl LiteralPolicy {
    /// Whether a textual reference may become an edit.
    ///
    /// Comment occurrences are always admitted; path literals never are.
    pub fn admits(&self, reference: &Reference) -> bool {
        match reference.region {
            Some(RegionKind::Comment) => true,
            Some(RegionKind::Literal { role }) => match role {
                LiteralRole::ModuleSpecifier | LiteralRole::ResourceUrl => false,
                LiteralRole::Metadata => true,
                LiteralRole::Plain => match self {
                    LiteralPolicy::ReferenceBearing => false,
                    LiteralPolicy::ExactMatch => reference.whole_region,
                    LiteralPolicy::Any => true,
                },
            },
            None => false,
        }
    }
}

/// Knobs for one rename request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOptions {
    pub search_comments_and_text: bool,
    pub literal_policy: LiteralPolicy,
}

impl Default for RenameOptions {
    fn default() -> Self {
        RenameOptions {
            search_comments_and_text: true,
            literal_policy: LiteralPolicy::default(),
        }
    }
}

impl RenameOptions {
    pub fn with_search(mut self, search_comments_and_text: bool) -> Self {
        self.search_comments_and_text = search_comments_and_text;
        self
    }

    pub fn with_literal_policy(mut self, literal_policy: LiteralPolicy) -> Self {
        self.literal_policy = literal_policy;
        self
    }
}

// ============================================================================
// Confirmation
// ============================================================================

/// Why a rename needs explicit confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum ConfirmationReason {
    /// Declaring and related files move.
    FileRename { renames: Vec<FileRename> },
    /// The new name is legal but breaks the naming convention.
    NamingConvention { violation: String },
}

impl fmt::Display for ConfirmationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationReason::FileRename { renames } => {
                write!(f, "renaming also moves {} file(s)", renames.len())?;
                for rename in renames {
                    write!(f, "\n  {}", rename)?;
                }
                Ok(())
            }
            ConfirmationReason::NamingConvention { violation } => {
                write!(f, "naming convention: {}", violation)
            }
        }
    }
}

/// Caller-supplied yes/no decision for renames that need confirmation.
pub trait ConfirmationHandler {
    fn confirm(&mut self, reason: &ConfirmationReason) -> bool;
}

impl<F> ConfirmationHandler for F
where
    F: FnMut(&ConfirmationReason) -> bool,
{
    fn confirm(&mut self, reason: &ConfirmationReason) -> bool {
        self(reason)
    }
}
