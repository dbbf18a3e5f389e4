//! Rename validation.
//!
//! Rules, first match wins:
//!
//! 1. Reject a name that is not a legal identifier.
//! 2. Reject a component/module/pipe name already taken in its namespace.
//! 3. Ask for confirmation when declaring files would move.
//! 4. Ask for confirmation when the name breaks the naming convention.
//! 5. Allow.

use serde::{Deserialize, Serialize};
use tracing::debug;

use ngrename_core::error::RenameError;
use ngrename_core::facts::{Symbol, SymbolId, SymbolKind};

use super::{ConfirmationReason, RenameContext};
use crate::validation::validate_identifier;

/// Outcome of validating a proposed name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum Decision {
    Allow,
    AllowWithConfirmation(ConfirmationReason),
    Reject(RejectReason),
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::AllowWithConfirmation(_) => "allow_with_confirmation",
            Decision::Reject(_) => "reject",
        }
    }
}

/// Why a rename is refused outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum RejectReason {
    InvalidIdentifier {
        name: String,
        reason: String,
    },
    NameCollision {
        name: String,
        kind: SymbolKind,
        file: String,
    },
}

impl From<RejectReason> for RenameError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::InvalidIdentifier { name, reason } => {
                RenameError::InvalidIdentifier { name, reason }
            }
            RejectReason::NameCollision { name, kind, file } => RenameError::NameCollision {
                name,
                kind: kind.as_str().to_string(),
                file,
            },
        }
    }
}

/// Validate renaming symbol `id` to `new_name`.
///
/// Fails only when the symbol is unknown; every verdict is a [`Decision`].
pub fn validate_rename(
    ctx: &RenameContext<'_>,
    id: SymbolId,
    new_name: &str,
) -> Result<Decision, RenameError> {
    let symbol = ctx.symbol(id)?;
    let decision = decide(ctx, symbol, new_name)?;
    debug!(
        symbol = %id,
        old_name = %symbol.name,
        new_name,
        decision = decision.as_str(),
        "validated rename"
    );
    Ok(decision)
}

fn decide(
    ctx: &RenameContext<'_>,
    symbol: &Symbol,
    new_name: &str,
) -> Result<Decision, RenameError> {
    if let Err(err) = validate_identifier(new_name) {
        return Ok(Decision::Reject(RejectReason::InvalidIdentifier {
            name: new_name.to_string(),
            reason: err.reason().to_string(),
        }));
    }
    if new_name == symbol.name {
        return Ok(Decision::Allow);
    }

    if let Some(existing) = colliding_symbol(ctx, symbol, new_name) {
        let file = ctx.declaring_path(existing)?.to_string();
        return Ok(Decision::Reject(RejectReason::NameCollision {
            name: new_name.to_string(),
            kind: existing.kind,
            file,
        }));
    }

    let renames = ctx.derived_renames(symbol, new_name)?;
    if !renames.is_empty() {
        return Ok(Decision::AllowWithConfirmation(
            ConfirmationReason::FileRename { renames },
        ));
    }

    if let Some(violation) = ctx.policy.convention_violation(symbol.kind, new_name) {
        return Ok(Decision::AllowWithConfirmation(
            ConfirmationReason::NamingConvention { violation },
        ));
    }

    Ok(Decision::Allow)
}

/// A distinct project-wide symbol that already owns `new_name`.
///
/// Components and modules share the class namespace; pipes have their own.
fn colliding_symbol<'a>(
    ctx: &RenameContext<'a>,
    symbol: &Symbol,
    new_name: &str,
) -> Option<&'a Symbol> {
    let same_namespace = |kind: SymbolKind| match symbol.kind {
        SymbolKind::Component | SymbolKind::Module => {
            matches!(kind, SymbolKind::Component | SymbolKind::Module)
        }
        SymbolKind::Pipe => kind == SymbolKind::Pipe,
        SymbolKind::Field | SymbolKind::TemplateLocal => false,
    };
    ctx.facts
        .symbols()
        .named(new_name)
        .find(|other| other.symbol_id != symbol.symbol_id && same_namespace(other.kind))
}

// ============================================================================
// Tests
// ============================================================================
