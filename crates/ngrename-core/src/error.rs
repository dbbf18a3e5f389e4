//! Error types and error code constants for ngrename.
//!
//! `RenameError` is the single error taxonomy surfaced by the rename
//! pipeline. Lower layers ([`crate::apply::ApplyError`],
//! [`crate::adapter::AnalysisError`], [`crate::workspace::WorkspaceError`])
//! bridge into it through `From` impls.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input, invalid identifier)
//! - `3`: Resolution errors (symbol not found, file not found)
//! - `4`: Apply errors (stale edit, overlapping edits, rename target exists)
//! - `5`: Rename refused (name collision, confirmation denied)
//! - `10`: Internal errors (bugs, unexpected state, I/O)

use std::fmt;

use thiserror::Error;

use crate::adapter::AnalysisError;
use crate::apply::ApplyError;
use crate::patch::Span;
use crate::workspace::WorkspaceError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    InvalidArguments = 2,
    ResolutionError = 3,
    ApplyError = 4,
    Refused = 5,
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Rename Error
// ============================================================================

/// Errors from validating, planning or applying a rename.
///
/// None of these leave partial state behind: the applier stages every edit
/// before it writes anything.
#[derive(Debug, Error)]
pub enum RenameError {
    /// The new name is not a legal identifier.
    #[error("invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// Another symbol in the same namespace already has the new name.
    #[error("'{name}' collides with existing {kind} declared in {file}")]
    NameCollision {
        name: String,
        kind: String,
        file: String,
    },

    /// File content changed between planning and apply.
    #[error("stale edit in {file}: {reason}")]
    StaleEdit { file: String, reason: String },

    /// Two planned edits touch the same bytes.
    #[error("overlapping edits in {file}: {first} and {second}")]
    OverlappingEdits {
        file: String,
        first: Span,
        second: Span,
    },

    /// The confirmation callback declined the rename.
    #[error("rename declined: {reason}")]
    ConfirmationDenied { reason: String },

    #[error("no symbol found at {target}")]
    SymbolNotFound { target: String },

    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// A file rename would overwrite an existing file.
    #[error("cannot rename to {path}: file already exists")]
    FileRenameConflict { path: String },

    /// A collaborator failed to analyze a file.
    #[error("analysis failed for {path}: {message}")]
    Analysis { path: String, message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl RenameError {
    pub fn internal(message: impl Into<String>) -> Self {
        RenameError::Internal {
            message: message.into(),
        }
    }

    /// Stable error code for output and exit status.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&RenameError> for OutputErrorCode {
    fn from(err: &RenameError) -> Self {
        match err {
            RenameError::InvalidIdentifier { .. } => OutputErrorCode::InvalidArguments,
            RenameError::NameCollision { .. } => OutputErrorCode::Refused,
            RenameError::StaleEdit { .. } => OutputErrorCode::ApplyError,
            RenameError::OverlappingEdits { .. } => OutputErrorCode::ApplyError,
            RenameError::ConfirmationDenied { .. } => OutputErrorCode::Refused,
            RenameError::SymbolNotFound { .. } => OutputErrorCode::ResolutionError,
            RenameError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            RenameError::FileRenameConflict { .. } => OutputErrorCode::ApplyError,
            RenameError::Analysis { .. } => OutputErrorCode::InternalError,
            RenameError::Io { .. } => OutputErrorCode::InternalError,
            RenameError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<ApplyError> for RenameError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::StaleEdit { file, reason } => RenameError::StaleEdit { file, reason },
            ApplyError::OverlappingEdits {
                file,
                first,
                second,
            } => RenameError::OverlappingEdits {
                file,
                first,
                second,
            },
            ApplyError::FileRenameConflict { path } => RenameError::FileRenameConflict { path },
        }
    }
}

impl From<AnalysisError> for RenameError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Malformed { path, message } => RenameError::Analysis { path, message },
            AnalysisError::Unsupported { path } => RenameError::Analysis {
                path,
                message: "unsupported file kind".to_string(),
            },
        }
    }
}

impl From<WorkspaceError> for RenameError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::RootNotFound { path } => RenameError::FileNotFound { path },
            other => RenameError::Io {
                message: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for RenameError {
    fn from(err: std::io::Error) -> Self {
        RenameError::Io {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
