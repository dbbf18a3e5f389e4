//! JSON output types for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** every response starts with `status`
//! 2. **Deterministic:** same input, same bytes (plans are already sorted)
//! 3. **Absent means not applicable:** optional fields are skipped, not nulled

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use ngrename_angular::Decision;
use ngrename_core::error::RenameError;
use ngrename_core::facts::{Reference, ReferenceKind, RegionKind};
use ngrename_core::patch::{FileRename, OutputEdit, RenamePlan};
use ngrename_core::text::byte_offset_to_position;
use ngrename_core::types::{Location, SymbolInfo};

use crate::error::CliError;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Common Types
// ============================================================================

/// Reference information for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceInfo {
    pub location: Location,
    pub kind: ReferenceKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub declaration: bool,
    /// Comment or literal holding a textual occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionKind>,
}

impl ReferenceInfo {
    pub fn from_reference(reference: &Reference, file: &str, content: &str) -> Self {
        let (line, col) =
            byte_offset_to_position(content.as_bytes(), reference.span.start as usize);
        ReferenceInfo {
            location: Location::with_span(
                file,
                line,
                col,
                reference.span.start,
                reference.span.end,
            ),
            kind: reference.kind,
            declaration: reference.declaration,
            region: reference.region,
        }
    }
}

/// Edit statistics for a rename response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub files_changed: u32,
    pub edits_count: u32,
    pub renames_count: u32,
}

impl Summary {
    pub fn from_plan(plan: &RenamePlan) -> Self {
        Summary {
            files_changed: plan.edited_files().len() as u32,
            edits_count: plan.edits.len() as u32,
            renames_count: plan.file_renames.len() as u32,
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Response for `ngrename rename`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    /// The renamed symbol, as it was before the rename.
    pub symbol: SymbolInfo,
    pub new_name: String,
    pub decision: Decision,
    pub dry_run: bool,
    pub edits: Vec<OutputEdit>,
    pub file_renames: Vec<FileRename>,
    pub summary: Summary,
    /// Unified diff of the plan (dry runs only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unified_diff: Option<String>,
    /// Paths written to disk, after renames (applied runs only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_written: Option<Vec<String>>,
}

impl RenameResponse {
    pub fn new(
        symbol: SymbolInfo,
        decision: Decision,
        plan: &RenamePlan,
        edits: Vec<OutputEdit>,
    ) -> Self {
        RenameResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            symbol,
            new_name: plan.new_name.clone(),
            decision,
            dry_run: true,
            edits,
            file_renames: plan.file_renames.clone(),
            summary: Summary::from_plan(plan),
            unified_diff: None,
            files_written: None,
        }
    }

    pub fn with_diff(mut self, diff: String) -> Self {
        self.dry_run = true;
        self.unified_diff = Some(diff);
        self
    }

    pub fn with_files_written(mut self, files: Vec<String>) -> Self {
        self.dry_run = false;
        self.files_written = Some(files);
        self
    }
}

/// Response for `ngrename refs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefsResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    pub symbol: SymbolInfo,
    /// Ordered by file, then position.
    pub references: Vec<ReferenceInfo>,
}

impl RefsResponse {
    pub fn new(symbol: SymbolInfo, mut references: Vec<ReferenceInfo>) -> Self {
        references.sort_by(|a, b| a.location.cmp(&b.location));
        RefsResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            symbol,
            references,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code, also the exit status.
    pub code: u8,
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &CliError) -> Self {
        let details = match err {
            CliError::Rename(RenameError::NameCollision { name, kind, file }) => Some(
                serde_json::json!({ "name": name, "kind": kind, "file": file }),
            ),
            CliError::Rename(RenameError::FileNotFound { path })
            | CliError::Rename(RenameError::FileRenameConflict { path }) => {
                Some(serde_json::json!({ "path": path }))
            }
            CliError::Rename(RenameError::StaleEdit { file, .. })
            | CliError::Rename(RenameError::OverlappingEdits { file, .. }) => {
                Some(serde_json::json!({ "file": file }))
            }
            CliError::Rename(RenameError::SymbolNotFound { target }) => {
                Some(serde_json::json!({ "target": target }))
            }
            _ => None,
        };
        ErrorInfo {
            code: err.error_code().code(),
            message: err.to_string(),
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &CliError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Response Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
