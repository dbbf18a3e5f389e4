//! Common types shared between error and output modules.

use serde::{Deserialize, Serialize};

use crate::facts::Symbol;
use crate::text::byte_offset_to_position;

// ============================================================================
// Location Type
// ============================================================================

/// Location in a source file.
///
/// - `file`: Workspace-relative path
/// - `line`: 1-indexed line number
/// - `col`: 1-indexed column, UTF-8 bytes
/// - `byte_start` / `byte_end`: optional byte span, end exclusive
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    /// File path (workspace-relative).
    pub file: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, UTF-8 bytes).
    pub col: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_start: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_end: Option<u64>,
}

impl Location {
    /// Create a new location without byte offsets.
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col,
            byte_start: None,
            byte_end: None,
        }
    }

    /// Create a location with full byte span.
    pub fn with_span(
        file: impl Into<String>,
        line: u32,
        col: u32,
        byte_start: u64,
        byte_end: u64,
    ) -> Self {
        Location {
            file: file.into(),
            line,
            col,
            byte_start: Some(byte_start),
            byte_end: Some(byte_end),
        }
    }

    /// Parse a location from "path:line:col" format.
    ///
    /// Robust against paths containing colons (e.g., Windows paths).
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.rsplitn(3, ':').collect();
        if parts.len() != 3 {
            return None;
        }
        let col: u32 = parts[0].parse().ok()?;
        let line: u32 = parts[1].parse().ok()?;
        let file = parts[2].to_string();
        Some(Location::new(file, line, col))
    }

    fn sort_key(&self) -> (&str, u32, u32) {
        (&self.file, self.line, self.col)
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

// ============================================================================
// SymbolInfo Type
// ============================================================================

/// Symbol information for JSON output.
///
/// Named `SymbolInfo` to distinguish from `facts::Symbol` (internal table type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Symbol ID (stable while the symbol's declaration site survives).
    pub id: String,
    pub name: String,
    /// One of: component, field, template_local, pipe, module.
    pub kind: String,
    /// Declaration location.
    pub location: Location,
    /// Owning component for fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl SymbolInfo {
    /// Build output info for a symbol declared in `file` with the given content.
    pub fn from_symbol(symbol: &Symbol, file: &str, content: &str) -> Self {
        let (line, col) =
            byte_offset_to_position(content.as_bytes(), symbol.decl_span.start as usize);
        SymbolInfo {
            id: symbol.symbol_id.to_string(),
            name: symbol.name.clone(),
            kind: symbol.kind.as_str().to_string(),
            location: Location::with_span(
                file,
                line,
                col,
                symbol.decl_span.start,
                symbol.decl_span.end,
            ),
            container: symbol.container.map(|c| c.to_string()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
