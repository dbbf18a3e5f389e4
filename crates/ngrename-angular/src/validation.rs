//! TypeScript identifier validation.
//!
//! Provides validation for new names under the TypeScript identifier grammar.

use thiserror::Error;

use ngrename_core::text::{is_identifier_part, is_identifier_start};

/// Error for validation failures.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Not a legal TypeScript identifier.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

impl ValidationError {
    pub fn reason(&self) -> &str {
        match self {
            ValidationError::InvalidName { reason, .. } => reason,
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Reserved words that cannot be used as identifiers.
pub const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with",
    // strict mode
    "implements", "interface", "let", "package", "private", "protected", "public", "static",
    "yield",
];

/// Global bindings that a rename must never produce.
pub const NON_RENAMABLE_GLOBALS: &[&str] =
    &["undefined", "NaN", "Infinity", "globalThis", "arguments"];

/// Check if a name is a reserved word.
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Validate that a string is a legal TypeScript identifier.
///
/// Checks:
/// - Non-empty
/// - Starts with a letter, `_` or `$`
/// - Continues with letters, digits, `_` or `$`
/// - Not a reserved word or a built-in global
pub fn validate_identifier(name: &str) -> ValidationResult<()> {
    let invalid = |reason: String| ValidationError::InvalidName {
        name: name.to_string(),
        reason,
    };

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(invalid("name cannot be empty".to_string()));
    };
    if !is_identifier_start(first) {
        return Err(invalid(format!(
            "must start with a letter, '_' or '$', found '{}'",
            first
        )));
    }
    if let Some(ch) = chars.find(|ch| !is_identifier_part(*ch)) {
        return Err(invalid(format!("invalid character: '{}'", ch)));
    }

    if is_reserved_word(name) {
        return Err(invalid("cannot use a reserved word as identifier".to_string()));
    }
    if NON_RENAMABLE_GLOBALS.contains(&name) {
        return Err(invalid("cannot shadow a built-in global".to_string()));
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
