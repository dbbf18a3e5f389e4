//! Text utilities: byte offset and line:column conversions, identifier
//! character classes, and word-boundary occurrence search.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Columns count bytes
//! - Byte offsets are **0-indexed**
//! - Line/column values of 0 are treated as 1

use crate::patch::Span;

// ============================================================================
// Position Conversions
// ============================================================================

/// Convert a byte offset to 1-indexed line and column.
///
/// If `offset` exceeds content length, returns position at end of content.
pub fn byte_offset_to_position(content: &[u8], offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let mut line = 1u32;
    let mut col = 1u32;

    for &byte in &content[..offset] {
        if byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Convert 1-indexed line and column to byte offset.
///
/// Columns past the end of the line clamp to the line end. A line past the
/// end of the content returns the content length.
pub fn position_to_byte_offset(content: &[u8], line: u32, col: u32) -> usize {
    let line = line.max(1);
    let col = col.max(1);

    let mut line_start = 0usize;
    let mut current_line = 1u32;
    while current_line < line {
        match content[line_start..].iter().position(|&b| b == b'\n') {
            Some(p) => {
                line_start += p + 1;
                current_line += 1;
            }
            None => return content.len(),
        }
    }

    let line_end = content[line_start..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| line_start + p)
        .unwrap_or(content.len());
    let offset_in_line = (col as usize).saturating_sub(1);
    line_start + offset_in_line.min(line_end - line_start)
}

/// Extract the text covered by `span`, if it lies on char boundaries inside `content`.
pub fn extract_span(content: &str, span: Span) -> Option<&str> {
    content.get(span.range())
}

// ============================================================================
// Identifier Characters
// ============================================================================

/// Characters that may start an identifier: letters, `$` and `_`.
pub fn is_identifier_start(ch: char) -> bool {
    ch == '$' || ch == '_' || ch.is_alphabetic()
}

/// Characters that may continue an identifier.
pub fn is_identifier_part(ch: char) -> bool {
    is_identifier_start(ch) || ch.is_alphanumeric()
}

// ============================================================================
// Word-Boundary Search
// ============================================================================

/// Find every occurrence of `word` in `text` that is not part of a longer identifier.
///
/// Returns byte offsets relative to `text`. Substring matches such as `foo`
/// inside `foobar` or `_foo` are skipped.
pub fn find_word_occurrences(text: &str, word: &str) -> Vec<usize> {
    let mut hits = Vec::new();
    if word.is_empty() {
        return hits;
    }

    let mut from = 0;
    while let Some(pos) = text[from..].find(word) {
        let start = from + pos;
        let end = start + word.len();

        let before_ok = text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !is_identifier_part(c));
        let after_ok = text[end..]
            .chars()
            .next()
            .map_or(true, |c| !is_identifier_part(c));

        if before_ok && after_ok {
            hits.push(start);
            from = end;
        } else {
            // Advance by one char to keep slicing on a boundary.
            from = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
    }

    hits
}

// ============================================================================
// Tests
// ============================================================================
