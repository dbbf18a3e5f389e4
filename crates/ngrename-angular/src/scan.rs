//! Token scanner for TypeScript sources and template expressions.
//!
//! Produces identifier, string, template-literal, comment and punctuator
//! tokens with their byte spans. No expression grammar is built here.

use thiserror::Error;

use ngrename_core::patch::Span;
use ngrename_core::text::{is_identifier_part, is_identifier_start};

/// Scanner failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unterminated string literal at byte {offset}")]
    UnterminatedString { offset: u64 },

    #[error("unterminated template literal at byte {offset}")]
    UnterminatedTemplate { offset: u64 },

    #[error("unterminated block comment at byte {offset}")]
    UnterminatedComment { offset: u64 },
}

/// Token category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    /// `'...'` or `"..."`.
    String,
    /// One literal chunk of a template string: between a backtick or `}` and
    /// the next backtick or `${`.
    Template,
    LineComment,
    BlockComment,
    Regex,
    Number,
    Punct,
}

/// A scanned token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the whole token.
    pub text: String,
    /// Absolute span of the whole token.
    pub span: Span,
    /// Absolute span of the body: without quotes, backticks or comment markers.
    pub inner: Span,
    /// True when a line break separates this token from the previous one.
    pub newline_before: bool,
}

impl Token {
    /// The body text (see [`Token::inner`]).
    pub fn inner_text(&self) -> &str {
        let from = (self.inner.start - self.span.start) as usize;
        let to = (self.inner.end - self.span.start) as usize;
        &self.text[from..to]
    }

    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, TokenKind::String | TokenKind::Template)
    }
}

/// Multi-character punctuators the handlers care about. Longest first.
const MULTI_PUNCT: &[&str] = &["...", "?.", "=>", "||", "&&", "??"];

/// Keywords after which a `/` starts a regular expression.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Scan `content`; spans are relative to the start of `content`.
pub fn tokenize(content: &str) -> Result<Vec<Token>, ScanError> {
    tokenize_at(content, 0)
}

/// Scan `content` as if it started at byte `base` of a larger file.
pub fn tokenize_at(content: &str, base: u64) -> Result<Vec<Token>, ScanError> {
    Scanner::new(content, base).run()
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    base: u64,
    pos: usize,
    tokens: Vec<Token>,
    newline: bool,
    /// Brace depth inside each open `${` substitution.
    templates: Vec<u32>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str, base: u64) -> Self {
        Scanner {
            src,
            bytes: src.as_bytes(),
            base,
            pos: 0,
            tokens: Vec::new(),
            newline: false,
            templates: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ScanError> {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            match b {
                b'\n' => {
                    self.newline = true;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => self.line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.block_comment()?,
                b'/' if self.regex_allowed() => self.regex(),
                b'\'' | b'"' => self.string(b)?,
                b'`' => {
                    let start = self.pos;
                    self.pos += 1;
                    self.template_chunk(start)?;
                }
                b'{' => {
                    if let Some(depth) = self.templates.last_mut() {
                        *depth += 1;
                    }
                    self.punct(1);
                }
                b'}' => {
                    if self.templates.last() == Some(&0) {
                        // End of a `${...}` substitution: resume the template.
                        self.templates.pop();
                        let start = self.pos;
                        self.pos += 1;
                        self.template_chunk(start)?;
                    } else {
                        if let Some(depth) = self.templates.last_mut() {
                            *depth -= 1;
                        }
                        self.punct(1);
                    }
                }
                b'0'..=b'9' => self.number(),
                _ => {
                    let ch = self.src[self.pos..].chars().next().unwrap_or('\0');
                    if is_identifier_start(ch) {
                        self.ident();
                    } else if ch.is_whitespace() {
                        self.pos += ch.len_utf8();
                    } else {
                        let len = MULTI_PUNCT
                            .iter()
                            .find(|p| self.src[self.pos..].starts_with(**p))
                            .map_or(ch.len_utf8(), |p| p.len());
                        self.punct(len);
                    }
                }
            }
        }
        Ok(self.tokens)
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize, inner: (usize, usize)) {
        // Comments do not consume the line break seen before them.
        let newline_before = match kind {
            TokenKind::LineComment | TokenKind::BlockComment => self.newline,
            _ => std::mem::take(&mut self.newline),
        };
        self.tokens.push(Token {
            kind,
            text: self.src[start..end].to_string(),
            span: Span::new(self.base + start as u64, self.base + end as u64),
            inner: Span::new(self.base + inner.0 as u64, self.base + inner.1 as u64),
            newline_before,
        });
    }

    fn punct(&mut self, len: usize) {
        let start = self.pos;
        self.pos += len;
        self.push(TokenKind::Punct, start, self.pos, (start, self.pos));
    }

    fn ident(&mut self) {
        let start = self.pos;
        for ch in self.src[start..].chars() {
            if !is_identifier_part(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        self.push(TokenKind::Ident, start, self.pos, (start, self.pos));
    }

    fn number(&mut self) {
        let start = self.pos;
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_alphanumeric()
                || self.bytes[self.pos] == b'.'
                || self.bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        self.push(TokenKind::Number, start, self.pos, (start, self.pos));
    }

    fn line_comment(&mut self) {
        let start = self.pos;
        let end = self.src[start..]
            .find('\n')
            .map_or(self.bytes.len(), |i| start + i);
        self.pos = end;
        self.push(TokenKind::LineComment, start, end, (start + 2, end));
    }

    fn block_comment(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        let close = self.src[start + 2..]
            .find("*/")
            .ok_or(ScanError::UnterminatedComment {
                offset: self.base + start as u64,
            })?;
        let end = start + 2 + close + 2;
        self.pos = end;
        self.push(TokenKind::BlockComment, start, end, (start + 2, end - 2));
        Ok(())
    }

    fn string(&mut self, quote: u8) -> Result<(), ScanError> {
        let start = self.pos;
        let mut i = start + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'\n' => break,
                b if b == quote => {
                    self.pos = i + 1;
                    self.push(TokenKind::String, start, i + 1, (start + 1, i));
                    return Ok(());
                }
                _ => i += 1,
            }
        }
        Err(ScanError::UnterminatedString {
            offset: self.base + start as u64,
        })
    }

    /// Scan from just after a backtick or `}` to the next backtick or `${`.
    fn template_chunk(&mut self, start: usize) -> Result<(), ScanError> {
        let body = self.pos;
        let mut i = body;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'`' => {
                    self.pos = i + 1;
                    self.push(TokenKind::Template, start, i + 1, (body, i));
                    return Ok(());
                }
                b'$' if self.bytes.get(i + 1) == Some(&b'{') => {
                    self.pos = i + 2;
                    self.push(TokenKind::Template, start, i + 2, (body, i));
                    self.templates.push(0);
                    return Ok(());
                }
                _ => i += 1,
            }
        }
        Err(ScanError::UnterminatedTemplate {
            offset: self.base + start as u64,
        })
    }

    /// A `/` starts a regex unless it follows an operand.
    fn regex_allowed(&self) -> bool {
        match self.tokens.iter().rev().find(|t| !t.is_comment()) {
            None => true,
            Some(t) => match t.kind {
                TokenKind::Ident => REGEX_PREFIX_KEYWORDS.contains(&t.text.as_str()),
                TokenKind::Punct => !matches!(t.text.as_str(), ")" | "]" | "}"),
                _ => false,
            },
        }
    }

    fn regex(&mut self) {
        let start = self.pos;
        let mut i = start + 1;
        let mut in_class = false;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 1,
                b'[' => in_class = true,
                b']' => in_class = false,
                b'/' if !in_class => break,
                b'\n' => break,
                _ => {}
            }
            i += 1;
        }
        let body_end = i.min(self.bytes.len());
        i = (i + 1).min(self.bytes.len());
        while i < self.bytes.len() && self.bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        self.pos = i;
        self.push(TokenKind::Regex, start, i, (start + 1, body_end));
    }
}

// ============================================================================
// Tests
// ============================================================================
