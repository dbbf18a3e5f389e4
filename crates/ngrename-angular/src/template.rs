//! Template handler: Angular HTML templates.
//!
//! The parser produces a flat list of [`HtmlNode`]s. The indexer walks them
//! with an element stack, opening a scope for every element that carries a
//! structural directive (`*ngFor`, `*ngIf`, ...) or an `ng-template` with
//! `let-` attributes. Template locals are declared in the innermost scope;
//! expressions are scanned with [`crate::scan`] and every free identifier
//! becomes a `value` binding, every name after a single `|` a `pipe` binding.

use ngrename_core::adapter::{
    AnalysisError, BindingData, DeclarationData, FileAnalysis, FileHandler, RegionData,
};
use ngrename_core::facts::{FileKind, LiteralRole, Namespace, SymbolKind};
use ngrename_core::patch::Span;

use crate::scan::{tokenize_at, Token, TokenKind};

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is raw text.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Identifiers inside expressions that never refer to a component member.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "true", "false", "null", "undefined", "this", "typeof", "void", "in", "$event", "$any",
    "$implicit",
];

// ============================================================================
// HTML Parser
// ============================================================================

/// An attribute on a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlAttribute {
    pub name: String,
    pub name_span: Span,
    /// Value text and the span of the value body (without quotes).
    pub value: Option<(String, Span)>,
}

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Comment {
        inner: Span,
        text: String,
    },
    StartTag {
        name: String,
        span: Span,
        attrs: Vec<HtmlAttribute>,
        self_closing: bool,
    },
    EndTag {
        name: String,
        span: Span,
    },
    Text {
        span: Span,
        text: String,
    },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDocument {
    pub nodes: Vec<HtmlNode>,
    pub len: u64,
}

/// Parse a template into nodes.
pub fn parse_html(content: &str) -> Result<HtmlDocument, String> {
    let bytes = content.as_bytes();
    let mut nodes = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        if content[i..].starts_with("<!--") {
            let close = content[i + 4..]
                .find("-->")
                .ok_or_else(|| format!("unterminated comment at byte {}", i))?;
            let inner = Span::new((i + 4) as u64, (i + 4 + close) as u64);
            nodes.push(HtmlNode::Comment {
                inner,
                text: content[inner.range()].to_string(),
            });
            i += 4 + close + 3;
        } else if content[i..].starts_with("<!") || content[i..].starts_with("<?") {
            i = content[i..].find('>').map_or(bytes.len(), |p| i + p + 1);
        } else if content[i..].starts_with("</") {
            let name_start = i + 2;
            let name_end = scan_name(bytes, name_start);
            let close = content[name_end..]
                .find('>')
                .ok_or_else(|| format!("unterminated end tag at byte {}", i))?;
            let end = name_end + close + 1;
            nodes.push(HtmlNode::EndTag {
                name: content[name_start..name_end].to_ascii_lowercase(),
                span: Span::new(i as u64, end as u64),
            });
            i = end;
        } else if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
            let (node, end) = parse_start_tag(content, i)?;
            let raw = match &node {
                HtmlNode::StartTag {
                    name, self_closing, ..
                } if !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) => {
                    Some(format!("</{}", name))
                }
                _ => None,
            };
            nodes.push(node);
            i = end;
            if let Some(closing) = raw {
                // Skip raw text; the end tag is parsed normally.
                i = content[i..]
                    .to_ascii_lowercase()
                    .find(&closing)
                    .map_or(bytes.len(), |p| i + p);
            }
        } else {
            // The first character may be a lone `<` or a multi-byte character.
            let first = content[i..].chars().next().map_or(1, char::len_utf8);
            let end = content[i + first..]
                .find('<')
                .map_or(bytes.len(), |p| i + first + p);
            nodes.push(HtmlNode::Text {
                span: Span::new(i as u64, end as u64),
                text: content[i..end].to_string(),
            });
            i = end;
        }
    }

    Ok(HtmlDocument {
        nodes,
        len: bytes.len() as u64,
    })
}

/// End of a tag or attribute name starting at `from`.
fn scan_name(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'=' => break,
            b'/' if bytes.get(i + 1) == Some(&b'>') => break,
            _ => i += 1,
        }
    }
    i
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn parse_start_tag(content: &str, start: usize) -> Result<(HtmlNode, usize), String> {
    let bytes = content.as_bytes();
    let name_end = scan_name(bytes, start + 1);
    let name = content[start + 1..name_end].to_ascii_lowercase();
    let mut attrs = Vec::new();
    let mut i = name_end;

    loop {
        i = skip_whitespace(bytes, i);
        if i >= bytes.len() {
            return Err(format!("unterminated tag <{}> at byte {}", name, start));
        }
        if bytes[i] == b'>' {
            let node = HtmlNode::StartTag {
                name,
                span: Span::new(start as u64, (i + 1) as u64),
                attrs,
                self_closing: false,
            };
            return Ok((node, i + 1));
        }
        if content[i..].starts_with("/>") {
            let node = HtmlNode::StartTag {
                name,
                span: Span::new(start as u64, (i + 2) as u64),
                attrs,
                self_closing: true,
            };
            return Ok((node, i + 2));
        }

        let attr_start = i;
        let mut attr_end = scan_name(bytes, i);
        if attr_end == attr_start {
            // Stray character such as a lone `/` or `=`.
            attr_end += 1;
        }
        let attr_name = content[attr_start..attr_end].to_string();
        i = skip_whitespace(bytes, attr_end);

        let mut value = None;
        if i < bytes.len() && bytes[i] == b'=' {
            i = skip_whitespace(bytes, i + 1);
            match bytes.get(i) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let close = content[i + 1..]
                        .find(quote as char)
                        .ok_or_else(|| format!("unterminated attribute value at byte {}", i))?;
                    let body = Span::new((i + 1) as u64, (i + 1 + close) as u64);
                    value = Some((content[body.range()].to_string(), body));
                    i = i + 1 + close + 1;
                }
                Some(_) => {
                    let mut end = i;
                    while end < bytes.len() && !bytes[end].is_ascii_whitespace() && bytes[end] != b'>'
                    {
                        end += 1;
                    }
                    let body = Span::new(i as u64, end as u64);
                    value = Some((content[body.range()].to_string(), body));
                    i = end;
                }
                None => {}
            }
        }

        if !attr_name.is_empty() && attr_name != "/" && attr_name != "=" {
            attrs.push(HtmlAttribute {
                name: attr_name,
                name_span: Span::new(attr_start as u64, attr_end as u64),
                value,
            });
        }
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Handler for `.html` templates.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateHandler;

impl TemplateHandler {
    pub fn new() -> Self {
        TemplateHandler
    }
}

impl FileHandler for TemplateHandler {
    type Syntax = HtmlDocument;

    fn kind(&self) -> FileKind {
        FileKind::Template
    }

    fn parse(&self, path: &str, content: &str) -> Result<HtmlDocument, AnalysisError> {
        parse_html(content).map_err(|message| AnalysisError::Malformed {
            path: path.to_string(),
            message,
        })
    }

    fn index_references(&self, _path: &str, document: &HtmlDocument) -> FileAnalysis {
        TemplateIndexer::new(document.len).run(&document.nodes)
    }
}

// ============================================================================
// Indexer
// ============================================================================

#[derive(Debug)]
struct OpenElement {
    name: String,
    /// Scope opened by this element.
    scope: Option<usize>,
}

/// How an attribute is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeRole<'n> {
    /// `#name` / `ref-name`: the local name and its offset in the attribute name.
    Reference(&'n str, u64),
    /// `let-name` on `ng-template`.
    LetDeclaration(&'n str, u64),
    /// `*directive` microsyntax.
    Structural,
    /// `[prop]`, `(event)`, `[(model)]`, `bind-`, `on-`, `bindon-`.
    Binding,
    Plain,
}

fn attribute_role(name: &str) -> AttributeRole<'_> {
    if let Some(local) = name.strip_prefix('#') {
        AttributeRole::Reference(local, 1)
    } else if let Some(local) = name.strip_prefix("ref-") {
        AttributeRole::Reference(local, 4)
    } else if let Some(local) = name.strip_prefix("let-") {
        AttributeRole::LetDeclaration(local, 4)
    } else if name.starts_with('*') {
        AttributeRole::Structural
    } else if name.starts_with('[')
        || name.starts_with('(')
        || name.starts_with("bind-")
        || name.starts_with("on-")
        || name.starts_with("bindon-")
    {
        AttributeRole::Binding
    } else {
        AttributeRole::Plain
    }
}

struct TemplateIndexer {
    analysis: FileAnalysis,
    stack: Vec<OpenElement>,
    root: usize,
    len: u64,
}

impl TemplateIndexer {
    fn new(len: u64) -> Self {
        let mut analysis = FileAnalysis::default();
        let root = analysis.push_scope(Span::new(0, len), None);
        TemplateIndexer {
            analysis,
            stack: Vec::new(),
            root,
            len,
        }
    }

    fn current_scope(&self) -> usize {
        self.stack
            .iter()
            .rev()
            .find_map(|e| e.scope)
            .unwrap_or(self.root)
    }

    fn run(mut self, nodes: &[HtmlNode]) -> FileAnalysis {
        for node in nodes {
            match node {
                HtmlNode::Comment { inner, text } => {
                    self.analysis.regions.push(RegionData::comment(*inner, text));
                }
                HtmlNode::Text { span, text } => {
                    let scope = self.current_scope();
                    self.interpolations(text, span.start, scope);
                }
                HtmlNode::StartTag {
                    name,
                    span,
                    attrs,
                    self_closing,
                } => self.start_tag(name, *span, attrs, *self_closing),
                HtmlNode::EndTag { name, span } => self.end_tag(name, *span),
            }
        }

        // Unclosed elements extend to the end of the file.
        while let Some(open) = self.stack.pop() {
            if let Some(scope) = open.scope {
                let start = self.analysis.scopes[scope].span.start;
                self.analysis.scopes[scope].span = Span::new(start, self.len);
            }
        }
        self.analysis
    }

    fn start_tag(&mut self, name: &str, span: Span, attrs: &[HtmlAttribute], self_closing: bool) {
        let outer = self.current_scope();
        let opens_scope = attrs.iter().any(|a| {
            a.name.starts_with('*') || (name == "ng-template" && a.name.starts_with("let-"))
        });
        let scope = if opens_scope {
            Some(self.analysis.push_scope(span, Some(outer)))
        } else {
            None
        };
        let inner = scope.unwrap_or(outer);

        for attr in attrs {
            match attribute_role(&attr.name) {
                AttributeRole::Reference(local, offset) | AttributeRole::LetDeclaration(local, offset)
                    if !local.is_empty() =>
                {
                    let start = attr.name_span.start + offset;
                    self.analysis.push_declaration(
                        DeclarationData::new(
                            SymbolKind::TemplateLocal,
                            local,
                            Span::new(start, start + local.len() as u64),
                        )
                        .in_scope(Some(inner)),
                    );
                }
                AttributeRole::Structural => {
                    if let Some((value, body)) = &attr.value {
                        self.microsyntax(value, body.start, outer, inner);
                    }
                }
                AttributeRole::Binding => {
                    if let Some((value, body)) = &attr.value {
                        self.expression(value, body.start, inner);
                    }
                }
                AttributeRole::Plain => {
                    if let Some((value, body)) = &attr.value {
                        if value.contains("{{") {
                            self.interpolations(value, body.start, inner);
                        } else if !value.is_empty() {
                            self.analysis.regions.push(RegionData::literal(
                                *body,
                                LiteralRole::Plain,
                                value,
                            ));
                        }
                    }
                }
                _ => {}
            }
        }

        let void = self_closing || VOID_ELEMENTS.contains(&name);
        if !void {
            self.stack.push(OpenElement {
                name: name.to_string(),
                scope,
            });
        }
    }

    fn end_tag(&mut self, name: &str, span: Span) {
        let Some(pos) = self.stack.iter().rposition(|e| e.name == name) else {
            return;
        };
        for open in self.stack.drain(pos..) {
            if let Some(scope) = open.scope {
                let start = self.analysis.scopes[scope].span.start;
                self.analysis.scopes[scope].span = Span::new(start, span.end);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    /// Scan every `{{ ... }}` in `text`, which starts at byte `base`.
    fn interpolations(&mut self, text: &str, base: u64, scope: usize) {
        let mut from = 0usize;
        while let Some(open) = text[from..].find("{{") {
            let body = from + open + 2;
            let Some(close) = text[body..].find("}}") else {
                break;
            };
            self.expression(&text[body..body + close], base + body as u64, scope);
            from = body + close + 2;
        }
    }

    /// Scan a binding expression.
    fn expression(&mut self, text: &str, base: u64, scope: usize) {
        // Malformed expressions are not indexed rather than failing the template.
        let Ok(tokens) = tokenize_at(text, base) else {
            return;
        };
        let mut braces = 0usize;
        for k in 0..tokens.len() {
            self.expression_token(&tokens, k, scope, &mut braces);
        }
    }

    fn expression_token(&mut self, tokens: &[Token], k: usize, scope: usize, braces: &mut usize) {
        let tok = &tokens[k];
        let prev = k.checked_sub(1).map(|p| &tokens[p]);
        match tok.kind {
            TokenKind::String | TokenKind::Template => {
                if !tok.inner.is_empty() {
                    self.analysis.regions.push(RegionData::literal(
                        tok.inner,
                        LiteralRole::Plain,
                        tok.inner_text(),
                    ));
                }
            }
            TokenKind::Punct if tok.text == "{" => *braces += 1,
            TokenKind::Punct if tok.text == "}" => *braces = braces.saturating_sub(1),
            TokenKind::Ident => {
                let after_dot = prev.is_some_and(|p| p.is_punct(".") || p.is_punct("?."));
                if after_dot {
                    // `this.x` reads a member like a bare `x`.
                    let this_member = k >= 2 && tokens[k - 2].is_ident("this");
                    if this_member {
                        self.bind(tok, Namespace::Value, scope);
                    }
                    return;
                }
                if prev.is_some_and(|p| p.is_punct("|")) {
                    self.bind(tok, Namespace::Pipe, scope);
                    return;
                }
                let object_key =
                    *braces > 0 && tokens.get(k + 1).is_some_and(|n| n.is_punct(":"));
                if object_key || EXPRESSION_KEYWORDS.contains(&tok.text.as_str()) {
                    return;
                }
                self.bind(tok, Namespace::Value, scope);
            }
            _ => {}
        }
    }

    fn bind(&mut self, tok: &Token, namespace: Namespace, scope: usize) {
        self.analysis
            .bindings
            .push(BindingData::new(&tok.text, tok.span, namespace).in_scope(Some(scope)));
    }

    /// Scan `*directive` microsyntax.
    ///
    /// `let x` and `as x` declare locals in `inner`; keys are skipped;
    /// expressions are evaluated in `outer`.
    fn microsyntax(&mut self, text: &str, base: u64, outer: usize, inner: usize) {
        let Ok(tokens) = tokenize_at(text, base) else {
            return;
        };
        let mut braces = 0usize;
        let mut key_position = false;
        let mut k = 0usize;

        while k < tokens.len() {
            let tok = &tokens[k];
            if tok.is_ident("let") || (tok.is_ident("as") && k > 0) {
                if let Some(name) = tokens.get(k + 1).filter(|t| t.kind == TokenKind::Ident) {
                    self.declare_local(name, inner);
                    k += 2;
                    // `let i = index`: the right side is a context key.
                    if tokens.get(k).is_some_and(|t| t.is_punct("=")) {
                        k += 2;
                    }
                    key_position = true;
                    continue;
                }
            }
            if tok.is_punct(";") || tok.is_punct(",") {
                key_position = true;
                k += 1;
                continue;
            }
            if key_position && tok.kind == TokenKind::Ident {
                key_position = false;
                k += 1;
                if tokens.get(k).is_some_and(|t| t.is_punct(":")) {
                    k += 1;
                }
                continue;
            }
            key_position = false;
            self.expression_token(&tokens, k, outer, &mut braces);
            k += 1;
        }
    }

    fn declare_local(&mut self, name: &Token, scope: usize) {
        self.analysis.push_declaration(
            DeclarationData::new(SymbolKind::TemplateLocal, &name.text, name.span)
                .in_scope(Some(scope)),
        );
    }
}

// ============================================================================
// Tests
// ============================================================================
