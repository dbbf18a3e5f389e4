//! Logic-file handler: Angular TypeScript sources.
//!
//! Works on the token stream from [`crate::scan`]. Recognised shapes:
//!
//! - `@Component({...})`, `@NgModule({...})` and `@Pipe({ name: 'x' })`
//! - decorated `class` declarations and their members
//! - constructor parameter properties
//! - `this.member` accesses
//! - `@ViewChild('ref')` and friends, naming template reference variables
//! - `import ... from './x'` specifiers and `templateUrl`/`styleUrls` paths
//!
//! Every other identifier is reported as a `type` binding, which only ever
//! resolves to a component or module.

use ngrename_core::adapter::{
    AnalysisError, BindingData, DeclarationData, FileAnalysis, FileHandler, LinkData, RegionData,
};
use ngrename_core::facts::{FileKind, LiteralRole, Namespace, SymbolKind};
use ngrename_core::patch::Span;
use ngrename_core::workspace::resolve_relative_path;

use crate::scan::{tokenize, Token, TokenKind};

/// Member modifiers skipped before a member name.
const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "readonly", "static", "abstract", "override", "declare",
    "async", "accessor",
];

/// Constructor parameter modifiers that turn a parameter into a property.
const PARAMETER_PROPERTY_MODIFIERS: &[&str] =
    &["public", "private", "protected", "readonly", "override"];

/// Keywords never reported as bindings.
const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "case", "catch", "const", "continue", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "implements", "in", "instanceof", "interface", "let", "new", "null", "of", "return",
    "super", "switch", "throw", "true", "try", "type", "typeof", "undefined", "var", "void",
    "while", "yield",
];

/// Decorators whose first argument names template reference variables.
const QUERY_DECORATORS: &[&str] = &["ViewChild", "ViewChildren", "ContentChild", "ContentChildren"];

/// Handler for `.ts` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogicHandler;

impl LogicHandler {
    pub fn new() -> Self {
        LogicHandler
    }
}

impl FileHandler for LogicHandler {
    type Syntax = Vec<Token>;

    fn kind(&self) -> FileKind {
        FileKind::Logic
    }

    fn parse(&self, path: &str, content: &str) -> Result<Vec<Token>, AnalysisError> {
        tokenize(content).map_err(|e| AnalysisError::Malformed {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    fn index_references(&self, path: &str, tokens: &Vec<Token>) -> FileAnalysis {
        LogicIndexer::new(path, tokens).run()
    }
}

// ============================================================================
// Indexer
// ============================================================================

/// Decorator seen before a `class` keyword.
#[derive(Debug, Clone)]
struct ClassDecorator {
    kind: SymbolKind,
    template_path: Option<String>,
    /// Regions holding this decorator's metadata literals.
    metadata: Vec<usize>,
}

/// Which decorator's arguments are being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoratorArgs {
    Component,
    NgModule,
    Pipe,
    Other,
}

#[derive(Debug)]
struct ClassFrame {
    /// Declaration index when the class is a component or module.
    decl: Option<usize>,
    kind: Option<SymbolKind>,
    body_depth: usize,
    group_base: usize,
    expect_member: bool,
}

struct LogicIndexer<'a> {
    path: &'a str,
    code: Vec<&'a Token>,
    analysis: FileAnalysis,
    classes: Vec<ClassFrame>,
    pending_decorator: Option<ClassDecorator>,
    /// Metadata regions read from the decorator currently being walked.
    pending_metadata: Vec<usize>,
    /// A class header was read; its body opens at the next `{`.
    pending_class: Option<(Option<usize>, Option<SymbolKind>)>,
    brace_depth: usize,
    group_depth: usize,
}

impl<'a> LogicIndexer<'a> {
    fn new(path: &'a str, tokens: &'a [Token]) -> Self {
        let mut analysis = FileAnalysis::default();
        for token in tokens.iter().filter(|t| t.is_comment()) {
            analysis
                .regions
                .push(RegionData::comment(token.inner, token.inner_text()));
        }
        LogicIndexer {
            path,
            code: tokens.iter().filter(|t| !t.is_comment()).collect(),
            analysis,
            classes: Vec::new(),
            pending_decorator: None,
            pending_metadata: Vec::new(),
            pending_class: None,
            brace_depth: 0,
            group_depth: 0,
        }
    }

    fn run(mut self) -> FileAnalysis {
        let mut i = 0;
        while i < self.code.len() {
            i = self.step(i);
        }
        self.analysis
    }

    fn tok(&self, i: usize) -> Option<&'a Token> {
        self.code.get(i).copied()
    }

    fn prev_is_dot(&self, i: usize) -> bool {
        i > 0 && (self.code[i - 1].is_punct(".") || self.code[i - 1].is_punct("?."))
    }

    /// Declaration index of the innermost class, if it is a component or module.
    fn current_class(&self) -> Option<usize> {
        self.classes.last().and_then(|c| c.decl)
    }

    fn step(&mut self, i: usize) -> usize {
        if self.at_member_start(i) {
            if let Some(next) = self.member(i) {
                return next;
            }
        }

        let tok = self.code[i];
        match tok.kind {
            TokenKind::Punct => self.punct(i),
            TokenKind::Ident => self.ident(i),
            TokenKind::String | TokenKind::Template => {
                self.plain_literal(tok);
                i + 1
            }
            _ => i + 1,
        }
    }

    // ------------------------------------------------------------------------
    // Punctuation and nesting
    // ------------------------------------------------------------------------

    fn punct(&mut self, i: usize) -> usize {
        let tok = self.code[i];
        match tok.text.as_str() {
            "@" => return self.decorator(i),
            "{" => {
                self.brace_depth += 1;
                if let Some((decl, kind)) = self.pending_class.take() {
                    self.classes.push(ClassFrame {
                        decl,
                        kind,
                        body_depth: self.brace_depth,
                        group_base: self.group_depth,
                        expect_member: true,
                    });
                }
            }
            "}" => {
                self.brace_depth = self.brace_depth.saturating_sub(1);
                let depth = self.brace_depth;
                let group = self.group_depth;
                if self.classes.last().is_some_and(|c| depth < c.body_depth) {
                    self.classes.pop();
                } else if let Some(frame) = self.classes.last_mut() {
                    if depth == frame.body_depth && group == frame.group_base {
                        frame.expect_member = true;
                    }
                }
            }
            "(" | "[" => self.group_depth += 1,
            ")" | "]" => self.group_depth = self.group_depth.saturating_sub(1),
            ";" => {
                let depth = self.brace_depth;
                let group = self.group_depth;
                if let Some(frame) = self.classes.last_mut() {
                    if depth == frame.body_depth && group == frame.group_base {
                        frame.expect_member = true;
                    }
                }
            }
            _ => {}
        }
        i + 1
    }

    /// Index of the `)` matching the `(` at `open`, or the last token.
    fn matching_paren(&self, open: usize) -> usize {
        let mut depth = 0usize;
        for (k, tok) in self.code.iter().enumerate().skip(open) {
            if tok.is_punct("(") {
                depth += 1;
            } else if tok.is_punct(")") {
                depth -= 1;
                if depth == 0 {
                    return k;
                }
            }
        }
        self.code.len().saturating_sub(1)
    }

    // ------------------------------------------------------------------------
    // Identifiers
    // ------------------------------------------------------------------------

    fn ident(&mut self, i: usize) -> usize {
        let tok = self.code[i];
        if self.prev_is_dot(i) {
            return i + 1;
        }

        match tok.text.as_str() {
            "this" => {
                if let (Some(dot), Some(name)) = (self.tok(i + 1), self.tok(i + 2)) {
                    if (dot.is_punct(".") || dot.is_punct("?.")) && name.kind == TokenKind::Ident
                    {
                        self.analysis.bindings.push(
                            BindingData::new(&name.text, name.span, Namespace::Member)
                                .with_container(self.current_class()),
                        );
                        return i + 3;
                    }
                }
                i + 1
            }
            "class" => match self.tok(i + 1) {
                Some(name) if name.kind == TokenKind::Ident && name.text != "extends" => {
                    self.class_declaration(name);
                    i + 2
                }
                _ => {
                    // Anonymous class expression.
                    self.pending_decorator = None;
                    self.pending_class = Some((None, None));
                    i + 1
                }
            },
            "from" | "import" => match self.tok(i + 1) {
                Some(spec) if spec.kind == TokenKind::String => {
                    self.link(spec, LiteralRole::ModuleSpecifier);
                    i + 2
                }
                Some(open) if tok.text == "import" && open.is_punct("(") => {
                    match self.tok(i + 2) {
                        Some(spec) if spec.kind == TokenKind::String => {
                            self.link(spec, LiteralRole::ModuleSpecifier);
                        }
                        _ => {}
                    }
                    i + 1
                }
                _ => i + 1,
            },
            name if KEYWORDS.contains(&name) => i + 1,
            _ => {
                self.analysis
                    .bindings
                    .push(BindingData::new(&tok.text, tok.span, Namespace::Type));
                i + 1
            }
        }
    }

    fn class_declaration(&mut self, name: &Token) {
        let decl = self.pending_decorator.take().map(|d| {
            let mut data = DeclarationData::new(d.kind, &name.text, name.span);
            if let Some(template) = d.template_path {
                data = data.with_template_path(template);
            }
            let index = self.analysis.push_declaration(data);
            for region in d.metadata {
                self.analysis.regions[region].owner = Some(index);
            }
            (index, d.kind)
        });
        self.pending_class = Some((decl.map(|d| d.0), decl.map(|d| d.1)));
    }

    fn link(&mut self, tok: &Token, role: LiteralRole) {
        self.analysis.links.push(LinkData {
            span: tok.inner,
            specifier: tok.inner_text().to_string(),
            role,
        });
    }

    fn plain_literal(&mut self, tok: &Token) {
        self.literal(tok, LiteralRole::Plain);
    }

    /// A metadata literal; its owner is set once the decorated class is read.
    fn metadata_literal(&mut self, tok: &Token) {
        if !tok.inner.is_empty() {
            self.pending_metadata.push(self.analysis.regions.len());
            self.literal(tok, LiteralRole::Metadata);
        }
    }

    fn literal(&mut self, tok: &Token, role: LiteralRole) {
        if !tok.inner.is_empty() {
            self.analysis
                .regions
                .push(RegionData::literal(tok.inner, role, tok.inner_text()));
        }
    }

    // ------------------------------------------------------------------------
    // Class members
    // ------------------------------------------------------------------------

    fn at_member_start(&self, i: usize) -> bool {
        let Some(frame) = self.classes.last() else {
            return false;
        };
        if self.brace_depth != frame.body_depth || self.group_depth != frame.group_base {
            return false;
        }
        if frame.expect_member {
            return true;
        }
        // Automatic semicolon insertion between property declarations.
        let tok = self.code[i];
        tok.newline_before && i > 0 && ends_statement(self.code[i - 1])
    }

    /// Read a member declaration starting at `i`.
    ///
    /// Returns `None` when `i` does not start a member name; decorators are
    /// left to the generic path so the member after them is still read.
    fn member(&mut self, i: usize) -> Option<usize> {
        let first = self.code[i];
        if first.is_punct("@") || first.is_punct(";") {
            return None;
        }

        let mut j = i;
        while let (Some(tok), Some(next)) = (self.tok(j), self.tok(j + 1)) {
            let modifier = tok.kind == TokenKind::Ident && MODIFIERS.contains(&tok.text.as_str());
            let accessor = tok.is_ident("get") || tok.is_ident("set");
            if (modifier || accessor) && next.kind == TokenKind::Ident {
                j += 1;
            } else if tok.is_punct("*") {
                j += 1;
            } else {
                break;
            }
        }

        let name = self.tok(j).filter(|t| t.kind == TokenKind::Ident);
        let Some(name) = name else {
            self.end_member();
            return None;
        };
        let follows_name = match self.tok(j + 1) {
            None => true,
            Some(next) => {
                next.newline_before
                    || matches!(next.text.as_str(), "(" | ":" | "=" | ";" | "?" | "!" | "<" | "}")
            }
        };
        if !follows_name {
            self.end_member();
            return None;
        }

        self.end_member();
        if name.text == "constructor" && self.tok(j + 1).is_some_and(|t| t.is_punct("(")) {
            return Some(self.constructor_parameters(j + 1));
        }
        if let (Some(container), Some(SymbolKind::Component)) =
            (self.current_class(), self.classes.last().and_then(|c| c.kind))
        {
            self.analysis.push_declaration(
                DeclarationData::new(SymbolKind::Field, &name.text, name.span)
                    .with_container(container),
            );
        }
        Some(j + 1)
    }

    fn end_member(&mut self) {
        if let Some(frame) = self.classes.last_mut() {
            frame.expect_member = false;
        }
    }

    /// Read constructor parameters; `open` is the `(`. Returns the index after `)`.
    fn constructor_parameters(&mut self, open: usize) -> usize {
        let close = self.matching_paren(open);
        let component = self.current_class().filter(|_| {
            self.classes.last().and_then(|c| c.kind) == Some(SymbolKind::Component)
        });

        let mut k = open + 1;
        let mut at_parameter = true;
        let mut modifiers = 0usize;
        let mut nesting = 0usize;
        while k < close {
            let tok = self.code[k];
            match tok.kind {
                TokenKind::Punct => match tok.text.as_str() {
                    "@" => {
                        // Parameter decorator such as `@Inject(TOKEN)`.
                        if self.tok(k + 2).is_some_and(|t| t.is_punct("(")) {
                            k = self.matching_paren(k + 2);
                        } else {
                            k += 1;
                        }
                    }
                    "(" | "[" | "{" | "<" => nesting += 1,
                    ")" | "]" | "}" | ">" => nesting = nesting.saturating_sub(1),
                    "," if nesting == 0 => {
                        at_parameter = true;
                        modifiers = 0;
                    }
                    _ => {}
                },
                TokenKind::Ident if at_parameter => {
                    if PARAMETER_PROPERTY_MODIFIERS.contains(&tok.text.as_str()) {
                        modifiers += 1;
                    } else {
                        if let (true, Some(container)) = (modifiers > 0, component) {
                            self.analysis.push_declaration(
                                DeclarationData::new(SymbolKind::Field, &tok.text, tok.span)
                                    .with_container(container),
                            );
                        }
                        at_parameter = false;
                    }
                }
                TokenKind::Ident if !self.prev_is_dot(k) => {
                    self.analysis
                        .bindings
                        .push(BindingData::new(&tok.text, tok.span, Namespace::Type));
                }
                TokenKind::String | TokenKind::Template => self.plain_literal(tok),
                _ => {}
            }
            k += 1;
        }
        close + 1
    }

    // ------------------------------------------------------------------------
    // Decorators
    // ------------------------------------------------------------------------

    /// Read `@Name` or `@Name(...)`; `i` is the `@`.
    fn decorator(&mut self, i: usize) -> usize {
        let Some(name) = self.tok(i + 1).filter(|t| t.kind == TokenKind::Ident) else {
            return i + 1;
        };
        let open = i + 2;
        if !self.tok(open).is_some_and(|t| t.is_punct("(")) {
            return open;
        }
        let close = self.matching_paren(open);

        match name.text.as_str() {
            "Component" => {
                let template_path = self.decorator_args(DecoratorArgs::Component, open + 1, close);
                self.pending_decorator = Some(ClassDecorator {
                    kind: SymbolKind::Component,
                    template_path,
                    metadata: std::mem::take(&mut self.pending_metadata),
                });
            }
            "NgModule" => {
                self.decorator_args(DecoratorArgs::NgModule, open + 1, close);
                self.pending_decorator = Some(ClassDecorator {
                    kind: SymbolKind::Module,
                    template_path: None,
                    metadata: std::mem::take(&mut self.pending_metadata),
                });
            }
            "Pipe" => {
                self.decorator_args(DecoratorArgs::Pipe, open + 1, close);
            }
            query if QUERY_DECORATORS.contains(&query) => {
                let mut from = open + 1;
                if let Some(tok) = self.tok(from).filter(|t| t.kind == TokenKind::String) {
                    self.template_reference_names(tok);
                    from += 1;
                }
                self.decorator_args(DecoratorArgs::Other, from, close);
            }
            _ => {
                self.decorator_args(DecoratorArgs::Other, open + 1, close);
            }
        }
        close + 1
    }

    /// Walk decorator arguments in `[from, to)`.
    ///
    /// Returns the resolved `templateUrl` for components.
    fn decorator_args(&mut self, args: DecoratorArgs, from: usize, to: usize) -> Option<String> {
        let mut template_path = None;
        let mut key: Option<String> = None;

        for k in from..to {
            let tok = self.code[k];
            let is_key = self.tok(k + 1).is_some_and(|t| t.is_punct(":"));
            match tok.kind {
                TokenKind::Ident if is_key => key = Some(tok.text.clone()),
                TokenKind::Ident if self.prev_is_dot(k) => {}
                TokenKind::Ident => {
                    self.analysis
                        .bindings
                        .push(BindingData::new(&tok.text, tok.span, Namespace::Type));
                }
                TokenKind::String if is_key => {
                    key = Some(tok.inner_text().to_string());
                    self.plain_literal(tok);
                }
                TokenKind::String | TokenKind::Template => {
                    match (args, key.as_deref()) {
                        (DecoratorArgs::Component, Some("selector")) => {
                            self.metadata_literal(tok);
                        }
                        (DecoratorArgs::Component, Some("templateUrl")) => {
                            self.link(tok, LiteralRole::ResourceUrl);
                            template_path = resolve_relative_path(self.path, tok.inner_text());
                        }
                        (DecoratorArgs::Component, Some("styleUrl" | "styleUrls")) => {
                            self.link(tok, LiteralRole::ResourceUrl);
                        }
                        (DecoratorArgs::Pipe, Some("name")) if !tok.inner.is_empty() => {
                            self.analysis.push_declaration(DeclarationData::new(
                                SymbolKind::Pipe,
                                tok.inner_text(),
                                tok.inner,
                            ));
                        }
                        (DecoratorArgs::NgModule, Some("id")) => {
                            self.metadata_literal(tok);
                        }
                        _ => self.plain_literal(tok),
                    }
                }
                _ => {}
            }
        }
        template_path
    }

    /// `@ViewChild('a')` or `@ViewChildren('a, b')`: one binding per name.
    fn template_reference_names(&mut self, tok: &Token) {
        let text = tok.inner_text();
        let mut offset = 0usize;
        for part in text.split(',') {
            let trimmed = part.trim();
            if !trimmed.is_empty() {
                let lead = part.len() - part.trim_start().len();
                let start = tok.inner.start as usize + offset + lead;
                self.analysis.bindings.push(
                    BindingData::new(
                        trimmed,
                        Span::at(start, trimmed.len()),
                        Namespace::TemplateLocal,
                    )
                    .with_container(self.current_class()),
                );
            }
            offset += part.len() + 1;
        }
    }
}

/// True when a token can end a statement, so a line break after it may end a member.
fn ends_statement(tok: &Token) -> bool {
    match tok.kind {
        TokenKind::Ident
        | TokenKind::String
        | TokenKind::Template
        | TokenKind::Number
        | TokenKind::Regex => true,
        TokenKind::Punct => matches!(tok.text.as_str(), ")" | "]" | "}" | ">"),
        TokenKind::LineComment | TokenKind::BlockComment => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
