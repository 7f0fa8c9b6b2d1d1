// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Recursive-descent parser for GSX files.
//!
//! One-token lookahead (`current` / `peek`) over [`crate::lexer::Lexer`].
//! The parser builds a [`File`] of package / imports / verbatim host
//! declarations / templates, with template bodies containing the DSL
//! sub-language (tags, attributes, interpolations, `@let`, `@for`, `@if`,
//! component calls).
//!
//! # Raw capture
//!
//! For iterables, conditions, component arguments, parameter types, and
//! interpolations, the parser records the start byte offset of the current
//! token, advances until the delimiter, then slices the original source.
//! This is the only mechanism that preserves host-language expression text
//! intact, including generics, strings, and nested delimiters.
//!
//! # Comment attachment
//!
//! Comments drained from the lexer accumulate in a pending buffer. Before a
//! body node is parsed they are grouped by blank-line separation and
//! attached as *leading*; a comment starting on the same line as a
//! construct's terminator becomes its *trailing* comment; comments left at
//! the end of a body become *orphans*.
//!
//! # Error recovery
//!
//! Parse errors accumulate as diagnostics. At the top level the parser
//! synchronizes to the next declaration keyword; inside a body it advances
//! one token and tries again. A partially-built AST is always returned.

use crate::ast::*;
use crate::error::{Diagnostic, Diagnostics};
use crate::lexer::Lexer;
use crate::token::{group_comments, Comment, Position, Token, TokenKind};
use tracing::debug;

/// The host-library element type that elevates a plain `func` into a
/// function template.
const ELEMENT_TYPE: &str = "*tui.Element";

/// Whether a body is a template/control-flow body or element children.
/// Bare text runs only exist between an element's tags; at body level a
/// bare identifier starts a host statement instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyCtx {
    Template,
    ElementChildren,
}

/// Parses a `.gsx` source file.
///
/// Always returns a (possibly partial) [`File`] plus every diagnostic the
/// lexer and parser accumulated.
pub fn parse_file(path: &str, source: &str) -> (File, Diagnostics) {
    let mut parser = Parser::new(path, source);
    let file = parser.parse();
    let diagnostics = parser.finish();
    (file, diagnostics)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peek: Token,
    pending_comments: Vec<Comment>,
    diagnostics: Diagnostics,
    in_method_template: bool,
    path: String,
}

impl<'a> Parser<'a> {
    fn new(path: &str, source: &'a str) -> Self {
        let mut lexer = Lexer::new(path, source);
        let current = lexer.next_token();
        let peek = lexer.next_token();
        let mut parser = Self {
            lexer,
            current,
            peek,
            pending_comments: Vec::new(),
            diagnostics: Diagnostics::new(),
            in_method_template: false,
            path: path.to_string(),
        };
        parser.drain_comments();
        parser
    }

    fn finish(mut self) -> Diagnostics {
        let mut diagnostics = self.lexer.take_diagnostics();
        diagnostics.extend(self.diagnostics);
        diagnostics
    }

    fn drain_comments(&mut self) {
        self.pending_comments.extend(self.lexer.consume_comments());
    }

    fn advance(&mut self) {
        self.current = std::mem::replace(&mut self.peek, self.lexer.next_token());
        self.drain_comments();
    }

    fn skip_newlines(&mut self) {
        while self.current.kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn error_here(&mut self, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(self.current.position.clone(), message));
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.current.kind == kind {
            self.advance();
            true
        } else {
            let message = format!("expected {what}, found {:?}", self.current.literal);
            self.error_here(message);
            false
        }
    }

    /// Takes all pending comments grouped by blank-line separation.
    fn take_leading(&mut self) -> Vec<crate::token::CommentGroup> {
        group_comments(std::mem::take(&mut self.pending_comments))
    }

    /// Takes the first pending comment if it starts on `line`.
    fn take_trailing(&mut self, line: usize) -> Option<Comment> {
        if self
            .pending_comments
            .first()
            .is_some_and(|c| c.position.line == line)
        {
            Some(self.pending_comments.remove(0))
        } else {
            None
        }
    }

    /// Re-primes the lookahead after a byte-level balanced-brace read moved
    /// the lexer past tokens the lookahead had already scanned.
    fn reprime(&mut self) {
        self.current = self.lexer.next_token();
        self.peek = self.lexer.next_token();
        self.drain_comments();
    }

    /// Reads the interpolation whose opening `{` is the current token.
    /// Afterwards the current token is the first one past the closing `}`.
    fn read_interpolation_here(&mut self) -> CodeExpr {
        debug_assert_eq!(self.current.kind, TokenKind::LBrace);
        let open = self.current.position.clone();
        let (text, _end) = self.lexer.read_balanced_braces_from(open.offset + 1);
        // Comments the lookahead buffered are embedded in the captured
        // bytes; they must not attach to a later node.
        self.pending_comments.clear();
        let _ = self.lexer.consume_comments();
        self.reprime();
        let position = Position::new(self.path.clone(), open.line, open.column + 1, open.offset + 1);
        CodeExpr::new(text, position)
    }

    /// Verbatim source between two byte offsets, trimmed.
    fn capture(&self, start: usize, end: usize) -> String {
        self.lexer.source_range(start, end).trim().to_string()
    }

    // ------------------------------------------------------------------
    // Top level
    // ------------------------------------------------------------------

    fn parse(&mut self) -> File {
        let mut file = File::new(self.path.clone());
        self.skip_newlines();
        file.leading_comments = self.take_leading();

        if self.current.kind == TokenKind::Package {
            self.advance();
            if self.current.kind == TokenKind::Ident {
                file.package_name = self.current.literal.clone();
                self.advance();
            } else {
                self.error_here("expected package name");
            }
        } else {
            self.error_here("missing package header");
        }

        loop {
            self.skip_newlines();
            match self.current.kind {
                TokenKind::Eof => break,
                TokenKind::Import => self.parse_import(&mut file),
                TokenKind::Type => self.parse_host_decl(&mut file, HostDeclKind::Type),
                TokenKind::Const => self.parse_host_decl(&mut file, HostDeclKind::Const),
                TokenKind::Var => self.parse_host_decl(&mut file, HostDeclKind::Var),
                TokenKind::Func => self.parse_func(&mut file),
                TokenKind::Templ => {
                    let leading = self.take_leading();
                    if let Some(mut template) = self.parse_template() {
                        let existing = std::mem::take(&mut template.comments.leading);
                        let mut merged = leading;
                        merged.extend(existing);
                        template.comments.leading = merged;
                        file.templates.push(template);
                    }
                }
                _ => {
                    let message =
                        format!("unexpected token {:?} at top level", self.current.literal);
                    self.error_here(message);
                    self.synchronize();
                }
            }
        }

        file.orphan_comments = self.take_leading();
        debug!(
            templates = file.templates.len(),
            host_funcs = file.host_funcs.len(),
            "parsed file"
        );
        file
    }

    /// Skips tokens until the next top-level declaration keyword.
    fn synchronize(&mut self) {
        loop {
            match self.current.kind {
                TokenKind::Func
                | TokenKind::Templ
                | TokenKind::Type
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::Eof => return,
                _ => self.advance(),
            }
        }
    }

    fn parse_import(&mut self, file: &mut File) {
        self.advance(); // import
        if self.current.kind == TokenKind::LParen {
            self.advance();
            loop {
                self.skip_newlines();
                match self.current.kind {
                    TokenKind::RParen => {
                        self.advance();
                        break;
                    }
                    TokenKind::Eof => {
                        self.error_here("unterminated import block");
                        break;
                    }
                    _ => {
                        if let Some(import) = self.parse_import_line() {
                            file.imports.push(import);
                        } else {
                            self.advance();
                        }
                    }
                }
            }
        } else if let Some(import) = self.parse_import_line() {
            file.imports.push(import);
        }
        self.pending_comments.clear();
    }

    fn parse_import_line(&mut self) -> Option<Import> {
        let position = self.current.position.clone();
        let mut alias = String::new();
        if matches!(self.current.kind, TokenKind::Ident | TokenKind::Dot) {
            alias = self.current.literal.clone();
            self.advance();
        }
        if self.current.kind == TokenKind::String {
            let path = self.current.literal.clone();
            self.advance();
            Some(Import {
                alias,
                path,
                position,
            })
        } else {
            self.error_here("expected import path string");
            None
        }
    }

    /// Captures a `type` / `const` / `var` declaration verbatim: advance
    /// while tracking bracket depth, stopping at the first newline at depth
    /// zero (or EOF).
    fn parse_host_decl(&mut self, file: &mut File, kind: HostDeclKind) {
        let position = self.current.position.clone();
        let start = position.offset;
        let end = self.scan_to_newline_at_depth_zero();
        file.host_decls.push(HostDecl {
            kind,
            code: self.capture(start, end),
            position,
        });
        // Any buffered comments are embedded in the captured bytes.
        self.pending_comments.clear();
    }

    fn scan_to_newline_at_depth_zero(&mut self) -> usize {
        let mut depth: i64 = 0;
        loop {
            match self.current.kind {
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => depth -= 1,
                TokenKind::Newline if depth <= 0 => return self.current.position.offset,
                TokenKind::Eof => return self.current.position.offset,
                _ => {}
            }
            self.advance();
        }
    }

    /// A `func` is either elevated to a function template (return type is
    /// exactly the element type, no receiver) or captured verbatim.
    fn parse_func(&mut self, file: &mut File) {
        let position = self.current.position.clone();
        let start = position.offset;
        self.advance(); // func

        // Methods are always host functions.
        if self.current.kind == TokenKind::LParen {
            let end = self.scan_to_newline_at_depth_zero();
            file.host_funcs.push(HostFunc {
                code: self.capture(start, end),
                position,
            });
            self.pending_comments.clear();
            return;
        }

        let name = self.current.literal.clone();
        let name_is_ident = self.current.kind == TokenKind::Ident;
        self.advance();
        if !name_is_ident || self.current.kind != TokenKind::LParen {
            // Unrecognized shape; capture verbatim.
            let end = self.scan_to_newline_at_depth_zero();
            file.host_funcs.push(HostFunc {
                code: self.capture(start, end),
                position,
            });
            self.pending_comments.clear();
            return;
        }

        let params_raw = self.capture_parenthesized();
        let ret_start = self.current.position.offset;
        // Scan the return type up to the body's opening brace.
        while !matches!(self.current.kind, TokenKind::LBrace | TokenKind::Eof | TokenKind::Newline)
        {
            self.advance();
        }
        let ret_type = self.capture(ret_start, self.current.position.offset);

        if ret_type == ELEMENT_TYPE && self.current.kind == TokenKind::LBrace {
            let leading = self.take_leading();
            let mut template = self.finish_template(name, position, None, &params_raw);
            let existing = std::mem::take(&mut template.comments.leading);
            let mut merged = leading;
            merged.extend(existing);
            template.comments.leading = merged;
            file.templates.push(template);
        } else {
            let end = self.scan_to_newline_at_depth_zero();
            file.host_funcs.push(HostFunc {
                code: self.capture(start, end),
                position,
            });
            self.pending_comments.clear();
        }
    }

    fn parse_template(&mut self) -> Option<Template> {
        let position = self.current.position.clone();
        self.advance(); // templ

        let receiver = if self.current.kind == TokenKind::LParen {
            self.advance();
            let name = self.current.literal.clone();
            if !self.expect(TokenKind::Ident, "receiver name") {
                return None;
            }
            let type_start = self.current.position.offset;
            let mut depth = 0i64;
            while !(self.current.kind == TokenKind::RParen && depth == 0) {
                match self.current.kind {
                    TokenKind::LParen | TokenKind::LBracket => depth += 1,
                    TokenKind::RParen | TokenKind::RBracket => depth -= 1,
                    TokenKind::Eof => {
                        self.error_here("unterminated receiver");
                        return None;
                    }
                    _ => {}
                }
                self.advance();
            }
            let type_source = self.capture(type_start, self.current.position.offset);
            self.advance(); // )
            Some(Receiver { name, type_source })
        } else {
            None
        };

        let name = self.current.literal.clone();
        if !self.expect(TokenKind::Ident, "template name") {
            return None;
        }
        if self.current.kind != TokenKind::LParen {
            self.error_here("expected '(' after template name");
            return None;
        }
        let params_raw = self.capture_parenthesized();
        Some(self.finish_template(name, position, receiver, &params_raw))
    }

    /// Parses the `{ body }` of a template whose header is already consumed
    /// and whose current token is the opening brace.
    fn finish_template(
        &mut self,
        name: String,
        position: Position,
        receiver: Option<Receiver>,
        params_raw: &str,
    ) -> Template {
        let params = parse_params(params_raw);
        let open_line = self.current.position.line;
        self.expect(TokenKind::LBrace, "'{' to open template body");
        let trailing = self.take_trailing(open_line);

        let was_method = self.in_method_template;
        self.in_method_template = receiver.is_some();
        let (body, orphans) = self.parse_body(BodyCtx::Template);
        self.in_method_template = was_method;

        self.expect(TokenKind::RBrace, "'}' to close template body");

        let mut template = Template {
            name,
            params,
            receiver,
            accepts_children: false,
            body,
            position,
            comments: NodeComments {
                leading: Vec::new(),
                trailing,
            },
            state_vars: Vec::new(),
            bindings: Vec::new(),
            refs: Vec::new(),
        };
        // Body-level comments with no node to lead attach to the template.
        template.comments.leading.extend(orphans);
        template
    }

    /// Captures the verbatim text between the current `(` and its matching
    /// `)`. Afterwards the current token is the first one past the `)`.
    fn capture_parenthesized(&mut self) -> String {
        debug_assert_eq!(self.current.kind, TokenKind::LParen);
        self.advance(); // (
        let start = self.current.position.offset;
        let mut depth = 0i64;
        loop {
            match self.current.kind {
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen if depth == 0 => break,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => depth -= 1,
                TokenKind::Eof => {
                    self.error_here("unterminated parenthesized group");
                    return self.capture(start, self.current.position.offset);
                }
                _ => {}
            }
            self.advance();
        }
        let text = self.capture(start, self.current.position.offset);
        self.advance(); // )
        text
    }

    // ------------------------------------------------------------------
    // DSL bodies
    // ------------------------------------------------------------------

    /// Parses body nodes until an unmatched `}` / `</` / EOF. Returns the
    /// nodes plus any orphan comment groups.
    fn parse_body(&mut self, ctx: BodyCtx) -> (Vec<Node>, Vec<crate::token::CommentGroup>) {
        let mut nodes = Vec::new();
        let mut orphans = Vec::new();

        loop {
            self.skip_newlines();
            let leading = self.take_leading();

            let node = match self.current.kind {
                TokenKind::RBrace | TokenKind::LtSlash | TokenKind::Eof => {
                    orphans.extend(leading);
                    break;
                }
                TokenKind::Lt => self.parse_element().map(Node::Element),
                TokenKind::AtLet => self.parse_let(),
                TokenKind::AtFor => self.parse_for(ctx).map(Node::For),
                TokenKind::AtIf => self.parse_if(ctx).map(Node::If),
                TokenKind::ComponentCall => self.parse_component_call(ctx).map(Node::ComponentCall),
                TokenKind::ComponentExpr => {
                    let expr = CodeExpr::new(
                        self.current.literal.clone(),
                        self.current.position.clone(),
                    );
                    self.advance();
                    Some(Node::ComponentExpr(ComponentExpr {
                        expr,
                        comments: NodeComments::default(),
                    }))
                }
                TokenKind::LBrace => Some(self.parse_interpolation_node()),
                TokenKind::AtElse => {
                    self.error_here("'@else' without matching '@if'");
                    self.advance();
                    None
                }
                TokenKind::Error => {
                    self.advance();
                    None
                }
                _ => match ctx {
                    BodyCtx::ElementChildren => Some(Node::Text(self.parse_text_run())),
                    BodyCtx::Template => self.parse_host_statement(),
                },
            };

            match node {
                Some(mut node) => {
                    if !leading.is_empty() {
                        let existing = std::mem::take(&mut node.comments_mut().leading);
                        let mut merged = leading;
                        merged.extend(existing);
                        node.comments_mut().leading = merged;
                    }
                    nodes.push(node);
                }
                None => orphans.extend(leading),
            }
        }

        (nodes, orphans)
    }

    fn parse_interpolation_node(&mut self) -> Node {
        let expr = self.read_interpolation_here();
        let trimmed = expr.code.trim();
        if trimmed == "children..." || trimmed == "children" {
            Node::ChildrenSlot(ChildrenSlot {
                position: expr.position,
                comments: NodeComments::default(),
            })
        } else {
            Node::Interpolation(Interpolation {
                expr,
                comments: NodeComments::default(),
            })
        }
    }

    fn parse_element(&mut self) -> Option<Element> {
        let position = self.current.position.clone();
        self.advance(); // <
        let tag = self.current.literal.clone();
        if !matches!(self.current.kind, TokenKind::Ident) {
            self.error_here("expected tag name after '<'");
            return None;
        }
        self.advance();

        let mut attributes = Vec::new();
        loop {
            self.skip_newlines();
            match self.current.kind {
                TokenKind::SlashGt | TokenKind::Gt | TokenKind::Eof => break,
                _ => {
                    if let Some(attribute) = self.parse_attribute() {
                        attributes.push(attribute);
                    } else {
                        self.advance();
                    }
                }
            }
        }

        let mut element = Element {
            tag: tag.clone(),
            attributes,
            children: Vec::new(),
            self_close: false,
            ref_expr: None,
            ref_key: None,
            position,
            comments: NodeComments::default(),
        };

        if self.current.kind == TokenKind::SlashGt {
            element.self_close = true;
            let line = self.current.position.line;
            self.advance();
            element.comments.trailing = self.take_trailing(line);
        } else if self.current.kind == TokenKind::Gt {
            let line = self.current.position.line;
            self.advance();
            element.comments.trailing = self.take_trailing(line);
            let (children, orphans) = self.parse_body(BodyCtx::ElementChildren);
            element.children = children;
            // Comments inside the element with nothing to lead stay with it.
            element.comments.leading.extend(orphans);
            if self.current.kind == TokenKind::LtSlash {
                self.advance();
                if self.current.literal != tag {
                    let message = format!(
                        "mismatched closing tag </{}>, expected </{}>",
                        self.current.literal, tag
                    );
                    self.error_here(message);
                }
                self.advance();
                let close_line = self.current.position.line;
                self.expect(TokenKind::Gt, "'>' to close tag");
                if element.comments.trailing.is_none() {
                    element.comments.trailing = self.take_trailing(close_line);
                }
            } else {
                let message = format!("missing closing tag </{tag}>");
                self.error_here(message);
            }
        } else {
            self.error_here("unterminated element tag");
        }

        self.extract_ref_attributes(&mut element);
        Some(element)
    }

    /// Moves `ref={...}` / `key={...}` attributes out of the attribute list.
    fn extract_ref_attributes(&mut self, element: &mut Element) {
        for (name, slot) in [("ref", 0usize), ("key", 1usize)] {
            let found = element.attributes.iter().position(|a| {
                a.name == name && matches!(a.value, AttributeValue::Expr(_))
            });
            if let Some(idx) = found {
                let attribute = element.attributes.remove(idx);
                if let AttributeValue::Expr(expr) = attribute.value {
                    if slot == 0 {
                        element.ref_expr = Some(expr);
                    } else {
                        element.ref_key = Some(expr);
                    }
                }
            }
        }
    }

    fn parse_attribute(&mut self) -> Option<Attribute> {
        let position = self.current.position.clone();
        let name = self.current.literal.clone();
        let is_name = self.current.kind == TokenKind::Ident
            || matches!(
                self.current.kind,
                TokenKind::For | TokenKind::If | TokenKind::Type | TokenKind::Range
            );
        if !is_name {
            let message = format!("expected attribute name, found {:?}", self.current.literal);
            self.error_here(message);
            return None;
        }
        self.advance();

        if self.current.kind != TokenKind::Assign {
            // Bare attribute.
            return Some(Attribute {
                name,
                value: AttributeValue::Bool(true),
                position,
            });
        }
        self.advance(); // =

        let value = match self.current.kind {
            TokenKind::String => {
                let v = AttributeValue::Str(self.current.literal.clone());
                self.advance();
                v
            }
            TokenKind::Int => {
                let v = AttributeValue::Int(self.current.literal.clone());
                self.advance();
                v
            }
            TokenKind::Float => {
                let v = AttributeValue::Float(self.current.literal.clone());
                self.advance();
                v
            }
            TokenKind::Ident if self.current.literal == "true" => {
                self.advance();
                AttributeValue::Bool(true)
            }
            TokenKind::Ident if self.current.literal == "false" => {
                self.advance();
                AttributeValue::Bool(false)
            }
            TokenKind::LBrace => AttributeValue::Expr(self.read_interpolation_here()),
            _ => {
                self.error_here("expected attribute value");
                return None;
            }
        };

        Some(Attribute {
            name,
            value,
            position,
        })
    }

    fn parse_let(&mut self) -> Option<Node> {
        let position = self.current.position.clone();
        self.advance(); // @let
        let name = self.current.literal.clone();
        if !self.expect(TokenKind::Ident, "binding name after '@let'") {
            return None;
        }
        if !self.expect(TokenKind::Assign, "'=' in '@let'") {
            return None;
        }
        self.skip_newlines();
        if self.current.kind != TokenKind::Lt {
            self.error_here("'@let' must bind an element");
            return None;
        }
        let element = self.parse_element()?;
        Some(Node::Let(LetBinding {
            name,
            element,
            position,
            comments: NodeComments::default(),
        }))
    }

    fn parse_for(&mut self, ctx: BodyCtx) -> Option<ForLoop> {
        let position = self.current.position.clone();
        self.advance(); // @for

        let first = self.current.literal.clone();
        if !self.expect(TokenKind::Ident, "loop variable") {
            return None;
        }
        let (index_var, value_var) = if self.current.kind == TokenKind::Comma {
            self.advance();
            let second = self.current.literal.clone();
            if !self.expect(TokenKind::Ident, "loop value variable") {
                return None;
            }
            let index = (first != "_").then_some(first);
            (index, second)
        } else {
            ((first != "_").then_some(first), "_".to_string())
        };

        if !self.expect(TokenKind::Declare, "':=' in '@for'") {
            return None;
        }
        if !self.expect(TokenKind::Range, "'range' in '@for'") {
            return None;
        }

        let iterable = self.capture_until_body_open()?;
        let open_line = self.current.position.line;
        self.advance(); // {
        let trailing = self.take_trailing(open_line);
        let (body, orphans) = self.parse_body(ctx);
        self.expect(TokenKind::RBrace, "'}' to close '@for'");

        let mut comments = NodeComments {
            leading: Vec::new(),
            trailing,
        };
        comments.leading.extend(orphans);
        Some(ForLoop {
            index_var,
            value_var,
            iterable,
            body,
            position,
            comments,
        })
    }

    fn parse_if(&mut self, ctx: BodyCtx) -> Option<IfStmt> {
        let position = self.current.position.clone();
        self.advance(); // @if

        let condition = self.capture_until_body_open()?;
        let open_line = self.current.position.line;
        self.advance(); // {
        let trailing = self.take_trailing(open_line);
        let (then_body, _orphans) = self.parse_body(ctx);
        self.expect(TokenKind::RBrace, "'}' to close '@if'");

        let mut else_body = Vec::new();
        // `@else` follows the closing brace, possibly after a line break.
        // Consuming newlines here is harmless when no @else follows; the
        // body loop skips them anyway.
        self.skip_newlines();
        if self.current.kind == TokenKind::AtElse {
            self.advance();
            if self.current.kind == TokenKind::AtIf {
                if let Some(nested) = self.parse_if(ctx) {
                    else_body.push(Node::If(nested));
                }
            } else if self.current.kind == TokenKind::LBrace {
                self.advance();
                let (body, _) = self.parse_body(ctx);
                self.expect(TokenKind::RBrace, "'}' to close '@else'");
                else_body = body;
            } else {
                self.error_here("expected '@if' or '{' after '@else'");
            }
        }

        Some(IfStmt {
            condition,
            then_body,
            else_body,
            position,
            comments: NodeComments {
                leading: Vec::new(),
                trailing,
            },
        })
    }

    /// Captures raw host code from the current token until the body-opening
    /// `{` at bracket depth zero.
    fn capture_until_body_open(&mut self) -> Option<CodeExpr> {
        let start_pos = self.current.position.clone();
        let start = start_pos.offset;
        let mut depth = 0i64;
        loop {
            match self.current.kind {
                TokenKind::LBrace if depth == 0 => break,
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth -= 1,
                TokenKind::Eof => {
                    self.error_here("expected '{'");
                    return None;
                }
                _ => {}
            }
            self.advance();
        }
        let code = self.capture(start, self.current.position.offset);
        Some(CodeExpr::new(code, start_pos))
    }

    fn parse_component_call(&mut self, ctx: BodyCtx) -> Option<ComponentCall> {
        let position = self.current.position.clone();
        let name = self.current.literal.clone();
        self.advance(); // @Name
        if self.current.kind != TokenKind::LParen {
            self.error_here("expected '(' after component name");
            return None;
        }
        let args = self.capture_parenthesized();

        let mut children = Vec::new();
        if self.current.kind == TokenKind::LBrace {
            self.advance();
            let (body, _) = self.parse_body(ctx);
            self.expect(TokenKind::RBrace, "'}' to close component children");
            children = body;
        }

        Some(ComponentCall {
            name,
            args,
            children,
            is_struct_mount: self.in_method_template,
            position,
            comments: NodeComments::default(),
        })
    }

    /// Captures a verbatim host statement: from the current token until a
    /// newline or semicolon at bracket depth zero. Semicolons inside a `for`
    /// header (before the body `{`) do not terminate.
    fn parse_host_statement(&mut self) -> Option<Node> {
        let start_pos = self.current.position.clone();
        let start = start_pos.offset;
        let is_for = self.current.kind == TokenKind::For;
        let mut seen_body_brace = false;
        let mut depth = 0i64;

        loop {
            match self.current.kind {
                TokenKind::Newline if depth == 0 => break,
                TokenKind::Semicolon if depth == 0 && (!is_for || seen_body_brace) => break,
                TokenKind::LBrace => {
                    if depth == 0 {
                        seen_body_brace = true;
                    }
                    depth += 1;
                }
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => depth -= 1,
                TokenKind::Eof => break,
                _ => {}
            }
            self.advance();
        }
        let code = self.capture(start, self.current.position.offset);
        let at_semicolon = self.current.kind == TokenKind::Semicolon;
        if at_semicolon {
            self.advance();
        }
        if code.is_empty() {
            if !at_semicolon {
                self.advance();
            }
            return None;
        }
        Some(Node::HostStmt(HostStmt {
            code: CodeExpr::new(code, start_pos),
            comments: NodeComments::default(),
        }))
    }

    /// Coalesces a run of text tokens into one [`TextContent`].
    ///
    /// A space is inserted between two consecutive word tokens and after
    /// comma / colon / semicolon before a word; punctuation is otherwise
    /// joined without spaces.
    fn parse_text_run(&mut self) -> TextContent {
        let position = self.current.position.clone();
        let mut text = String::new();
        #[derive(PartialEq)]
        enum Prev {
            None,
            Word,
            Separator,
            Punct,
        }
        let mut prev = Prev::None;

        loop {
            match self.current.kind {
                TokenKind::Lt
                | TokenKind::LtSlash
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::AtLet
                | TokenKind::AtFor
                | TokenKind::AtIf
                | TokenKind::AtElse
                | TokenKind::ComponentCall
                | TokenKind::ComponentExpr
                | TokenKind::Eof => break,
                TokenKind::Newline => {
                    // A line break is a word boundary but not punctuation.
                    if prev == Prev::Word {
                        prev = Prev::Separator;
                    }
                    self.advance();
                }
                TokenKind::Comma | TokenKind::Colon | TokenKind::Semicolon => {
                    text.push_str(&self.current.literal);
                    prev = Prev::Separator;
                    self.advance();
                }
                kind => {
                    let is_word = matches!(
                        kind,
                        TokenKind::Ident
                            | TokenKind::Int
                            | TokenKind::Float
                            | TokenKind::String
                            | TokenKind::RawString
                            | TokenKind::Rune
                            | TokenKind::Package
                            | TokenKind::Import
                            | TokenKind::Func
                            | TokenKind::Type
                            | TokenKind::Const
                            | TokenKind::Var
                            | TokenKind::If
                            | TokenKind::Else
                            | TokenKind::For
                            | TokenKind::Range
                            | TokenKind::Return
                            | TokenKind::Templ
                    );
                    if is_word && matches!(prev, Prev::Word | Prev::Separator) {
                        text.push(' ');
                    }
                    text.push_str(&self.current.literal);
                    prev = if is_word { Prev::Word } else { Prev::Punct };
                    self.advance();
                }
            }
        }

        TextContent {
            text,
            position,
            comments: NodeComments::default(),
        }
    }
}

/// Splits a parameter list into [`Param`]s.
///
/// Commas are split at bracket depth zero; Go-style grouped parameters
/// (`a, b int`) backfill the type from the next typed parameter.
fn parse_params(raw: &str) -> Vec<Param> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    let mut depth = 0i64;
    let mut piece_start = 0usize;
    for (idx, ch) in raw.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                pieces.push(raw[piece_start..idx].trim());
                piece_start = idx + 1;
            }
            _ => {}
        }
    }
    pieces.push(raw[piece_start..].trim());

    let mut params: Vec<Param> = pieces
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(|piece| match piece.split_once(char::is_whitespace) {
            Some((name, type_source)) => Param {
                name: name.to_string(),
                type_source: type_source.trim().to_string(),
            },
            None => Param {
                name: piece.to_string(),
                type_source: String::new(),
            },
        })
        .collect();

    // Backfill grouped parameters: `a, b int` gives `a` the type of `b`.
    let mut carry = String::new();
    for param in params.iter_mut().rev() {
        if param.type_source.is_empty() {
            param.type_source = carry.clone();
        } else {
            carry = param.type_source.clone();
        }
    }
    params
}
