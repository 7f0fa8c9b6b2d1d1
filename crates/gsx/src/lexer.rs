// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Lexer for GSX template source.
//!
//! The lexer walks the UTF-8 input byte by byte, producing one [`Token`] per
//! call to [`Lexer::next_token`]. Three design points matter downstream:
//!
//! - **Byte offsets everywhere.** Every token records its start byte offset
//!   so the parser can capture host-language expressions as verbatim slices
//!   of the original source ([`Lexer::source_range`]).
//! - **Newlines are tokens.** The parser uses them to detect end-of-statement
//!   and blank lines between siblings. Other whitespace is skipped silently.
//! - **Comments are buffered, not emitted.** The parser drains them with
//!   [`Lexer::consume_comments`] and attaches them to AST nodes.
//!
//! Balanced-delimiter scanning ([`Lexer::read_interpolation`],
//! [`Lexer::read_balanced_braces_from`]) recovers interpolated host code
//! without tokenizing it: braces are counted while double-quoted strings,
//! raw back-tick strings, and rune literals are skipped opaquely.
//!
//! Lexical errors do not abort scanning. Each produces an error token plus a
//! diagnostic, so one run reports every problem in the file.

use crate::error::{Diagnostic, Diagnostics};
use crate::token::{lookup_keyword, Comment, Position, Token, TokenKind};

/// The GSX lexer.
///
/// One instance scans one file; no state is shared between compiles.
pub struct Lexer<'a> {
    source: &'a str,
    file: String,
    /// Byte offset of the next unread character.
    pos: usize,
    /// 1-indexed line of the next unread character.
    line: usize,
    /// 1-indexed column of the next unread character.
    column: usize,
    /// Comments seen since the last `consume_comments` call.
    pending_comments: Vec<Comment>,
    /// Accumulated lexical errors.
    diagnostics: Diagnostics,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `source`, reporting positions against `file`.
    pub fn new(file: impl Into<String>, source: &'a str) -> Self {
        Self {
            source,
            file: file.into(),
            pos: 0,
            line: 1,
            column: 1,
            pending_comments: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// The full source this lexer scans.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Verbatim source slice between two byte offsets.
    ///
    /// Offsets are clamped to the source length; `start > end` yields "".
    pub fn source_range(&self, start: usize, end: usize) -> &'a str {
        let len = self.source.len();
        let start = start.min(len);
        let end = end.min(len);
        if start >= end {
            ""
        } else {
            &self.source[start..end]
        }
    }

    /// Returns and clears the comments buffered since the previous call.
    pub fn consume_comments(&mut self) -> Vec<Comment> {
        std::mem::take(&mut self.pending_comments)
    }

    /// Takes the lexical diagnostics accumulated so far.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_char_at(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn position(&self) -> Position {
        Position::new(self.file.clone(), self.line, self.column, self.pos)
    }

    /// Skips spaces, tabs, and carriage returns, buffering any comments.
    /// Stops at newlines, which are emitted as tokens.
    fn skip_whitespace(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('/') => match self.peek_char_at(1) {
                    Some('/') => self.read_line_comment(),
                    Some('*') => self.read_block_comment(),
                    _ => return,
                },
                _ => return,
            }
        }
    }

    fn read_line_comment(&mut self) {
        let start = self.position();
        let text_start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
        self.pending_comments.push(Comment {
            text: self.source[text_start..self.pos].to_string(),
            position: start,
            end_line: self.line,
            end_column: self.column,
            is_block: false,
        });
    }

    fn read_block_comment(&mut self) {
        let start = self.position();
        let text_start = self.pos;
        self.advance(); // /
        self.advance(); // *
        let mut terminated = false;
        while let Some(ch) = self.advance() {
            if ch == '*' && self.peek_char() == Some('/') {
                self.advance();
                terminated = true;
                break;
            }
        }
        if !terminated {
            self.diagnostics
                .push(Diagnostic::error(start.clone(), "unterminated block comment"));
        }
        self.pending_comments.push(Comment {
            text: self.source[text_start..self.pos].to_string(),
            position: start,
            end_line: self.line,
            end_column: self.column,
            is_block: true,
        });
    }

    /// Produces the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.position();
        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => return Token::new(TokenKind::Eof, "", start),
        };

        match ch {
            '\n' => {
                self.advance();
                Token::new(TokenKind::Newline, "\n", start)
            }
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            '{' => self.single(TokenKind::LBrace, start),
            '}' => self.single(TokenKind::RBrace, start),
            '[' => self.single(TokenKind::LBracket, start),
            ']' => self.single(TokenKind::RBracket, start),
            ',' => self.single(TokenKind::Comma, start),
            ';' => self.single(TokenKind::Semicolon, start),
            '<' => {
                self.advance();
                if self.peek_char() == Some('/') {
                    self.advance();
                    Token::new(TokenKind::LtSlash, "</", start)
                } else {
                    Token::new(TokenKind::Lt, "<", start)
                }
            }
            '>' => self.single(TokenKind::Gt, start),
            '/' => {
                self.advance();
                if self.peek_char() == Some('>') {
                    self.advance();
                    Token::new(TokenKind::SlashGt, "/>", start)
                } else {
                    Token::new(TokenKind::Slash, "/", start)
                }
            }
            ':' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    Token::new(TokenKind::Declare, ":=", start)
                } else {
                    Token::new(TokenKind::Colon, ":", start)
                }
            }
            '=' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    Token::new(TokenKind::Op, "==", start)
                } else {
                    Token::new(TokenKind::Assign, "=", start)
                }
            }
            '.' => {
                if self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.read_number(start)
                } else {
                    self.single(TokenKind::Dot, start)
                }
            }
            '"' => self.read_string(start),
            '`' => self.read_raw_string(start),
            '\'' => self.read_rune(start),
            '@' => self.read_at(start),
            _ if ch.is_ascii_digit() => self.read_number(start),
            _ if ch.is_alphabetic() || ch == '_' => self.read_identifier(start),
            _ => self.read_operator(ch, start),
        }
    }

    fn single(&mut self, kind: TokenKind, start: Position) -> Token {
        let ch = self.advance().expect("caller checked peek");
        Token::new(kind, ch.to_string(), start)
    }

    fn read_operator(&mut self, ch: char, start: Position) -> Token {
        // Pairs the parser never inspects individually; raw capture only
        // needs their byte offsets.
        const PAIRS: &[&str] = &[
            "&&", "||", "!=", ">=", "<=", "<-", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
            "|=", "^=",
        ];
        self.advance();
        if let Some(next) = self.peek_char() {
            let pair: String = [ch, next].iter().collect();
            if PAIRS.contains(&pair.as_str()) {
                self.advance();
                return Token::new(TokenKind::Op, pair, start);
            }
        }
        match ch {
            '+' | '-' | '*' | '%' | '&' | '|' | '^' | '!' | '~' | '?' => {
                Token::new(TokenKind::Op, ch.to_string(), start)
            }
            _ => {
                self.diagnostics.push(Diagnostic::error(
                    start.clone(),
                    format!("unexpected character {:?}", ch),
                ));
                Token::new(TokenKind::Error, ch.to_string(), start)
            }
        }
    }

    fn read_identifier(&mut self, start: Position) -> Token {
        let text_start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let literal = &self.source[text_start..self.pos];
        Token::new(lookup_keyword(literal), literal, start)
    }

    fn read_number(&mut self, start: Position) -> Token {
        let text_start = self.pos;
        let mut is_float = false;

        if self.peek_char() == Some('.') {
            is_float = true;
            self.advance();
        }
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if !is_float && self.peek_char() == Some('.') {
            // Trailing `.method` calls stay out of the literal.
            if self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.advance();
                while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            let mut lookahead = 1;
            if matches!(self.peek_char_at(1), Some('+') | Some('-')) {
                lookahead = 2;
            }
            if self.peek_char_at(lookahead).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..=lookahead {
                    self.advance();
                }
                while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let literal = &self.source[text_start..self.pos];
        let kind = if is_float { TokenKind::Float } else { TokenKind::Int };
        Token::new(kind, literal, start)
    }

    fn read_string(&mut self, start: Position) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    self.diagnostics
                        .push(Diagnostic::error(start.clone(), "unterminated string literal"));
                    return Token::new(TokenKind::Error, value, start);
                }
                Some('"') => {
                    self.advance();
                    return Token::new(TokenKind::String, value, start);
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some('0') => value.push('\0'),
                        Some(other) => {
                            // Unknown escape: keep the backslash and the char.
                            value.push('\\');
                            value.push(other);
                        }
                        None => {
                            self.diagnostics.push(Diagnostic::error(
                                start.clone(),
                                "unterminated string literal",
                            ));
                            return Token::new(TokenKind::Error, value, start);
                        }
                    }
                }
                Some(ch) => {
                    self.advance();
                    value.push(ch);
                }
            }
        }
    }

    fn read_raw_string(&mut self, start: Position) -> Token {
        self.advance(); // opening back-tick
        let text_start = self.pos;
        loop {
            match self.peek_char() {
                None => {
                    self.diagnostics.push(Diagnostic::error(
                        start.clone(),
                        "unterminated raw string literal",
                    ));
                    let value = &self.source[text_start..self.pos];
                    return Token::new(TokenKind::Error, value, start);
                }
                Some('`') => {
                    let value = &self.source[text_start..self.pos];
                    self.advance();
                    return Token::new(TokenKind::RawString, value, start);
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn read_rune(&mut self, start: Position) -> Token {
        self.advance(); // opening quote
        let text_start = self.pos;
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    self.diagnostics
                        .push(Diagnostic::error(start.clone(), "unterminated rune literal"));
                    let value = &self.source[text_start..self.pos];
                    return Token::new(TokenKind::Error, value, start);
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    let value = &self.source[text_start..self.pos];
                    self.advance();
                    return Token::new(TokenKind::Rune, value, start);
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn read_at(&mut self, start: Position) -> Token {
        self.advance(); // @
        if !self.peek_char().is_some_and(|c| c.is_alphabetic() || c == '_') {
            self.diagnostics.push(Diagnostic::error(
                start.clone(),
                "expected identifier after '@'",
            ));
            return Token::new(TokenKind::Error, "@", start);
        }
        let text_start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let name = &self.source[text_start..self.pos];
        match name {
            "let" => Token::new(TokenKind::AtLet, "@let", start),
            "for" => Token::new(TokenKind::AtFor, "@for", start),
            "if" => Token::new(TokenKind::AtIf, "@if", start),
            "else" => Token::new(TokenKind::AtElse, "@else", start),
            _ => {
                if name.chars().next().is_some_and(|c| c.is_uppercase()) {
                    Token::new(TokenKind::ComponentCall, name, start)
                } else {
                    Token::new(TokenKind::ComponentExpr, name, start)
                }
            }
        }
    }

    /// Reads a host-language expression enclosed in braces, starting from the
    /// lexer's current position (which must be just past the opening `{`).
    ///
    /// Returns the enclosed text without the outer braces, plus the position
    /// just past the closing brace.
    pub fn read_interpolation(&mut self) -> (String, Position) {
        self.read_balanced(self.pos)
    }

    /// Like [`Lexer::read_interpolation`], but rewinds to `offset` first.
    ///
    /// The parser uses this after its one-token lookahead has already scanned
    /// past the opening brace: `offset` is the byte just after that brace.
    pub fn read_balanced_braces_from(&mut self, offset: usize) -> (String, Position) {
        self.rewind_to(offset);
        self.read_balanced(offset)
    }

    /// Moves the scan position back (or forward) to an absolute byte offset,
    /// recomputing line and column from the source prefix.
    fn rewind_to(&mut self, offset: usize) {
        let offset = offset.min(self.source.len());
        let prefix = &self.source[..offset];
        self.line = 1 + prefix.bytes().filter(|&b| b == b'\n').count();
        self.column = match prefix.rfind('\n') {
            Some(nl) => prefix[nl + 1..].chars().count() + 1,
            None => prefix.chars().count() + 1,
        };
        self.pos = offset;
        // Lookahead tokens past this point are stale; their comments were
        // already buffered, which is fine because capture regions embed any
        // comments verbatim.
    }

    /// Scans with a brace counter until the counter returns to zero,
    /// skipping string, raw-string, and rune literals opaquely.
    fn read_balanced(&mut self, text_start: usize) -> (String, Position) {
        let start = self.position();
        let mut depth: usize = 1;

        loop {
            let ch = match self.peek_char() {
                Some(ch) => ch,
                None => {
                    self.diagnostics.push(Diagnostic::error(
                        start.clone(),
                        "unterminated interpolation: missing '}'",
                    ));
                    let text = self.source[text_start..self.pos].to_string();
                    return (text, self.position());
                }
            };
            match ch {
                '{' => {
                    depth += 1;
                    self.advance();
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let text = self.source[text_start..self.pos].to_string();
                        self.advance(); // closing brace
                        return (text, self.position());
                    }
                    self.advance();
                }
                '"' => self.skip_string_literal(),
                '`' => self.skip_raw_string_literal(),
                '\'' => self.skip_rune_literal(),
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn skip_string_literal(&mut self) {
        self.advance(); // opening quote
        while let Some(ch) = self.peek_char() {
            match ch {
                '"' => {
                    self.advance();
                    return;
                }
                '\\' => {
                    self.advance();
                    self.advance();
                }
                '\n' => return, // broken literal; let the host compiler complain
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn skip_raw_string_literal(&mut self) {
        self.advance(); // opening back-tick
        while let Some(ch) = self.advance() {
            if ch == '`' {
                return;
            }
        }
    }

    fn skip_rune_literal(&mut self) {
        self.advance(); // opening quote
        while let Some(ch) = self.peek_char() {
            match ch {
                '\'' => {
                    self.advance();
                    return;
                }
                '\\' => {
                    self.advance();
                    self.advance();
                }
                '\n' => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new("t.gsx", source);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            if tok.is_eof() {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            kinds("package demo\n"),
            vec![TokenKind::Package, TokenKind::Ident, TokenKind::Newline]
        );
    }

    #[test]
    fn test_tag_delimiters() {
        assert_eq!(
            kinds("<div></div> <hr/>"),
            vec![
                TokenKind::Lt,
                TokenKind::Ident,
                TokenKind::Gt,
                TokenKind::LtSlash,
                TokenKind::Ident,
                TokenKind::Gt,
                TokenKind::Lt,
                TokenKind::Ident,
                TokenKind::SlashGt,
            ]
        );
    }

    #[test]
    fn test_at_keywords_and_components() {
        let mut lexer = Lexer::new("t.gsx", "@let @for @if @else @Header @footer");
        assert_eq!(lexer.next_token().kind, TokenKind::AtLet);
        assert_eq!(lexer.next_token().kind, TokenKind::AtFor);
        assert_eq!(lexer.next_token().kind, TokenKind::AtIf);
        assert_eq!(lexer.next_token().kind, TokenKind::AtElse);
        let call = lexer.next_token();
        assert_eq!(call.kind, TokenKind::ComponentCall);
        assert_eq!(call.literal, "Header");
        let expr = lexer.next_token();
        assert_eq!(expr.kind, TokenKind::ComponentExpr);
        assert_eq!(expr.literal, "footer");
    }

    #[test]
    fn test_string_escapes() {
        let mut lexer = Lexer::new("t.gsx", r#""a\tb\"c\qd""#);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::String);
        // \q is unknown: backslash and char are kept.
        assert_eq!(tok.literal, "a\tb\"c\\qd");
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let mut lexer = Lexer::new("t.gsx", "\"oops\n");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Error);
        assert!(lexer.take_diagnostics().has_errors());
    }

    #[test]
    fn test_raw_string_spans_lines() {
        let mut lexer = Lexer::new("t.gsx", "`line1\nline2`");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::RawString);
        assert_eq!(tok.literal, "line1\nline2");
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("t.gsx", "42 3.5 .25 1e3 2E-4");
        let t = lexer.next_token();
        assert_eq!((t.kind, t.literal.as_str()), (TokenKind::Int, "42"));
        let t = lexer.next_token();
        assert_eq!((t.kind, t.literal.as_str()), (TokenKind::Float, "3.5"));
        let t = lexer.next_token();
        assert_eq!((t.kind, t.literal.as_str()), (TokenKind::Float, ".25"));
        let t = lexer.next_token();
        assert_eq!((t.kind, t.literal.as_str()), (TokenKind::Float, "1e3"));
        let t = lexer.next_token();
        assert_eq!((t.kind, t.literal.as_str()), (TokenKind::Float, "2E-4"));
    }

    #[test]
    fn test_comments_are_buffered_not_emitted() {
        let mut lexer = Lexer::new("t.gsx", "// lead\nx /* inline */ y");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Newline);
        let tok = lexer.next_token();
        assert_eq!(tok.literal, "x");
        let tok = lexer.next_token();
        assert_eq!(tok.literal, "y");
        let comments = lexer.consume_comments();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "// lead");
        assert!(!comments[0].is_block);
        assert_eq!(comments[1].text, "/* inline */");
        assert!(comments[1].is_block);
    }

    #[test]
    fn test_interpolation_balances_nested_braces_and_strings() {
        let source = r#"{fmt.Sprintf("%d}", m["}"]) + f(struct{ x int }{1}.x)}"#;
        let mut lexer = Lexer::new("t.gsx", source);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::LBrace);
        let (text, _end) = lexer.read_interpolation();
        assert_eq!(
            text,
            r#"fmt.Sprintf("%d}", m["}"]) + f(struct{ x int }{1}.x)"#
        );
    }

    #[test]
    fn test_read_balanced_braces_from_rewinds() {
        let source = "{count.Get()} tail";
        let mut lexer = Lexer::new("t.gsx", source);
        let open = lexer.next_token();
        assert_eq!(open.kind, TokenKind::LBrace);
        // Simulate parser lookahead having scanned past the brace.
        let _ = lexer.next_token();
        let _ = lexer.next_token();
        let (text, end) = lexer.read_balanced_braces_from(open.position.offset + 1);
        assert_eq!(text, "count.Get()");
        assert_eq!(&source[end.offset..], " tail");
    }

    #[test]
    fn test_source_range_round_trip() {
        let source = "templ Hello() { <span>hi</span> }";
        let mut lexer = Lexer::new("t.gsx", source);
        let first = lexer.next_token();
        let mut last = first.clone();
        loop {
            let tok = lexer.next_token();
            if tok.is_eof() {
                break;
            }
            last = tok;
        }
        let text = lexer.source_range(first.position.offset, last.position.offset + 1);
        assert_eq!(text, source.trim_end_matches(' '));
    }

    #[test]
    fn test_rune_literal() {
        let mut lexer = Lexer::new("t.gsx", r"'a' '\n'");
        let t = lexer.next_token();
        assert_eq!((t.kind, t.literal.as_str()), (TokenKind::Rune, "a"));
        let t = lexer.next_token();
        assert_eq!((t.kind, t.literal.as_str()), (TokenKind::Rune, "\\n"));
    }

    #[test]
    fn test_stray_character_recovers() {
        let mut lexer = Lexer::new("t.gsx", "# x");
        let t = lexer.next_token();
        assert_eq!(t.kind, TokenKind::Error);
        let t = lexer.next_token();
        assert_eq!((t.kind, t.literal.as_str()), (TokenKind::Ident, "x"));
        assert!(lexer.take_diagnostics().has_errors());
    }
}
