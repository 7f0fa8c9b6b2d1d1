// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Token types for the GSX lexer and parser.
//!
//! Tokens are the atomic syntactic units produced by [`crate::lexer::Lexer`]
//! and consumed by [`crate::parser::Parser`]. Every token carries a
//! [`Position`] whose byte offset anchors raw-source capture: the parser can
//! slice the original input between two token offsets to recover host-language
//! expressions verbatim.
//!
//! Comments are *not* tokens. The lexer buffers them and hands them to the
//! parser through `consume_comments`, which attaches them to AST nodes as
//! leading, trailing, or orphan groups.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in a GSX source file.
///
/// Lines and columns are 1-indexed. `offset` is the byte offset from the
/// start of the source and is monotone in source order within a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// The file the position points into.
    pub file: String,
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number.
    pub column: usize,
    /// Byte offset from the start of the source.
    pub offset: usize,
}

impl Position {
    /// Creates a new position.
    pub fn new(file: impl Into<String>, line: usize, column: usize, offset: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// The kind of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Punctuation
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `</` - opens a closing tag.
    LtSlash,
    /// `/>` - self-closing tag terminator.
    SlashGt,
    /// `/`
    Slash,
    /// `=`
    Assign,
    /// `:=`
    Declare,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `.`
    Dot,
    /// Any other operator or operator pair (`+`, `&&`, `<-`, ...). The
    /// literal carries the exact characters; raw capture only needs the
    /// token's byte offsets.
    Op,

    // Host-language keywords relevant to parsing
    /// `package`
    Package,
    /// `import`
    Import,
    /// `func`
    Func,
    /// `type`
    Type,
    /// `const`
    Const,
    /// `var`
    Var,
    /// `if`
    If,
    /// `else`
    Else,
    /// `for`
    For,
    /// `range`
    Range,
    /// `return`
    Return,

    // DSL keywords
    /// `templ`
    Templ,
    /// `@let`
    AtLet,
    /// `@for`
    AtFor,
    /// `@if`
    AtIf,
    /// `@else`
    AtElse,
    /// `@Name` - component call; the literal is the name without `@`.
    ComponentCall,
    /// `@name` - component expression; the literal is the name without `@`.
    ComponentExpr,

    // Literals
    /// Double-quoted string literal. The literal holds the unescaped value.
    String,
    /// Back-tick raw string literal, escapes untouched.
    RawString,
    /// Single-quoted rune literal.
    Rune,
    /// Integer literal.
    Int,
    /// Float literal (has `.` or exponent).
    Float,

    /// Identifier.
    Ident,
    /// Line break. Preserved so the parser can detect end-of-statement and
    /// blank lines between siblings.
    Newline,
    /// End of input.
    Eof,
    /// A lexical error; the literal holds the offending text.
    Error,
}

/// One lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// The token's text. For strings this is the unescaped value; for
    /// everything else it is the raw source spelling.
    pub literal: String,
    /// Where the token starts. `position.offset` is the start byte offset
    /// used for raw-source capture.
    pub position: Position,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, literal: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            literal: literal.into(),
            position,
        }
    }

    /// True for kinds that terminate the token stream.
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

/// Looks up the token kind for an identifier, returning a keyword kind when
/// the identifier is one of the host or DSL keywords.
pub fn lookup_keyword(ident: &str) -> TokenKind {
    match ident {
        "package" => TokenKind::Package,
        "import" => TokenKind::Import,
        "func" => TokenKind::Func,
        "type" => TokenKind::Type,
        "const" => TokenKind::Const,
        "var" => TokenKind::Var,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "range" => TokenKind::Range,
        "return" => TokenKind::Return,
        "templ" => TokenKind::Templ,
        _ => TokenKind::Ident,
    }
}

/// A source comment, buffered by the lexer rather than emitted as a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// The comment text including its delimiters (`//` or `/* */`).
    pub text: String,
    /// Where the comment starts.
    pub position: Position,
    /// The line the comment ends on. Differs from `position.line` for
    /// multi-line block comments.
    pub end_line: usize,
    /// The column just past the comment's final character.
    pub end_column: usize,
    /// True for `/* */` comments.
    pub is_block: bool,
}

/// A contiguous run of comments with no blank line between them.
///
/// Two comments are in the same group if the previous comment's end line is
/// within one line of the current comment's start line. This handles
/// multi-line block comments cleanly; there is no lookahead.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommentGroup {
    /// The comments in this group, in source order.
    pub comments: Vec<Comment>,
}

impl CommentGroup {
    /// True when the group holds no comments.
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// The start position of the first comment, if any.
    pub fn position(&self) -> Option<&Position> {
        self.comments.first().map(|c| &c.position)
    }
}

/// Groups a flat run of comments by blank-line separation.
pub fn group_comments(comments: Vec<Comment>) -> Vec<CommentGroup> {
    let mut groups: Vec<CommentGroup> = Vec::new();

    for comment in comments {
        let start_new = match groups.last().and_then(|g| g.comments.last()) {
            Some(prev) => comment.position.line > prev.end_line + 1,
            None => true,
        };
        if start_new {
            groups.push(CommentGroup::default());
        }
        groups
            .last_mut()
            .expect("group pushed above")
            .comments
            .push(comment);
    }

    groups
}
