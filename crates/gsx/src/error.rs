// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types and diagnostics for the GSX compiler.
//!
//! Two layers of error reporting exist side by side:
//!
//! - **Diagnostics**: user-level problems (bad syntax, unknown tags,
//!   unknown utility classes). These are *data*, accumulated in a
//!   [`Diagnostics`] list and returned alongside any partial output so the
//!   user sees every problem in one run.
//! - **[`GsxError`]**: fatal conditions that abort a compile, such as the
//!   external formatter rejecting the generated output.
//!
//! # Source Context
//!
//! Fatal errors and the CLI can render a [`SourceContext`] snippet showing
//! the offending code with line numbers and a caret pointing at the exact
//! column.

use crate::token::Position;
use std::fmt;
use thiserror::Error;

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// A non-fatal issue; the build still succeeds.
    Warning,
    /// A real problem; the build fails.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single user-facing problem discovered during compilation.
///
/// Diagnostics carry a start position and, for range-precise errors such as
/// unknown utility classes, an optional end position that lets editors draw
/// a squiggle under the exact offending span.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// How bad this is.
    pub severity: Severity,
    /// Where the problem starts.
    pub position: Position,
    /// Where the problem ends, when a precise range is known.
    pub end_position: Option<Position>,
    /// Human-readable description.
    pub message: String,
    /// Optional suggestion, rendered as a `hint:` line.
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Creates an error diagnostic at a position.
    pub fn error(position: Position, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            position,
            end_position: None,
            message: message.into(),
            hint: None,
        }
    }

    /// Creates a warning diagnostic at a position.
    pub fn warning(position: Position, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            position,
            end_position: None,
            message: message.into(),
            hint: None,
        }
    }

    /// Attaches an end position for range-precise reporting.
    pub fn with_end(mut self, end: Position) -> Self {
        self.end_position = Some(end);
        self
    }

    /// Attaches a `hint:` line.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.position.file, self.position.line, self.position.column, self.message
        )?;
        if let Some(hint) = &self.hint {
            write!(f, "\nhint: {}", hint)?;
        }
        Ok(())
    }
}

/// An ordered accumulator of [`Diagnostic`]s.
///
/// Every pass appends to the same list; ordering follows discovery order,
/// which matches source order within a pass.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Appends every diagnostic from another list.
    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// All accumulated diagnostics, in discovery order.
    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    /// True if any diagnostic has [`Severity::Error`].
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Source context for enhanced error messages.
///
/// Captures a snippet of template source around an error location so the
/// CLI can show the problematic code with line numbers and a caret.
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// All lines from the source file.
    pub lines: Vec<String>,
    /// The line number where the error occurred (1-indexed).
    pub error_line: usize,
    /// The column number where the error occurred (1-indexed).
    pub error_column: usize,
    /// First line number of the snippet (1-indexed).
    pub snippet_start: usize,
    /// Last line number of the snippet (1-indexed).
    pub snippet_end: usize,
}

impl SourceContext {
    /// Creates a source context from source code and error location.
    ///
    /// Captures 3 lines before and after the error line for context.
    pub fn from_source(source: &str, line: usize, column: usize) -> Self {
        let lines: Vec<String> = source.lines().map(|l| l.to_string()).collect();
        let snippet_start = line.saturating_sub(3).max(1);
        let snippet_end = (line + 3).min(lines.len());

        Self {
            lines,
            error_line: line,
            error_column: column,
            snippet_start,
            snippet_end,
        }
    }

    /// Formats the source snippet with line numbers and error indicator.
    ///
    /// Returns a string like:
    /// ```text
    ///    4 | <div class="container">
    ///    5 |   <badTag/>
    ///      |   ^
    ///    6 | </div>
    /// ```
    pub fn format_snippet(&self) -> String {
        let mut result = String::new();

        for line_num in self.snippet_start..=self.snippet_end {
            if line_num > self.lines.len() {
                break;
            }

            let line = &self.lines[line_num - 1];
            let is_error_line = line_num == self.error_line;

            result.push_str(&format!("{:4} | {}\n", line_num, line));

            if is_error_line {
                result.push_str(&format!(
                    "     | {}^\n",
                    " ".repeat(self.error_column.saturating_sub(1))
                ));
            }
        }

        result
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_snippet())
    }
}

/// The fatal error type for GSX operations.
///
/// User-level problems never appear here; they travel as [`Diagnostic`]s.
/// `GsxError` is reserved for conditions that make further work
/// meaningless.
#[derive(Error, Debug)]
pub enum GsxError {
    /// The external formatter / import fixer rejected the generated code.
    #[error("format error running {tool}: {message}")]
    Format {
        /// The tool that was invoked (`goimports`, `gofmt`).
        tool: String,
        /// What the tool reported on stderr.
        message: String,
    },

    /// The formatter binary could not be spawned at all.
    #[error("formatter unavailable: {0}")]
    FormatterUnavailable(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The source map could not be serialized.
    #[error("source map error: {0}")]
    SourceMap(#[from] serde_json::Error),

    /// The input was rejected before any partial AST could be built.
    #[error("fatal parse error in {file}: {message}")]
    FatalParse {
        /// The file being compiled.
        file: String,
        /// Description of the failure.
        message: String,
    },
}

/// Convenience type alias for Results with [`GsxError`].
pub type Result<T> = std::result::Result<T, GsxError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: usize, column: usize) -> Position {
        Position {
            file: "app.gsx".to_string(),
            line,
            column,
            offset: 0,
        }
    }

    #[test]
    fn test_diagnostic_display_with_hint() {
        let d = Diagnostic::error(pos(3, 7), "unknown utility class \"flex-columns\"")
            .with_hint("did you mean \"flex-col\"?");
        let text = d.to_string();
        assert_eq!(
            text,
            "app.gsx:3:7: unknown utility class \"flex-columns\"\nhint: did you mean \"flex-col\"?"
        );
    }

    #[test]
    fn test_diagnostics_has_errors() {
        let mut list = Diagnostics::new();
        list.push(Diagnostic::warning(pos(1, 1), "empty deps list"));
        assert!(!list.has_errors());
        list.push(Diagnostic::error(pos(2, 1), "unknown element tag <badTag>"));
        assert!(list.has_errors());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_source_context_snippet_caret() {
        let source = "package x\ntempl T() {\n  <badTag/>\n}\n";
        let ctx = SourceContext::from_source(source, 3, 3);
        let snippet = ctx.format_snippet();
        assert!(snippet.contains("   3 |   <badTag/>"));
        assert!(snippet.contains("     |   ^"));
    }
}
