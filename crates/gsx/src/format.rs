// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! External formatter and import-fixer integration.
//!
//! The generator's output is valid but unpolished Go; the host toolchain's
//! `goimports` normalizes spacing and fixes the import block. The compiler
//! core treats that step as an opaque function on bytes behind the
//! [`Formatter`] trait, so tests (and callers that post-process elsewhere)
//! can substitute [`Passthrough`].
//!
//! A formatter failure is the one fatal error of the generation stage: if
//! the tool rejects the output, the compile returns
//! [`GsxError::Format`](crate::error::GsxError::Format) instead of a bundle.

use crate::error::{GsxError, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

/// Formats generated source. Implementations must be pure with respect to
/// the compiler: same input bytes, same output bytes.
pub trait Formatter {
    /// Formats `source`, returning the rewritten text.
    fn format(&self, source: &str) -> Result<String>;
}

/// Identity formatter used by tests and by callers that defer formatting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Formatter for Passthrough {
    fn format(&self, source: &str) -> Result<String> {
        Ok(source.to_string())
    }
}

/// Pipes the source through `goimports`, falling back to `gofmt` when
/// `goimports` is not installed.
#[derive(Debug, Clone)]
pub struct GoImports {
    primary: String,
    fallback: String,
}

impl Default for GoImports {
    fn default() -> Self {
        Self::new()
    }
}

impl GoImports {
    /// Uses the standard tool names from `PATH`.
    pub fn new() -> Self {
        Self {
            primary: "goimports".to_string(),
            fallback: "gofmt".to_string(),
        }
    }

    /// Overrides the tool names. Used by tests.
    pub fn with_tools(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    fn run_tool(tool: &str, source: &str) -> std::io::Result<Result<String>> {
        let mut child = Command::new(tool)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(stdin) = child.stdin.as_mut() {
            // A tool that exits early closes its stdin; the exit status is
            // what matters, not the broken pipe.
            let _ = stdin.write_all(source.as_bytes());
        }
        let output = child.wait_with_output()?;

        if output.status.success() {
            match String::from_utf8(output.stdout) {
                Ok(formatted) => Ok(Ok(formatted)),
                Err(_) => Ok(Err(GsxError::Format {
                    tool: tool.to_string(),
                    message: "tool produced non-UTF-8 output".to_string(),
                })),
            }
        } else {
            Ok(Err(GsxError::Format {
                tool: tool.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }))
        }
    }
}

impl Formatter for GoImports {
    fn format(&self, source: &str) -> Result<String> {
        match Self::run_tool(&self.primary, source) {
            Ok(result) => result,
            Err(spawn_err) => {
                debug!(tool = %self.primary, error = %spawn_err, "falling back");
                match Self::run_tool(&self.fallback, source) {
                    Ok(result) => result,
                    Err(_) => Err(GsxError::FormatterUnavailable(format!(
                        "neither {} nor {} could be run",
                        self.primary, self.fallback
                    ))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_is_identity() {
        let source = "package x\n\nfunc main() {}\n";
        assert_eq!(Passthrough.format(source).unwrap(), source);
    }

    #[test]
    fn test_missing_tools_report_unavailable() {
        let formatter = GoImports::with_tools("gsx-no-such-tool", "gsx-no-such-tool-either");
        let err = formatter.format("package x\n").unwrap_err();
        assert!(matches!(err, GsxError::FormatterUnavailable(_)));
    }

    #[test]
    fn test_failing_tool_reports_format_error() {
        // `false` exists everywhere, accepts stdin, and exits non-zero.
        let formatter = GoImports::with_tools("false", "false");
        let err = formatter.format("package x\n").unwrap_err();
        assert!(matches!(err, GsxError::Format { .. }));
    }
}
