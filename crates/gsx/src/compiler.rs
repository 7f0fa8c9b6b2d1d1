// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The compilation pipeline.
//!
//! [`compile`] wires the stages together: lex + parse, analyze, generate,
//! post-process. One call compiles one file; every invocation creates fresh
//! lexer, parser, analyzer, and generator state, so callers may freely
//! parallelize across files.
//!
//! On user-level errors the pipeline still returns a [`Bundle`] whose
//! `generated` text is empty and whose diagnostics list every problem found.
//! Only formatter failures (and I/O at the CLI layer) are fatal.

use crate::analyzer::analyze;
use crate::codegen::generate;
use crate::error::{Diagnostics, Result};
use crate::format::{Formatter, Passthrough};
use crate::parser::parse_file;
use crate::sourcemap::SourceMap;
use tracing::debug;

/// The result of compiling one template file.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Generated Go source; empty when error-severity diagnostics exist.
    pub generated: String,
    /// Mappings from generated lines back to the template source.
    pub source_map: SourceMap,
    /// Every problem discovered, in source order per pass.
    pub diagnostics: Diagnostics,
}

impl Bundle {
    /// True when any diagnostic has error severity.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// The output file name for a template path (`app.gsx` -> `app.gsx.go`).
pub fn output_path(input: &str) -> String {
    format!("{input}.go")
}

/// Compiles a template without external post-processing.
pub fn compile(filename: &str, source: &str) -> Result<Bundle> {
    compile_with(filename, source, &Passthrough)
}

/// Compiles a template and pipes the generated code through `formatter`.
///
/// The formatter may change the import block's line count; the source map
/// is shifted by exactly that delta. Reflows elsewhere degrade lookups to
/// the closest prior mapping (see [`SourceMap`]).
pub fn compile_with(filename: &str, source: &str, formatter: &dyn Formatter) -> Result<Bundle> {
    let (mut file, mut diagnostics) = parse_file(filename, source);
    diagnostics.extend(analyze(&mut file));

    if diagnostics.has_errors() {
        debug!(file = filename, count = diagnostics.len(), "not generating");
        return Ok(Bundle {
            generated: String::new(),
            source_map: SourceMap::new(filename),
            diagnostics,
        });
    }

    let generated = generate(&file);
    let mut source_map = generated.source_map;

    let pre_span = import_block_span(&generated.code);
    let formatted = formatter.format(&generated.code)?;
    if let (Some((pre_start, pre_end)), Some((post_start, post_end))) =
        (pre_span, import_block_span(&formatted))
    {
        let delta = (post_end - post_start) as isize - (pre_end - pre_start) as isize;
        source_map.shift_from(pre_end + 1, delta);
    }

    Ok(Bundle {
        generated: formatted,
        source_map,
        diagnostics,
    })
}

/// 1-indexed (first, last) lines of the import block, if any.
fn import_block_span(code: &str) -> Option<(usize, usize)> {
    let mut start = None;
    for (idx, line) in code.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim_start();
        match start {
            None => {
                if trimmed.starts_with("import (") {
                    start = Some(line_no);
                } else if trimmed.starts_with("import ") {
                    return Some((line_no, line_no));
                }
            }
            Some(first) => {
                if trimmed.starts_with(')') {
                    return Some((first, line_no));
                }
            }
        }
    }
    start.map(|first| (first, first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as GsxResult;

    #[test]
    fn test_compile_hello() {
        let bundle = compile("hello.gsx", "package x\ntempl Hello() { <span>Hello World</span> }\n")
            .unwrap();
        assert!(!bundle.has_errors());
        assert!(bundle.generated.contains("func Hello() HelloView {"));
        assert!(!bundle.source_map.is_empty());
    }

    #[test]
    fn test_errors_suppress_output() {
        let bundle = compile("bad.gsx", "package x\ntempl T() { <badTag/> }\n").unwrap();
        assert!(bundle.has_errors());
        assert!(bundle.generated.is_empty());
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path("app.gsx"), "app.gsx.go");
    }

    #[test]
    fn test_import_block_span() {
        let code = "package x\n\nimport (\n\ttui \"t\"\n\t\"fmt\"\n)\n\nfunc f() {}\n";
        assert_eq!(import_block_span(code), Some((3, 6)));
        let single = "package x\nimport \"fmt\"\n";
        assert_eq!(import_block_span(single), Some((2, 2)));
        assert_eq!(import_block_span("package x\n"), None);
    }

    #[test]
    fn test_formatter_delta_shifts_source_map() {
        // A formatter that adds one line to the import block.
        struct AddImport;
        impl Formatter for AddImport {
            fn format(&self, source: &str) -> GsxResult<String> {
                Ok(source.replace("import (\n", "import (\n\t\"fmt\"\n"))
            }
        }

        let source = "package x\ntempl Hello() { <span>Hello World</span> }\n";
        let plain = compile("h.gsx", source).unwrap();
        let shifted = compile_with("h.gsx", source, &AddImport).unwrap();

        let plain_lookup = |needle: &str, bundle: &Bundle| {
            let line = bundle
                .generated
                .lines()
                .position(|l| l.contains(needle))
                .unwrap()
                + 1;
            bundle.source_map.lookup(line).map(|m| m.gsx_line)
        };
        let needle = "tui.NewElement";
        assert_eq!(
            plain_lookup(needle, &plain),
            plain_lookup(needle, &shifted),
            "mapping must follow the import-block shift"
        );
    }
}
