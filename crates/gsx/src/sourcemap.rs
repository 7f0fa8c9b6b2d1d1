// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Source map generation for debugging.
//!
//! Maps lines of the generated Go file back to the `.gsx` template source.
//! Lookup is linear; the record count per file is small and lookups happen
//! only when a downstream error needs translating, never in a hot path.
//!
//! # Precision
//!
//! After emission the buffer passes through the external formatter, which
//! can change the import block's line count. [`SourceMap::shift_from`]
//! compensates for exactly that delta. If the formatter reflows other
//! regions, mappings degrade gracefully: [`SourceMap::lookup`] falls back to
//! the closest preceding mapped line.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One generated-to-source mapping record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// 1-indexed line in the generated Go file.
    pub go_line: usize,
    /// 1-indexed column in the generated Go file.
    pub go_col: usize,
    /// 1-indexed line in the `.gsx` source.
    pub gsx_line: usize,
    /// 1-indexed column in the `.gsx` source.
    pub gsx_col: usize,
    /// Length in characters of the mapped region.
    pub length: usize,
}

/// A source map for one generated file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMap {
    /// The `.gsx` file the mappings point into.
    pub file: String,
    /// Mapping records in emission order.
    pub mappings: Vec<Mapping>,
}

impl SourceMap {
    /// Creates an empty source map for `file`.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            mappings: Vec::new(),
        }
    }

    /// Records a mapping.
    pub fn record(
        &mut self,
        go_line: usize,
        go_col: usize,
        gsx_line: usize,
        gsx_col: usize,
        length: usize,
    ) {
        self.mappings.push(Mapping {
            go_line,
            go_col,
            gsx_line,
            gsx_col,
            length,
        });
    }

    /// Finds the mapping for a generated line.
    ///
    /// Prefers an exact line match; otherwise returns the mapping on the
    /// closest preceding generated line.
    pub fn lookup(&self, go_line: usize) -> Option<&Mapping> {
        if let Some(exact) = self.mappings.iter().find(|m| m.go_line == go_line) {
            return Some(exact);
        }
        self.mappings
            .iter()
            .filter(|m| m.go_line < go_line)
            .max_by_key(|m| m.go_line)
    }

    /// Shifts every mapping at or after `boundary_line` by `delta` generated
    /// lines.
    ///
    /// Used after the external formatter changes the import block's line
    /// count: `boundary_line` is the first content line after the imports.
    pub fn shift_from(&mut self, boundary_line: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        for mapping in &mut self.mappings {
            if mapping.go_line >= boundary_line {
                if delta >= 0 {
                    mapping.go_line += delta as usize;
                } else {
                    mapping.go_line = mapping.go_line.saturating_sub((-delta) as usize);
                }
            }
        }
    }

    /// Serializes the map to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The sibling map file name for a generated file path.
    pub fn map_path(generated_path: &str) -> String {
        format!("{generated_path}.map")
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
