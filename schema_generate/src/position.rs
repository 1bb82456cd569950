//! Byte offset to line/character mapping for schema diagnostics.
//!
//! Lines start at 1. The character counter is bumped for every byte scanned,
//! including a line feed, and reset only after the line feed has been
//! counted. A line feed therefore reports as the last character of the line
//! it terminates.

use std::fmt;

const LINE_FEED: u8 = 0x0A;

/// A 1-based line and character position within a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, character {}", self.line, self.character)
    }
}

/// The requested offset does not address a byte of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("couldn't find offset {offset} in {len} bytes")]
pub struct OffsetOutOfRange {
    pub offset: usize,
    pub len: usize,
}

/// Resolve `offset` in `source` to its 1-based line and character.
///
/// # Errors
///
/// Returns [`OffsetOutOfRange`] when `offset` is not the index of a byte in
/// `source` (this includes `offset == source.len()`).
pub fn line_and_character(source: &[u8], offset: usize) -> Result<Position, OffsetOutOfRange> {
    let out_of_range = OffsetOutOfRange {
        offset,
        len: source.len(),
    };
    if offset > source.len() {
        return Err(out_of_range);
    }

    let mut line: usize = 1;
    let mut character: usize = 0;
    for (index, byte) in source.iter().enumerate() {
        character += 1;
        if index == offset {
            return Ok(Position { line, character });
        }
        if *byte == LINE_FEED {
            line += 1;
            character = 0;
        }
    }

    Err(out_of_range)
}

/// Byte offset of a 1-based `line` and byte `column`, as reported by
/// `serde_json` errors. Column 0 maps to the start of the line.
pub(crate) fn byte_offset(source: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = if line <= 1 {
        0
    } else {
        source
            .iter()
            .enumerate()
            .filter(|(_, byte)| **byte == LINE_FEED)
            .nth(line - 2)
            .map_or(source.len(), |(index, _)| index + 1)
    };
    line_start + column.saturating_sub(1)
}
