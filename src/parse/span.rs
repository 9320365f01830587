//! Source positions and spans.
//!
//! Every token carries a [`SourceSpan`] recording where it appeared: byte
//! offset, line and column for both ends. Columns are counted in characters
//! (UTF-8 code points), not bytes.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;

/// A single position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    /// Byte offset from the start of the input (0-based).
    pub offset: usize,
    /// Line number (1-based).
    pub line: usize,
    /// Column number (1-based, in characters).
    pub column: usize,
}

impl SourcePosition {
    pub const fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// The very beginning of a source text.
    pub const fn origin() -> Self {
        Self::new(0, 1, 1)
    }
}

impl Ord for SourcePosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.offset
            .cmp(&other.offset)
            .then(self.line.cmp(&other.line))
            .then(self.column.cmp(&other.column))
    }
}

impl PartialOrd for SourcePosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A contiguous region of source text. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceSpan {
    pub fn new(start: SourcePosition, end: SourcePosition) -> Self {
        debug_assert!(start <= end, "span start {start} after end {end}");
        Self { start, end }
    }

    /// Zero-width span at a single position.
    pub const fn point(pos: SourcePosition) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn range(&self) -> Range<usize> {
        self.start.offset..self.end.offset
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Resolves byte offsets into line/column positions for one source text.
pub struct LineIndex<'a> {
    text: &'a str,
    /// Byte offsets where each line starts. Always begins with 0.
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            line_starts: compute_line_starts(text.as_bytes()),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset into a position. Offsets past the end clamp to
    /// the end of the text.
    pub fn position(&self, offset: usize) -> SourcePosition {
        let offset = offset.min(self.text.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_bytes = &self.text.as_bytes()[self.line_starts[line_idx]..offset];
        // Every byte that is not a UTF-8 continuation byte starts a character.
        let chars = line_bytes.iter().filter(|&&b| (b & 0xC0) != 0x80).count();
        SourcePosition::new(offset, line_idx + 1, chars + 1)
    }

    pub fn span(&self, range: Range<usize>) -> SourceSpan {
        SourceSpan::new(self.position(range.start), self.position(range.end))
    }
}

/// Resolves a non-decreasing sequence of offsets in one forward pass.
///
/// Each byte is visited once, however long the line. [`LineIndex`] answers
/// random lookups but rescans the line prefix for every call.
pub struct PositionCursor<'a> {
    bytes: &'a [u8],
    current: SourcePosition,
}

impl<'a> PositionCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            current: SourcePosition::origin(),
        }
    }

    /// Move forward to `offset`, clamped to the end of the text. Offsets
    /// must not decrease between calls.
    pub fn advance_to(&mut self, offset: usize) -> SourcePosition {
        let offset = offset.min(self.bytes.len());
        debug_assert!(offset >= self.current.offset, "cursor moved backwards");
        if offset > self.current.offset {
            for &byte in &self.bytes[self.current.offset..offset] {
                if byte == b'\n' {
                    self.current.line += 1;
                    self.current.column = 1;
                } else if (byte & 0xC0) != 0x80 {
                    self.current.column += 1;
                }
            }
            self.current.offset = offset;
        }
        self.current
    }

    /// Span for `range`, which must start at or after the cursor.
    pub fn span(&mut self, range: Range<usize>) -> SourceSpan {
        let start = self.advance_to(range.start);
        let end = self.advance_to(range.end);
        SourceSpan::new(start, end)
    }
}

/// Unlike a plain line splitter, this records a start after a trailing
/// newline too, so the end-of-input position lands on the following line.
fn compute_line_starts(content: &[u8]) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, &byte) in content.iter().enumerate() {
        if byte == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}
