//! Positions inside an expression
//!
//! Spans are byte ranges. Nested string arguments such as the condition of
//! `d2:condition('...')` are parsed on their own and then shifted, so every span in a
//! tree points into the text the user wrote.

use std::fmt;
use std::ops::Range;

/// A byte range in the expression text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span, used for end-of-input errors
    pub const fn point(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    /// Smallest span covering both
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Re-base a span parsed from an embedded string onto the enclosing expression
    pub const fn shift(self, offset: usize) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }

    pub const fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Where a syntax error starts, as reported to whoever typed the expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    /// Counted in characters, so UIDs and display names with accents line up
    pub column: usize,
    /// Byte offset of the span start
    pub offset: usize,
}

impl SourceLocation {
    /// Resolve the start of `span` against `source`. Offsets past the end clamp to it.
    pub fn locate(source: &str, span: Span) -> Self {
        let offset = span.start.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);

        Self {
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count() + 1,
            offset: span.start,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
