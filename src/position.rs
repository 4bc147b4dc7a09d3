//! Line/column tracking for diagnostics.
//!
//! Every token the [`crate::scanner`] recognizes and every node the
//! [`crate::parser`] builds carries a [`Span`] so that errors can point at an
//! exact place in the caller's input, unlike the teacher parser's
//! line-tracking, which only ever reported line zero for column.

use std::fmt;

/// A 1-indexed line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }

    /// The position of the very first byte of a document.
    pub const fn start() -> Self {
        Position { line: 1, column: 1 }
    }

    /// Advance this position past `text`, accounting for embedded newlines.
    pub fn advance(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::start()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A byte range plus the line/column of its start and end, used to locate a
/// lexeme inside the original input for error rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    pub byte_start: usize,
    pub byte_end: usize,
}

impl Span {
    pub fn new(start: Position, end: Position, byte_start: usize, byte_end: usize) -> Self {
        Span { start, end, byte_start, byte_end }
    }

    /// A zero-width span at `pos`/`byte_offset`, used when an error is raised
    /// before any lexeme has been consumed (e.g. "unexpected end of input").
    pub fn point(pos: Position, byte_offset: usize) -> Self {
        Span { start: pos, end: pos, byte_start: byte_offset, byte_end: byte_offset }
    }

    /// Compute the span of `lexeme`, which must be a substring of `full_input`
    /// starting at `byte_start`, walking from `start_pos`.
    pub fn of(full_input: &str, byte_start: usize, lexeme: &str, start_pos: Position) -> Self {
        let mut end_pos = start_pos;
        end_pos.advance(lexeme);
        let _ = full_input;
        Span::new(start_pos, end_pos, byte_start, byte_start + lexeme.len())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}
