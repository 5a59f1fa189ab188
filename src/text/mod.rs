//! Offsets, spans and line/column conversion.
//!
//! Every offset produced by the core is a UTF-8 byte offset into the buffer it
//! was computed from. Hosts that count columns differently (LSP and Monaco both
//! count UTF-16 code units) convert at the edge with the helpers below.

use serde::Serialize;

/// Half-open byte range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Inclusive on both ends, so a cursor sitting right after the last
    /// character still counts as inside.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.len()).into()
    }
}

impl From<miette::SourceSpan> for Span {
    fn from(span: miette::SourceSpan) -> Self {
        Self {
            start: span.offset(),
            end: span.offset() + span.len(),
        }
    }
}

/// Start offsets of every line in a buffer.
///
/// Lines are split on `\n`; a trailing `\r` stays part of the line text the
/// same way the editor widgets report it.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Byte offset where `line` (0-based) begins
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Text of `line` (0-based) without its line terminator
    pub fn line_text<'a>(&self, text: &'a str, line: usize) -> Option<&'a str> {
        let start = self.line_start(line)?;
        let end = match self.line_starts.get(line + 1) {
            Some(next) => next - 1,
            None => self.len,
        };
        text.get(start..end)
    }

    /// Convert a byte offset to a 0-based (line, byte column) pair.
    /// Offsets past the end clamp to the end of the buffer.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line, offset - self.line_starts[line])
    }
}

/// Byte offset to (line, UTF-16 column) conversion in one forward walk.
///
/// Offsets are expected in non-decreasing order, which is how annotations come
/// out of the scanner. An offset behind the cursor restarts the walk.
#[derive(Debug, Clone)]
pub struct Utf16Cursor<'a> {
    text: &'a str,
    offset: usize,
    line: usize,
    character: usize,
}

impl<'a> Utf16Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            line: 0,
            character: 0,
        }
    }

    /// 0-based (line, UTF-16 column) of `offset`, clamped to the buffer
    pub fn position(&mut self, offset: usize) -> (usize, usize) {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        if offset < self.offset {
            *self = Self::new(self.text);
        }
        for ch in self.text[self.offset..offset].chars() {
            if ch == '\n' {
                self.line += 1;
                self.character = 0;
            } else {
                self.character += ch.len_utf16();
            }
        }
        self.offset = offset;
        (self.line, self.character)
    }
}

/// Byte column inside `line` for a UTF-16 column.
///
/// Returns `None` when the column lies past the end of the line or in the
/// middle of a surrogate pair.
pub fn utf16_to_byte_col(line: &str, character: usize) -> Option<usize> {
    let mut units = 0;
    for (idx, ch) in line.char_indices() {
        if units == character {
            return Some(idx);
        }
        units += ch.len_utf16();
        if units > character {
            return None;
        }
    }
    (units == character).then_some(line.len())
}

/// UTF-16 column inside `line` for a byte column (clamped to the line)
pub fn byte_to_utf16_col(line: &str, col: usize) -> usize {
    line.char_indices()
        .take_while(|(idx, _)| *idx < col)
        .map(|(_, ch)| ch.len_utf16())
        .sum()
}
