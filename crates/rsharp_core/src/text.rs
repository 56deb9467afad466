//! Source positions.
//!
//! Tokens and diagnostics carry a `TextSpan` (start and length), syntax
//! nodes a `TextRange` (start and end). Both are byte offsets into the unit's
//! text. Lines and columns exist only for display and are computed through
//! a `LineMap`.

use std::fmt;
use std::ops::Range;

/// A byte offset into source text.
pub type TextPos = u32;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct TextSpan {
    pub start: TextPos,
    pub length: TextPos,
}

impl TextSpan {
    #[inline]
    pub fn new(start: TextPos, length: TextPos) -> Self {
        Self { start, length }
    }

    /// The span from `start` up to `end`. An `end` before `start` gives an
    /// empty span.
    #[inline]
    pub fn from_bounds(start: TextPos, end: TextPos) -> Self {
        Self::new(start, end.saturating_sub(start))
    }

    /// A zero-width span, used for tokens the parser had to synthesize.
    #[inline]
    pub fn empty(pos: TextPos) -> Self {
        Self::new(pos, 0)
    }

    /// Exclusive end offset.
    #[inline]
    pub fn end(&self) -> TextPos {
        self.start + self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The span as a slice range, for `&text[span.to_range()]`.
    #[inline]
    pub fn to_range(&self) -> Range<usize> {
        self.start as usize..self.end() as usize
    }
}

impl fmt::Debug for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

/// The extent of a syntax node, leading trivia excluded.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct TextRange {
    pub pos: TextPos,
    pub end: TextPos,
}

impl TextRange {
    #[inline]
    pub fn new(pos: TextPos, end: TextPos) -> Self {
        Self { pos, end }
    }

    #[inline]
    pub fn to_span(&self) -> TextSpan {
        TextSpan::from_bounds(self.pos, self.end)
    }
}

impl fmt::Debug for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.pos, self.end)
    }
}

/// A 1-based line and column, as printed in diagnostics: `(6,39)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct LinePosition {
    pub line: u32,
    /// Character column within the line, starting at 1.
    pub column: u32,
}

impl LinePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for LinePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.line, self.column)
    }
}

/// Line start offsets of one unit's text.
///
/// `\n`, `\r\n` and a lone `\r` each end a line. Columns count characters,
/// so the map also records where multi-byte characters continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMap {
    line_starts: Vec<TextPos>,
    /// Offsets of UTF-8 continuation bytes, ascending.
    continuation_bytes: Vec<TextPos>,
    text_len: TextPos,
}

impl LineMap {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_starts = vec![0];
        let continuation_bytes = bytes
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b & 0xC0 == 0x80)
            .map(|(i, _)| i as TextPos)
            .collect();
        let mut i = 0;
        while i < bytes.len() {
            let is_break = match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    i += 1;
                    true
                }
                b'\r' | b'\n' => true,
                _ => false,
            };
            i += 1;
            if is_break {
                line_starts.push(i as TextPos);
            }
        }
        Self {
            line_starts,
            continuation_bytes,
            text_len: bytes.len() as TextPos,
        }
    }

    /// Line and column of `pos`. Offsets past the end clamp to the end.
    pub fn position_of(&self, pos: TextPos) -> LinePosition {
        let pos = pos.min(self.text_len);
        let line = self.line_starts.partition_point(|&start| start <= pos) - 1;
        let line_start = self.line_starts[line];
        let continued = self.continuation_bytes.partition_point(|&b| b < pos)
            - self.continuation_bytes.partition_point(|&b| b < line_start);
        LinePosition {
            line: line as u32 + 1,
            column: pos - line_start - continued as u32 + 1,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_bounds() {
        let span = TextSpan::from_bounds(5, 15);
        assert_eq!(span, TextSpan::new(5, 10));
        assert_eq!(span.end(), 15);
        assert_eq!(span.to_range(), 5..15);
        assert!(TextSpan::from_bounds(7, 3).is_empty());
        assert_eq!(TextRange::new(2, 4).to_span(), TextSpan::new(2, 2));
    }

    #[test]
    fn test_positions() {
        let text = "\nclass C\n{\n    for ();\n}";
        let map = LineMap::new(text);
        assert_eq!(map.line_count(), 5);
        assert_eq!(map.position_of(0), LinePosition::new(1, 1));
        let paren = text.find(')').unwrap() as u32;
        assert_eq!(map.position_of(paren), LinePosition::new(4, 10));
        assert_eq!(map.position_of(paren).to_string(), "(4,10)");
    }

    #[test]
    fn test_mixed_line_breaks() {
        let map = LineMap::new("a\r\nb\rc\nd");
        assert_eq!(map.line_count(), 4);
        assert_eq!(map.position_of(3), LinePosition::new(2, 1));
        assert_eq!(map.position_of(5), LinePosition::new(3, 1));
        assert_eq!(map.position_of(7), LinePosition::new(4, 1));
    }

    #[test]
    fn test_columns_count_characters() {
        let text = "string s = \"\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\"; for ();\n\u{1F600} x";
        let map = LineMap::new(text);
        let paren = text.find(')').unwrap() as u32;
        assert_eq!(map.position_of(paren), LinePosition::new(1, 26));
        let x = text.rfind('x').unwrap() as u32;
        assert_eq!(map.position_of(x), LinePosition::new(2, 3));
    }

    #[test]
    fn test_position_past_end() {
        let map = LineMap::new("ab\n");
        assert_eq!(map.position_of(3), LinePosition::new(2, 1));
        assert_eq!(map.position_of(40), LinePosition::new(2, 1));
    }
}
