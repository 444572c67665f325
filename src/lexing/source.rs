//! Source text and position tracking
//!
//! Tokens and errors carry absolute byte offsets; users read line:column positions. [`Source`]
//! keeps the text together with the byte offset of every line start, so the conversion is a
//! binary search plus a character count within a single line.
//!
//! Both lines and columns are 1-based. Columns count characters, not bytes, so multi-byte UTF-8
//! text lines up with what an editor shows.

use std::fmt;

/// A 1-based line:column position in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source text shared by every token produced from it
#[derive(Debug)]
pub struct Source {
    text: String,
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl Source {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];

        for (byte_pos, ch) in text.char_indices() {
            if ch == '\n' {
                line_starts.push(byte_pos + 1);
            }
        }

        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Convert a byte offset to a 1-based line/column position.
    ///
    /// Offsets past the end are clamped to the end of the text.
    pub fn position(&self, offset: usize) -> Position {
        let offset = self.floor_boundary(offset.min(self.text.len()));
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i - 1);

        let column = self.text[self.line_starts[line]..offset].chars().count() + 1;

        Position::new(line + 1, column)
    }

    /// Text of a 1-based line, without its line terminator.
    pub fn line_text(&self, line: usize) -> &str {
        let Some(&start) = line.checked_sub(1).and_then(|l| self.line_starts.get(l)) else {
            return "";
        };
        let end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());

        let text = &self.text[start..end];
        text.strip_suffix('\r').unwrap_or(text)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn floor_boundary(&self, mut offset: usize) -> usize {
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_first_line() {
        let source = Source::new("1 + 2");
        assert_eq!(source.position(0), Position::new(1, 1));
        assert_eq!(source.position(4), Position::new(1, 5));
    }

    #[test]
    fn test_position_after_newline() {
        let source = Source::new("a\nbc\nd");
        assert_eq!(source.position(2), Position::new(2, 1));
        assert_eq!(source.position(3), Position::new(2, 2));
        assert_eq!(source.position(5), Position::new(3, 1));
    }

    #[test]
    fn test_position_counts_characters() {
        let source = Source::new("αβ + 1");
        // 'α' and 'β' are two bytes each
        assert_eq!(source.position(5), Position::new(1, 4));
    }

    #[test]
    fn test_position_clamps_past_end() {
        let source = Source::new("ab");
        assert_eq!(source.position(99), Position::new(1, 3));
    }

    #[test]
    fn test_line_text_strips_terminators() {
        let source = Source::new("first\r\nsecond\nthird");
        assert_eq!(source.line_count(), 3);
        assert_eq!(source.line_text(1), "first");
        assert_eq!(source.line_text(2), "second");
        assert_eq!(source.line_text(3), "third");
        assert_eq!(source.line_text(4), "");
        assert_eq!(source.line_text(0), "");
    }
}
