//! Line-oriented input with push-back
//!
//! Block parsers read one line at a time, look at it, and sometimes decide that
//! the line belongs to the next block. [`LineSource`] is that contract: take a
//! line, give it back, and report the 1-based number of the line most recently
//! taken. [`LineCursor`] is the root implementation over a split source text;
//! dialect parsers stack their own filtering sources on top of it.

use std::collections::VecDeque;

/// A stream of lines that can be pushed back onto.
pub trait LineSource<'a> {
    /// Next line, pushed-back lines first.
    fn advance(&mut self) -> Option<&'a str>;

    /// Give a line back; the next [`advance`](Self::advance) returns it again.
    fn push_back(&mut self, line: &'a str);

    /// 1-based number of the most recently taken line.
    fn lineno(&self) -> usize;
}

/// Cursor over the lines of one source text.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    lines: Vec<&'a str>,
    position: usize,
    pushed: VecDeque<&'a str>,
    lineno: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(lines: Vec<&'a str>) -> Self {
        LineCursor {
            lines,
            position: 0,
            pushed: VecDeque::new(),
            lineno: 0,
        }
    }

    /// Split normalized text on `\n`; see [`crate::common::text::split_lines`].
    pub fn from_text(text: &'a str) -> Self {
        LineCursor::new(text.split('\n').collect())
    }

    pub fn peek(&self) -> Option<&'a str> {
        self.pushed
            .front()
            .copied()
            .or_else(|| self.lines.get(self.position).copied())
    }

    pub fn is_exhausted(&self) -> bool {
        self.pushed.is_empty() && self.position >= self.lines.len()
    }
}

impl<'a> LineSource<'a> for LineCursor<'a> {
    fn advance(&mut self) -> Option<&'a str> {
        let line = match self.pushed.pop_front() {
            Some(line) => line,
            None => {
                let line = *self.lines.get(self.position)?;
                self.position += 1;
                line
            }
        };
        self.lineno += 1;
        Some(line)
    }

    fn push_back(&mut self, line: &'a str) {
        self.pushed.push_back(line);
        self.lineno = self.lineno.saturating_sub(1);
    }

    fn lineno(&self) -> usize {
        self.lineno
    }
}

impl<'a> Iterator for LineCursor<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_back_is_returned_first() {
        let mut cursor = LineCursor::from_text("a\nb\nc");
        assert_eq!(cursor.advance(), Some("a"));
        assert_eq!(cursor.advance(), Some("b"));
        assert_eq!(cursor.lineno(), 2);
        cursor.push_back("b");
        assert_eq!(cursor.lineno(), 1);
        assert_eq!(cursor.peek(), Some("b"));
        assert_eq!(cursor.advance(), Some("b"));
        assert_eq!(cursor.advance(), Some("c"));
        assert_eq!(cursor.lineno(), 3);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.advance(), None);
        assert_eq!(cursor.lineno(), 3);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        let mut cursor = LineCursor::from_text("");
        assert_eq!(cursor.advance(), Some(""));
        assert!(cursor.is_exhausted());
    }
}
