//! Text payload of text nodes, backed by ropey.

use ropey::Rope;
use std::fmt;

/// A text buffer backed by a rope data structure.
/// Clones share structure, so snapshotting a document stays cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBuffer {
    rope: Rope,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBuffer {
    /// Creates a new empty text buffer.
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Creates a text buffer from a string.
    pub fn from_str(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Returns the total number of characters in the buffer.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Inserts a string at the given character index.
    pub fn insert(&mut self, char_idx: usize, text: &str) {
        let idx = char_idx.min(self.len_chars());
        self.rope.insert(idx, text);
    }

    /// Removes text in the given character range.
    pub fn remove(&mut self, start: usize, end: usize) {
        let start = start.min(self.len_chars());
        let end = end.min(self.len_chars());
        if start < end {
            self.rope.remove(start..end);
        }
    }

    /// Returns the text in the given character range, clamped to the buffer.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.len_chars());
        let start = start.min(end);
        self.rope.slice(start..end).to_string()
    }
}

impl fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.rope.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer() {
        let buf = TextBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len_chars(), 0);
    }

    #[test]
    fn test_insert_string() {
        let mut buf = TextBuffer::new();
        buf.insert(0, "hello");
        buf.insert(5, " world");
        assert_eq!(buf.to_string(), "hello world");
    }

    #[test]
    fn test_insert_past_end_appends() {
        let mut buf = TextBuffer::from_str("ab");
        buf.insert(99, "c");
        assert_eq!(buf.to_string(), "abc");
    }

    #[test]
    fn test_remove() {
        let mut buf = TextBuffer::from_str("hello world");
        buf.remove(5, 11);
        assert_eq!(buf.to_string(), "hello");
    }

    #[test]
    fn test_slice_counts_chars() {
        let buf = TextBuffer::from_str("héllo wörld");
        assert_eq!(buf.slice(6, 11), "wörld");
        assert_eq!(buf.slice(8, 100), "rld");
        assert_eq!(buf.slice(9, 3), "");
    }
}
