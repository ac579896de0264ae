//! Selection handling.

use crate::node::NodeKey;

/// A position inside a node: a character offset for text nodes, a child
/// index for elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
}

impl Point {
    pub fn new(key: NodeKey, offset: usize) -> Self {
        Self { key, offset }
    }
}

/// A selection between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// The anchor point (where selection started).
    pub anchor: Point,
    /// The focus point (where the caret is).
    pub focus: Point,
}

impl Selection {
    /// Creates a collapsed selection (a caret) at the given point.
    pub fn new(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
        }
    }

    /// Creates a selection from anchor to focus.
    pub fn with_range(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    /// Returns true if the selection spans something (anchor != focus).
    pub fn has_selection(&self) -> bool {
        self.anchor != self.focus
    }

    /// Collapses the selection to the focus point.
    pub fn collapse(&mut self) {
        self.anchor = self.focus;
    }

    /// Returns true if either end of the selection is in `key`.
    pub fn touches(&self, key: NodeKey) -> bool {
        self.anchor.key == key || self.focus.key == key
    }

    /// Returns the (start, end) offsets when both ends are in the same node.
    pub fn range_in(&self, key: NodeKey) -> Option<(usize, usize)> {
        if self.anchor.key != key || self.focus.key != key {
            return None;
        }
        let (a, b) = (self.anchor.offset, self.focus.offset);
        Some((a.min(b), a.max(b)))
    }
}
