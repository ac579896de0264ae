//! Immutable document snapshots.

use crate::node::{Node, NodeKey, NodeType, PARAGRAPH, ROOT};
use crate::selection::Selection;
use std::collections::BTreeMap;

/// A committed document: the node tree plus the selection.
///
/// States are never mutated after commit. Updates work on a clone inside a
/// [`Draft`](crate::Draft) and replace the whole state when they succeed.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub(crate) nodes: BTreeMap<NodeKey, Node>,
    pub(crate) root: NodeKey,
    pub(crate) selection: Option<Selection>,
    pub(crate) next_key: u64,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorState {
    /// A document holding a single empty paragraph.
    pub fn new() -> Self {
        let root = NodeKey(0);
        let paragraph = NodeKey(1);
        let mut nodes = BTreeMap::new();
        let mut root_node = Node::element(root, ROOT, None);
        root_node.children.push(paragraph);
        nodes.insert(root, root_node);
        nodes.insert(paragraph, Node::element(paragraph, PARAGRAPH, Some(root)));
        Self {
            nodes,
            root,
            selection: None,
            next_key: 2,
        }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(&key)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.node(key).and_then(|n| n.parent)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.node(key).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Position of `key` among its parent's children.
    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|&c| c == key)
    }

    /// Parents of `key`, nearest first.
    pub fn ancestors(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut current = self.parent(key);
        while let Some(k) = current {
            out.push(k);
            current = self.parent(k);
        }
        out
    }

    /// Returns true if `ancestor` is `key` or one of its parents.
    pub fn is_ancestor_or_self(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        ancestor == key || self.ancestors(key).contains(&ancestor)
    }

    /// Finds the nearest ancestor (or `key` itself) of the given type.
    pub fn find_ancestor_of_type(&self, key: NodeKey, kinds: &[NodeType]) -> Option<NodeKey> {
        std::iter::once(key)
            .chain(self.ancestors(key))
            .find(|k| self.node(*k).is_some_and(|n| kinds.contains(&n.kind)))
    }

    /// All nodes below `key` in document order, excluding `key`.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.children(key).iter().rev().copied().collect();
        while let Some(k) = stack.pop() {
            out.push(k);
            stack.extend(self.children(k).iter().rev().copied());
        }
        out
    }

    /// Every text node in document order.
    pub fn text_nodes(&self) -> Vec<NodeKey> {
        self.descendants(self.root)
            .into_iter()
            .filter(|k| self.node(*k).is_some_and(Node::is_text))
            .collect()
    }

    pub fn nodes_of_type(&self, kind: NodeType) -> Vec<NodeKey> {
        self.descendants(self.root)
            .into_iter()
            .filter(|k| self.node(*k).is_some_and(|n| n.kind == kind))
            .collect()
    }

    /// Text of a single text node.
    pub fn node_text(&self, key: NodeKey) -> Option<String> {
        self.node(key)
            .and_then(|n| n.text.as_ref())
            .map(|t| t.to_string())
    }

    /// Text content of the subtree under `key`. Adjacent children are joined
    /// with a newline whenever either of them is a block.
    pub fn text_content_of(&self, key: NodeKey) -> String {
        let Some(node) = self.node(key) else {
            return String::new();
        };
        if let Some(text) = &node.text {
            return text.to_string();
        }
        let mut out = String::new();
        let mut prev_block: Option<bool> = None;
        for &child in &node.children {
            let Some(child_node) = self.node(child) else {
                continue;
            };
            let block = !child_node.kind.is_inline();
            if let Some(prev) = prev_block {
                if prev || block {
                    out.push('\n');
                }
            }
            out.push_str(&self.text_content_of(child));
            prev_block = Some(block);
        }
        out
    }

    /// Text content of the whole document.
    pub fn text_content(&self) -> String {
        self.text_content_of(self.root)
    }

    /// Length of the document's text content in characters.
    pub fn text_len(&self) -> usize {
        self.text_content().chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_has_empty_paragraph() {
        let state = EditorState::new();
        let children = state.children(state.root());
        assert_eq!(children.len(), 1);
        assert_eq!(state.node(children[0]).map(|n| n.kind()), Some(PARAGRAPH));
        assert_eq!(state.text_content(), "");
        assert!(state.selection().is_none());
    }

    #[test]
    fn test_missing_nodes_are_empty() {
        let state = EditorState::new();
        assert!(state.children(NodeKey(42)).is_empty());
        assert_eq!(state.text_content_of(NodeKey(42)), "");
        assert!(state.ancestors(NodeKey(42)).is_empty());
    }
}
