//! Mutable working copy used inside an update.

use crate::error::{EditorError, Result};
use crate::node::{Node, NodeKey, NodeType, TEXT};
use crate::selection::{Point, Selection};
use crate::state::EditorState;
use std::collections::BTreeSet;
use std::ops::Deref;
use std::rc::Rc;

/// The pending state of an update.
///
/// All reads from [`EditorState`] are available through `Deref`. Every
/// mutation marks the nodes it touches dirty so registered node transforms
/// can run on them before the update commits.
#[derive(Debug)]
pub struct Draft {
    state: EditorState,
    node_types: Rc<BTreeSet<NodeType>>,
    /// Nodes dirtied since transforms last ran.
    pending: BTreeSet<NodeKey>,
    /// Nodes dirtied during the whole update.
    dirty: BTreeSet<NodeKey>,
    tags: BTreeSet<&'static str>,
    selection_changed: bool,
    replaced: bool,
}

impl Deref for Draft {
    type Target = EditorState;

    fn deref(&self) -> &EditorState {
        &self.state
    }
}

impl Draft {
    pub(crate) fn new(state: EditorState, node_types: Rc<BTreeSet<NodeType>>) -> Self {
        Self {
            state,
            node_types,
            pending: BTreeSet::new(),
            dirty: BTreeSet::new(),
            tags: BTreeSet::new(),
            selection_changed: false,
            replaced: false,
        }
    }

    /// Returns true if this update changed anything.
    pub fn is_changed(&self) -> bool {
        !self.dirty.is_empty() || self.selection_changed || self.replaced
    }

    /// Tags the update. Listeners see the tags on the resulting event.
    pub fn add_tag(&mut self, tag: &'static str) {
        self.tags.insert(tag);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Marks a node dirty so transforms for its type run again.
    pub fn mark_dirty(&mut self, key: NodeKey) {
        if self.state.contains(key) {
            self.pending.insert(key);
            self.dirty.insert(key);
        }
    }

    pub(crate) fn take_pending(&mut self) -> BTreeSet<NodeKey> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn into_parts(self) -> (EditorState, BTreeSet<NodeKey>, BTreeSet<&'static str>) {
        (self.state, self.dirty, self.tags)
    }

    fn node_mut(&mut self, key: NodeKey) -> Result<&mut Node> {
        self.state
            .nodes
            .get_mut(&key)
            .ok_or(EditorError::NodeNotFound(key))
    }

    fn text_mut(&mut self, key: NodeKey) -> Result<&mut crate::TextBuffer> {
        self.node_mut(key)?
            .text
            .as_mut()
            .ok_or(EditorError::NotTextNode(key))
    }

    fn check_element(&self, key: NodeKey) -> Result<()> {
        match self.state.node(key) {
            None => Err(EditorError::NodeNotFound(key)),
            Some(node) if node.is_text() => Err(EditorError::NotElementNode(key)),
            Some(_) => Ok(()),
        }
    }

    fn allocate_key(&mut self) -> NodeKey {
        let key = NodeKey(self.state.next_key);
        self.state.next_key += 1;
        key
    }

    fn attach(&mut self, parent: NodeKey, index: Option<usize>, child: NodeKey) -> Result<()> {
        let parent_node = self.node_mut(parent)?;
        let index = index
            .unwrap_or(parent_node.children.len())
            .min(parent_node.children.len());
        parent_node.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.mark_dirty(parent);
        self.mark_dirty(child);
        Ok(())
    }

    fn detach(&mut self, key: NodeKey) -> Result<()> {
        if let Some(parent) = self.state.parent(key) {
            self.node_mut(parent)?.children.retain(|&c| c != key);
            self.mark_dirty(parent);
        }
        self.node_mut(key)?.parent = None;
        Ok(())
    }

    /// Creates an element of a registered type under `parent`, at `index` or
    /// at the end.
    pub fn create_element(
        &mut self,
        kind: NodeType,
        parent: NodeKey,
        index: Option<usize>,
    ) -> Result<NodeKey> {
        if !self.node_types.contains(&kind) {
            return Err(EditorError::UnknownNodeType(kind));
        }
        self.check_element(parent)?;
        let key = self.allocate_key();
        self.state
            .nodes
            .insert(key, Node::element(key, kind, Some(parent)));
        self.attach(parent, index, key)?;
        Ok(key)
    }

    /// Creates a text node under `parent`, at `index` or at the end.
    pub fn create_text(&mut self, parent: NodeKey, index: Option<usize>, text: &str) -> Result<NodeKey> {
        self.check_element(parent)?;
        let key = self.allocate_key();
        self.state.nodes.insert(key, Node::text(key, parent, text));
        self.attach(parent, index, key)?;
        Ok(key)
    }

    /// Removes a node and its whole subtree.
    pub fn remove_node(&mut self, key: NodeKey) -> Result<()> {
        if key == self.state.root {
            return Err(EditorError::RootNode);
        }
        if !self.state.contains(key) {
            return Err(EditorError::NodeNotFound(key));
        }
        self.detach(key)?;
        let mut removed = self.state.descendants(key);
        removed.push(key);
        for k in &removed {
            self.state.nodes.remove(k);
            self.pending.remove(k);
            self.dirty.remove(k);
        }
        if let Some(sel) = self.state.selection {
            if removed.iter().any(|&k| sel.touches(k)) {
                self.state.selection = None;
                self.selection_changed = true;
            }
        }
        Ok(())
    }

    /// Moves a node under a new parent.
    pub fn move_node(&mut self, key: NodeKey, parent: NodeKey, index: Option<usize>) -> Result<()> {
        if key == self.state.root {
            return Err(EditorError::RootNode);
        }
        if !self.state.contains(key) {
            return Err(EditorError::NodeNotFound(key));
        }
        self.check_element(parent)?;
        if self.state.is_ancestor_or_self(key, parent) {
            return Err(EditorError::CyclicMove { node: key });
        }
        self.detach(key)?;
        self.attach(parent, index, key)
    }

    /// Wraps `key` in a new element of type `kind` placed where `key` was.
    pub fn wrap_node(&mut self, key: NodeKey, kind: NodeType) -> Result<NodeKey> {
        let parent = self.state.parent(key).ok_or(EditorError::RootNode)?;
        let index = self.state.index_in_parent(key);
        let wrapper = self.create_element(kind, parent, index)?;
        self.move_node(key, wrapper, None)?;
        Ok(wrapper)
    }

    /// Replaces an element with its children.
    pub fn unwrap_node(&mut self, key: NodeKey) -> Result<()> {
        let parent = self.state.parent(key).ok_or(EditorError::RootNode)?;
        self.check_element(key)?;
        let mut index = self.state.index_in_parent(key).unwrap_or(0);
        let children = self.state.children(key).to_vec();
        for child in children {
            self.move_node(child, parent, Some(index + 1))?;
            index += 1;
        }
        self.remove_node(key)
    }

    pub fn insert_text(&mut self, key: NodeKey, offset: usize, text: &str) -> Result<()> {
        self.text_mut(key)?.insert(offset, text);
        self.mark_dirty(key);
        Ok(())
    }

    pub fn remove_text(&mut self, key: NodeKey, start: usize, end: usize) -> Result<()> {
        self.text_mut(key)?.remove(start, end);
        self.mark_dirty(key);
        Ok(())
    }

    pub fn set_text(&mut self, key: NodeKey, text: &str) -> Result<()> {
        *self.text_mut(key)? = crate::TextBuffer::from_str(text);
        self.mark_dirty(key);
        Ok(())
    }

    /// Splits a text node at `offset`. The text after the offset moves into a
    /// new sibling, which is returned. A selection beyond the split point
    /// follows the text into the new node.
    pub fn split_text(&mut self, key: NodeKey, offset: usize) -> Result<NodeKey> {
        let node = self.state.node(key).ok_or(EditorError::NodeNotFound(key))?;
        if node.kind != TEXT {
            return Err(EditorError::NotTextNode(key));
        }
        let attrs = node.attrs.clone();
        let len = node.text.as_ref().map_or(0, |t| t.len_chars());
        let offset = offset.min(len);
        let tail = node.text.as_ref().map(|t| t.slice(offset, len)).unwrap_or_default();
        let parent = node.parent.ok_or(EditorError::RootNode)?;
        let index = self.state.index_in_parent(key).map(|i| i + 1);

        self.remove_text(key, offset, len)?;
        let right = self.create_text(parent, index, &tail)?;
        self.node_mut(right)?.attrs = attrs;

        if let Some(mut sel) = self.state.selection {
            for point in [&mut sel.anchor, &mut sel.focus] {
                if point.key == key && point.offset > offset {
                    *point = Point::new(right, point.offset - offset);
                }
            }
            self.set_selection(Some(sel))?;
        }
        Ok(right)
    }

    pub fn set_attr(&mut self, key: NodeKey, name: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        let node = self.node_mut(key)?;
        if node.attrs.get(name) != Some(&value) {
            node.attrs.insert(name.to_string(), value);
            self.mark_dirty(key);
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, key: NodeKey, name: &str) -> Result<()> {
        if self.node_mut(key)?.attrs.remove(name).is_some() {
            self.mark_dirty(key);
        }
        Ok(())
    }

    /// Sets or clears the selection. Both points must refer to live nodes.
    pub fn set_selection(&mut self, selection: Option<Selection>) -> Result<()> {
        if let Some(sel) = &selection {
            for point in [sel.anchor, sel.focus] {
                if !self.state.contains(point.key) {
                    return Err(EditorError::NodeNotFound(point.key));
                }
            }
        }
        if self.state.selection != selection {
            self.state.selection = selection;
            self.selection_changed = true;
        }
        Ok(())
    }

    /// Replaces the whole document, e.g. when restoring history. Transforms do
    /// not run on the restored nodes.
    pub fn replace_state(&mut self, state: EditorState) {
        let next_key = self.state.next_key.max(state.next_key);
        self.state = state;
        self.state.next_key = next_key;
        self.pending.clear();
        self.dirty.clear();
        self.replaced = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{PARAGRAPH, ROOT};

    const QUOTE: NodeType = NodeType::block("quote");

    fn draft() -> Draft {
        let types: BTreeSet<NodeType> = [ROOT, PARAGRAPH, TEXT, QUOTE].into_iter().collect();
        Draft::new(EditorState::new(), Rc::new(types))
    }

    fn first_paragraph(d: &Draft) -> NodeKey {
        d.children(d.root())[0]
    }

    #[test]
    fn test_create_and_read_text() {
        let mut d = draft();
        let p = first_paragraph(&d);
        let t = d.create_text(p, None, "hello").unwrap();
        d.insert_text(t, 5, " world").unwrap();
        assert_eq!(d.text_content(), "hello world");
        assert!(d.is_changed());
    }

    #[test]
    fn test_unknown_node_type_is_rejected() {
        let mut d = draft();
        let root = d.root();
        let err = d.create_element(NodeType::block("table"), root, None);
        assert_eq!(err, Err(EditorError::UnknownNodeType(NodeType::block("table"))));
    }

    #[test]
    fn test_blocks_are_joined_with_newlines() {
        let mut d = draft();
        let p = first_paragraph(&d);
        d.create_text(p, None, "one").unwrap();
        let root = d.root();
        let p2 = d.create_element(PARAGRAPH, root, None).unwrap();
        d.create_text(p2, None, "two").unwrap();
        assert_eq!(d.text_content(), "one\ntwo");
        assert_eq!(d.text_len(), 7);
    }

    #[test]
    fn test_split_text_moves_selection() {
        let mut d = draft();
        let p = first_paragraph(&d);
        let t = d.create_text(p, None, "abcdef").unwrap();
        d.set_selection(Some(Selection::new(Point::new(t, 5)))).unwrap();

        let right = d.split_text(t, 3).unwrap();
        assert_eq!(d.node_text(t).as_deref(), Some("abc"));
        assert_eq!(d.node_text(right).as_deref(), Some("def"));
        assert_eq!(d.selection().map(|s| s.focus), Some(Point::new(right, 2)));
        assert_eq!(d.children(p), &[t, right]);
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let mut d = draft();
        let p = first_paragraph(&d);
        let t = d.create_text(p, None, "quoted").unwrap();
        let root = d.root();

        let q = d.wrap_node(p, QUOTE).unwrap();
        assert_eq!(d.children(root), &[q]);
        assert_eq!(d.parent(p), Some(q));

        d.unwrap_node(q).unwrap();
        assert_eq!(d.children(root), &[p]);
        assert!(!d.contains(q));
        assert_eq!(d.parent(t), Some(p));
    }

    #[test]
    fn test_remove_node_clears_selection_inside() {
        let mut d = draft();
        let p = first_paragraph(&d);
        let t = d.create_text(p, None, "gone").unwrap();
        d.set_selection(Some(Selection::new(Point::new(t, 1)))).unwrap();
        d.remove_node(p).unwrap();
        assert!(!d.contains(t));
        assert!(d.selection().is_none());
        let root = d.root();
        assert_eq!(d.remove_node(root), Err(EditorError::RootNode));
    }

    #[test]
    fn test_move_into_own_subtree_fails() {
        let mut d = draft();
        let p = first_paragraph(&d);
        let q = d.create_element(QUOTE, p, None).unwrap();
        assert_eq!(d.move_node(p, q, None), Err(EditorError::CyclicMove { node: p }));
    }

    #[test]
    fn test_text_operations_reject_elements() {
        let mut d = draft();
        let p = first_paragraph(&d);
        assert_eq!(d.insert_text(p, 0, "x"), Err(EditorError::NotTextNode(p)));
        let t = d.create_text(p, None, "x").unwrap();
        assert_eq!(d.create_text(t, None, "y"), Err(EditorError::NotElementNode(t)));
    }
}
