//! Node types and document nodes.

use crate::buffer::TextBuffer;
use std::collections::BTreeMap;
use std::fmt;

/// Identifies a kind of node the editor schema knows about.
///
/// Node types are registered when the editor is constructed and cannot be
/// added afterwards. Inline types flow together inside a block; block types
/// are separated by a newline in the document's text content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeType {
    name: &'static str,
    inline: bool,
}

impl NodeType {
    pub const fn block(name: &'static str) -> Self {
        Self {
            name,
            inline: false,
        }
    }

    pub const fn inline(name: &'static str) -> Self {
        Self { name, inline: true }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The document root. Always registered.
pub const ROOT: NodeType = NodeType::block("root");
/// A paragraph block. Always registered.
pub const PARAGRAPH: NodeType = NodeType::block("paragraph");
/// A run of text. Always registered.
pub const TEXT: NodeType = NodeType::inline("text");

/// Stable identifier of a node within one editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub(crate) u64);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) key: NodeKey,
    pub(crate) kind: NodeType,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) text: Option<TextBuffer>,
    pub(crate) attrs: BTreeMap<String, String>,
}

impl Node {
    pub(crate) fn element(key: NodeKey, kind: NodeType, parent: Option<NodeKey>) -> Self {
        Self {
            key,
            kind,
            parent,
            children: Vec::new(),
            text: None,
            attrs: BTreeMap::new(),
        }
    }

    pub(crate) fn text(key: NodeKey, parent: NodeKey, text: &str) -> Self {
        Self {
            key,
            kind: TEXT,
            parent: Some(parent),
            children: Vec::new(),
            text: Some(TextBuffer::from_str(text)),
            attrs: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn kind(&self) -> NodeType {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    /// The text payload of a text node.
    pub fn text_buffer(&self) -> Option<&TextBuffer> {
        self.text.as_ref()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}
