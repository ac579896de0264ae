use crate::node::{NodeKey, NodeType};
use thiserror::Error;

pub type Result<T, E = EditorError> = std::result::Result<T, E>;

/// Errors raised by the host engine. Any error inside an update discards the
/// whole transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("node type `{0}` is not registered with this editor")]
    UnknownNodeType(NodeType),
    #[error("node {0} does not exist")]
    NodeNotFound(NodeKey),
    #[error("node {0} is not a text node")]
    NotTextNode(NodeKey),
    #[error("node {0} cannot have children")]
    NotElementNode(NodeKey),
    #[error("the root node cannot be removed or moved")]
    RootNode,
    #[error("node {node} cannot be moved into its own subtree")]
    CyclicMove { node: NodeKey },
    #[error("update requested while another update is in progress")]
    NestedUpdate,
    #[error("node transforms did not settle after {0} passes")]
    TransformLimit(usize),
    #[error("update aborted: {0}")]
    Aborted(String),
}
