//! Editor Core - Minimal rich-text host engine.
//!
//! Holds the node registry, the document tree, transactional updates, the
//! command bus and listener registration. No rendering and no serialization.

pub mod buffer;
pub mod command;
pub mod draft;
pub mod editor;
pub mod error;
pub mod history;
pub mod node;
pub mod selection;
pub mod state;

pub use buffer::TextBuffer;
pub use command::{
    Command, CommandPriority, DELETE_CHARACTER, INSERT_PARAGRAPH, INSERT_TEXT, REDO,
    SELECT_SUGGESTION, TOGGLE_COLLAPSIBLE, TOGGLE_LINK, UNDO,
};
pub use draft::Draft;
pub use editor::{Editor, EditorConfig, UpdateEvent};
pub use error::{EditorError, Result};
pub use history::{EditKind, History, TAG_DELETING, TAG_HISTORIC, TAG_TYPING};
pub use node::{Node, NodeKey, NodeType, PARAGRAPH, ROOT, TEXT};
pub use selection::{Point, Selection};
pub use state::EditorState;
pub use quire_reactive::Disposer;
