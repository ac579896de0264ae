//! Typed commands dispatched through the editor's command bus.

use crate::node::NodeKey;
use std::fmt;
use std::marker::PhantomData;

/// A command identifier carrying its payload type.
pub struct Command<P> {
    id: &'static str,
    _payload: PhantomData<fn(P)>,
}

impl<P> Command<P> {
    pub const fn new(id: &'static str) -> Self {
        Self {
            id,
            _payload: PhantomData,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }
}

impl<P> fmt::Debug for Command<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command({})", self.id)
    }
}

/// Handler priority. Higher priorities run first; a handler returning `true`
/// stops propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandPriority {
    /// Default behaviour provided by core extensions.
    Editor,
    Low,
    Normal,
    High,
    Critical,
}

/// Inserts text at the selection.
pub const INSERT_TEXT: Command<String> = Command::new("insert-text");
/// Deletes one character; `true` deletes backwards.
pub const DELETE_CHARACTER: Command<bool> = Command::new("delete-character");
/// Splits the current paragraph at the selection.
pub const INSERT_PARAGRAPH: Command<()> = Command::new("insert-paragraph");
pub const UNDO: Command<()> = Command::new("undo");
pub const REDO: Command<()> = Command::new("redo");
/// Wraps the selected text node in a link to the URL, or unwraps it when `None`.
pub const TOGGLE_LINK: Command<Option<String>> = Command::new("toggle-link");
/// Opens or closes a collapsible container.
pub const TOGGLE_COLLAPSIBLE: Command<NodeKey> = Command::new("toggle-collapsible");
/// Accepts the current autocomplete suggestion.
pub const SELECT_SUGGESTION: Command<()> = Command::new("select-suggestion");
