//! Context menu entries derived from the current selection.

use super::auto_link::AUTOLINK;
use super::link::LINK;
use crate::error::Result;
use crate::extension::Extension;
use quire_core::{EditorState, DELETE_CHARACTER, REDO, TOGGLE_LINK, UNDO};
use quire_reactive::{Disposer, Signal};
use serde_json::json;

pub const NAME: &str = "context-menu";

/// One row of the context menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Item {
        label: &'static str,
        /// Id of the command the item dispatches.
        command: &'static str,
        enabled: bool,
    },
    Separator,
}

impl MenuEntry {
    fn item(label: &'static str, command: &'static str, enabled: bool) -> Self {
        MenuEntry::Item {
            label,
            command,
            enabled,
        }
    }

    pub fn label(&self) -> Option<&'static str> {
        match self {
            MenuEntry::Item { label, .. } => Some(*label),
            MenuEntry::Separator => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            MenuEntry::Item { enabled, .. } => *enabled,
            MenuEntry::Separator => false,
        }
    }
}

/// Output of the context-menu extension.
#[derive(Clone)]
pub struct ContextMenuOutput {
    pub entries: Signal<Vec<MenuEntry>>,
}

fn entries_for(state: &EditorState, show_link_items: bool) -> Vec<MenuEntry> {
    let selection = state.selection();
    let in_text = super::text_caret(state).is_some() || selection.is_some_and(|s| s.has_selection());
    let mut entries = vec![
        MenuEntry::item("Undo", UNDO.id(), true),
        MenuEntry::item("Redo", REDO.id(), true),
        MenuEntry::Separator,
        MenuEntry::item("Delete", DELETE_CHARACTER.id(), in_text),
    ];
    if show_link_items {
        let in_link = selection
            .and_then(|s| state.find_ancestor_of_type(s.focus.key, &[LINK, AUTOLINK]))
            .is_some();
        entries.push(MenuEntry::Separator);
        entries.push(if in_link {
            MenuEntry::item("Remove link", TOGGLE_LINK.id(), true)
        } else {
            MenuEntry::item("Insert link", TOGGLE_LINK.id(), in_text)
        });
    }
    entries
}

pub fn extension() -> Result<Extension> {
    Extension::builder(NAME)
        .config("show_link_items", json!(true))
        .build(|_| {
            Ok(ContextMenuOutput {
                entries: Signal::new(Vec::new()),
            })
        })
        .register(|ctx, output| {
            let show_link_items = ctx.config().get::<bool>("show_link_items")?;
            output
                .entries
                .set(entries_for(&ctx.editor().state(), show_link_items));

            let entries = output.entries.clone();
            let listener = ctx.editor().register_update_listener(move |_, event| {
                entries.set(entries_for(&event.next, show_link_items));
            });
            let entries = output.entries.clone();
            Ok(Disposer::merge([
                listener,
                Disposer::new(move || entries.set(Vec::new())),
            ]))
        })
        .define()
}
