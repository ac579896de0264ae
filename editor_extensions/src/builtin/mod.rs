//! Extensions shipped with Quire.

pub mod autocomplete;
pub mod auto_link;
pub mod character_limit;
pub mod collapsible;
pub mod context_menu;
pub mod floating_link;
pub mod history;
pub mod link;
pub mod max_length;
pub mod rich_text;

use crate::error::Result;
use crate::extension::Extension;
use quire_core::{Draft, EditorState, NodeKey, Point, Result as EditorResult, PARAGRAPH};

/// Every built-in extension, in an order that satisfies their requirements.
pub fn all() -> Result<Vec<Extension>> {
    Ok(vec![
        rich_text::extension()?,
        history::extension()?,
        character_limit::extension()?,
        max_length::extension()?,
        auto_link::extension()?,
        link::extension()?,
        floating_link::extension()?,
        collapsible::extension()?,
        autocomplete::extension()?,
        context_menu::extension()?,
    ])
}

/// Length of a text node in characters. Zero for elements and missing nodes.
pub(crate) fn text_len(state: &EditorState, key: NodeKey) -> usize {
    state
        .node(key)
        .and_then(|n| n.text_buffer())
        .map_or(0, |t| t.len_chars())
}

/// The nearest block element containing `key`.
pub(crate) fn block_of(state: &EditorState, key: NodeKey) -> Option<NodeKey> {
    state
        .ancestors(key)
        .into_iter()
        .find(|k| state.node(*k).is_some_and(|n| !n.kind().is_inline()))
}

/// The collapsed caret, if it sits inside a text node.
pub(crate) fn text_caret(state: &EditorState) -> Option<Point> {
    let selection = state.selection()?;
    if selection.has_selection() {
        return None;
    }
    let focus = selection.focus;
    state
        .node(focus.key)
        .is_some_and(|n| n.is_text())
        .then_some(focus)
}

/// Resolves the focus to a point inside a text node, creating an empty text
/// node when the focus is on an element or there is no selection at all.
pub(crate) fn ensure_text_caret(d: &mut Draft) -> EditorResult<Point> {
    if let Some(selection) = d.selection().copied() {
        let focus = selection.focus;
        if let Some(node) = d.node(focus.key) {
            if node.is_text() {
                return Ok(focus);
            }
            let key = d.create_text(focus.key, Some(focus.offset), "")?;
            return Ok(Point::new(key, 0));
        }
    }
    if let Some(&last) = d.text_nodes().last() {
        return Ok(Point::new(last, text_len(d, last)));
    }
    let root = d.root();
    let block = match d.children(root).last().copied() {
        Some(block) => block,
        None => d.create_element(PARAGRAPH, root, None)?,
    };
    let key = d.create_text(block, None, "")?;
    Ok(Point::new(key, 0))
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::compose::{compose, Composition};
    use crate::config::Overrides;
    use crate::extension::Extension;
    use quire_core::{Editor, INSERT_TEXT};

    pub fn composed(extensions: Vec<Extension>) -> Composition {
        compose(&extensions, Overrides::new()).unwrap()
    }

    pub fn type_text(editor: &Editor, text: &str) {
        for c in text.chars() {
            assert!(editor.dispatch_command(&INSERT_TEXT, c.to_string()));
        }
    }

    pub fn text(editor: &Editor) -> String {
        editor.state().text_content()
    }
}
