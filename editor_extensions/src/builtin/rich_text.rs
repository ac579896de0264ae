//! Plain typing behaviour: inserting text, deleting characters and splitting
//! paragraphs.

use super::{block_of, ensure_text_caret, text_len};
use crate::error::Result;
use crate::extension::Extension;
use quire_core::{
    CommandPriority, Draft, Editor, NodeKey, Point, Result as EditorResult, Selection,
    DELETE_CHARACTER, INSERT_PARAGRAPH, INSERT_TEXT, PARAGRAPH, TAG_DELETING, TAG_TYPING,
};
use quire_reactive::Disposer;

pub const NAME: &str = "rich-text";

pub fn extension() -> Result<Extension> {
    Extension::builder(NAME)
        .register(|ctx, _| {
            let editor = ctx.editor();
            Ok(Disposer::merge([
                editor.register_command(&INSERT_TEXT, CommandPriority::Editor, |editor, text| {
                    handled(editor, "insert text", |d| insert_text(d, text))
                }),
                editor.register_command(&DELETE_CHARACTER, CommandPriority::Editor, |editor, backward| {
                    handled(editor, "delete character", |d| delete_character(d, *backward))
                }),
                editor.register_command(&INSERT_PARAGRAPH, CommandPriority::Editor, |editor, _| {
                    handled(editor, "insert paragraph", insert_paragraph)
                }),
            ]))
        })
        .define()
}

/// Runs an update for a command. Returns whether anything was done.
fn handled(editor: &Editor, what: &str, f: impl FnOnce(&mut Draft) -> EditorResult<bool>) -> bool {
    match editor.update(f) {
        Ok(done) => done,
        Err(err) => {
            log::warn!("{} failed: {}", what, err);
            false
        }
    }
}

/// Removes the selected range when both ends are in one text node and
/// returns the resulting caret.
fn collapse_selection(d: &mut Draft) -> EditorResult<Option<Point>> {
    let Some(selection) = d.selection().copied() else {
        return Ok(None);
    };
    if !selection.has_selection() {
        return Ok(None);
    }
    let key = selection.focus.key;
    match selection.range_in(key) {
        Some((start, end)) => {
            d.remove_text(key, start, end)?;
            let caret = Point::new(key, start);
            d.set_selection(Some(Selection::new(caret)))?;
            Ok(Some(caret))
        }
        // Ranges across nodes collapse to the focus.
        None => {
            d.set_selection(Some(Selection::new(selection.focus)))?;
            Ok(None)
        }
    }
}

pub(crate) fn insert_text(d: &mut Draft, text: &str) -> EditorResult<bool> {
    if text.is_empty() {
        return Ok(false);
    }
    collapse_selection(d)?;
    let caret = ensure_text_caret(d)?;
    let offset = caret.offset.min(text_len(d, caret.key));
    d.insert_text(caret.key, offset, text)?;
    d.set_selection(Some(Selection::new(Point::new(
        caret.key,
        offset + text.chars().count(),
    ))))?;
    d.add_tag(TAG_TYPING);
    Ok(true)
}

fn delete_character(d: &mut Draft, backward: bool) -> EditorResult<bool> {
    if collapse_selection(d)?.is_some() {
        d.add_tag(TAG_DELETING);
        return Ok(true);
    }
    let Some(caret) = super::text_caret(d) else {
        return Ok(false);
    };
    let len = text_len(d, caret.key);
    let offset = caret.offset.min(len);
    let deleted = if backward {
        delete_backward(d, caret.key, offset)?
    } else {
        delete_forward(d, caret.key, offset, len)?
    };
    if deleted {
        d.add_tag(TAG_DELETING);
    }
    Ok(deleted)
}

fn neighbour_text(d: &Draft, key: NodeKey, before: bool) -> Option<NodeKey> {
    let nodes = d.text_nodes();
    let index = nodes.iter().position(|&k| k == key)?;
    if before {
        index.checked_sub(1).map(|i| nodes[i])
    } else {
        nodes.get(index + 1).copied()
    }
}

fn delete_backward(d: &mut Draft, key: NodeKey, offset: usize) -> EditorResult<bool> {
    if offset > 0 {
        d.remove_text(key, offset - 1, offset)?;
        d.set_selection(Some(Selection::new(Point::new(key, offset - 1))))?;
        return Ok(true);
    }
    let Some(prev) = neighbour_text(d, key, true) else {
        return Ok(false);
    };
    let prev_len = text_len(d, prev);
    if block_of(d, prev) == block_of(d, key) {
        if prev_len == 0 {
            return Ok(false);
        }
        d.remove_text(prev, prev_len - 1, prev_len)?;
        d.set_selection(Some(Selection::new(Point::new(prev, prev_len - 1))))?;
    } else {
        merge_blocks(d, prev, key)?;
        d.set_selection(Some(Selection::new(Point::new(prev, prev_len))))?;
    }
    Ok(true)
}

fn delete_forward(d: &mut Draft, key: NodeKey, offset: usize, len: usize) -> EditorResult<bool> {
    if offset < len {
        d.remove_text(key, offset, offset + 1)?;
        return Ok(true);
    }
    let Some(next) = neighbour_text(d, key, false) else {
        return Ok(false);
    };
    if block_of(d, next) == block_of(d, key) {
        if text_len(d, next) == 0 {
            return Ok(false);
        }
        d.remove_text(next, 0, 1)?;
    } else {
        merge_blocks(d, key, next)?;
    }
    Ok(true)
}

/// Moves the children of `from`'s block to the end of `into`'s block and
/// removes the emptied block.
fn merge_blocks(d: &mut Draft, into: NodeKey, from: NodeKey) -> EditorResult<()> {
    let (Some(target), Some(source)) = (block_of(d, into), block_of(d, from)) else {
        return Ok(());
    };
    if d.is_ancestor_or_self(source, target) || d.is_ancestor_or_self(target, source) {
        return Ok(());
    }
    for child in d.children(source).to_vec() {
        d.move_node(child, target, None)?;
    }
    d.remove_node(source)
}

fn insert_paragraph(d: &mut Draft) -> EditorResult<bool> {
    collapse_selection(d)?;
    let caret = ensure_text_caret(d)?;
    let Some(block) = block_of(d, caret.key) else {
        return Ok(false);
    };
    let Some(container) = d.parent(block) else {
        // The caret sits directly under the root.
        let root = d.root();
        let paragraph = d.create_element(PARAGRAPH, root, None)?;
        let text = d.create_text(paragraph, None, "")?;
        d.set_selection(Some(Selection::new(Point::new(text, 0))))?;
        return Ok(true);
    };

    let right = d.split_text(caret.key, caret.offset)?;
    // The child of `block` that holds the caret; everything after it moves.
    let top = std::iter::once(right)
        .chain(d.ancestors(right))
        .find(|&k| d.parent(k) == Some(block))
        .unwrap_or(right);
    let index = d.index_in_parent(block).map(|i| i + 1);
    let paragraph = d.create_element(PARAGRAPH, container, index)?;
    let position = d.index_in_parent(top).unwrap_or(0);
    for child in d.children(block)[position..].to_vec() {
        d.move_node(child, paragraph, None)?;
    }
    // Inline wrappers keep the right half inside them; start on a fresh node.
    let caret_node = if d.parent(right) == Some(paragraph) {
        right
    } else {
        d.create_text(paragraph, Some(0), "")?
    };
    d.set_selection(Some(Selection::new(Point::new(caret_node, 0))))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_util::{composed, text, type_text};

    #[test]
    fn test_typing_and_backspace() {
        let composition = composed(vec![extension().unwrap()]);
        let editor = composition.editor().unwrap();
        type_text(editor, "hello");
        assert_eq!(text(editor), "hello");

        assert!(editor.dispatch_command(&DELETE_CHARACTER, true));
        assert_eq!(text(editor), "hell");
    }

    #[test]
    fn test_enter_splits_paragraph() {
        let composition = composed(vec![extension().unwrap()]);
        let editor = composition.editor().unwrap();
        type_text(editor, "abcd");
        editor
            .update(|d| {
                let key = d.text_nodes()[0];
                d.set_selection(Some(Selection::new(Point::new(key, 2))))
            })
            .unwrap();

        assert!(editor.dispatch_command(&INSERT_PARAGRAPH, ()));
        assert_eq!(text(editor), "ab\ncd");
        type_text(editor, "X");
        assert_eq!(text(editor), "ab\nXcd");
    }

    #[test]
    fn test_backspace_at_start_merges_paragraphs() {
        let composition = composed(vec![extension().unwrap()]);
        let editor = composition.editor().unwrap();
        type_text(editor, "ab");
        editor.dispatch_command(&INSERT_PARAGRAPH, ());
        type_text(editor, "cd");
        editor
            .update(|d| {
                let key = d.text_nodes()[1];
                d.set_selection(Some(Selection::new(Point::new(key, 0))))
            })
            .unwrap();

        assert!(editor.dispatch_command(&DELETE_CHARACTER, true));
        assert_eq!(text(editor), "abcd");
        type_text(editor, "-");
        assert_eq!(text(editor), "ab-cd");
    }

    #[test]
    fn test_delete_forward() {
        let composition = composed(vec![extension().unwrap()]);
        let editor = composition.editor().unwrap();
        type_text(editor, "ab");
        editor.dispatch_command(&INSERT_PARAGRAPH, ());
        type_text(editor, "cd");
        editor
            .update(|d| {
                let key = d.text_nodes()[0];
                d.set_selection(Some(Selection::new(Point::new(key, 1))))
            })
            .unwrap();

        assert!(editor.dispatch_command(&DELETE_CHARACTER, false));
        assert_eq!(text(editor), "a\ncd");
        assert!(editor.dispatch_command(&DELETE_CHARACTER, false));
        assert_eq!(text(editor), "acd");
    }

    #[test]
    fn test_typing_replaces_selected_range() {
        let composition = composed(vec![extension().unwrap()]);
        let editor = composition.editor().unwrap();
        type_text(editor, "hello world");
        editor
            .update(|d| {
                let key = d.text_nodes()[0];
                d.set_selection(Some(Selection::with_range(
                    Point::new(key, 0),
                    Point::new(key, 5),
                )))
            })
            .unwrap();
        type_text(editor, "J");
        assert_eq!(text(editor), "J world");
    }

    #[test]
    fn test_nothing_to_delete() {
        let composition = composed(vec![extension().unwrap()]);
        let editor = composition.editor().unwrap();
        assert!(!editor.dispatch_command(&DELETE_CHARACTER, true));
    }
}
