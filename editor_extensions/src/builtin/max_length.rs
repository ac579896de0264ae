//! Keeps the document at or under a hard character limit.

use super::text_len;
use crate::error::Result;
use crate::extension::Extension;
use quire_core::{Draft, Editor, Point, Result as EditorResult, Selection, UpdateEvent, TAG_HISTORIC};
use serde_json::json;

pub const NAME: &str = "max-length";

pub fn extension() -> Result<Extension> {
    Extension::builder(NAME)
        .config("max_length", json!(280))
        .register(|ctx, _| {
            let max = ctx.config().get::<usize>("max_length")?;
            enforce_now(ctx.editor(), max);
            Ok(ctx
                .editor()
                .register_update_listener(move |editor, event| enforce(editor, event, max)))
        })
        .define()
}

fn enforce(editor: &Editor, event: &UpdateEvent, max: usize) {
    let len = event.next.text_len();
    if len <= max {
        return;
    }
    let result = if event.prev.text_len() == max {
        log::debug!("document exceeded {} characters; restoring previous state", max);
        let prev = event.prev.clone();
        editor.update(|d| {
            d.add_tag(TAG_HISTORIC);
            d.replace_state((*prev).clone());
            Ok(())
        })
    } else {
        log::debug!("document exceeded {} characters; trimming {}", max, len - max);
        editor.update(|d| trim_to(d, max))
    };
    if let Err(err) = result {
        log::warn!("failed to enforce max length: {}", err);
    }
}

fn enforce_now(editor: &Editor, max: usize) {
    if editor.state().text_len() > max {
        if let Err(err) = editor.update(|d| trim_to(d, max)) {
            log::warn!("failed to enforce max length: {}", err);
        }
    }
}

/// Removes characters from the end of the document until it fits.
fn trim_to(d: &mut Draft, max: usize) -> EditorResult<()> {
    loop {
        let len = d.text_len();
        if len <= max {
            break;
        }
        let excess = len - max;
        let last_text = d
            .text_nodes()
            .into_iter()
            .rev()
            .find(|&k| text_len(d, k) > 0);
        let last_block = d.children(d.root()).last().copied();
        match (last_text, last_block) {
            // Trailing empty blocks only add separators.
            (_, Some(block)) if d.children(d.root()).len() > 1 && d.text_content_of(block).is_empty() => {
                d.remove_node(block)?;
            }
            (Some(key), _) => {
                let node_len = text_len(d, key);
                let cut = excess.min(node_len);
                d.remove_text(key, node_len - cut, node_len)?;
            }
            _ => break,
        }
    }

    if let Some(&last) = d.text_nodes().last() {
        let end = Point::new(last, text_len(d, last));
        let valid = d.selection().is_some_and(|sel| {
            [sel.anchor, sel.focus]
                .iter()
                .all(|p| p.offset <= text_len(d, p.key) || !d.node(p.key).is_some_and(|n| n.is_text()))
        });
        if !valid {
            d.set_selection(Some(Selection::new(end)))?;
        }
    }
    Ok(())
}
