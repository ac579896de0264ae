//! Explicit links created through `TOGGLE_LINK`.

use crate::error::Result;
use crate::extension::Extension;
use quire_core::{
    CommandPriority, Draft, NodeType, Point, Result as EditorResult, Selection, TOGGLE_LINK,
};
use quire_reactive::Disposer;

pub const NAME: &str = "link";

/// An inline wrapper around linked text. The target is in the `url`
/// attribute.
pub const LINK: NodeType = NodeType::inline("link");

pub fn extension() -> Result<Extension> {
    Extension::builder(NAME)
        .node(LINK)
        .register(|ctx, _| {
            let disposer: Disposer = ctx.editor().register_command(
                &TOGGLE_LINK,
                CommandPriority::Editor,
                |editor, url| match editor.update(|d| toggle_link(d, url.as_deref())) {
                    Ok(done) => done,
                    Err(err) => {
                        log::warn!("toggle link failed: {}", err);
                        false
                    }
                },
            );
            Ok(disposer)
        })
        .define()
}

/// Links the selected text to `url`, or removes the link around the focus
/// when `url` is `None`.
fn toggle_link(d: &mut Draft, url: Option<&str>) -> EditorResult<bool> {
    let Some(selection) = d.selection().copied() else {
        return Ok(false);
    };
    let key = selection.focus.key;
    if !d.node(key).is_some_and(|n| n.is_text()) {
        return Ok(false);
    }
    let existing = d
        .parent(key)
        .filter(|&p| d.node(p).is_some_and(|n| n.kind() == LINK));

    match (url, existing) {
        (None, None) => Ok(false),
        (None, Some(link)) => {
            d.unwrap_node(link)?;
            Ok(true)
        }
        (Some(url), Some(link)) => {
            d.set_attr(link, "url", url)?;
            Ok(true)
        }
        (Some(url), None) => {
            // Link the selected range, or the whole node for a caret.
            let target = match selection.range_in(key) {
                Some((start, end)) if start < end => {
                    let middle = if start > 0 { d.split_text(key, start)? } else { key };
                    d.split_text(middle, end - start)?;
                    middle
                }
                _ => key,
            };
            let link = d.wrap_node(target, LINK)?;
            d.set_attr(link, "url", url)?;
            let len = super::text_len(d, target);
            d.set_selection(Some(Selection::with_range(
                Point::new(target, 0),
                Point::new(target, len),
            )))?;
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::rich_text;
    use crate::builtin::test_util::{composed, text, type_text};

    fn link_urls(editor: &quire_core::Editor) -> Vec<String> {
        let state = editor.state();
        state
            .nodes_of_type(LINK)
            .into_iter()
            .filter_map(|k| state.node(k).and_then(|n| n.attr("url")).map(String::from))
            .collect()
    }

    #[test]
    fn test_link_selected_range_and_unlink() {
        let composition = composed(vec![rich_text::extension().unwrap(), extension().unwrap()]);
        let editor = composition.editor().unwrap();
        type_text(editor, "read the docs");
        editor
            .update(|d| {
                let key = d.text_nodes()[0];
                d.set_selection(Some(Selection::with_range(Point::new(key, 9), Point::new(key, 13))))
            })
            .unwrap();

        assert!(editor.dispatch_command(&TOGGLE_LINK, Some("https://docs.rs".into())));
        assert_eq!(link_urls(editor), vec!["https://docs.rs"]);
        let state = editor.state();
        let link = state.nodes_of_type(LINK)[0];
        assert_eq!(state.text_content_of(link), "docs");
        assert_eq!(text(editor), "read the docs");

        assert!(editor.dispatch_command(&TOGGLE_LINK, Some("https://crates.io".into())));
        assert_eq!(link_urls(editor), vec!["https://crates.io"]);

        assert!(editor.dispatch_command(&TOGGLE_LINK, None));
        assert!(link_urls(editor).is_empty());
        assert_eq!(text(editor), "read the docs");
    }

    #[test]
    fn test_caret_links_whole_node() {
        let composition = composed(vec![rich_text::extension().unwrap(), extension().unwrap()]);
        let editor = composition.editor().unwrap();
        type_text(editor, "home");
        assert!(editor.dispatch_command(&TOGGLE_LINK, Some("/".into())));
        let state = editor.state();
        assert_eq!(state.text_content_of(state.nodes_of_type(LINK)[0]), "home");
    }

    #[test]
    fn test_unlink_without_link_is_unhandled() {
        let composition = composed(vec![rich_text::extension().unwrap(), extension().unwrap()]);
        let editor = composition.editor().unwrap();
        type_text(editor, "plain");
        assert!(!editor.dispatch_command(&TOGGLE_LINK, None));
    }
}
