//! Turns typed URLs into `autolink` nodes.

use crate::error::Result;
use crate::extension::Extension;
use quire_core::{Draft, NodeKey, NodeType, Result as EditorResult, TEXT};
use serde_json::json;

pub const NAME: &str = "auto-link";

/// An inline wrapper around a detected URL. The URL is kept in the `url`
/// attribute.
pub const AUTOLINK: NodeType = NodeType::inline("autolink");

pub fn extension() -> Result<Extension> {
    Extension::builder(NAME)
        .node(AUTOLINK)
        .config("protocols", json!(["https://", "http://"]))
        .register(|ctx, _| {
            let protocols = ctx.config().get::<Vec<String>>("protocols")?;
            let disposer = ctx
                .editor()
                .register_node_transform(TEXT, move |d, key| transform_text(d, key, &protocols))?;
            Ok(disposer)
        })
        .define()
}

/// Finds the first URL in `text` that is followed by whitespace. Returns its
/// character range.
fn find_url(text: &str, protocols: &[String]) -> Option<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let mut start = 0;
    while start < chars.len() {
        let at_word_start = start == 0 || chars[start - 1].is_whitespace();
        if at_word_start {
            let rest: String = chars[start..].iter().collect();
            if let Some(protocol) = protocols.iter().find(|p| !p.is_empty() && rest.starts_with(p.as_str())) {
                let len = chars[start..]
                    .iter()
                    .position(|c| c.is_whitespace())
                    .unwrap_or(chars.len() - start);
                let end = start + len;
                let protocol_len = protocol.chars().count();
                if end < chars.len() && len > protocol_len {
                    return Some((start, end));
                }
            }
        }
        start += 1;
    }
    None
}

fn is_url(text: &str, protocols: &[String]) -> bool {
    !text.chars().any(char::is_whitespace)
        && protocols
            .iter()
            .any(|p| !p.is_empty() && text.starts_with(p.as_str()) && text.len() > p.len())
}

fn transform_text(d: &mut Draft, key: NodeKey, protocols: &[String]) -> EditorResult<()> {
    let Some(text) = d.node_text(key) else {
        return Ok(());
    };
    let parent = d.parent(key);
    let parent_kind = parent.and_then(|p| d.node(p)).map(|n| n.kind());

    if parent_kind == Some(AUTOLINK) {
        // Edited inside an existing link: unwrap it once it stops being a URL.
        if let Some(link) = parent {
            let content = d.text_content_of(link);
            if is_url(&content, protocols) {
                d.set_attr(link, "url", content)?;
            } else {
                log::trace!("unlinking {}", link);
                d.unwrap_node(link)?;
            }
        }
        return Ok(());
    }
    if parent_kind.is_some_and(|k| k.is_inline()) {
        return Ok(());
    }

    let Some((start, end)) = find_url(&text, protocols) else {
        return Ok(());
    };
    let url: String = text.chars().skip(start).take(end - start).collect();
    let target = if start > 0 { d.split_text(key, start)? } else { key };
    d.split_text(target, end - start)?;
    let link = d.wrap_node(target, AUTOLINK)?;
    d.set_attr(link, "url", url)?;
    Ok(())
}
