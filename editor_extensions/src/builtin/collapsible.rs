//! Collapsible sections: a container holding a title and a content block.

use crate::error::Result;
use crate::extension::Extension;
use quire_core::{
    CommandPriority, Draft, EditorState, NodeKey, NodeType, Result as EditorResult, PARAGRAPH,
    TOGGLE_COLLAPSIBLE,
};
use quire_reactive::Disposer;

pub const NAME: &str = "collapsible";

pub const CONTAINER: NodeType = NodeType::block("collapsible-container");
pub const TITLE: NodeType = NodeType::block("collapsible-title");
pub const CONTENT: NodeType = NodeType::block("collapsible-content");

const OPEN_ATTR: &str = "open";

pub fn extension() -> Result<Extension> {
    Extension::builder(NAME)
        .nodes([CONTAINER, TITLE, CONTENT])
        .register(|ctx, _| {
            let editor = ctx.editor();
            Ok(Disposer::merge([
                editor.register_command(
                    &TOGGLE_COLLAPSIBLE,
                    CommandPriority::Editor,
                    |editor, &key| match editor.update(|d| toggle(d, key)) {
                        Ok(done) => done,
                        Err(err) => {
                            log::warn!("toggle collapsible failed: {}", err);
                            false
                        }
                    },
                ),
                editor.register_node_transform(CONTAINER, normalize_container)?,
                editor.register_node_transform(TITLE, unwrap_orphan)?,
                editor.register_node_transform(CONTENT, unwrap_orphan)?,
            ]))
        })
        .define()
}

/// Inserts a collapsible section at the end of the document and returns the
/// container.
pub fn insert_collapsible(d: &mut Draft, title: &str, body: &str) -> EditorResult<NodeKey> {
    let root = d.root();
    let container = d.create_element(CONTAINER, root, None)?;
    d.set_attr(container, OPEN_ATTR, "true")?;
    let title_node = d.create_element(TITLE, container, None)?;
    d.create_text(title_node, None, title)?;
    let content = d.create_element(CONTENT, container, None)?;
    let paragraph = d.create_element(PARAGRAPH, content, None)?;
    d.create_text(paragraph, None, body)?;
    Ok(container)
}

/// Containers without an `open` attribute count as open.
pub fn is_open(state: &EditorState, container: NodeKey) -> bool {
    state
        .node(container)
        .and_then(|n| n.attr(OPEN_ATTR))
        .map_or(true, |v| v == "true")
}

fn toggle(d: &mut Draft, key: NodeKey) -> EditorResult<bool> {
    let Some(container) = d.find_ancestor_of_type(key, &[CONTAINER]) else {
        return Ok(false);
    };
    let open = is_open(d, container);
    d.set_attr(container, OPEN_ATTR, if open { "false" } else { "true" })?;
    Ok(true)
}

/// A container must hold a title followed by content. Anything else is
/// replaced by its children.
fn normalize_container(d: &mut Draft, key: NodeKey) -> EditorResult<()> {
    let kinds: Vec<NodeType> = d
        .children(key)
        .iter()
        .filter_map(|&c| d.node(c).map(|n| n.kind()))
        .collect();
    if kinds != [TITLE, CONTENT] {
        log::debug!("removing malformed collapsible {}", key);
        d.unwrap_node(key)?;
    }
    Ok(())
}

/// Titles and content blocks only live directly inside a container.
fn unwrap_orphan(d: &mut Draft, key: NodeKey) -> EditorResult<()> {
    let parent_is_container = d
        .parent(key)
        .and_then(|p| d.node(p))
        .is_some_and(|n| n.kind() == CONTAINER);
    if !parent_is_container {
        d.unwrap_node(key)?;
    }
    Ok(())
}
