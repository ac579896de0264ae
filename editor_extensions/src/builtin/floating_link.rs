//! Tracks whether the selection is inside a link, for a floating link editor.

use super::auto_link::AUTOLINK;
use super::link::{self, LINK};
use crate::error::Result;
use crate::extension::Extension;
use quire_core::EditorState;
use quire_reactive::{Disposer, Signal};

pub const NAME: &str = "floating-link";

/// Output of the floating-link extension.
#[derive(Clone)]
pub struct FloatingLinkOutput {
    pub in_link: Signal<bool>,
    /// Target of the link around the focus.
    pub url: Signal<Option<String>>,
}

impl FloatingLinkOutput {
    fn sync(&self, state: &EditorState) {
        let url = link_at_focus(state);
        self.in_link.set(url.is_some());
        self.url.set(url);
    }

    fn reset(&self) {
        self.in_link.set(false);
        self.url.set(None);
    }
}

fn link_at_focus(state: &EditorState) -> Option<String> {
    let focus = state.selection()?.focus;
    let link = state.find_ancestor_of_type(focus.key, &[LINK, AUTOLINK])?;
    Some(
        state
            .node(link)
            .and_then(|n| n.attr("url"))
            .unwrap_or_default()
            .to_string(),
    )
}

pub fn extension() -> Result<Extension> {
    Extension::builder(NAME)
        .requires(link::NAME)
        .build(|_| {
            Ok(FloatingLinkOutput {
                in_link: Signal::new(false),
                url: Signal::new(None),
            })
        })
        .register(|ctx, output| {
            output.sync(&ctx.editor().state());
            let tracker = output.clone();
            let reset = output.clone();
            let listener = ctx
                .editor()
                .register_update_listener(move |_, event| tracker.sync(&event.next));
            Ok(Disposer::merge([listener, Disposer::new(move || reset.reset())]))
        })
        .define()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::rich_text;
    use crate::builtin::test_util::{composed, type_text};
    use quire_core::{Point, Selection, INSERT_TEXT, TOGGLE_LINK};

    #[test]
    fn test_follows_selection_into_links() {
        let composition = composed(vec![
            rich_text::extension().unwrap(),
            link::extension().unwrap(),
            extension().unwrap(),
        ]);
        let editor = composition.editor().unwrap();
        let output = composition.output::<FloatingLinkOutput>(NAME).unwrap();

        type_text(editor, "site");
        assert!(!output.in_link.get());
        editor.dispatch_command(&TOGGLE_LINK, Some("https://quire.dev".into()));
        assert!(output.in_link.get());
        assert_eq!(output.url.get().as_deref(), Some("https://quire.dev"));

        // Move to a plain text node after the link.
        editor
            .update(|d| {
                let root = d.root();
                let paragraph = d.children(root)[0];
                let key = d.create_text(paragraph, None, " more")?;
                d.set_selection(Some(Selection::new(Point::new(key, 0))))
            })
            .unwrap();
        assert!(!output.in_link.get());
        editor.dispatch_command(&INSERT_TEXT, "x".into());
        assert_eq!(output.url.get(), None);
    }

    #[test]
    fn test_requires_link() {
        let extensions = [rich_text::extension().unwrap(), extension().unwrap()];
        let err = crate::compose::compose(&extensions, crate::config::Overrides::new()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ComposeError::MissingRequirement { ref requires, .. } if requires == "link"
        ));
    }

    #[test]
    fn test_disable_resets_output() {
        let composition = composed(vec![
            rich_text::extension().unwrap(),
            link::extension().unwrap(),
            extension().unwrap(),
        ]);
        let editor = composition.editor().unwrap();
        let output = composition.output::<FloatingLinkOutput>(NAME).unwrap();
        type_text(editor, "site");
        editor.dispatch_command(&TOGGLE_LINK, Some("/".into()));
        assert!(output.in_link.get());

        composition.config(NAME).unwrap().set_disabled(true).unwrap();
        assert!(!output.in_link.get());
    }
}
