//! Word completion backed by a dictionary lookup on a worker thread.
//!
//! The update listener records the word before the caret; the tick listener
//! waits `debounce_ticks` ticks, hands the word to the worker and applies
//! results that still match the latest request.

use crate::error::Result;
use crate::extension::Extension;
use crossbeam_channel::{unbounded, Receiver, Sender};
use quire_core::{CommandPriority, EditorState, INSERT_TEXT, SELECT_SUGGESTION};
use quire_reactive::{Disposer, Signal};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;

pub const NAME: &str = "autocomplete";

const DICTIONARY: &[&str] = &[
    "about", "above", "accept", "account", "across", "action", "activity", "actually",
    "address", "against", "already", "although", "always", "another", "anything", "application",
    "around", "article", "attention", "available", "because", "become", "before", "behind",
    "believe", "between", "business", "calendar", "certain", "change", "character", "children",
    "collapsible", "command", "community", "company", "complete", "composition", "computer",
    "condition", "configuration", "consider", "continue", "control", "country", "current",
    "decision", "default", "describe", "development", "different", "direction", "document",
    "during", "editor", "effect", "either", "environment", "especially", "evening", "everything",
    "example", "experience", "extension", "family", "feeling", "following", "function",
    "general", "government", "history", "however", "hundred", "important", "including",
    "increase", "information", "interest", "international", "keyboard", "knowledge", "language",
    "listener", "maybe", "message", "million", "minute", "moment", "morning", "national",
    "necessary", "nothing", "number", "official", "opportunity", "organization", "paragraph",
    "particular", "people", "perhaps", "person", "political", "position", "possible", "problem",
    "process", "program", "property", "question", "reactive", "receive", "register", "remember",
    "require", "research", "selection", "service", "several", "signal", "situation", "something",
    "sometimes", "special", "student", "suggestion", "support", "system", "technology",
    "thousand", "through", "together", "tomorrow", "transform", "understand", "university",
    "various", "whatever", "whether", "without", "yesterday",
];

/// Output of the autocomplete extension.
#[derive(Clone)]
pub struct AutocompleteOutput {
    /// Characters that would complete the word before the caret.
    pub suggestion: Signal<Option<String>>,
}

struct Lookup {
    id: u64,
    prefix: String,
}

struct LookupResult {
    id: u64,
    completion: Option<String>,
}

/// Request bookkeeping on the editor thread.
#[derive(Default)]
struct Pending {
    /// Id of the newest request; older results are stale.
    latest: u64,
    /// Word waiting for the debounce to expire.
    queued: Option<String>,
    ticks_left: u32,
}

/// Finds the suffix completing `prefix` to a dictionary word.
fn complete(prefix: &str) -> Option<String> {
    let lower = prefix.to_lowercase();
    DICTIONARY
        .iter()
        .find(|word| word.len() > lower.len() && word.starts_with(&lower))
        .map(|word| word[lower.len()..].to_string())
}

fn worker(requests: Receiver<Lookup>, results: Sender<LookupResult>) {
    log::trace!("autocomplete worker started");
    for lookup in requests {
        let completion = complete(&lookup.prefix);
        if results
            .send(LookupResult {
                id: lookup.id,
                completion,
            })
            .is_err()
        {
            break;
        }
    }
    log::trace!("autocomplete worker stopped");
}

/// The word ending at a collapsed caret, when the caret is at the word's end.
fn word_before_caret(state: &EditorState) -> Option<String> {
    let caret = super::text_caret(state)?;
    let text: Vec<char> = state.node_text(caret.key)?.chars().collect();
    let offset = caret.offset.min(text.len());
    if text.get(offset).is_some_and(|c| c.is_alphanumeric()) {
        return None;
    }
    let start = text[..offset]
        .iter()
        .rposition(|c| !c.is_alphanumeric())
        .map_or(0, |i| i + 1);
    Some(text[start..offset].iter().collect())
}

pub fn extension() -> Result<Extension> {
    Extension::builder(NAME)
        .config("min_prefix", json!(3))
        .config("debounce_ticks", json!(2))
        .build(|_| {
            Ok(AutocompleteOutput {
                suggestion: Signal::new(None),
            })
        })
        .register(|ctx, output| {
            let min_prefix = ctx.config().get::<usize>("min_prefix")?;
            let debounce = ctx.config().get::<u32>("debounce_ticks")?;

            let (request_tx, request_rx) = unbounded::<Lookup>();
            let (result_tx, result_rx) = unbounded::<LookupResult>();
            thread::Builder::new()
                .name("autocomplete".into())
                .spawn(move || worker(request_rx, result_tx))?;

            let requests = Rc::new(RefCell::new(Some(request_tx)));
            let pending = Rc::new(RefCell::new(Pending::default()));
            let dismissed = Rc::new(Cell::new(false));
            let editor = ctx.editor();

            let on_update = {
                let pending = pending.clone();
                let suggestion = output.suggestion.clone();
                editor.register_update_listener(move |_, event| {
                    let mut pending = pending.borrow_mut();
                    // Any edit invalidates in-flight lookups.
                    pending.latest += 1;
                    suggestion.set(None);
                    pending.queued = word_before_caret(&event.next)
                        .filter(|word| word.chars().count() >= min_prefix);
                    pending.ticks_left = debounce;
                })
            };

            let on_tick = {
                let pending = pending.clone();
                let requests = requests.clone();
                let dismissed = dismissed.clone();
                let suggestion = output.suggestion.clone();
                editor.register_tick_listener(move |_| {
                    if dismissed.get() {
                        return;
                    }
                    let mut pending = pending.borrow_mut();
                    if pending.queued.is_some() {
                        if pending.ticks_left > 0 {
                            pending.ticks_left -= 1;
                        }
                        if pending.ticks_left == 0 {
                            if let Some(prefix) = pending.queued.take() {
                                let id = pending.latest;
                                if let Some(tx) = requests.borrow().as_ref() {
                                    if tx.send(Lookup { id, prefix }).is_err() {
                                        log::warn!("autocomplete worker is gone");
                                    }
                                }
                            }
                        }
                    }
                    for result in result_rx.try_iter() {
                        if result.id == pending.latest {
                            suggestion.set(result.completion);
                        } else {
                            log::trace!("dropping stale suggestion {}", result.id);
                        }
                    }
                })
            };

            let on_select = {
                let suggestion = output.suggestion.clone();
                editor.register_command(&SELECT_SUGGESTION, CommandPriority::Editor, move |editor, _| {
                    let Some(text) = suggestion.peek() else {
                        return false;
                    };
                    suggestion.set(None);
                    editor.dispatch_command(&INSERT_TEXT, text)
                })
            };

            let suggestion = output.suggestion.clone();
            let cancel = Disposer::new(move || {
                dismissed.set(true);
                // Closing the channel stops the worker.
                requests.borrow_mut().take();
                suggestion.set(None);
            });
            Ok(Disposer::merge([on_update, on_tick, on_select, cancel]))
        })
        .define()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::rich_text;
    use crate::builtin::test_util::{composed, text, type_text};
    use quire_core::Editor;
    use std::time::Duration;

    /// Ticks until the suggestion settles on a value, or gives up.
    fn wait_for_suggestion(editor: &Editor, output: &AutocompleteOutput) -> Option<String> {
        for _ in 0..400 {
            editor.tick();
            if let Some(s) = output.suggestion.get() {
                return Some(s);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_complete() {
        assert_eq!(complete("edi").as_deref(), Some("tor"));
        assert_eq!(complete("Hist").as_deref(), Some("ory"));
        assert_eq!(complete("zzz"), None);
        assert_eq!(complete("editor"), None);
    }

    #[test]
    fn test_word_before_caret() {
        let composition = composed(vec![rich_text::extension().unwrap()]);
        let editor = composition.editor().unwrap();
        type_text(editor, "hello wor");
        assert_eq!(word_before_caret(&editor.state()).as_deref(), Some("wor"));
        type_text(editor, " ");
        assert_eq!(word_before_caret(&editor.state()).as_deref(), Some(""));
    }

    #[test]
    fn test_suggestion_after_debounce() {
        let composition = composed(vec![rich_text::extension().unwrap(), extension().unwrap()]);
        let editor = composition.editor().unwrap();
        let output = composition.output::<AutocompleteOutput>(NAME).unwrap();

        type_text(editor, "my docu");
        // Nothing is requested before the debounce expires.
        editor.tick();
        assert_eq!(output.suggestion.get(), None);

        assert_eq!(wait_for_suggestion(editor, &output).as_deref(), Some("ment"));
        assert!(editor.dispatch_command(&SELECT_SUGGESTION, ()));
        assert_eq!(text(editor), "my document");
        assert_eq!(output.suggestion.get(), None);
    }

    #[test]
    fn test_short_prefix_is_ignored() {
        let composition = composed(vec![rich_text::extension().unwrap(), extension().unwrap()]);
        let editor = composition.editor().unwrap();
        let output = composition.output::<AutocompleteOutput>(NAME).unwrap();
        type_text(editor, "ed");
        for _ in 0..10 {
            editor.tick();
        }
        assert_eq!(output.suggestion.get(), None);
        assert!(!editor.dispatch_command(&SELECT_SUGGESTION, ()));
    }

    #[test]
    fn test_typing_discards_pending_result() {
        let composition = composed(vec![rich_text::extension().unwrap(), extension().unwrap()]);
        let editor = composition.editor().unwrap();
        let output = composition.output::<AutocompleteOutput>(NAME).unwrap();
        type_text(editor, "edi");
        assert_eq!(wait_for_suggestion(editor, &output).as_deref(), Some("tor"));

        type_text(editor, "t");
        assert_eq!(output.suggestion.get(), None);
        assert_eq!(wait_for_suggestion(editor, &output).as_deref(), Some("or"));
    }

    #[test]
    fn test_disable_dismisses_lookups() {
        let composition = composed(vec![rich_text::extension().unwrap(), extension().unwrap()]);
        let editor = composition.editor().unwrap();
        let output = composition.output::<AutocompleteOutput>(NAME).unwrap();
        type_text(editor, "sugg");
        editor.tick();
        editor.tick();

        composition.config(NAME).unwrap().set_disabled(true).unwrap();
        for _ in 0..20 {
            editor.tick();
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(output.suggestion.get(), None);
        assert_eq!(editor.listener_count(), 3);
    }
}
