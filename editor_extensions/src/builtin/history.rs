//! Undo and redo over whole-document snapshots.

use crate::error::Result;
use crate::extension::Extension;
use quire_core::{CommandPriority, EditKind, Editor, EditorState, History, REDO, TAG_HISTORIC, UNDO};
use quire_reactive::{Disposer, Signal};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

pub const NAME: &str = "history";

/// Output of the history extension.
#[derive(Clone)]
pub struct HistoryOutput {
    pub can_undo: Signal<bool>,
    pub can_redo: Signal<bool>,
    history: Rc<RefCell<History>>,
}

impl HistoryOutput {
    fn sync(&self) {
        let history = self.history.borrow();
        let (can_undo, can_redo) = (history.can_undo(), history.can_redo());
        drop(history);
        self.can_undo.set(can_undo);
        self.can_redo.set(can_redo);
    }

    /// Forgets every recorded state.
    pub fn clear(&self) {
        self.history.borrow_mut().clear();
        self.sync();
    }

    pub fn undo_depth(&self) -> usize {
        self.history.borrow().undo_depth()
    }

    fn restore(&self, editor: &Editor, target: Rc<EditorState>) -> bool {
        let result = editor.update(|d| {
            d.add_tag(TAG_HISTORIC);
            d.replace_state((*target).clone());
            Ok(())
        });
        self.sync();
        match result {
            Ok(()) => true,
            Err(err) => {
                log::warn!("failed to restore history state: {}", err);
                false
            }
        }
    }
}

pub fn extension() -> Result<Extension> {
    Extension::builder(NAME)
        .config("max_depth", json!(100))
        .config("coalesce_ms", json!(300))
        .build(|_| {
            Ok(HistoryOutput {
                can_undo: Signal::new(false),
                can_redo: Signal::new(false),
                history: Rc::new(RefCell::new(History::default())),
            })
        })
        .register(|ctx, output| {
            let max_depth = ctx.config().get::<usize>("max_depth")?;
            let coalesce_ms = ctx.config().get::<u64>("coalesce_ms")?;
            {
                let mut history = output.history.borrow_mut();
                history.set_max_size(max_depth);
                // Zero records every edit on its own.
                history.set_coalesce_enabled(coalesce_ms > 0);
                history.set_coalesce_window(Duration::from_millis(coalesce_ms));
            }
            output.sync();

            let editor = ctx.editor();
            let recorder = output.clone();
            let undo = output.clone();
            let redo = output.clone();
            Ok(Disposer::merge([
                editor.register_update_listener(move |_, event| {
                    if event.has_tag(TAG_HISTORIC) || event.dirty.is_empty() {
                        return;
                    }
                    recorder
                        .history
                        .borrow_mut()
                        .record(event.prev.clone(), EditKind::of(event));
                    recorder.sync();
                }),
                editor.register_command(&UNDO, CommandPriority::Editor, move |editor, _| {
                    let current = editor.state();
                    let Some(target) = undo.history.borrow_mut().undo(current) else {
                        return false;
                    };
                    undo.restore(editor, target)
                }),
                editor.register_command(&REDO, CommandPriority::Editor, move |editor, _| {
                    let current = editor.state();
                    let Some(target) = redo.history.borrow_mut().redo(current) else {
                        return false;
                    };
                    redo.restore(editor, target)
                }),
            ]))
        })
        .define()
}
