//! Counts characters and exposes how many remain under a soft limit.

use crate::error::Result;
use crate::extension::Extension;
use quire_reactive::{Disposer, Memo, Signal};
use serde_json::json;

pub const NAME: &str = "character-limit";

/// Output of the character-limit extension.
#[derive(Clone)]
pub struct CharacterLimitOutput {
    /// Characters in the document, block breaks included.
    pub count: Signal<usize>,
    /// `max_length - count`; negative once over the limit.
    pub remaining: Memo<i64>,
}

impl CharacterLimitOutput {
    pub fn is_over_limit(&self) -> bool {
        self.remaining.get() < 0
    }
}

pub fn extension() -> Result<Extension> {
    Extension::builder(NAME)
        .config("max_length", json!(280))
        .build(|ctx| {
            let count = Signal::new(ctx.editor().state().text_len());
            let config = ctx.config().clone();
            let counted = count.clone();
            let remaining = Memo::new(move || {
                let max = config.get::<i64>("max_length").unwrap_or(0);
                max - counted.get() as i64
            });
            let memo = remaining.clone();
            ctx.on_dispose(Disposer::new(move || memo.dispose()));
            Ok(CharacterLimitOutput { count, remaining })
        })
        .register(|ctx, output| {
            output.count.set(ctx.editor().state().text_len());
            let count = output.count.clone();
            Ok(ctx.editor().register_update_listener(move |_, event| {
                count.set(event.next.text_len());
            }))
        })
        .define()
}
