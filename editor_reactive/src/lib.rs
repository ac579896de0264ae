//! Reactive primitives for Quire.
//!
//! Signals hold values, effects re-run when the signals they read change,
//! and every write is batched so dependent effects run once per task.
//! The runtime is thread-local: nothing here is `Send`.

mod dispose;
mod effect;
mod memo;
mod runtime;
mod signal;

pub use dispose::Disposer;
pub use effect::{effect, try_effect, Effect, EffectOptions, ErrorHook};
pub use memo::Memo;
pub use runtime::{batch, untrack};
pub use signal::Signal;
