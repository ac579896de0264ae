//! Quire Extensions - composing editor behaviour from independent pieces.
//!
//! An [`Extension`] declares node types, config defaults and two optional
//! lifecycle steps: `build` produces an output other extensions can read,
//! `register` attaches behaviour to the editor inside an effect. [`compose`]
//! validates a set of extensions, creates the editor and runs each
//! extension's lifecycle in dependency order.

pub mod builtin;
pub mod compose;
pub mod config;
pub mod error;
pub mod extension;
pub mod session;

pub use compose::{compose, compose_with, ComposeOptions, Composition};
pub use config::{merge_config, Config, ConfigBag, ConfigValue, Overrides, DISABLED_KEY};
pub use error::{ComposeError, Result};
pub use extension::{Extension, ExtensionBuilder, ExtensionContext};
pub use session::SessionStore;
