use quire_core::EditorError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ComposeError> = std::result::Result<T, E>;

/// Errors raised while composing, querying or disposing extensions.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("extension name must not be empty")]
    EmptyName,
    #[error("extension `{0}` appears more than once")]
    DuplicateName(String),
    #[error("overrides target unknown extension `{0}`")]
    UnknownExtension(String),
    #[error("extension `{extension}` has no config key `{key}`")]
    UnknownConfigKey { extension: String, key: String },
    #[error("extension `{extension}` requires `{requires}`, which is not being composed")]
    MissingRequirement { extension: String, requires: String },
    #[error("requirement cycle: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },
    #[error("failed to build extension `{extension}`")]
    Build {
        extension: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to register extension `{extension}`")]
    Register {
        extension: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("composition has been disposed")]
    Disposed,
    #[error("no extension named `{0}` in this composition")]
    NotComposed(String),
    #[error("no build output for extension `{0}`")]
    UnknownOutput(String),
    #[error("output of `{extension}` is not a `{expected}`")]
    OutputType {
        extension: String,
        expected: &'static str,
    },
    #[error("invalid value for config key `{key}`")]
    Config {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid overrides document")]
    InvalidOverrides(#[source] serde_json::Error),
    #[error("failed to read overrides from {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Editor(#[from] EditorError),
}
