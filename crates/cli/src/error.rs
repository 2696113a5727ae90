use std::path::PathBuf;

use idem_core::{ConfigError, IdempotencyError, StorageError};

/// Everything a subcommand can fail with.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("error reading file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid settings '{}': {source}", path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("invalid settings: {0}")]
    InvalidTtl(#[from] ConfigError),

    #[error("invalid input JSON: {0}")]
    Input(#[source] serde_json::Error),

    #[error("either --input or --input-file is required")]
    MissingInput,

    #[error(transparent)]
    Idempotency(#[from] IdempotencyError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("demo scenario {scenario}: expected {expected}, observed {observed}")]
    Demo {
        scenario: &'static str,
        expected: String,
        observed: String,
    },

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
