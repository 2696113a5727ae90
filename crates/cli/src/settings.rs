//! `idem.toml` loading.
//!
//! ```toml
//! [ttl]
//! in_progress_secs = 300
//! completed_secs = 86400
//!
//! [dynamodb]
//! table = "idempotency"
//! region = "us-east-1"
//! endpoint = "http://localhost:8000"
//! ```
//!
//! Every section and field is optional.

use std::path::Path;

use idem_core::{ConfigError, IdempotencyConfig, TtlSettings};
use idem_dynamodb::DynamoDbConfig;
use serde::Deserialize;

use crate::error::CliError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub ttl: TtlSettings,
    pub dynamodb: DynamoDbConfig,
}

impl Settings {
    /// Read settings from `path`, or the defaults when no file is given.
    /// TTLs that would let duplicates through are rejected here.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let Some(path) = path else {
            return Ok(Settings::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::parse(&text).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        settings
            .idempotency_config()
            .map_err(|source| CliError::Settings {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(settings)
    }

    fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn idempotency_config(&self) -> Result<IdempotencyConfig, ConfigError> {
        IdempotencyConfig::try_from(self.ttl)
    }
}
