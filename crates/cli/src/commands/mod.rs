pub(crate) mod demo;
pub(crate) mod key;
pub(crate) mod record;
pub(crate) mod table;

use std::path::PathBuf;

use clap::Args;
use serde_json::Value;

use crate::error::CliError;

/// The use case and input a key is derived from.
#[derive(Debug, Args)]
pub(crate) struct KeyArgs {
    /// Use case identifier
    pub use_case: String,
    /// Use case input as inline JSON
    #[arg(long, conflicts_with = "input_file")]
    pub input: Option<String>,
    /// Path to a file holding the use case input as JSON
    #[arg(long)]
    pub input_file: Option<PathBuf>,
}

impl KeyArgs {
    pub fn input_value(&self) -> Result<Value, CliError> {
        let text = match (&self.input, &self.input_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|source| CliError::Read {
                path: path.clone(),
                source,
            })?,
            (None, None) => return Err(CliError::MissingInput),
        };
        serde_json::from_str(&text).map_err(CliError::Input)
    }
}
