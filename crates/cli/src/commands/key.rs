use idem_core::{IdempotencyConfig, IdempotencyError};
use serde_json::json;

use super::KeyArgs;
use crate::error::CliError;
use crate::OutputFormat;

/// Print the key an input maps to under a use case.
pub(crate) fn cmd_key(
    args: &KeyArgs,
    config: &IdempotencyConfig,
    output: OutputFormat,
) -> Result<(), CliError> {
    let input = args.input_value()?;
    let key = config
        .key_deriver
        .derive_value(&args.use_case, &input)
        .map_err(IdempotencyError::from)?;

    match output {
        OutputFormat::Text => println!("{key}"),
        OutputFormat::Json => println!("{}", json!({ "use_case": args.use_case, "key": key })),
    }
    Ok(())
}
