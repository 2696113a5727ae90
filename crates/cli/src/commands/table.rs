use clap::Subcommand;
use idem_dynamodb::{table, DynamoDbConfig};
use serde_json::json;

use crate::error::CliError;
use crate::OutputFormat;

#[derive(Debug, Clone, Copy, Subcommand)]
pub(crate) enum TableCommands {
    /// Create the table and enable TTL on it
    Create,
    /// Delete the table if it exists
    Delete,
    /// Delete the table if it exists, then create it again
    Recreate,
}

impl TableCommands {
    fn verb(self) -> &'static str {
        match self {
            TableCommands::Create => "created",
            TableCommands::Delete => "deleted",
            TableCommands::Recreate => "recreated",
        }
    }
}

/// Provision the DynamoDB table named in the settings. Always targets
/// DynamoDB, whatever `--backend` says.
pub(crate) async fn cmd_table(
    command: TableCommands,
    config: &DynamoDbConfig,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let client = config.client().await;
    let changed = match command {
        TableCommands::Create => {
            table::create_table(&client, &config.table).await?;
            true
        }
        TableCommands::Delete => table::delete_table(&client, &config.table).await?,
        TableCommands::Recreate => {
            table::recreate_table(&client, &config.table).await?;
            true
        }
    };

    match output {
        OutputFormat::Json => println!(
            "{}",
            json!({ "table": config.table, "action": command.verb(), "changed": changed })
        ),
        OutputFormat::Text if quiet => {}
        OutputFormat::Text if changed => println!("table {} {}", config.table, command.verb()),
        OutputFormat::Text => println!("table {} does not exist", config.table),
    }
    Ok(())
}
