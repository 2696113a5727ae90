mod backend;
mod commands;
mod error;
mod settings;

use std::future::Future;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use idem_core::{Clock, Idempotency, SystemClock};
use tracing_subscriber::EnvFilter;

use crate::backend::{AnyStore, Backend};
use crate::commands::table::TableCommands;
use crate::commands::KeyArgs;
use crate::error::CliError;
use crate::settings::Settings;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// At-most-once execution toolkit.
#[derive(Parser)]
#[command(name = "idem", version, about = "At-most-once execution toolkit")]
struct Cli {
    /// Path to an idem.toml settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store holding idempotency records
    #[arg(long, global = true, default_value = "memory", value_enum)]
    backend: Backend,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log every protocol step (overrides RUST_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the idempotency key for a use case input
    Key(KeyArgs),

    /// Show the stored record for a use case input
    Inspect(KeyArgs),

    /// Delete the record for a use case input so the next attempt starts fresh
    Release(KeyArgs),

    /// Provision the DynamoDB table
    Table {
        #[command(subcommand)]
        command: TableCommands,
    },

    /// Walk through the reference scenarios against the selected backend
    Demo,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        report_error(&e.to_string(), cli.output, cli.quiet);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let settings = Settings::load(cli.config.as_deref())?;
    let config = settings.idempotency_config()?;

    match &cli.command {
        Commands::Key(args) => commands::key::cmd_key(args, &config, cli.output),
        Commands::Inspect(args) => block_on(async {
            let idem = Idempotency::new(AnyStore::open(cli.backend, &settings).await, config);
            let now = SystemClock.now_millis();
            commands::record::cmd_inspect(&idem, args, now, cli.output).await
        }),
        Commands::Release(args) => block_on(async {
            let idem = Idempotency::new(AnyStore::open(cli.backend, &settings).await, config);
            commands::record::cmd_release(&idem, args, cli.output, cli.quiet).await
        }),
        Commands::Table { command } => block_on(commands::table::cmd_table(
            *command,
            &settings.dynamodb,
            cli.output,
            cli.quiet,
        )),
        Commands::Demo => block_on(async {
            let idem = Idempotency::new(AnyStore::open(cli.backend, &settings).await, config);
            commands::demo::cmd_demo(&idem, cli.output, cli.quiet).await
        }),
    }
}

fn block_on<F>(future: F) -> Result<(), CliError>
where
    F: Future<Output = Result<(), CliError>>,
{
    let rt = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    rt.block_on(future)
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
        OutputFormat::Text if quiet => {}
        OutputFormat::Text => eprintln!("error: {}", msg),
    }
}
