//! Operator access to individual records: look one up, or release it so
//! the next Begin starts fresh.

use idem_core::{Clock, Idempotency, IdempotencyRecord, IdempotencyStore};
use serde_json::json;

use super::KeyArgs;
use crate::error::CliError;
use crate::OutputFormat;

pub(crate) async fn cmd_inspect<S: IdempotencyStore, C: Clock>(
    idem: &Idempotency<S, C>,
    args: &KeyArgs,
    now_ms: i64,
    output: OutputFormat,
) -> Result<(), CliError> {
    let input = args.input_value()?;
    let key = idem.derive_key(&args.use_case, &input)?;
    let record = idem.inspect(&args.use_case, &input).await?;

    match output {
        OutputFormat::Json => {
            let body = match &record {
                Some(r) => json!({
                    "use_case": r.use_case,
                    "key": r.key,
                    "status": r.status,
                    "result_data": r.result_data,
                    "expiration": r.expiration,
                    "created_at": r.created_at,
                    "expired": r.is_expired(now_ms),
                }),
                None => json!({ "use_case": args.use_case, "key": key, "status": null }),
            };
            println!("{body}");
        }
        OutputFormat::Text => match &record {
            Some(r) => print_record(r, now_ms),
            None => println!("no record for {}/{}", args.use_case, key),
        },
    }
    Ok(())
}

fn print_record(record: &IdempotencyRecord, now_ms: i64) {
    println!("use case:   {}", record.use_case);
    println!("key:        {}", record.key);
    println!("status:     {}", record.status);
    println!("created at: {}", record.created_at);
    if record.is_expired(now_ms) {
        println!("expiration: {} (expired)", record.expiration);
    } else {
        println!("expiration: {}", record.expiration);
    }
    if let Some(data) = &record.result_data {
        println!("result:     {data}");
    }
}

pub(crate) async fn cmd_release<S: IdempotencyStore, C: Clock>(
    idem: &Idempotency<S, C>,
    args: &KeyArgs,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let input = args.input_value()?;
    let key = idem.derive_key(&args.use_case, &input)?;
    idem.abort(&args.use_case, &input).await?;

    match output {
        OutputFormat::Json => println!(
            "{}",
            json!({ "use_case": args.use_case, "key": key, "released": true })
        ),
        OutputFormat::Text => {
            if !quiet {
                println!("released {}/{}", args.use_case, key);
            }
        }
    }
    Ok(())
}
