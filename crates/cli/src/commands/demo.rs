//! The two reference walkthroughs, run against the selected backend.
//!
//! A: Begin, a duplicate Begin while the first is in flight, Complete, then a Begin that
//! sees the cached result.
//! B: a use case that fails is aborted, and the next Begin starts fresh.

use std::fmt;

use idem_core::{BeginOutcome, Clock, ExecuteError, Idempotency, IdempotencyStore};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::CliError;
use crate::OutputFormat;

const USE_CASE: &str = "my-use-case";

#[derive(Debug, Serialize)]
pub(crate) struct Step {
    scenario: &'static str,
    action: &'static str,
    outcome: String,
}

impl Step {
    fn new(scenario: &'static str, action: &'static str, outcome: String) -> Self {
        Self {
            scenario,
            action,
            outcome,
        }
    }
}

fn describe(outcome: &BeginOutcome<Value>) -> String {
    match outcome {
        BeginOutcome::Started => "Started".to_string(),
        BeginOutcome::AlreadyDone(result) => format!("AlreadyDone({result})"),
        BeginOutcome::AlreadyInProgress => "AlreadyInProgress".to_string(),
    }
}

fn check_outcome(
    scenario: &'static str,
    observed: &BeginOutcome<Value>,
    expected: &BeginOutcome<Value>,
) -> Result<(), CliError> {
    if observed == expected {
        Ok(())
    } else {
        Err(CliError::Demo {
            scenario,
            expected: describe(expected),
            observed: describe(observed),
        })
    }
}

#[derive(Debug)]
struct PaymentDeclined;

impl fmt::Display for PaymentDeclined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payment declined")
    }
}

fn input() -> Value {
    json!({ "name": "John Doe Dorian", "age": 43 })
}

async fn scenario_a<S: IdempotencyStore, C: Clock>(
    idem: &Idempotency<S, C>,
    steps: &mut Vec<Step>,
) -> Result<(), CliError> {
    let input = input();
    let result = json!({ "id": 1, "name": "John Doe Dorian", "age": 43 });

    let first = idem.begin::<_, Value>(USE_CASE, &input).await?;
    steps.push(Step::new("A", "begin", describe(&first)));
    check_outcome("A", &first, &BeginOutcome::Started)?;

    let duplicate = idem.begin::<_, Value>(USE_CASE, &input).await?;
    steps.push(Step::new("A", "duplicate begin", describe(&duplicate)));
    check_outcome("A", &duplicate, &BeginOutcome::AlreadyInProgress)?;

    idem.complete(USE_CASE, &input, &result).await?;
    steps.push(Step::new("A", "complete", result.to_string()));

    let third = idem.begin::<_, Value>(USE_CASE, &input).await?;
    steps.push(Step::new("A", "begin", describe(&third)));
    check_outcome("A", &third, &BeginOutcome::AlreadyDone(result))?;

    idem.abort(USE_CASE, &input).await?;
    Ok(())
}

async fn scenario_b<S: IdempotencyStore, C: Clock>(
    idem: &Idempotency<S, C>,
    steps: &mut Vec<Step>,
) -> Result<(), CliError> {
    let input = input();

    let failed = idem
        .execute(USE_CASE, &input, || async { Err::<Value, _>(PaymentDeclined) })
        .await;
    let outcome = match failed {
        Err(ExecuteError::UseCase(e)) => format!("use case failed ({e}), aborted"),
        Err(ExecuteError::Idempotency(e)) => return Err(e.into()),
        Ok(execution) => {
            return Err(CliError::Demo {
                scenario: "B",
                expected: "use case failure".to_string(),
                observed: format!("{execution:?}"),
            })
        }
    };
    steps.push(Step::new("B", "execute", outcome));

    let retry = idem.begin::<_, Value>(USE_CASE, &input).await?;
    steps.push(Step::new("B", "begin", describe(&retry)));
    check_outcome("B", &retry, &BeginOutcome::Started)?;

    idem.abort(USE_CASE, &input).await?;
    Ok(())
}

/// Run both scenarios and print what each step observed.
pub(crate) async fn cmd_demo<S: IdempotencyStore, C: Clock>(
    idem: &Idempotency<S, C>,
    output: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    // Leftovers from an interrupted run against a durable table.
    idem.abort(USE_CASE, &input()).await?;

    let mut steps = Vec::new();
    let result = match scenario_a(idem, &mut steps).await {
        Ok(()) => scenario_b(idem, &mut steps).await,
        Err(e) => Err(e),
    };

    match output {
        OutputFormat::Json => println!("{}", json!({ "steps": steps, "ok": result.is_ok() })),
        OutputFormat::Text if quiet => {}
        OutputFormat::Text => {
            for step in &steps {
                println!("[{}] {:<16} -> {}", step.scenario, step.action, step.outcome);
            }
        }
    }
    result
}
