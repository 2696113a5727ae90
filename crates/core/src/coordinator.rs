use std::future::Future;

use idem_storage::{IdempotencyRecord, IdempotencyStatus, IdempotencyStore, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::clock::{duration_millis, rfc3339, Clock, SystemClock};
use crate::config::IdempotencyConfig;
use crate::error::IdempotencyError;
use crate::outcome::{BeginOutcome, ExecuteError, Execution};

/// Coordinates Begin / Complete / Abort against an [`IdempotencyStore`].
///
/// The backend is chosen by the caller at construction. The coordinator
/// holds no state between calls and takes no locks of its own, so any
/// number of coordinators, in any number of processes, may share a
/// durable store.
///
/// ## State machine
///
/// ```text
///            Begin                Complete
///  Absent ──────────▶ InProgress ──────────▶ Completed
///    ▲                   │                      │
///    └──── Abort / TTL ──┴───── Abort / TTL ────┘
/// ```
///
/// TTL transitions are logical: an expired row is treated as absent the
/// next time Begin looks at it.
#[derive(Debug)]
pub struct Idempotency<S, C = SystemClock> {
    store: S,
    config: IdempotencyConfig,
    clock: C,
}

impl<S: IdempotencyStore> Idempotency<S, SystemClock> {
    pub fn new(store: S, config: IdempotencyConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: IdempotencyStore, C: Clock> Idempotency<S, C> {
    pub fn with_clock(store: S, config: IdempotencyConfig, clock: C) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &IdempotencyConfig {
        &self.config
    }

    /// The key `input` maps to under `use_case`.
    pub fn derive_key<I>(&self, use_case: &str, input: &I) -> Result<String, IdempotencyError>
    where
        I: Serialize + ?Sized,
    {
        Ok(self.config.key_deriver.derive(use_case, input)?)
    }

    /// Claim the key for `input`, or report who already has it.
    ///
    /// Fails with [`IdempotencyError::Config`] before touching the store if
    /// either TTL is zero.
    ///
    /// `O` is the use case's result type; a cached result is deserialized
    /// into it.
    pub async fn begin<I, O>(
        &self,
        use_case: &str,
        input: &I,
    ) -> Result<BeginOutcome<O>, IdempotencyError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        self.config.validate()?;
        let key = self.derive_key(use_case, input)?;
        let now = self.clock.now_millis();
        let record = IdempotencyRecord::in_progress(
            use_case,
            key.as_str(),
            now.saturating_add(duration_millis(self.config.in_progress_ttl)),
            rfc3339(now),
        );

        let inserted = self
            .store
            .insert_if_absent(&record, now)
            .await
            .map_err(|source| IdempotencyError::persistence(use_case, &key, source))?;
        if inserted {
            debug!(
                use_case,
                key = %key,
                expiration = record.expiration,
                "idempotency record created"
            );
            return Ok(BeginOutcome::Started);
        }

        let existing = match self.store.get(use_case, &key).await {
            Ok(existing) => existing,
            Err(StorageError::RecordNotFound { .. }) => {
                debug!(use_case, key = %key, "record vanished between insert and read");
                return Err(IdempotencyError::UnknownKey {
                    use_case: use_case.to_string(),
                    key,
                });
            }
            Err(source) => return Err(IdempotencyError::persistence(use_case, &key, source)),
        };

        // Live when the insert was refused, expired by the time we read it.
        if existing.is_expired(self.clock.now_millis()) {
            debug!(use_case, key = %key, "record expired between insert and read");
            return Err(IdempotencyError::UnknownKey {
                use_case: use_case.to_string(),
                key,
            });
        }

        match existing.status {
            IdempotencyStatus::Completed => {
                debug!(use_case, key = %key, "use case already completed");
                let data = existing.result_data.unwrap_or(serde_json::Value::Null);
                Ok(BeginOutcome::AlreadyDone(serde_json::from_value(data)?))
            }
            IdempotencyStatus::InProgress => {
                debug!(use_case, key = %key, "use case already in progress");
                Ok(BeginOutcome::AlreadyInProgress)
            }
        }
    }

    /// Mark the record Completed and cache `result`.
    ///
    /// The record's expiration is reset to `now + completed_ttl`.
    pub async fn complete<I, O>(
        &self,
        use_case: &str,
        input: &I,
        result: &O,
    ) -> Result<(), IdempotencyError>
    where
        I: Serialize + ?Sized,
        O: Serialize + ?Sized,
    {
        self.config.validate()?;
        let key = self.derive_key(use_case, input)?;
        let data = serde_json::to_value(result)?;
        let expiration = self
            .clock
            .now_millis()
            .saturating_add(duration_millis(self.config.completed_ttl));

        match self
            .store
            .update(
                use_case,
                &key,
                IdempotencyStatus::Completed,
                Some(&data),
                expiration,
            )
            .await
        {
            Ok(()) => {
                debug!(use_case, key = %key, expiration, "idempotency record completed");
                Ok(())
            }
            Err(StorageError::RecordNotFound { .. }) => Err(IdempotencyError::RecordNotFound {
                use_case: use_case.to_string(),
                key,
            }),
            Err(source) => Err(IdempotencyError::persistence(use_case, &key, source)),
        }
    }

    /// Release the key so a later Begin starts fresh.
    ///
    /// Safe to call whenever execution fails or is abandoned: a record that
    /// is already gone is not an error.
    pub async fn abort<I>(&self, use_case: &str, input: &I) -> Result<(), IdempotencyError>
    where
        I: Serialize + ?Sized,
    {
        let key = self.derive_key(use_case, input)?;
        match self.store.delete(use_case, &key).await {
            Ok(()) => {
                debug!(use_case, key = %key, "idempotency record removed");
                Ok(())
            }
            Err(source) => {
                warn!(use_case, key = %key, error = %source, "unable to remove idempotency record");
                Err(IdempotencyError::UnableToRemove {
                    use_case: use_case.to_string(),
                    key,
                    source,
                })
            }
        }
    }

    /// The stored record for `input`, if any. Expired rows are returned
    /// as stored.
    pub async fn inspect<I>(
        &self,
        use_case: &str,
        input: &I,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyError>
    where
        I: Serialize + ?Sized,
    {
        let key = self.derive_key(use_case, input)?;
        match self.store.get(use_case, &key).await {
            Ok(record) => Ok(Some(record)),
            Err(StorageError::RecordNotFound { .. }) => Ok(None),
            Err(source) => Err(IdempotencyError::persistence(use_case, &key, source)),
        }
    }

    /// Run `use_case_fn` at most once for `input`.
    ///
    /// Begin; on `Started` run the closure, then Complete with its output,
    /// or Abort if it fails. A cached result or a concurrent execution is
    /// reported without calling the closure.
    ///
    /// If Complete finds the record gone (it expired and was purged during
    /// execution) the output is still returned. Any other Complete failure
    /// is returned and the record is left to expire, so duplicates stay
    /// blocked for the rest of the in-progress window.
    pub async fn execute<I, O, E, F, Fut>(
        &self,
        use_case: &str,
        input: &I,
        use_case_fn: F,
    ) -> Result<Execution<O>, ExecuteError<E>>
    where
        I: Serialize + ?Sized,
        O: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<O, E>>,
    {
        match self.begin::<I, O>(use_case, input).await? {
            BeginOutcome::Started => {}
            BeginOutcome::AlreadyDone(output) => return Ok(Execution::Cached(output)),
            BeginOutcome::AlreadyInProgress => return Ok(Execution::InProgress),
        }

        let output = match use_case_fn().await {
            Ok(output) => output,
            Err(e) => {
                if let Err(abort_err) = self.abort(use_case, input).await {
                    warn!(
                        use_case,
                        error = %abort_err,
                        "abort after failed use case did not succeed"
                    );
                }
                return Err(ExecuteError::UseCase(e));
            }
        };

        match self.complete(use_case, input, &output).await {
            Ok(()) => Ok(Execution::Executed(output)),
            Err(IdempotencyError::RecordNotFound { key, .. }) => {
                warn!(use_case, key = %key, "record expired before completion; result not cached");
                Ok(Execution::Executed(output))
            }
            Err(e) => Err(ExecuteError::Idempotency(e)),
        }
    }
}
