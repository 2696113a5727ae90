use std::fmt;

use crate::error::IdempotencyError;

/// What Begin observed for a (use case, input) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum BeginOutcome<O> {
    /// This caller owns the key. Run the use case, then call Complete, or
    /// Abort if it fails.
    Started,
    /// A previous execution completed. Do not run the use case again; use
    /// the cached result.
    AlreadyDone(O),
    /// Another caller holds a live, uncompleted record. This is a retryable
    /// conflict, not an internal error.
    AlreadyInProgress,
}

impl<O> BeginOutcome<O> {
    pub fn is_started(&self) -> bool {
        matches!(self, BeginOutcome::Started)
    }
}

/// Result of [`Idempotency::execute`](crate::Idempotency::execute).
#[derive(Debug, Clone, PartialEq)]
pub enum Execution<O> {
    /// The use case ran in this call.
    Executed(O),
    /// A previous run's cached result.
    Cached(O),
    /// Another caller is running the use case right now.
    InProgress,
}

impl<O> Execution<O> {
    /// The output, whether fresh or cached.
    pub fn into_output(self) -> Option<O> {
        match self {
            Execution::Executed(o) | Execution::Cached(o) => Some(o),
            Execution::InProgress => None,
        }
    }
}

/// Failure of [`Idempotency::execute`](crate::Idempotency::execute).
#[derive(Debug)]
pub enum ExecuteError<E> {
    /// The use case returned an error. Its record has been aborted so a
    /// later attempt can start fresh.
    UseCase(E),
    /// The idempotency bookkeeping failed.
    Idempotency(IdempotencyError),
}

impl<E: fmt::Display> fmt::Display for ExecuteError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecuteError::UseCase(e) => write!(f, "use case failed: {}", e),
            ExecuteError::Idempotency(e) => write!(f, "{}", e),
        }
    }
}

impl<E> std::error::Error for ExecuteError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecuteError::UseCase(e) => Some(e),
            ExecuteError::Idempotency(e) => Some(e),
        }
    }
}

impl<E> From<IdempotencyError> for ExecuteError<E> {
    fn from(e: IdempotencyError) -> Self {
        ExecuteError::Idempotency(e)
    }
}
