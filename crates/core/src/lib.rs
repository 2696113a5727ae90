//! idem-core: at-most-once execution of caller-defined use cases.
//!
//! A use case is guarded by an idempotency record kept in a shared
//! [`IdempotencyStore`]. The [`Idempotency`] coordinator drives the record
//! through its lifecycle:
//!
//! 1. [`Idempotency::begin`] derives the key and attempts an atomic
//!    conditional insert. Exactly one concurrent caller observes
//!    [`BeginOutcome::Started`]; the rest see
//!    [`BeginOutcome::AlreadyInProgress`] or [`BeginOutcome::AlreadyDone`].
//! 2. The winner runs the use case, then calls [`Idempotency::complete`]
//!    to cache the result, or [`Idempotency::abort`] to release the key.
//!
//! The coordinator holds no state between calls; mutual exclusion rests
//! entirely on the store's conditional insert. Records expire after a TTL,
//! which bounds how long an abandoned attempt can block duplicates.
//!
//! [`Idempotency::execute`] wraps the whole sequence around a closure.

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod key;
pub mod outcome;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{IdempotencyConfig, TtlSettings};
pub use coordinator::Idempotency;
pub use error::{ConfigError, IdempotencyError, KeyError};
pub use key::{fingerprint, KeyDeriver};
pub use outcome::{BeginOutcome, ExecuteError, Execution};

pub use idem_storage::{
    IdempotencyRecord, IdempotencyStatus, IdempotencyStore, InMemoryStore, StorageError,
};
