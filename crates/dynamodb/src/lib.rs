//! DynamoDB implementation of [`IdempotencyStore`].
//!
//! One table holds every use case. Rows are keyed by `PK` (use case) and
//! `SK` (derived key). The insert condition evaluates expiry itself, so a
//! new Begin never waits on DynamoDB's background TTL deletion; the `ttl`
//! attribute only keeps the table from growing without bound. Updates only
//! require the row to exist, expired or not.
//!
//! [`IdempotencyStore`]: idem_storage::IdempotencyStore

mod config;
mod item;
mod store;
pub mod table;

pub use config::DynamoDbConfig;
pub use store::DynamoDbStore;
