pub mod conformance;
mod error;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use memory::InMemoryStore;
pub use record::{IdempotencyRecord, IdempotencyStatus, UnknownStatus};
pub use traits::IdempotencyStore;
