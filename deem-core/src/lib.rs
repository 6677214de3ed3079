//! deem core library — record types, counts, errors.
//!
//! - [`types`] — validated keys/values and the reconciliation counters
//! - [`error`] — [`RecordError`]

pub mod error;
pub mod types;

pub use error::RecordError;
pub use types::{Counts, Key, Record, Value, MAX_FIELD_LEN};
