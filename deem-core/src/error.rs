//! Error types for deem-core.

use thiserror::Error;

/// Reasons a key or value is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("key is empty")]
    EmptyKey,

    #[error("value is empty")]
    EmptyValue,

    /// Field exceeds [`crate::MAX_FIELD_LEN`] bytes.
    #[error("{field} is {len} bytes long (limit {limit})")]
    TooLong {
        field: &'static str,
        len: usize,
        limit: usize,
    },

    #[error("key is not valid UTF-8")]
    NotUtf8,

    /// Key cannot be used as an archive member name.
    #[error("key '{key}' {reason}")]
    IllegalKey { key: String, reason: &'static str },
}
