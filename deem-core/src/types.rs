//! Domain types for deem.
//!
//! A [`Record`] is one archive member: its name ([`Key`]) and its content
//! ([`Value`]). Both fields are bounded at [`MAX_FIELD_LEN`] bytes so that a
//! record read from the desired stream can always be stored as a member.

use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;

use crate::error::RecordError;

/// Upper bound, in bytes, for both keys and values.
pub const MAX_FIELD_LEN: usize = 259;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// A validated archive member name.
///
/// Names the archive tool would read as an option (leading `-`), a response
/// file (leading `@`) or a path (`/`, `.`, `..`) are refused.
///
/// Keys order byte-wise, which is the order deletions are reported in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn new(key: impl Into<String>) -> Result<Self, RecordError> {
        let key = key.into();
        if key.is_empty() {
            return Err(RecordError::EmptyKey);
        }
        if key.len() > MAX_FIELD_LEN {
            return Err(RecordError::TooLong {
                field: "key",
                len: key.len(),
                limit: MAX_FIELD_LEN,
            });
        }
        let illegal = |reason| RecordError::IllegalKey {
            key: key.clone(),
            reason,
        };
        if key == "." || key == ".." {
            return Err(illegal("is a directory reference"));
        }
        if key.starts_with('-') {
            return Err(illegal("starts with '-'"));
        }
        if key.starts_with('@') {
            return Err(illegal("starts with '@'"));
        }
        if key.contains('/') {
            return Err(illegal("contains '/'"));
        }
        if key.contains('\0') {
            return Err(illegal("contains NUL"));
        }
        if key.bytes().any(|b| b.is_ascii_whitespace()) {
            return Err(illegal("contains whitespace"));
        }
        Ok(Self(key))
    }

    /// Validate a key taken straight off a byte stream.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let key = std::str::from_utf8(bytes).map_err(|_| RecordError::NotUtf8)?;
        Self::new(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<&str> for Key {
    type Error = RecordError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for Key {
    type Error = RecordError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// Opaque member content, stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value(Vec<u8>);

impl Value {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, RecordError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(RecordError::EmptyValue);
        }
        if bytes.len() > MAX_FIELD_LEN {
            return Err(RecordError::TooLong {
                field: "value",
                len: bytes.len(),
                limit: MAX_FIELD_LEN,
            });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        String::from_utf8_lossy(&self.0).fmt(f)
    }
}

impl TryFrom<&str> for Value {
    type Error = RecordError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Key,
    pub value: Value,
}

impl Record {
    pub fn new(key: Key, value: Value) -> Self {
        Self { key, value }
    }

    /// Validate a raw `(key, value)` token pair.
    pub fn parse(key: &[u8], value: &[u8]) -> Result<Self, RecordError> {
        Ok(Self {
            key: Key::from_bytes(key)?,
            value: Value::new(value)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

/// Per-run reconciliation counters.
///
/// `remove` is filled in once the desired stream is exhausted, from whatever
/// is left in the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub current: usize,
    pub input: usize,
    pub unchanged: usize,
    pub add: usize,
    pub update: usize,
    pub remove: usize,
}

impl Counts {
    /// Number of member-level changes the commit would apply.
    pub fn changes(&self) -> usize {
        self.add + self.update + self.remove
    }

    /// Whether anything has to be staged into the archive.
    pub fn has_staged(&self) -> bool {
        self.add + self.update > 0
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Currently {} items, got {}, inserting {}, removing {}, updating {}.",
            self.current, self.input, self.add, self.remove, self.update
        )
    }
}
