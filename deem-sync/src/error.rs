//! Error types for deem-sync.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use deem_core::{Key, RecordError};

/// All errors that can arise from reconcile and commit operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive tool is not installed or not on `PATH`.
    #[error("archive tool '{program}' not found: {source}")]
    ToolNotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    /// The archive tool could not be started.
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The archive tool ran but reported failure.
    #[error("{command} exited with {status}: {stderr}")]
    ToolFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The member listing of an existing archive could not be parsed.
    #[error("malformed listing for {archive} at entry {entry}: {reason}")]
    MalformedListing {
        archive: PathBuf,
        entry: usize,
        reason: String,
    },

    /// A key expected in the index was not there.
    #[error("key '{0}' missing from the current-state index")]
    MissingKey(Key),

    #[error("invalid record: {0}")]
    Record(#[from] RecordError),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
