//! Reconciler — classify desired records against the current-state index.
//!
//! For every record `(k, v)`, in arrival order:
//!
//! 1. `k` not in the index → **add**; stage `v`.
//! 2. `k` indexed with a different value → **update**; remove `k`; stage `v`.
//! 3. `k` indexed with the same value → **unchanged**; remove `k`.
//!
//! Matched keys leave the index, so a key repeated later in the stream is
//! classified as a fresh add and staged again (last content wins).

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use deem_core::{Counts, Record};

use crate::archive::SCRATCH_PREFIX;
use crate::error::{io_err, SyncError};
use crate::index::CurrentIndex;

// ---------------------------------------------------------------------------
// Staging
// ---------------------------------------------------------------------------

/// Scratch directory holding new and changed values until commit.
///
/// Each staged file is named after its key and holds the value verbatim.
#[derive(Debug)]
pub struct Staging {
    dir: Option<TempDir>,
}

impl Staging {
    /// Dry-run staging: nothing is written.
    pub fn dry() -> Self {
        Self { dir: None }
    }

    /// Create a uniquely named scratch directory inside `root`.
    pub fn create_in(root: &Path) -> Result<Self, SyncError> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)
            .map_err(|e| io_err(root, e))?;
        tracing::debug!("staging in {}", dir.path().display());
        Ok(Self { dir: Some(dir) })
    }

    pub fn is_dry(&self) -> bool {
        self.dir.is_none()
    }

    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Write `record.value` to `<dir>/<record.key>`, replacing earlier content.
    pub fn stage(&mut self, record: &Record) -> Result<(), SyncError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let path: PathBuf = dir.path().join(record.key.as_str());
        std::fs::write(&path, record.value.as_bytes()).map_err(|e| io_err(&path, e))
    }

    /// Remove the scratch directory and everything staged in it.
    pub fn close(self) -> io::Result<()> {
        match self.dir {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// How a single desired record relates to the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Add,
    Update,
    Unchanged,
}

/// Classify one record, updating `index` and `staging`.
pub fn classify(
    index: &mut CurrentIndex,
    record: &Record,
    staging: &mut Staging,
) -> Result<Classification, SyncError> {
    let class = match index.lookup(&record.key) {
        None => Classification::Add,
        Some(current) if current != &record.value => Classification::Update,
        Some(_) => Classification::Unchanged,
    };
    if class != Classification::Add {
        index.remove(&record.key)?;
    }
    if class != Classification::Unchanged {
        staging.stage(record)?;
    }
    tracing::debug!("{}: {}", class.label(), record.key);
    Ok(class)
}

/// Consume `desired` against `index`.
///
/// On return `index` holds exactly the members to delete, and
/// `counts.remove == index.len()`.
pub fn reconcile<I>(
    index: &mut CurrentIndex,
    desired: I,
    staging: &mut Staging,
) -> Result<Counts, SyncError>
where
    I: IntoIterator<Item = Record>,
{
    let mut counts = Counts {
        current: index.len(),
        ..Counts::default()
    };

    for record in desired {
        counts.input += 1;
        match classify(index, &record, staging)? {
            Classification::Add => counts.add += 1,
            Classification::Update => counts.update += 1,
            Classification::Unchanged => counts.unchanged += 1,
        }
    }

    counts.remove = counts.current - counts.update - counts.unchanged;
    debug_assert_eq!(counts.remove, index.len());
    Ok(counts)
}

impl Classification {
    fn label(self) -> &'static str {
        match self {
            Classification::Add => "add",
            Classification::Update => "update",
            Classification::Unchanged => "unchanged",
        }
    }
}
