//! Shared reconcile-then-commit entrypoint.
//!
//! A run is split in two so the caller can report the counts before the
//! archive is touched:
//!
//! ```text
//! plan(archive, input, options) → Plan { counts, removals, staging }
//! plan.commit(archive)          → CommitReport   (None in dry-run)
//! ```

use std::io::BufRead;
use std::path::{Path, PathBuf};

use deem_core::{Counts, Key};

use crate::archive::Archive;
use crate::commit::{commit, CommitReport};
use crate::error::SyncError;
use crate::index::{ArchiveState, CurrentIndex};
use crate::reconcile::{reconcile, Staging};
use crate::tokens::DesiredStream;

/// Options for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Classify only; stage nothing and never commit.
    pub dry_run: bool,
    /// Directory the scratch area is created in.
    pub scratch_root: PathBuf,
}

impl SyncOptions {
    /// Options for syncing the archive at `archive_path`, scratch beside it.
    pub fn for_archive(archive_path: &Path, dry_run: bool) -> Self {
        Self {
            dry_run,
            scratch_root: scratch_root_for(archive_path),
        }
    }
}

/// Directory that holds `archive_path`; `.` for a bare file name.
pub fn scratch_root_for(archive_path: &Path) -> PathBuf {
    match archive_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// A completed classification pass, ready to commit.
#[derive(Debug)]
pub struct Plan {
    pub archive_state: ArchiveState,
    pub counts: Counts,
    /// Members to delete, ascending.
    pub removals: Vec<Key>,
    staging: Staging,
}

impl Plan {
    pub fn is_dry_run(&self) -> bool {
        self.staging.is_dry()
    }

    /// Apply the plan. Returns `None` for a dry run.
    pub fn commit(self, archive: &impl Archive) -> Option<CommitReport> {
        if self.staging.is_dry() {
            return None;
        }
        Some(commit(archive, &self.removals, &self.counts, self.staging))
    }
}

/// Index `archive`, stage the desired records read from `input`, and count.
pub fn plan<A, R>(archive: &A, input: R, options: &SyncOptions) -> Result<Plan, SyncError>
where
    A: Archive,
    R: BufRead,
{
    let (mut index, archive_state) = CurrentIndex::build(archive)?;
    tracing::debug!("indexed {} current member(s)", index.len());

    let mut staging = if options.dry_run {
        Staging::dry()
    } else {
        Staging::create_in(&options.scratch_root)?
    };

    let counts = reconcile(&mut index, DesiredStream::new(input), &mut staging)?;

    Ok(Plan {
        archive_state,
        counts,
        removals: index.into_keys(),
        staging,
    })
}
