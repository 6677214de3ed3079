//! Commit driver.
//!
//! Applies a finished reconciliation to the archive in three steps:
//!
//! 1. Delete the members left in the index (when `remove > 0`).
//! 2. Add or replace every staged file (when `add + update > 0`).
//! 3. Remove the scratch directory.
//!
//! Each step runs regardless of how the previous one went. Failures are
//! logged as warnings and collected in the [`CommitReport`]; none of them
//! aborts the run.

use std::fmt;

use deem_core::{Counts, Key};

use crate::archive::Archive;
use crate::error::{io_err, SyncError};
use crate::reconcile::Staging;

/// A sub-step of the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    Delete,
    AddOrReplace,
    Cleanup,
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStep::Delete => write!(f, "delete members"),
            CommitStep::AddOrReplace => write!(f, "add or replace members"),
            CommitStep::Cleanup => write!(f, "clean up scratch directory"),
        }
    }
}

/// A step that did not complete.
#[derive(Debug)]
pub struct CommitFailure {
    pub step: CommitStep,
    pub error: SyncError,
}

/// What the commit did.
#[derive(Debug, Default)]
pub struct CommitReport {
    /// Steps that were attempted, in order.
    pub attempted: Vec<CommitStep>,
    pub failures: Vec<CommitFailure>,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, step: CommitStep, result: Result<(), SyncError>) {
        self.attempted.push(step);
        if let Err(error) = result {
            tracing::warn!("failed to {step}: {error}");
            self.failures.push(CommitFailure { step, error });
        }
    }
}

/// Apply `removals` and the staged content to `archive`, then clean up.
pub fn commit(
    archive: &impl Archive,
    removals: &[Key],
    counts: &Counts,
    staging: Staging,
) -> CommitReport {
    let mut report = CommitReport::default();

    if counts.remove > 0 {
        report.record(CommitStep::Delete, archive.delete_members(removals));
    }

    if counts.has_staged() {
        if let Some(dir) = staging.path() {
            report.record(
                CommitStep::AddOrReplace,
                archive.add_or_replace_members(dir),
            );
        }
    }

    let scratch = staging.path().map(|p| p.to_path_buf());
    let cleanup = staging.close();
    if let Some(scratch) = scratch {
        report.record(CommitStep::Cleanup, cleanup.map_err(|e| io_err(scratch, e)));
    }

    report
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::Path;

    use deem_core::{Record, Value};

    use super::*;
    use crate::memory::MemoryArchive;

    fn key(k: &str) -> Key {
        Key::new(k).unwrap()
    }

    fn record(k: &str, v: &str) -> Record {
        Record::new(key(k), Value::try_from(v).unwrap())
    }

    /// Archive whose delete always fails; adds are counted.
    #[derive(Default)]
    struct BrokenDelete {
        adds: Cell<usize>,
    }

    impl Archive for BrokenDelete {
        fn list(&self) -> Result<Option<Vec<Record>>, SyncError> {
            Ok(None)
        }

        fn delete_members(&self, _: &[Key]) -> Result<(), SyncError> {
            Err(SyncError::MissingKey(key("boom")))
        }

        fn add_or_replace_members(&self, _: &Path) -> Result<(), SyncError> {
            self.adds.set(self.adds.get() + 1);
            Ok(())
        }
    }

    /// Archive whose add/replace always fails; deletes are counted.
    #[derive(Default)]
    struct BrokenAdd {
        deletes: Cell<usize>,
    }

    impl Archive for BrokenAdd {
        fn list(&self) -> Result<Option<Vec<Record>>, SyncError> {
            Ok(None)
        }

        fn delete_members(&self, _: &[Key]) -> Result<(), SyncError> {
            self.deletes.set(self.deletes.get() + 1);
            Ok(())
        }

        fn add_or_replace_members(&self, _: &Path) -> Result<(), SyncError> {
            Err(SyncError::MissingKey(key("boom")))
        }
    }

    #[test]
    fn deletes_and_adds_then_cleans_up() {
        let root = tempfile::TempDir::new().unwrap();
        let archive = MemoryArchive::with_records([record("old", "1"), record("keep", "2")]);
        let mut staging = Staging::create_in(root.path()).unwrap();
        staging.stage(&record("new", "3")).unwrap();
        let scratch = staging.path().unwrap().to_path_buf();

        let counts = Counts {
            current: 2,
            input: 2,
            unchanged: 1,
            add: 1,
            update: 0,
            remove: 1,
        };
        let report = commit(&archive, &[key("old")], &counts, staging);

        assert!(report.is_clean(), "failures: {:?}", report.failures);
        assert_eq!(
            report.attempted,
            [
                CommitStep::Delete,
                CommitStep::AddOrReplace,
                CommitStep::Cleanup
            ]
        );
        assert_eq!(archive.snapshot(), [record("keep", "2"), record("new", "3")]);
        assert!(!scratch.exists());
    }

    #[test]
    fn nothing_to_do_only_cleans_up() {
        let root = tempfile::TempDir::new().unwrap();
        let archive = MemoryArchive::with_records([record("a", "1")]);
        let staging = Staging::create_in(root.path()).unwrap();

        let report = commit(&archive, &[], &Counts::default(), staging);
        assert_eq!(report.attempted, [CommitStep::Cleanup]);
        assert_eq!(archive.snapshot(), [record("a", "1")]);
    }

    #[test]
    fn failed_delete_still_adds_and_cleans_up() {
        let root = tempfile::TempDir::new().unwrap();
        let archive = BrokenDelete::default();
        let mut staging = Staging::create_in(root.path()).unwrap();
        staging.stage(&record("n", "1")).unwrap();
        let scratch = staging.path().unwrap().to_path_buf();

        let counts = Counts {
            add: 1,
            remove: 1,
            current: 1,
            input: 1,
            ..Counts::default()
        };
        let report = commit(&archive, &[key("gone")], &counts, staging);

        assert!(!report.is_clean());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, CommitStep::Delete);
        assert_eq!(archive.adds.get(), 1);
        assert!(!scratch.exists());
    }

    #[test]
    fn failed_add_still_cleans_up() {
        let root = tempfile::TempDir::new().unwrap();
        let archive = BrokenAdd::default();
        let mut staging = Staging::create_in(root.path()).unwrap();
        staging.stage(&record("n", "1")).unwrap();
        let scratch = staging.path().unwrap().to_path_buf();

        let counts = Counts {
            add: 1,
            remove: 1,
            current: 1,
            input: 1,
            ..Counts::default()
        };
        let report = commit(&archive, &[key("gone")], &counts, staging);

        assert_eq!(
            report.attempted,
            [
                CommitStep::Delete,
                CommitStep::AddOrReplace,
                CommitStep::Cleanup
            ]
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, CommitStep::AddOrReplace);
        assert_eq!(archive.deletes.get(), 1);
        assert!(!scratch.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn dry_staging_skips_add_and_cleanup() {
        let archive = MemoryArchive::missing();
        let counts = Counts {
            add: 1,
            input: 1,
            ..Counts::default()
        };
        let report = commit(&archive, &[], &counts, Staging::dry());
        assert!(report.attempted.is_empty());
        assert!(!archive.exists());
    }
}
