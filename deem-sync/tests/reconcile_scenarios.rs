//! End-to-end reconcile + commit scenarios against an in-memory archive.

use std::path::Path;

use deem_core::{Counts, Key, Record, Value};
use deem_sync::{plan, ArchiveState, MemoryArchive, SyncOptions};
use tempfile::TempDir;

fn record(k: &str, v: &str) -> Record {
    Record::new(Key::new(k).unwrap(), Value::try_from(v).unwrap())
}

fn options(root: &TempDir, dry_run: bool) -> SyncOptions {
    SyncOptions {
        dry_run,
        scratch_root: root.path().to_path_buf(),
    }
}

/// Plan and commit `input` against `archive`, returning the counts.
fn sync(archive: &MemoryArchive, input: &str, root: &TempDir) -> Counts {
    let _ = env_logger::builder().is_test(true).try_init();
    let plan = plan(archive, input.as_bytes(), &options(root, false)).expect("plan");
    let counts = plan.counts;
    let report = plan.commit(archive).expect("commit report");
    assert!(report.is_clean(), "failures: {:?}", report.failures);
    counts
}

fn scratch_entries(root: &Path) -> usize {
    std::fs::read_dir(root).expect("read scratch root").count()
}

#[test]
fn add_update_and_unchanged_in_one_run() {
    let root = TempDir::new().unwrap();
    let archive = MemoryArchive::with_records([record("a", "1"), record("b", "2")]);

    let counts = sync(&archive, "a 1\nb 3\nc 4", &root);

    assert_eq!(
        counts,
        Counts {
            current: 2,
            input: 3,
            unchanged: 1,
            add: 1,
            update: 1,
            remove: 0,
        }
    );
    assert_eq!(
        archive.snapshot(),
        [record("a", "1"), record("b", "3"), record("c", "4")]
    );
    assert_eq!(scratch_entries(root.path()), 0, "scratch area must be removed");
}

#[test]
fn empty_stream_empties_the_archive() {
    let root = TempDir::new().unwrap();
    let archive = MemoryArchive::with_records([record("a", "1"), record("b", "2")]);

    let counts = sync(&archive, "", &root);

    assert_eq!(counts.remove, 2);
    assert!(archive.exists());
    assert!(archive.snapshot().is_empty());
}

#[test]
fn duplicate_keys_count_as_two_adds() {
    let root = TempDir::new().unwrap();
    let archive = MemoryArchive::missing();

    let counts = sync(&archive, "a 1\na 1", &root);

    assert_eq!(counts.add, 2);
    assert_eq!(counts.input, 2);
    assert_eq!(archive.snapshot(), [record("a", "1")]);
}

#[test]
fn duplicate_key_last_value_is_stored() {
    let root = TempDir::new().unwrap();
    let archive = MemoryArchive::with_records([record("a", "1")]);

    let counts = sync(&archive, "a 1 a 2", &root);

    assert_eq!((counts.unchanged, counts.add, counts.remove), (1, 1, 0));
    assert_eq!(archive.snapshot(), [record("a", "2")]);
}

#[test]
fn second_identical_run_changes_nothing() {
    let root = TempDir::new().unwrap();
    let archive = MemoryArchive::with_records([record("x", "0"), record("b", "2")]);
    let input = "a 1\nb 3\nc 4\n";

    sync(&archive, input, &root);
    let second = sync(&archive, input, &root);

    assert_eq!(second.add, 0);
    assert_eq!(second.update, 0);
    assert_eq!(second.remove, 0);
    assert_eq!(second.unchanged, second.input);
}

#[test]
fn dry_run_reports_same_counts_and_touches_nothing() {
    let root = TempDir::new().unwrap();
    let seed = [record("a", "1"), record("b", "2"), record("gone", "9")];
    let input = "a 1 b 3 c 4";

    let dry_archive = MemoryArchive::with_records(seed.clone());
    let dry = plan(&dry_archive, input.as_bytes(), &options(&root, true)).expect("dry plan");
    let dry_counts = dry.counts;
    assert!(dry.commit(&dry_archive).is_none());
    assert_eq!(dry_archive.snapshot(), seed);
    assert_eq!(scratch_entries(root.path()), 0, "dry run must not stage");

    let real_archive = MemoryArchive::with_records(seed);
    let real_counts = sync(&real_archive, input, &root);
    assert_eq!(dry_counts, real_counts);
}

#[test]
fn missing_archive_is_created_by_commit() {
    let root = TempDir::new().unwrap();
    let archive = MemoryArchive::missing();

    let plan = plan(&archive, "k v".as_bytes(), &options(&root, false)).expect("plan");
    assert_eq!(plan.archive_state, ArchiveState::Missing);
    assert_eq!(plan.counts.current, 0);
    plan.commit(&archive).expect("report");

    assert_eq!(archive.snapshot(), [record("k", "v")]);
}

#[test]
fn remove_count_matches_current_minus_matches() {
    let root = TempDir::new().unwrap();
    let archive = MemoryArchive::with_records(
        ["a", "b", "c", "d", "e"].into_iter().map(|k| record(k, "1")),
    );

    let counts = sync(&archive, "a 1 b 2 z 1", &root);

    assert_eq!(counts.remove, counts.current - counts.update - counts.unchanged);
    assert_eq!(counts.remove, 3);
    assert_eq!(counts.input, counts.add + counts.update + counts.unchanged);
    assert_eq!(
        archive.snapshot(),
        [record("a", "1"), record("b", "2"), record("z", "1")]
    );
}

#[test]
fn malformed_tail_is_ignored() {
    let root = TempDir::new().unwrap();
    let archive = MemoryArchive::missing();

    let counts = sync(&archive, "a 1 b/bad 2 c 3", &root);

    assert_eq!(counts.input, 1);
    assert_eq!(archive.snapshot(), [record("a", "1")]);
}
