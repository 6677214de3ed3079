//! In-process archive.
//!
//! [`MemoryArchive`] keeps its members in a map and implements [`Archive`]
//! without touching any external tool. Staged files are read back from disk
//! on `add_or_replace_members`, exactly like a real archiver would.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;

use deem_core::{Key, Record, Value};

use crate::archive::{staged_files, Archive};
use crate::error::{io_err, SyncError};

/// An archive held in memory. `None` models an archive file that does not
/// exist yet; the first add creates it.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    members: RefCell<Option<BTreeMap<Key, Value>>>,
}

impl MemoryArchive {
    /// An archive that does not exist yet.
    pub fn missing() -> Self {
        Self::default()
    }

    /// An existing archive holding `records`.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let members = records.into_iter().map(|r| (r.key, r.value)).collect();
        Self {
            members: RefCell::new(Some(members)),
        }
    }

    pub fn exists(&self) -> bool {
        self.members.borrow().is_some()
    }

    /// Current members in key order (empty when missing).
    pub fn snapshot(&self) -> Vec<Record> {
        self.members
            .borrow()
            .iter()
            .flatten()
            .map(|(k, v)| Record::new(k.clone(), v.clone()))
            .collect()
    }
}

impl Archive for MemoryArchive {
    fn list(&self) -> Result<Option<Vec<Record>>, SyncError> {
        Ok(self.exists().then(|| self.snapshot()))
    }

    fn delete_members(&self, keys: &[Key]) -> Result<(), SyncError> {
        if let Some(members) = self.members.borrow_mut().as_mut() {
            for key in keys {
                members.remove(key);
            }
        }
        Ok(())
    }

    fn add_or_replace_members(&self, dir: &Path) -> Result<(), SyncError> {
        let mut staged = Vec::new();
        for path in staged_files(dir)? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content = std::fs::read(&path).map_err(|e| io_err(&path, e))?;
            staged.push((Key::new(name)?, Value::new(content)?));
        }
        self.members
            .borrow_mut()
            .get_or_insert_with(BTreeMap::new)
            .extend(staged);
        Ok(())
    }
}
