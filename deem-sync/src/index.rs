//! Current-state index.
//!
//! An ordered map of the archive's members, built once per run from the
//! archive listing. The reconciler removes every key it matches, so once the
//! desired stream is consumed the index holds exactly the members to delete.

use std::collections::BTreeMap;

use deem_core::{Key, Value};

use crate::archive::Archive;
use crate::error::SyncError;

/// Whether the archive was there when the index was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    Existing,
    /// No archive yet; the commit will create it.
    Missing,
}

/// Ordered, unique-by-key view of the archive's current members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentIndex {
    entries: BTreeMap<Key, Value>,
}

impl CurrentIndex {
    /// List `archive` and index its members.
    ///
    /// A missing archive yields an empty index and [`ArchiveState::Missing`].
    /// A repeated member name keeps the first listed content, the member
    /// `ar` itself replaces or deletes.
    pub fn build(archive: &impl Archive) -> Result<(Self, ArchiveState), SyncError> {
        match archive.list()? {
            None => Ok((Self::default(), ArchiveState::Missing)),
            Some(records) => {
                let index: Self = records.into_iter().map(|r| (r.key, r.value)).collect();
                Ok((index, ArchiveState::Existing))
            }
        }
    }

    pub fn lookup(&self, key: &Key) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Remove a key the caller has already looked up.
    pub fn remove(&mut self, key: &Key) -> Result<Value, SyncError> {
        self.entries
            .remove(key)
            .ok_or_else(|| SyncError::MissingKey(key.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.keys()
    }

    pub fn into_keys(self) -> Vec<Key> {
        self.entries.into_keys().collect()
    }
}

/// First occurrence of a key wins.
impl FromIterator<(Key, Value)> for CurrentIndex {
    fn from_iter<T: IntoIterator<Item = (Key, Value)>>(iter: T) -> Self {
        let mut entries = BTreeMap::new();
        for (key, value) in iter {
            entries.entry(key).or_insert(value);
        }
        Self { entries }
    }
}
