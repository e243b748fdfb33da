//! Transactional key-value capability.
//!
//! The ledger is written against these traits only. A write scope sees its
//! own uncommitted writes; nothing it does is visible to other scopes until
//! `commit`, and dropping it without committing discards everything.
//!
//! ```text
//!   begin_read ──► ReadScope  (snapshot, many at once)
//!   begin_write ─► WriteScope (one at a time) ──► commit ──► CommitLog
//!                                             └─► rollback / drop
//! ```

pub mod any;
pub mod memory;
pub mod rocks;

pub use any::AnyStore;
pub use memory::MemoryStore;
pub use rocks::RocksDbStore;

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("RocksDB error: {0}")]
    Rocks(#[from] rocksdb::Error),

    #[error("Column family '{0}' missing")]
    MissingColumnFamily(&'static str),

    #[error("Corrupted store metadata: {0}")]
    Corrupted(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One key's fate in a committed write scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    Update(Vec<u8>),
    Delete,
}

impl Commit {
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Commit::Update(bytes) => Some(bytes),
            Commit::Delete => None,
        }
    }
}

/// Everything a write scope changed, delivered once per commit.
///
/// `sequence` increases by one per commit of a store, starting at 1, so
/// observers can apply each log at most once and in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitLog {
    pub sequence: u64,
    pub entries: BTreeMap<Vec<u8>, Commit>,
}

impl CommitLog {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &[u8]) -> Option<&Commit> {
        self.entries.get(key)
    }

    /// Entries whose key starts with `prefix`, in key order.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a [u8], &'a Commit)> + 'a {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_slice(), v))
    }
}

pub trait KvRead {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// All live pairs whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

pub trait KvWrite: KvRead {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&mut self, key: &[u8]) -> Result<()>;
}

pub trait ReadScope: KvRead {
    /// Sequence of the last commit visible in this snapshot, 0 before the
    /// first.
    fn sequence(&self) -> Result<u64>;
}

pub trait WriteScope: KvWrite {
    /// Publishes every write atomically and returns what changed.
    fn commit(self) -> Result<CommitLog>
    where
        Self: Sized;

    fn rollback(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

pub trait TransactionalStore: Send + Sync {
    type Read<'a>: ReadScope
    where
        Self: 'a;
    type Write<'a>: WriteScope
    where
        Self: 'a;

    fn begin_read(&self) -> Result<Self::Read<'_>>;

    /// Blocks while another write scope is open.
    fn begin_write(&self) -> Result<Self::Write<'_>>;
}

/// Pending writes of a scope, layered over its base snapshot.
#[derive(Debug, Default)]
pub(crate) struct Overlay {
    pub(crate) writes: BTreeMap<Vec<u8>, Commit>,
}

impl Overlay {
    /// `Some(Some(v))` for a pending put, `Some(None)` for a pending delete,
    /// `None` when the key is untouched.
    pub(crate) fn lookup(&self, key: &[u8]) -> Option<Option<Vec<u8>>> {
        self.writes.get(key).map(|c| c.data().map(<[u8]>::to_vec))
    }

    pub(crate) fn put(&mut self, key: &[u8], value: &[u8]) {
        self.writes
            .insert(key.to_vec(), Commit::Update(value.to_vec()));
    }

    pub(crate) fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), Commit::Delete);
    }

    /// Merges a base prefix scan with the pending writes.
    pub(crate) fn merge_scan(
        &self,
        prefix: &[u8],
        base: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = base.into_iter().collect();
        for (key, commit) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match commit {
                Commit::Update(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                Commit::Delete => {
                    merged.remove(key);
                }
            }
        }
        merged.into_iter().collect()
    }

    pub(crate) fn into_entries(self) -> BTreeMap<Vec<u8>, Commit> {
        self.writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_log_prefix_view() {
        let mut log = CommitLog {
            sequence: 1,
            ..Default::default()
        };
        let entries = &mut log.entries;
        entries.insert(b"acc/1".to_vec(), Commit::Update(vec![1]));
        entries.insert(b"acc/2".to_vec(), Commit::Delete);
        entries.insert(b"reg/1".to_vec(), Commit::Update(vec![0]));

        let accounts: Vec<_> = log.with_prefix(b"acc/").collect();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[1].1, &Commit::Delete);
        assert_eq!(log.with_prefix(b"zzz").count(), 0);
    }

    #[test]
    fn overlay_merges_scan() {
        let mut overlay = Overlay::default();
        overlay.put(b"p/b", b"new");
        overlay.delete(b"p/a");
        overlay.put(b"q/x", b"other");

        let base = vec![
            (b"p/a".to_vec(), b"1".to_vec()),
            (b"p/c".to_vec(), b"3".to_vec()),
        ];
        let merged = overlay.merge_scan(b"p/", base);
        assert_eq!(
            merged,
            vec![
                (b"p/b".to_vec(), b"new".to_vec()),
                (b"p/c".to_vec(), b"3".to_vec()),
            ]
        );
        assert_eq!(overlay.lookup(b"p/a"), Some(None));
        assert_eq!(overlay.lookup(b"p/z"), None);
    }
}
