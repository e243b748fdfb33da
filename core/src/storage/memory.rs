use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use super::{
    CommitLog, KvRead, KvWrite, Overlay, ReadScope, Result, TransactionalStore, WriteScope,
};

#[derive(Debug, Default)]
struct Snapshot {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    sequence: u64,
}

impl Snapshot {
    fn scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// In-memory store with copy-on-write snapshots.
///
/// Read scopes hold an `Arc` of the snapshot current when they began. Write
/// scopes are serialized by `writer` and publish a new snapshot on commit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sequence of the last commit, 0 before the first.
    pub fn sequence(&self) -> u64 {
        self.snapshot().sequence
    }
}

pub struct MemoryReadScope {
    snapshot: Arc<Snapshot>,
}

impl KvRead for MemoryReadScope {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.snapshot.data.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self.snapshot.scan(prefix))
    }
}

impl ReadScope for MemoryReadScope {
    fn sequence(&self) -> Result<u64> {
        Ok(self.snapshot.sequence)
    }
}

pub struct MemoryWriteScope<'a> {
    store: &'a MemoryStore,
    _guard: MutexGuard<'a, ()>,
    base: Arc<Snapshot>,
    overlay: Overlay,
}

impl KvRead for MemoryWriteScope<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.overlay.lookup(key) {
            Some(pending) => Ok(pending),
            None => Ok(self.base.data.get(key).cloned()),
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self.overlay.merge_scan(prefix, self.base.scan(prefix)))
    }
}

impl KvWrite for MemoryWriteScope<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.overlay.put(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.overlay.delete(key);
        Ok(())
    }
}

impl WriteScope for MemoryWriteScope<'_> {
    fn commit(self) -> Result<CommitLog> {
        let entries = self.overlay.into_entries();
        let mut data = self.base.data.clone();
        for (key, commit) in &entries {
            match commit.data() {
                Some(value) => {
                    data.insert(key.clone(), value.to_vec());
                }
                None => {
                    data.remove(key);
                }
            }
        }

        let sequence = self.base.sequence + 1;
        *self
            .store
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(Snapshot { data, sequence });

        log::debug!("memory store commit {} ({} keys)", sequence, entries.len());
        Ok(CommitLog { sequence, entries })
    }
}

impl TransactionalStore for MemoryStore {
    type Read<'a>
        = MemoryReadScope
    where
        Self: 'a;
    type Write<'a>
        = MemoryWriteScope<'a>
    where
        Self: 'a;

    fn begin_read(&self) -> Result<MemoryReadScope> {
        Ok(MemoryReadScope {
            snapshot: self.snapshot(),
        })
    }

    fn begin_write(&self) -> Result<MemoryWriteScope<'_>> {
        let guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // taken under the writer lock, so no commit can land in between
        let base = self.snapshot();
        Ok(MemoryWriteScope {
            store: self,
            _guard: guard,
            base,
            overlay: Overlay::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Commit;

    #[test]
    fn write_scope_reads_own_writes() {
        let store = MemoryStore::new();
        let mut w = store.begin_write().unwrap();
        w.put(b"k", b"v").unwrap();
        assert_eq!(w.get(b"k").unwrap(), Some(b"v".to_vec()));
        w.delete(b"k").unwrap();
        assert_eq!(w.get(b"k").unwrap(), None);
    }

    #[test]
    fn commit_publishes_and_logs() {
        let store = MemoryStore::new();
        let mut w = store.begin_write().unwrap();
        w.put(b"a", b"1").unwrap();
        w.put(b"b", b"2").unwrap();
        let log = w.commit().unwrap();
        assert_eq!(log.sequence, 1);
        assert_eq!(log.get(b"a"), Some(&Commit::Update(b"1".to_vec())));

        let mut w = store.begin_write().unwrap();
        w.delete(b"a").unwrap();
        let log = w.commit().unwrap();
        assert_eq!(log.sequence, 2);
        assert_eq!(log.get(b"a"), Some(&Commit::Delete));

        let r = store.begin_read().unwrap();
        assert_eq!(r.get(b"a").unwrap(), None);
        assert_eq!(r.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.sequence(), 2);
    }

    #[test]
    fn drop_is_rollback() {
        let store = MemoryStore::new();
        {
            let mut w = store.begin_write().unwrap();
            w.put(b"gone", b"x").unwrap();
        }
        let mut w = store.begin_write().unwrap();
        w.put(b"gone", b"y").unwrap();
        w.rollback();

        assert_eq!(store.begin_read().unwrap().get(b"gone").unwrap(), None);
        assert_eq!(store.sequence(), 0);
    }

    #[test]
    fn read_scope_is_a_snapshot() {
        let store = MemoryStore::new();
        let mut w = store.begin_write().unwrap();
        w.put(b"k", b"old").unwrap();
        w.commit().unwrap();

        let before = store.begin_read().unwrap();
        let mut w = store.begin_write().unwrap();
        w.put(b"k", b"new").unwrap();
        w.put(b"k2", b"x").unwrap();
        w.commit().unwrap();

        assert_eq!(before.get(b"k").unwrap(), Some(b"old".to_vec()));
        assert_eq!(before.scan_prefix(b"k").unwrap().len(), 1);
        assert_eq!(before.sequence().unwrap(), 1);
        assert_eq!(
            store.begin_read().unwrap().get(b"k").unwrap(),
            Some(b"new".to_vec())
        );
    }

    #[test]
    fn writers_are_serialized() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let mut w = store.begin_write().unwrap();
                    let count = w.get(b"count").unwrap().map(|v| v[0]).unwrap_or(0);
                    w.put(b"count", &[count + 1]).unwrap();
                    w.put(&[b'w', i], &[i]).unwrap();
                    w.commit().unwrap()
                })
            })
            .collect();

        let mut sequences: Vec<u64> = handles
            .into_iter()
            .map(|h| h.join().unwrap().sequence)
            .collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=8).collect::<Vec<_>>());
        let r = store.begin_read().unwrap();
        assert_eq!(r.get(b"count").unwrap(), Some(vec![8]));
    }
}
