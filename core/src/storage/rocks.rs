use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options,
    SnapshotWithThreadMode, WriteBatch,
};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    CommitLog, KvRead, KvWrite, Overlay, ReadScope, Result, StoreError, TransactionalStore,
    WriteScope,
};

const CF_KV: &str = "kv";
const CF_META: &str = "meta";

const META_SEQUENCE: &[u8] = b"sequence";

/// A thread-safe wrapper around RocksDB.
///
/// Ledger keys live in the `kv` column family. The commit sequence is kept in
/// `meta` and written in the same batch as the data it numbers.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    /// Held by the open write scope; the value is the last committed sequence.
    writer: Arc<Mutex<u64>>,
}

impl RocksDbStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_KV, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), families)?;

        let meta = db
            .cf_handle(CF_META)
            .ok_or(StoreError::MissingColumnFamily(CF_META))?;
        let sequence = decode_sequence(db.get_cf(meta, META_SEQUENCE)?)?;

        log::info!(
            "Opened RocksDB at {} (sequence {})",
            path.as_ref().display(),
            sequence
        );

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(sequence)),
        })
    }

    fn kv(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_KV)
            .ok_or(StoreError::MissingColumnFamily(CF_KV))
    }

    fn meta(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_META)
            .ok_or(StoreError::MissingColumnFamily(CF_META))
    }

    /// Sequence of the last commit, 0 before the first. Waits for an open
    /// write scope to finish.
    pub fn sequence(&self) -> u64 {
        *self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn decode_sequence(bytes: Option<Vec<u8>>) -> Result<u64> {
    match bytes {
        Some(bytes) => {
            let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                StoreError::Corrupted(format!("sequence has {} bytes", bytes.len()))
            })?;
            Ok(u64::from_be_bytes(arr))
        }
        None => Ok(0),
    }
}

fn snapshot_get(
    store: &RocksDbStore,
    snapshot: &SnapshotWithThreadMode<'_, DB>,
    key: &[u8],
) -> Result<Option<Vec<u8>>> {
    Ok(snapshot.get_cf(store.kv()?, key)?)
}

fn snapshot_scan(
    store: &RocksDbStore,
    snapshot: &SnapshotWithThreadMode<'_, DB>,
    prefix: &[u8],
) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let iter = snapshot.iterator_cf(store.kv()?, IteratorMode::From(prefix, Direction::Forward));

    let mut out = Vec::new();
    for item in iter {
        let (key, value) = item?;
        if !key.starts_with(prefix) {
            break;
        }
        out.push((key.into_vec(), value.into_vec()));
    }
    Ok(out)
}

pub struct RocksReadScope<'a> {
    store: &'a RocksDbStore,
    snapshot: SnapshotWithThreadMode<'a, DB>,
}

impl KvRead for RocksReadScope<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        snapshot_get(self.store, &self.snapshot, key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        snapshot_scan(self.store, &self.snapshot, prefix)
    }
}

impl ReadScope for RocksReadScope<'_> {
    /// Read from `meta` in the same snapshot, so it numbers exactly the
    /// data this scope sees.
    fn sequence(&self) -> Result<u64> {
        decode_sequence(self.snapshot.get_cf(self.store.meta()?, META_SEQUENCE)?)
    }
}

pub struct RocksWriteScope<'a> {
    store: &'a RocksDbStore,
    sequence: MutexGuard<'a, u64>,
    snapshot: SnapshotWithThreadMode<'a, DB>,
    overlay: Overlay,
}

impl KvRead for RocksWriteScope<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.overlay.lookup(key) {
            Some(pending) => Ok(pending),
            None => snapshot_get(self.store, &self.snapshot, key),
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let base = snapshot_scan(self.store, &self.snapshot, prefix)?;
        Ok(self.overlay.merge_scan(prefix, base))
    }
}

impl KvWrite for RocksWriteScope<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.overlay.put(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.overlay.delete(key);
        Ok(())
    }
}

impl WriteScope for RocksWriteScope<'_> {
    /// Atomically applies the overlay and the new sequence in one batch.
    fn commit(mut self) -> Result<CommitLog> {
        let kv = self.store.kv()?;
        let meta = self.store.meta()?;
        let sequence = *self.sequence + 1;

        let entries = std::mem::take(&mut self.overlay).into_entries();
        let mut batch = WriteBatch::default();
        for (key, commit) in &entries {
            match commit.data() {
                Some(value) => batch.put_cf(kv, key, value),
                None => batch.delete_cf(kv, key),
            }
        }
        batch.put_cf(meta, META_SEQUENCE, sequence.to_be_bytes());

        self.store.db.write(batch)?;
        *self.sequence = sequence;

        log::debug!("rocksdb commit {} ({} keys)", sequence, entries.len());
        Ok(CommitLog { sequence, entries })
    }
}

impl TransactionalStore for RocksDbStore {
    type Read<'a>
        = RocksReadScope<'a>
    where
        Self: 'a;
    type Write<'a>
        = RocksWriteScope<'a>
    where
        Self: 'a;

    fn begin_read(&self) -> Result<RocksReadScope<'_>> {
        Ok(RocksReadScope {
            store: self,
            snapshot: self.db.snapshot(),
        })
    }

    fn begin_write(&self) -> Result<RocksWriteScope<'_>> {
        let sequence = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(RocksWriteScope {
            store: self,
            sequence,
            snapshot: self.db.snapshot(),
            overlay: Overlay::default(),
        })
    }
}
