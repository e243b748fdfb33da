//! Backend picked at runtime from `[database]` configuration.

use umbra_config::{DatabaseBackend, DatabaseConfig};

use super::memory::{MemoryReadScope, MemoryWriteScope};
use super::rocks::{RocksReadScope, RocksWriteScope};
use super::{
    CommitLog, KvRead, KvWrite, MemoryStore, ReadScope, Result, RocksDbStore, TransactionalStore,
    WriteScope,
};

pub enum AnyStore {
    Memory(MemoryStore),
    RocksDb(RocksDbStore),
}

impl AnyStore {
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        match config.backend {
            DatabaseBackend::Memory => {
                log::info!("Using in-memory store");
                Ok(AnyStore::Memory(MemoryStore::new()))
            }
            DatabaseBackend::Rocksdb => Ok(AnyStore::RocksDb(RocksDbStore::open(&config.path)?)),
        }
    }

    pub fn sequence(&self) -> u64 {
        match self {
            AnyStore::Memory(s) => s.sequence(),
            AnyStore::RocksDb(s) => s.sequence(),
        }
    }
}

pub enum AnyRead<'a> {
    Memory(MemoryReadScope),
    RocksDb(RocksReadScope<'a>),
}

pub enum AnyWrite<'a> {
    Memory(MemoryWriteScope<'a>),
    RocksDb(RocksWriteScope<'a>),
}

impl KvRead for AnyRead<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self {
            AnyRead::Memory(s) => s.get(key),
            AnyRead::RocksDb(s) => s.get(key),
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        match self {
            AnyRead::Memory(s) => s.scan_prefix(prefix),
            AnyRead::RocksDb(s) => s.scan_prefix(prefix),
        }
    }
}

impl ReadScope for AnyRead<'_> {
    fn sequence(&self) -> Result<u64> {
        match self {
            AnyRead::Memory(s) => s.sequence(),
            AnyRead::RocksDb(s) => s.sequence(),
        }
    }
}

impl KvRead for AnyWrite<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self {
            AnyWrite::Memory(s) => s.get(key),
            AnyWrite::RocksDb(s) => s.get(key),
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        match self {
            AnyWrite::Memory(s) => s.scan_prefix(prefix),
            AnyWrite::RocksDb(s) => s.scan_prefix(prefix),
        }
    }
}

impl KvWrite for AnyWrite<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        match self {
            AnyWrite::Memory(s) => s.put(key, value),
            AnyWrite::RocksDb(s) => s.put(key, value),
        }
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        match self {
            AnyWrite::Memory(s) => s.delete(key),
            AnyWrite::RocksDb(s) => s.delete(key),
        }
    }
}

impl WriteScope for AnyWrite<'_> {
    fn commit(self) -> Result<CommitLog> {
        match self {
            AnyWrite::Memory(s) => s.commit(),
            AnyWrite::RocksDb(s) => s.commit(),
        }
    }
}

impl TransactionalStore for AnyStore {
    type Read<'a>
        = AnyRead<'a>
    where
        Self: 'a;
    type Write<'a>
        = AnyWrite<'a>
    where
        Self: 'a;

    fn begin_read(&self) -> Result<AnyRead<'_>> {
        Ok(match self {
            AnyStore::Memory(s) => AnyRead::Memory(s.begin_read()?),
            AnyStore::RocksDb(s) => AnyRead::RocksDb(s.begin_read()?),
        })
    }

    fn begin_write(&self) -> Result<AnyWrite<'_>> {
        Ok(match self {
            AnyStore::Memory(s) => AnyWrite::Memory(s.begin_write()?),
            AnyStore::RocksDb(s) => AnyWrite::RocksDb(s.begin_write()?),
        })
    }
}
