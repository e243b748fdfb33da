use umbra_codec::{BufferReader, BufferWriter};
use umbra_transaction::ROOT_HASH_SIZE;

use super::errors::{LedgerError, Result};
use super::keys;
use crate::storage::{KvRead, KvWrite};

pub type Root = [u8; ROOT_HASH_SIZE];

/// State root of an empty ledger.
pub const GENESIS_ROOT: Root = [0u8; ROOT_HASH_SIZE];

/// Window of recent state roots a statement may be bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootHistory {
    /// Recent roots (most recent first)
    roots: Vec<Root>,
    max_size: usize,
}

impl RootHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            roots: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    pub fn push(&mut self, root: Root) {
        self.roots.insert(0, root);
        self.roots.truncate(self.max_size);
    }

    pub fn is_valid(&self, root: &Root) -> bool {
        self.roots.contains(root)
    }

    pub fn current(&self) -> Option<&Root> {
        self.roots.first()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Root that follows `current` once `transfer` is applied.
    pub fn next_root(current: &Root, transfer: &[u8]) -> Root {
        let mut hasher = blake3::Hasher::new();
        hasher.update(current);
        hasher.update(transfer);
        *hasher.finalize().as_bytes()
    }

    /// Loads the persisted window; an empty ledger starts at `GENESIS_ROOT`.
    pub fn load<R: KvRead + ?Sized>(scope: &R, max_size: usize) -> Result<Self> {
        let mut history = Self::new(max_size);
        let Some(bytes) = scope.get(keys::ROOT_HISTORY)? else {
            history.push(GENESIS_ROOT);
            return Ok(history);
        };

        let mut r = BufferReader::new(&bytes);
        let count = r.read_len((bytes.len() / ROOT_HASH_SIZE) as u64)?;
        if count == 0 {
            return Err(LedgerError::Corrupted("empty root history".into()));
        }
        let mut roots = Vec::with_capacity(count);
        for _ in 0..count {
            roots.push(r.read_array::<ROOT_HASH_SIZE>()?);
        }
        r.finish()?;

        roots.truncate(history.max_size);
        history.roots = roots;
        Ok(history)
    }

    pub fn save<W: KvWrite + ?Sized>(&self, scope: &mut W) -> Result<()> {
        let mut w = BufferWriter::with_capacity(10 + self.roots.len() * ROOT_HASH_SIZE);
        w.write_uvarint(self.roots.len() as u64);
        for root in &self.roots {
            w.write(root);
        }
        scope.put(keys::ROOT_HISTORY, w.as_bytes())?;
        Ok(())
    }
}
