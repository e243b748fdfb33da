//! Stake-selection heap.
//!
//! A binary min/max heap over `(key, score)` with a key -> array position
//! side table, so arbitrary removal and score updates stay `O(log n)`.

pub mod elements;
pub mod min_max_heap;
pub mod selector;

pub use elements::{HeapDictElement, HeapElement, MAX_KEY_LEN};
pub use min_max_heap::{HeapKind, StakeHeap};
pub use selector::StakeSelector;

use thiserror::Error;
use umbra_codec::CodecError;

use crate::ledger::LedgerError;
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum HeapError {
    #[error("Heap key length {0} is invalid")]
    InvalidKey(usize),

    #[error("Heap score is NaN")]
    InvalidScore,

    #[error("Key {0} is already in the heap")]
    DuplicateKey(String),

    #[error("Key {0} is not in the heap")]
    KeyNotFound(String),

    #[error("Malformed heap element: {0}")]
    Codec(#[from] CodecError),

    #[error("Corrupted heap '{name}': {reason}")]
    Corrupted { name: String, reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, HeapError>;
