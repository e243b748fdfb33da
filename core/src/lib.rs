//! # Umbra Core
//!
//! Confidential-balance ledger core:
//! - `storage`: the transactional key-value capability and its engines
//! - `ledger`: account store, registration set and transfer execution
//! - `heap`: stake-selection heap fed from commit logs
//! - `forging`: the forging wallet cache

pub mod forging;
pub mod heap;
pub mod ledger;
pub mod storage;

pub use forging::{ForgingAddress, ForgingWallet};
pub use heap::{HeapError, HeapKind, StakeHeap, StakeSelector};
pub use ledger::{
    AccountStore, ErrorKind, Ledger, LedgerError, LedgerSettings, RegistrationSet, RootHistory,
    TransferExecutor,
};
pub use storage::{AnyStore, CommitLog, MemoryStore, RocksDbStore, TransactionalStore};
