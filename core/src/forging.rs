//! Forging wallet cache.
//!
//! Keeps the accounts this node forges with, refreshed from commit logs. The
//! ordered address list and its key index live in one `Mutex` and are only
//! ever changed together. Every address remembers the commit sequence its
//! account was last read at, so a log older than that read is not applied
//! over it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use umbra_account::HomomorphicAccount;
use umbra_crypto::{POINT_SIZE, Point, SecretKey};

use crate::ledger::{AccountStore, Result, account_changes};
use crate::storage::{CommitLog, ReadScope, TransactionalStore};

type AddressKey = (Vec<u8>, [u8; POINT_SIZE]);

#[derive(Debug, Clone)]
pub struct ForgingAddress {
    pub delegated_key: SecretKey,
    pub delegated_public_key: Point,
    pub public_key: Point,
    pub asset: Vec<u8>,
    /// `None` while the account does not exist.
    pub account: Option<HomomorphicAccount>,
    /// Commit sequence `account` reflects.
    pub synced_at: u64,
}

impl ForgingAddress {
    fn key(&self) -> AddressKey {
        (self.asset.clone(), self.public_key.encode_compressed())
    }
}

#[derive(Default)]
struct WalletState {
    addresses: Vec<ForgingAddress>,
    by_key: HashMap<AddressKey, usize>,
    last_sequence: u64,
}

impl WalletState {
    fn reindex(&mut self) {
        self.by_key = self
            .addresses
            .iter()
            .enumerate()
            .map(|(i, address)| (address.key(), i))
            .collect();
    }
}

#[derive(Default)]
pub struct ForgingWallet {
    state: Mutex<WalletState>,
}

impl ForgingWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an address, reading its current account. An address already
    /// present for the same `(asset, public_key)` is replaced.
    pub fn add_wallet<S: TransactionalStore>(
        &self,
        store: &S,
        delegated_key: SecretKey,
        public_key: Point,
        asset: &[u8],
    ) -> Result<()> {
        let accounts = AccountStore::new(asset)?;
        let mut state = self.lock();
        let scope = store.begin_read()?;
        let account = accounts.get(&scope, &public_key)?;

        let address = ForgingAddress {
            delegated_public_key: delegated_key.public_key(),
            delegated_key,
            public_key,
            asset: asset.to_vec(),
            account,
            synced_at: scope.sequence()?,
        };
        let key = address.key();
        match state.by_key.get(&key).copied() {
            Some(i) => state.addresses[i] = address,
            None => {
                let i = state.addresses.len();
                state.addresses.push(address);
                state.by_key.insert(key, i);
            }
        }
        info!(
            "Forging with {} ({} addresses)",
            public_key.to_hex(),
            state.addresses.len()
        );
        Ok(())
    }

    /// Drops every address delegated to `delegated_public_key` from both the
    /// list and the index. Returns whether anything was removed.
    pub fn remove_wallet(&self, delegated_public_key: &Point) -> bool {
        let mut state = self.lock();
        let before = state.addresses.len();
        state
            .addresses
            .retain(|address| address.delegated_public_key != *delegated_public_key);
        if state.addresses.len() == before {
            return false;
        }
        state.reindex();
        true
    }

    /// Replays account changes of a commit log onto known addresses. Returns
    /// false for a sequence that was already applied. An address read at or
    /// after `log.sequence` keeps its account.
    pub fn update_balance_changes(&self, log: &CommitLog) -> Result<bool> {
        let changes = account_changes(log)?;
        let mut state = self.lock();
        if log.sequence <= state.last_sequence {
            return Ok(false);
        }

        let mut touched = 0;
        for change in changes {
            let key = (change.asset, change.public_key.encode_compressed());
            let Some(&i) = state.by_key.get(&key) else {
                continue;
            };
            let address = &mut state.addresses[i];
            if address.synced_at < log.sequence {
                address.account = change.account;
                address.synced_at = log.sequence;
                touched += 1;
            }
        }
        state.last_sequence = log.sequence;
        debug!(
            "forging wallet: commit {} touched {} addresses",
            log.sequence, touched
        );
        Ok(true)
    }

    /// Re-reads every address from one snapshot. Logs up to that snapshot's
    /// sequence count as applied.
    pub fn load_balances<S: TransactionalStore>(&self, store: &S) -> Result<()> {
        let mut state = self.lock();
        let scope = store.begin_read()?;
        let sequence = scope.sequence()?;
        for address in state.addresses.iter_mut() {
            let accounts = AccountStore::new(&address.asset)?;
            address.account = accounts.get(&scope, &address.public_key)?;
            address.synced_at = sequence;
        }
        state.last_sequence = state.last_sequence.max(sequence);
        Ok(())
    }

    pub fn list(&self) -> Vec<ForgingAddress> {
        self.lock().addresses.clone()
    }

    pub fn get(&self, asset: &[u8], public_key: &Point) -> Option<ForgingAddress> {
        let state = self.lock();
        let key = (asset.to_vec(), public_key.encode_compressed());
        state.by_key.get(&key).map(|&i| state.addresses[i].clone())
    }

    pub fn len(&self) -> usize {
        self.lock().addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
