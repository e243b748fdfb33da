//! Confidential-balance ledger.
//!
//! A transfer is executed inside one write scope of the injected store:
//!
//! ```text
//! validate statement ─► root window ─► registrations (stateless)
//!        ─► proof ─► register_now (both phases) ─► balances ─► next root
//! ```
//!
//! The scope commits only when every step succeeds; any error drops it and
//! leaves no trace in the registration set or the balances.

pub mod accounts;
pub mod errors;
pub mod executor;
pub mod keys;
pub mod registrations;
pub mod root_history;

pub use accounts::{AccountChange, AccountStore, account_changes};
pub use errors::{ErrorKind, LedgerError, Result};
pub use executor::{TransferExecutor, TransferReceipt};
pub use registrations::RegistrationSet;
pub use root_history::{GENESIS_ROOT, Root, RootHistory};

use log::{info, warn};
use umbra_account::HomomorphicAccount;
use umbra_config::LedgerConfig;
use umbra_crypto::Point;
use umbra_transaction::{BloomResolver, ConfidentialTransfer, ProofVerifier};

use crate::storage::{CommitLog, TransactionalStore, WriteScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    pub ring_max: usize,
    pub root_history: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for LedgerSettings {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            ring_max: config.ring_max,
            root_history: config.root_history,
        }
    }
}

pub struct Ledger<S, V> {
    store: S,
    verifier: V,
    settings: LedgerSettings,
}

impl<S: TransactionalStore, V: ProofVerifier> Ledger<S, V> {
    pub fn new(store: S, verifier: V, settings: LedgerSettings) -> Self {
        Self {
            store,
            verifier,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Executes and commits one transfer. On error nothing is committed.
    pub fn submit(&self, tx: &ConfidentialTransfer) -> Result<CommitLog> {
        let mut scope = self.store.begin_write()?;
        let executor = TransferExecutor::new(
            &self.verifier,
            self.settings.ring_max,
            self.settings.root_history,
        );

        let committed = match executor.execute(&mut scope, tx) {
            Ok(receipt) => scope
                .commit()
                .map(|log| (log, receipt))
                .map_err(LedgerError::from),
            Err(e) => {
                scope.rollback();
                Err(e)
            }
        };

        match committed {
            Ok((log, receipt)) => {
                info!(
                    "Accepted transfer #{}: ring {} | {} new registrations | {} new accounts",
                    log.sequence,
                    receipt.ring_size,
                    receipt.new_registrations,
                    receipt.created_accounts
                );
                Ok(log)
            }
            Err(e) => {
                warn!("Rejected transfer ({:?}): {}", e.kind(), e);
                Err(e)
            }
        }
    }

    /// Decodes a wire transfer, resolving bloomed slots through `resolver`,
    /// and submits it.
    pub fn submit_bytes<R: BloomResolver + ?Sized>(
        &self,
        bytes: &[u8],
        resolver: &R,
    ) -> Result<CommitLog> {
        let tx = ConfidentialTransfer::decode(bytes, self.settings.ring_max, resolver)
            .map_err(LedgerError::from)
            .inspect_err(|e| warn!("Rejected transfer ({:?}): {}", e.kind(), e))?;
        self.submit(&tx)
    }

    /// Runs `f` against one consistent snapshot.
    pub fn read<'s, T, F>(&'s self, f: F) -> Result<T>
    where
        F: FnOnce(&S::Read<'s>) -> Result<T>,
    {
        let scope = self.store.begin_read()?;
        f(&scope)
    }

    /// Most recent accepted state root.
    pub fn current_root(&self) -> Result<Root> {
        self.read(|scope| {
            let history = RootHistory::load(scope, self.settings.root_history)?;
            Ok(history.current().copied().unwrap_or(GENESIS_ROOT))
        })
    }

    pub fn account(&self, asset: &[u8], public_key: &Point) -> Result<Option<HomomorphicAccount>> {
        let accounts = AccountStore::new(asset)?;
        self.read(|scope| accounts.get(scope, public_key))
    }

    pub fn is_registered(&self, public_key: &Point) -> Result<bool> {
        self.read(|scope| RegistrationSet::new().is_registered(scope, public_key))
    }
}
