use std::collections::HashSet;

use log::debug;
use umbra_crypto::ElGamal;
use umbra_transaction::{ConfidentialTransfer, ProofVerifier, TransferStatement};

use super::accounts::AccountStore;
use super::errors::{LedgerError, Result};
use super::registrations::RegistrationSet;
use super::root_history::{Root, RootHistory};
use crate::storage::KvWrite;

/// What an accepted transfer changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub ring_size: usize,
    pub new_registrations: usize,
    pub created_accounts: usize,
    /// State root after the transfer.
    pub root: Root,
}

/// Applies one confidential transfer inside a caller-owned write scope.
///
/// Nothing is committed here. On error the scope holds partial writes and
/// must be dropped.
pub struct TransferExecutor<'a, V: ProofVerifier + ?Sized> {
    verifier: &'a V,
    ring_max: usize,
    root_history: usize,
}

impl<'a, V: ProofVerifier + ?Sized> TransferExecutor<'a, V> {
    pub fn new(verifier: &'a V, ring_max: usize, root_history: usize) -> Self {
        Self {
            verifier,
            ring_max,
            root_history,
        }
    }

    pub fn execute<W: KvWrite + ?Sized>(
        &self,
        scope: &mut W,
        tx: &ConfidentialTransfer,
    ) -> Result<TransferReceipt> {
        let statement = &tx.statement;
        let accounts = AccountStore::new(&tx.asset)?;

        statement.validate(self.ring_max)?;
        check_distinct_members(statement)?;

        let mut roots = RootHistory::load(&*scope, self.root_history)?;
        if !roots.is_valid(&statement.root_hash) {
            return Err(LedgerError::UnknownRootHash(hex::encode(statement.root_hash)));
        }

        let ring = tx.ring();
        tx.registrations.validate(ring, self.ring_max)?;

        if !self.verifier.verify(statement, &tx.proof) {
            return Err(LedgerError::ProofRejected);
        }

        let new_registrations =
            RegistrationSet::new().register_now(scope, ring, tx.registrations.entries())?;

        let mut created_accounts = 0;
        for (i, public_key) in ring.iter().enumerate() {
            let (mut account, created) = accounts.get_or_create(scope, public_key)?;
            created_accounts += usize::from(created);

            let current = account.balance_ciphertext();
            if statement.c_ln[i] != current.left.add(&statement.c[i]) {
                return Err(LedgerError::StatementMismatch {
                    position: i,
                    field: "CLn",
                });
            }
            if statement.c_rn[i] != current.right.add(&statement.d) {
                return Err(LedgerError::StatementMismatch {
                    position: i,
                    field: "CRn",
                });
            }

            account.add_balance(&ElGamal::new(statement.c[i], statement.d));
            accounts.put(scope, &account)?;
        }

        let current = roots.current().copied().unwrap_or_default();
        let root = RootHistory::next_root(&current, &tx.encode()?);
        roots.push(root);
        roots.save(scope)?;

        debug!(
            "transfer applied: root {} -> {}",
            hex::encode(current),
            hex::encode(root)
        );
        Ok(TransferReceipt {
            ring_size: statement.ring_size,
            new_registrations,
            created_accounts,
            root,
        })
    }
}

fn check_distinct_members(statement: &TransferStatement) -> Result<()> {
    let mut seen = HashSet::with_capacity(statement.ring_size);
    for (i, public_key) in statement.public_key_list.iter().enumerate() {
        if !seen.insert(public_key) {
            return Err(LedgerError::DuplicateRingMember(i));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::root_history::GENESIS_ROOT;
    use crate::storage::{MemoryStore, TransactionalStore, WriteScope};
    use ark_std::test_rng;
    use umbra_crypto::{Point, Scalar, SecretKey};
    use umbra_transaction::{MockVerifier, RegistrationEntry, Registrations};

    const ASSET: &[u8] = b"UMB";

    /// Transfer over fresh accounts: every stored balance is `zero_for(pk)`.
    fn transfer(verifier: &MockVerifier, sks: &[SecretKey], root: Root) -> ConfidentialTransfer {
        let rng = &mut test_rng();
        let ring: Vec<Point> = sks.iter().map(SecretKey::public_key).collect();
        let r = Scalar::from_u64(5);
        let d = Point::mul_generator(&r);
        let c: Vec<Point> = ring
            .iter()
            .enumerate()
            .map(|(i, pk)| {
                let v = match i {
                    0 => Point::mul_generator(&Scalar::from_u64(3)).neg(),
                    1 => Point::mul_generator(&Scalar::from_u64(3)),
                    _ => Point::identity(),
                };
                v.add(&pk.mul(&r))
            })
            .collect();
        let zero: Vec<ElGamal> = ring.iter().map(ElGamal::zero_for).collect();
        let statement = TransferStatement {
            ring_size: ring.len(),
            c_ln: zero.iter().zip(&c).map(|(z, c)| z.left.add(c)).collect(),
            c_rn: zero.iter().map(|z| z.right.add(&d)).collect(),
            public_key_list: ring,
            c,
            d,
            fee: 0,
            root_hash: root,
        };
        let registrations = Registrations::new(
            sks.iter()
                .enumerate()
                .map(|(i, sk)| RegistrationEntry::sign(i as u64, sk, rng))
                .collect(),
        );
        let proof = verifier.proof_for(&statement);
        ConfidentialTransfer {
            asset: ASSET.to_vec(),
            registrations,
            statement,
            proof,
        }
    }

    fn secrets(n: usize) -> Vec<SecretKey> {
        let rng = &mut test_rng();
        (0..n).map(|_| SecretKey::generate(rng)).collect()
    }

    #[test]
    fn applies_balances_and_advances_root() {
        let store = MemoryStore::new();
        let verifier = MockVerifier::new();
        let executor = TransferExecutor::new(&verifier, 256, 10);
        let sks = secrets(2);
        let tx = transfer(&verifier, &sks, GENESIS_ROOT);

        let mut w = store.begin_write().unwrap();
        let receipt = executor.execute(&mut w, &tx).unwrap();
        assert_eq!(receipt.new_registrations, 2);
        assert_eq!(receipt.created_accounts, 2);
        assert_ne!(receipt.root, GENESIS_ROOT);
        w.commit().unwrap();

        let r = store.begin_read().unwrap();
        let accounts = AccountStore::new(ASSET).unwrap();
        let receiver = accounts.get(&r, &sks[1].public_key()).unwrap().unwrap();
        let plain = receiver.balance_ciphertext().decrypt_point(sks[1].scalar());
        assert_eq!(plain, Point::mul_generator(&Scalar::from_u64(3)));

        let roots = RootHistory::load(&r, 10).unwrap();
        assert_eq!(roots.current(), Some(&receipt.root));
        assert!(roots.is_valid(&GENESIS_ROOT));
    }

    #[test]
    fn rejects_unknown_root() {
        let store = MemoryStore::new();
        let verifier = MockVerifier::new();
        let executor = TransferExecutor::new(&verifier, 256, 10);
        let tx = transfer(&verifier, &secrets(2), [9u8; 32]);

        let mut w = store.begin_write().unwrap();
        let err = executor.execute(&mut w, &tx).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownRootHash(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn rejects_bad_proof() {
        let store = MemoryStore::new();
        let verifier = MockVerifier::new();
        let executor = TransferExecutor::new(&verifier, 256, 10);
        let mut tx = transfer(&verifier, &secrets(2), GENESIS_ROOT);
        tx.proof[0] ^= 1;

        let mut w = store.begin_write().unwrap();
        assert!(matches!(
            executor.execute(&mut w, &tx),
            Err(LedgerError::ProofRejected)
        ));
    }

    #[test]
    fn rejects_duplicate_members() {
        let store = MemoryStore::new();
        let verifier = MockVerifier::new();
        let executor = TransferExecutor::new(&verifier, 256, 10);
        let sk = secrets(1).remove(0);
        let twin = SecretKey::from_bytes(&sk.to_bytes()).unwrap();
        let tx = transfer(&verifier, &[sk, twin], GENESIS_ROOT);

        let mut w = store.begin_write().unwrap();
        assert!(matches!(
            executor.execute(&mut w, &tx),
            Err(LedgerError::DuplicateRingMember(1))
        ));
    }

    #[test]
    fn rejects_stale_balance() {
        let store = MemoryStore::new();
        let verifier = MockVerifier::new();
        let executor = TransferExecutor::new(&verifier, 256, 10);
        let sks = secrets(2);
        let tx = transfer(&verifier, &sks, GENESIS_ROOT);

        let mut w = store.begin_write().unwrap();
        executor.execute(&mut w, &tx).unwrap();
        w.commit().unwrap();

        // same statement again: balances moved on and registrations exist
        let mut replay = transfer(&verifier, &sks, GENESIS_ROOT);
        replay.registrations = Registrations::default();
        let mut w = store.begin_write().unwrap();
        assert!(matches!(
            executor.execute(&mut w, &replay),
            Err(LedgerError::StatementMismatch {
                position: 0,
                field: "CLn",
            })
        ));
    }
}
