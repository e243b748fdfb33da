#![allow(dead_code)]

use ark_std::rand::Rng;
use ark_std::test_rng;
use umbra_core::{Ledger, LedgerSettings, MemoryStore, TransactionalStore};
use umbra_crypto::{ElGamal, Point, Scalar, SecretKey};
use umbra_transaction::{
    ConfidentialTransfer, MockVerifier, RegistrationEntry, Registrations, TransferStatement,
};

pub const ASSET: &[u8] = b"UMB";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rng() -> impl Rng {
    test_rng()
}

/// `n` distinct keys; call once per test so keys never repeat.
pub fn secrets(rng: &mut impl Rng, n: usize) -> Vec<SecretKey> {
    (0..n).map(|_| SecretKey::generate(rng)).collect()
}

pub fn memory_ledger() -> Ledger<MemoryStore, MockVerifier> {
    init_logger();
    Ledger::new(
        MemoryStore::new(),
        MockVerifier::new(),
        LedgerSettings::default(),
    )
}

/// Transfer of one unit from ring member 0 to member 1 against the current
/// balances, bound to the current root, with a mock proof.
pub fn transfer<S: TransactionalStore>(
    ledger: &Ledger<S, MockVerifier>,
    ring: &[Point],
    entries: Vec<RegistrationEntry>,
) -> ConfidentialTransfer {
    let r = Scalar::from_u64(17);
    let d = Point::mul_generator(&r);
    let one = Point::mul_generator(&Scalar::from_u64(1));

    let mut c = Vec::with_capacity(ring.len());
    let mut c_ln = Vec::with_capacity(ring.len());
    let mut c_rn = Vec::with_capacity(ring.len());
    for (i, pk) in ring.iter().enumerate() {
        let value = match i {
            0 => one.neg(),
            1 => one,
            _ => Point::identity(),
        };
        let ci = value.add(&pk.mul(&r));
        let current = ledger
            .account(ASSET, pk)
            .unwrap()
            .map(|acc| *acc.balance_ciphertext())
            .unwrap_or_else(|| ElGamal::zero_for(pk));
        c_ln.push(current.left.add(&ci));
        c_rn.push(current.right.add(&d));
        c.push(ci);
    }

    let statement = TransferStatement {
        ring_size: ring.len(),
        c_ln,
        c_rn,
        public_key_list: ring.to_vec(),
        c,
        d,
        fee: 1,
        root_hash: ledger.current_root().unwrap(),
    };
    let proof = MockVerifier::new().proof_for(&statement);
    ConfidentialTransfer {
        asset: ASSET.to_vec(),
        registrations: Registrations::new(entries),
        statement,
        proof,
    }
}

/// Entries for `indices` of `ring_keys`, signed by the matching secrets.
pub fn entries(
    rng: &mut impl Rng,
    ring_keys: &[&SecretKey],
    indices: &[usize],
) -> Vec<RegistrationEntry> {
    indices
        .iter()
        .map(|&i| RegistrationEntry::sign(i as u64, ring_keys[i], rng))
        .collect()
}

/// Registers every key in `keys` through a transfer among themselves.
pub fn preregister<S: TransactionalStore>(
    ledger: &Ledger<S, MockVerifier>,
    rng: &mut impl Rng,
    keys: &[&SecretKey],
) {
    let ring: Vec<Point> = keys.iter().map(|k| k.public_key()).collect();
    let all: Vec<usize> = (0..keys.len()).collect();
    let tx = transfer(ledger, &ring, entries(rng, keys, &all));
    ledger.submit(&tx).unwrap();
}
