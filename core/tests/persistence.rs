mod common;

use common::{ASSET, entries, init_logger, preregister, rng, secrets, transfer};
use tempfile::TempDir;
use umbra_config::{DatabaseBackend, DatabaseConfig, UmbraConfig};
use umbra_core::ledger::GENESIS_ROOT;
use umbra_core::storage::WriteScope;
use umbra_core::{
    AnyStore, ForgingWallet, HeapKind, Ledger, LedgerSettings, StakeHeap, StakeSelector,
    TransactionalStore,
};
use umbra_crypto::{Point, SecretKey};
use umbra_transaction::MockVerifier;

fn rocks_ledger(dir: &TempDir) -> Ledger<AnyStore, MockVerifier> {
    init_logger();
    let mut config = UmbraConfig::default();
    config.database = DatabaseConfig {
        path: dir.path().join("ledger").display().to_string(),
        backend: DatabaseBackend::Rocksdb,
    };
    config.ledger.root_history = 4;
    let store = AnyStore::open(&config.database).unwrap();
    let settings = LedgerSettings::from(&config.ledger);
    Ledger::new(store, MockVerifier::new(), settings)
}

#[test]
fn rocksdb_ledger_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let rng = &mut rng();
    let sks = secrets(rng, 4);
    let ring: Vec<Point> = sks.iter().map(SecretKey::public_key).collect();

    let root = {
        let ledger = rocks_ledger(&dir);
        preregister(&ledger, rng, &[&sks[1], &sks[3]]);
        let signers: Vec<&SecretKey> = sks.iter().collect();
        ledger
            .submit(&transfer(&ledger, &ring, entries(rng, &signers, &[0, 2])))
            .unwrap();
        ledger.current_root().unwrap()
    };
    assert_ne!(root, GENESIS_ROOT);

    let ledger = rocks_ledger(&dir);
    assert_eq!(ledger.store().sequence(), 2);
    assert_eq!(ledger.current_root().unwrap(), root);
    for pk in &ring {
        assert!(ledger.is_registered(pk).unwrap());
    }
    let receiver = ledger.account(ASSET, &ring[1]).unwrap().unwrap();
    assert!(
        receiver
            .balance_ciphertext()
            .decrypt_point(sks[1].scalar())
            .is_identity()
    );

    // the reopened ledger keeps accepting transfers bound to the stored root
    ledger
        .submit(&transfer(&ledger, &ring, Vec::new()))
        .unwrap();
}

#[test]
fn root_window_expires_old_roots() {
    let dir = TempDir::new().unwrap();
    let ledger = rocks_ledger(&dir);
    let rng = &mut rng();
    let sks = secrets(rng, 2);
    let ring: Vec<Point> = sks.iter().map(SecretKey::public_key).collect();
    preregister(&ledger, rng, &[&sks[0], &sks[1]]);

    let stale = transfer(&ledger, &ring, Vec::new());
    for _ in 0..4 {
        let tx = transfer(&ledger, &ring, Vec::new());
        ledger.submit(&tx).unwrap();
    }
    let err = ledger.submit(&stale).unwrap_err();
    assert!(matches!(err, umbra_core::LedgerError::UnknownRootHash(_)));
}

#[test]
fn observers_follow_ledger_commits() {
    let dir = TempDir::new().unwrap();
    let ledger = rocks_ledger(&dir);
    let rng = &mut rng();
    let sks = secrets(rng, 5);
    let ring: Vec<Point> = sks[..4].iter().map(SecretKey::public_key).collect();

    let selector = StakeSelector::new(ASSET, HeapKind::Max);
    let wallet = ForgingWallet::new();
    wallet
        .add_wallet(ledger.store(), sks[4].clone(), ring[2], ASSET)
        .unwrap();
    assert!(wallet.get(ASSET, &ring[2]).unwrap().account.is_none());

    let signers: Vec<&SecretKey> = sks[..4].iter().collect();
    let log = ledger
        .submit(&transfer(&ledger, &ring, entries(rng, &signers, &[0, 1, 2, 3])))
        .unwrap();

    let weight = |acc: &umbra_account::HomomorphicAccount| Some(acc.index as f64);
    assert!(selector.apply(&log, weight).unwrap());
    assert!(!selector.apply(&log, weight).unwrap());
    assert_eq!(selector.len(), 4);
    assert_eq!(selector.peek().unwrap().key, ring[3].encode_compressed());

    assert!(wallet.update_balance_changes(&log).unwrap());
    let funded = wallet.get(ASSET, &ring[2]).unwrap().account.unwrap();
    assert_eq!(funded.index, 2);

    // the selector's heap persists next to the ledger state
    let (heap, sequence) = selector.snapshot();
    let mut w = ledger.store().begin_write().unwrap();
    heap.save(&mut w, b"forging").unwrap();
    w.commit().unwrap();

    let restored = ledger
        .read(|scope| Ok(StakeHeap::load(scope, b"forging", HeapKind::Max)))
        .unwrap()
        .unwrap();
    let resumed = StakeSelector::from_heap(ASSET, restored, sequence);
    assert_eq!(resumed.peek(), selector.peek());
    assert!(!resumed.apply(&log, weight).unwrap());
}
