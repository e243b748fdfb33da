//! Account store over a transactional scope.
//!
//! Every asset keeps an append-only list of the accounts ever created for it,
//! so a ring can refer to a member by its short index. Deleting an account
//! removes its record but never its slot in that list; a key that comes back
//! after a delete gets its old slot again.

use umbra_account::{AccountError, HomomorphicAccount, MAX_ASSET_LEN};
use umbra_codec::{BufferReader, BufferWriter, Encode};
use umbra_crypto::{POINT_SIZE, Point};

use super::errors::{LedgerError, Result};
use super::keys;
use crate::storage::{Commit, CommitLog, KvRead, KvWrite};

/// Accounts of one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountStore {
    asset: Vec<u8>,
}

impl AccountStore {
    pub fn new(asset: &[u8]) -> Result<Self> {
        if asset.len() > MAX_ASSET_LEN {
            return Err(LedgerError::InvalidAsset(asset.len()));
        }
        Ok(Self {
            asset: asset.to_vec(),
        })
    }

    pub fn asset(&self) -> &[u8] {
        &self.asset
    }

    pub fn get<R: KvRead + ?Sized>(
        &self,
        scope: &R,
        public_key: &Point,
    ) -> Result<Option<HomomorphicAccount>> {
        let key = keys::account(&self.asset, &public_key.encode_compressed())?;
        match scope.get(&key)? {
            Some(bytes) => {
                let account = HomomorphicAccount::decode(*public_key, &self.asset, &bytes)?;
                account.validate()?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    /// Loads an account, creating it with a zero balance when no record
    /// exists. A key seen for the first time takes the next list index; a
    /// key whose record was deleted keeps its old one. The flag is true
    /// when a record was created.
    pub fn get_or_create<W: KvWrite + ?Sized>(
        &self,
        scope: &mut W,
        public_key: &Point,
    ) -> Result<(HomomorphicAccount, bool)> {
        if let Some(account) = self.get(&*scope, public_key)? {
            return Ok((account, false));
        }

        let pk = public_key.encode_compressed();
        let mut account = HomomorphicAccount::new(&pk, &self.asset)?;
        account.index = match self.slot_of(&*scope, public_key)? {
            Some(index) => {
                log::debug!("recreated account #{} for {}", index, public_key.to_hex());
                index
            }
            None => {
                let index = self.append_slot(scope, &pk)?;
                log::debug!("created account #{} for {}", index, public_key.to_hex());
                index
            }
        };
        self.put(scope, &account)?;
        Ok((account, true))
    }

    /// List index given to `public_key`, if it ever held the asset.
    pub fn slot_of<R: KvRead + ?Sized>(
        &self,
        scope: &R,
        public_key: &Point,
    ) -> Result<Option<u64>> {
        let key = keys::slot(&self.asset, &public_key.encode_compressed())?;
        match scope.get(&key)? {
            Some(bytes) => read_uvarint(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn append_slot<W: KvWrite + ?Sized>(
        &self,
        scope: &mut W,
        pk: &[u8; POINT_SIZE],
    ) -> Result<u64> {
        let index = self.count(&*scope)?;
        scope.put(&keys::index(&self.asset, index)?, pk)?;

        let mut w = BufferWriter::new();
        w.write_uvarint(index);
        scope.put(&keys::slot(&self.asset, pk)?, w.as_bytes())?;

        let mut w = BufferWriter::new();
        w.write_uvarint(index + 1);
        scope.put(&keys::count(&self.asset)?, w.as_bytes())?;
        Ok(index)
    }

    pub fn put<W: KvWrite + ?Sized>(
        &self,
        scope: &mut W,
        account: &HomomorphicAccount,
    ) -> Result<()> {
        if account.asset != self.asset {
            return Err(LedgerError::Corrupted(format!(
                "account of asset {} written through store of {}",
                hex::encode(&account.asset),
                hex::encode(&self.asset)
            )));
        }
        account.validate()?;
        let key = keys::account(&self.asset, &account.public_key_bytes())?;
        scope.put(&key, &account.encode_to_bytes())?;
        Ok(())
    }

    /// Removes the record; the index list keeps its entry. Returns whether an
    /// account was present.
    pub fn delete<W: KvWrite + ?Sized>(&self, scope: &mut W, public_key: &Point) -> Result<bool> {
        let key = keys::account(&self.asset, &public_key.encode_compressed())?;
        if !scope.contains(&key)? {
            return Ok(false);
        }
        scope.delete(&key)?;
        Ok(true)
    }

    /// Number of accounts ever created for the asset.
    pub fn count<R: KvRead + ?Sized>(&self, scope: &R) -> Result<u64> {
        match scope.get(&keys::count(&self.asset)?)? {
            Some(bytes) => read_uvarint(&bytes),
            None => Ok(0),
        }
    }

    /// Public key holding list slot `index`, even if its record was deleted.
    pub fn public_key_at<R: KvRead + ?Sized>(
        &self,
        scope: &R,
        index: u64,
    ) -> Result<Option<Point>> {
        match scope.get(&keys::index(&self.asset, index)?)? {
            Some(bytes) => Point::decode_compressed(&bytes)
                .map(Some)
                .map_err(|e| LedgerError::Corrupted(format!("index entry {index}: {e}"))),
            None => Ok(None),
        }
    }

    pub fn get_by_index<R: KvRead + ?Sized>(
        &self,
        scope: &R,
        index: u64,
    ) -> Result<Option<HomomorphicAccount>> {
        match self.public_key_at(scope, index)? {
            Some(public_key) => self.get(scope, &public_key),
            None => Ok(None),
        }
    }

    /// Every live account of the asset, in storage key order.
    pub fn list<R: KvRead + ?Sized>(&self, scope: &R) -> Result<Vec<HomomorphicAccount>> {
        let prefix = keys::account_prefix(&self.asset)?;
        let mut out = Vec::new();
        for (key, bytes) in scope.scan_prefix(&prefix)? {
            let (_, pk) = keys::parse_account(&key).ok_or_else(|| {
                LedgerError::Corrupted(format!("account key {}", hex::encode(&key)))
            })?;
            let public_key = decode_key(&pk)?;
            out.push(HomomorphicAccount::decode(public_key, &self.asset, &bytes)?);
        }
        Ok(out)
    }
}

fn read_uvarint(bytes: &[u8]) -> Result<u64> {
    let mut r = BufferReader::new(bytes);
    let value = r.read_uvarint()?;
    r.finish()?;
    Ok(value)
}

fn decode_key(pk: &[u8; POINT_SIZE]) -> Result<Point> {
    Point::decode_compressed(pk)
        .map_err(|e| LedgerError::Account(AccountError::InvalidPublicKey(e)))
}

/// An account touched by a commit. `account` is `None` for a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountChange {
    pub asset: Vec<u8>,
    pub public_key: Point,
    pub account: Option<HomomorphicAccount>,
}

/// Decodes the account entries of a commit log, in key order.
pub fn account_changes(log: &CommitLog) -> Result<Vec<AccountChange>> {
    let mut changes = Vec::new();
    for (key, commit) in log.with_prefix(keys::ACCOUNT_PREFIX) {
        let (asset, pk) = keys::parse_account(key)
            .ok_or_else(|| LedgerError::Corrupted(format!("account key {}", hex::encode(key))))?;
        let public_key = decode_key(&pk)?;
        let account = match commit {
            Commit::Update(bytes) => Some(HomomorphicAccount::decode(public_key, asset, bytes)?),
            Commit::Delete => None,
        };
        changes.push(AccountChange {
            asset: asset.to_vec(),
            public_key,
            account,
        });
    }
    Ok(changes)
}
