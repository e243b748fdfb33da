//! Storage key layout.
//!
//! ```text
//! acc/ | len(asset) | asset | pk          -> HomomorphicAccount
//! idx/ | len(asset) | asset | index (BE)  -> pk
//! cnt/ | len(asset) | asset               -> uvarint account count
//! slot/ | len(asset) | asset | pk         -> uvarint list index
//! reg/ | pk                               -> registration record
//! meta/registrations                      -> uvarint registration count
//! meta/roots                              -> recent state roots
//! ```

use umbra_account::MAX_ASSET_LEN;
use umbra_crypto::POINT_SIZE;

use super::errors::{LedgerError, Result};

pub const ACCOUNT_PREFIX: &[u8] = b"acc/";
pub const INDEX_PREFIX: &[u8] = b"idx/";
pub const COUNT_PREFIX: &[u8] = b"cnt/";
pub const SLOT_PREFIX: &[u8] = b"slot/";
pub const REGISTRATION_PREFIX: &[u8] = b"reg/";
pub const REGISTRATION_COUNT: &[u8] = b"meta/registrations";
pub const ROOT_HISTORY: &[u8] = b"meta/roots";

fn with_asset(prefix: &[u8], asset: &[u8], extra: usize) -> Result<Vec<u8>> {
    if asset.len() > MAX_ASSET_LEN {
        return Err(LedgerError::InvalidAsset(asset.len()));
    }
    let mut key = Vec::with_capacity(prefix.len() + 1 + asset.len() + extra);
    key.extend_from_slice(prefix);
    key.push(asset.len() as u8);
    key.extend_from_slice(asset);
    Ok(key)
}

pub fn account_prefix(asset: &[u8]) -> Result<Vec<u8>> {
    with_asset(ACCOUNT_PREFIX, asset, POINT_SIZE)
}

pub fn account(asset: &[u8], public_key: &[u8; POINT_SIZE]) -> Result<Vec<u8>> {
    let mut key = account_prefix(asset)?;
    key.extend_from_slice(public_key);
    Ok(key)
}

pub fn index(asset: &[u8], index: u64) -> Result<Vec<u8>> {
    let mut key = with_asset(INDEX_PREFIX, asset, 8)?;
    key.extend_from_slice(&index.to_be_bytes());
    Ok(key)
}

pub fn count(asset: &[u8]) -> Result<Vec<u8>> {
    with_asset(COUNT_PREFIX, asset, 0)
}

/// Reverse of [`index`]: the list slot a public key was given.
pub fn slot(asset: &[u8], public_key: &[u8; POINT_SIZE]) -> Result<Vec<u8>> {
    let mut key = with_asset(SLOT_PREFIX, asset, POINT_SIZE)?;
    key.extend_from_slice(public_key);
    Ok(key)
}

pub fn registration(public_key: &[u8; POINT_SIZE]) -> Vec<u8> {
    let mut key = Vec::with_capacity(REGISTRATION_PREFIX.len() + POINT_SIZE);
    key.extend_from_slice(REGISTRATION_PREFIX);
    key.extend_from_slice(public_key);
    key
}

/// Splits an account key into `(asset, public key)`.
pub fn parse_account(key: &[u8]) -> Option<(&[u8], [u8; POINT_SIZE])> {
    let rest = key.strip_prefix(ACCOUNT_PREFIX)?;
    let (&len, rest) = rest.split_first()?;
    let len = len as usize;
    if rest.len() != len + POINT_SIZE {
        return None;
    }
    let (asset, pk) = rest.split_at(len);
    let pk: [u8; POINT_SIZE] = pk.try_into().ok()?;
    Some((asset, pk))
}
