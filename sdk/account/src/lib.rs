//! Encrypted-balance accounts.
//!
//! An account is identified by `(public_key, asset)`; neither is part of its
//! wire form, they are the storage key.
//!
//! ```text
//! [version: uvarint][index: uvarint][left: 33][right: 33]
//! ```

use serde::Serialize;
use thiserror::Error;
use umbra_codec::{BufferReader, BufferWriter, CodecError, Encode};
use umbra_crypto::{CryptoError, ElGamal, POINT_SIZE, Point};

/// Only schema version currently defined.
pub const ACCOUNT_VERSION: u64 = 0;

/// Assets are length-prefixed by one byte in storage keys.
pub const MAX_ASSET_LEN: usize = 255;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("Invalid account version: {0}")]
    InvalidVersion(u64),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(#[source] CryptoError),

    #[error("Invalid balance point: {0}")]
    InvalidPoint(#[source] CryptoError),

    #[error("Invalid asset length: {0}")]
    InvalidAsset(usize),

    #[error("Malformed account: {0}")]
    Codec(#[from] CodecError),
}

impl AccountError {
    fn from_balance(err: CryptoError) -> Self {
        match err {
            CryptoError::Codec(e) => AccountError::Codec(e),
            other => AccountError::InvalidPoint(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AccountError>;

/// Encrypted balance of one account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BalanceHomomorphic {
    pub amount: ElGamal,
}

impl BalanceHomomorphic {
    pub fn read(r: &mut BufferReader<'_>) -> Result<Self> {
        let amount = ElGamal::read(r).map_err(AccountError::from_balance)?;
        Ok(Self { amount })
    }
}

impl Encode for BalanceHomomorphic {
    fn encode(&self, w: &mut BufferWriter) {
        self.amount.encode(w);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HomomorphicAccount {
    #[serde(skip)]
    pub public_key: Point,
    #[serde(skip)]
    pub asset: Vec<u8>,
    /// Position in the append-only per-asset account list
    pub index: u64,
    pub version: u64,
    pub balance: BalanceHomomorphic,
}

impl HomomorphicAccount {
    /// Fresh account holding an encryption of zero.
    ///
    /// Attacker-supplied keys come through here, so a key that does not decode
    /// is an error, never a panic.
    pub fn new(public_key: &[u8], asset: &[u8]) -> Result<Self> {
        check_asset(asset)?;
        let acckey = Point::decode_compressed(public_key).map_err(AccountError::InvalidPublicKey)?;
        if acckey.is_identity() {
            return Err(AccountError::InvalidPublicKey(CryptoError::NotOnCurve));
        }

        Ok(Self {
            public_key: acckey,
            asset: asset.to_vec(),
            index: 0,
            version: ACCOUNT_VERSION,
            balance: BalanceHomomorphic {
                amount: ElGamal::zero_for(&acckey),
            },
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != ACCOUNT_VERSION {
            return Err(AccountError::InvalidVersion(self.version));
        }
        check_asset(&self.asset)
    }

    pub fn public_key_bytes(&self) -> [u8; POINT_SIZE] {
        self.public_key.encode_compressed()
    }

    /// Amount-bearing ciphertext, for homomorphic combination.
    pub fn balance_ciphertext(&self) -> &ElGamal {
        &self.balance.amount
    }

    pub fn add_balance(&mut self, delta: &ElGamal) {
        self.balance.amount = self.balance.amount.add(delta);
    }

    pub fn sub_balance(&mut self, delta: &ElGamal) {
        self.balance.amount = self.balance.amount.sub(delta);
    }

    /// The version is checked before any further byte is consumed.
    pub fn read(public_key: Point, asset: &[u8], r: &mut BufferReader<'_>) -> Result<Self> {
        check_asset(asset)?;

        let version = r.read_uvarint()?;
        if version != ACCOUNT_VERSION {
            return Err(AccountError::InvalidVersion(version));
        }
        let index = r.read_uvarint()?;
        let balance = BalanceHomomorphic::read(r)?;

        Ok(Self {
            public_key,
            asset: asset.to_vec(),
            index,
            version,
            balance,
        })
    }

    /// Decodes a stored record; the buffer must hold exactly one account.
    pub fn decode(public_key: Point, asset: &[u8], bytes: &[u8]) -> Result<Self> {
        let mut r = BufferReader::new(bytes);
        let account = Self::read(public_key, asset, &mut r)?;
        r.finish()?;
        Ok(account)
    }
}

impl Encode for HomomorphicAccount {
    fn encode(&self, w: &mut BufferWriter) {
        w.write_uvarint(self.version);
        w.write_uvarint(self.index);
        self.balance.encode(w);
    }
}

fn check_asset(asset: &[u8]) -> Result<()> {
    if asset.len() > MAX_ASSET_LEN {
        return Err(AccountError::InvalidAsset(asset.len()));
    }
    Ok(())
}
