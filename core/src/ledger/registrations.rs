//! The global anonymity set.
//!
//! Membership is monotonic: a key once registered is never removed. Both
//! phases of `register_now` run in the caller's write scope, so they commit
//! or vanish together with the balance changes of the same transfer.

use umbra_codec::{BufferReader, BufferWriter};
use umbra_crypto::Point;
use umbra_transaction::RegistrationEntry;

use super::errors::{LedgerError, Result};
use super::keys;
use crate::storage::{KvRead, KvWrite};

/// Version byte of a stored membership record.
const RECORD_VERSION: u8 = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationSet;

impl RegistrationSet {
    pub fn new() -> Self {
        Self
    }

    pub fn is_registered<R: KvRead + ?Sized>(&self, scope: &R, public_key: &Point) -> Result<bool> {
        let key = keys::registration(&public_key.encode_compressed());
        match scope.get(&key)? {
            Some(record) if record.as_slice() == [RECORD_VERSION] => Ok(true),
            Some(record) => Err(LedgerError::Corrupted(format!(
                "registration record of {} is {}",
                public_key.to_hex(),
                hex::encode(record)
            ))),
            None => Ok(false),
        }
    }

    /// Inserts `public_key`, failing if it is already a member.
    pub fn register<W: KvWrite + ?Sized>(&self, scope: &mut W, public_key: &Point) -> Result<()> {
        if self.is_registered(&*scope, public_key)? {
            return Err(LedgerError::AlreadyRegistered(public_key.to_hex()));
        }
        scope.put(
            &keys::registration(&public_key.encode_compressed()),
            &[RECORD_VERSION],
        )?;

        let count = self.count(&*scope)?;
        let mut w = BufferWriter::new();
        w.write_uvarint(count + 1);
        scope.put(keys::REGISTRATION_COUNT, w.as_bytes())?;
        Ok(())
    }

    pub fn count<R: KvRead + ?Sized>(&self, scope: &R) -> Result<u64> {
        match scope.get(keys::REGISTRATION_COUNT)? {
            Some(bytes) => {
                let mut r = BufferReader::new(&bytes);
                let count = r.read_uvarint()?;
                r.finish()?;
                Ok(count)
            }
            None => Ok(0),
        }
    }

    /// Applies the entries of one transfer, then requires every ring member
    /// to be registered. Returns how many keys were newly registered.
    ///
    /// Entries must already have passed `validate_registrations` for `ring`.
    pub fn register_now<W: KvWrite + ?Sized>(
        &self,
        scope: &mut W,
        ring: &[Point],
        entries: &[RegistrationEntry],
    ) -> Result<usize> {
        for entry in entries {
            let public_key = entry.target(ring)?;
            // a second entry for the same key in this transfer lands here too
            self.register(scope, public_key)?;
        }

        for public_key in ring {
            if !self.is_registered(&*scope, public_key)? {
                return Err(LedgerError::UnregisteredPublicKey(public_key.to_hex()));
            }
        }
        Ok(entries.len())
    }
}
