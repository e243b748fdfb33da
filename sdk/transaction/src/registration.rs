//! Key registration entries.
//!
//! A registration proves knowledge of the secret key behind one ring member
//! by a Schnorr signature over `REGISTRATION_MESSAGE`. The ledger records
//! the key in its anonymity set; the stateful half of the protocol lives in
//! the core crate.

use serde::{Deserialize, Serialize};
use umbra_codec::{BufferReader, BufferWriter, Encode};
use umbra_crypto::rand::Rng;
use umbra_crypto::{
    Point, REGISTRATION_MESSAGE, SIGNATURE_SIZE, SecretKey, Signature, verify_signature,
};

use crate::errors::RegistrationError;

pub type Result<T> = std::result::Result<T, RegistrationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationEntry {
    pub public_key_index: u64,
    pub registration_signature: Signature,
}

impl RegistrationEntry {
    /// Registers the key at `public_key_index` of a ring with its secret key.
    pub fn sign<R: Rng + ?Sized>(public_key_index: u64, secret: &SecretKey, rng: &mut R) -> Self {
        Self {
            public_key_index,
            registration_signature: secret.sign_registration(rng),
        }
    }

    pub fn read(r: &mut BufferReader<'_>) -> Result<Self> {
        let public_key_index = r.read_uvarint()?;
        let bytes = r.read_array::<SIGNATURE_SIZE>()?;
        let registration_signature =
            Signature::from_bytes(&bytes).map_err(RegistrationError::SignatureEncoding)?;
        Ok(Self {
            public_key_index,
            registration_signature,
        })
    }

    /// Resolves the entry against a ring.
    pub fn target<'a>(&self, ring: &'a [Point]) -> Result<&'a Point> {
        usize::try_from(self.public_key_index)
            .ok()
            .and_then(|i| ring.get(i))
            .ok_or(RegistrationError::IndexOutOfRange {
                index: self.public_key_index,
                ring_size: ring.len(),
            })
    }
}

impl Encode for RegistrationEntry {
    fn encode(&self, w: &mut BufferWriter) {
        w.write_uvarint(self.public_key_index);
        w.write(&self.registration_signature.to_bytes());
    }
}

/// The registrations carried by one transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registrations(pub Vec<RegistrationEntry>);

impl Registrations {
    pub fn new(entries: Vec<RegistrationEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[RegistrationEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads a uvarint count and that many entries. The count is bounded by
    /// `ring_max` before anything is allocated.
    pub fn read(r: &mut BufferReader<'_>, ring_max: usize) -> Result<Self> {
        let count = r.read_len(ring_max as u64)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(RegistrationEntry::read(r)?);
        }
        Ok(Self(entries))
    }

    pub fn decode(bytes: &[u8], ring_max: usize) -> Result<Self> {
        let mut r = BufferReader::new(bytes);
        let registrations = Self::read(&mut r, ring_max)?;
        r.finish().map_err(RegistrationError::Malformed)?;
        Ok(registrations)
    }

    /// Stateless checks: ring bounds, entry indices, then signatures.
    pub fn validate(&self, ring: &[Point], ring_max: usize) -> Result<()> {
        validate_registrations(ring, &self.0, ring_max)
    }
}

impl Encode for Registrations {
    fn encode(&self, w: &mut BufferWriter) {
        w.write_uvarint(self.0.len() as u64);
        for entry in &self.0 {
            entry.encode(w);
        }
    }
}

pub fn validate_registrations(
    ring: &[Point],
    entries: &[RegistrationEntry],
    ring_max: usize,
) -> Result<()> {
    if ring.is_empty() || ring.len() > ring_max {
        return Err(RegistrationError::InvalidRingSize {
            len: ring.len(),
            ring_max,
        });
    }

    for entry in entries {
        entry.target(ring)?;
    }

    for entry in entries {
        let public_key = entry.target(ring)?;
        if !verify_signature(
            REGISTRATION_MESSAGE,
            &entry.registration_signature,
            public_key,
        ) {
            return Err(RegistrationError::InvalidSignature(entry.public_key_index));
        }
    }
    Ok(())
}

impl RegistrationError {
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            RegistrationError::Malformed(_) | RegistrationError::SignatureEncoding(_)
        )
    }
}
