//! Schnorr signatures over BN254 G1.
//!
//! Signing: `k` random, `R = G·k`, `c = H(message || pk || R)`, `s = k - c·sk`.
//! Verification recomputes `R' = G·s + pk·c` and accepts iff
//! `H(message || pk || R') == c`.

use std::fmt;

use ark_std::rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::{CryptoError, Result};
use crate::point::Point;
use crate::scalar::{SCALAR_SIZE, Scalar};

/// Size of an encoded signature: challenge || response
pub const SIGNATURE_SIZE: usize = 2 * SCALAR_SIZE;

/// Message every registration proof signs. Changing it invalidates every
/// registration ever made.
pub const REGISTRATION_MESSAGE: &[u8] = b"registration";

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Fiat-Shamir challenge
    pub c: Scalar,
    /// Response
    pub s: Scalar,
}

impl Signature {
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        let mut out = [0u8; SIGNATURE_SIZE];
        out[..SCALAR_SIZE].copy_from_slice(&self.c.to_bytes());
        out[SCALAR_SIZE..].copy_from_slice(&self.s.to_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; SIGNATURE_SIZE]) -> Result<Signature> {
        let mut c = [0u8; SCALAR_SIZE];
        let mut s = [0u8; SCALAR_SIZE];
        c.copy_from_slice(&bytes[..SCALAR_SIZE]);
        s.copy_from_slice(&bytes[SCALAR_SIZE..]);
        Ok(Self {
            c: Scalar::from_bytes(&c)?,
            s: Scalar::from_bytes(&s)?,
        })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.to_bytes()))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; SIGNATURE_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid signature length"))?;
        Signature::from_bytes(&arr).map_err(serde::de::Error::custom)
    }
}

/// Secret scalar of a ledger key. Never printed.
#[derive(Clone)]
pub struct SecretKey(Scalar);

impl SecretKey {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        loop {
            let s = Scalar::random(rng);
            if !s.is_zero() {
                return Self(s);
            }
        }
    }

    pub fn from_bytes(bytes: &[u8; SCALAR_SIZE]) -> Result<Self> {
        let s = Scalar::from_bytes(bytes)?;
        if s.is_zero() {
            return Err(CryptoError::NonCanonicalScalar);
        }
        Ok(Self(s))
    }

    pub fn to_bytes(&self) -> [u8; SCALAR_SIZE] {
        self.0.to_bytes()
    }

    pub fn scalar(&self) -> &Scalar {
        &self.0
    }

    pub fn public_key(&self) -> Point {
        Point::mul_generator(&self.0)
    }

    pub fn sign<R: Rng + ?Sized>(&self, message: &[u8], rng: &mut R) -> Signature {
        let pk = self.public_key();
        loop {
            let k = Scalar::random(rng);
            if k.is_zero() {
                continue;
            }
            let r = Point::mul_generator(&k);
            let c = challenge(message, &pk, &r);
            let s = k.sub(&c.mul(&self.0));
            return Signature { c, s };
        }
    }

    /// Proof of key ownership required before the key may join a ring.
    pub fn sign_registration<R: Rng + ?Sized>(&self, rng: &mut R) -> Signature {
        self.sign(REGISTRATION_MESSAGE, rng)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Verifies `signature` over `message` for `public_key`.
///
/// The identity is never a valid key: with `pk = 0` anyone could produce a
/// matching challenge.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &Point) -> bool {
    if public_key.is_identity() {
        return false;
    }

    let r = Point::mul_generator(&signature.s).add(&public_key.mul(&signature.c));
    let expected = challenge(message, public_key, &r);
    expected.to_bytes()[..]
        .ct_eq(&signature.c.to_bytes()[..])
        .into()
}

fn challenge(message: &[u8], public_key: &Point, r: &Point) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(message);
    hasher.update(public_key.encode_compressed());
    hasher.update(r.encode_compressed());
    Scalar::from_be_bytes_mod_order(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::test_rng;

    #[test]
    fn sign_and_verify() {
        let mut rng = test_rng();
        let sk = SecretKey::generate(&mut rng);
        let sig = sk.sign(b"hello", &mut rng);
        assert!(verify_signature(b"hello", &sig, &sk.public_key()));
    }

    #[test]
    fn registration_signature_is_bound_to_domain() {
        let mut rng = test_rng();
        let sk = SecretKey::generate(&mut rng);
        let pk = sk.public_key();

        let sig = sk.sign_registration(&mut rng);
        assert!(verify_signature(REGISTRATION_MESSAGE, &sig, &pk));
        assert!(!verify_signature(b"registration ", &sig, &pk));
        assert!(!verify_signature(b"Registration", &sig, &pk));

        let other = sk.sign(b"not registration", &mut rng);
        assert!(!verify_signature(REGISTRATION_MESSAGE, &other, &pk));
    }

    #[test]
    fn wrong_key_fails() {
        let mut rng = test_rng();
        let sk = SecretKey::generate(&mut rng);
        let other = SecretKey::generate(&mut rng);
        let sig = sk.sign_registration(&mut rng);
        assert!(!verify_signature(REGISTRATION_MESSAGE, &sig, &other.public_key()));
    }

    #[test]
    fn identity_key_never_verifies() {
        let mut rng = test_rng();
        // Forge for pk = 0: pick s, derive c from R = G·s.
        let s = Scalar::random(&mut rng);
        let r = Point::mul_generator(&s);
        let c = challenge(REGISTRATION_MESSAGE, &Point::identity(), &r);
        let forged = Signature { c, s };
        assert!(!verify_signature(REGISTRATION_MESSAGE, &forged, &Point::identity()));
    }

    #[test]
    fn signature_bytes_roundtrip() {
        let mut rng = test_rng();
        let sk = SecretKey::generate(&mut rng);
        let sig = sk.sign_registration(&mut rng);
        assert_eq!(Signature::from_bytes(&sig.to_bytes()).unwrap(), sig);
    }

    #[test]
    fn tampered_signature_fails() {
        let mut rng = test_rng();
        let sk = SecretKey::generate(&mut rng);
        let sig = sk.sign_registration(&mut rng);
        let tampered = Signature {
            c: sig.c,
            s: sig.s.add(&Scalar::from_u64(1)),
        };
        assert!(!verify_signature(REGISTRATION_MESSAGE, &tampered, &sk.public_key()));
    }

    #[test]
    fn secret_key_debug_is_redacted() {
        let mut rng = test_rng();
        let sk = SecretKey::generate(&mut rng);
        assert_eq!(format!("{sk:?}"), "SecretKey(..)");
    }
}
