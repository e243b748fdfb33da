use std::fmt;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField, UniformRand, Zero};
use ark_std::rand::Rng;

use crate::errors::{CryptoError, Result};

/// Size of an encoded scalar in bytes
pub const SCALAR_SIZE: usize = 32;

/// Element of the BN254 scalar field.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Scalar(Fr);

impl Scalar {
    pub fn zero() -> Self {
        Self(Fr::zero())
    }

    pub fn from_u64(v: u64) -> Self {
        Self(Fr::from(v))
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(Fr::rand(rng))
    }

    /// Reduces arbitrary bytes (e.g. a hash digest) into the field.
    pub fn from_be_bytes_mod_order(bytes: &[u8]) -> Self {
        Self(Fr::from_be_bytes_mod_order(bytes))
    }

    pub fn inner(&self) -> Fr {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(&self, other: &Scalar) -> Scalar {
        Self(self.0 + other.0)
    }

    pub fn sub(&self, other: &Scalar) -> Scalar {
        Self(self.0 - other.0)
    }

    pub fn mul(&self, other: &Scalar) -> Scalar {
        Self(self.0 * other.0)
    }

    pub fn neg(&self) -> Scalar {
        Self(-self.0)
    }

    pub fn to_bytes(&self) -> [u8; SCALAR_SIZE] {
        let mut out = [0u8; SCALAR_SIZE];
        out.copy_from_slice(&self.0.into_bigint().to_bytes_be());
        out
    }

    /// Rejects encodings of values at or above the field modulus.
    pub fn from_bytes(bytes: &[u8; SCALAR_SIZE]) -> Result<Scalar> {
        let s = Self::from_be_bytes_mod_order(bytes);
        if &s.to_bytes() != bytes {
            return Err(CryptoError::NonCanonicalScalar);
        }
        Ok(s)
    }
}

impl From<Fr> for Scalar {
    fn from(f: Fr) -> Self {
        Self(f)
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({})", hex::encode(self.to_bytes()))
    }
}
