//! Additively homomorphic ElGamal over G1.
//!
//! ```text
//! left  = G·value + pk·r
//! right = G·r
//! ```
//!
//! Component-wise addition of two ciphertexts under the same key encrypts the
//! sum of their values, which lets balances move without decryption.

use serde::{Deserialize, Serialize};
use umbra_codec::{BufferReader, BufferWriter, Encode};

use crate::errors::Result;
use crate::point::Point;
use crate::scalar::Scalar;

/// Base point shared by every balance ciphertext.
pub fn elgamal_base() -> Point {
    Point::generator()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElGamal {
    pub left: Point,
    pub right: Point,
}

impl ElGamal {
    pub fn new(left: Point, right: Point) -> Self {
        Self { left, right }
    }

    /// Encryption of zero with unit randomness: `(pk, G)`.
    pub fn zero_for(public_key: &Point) -> Self {
        Self::new(*public_key, elgamal_base())
    }

    pub fn encrypt(public_key: &Point, value: u64, r: &Scalar) -> Self {
        let left = Point::mul_generator(&Scalar::from_u64(value)).add(&public_key.mul(r));
        let right = Point::mul_generator(r);
        Self::new(left, right)
    }

    pub fn add(&self, other: &ElGamal) -> ElGamal {
        Self::new(self.left.add(&other.left), self.right.add(&other.right))
    }

    pub fn sub(&self, other: &ElGamal) -> ElGamal {
        Self::new(self.left.sub(&other.left), self.right.sub(&other.right))
    }

    pub fn neg(&self) -> ElGamal {
        Self::new(self.left.neg(), self.right.neg())
    }

    /// Adds a public amount without touching the randomness.
    pub fn plus(&self, value: u64) -> ElGamal {
        let v = Point::mul_generator(&Scalar::from_u64(value));
        Self::new(self.left.add(&v), self.right)
    }

    pub fn minus(&self, value: u64) -> ElGamal {
        let v = Point::mul_generator(&Scalar::from_u64(value));
        Self::new(self.left.sub(&v), self.right)
    }

    /// Returns `G·value`; recovering `value` itself is a discrete log left to
    /// the wallet.
    pub fn decrypt_point(&self, secret: &Scalar) -> Point {
        self.left.sub(&self.right.mul(secret))
    }

    pub fn read(r: &mut BufferReader<'_>) -> Result<ElGamal> {
        let left = Point::read(r)?;
        let right = Point::read(r)?;
        Ok(Self::new(left, right))
    }
}

impl Encode for ElGamal {
    fn encode(&self, w: &mut BufferWriter) {
        self.left.write(w);
        self.right.write(w);
    }
}
