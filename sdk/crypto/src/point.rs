//! BN254 G1 points and their compressed encoding.
//!
//! ```text
//! [prefix: 1][x: 32 big-endian]
//!   prefix 0x02  y is even
//!   prefix 0x03  y is odd
//!   all zero     identity
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use ark_bn254::{Fq, G1Affine, g1::Config as G1Config};
use ark_ec::{AffineRepr, CurveGroup, short_weierstrass::SWCurveConfig};
use ark_ff::{BigInteger, Field, PrimeField};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use umbra_codec::{BufferReader, BufferWriter};

use crate::errors::{CryptoError, Result};
use crate::scalar::Scalar;

/// Size of a compressed point in bytes
pub const POINT_SIZE: usize = 33;

const PREFIX_IDENTITY: u8 = 0x00;
const PREFIX_EVEN: u8 = 0x02;
const PREFIX_ODD: u8 = 0x03;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Point(G1Affine);

impl Point {
    pub fn generator() -> Self {
        Self(G1Affine::generator())
    }

    pub fn identity() -> Self {
        Self(G1Affine::identity())
    }

    pub fn from_affine(p: G1Affine) -> Self {
        Self(p)
    }

    pub fn as_affine(&self) -> &G1Affine {
        &self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0.infinity
    }

    pub fn add(&self, other: &Point) -> Point {
        Self((self.0.into_group() + other.0.into_group()).into_affine())
    }

    pub fn sub(&self, other: &Point) -> Point {
        Self((self.0.into_group() - other.0.into_group()).into_affine())
    }

    pub fn neg(&self) -> Point {
        Self(-self.0)
    }

    pub fn mul(&self, scalar: &Scalar) -> Point {
        Self((self.0 * scalar.inner()).into_affine())
    }

    /// `G·s`
    pub fn mul_generator(scalar: &Scalar) -> Point {
        Self::generator().mul(scalar)
    }

    pub fn encode_compressed(&self) -> [u8; POINT_SIZE] {
        let mut out = [0u8; POINT_SIZE];
        if self.0.infinity {
            return out;
        }

        out[0] = if self.0.y.into_bigint().is_odd() {
            PREFIX_ODD
        } else {
            PREFIX_EVEN
        };
        out[1..].copy_from_slice(&self.0.x.into_bigint().to_bytes_be());
        out
    }

    pub fn decode_compressed(bytes: &[u8]) -> Result<Point> {
        if bytes.len() != POINT_SIZE {
            return Err(CryptoError::PointLength(bytes.len()));
        }

        let (prefix, x_bytes) = (bytes[0], &bytes[1..]);
        match prefix {
            PREFIX_IDENTITY => {
                if x_bytes.iter().all(|b| *b == 0) {
                    Ok(Self::identity())
                } else {
                    Err(CryptoError::NonCanonicalPoint)
                }
            }
            PREFIX_EVEN | PREFIX_ODD => {
                let x = Fq::from_be_bytes_mod_order(x_bytes);
                if x.into_bigint().to_bytes_be().as_slice() != x_bytes {
                    return Err(CryptoError::NonCanonicalPoint);
                }

                // y^2 = x^3 + b (a = 0 on BN254)
                let rhs = x.square() * x + G1Config::COEFF_B;
                let y = rhs.sqrt().ok_or(CryptoError::NotOnCurve)?;
                let want_odd = prefix == PREFIX_ODD;
                let y = if y.into_bigint().is_odd() == want_odd {
                    y
                } else {
                    -y
                };

                let p = G1Affine::new_unchecked(x, y);
                if !p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve() {
                    return Err(CryptoError::NotOnCurve);
                }
                Ok(Self(p))
            }
            other => Err(CryptoError::UnknownPrefix(other)),
        }
    }

    pub fn write(&self, w: &mut BufferWriter) {
        w.write(&self.encode_compressed());
    }

    /// Reads 33 bytes and decodes them. Truncation surfaces as
    /// `CryptoError::Codec`.
    pub fn read(r: &mut BufferReader<'_>) -> Result<Point> {
        let bytes = r.read_array::<POINT_SIZE>()?;
        Self::decode_compressed(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.encode_compressed())
    }

    pub fn from_hex(s: &str) -> Result<Point> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::decode_compressed(&bytes)
    }
}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.encode_compressed().hash(state);
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({})", self.to_hex())
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Point::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::test_rng;

    #[test]
    fn generator_encoding() {
        // G1 generator is (1, 2): even y, x = 1
        let enc = Point::generator().encode_compressed();
        assert_eq!(enc[0], PREFIX_EVEN);
        assert!(enc[1..32].iter().all(|b| *b == 0));
        assert_eq!(enc[32], 1);
    }

    #[test]
    fn negation_flips_prefix_only() {
        let mut rng = test_rng();
        let p = Point::mul_generator(&Scalar::random(&mut rng));
        let a = p.encode_compressed();
        let b = p.neg().encode_compressed();
        assert_ne!(a[0], b[0]);
        assert_eq!(a[1..], b[1..]);
    }

    #[test]
    fn compressed_roundtrip_random_points() {
        let mut rng = test_rng();
        for _ in 0..16 {
            let p = Point::mul_generator(&Scalar::random(&mut rng));
            let decoded = Point::decode_compressed(&p.encode_compressed()).unwrap();
            assert_eq!(p, decoded);
        }
    }

    #[test]
    fn identity_roundtrip() {
        let enc = Point::identity().encode_compressed();
        assert_eq!(enc, [0u8; POINT_SIZE]);
        assert!(Point::decode_compressed(&enc).unwrap().is_identity());
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            Point::decode_compressed(&[2u8; 32]),
            Err(CryptoError::PointLength(32))
        );
    }

    #[test]
    fn rejects_unknown_prefix() {
        let mut enc = Point::generator().encode_compressed();
        enc[0] = 0x04;
        assert_eq!(
            Point::decode_compressed(&enc),
            Err(CryptoError::UnknownPrefix(0x04))
        );
    }

    #[test]
    fn rejects_dirty_identity() {
        let mut enc = [0u8; POINT_SIZE];
        enc[5] = 1;
        assert_eq!(
            Point::decode_compressed(&enc),
            Err(CryptoError::NonCanonicalPoint)
        );
    }

    #[test]
    fn rejects_x_above_modulus() {
        let mut enc = [0xffu8; POINT_SIZE];
        enc[0] = PREFIX_EVEN;
        assert_eq!(
            Point::decode_compressed(&enc),
            Err(CryptoError::NonCanonicalPoint)
        );
    }

    #[test]
    fn rejects_x_off_curve() {
        // Scan small x values until one has no square root for x^3 + 3.
        let off_curve = (1u8..=255)
            .map(|x| {
                let mut enc = [0u8; POINT_SIZE];
                enc[0] = PREFIX_EVEN;
                enc[32] = x;
                enc
            })
            .find(|enc| Point::decode_compressed(enc).is_err())
            .expect("some small x is off the curve");
        assert_eq!(
            Point::decode_compressed(&off_curve),
            Err(CryptoError::NotOnCurve)
        );
    }

    #[test]
    fn serde_uses_hex() {
        let p = Point::generator();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, format!("\"{}\"", p.to_hex()));
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
