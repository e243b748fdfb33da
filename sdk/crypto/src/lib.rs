//! # Umbra Crypto
//!
//! Group primitives for confidential balances on BN254 G1:
//! - `Point` with the 33-byte compressed wire encoding
//! - `Scalar` field elements with canonical 32-byte encoding
//! - `ElGamal` additively homomorphic ciphertexts
//! - Schnorr keys and signatures (used for key registration)
//!
//! ## Example
//!
//! ```rust
//! use umbra_crypto::{SecretKey, verify_signature, REGISTRATION_MESSAGE};
//! use ark_std::test_rng;
//!
//! let mut rng = test_rng();
//! let sk = SecretKey::generate(&mut rng);
//! let sig = sk.sign_registration(&mut rng);
//! assert!(verify_signature(REGISTRATION_MESSAGE, &sig, &sk.public_key()));
//! ```

pub mod elgamal;
pub mod errors;
pub mod point;
pub mod scalar;
pub mod schnorr;

pub use elgamal::{ElGamal, elgamal_base};
pub use errors::{CryptoError, Result};
pub use point::{POINT_SIZE, Point};
pub use scalar::{SCALAR_SIZE, Scalar};
pub use schnorr::{REGISTRATION_MESSAGE, SIGNATURE_SIZE, SecretKey, Signature, verify_signature};

/// Re-export ark_std::rand for RNG types
pub use ark_std::rand;
