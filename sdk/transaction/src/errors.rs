use std::fmt;

use thiserror::Error;
use umbra_codec::CodecError;
use umbra_crypto::CryptoError;

use crate::bloom::BloomField;

/// Location of a point inside a statement, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    D,
    CLn(usize),
    CRn(usize),
    PublicKey(usize),
    C(usize),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::D => f.write_str("D"),
            Slot::CLn(i) => write!(f, "CLn[{i}]"),
            Slot::CRn(i) => write!(f, "CRn[{i}]"),
            Slot::PublicKey(i) => write!(f, "publicKeyList[{i}]"),
            Slot::C(i) => write!(f, "C[{i}]"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatementError {
    #[error("Malformed statement: {0}")]
    Malformed(#[from] CodecError),

    #[error("Invalid point at {slot}: {source}")]
    InvalidPoint {
        slot: Slot,
        #[source]
        source: CryptoError,
    },

    #[error("Cannot resolve bloomed {field:?} at ring position {position}")]
    UnresolvableBloom { position: usize, field: BloomField },

    #[error("Invalid ring size {ring_size}: must be a power of two in [2, {ring_max}]")]
    InvalidRingSize { ring_size: usize, ring_max: usize },

    #[error("Ring exponent {0} out of range")]
    InvalidRingExponent(u8),

    #[error("{field} has {got} entries, ring size is {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Invalid public key list length {len}: must be in [1, {ring_max}]")]
    InvalidRingSize { len: usize, ring_max: usize },

    #[error("Registration index {index} exceeds ring of {ring_size}")]
    IndexOutOfRange { index: u64, ring_size: usize },

    #[error("Registration is invalid for index {0}")]
    InvalidSignature(u64),

    #[error("Invalid signature encoding: {0}")]
    SignatureEncoding(#[source] CryptoError),

    #[error("Malformed registrations: {0}")]
    Malformed(#[from] CodecError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Invalid asset length: {0}")]
    InvalidAsset(usize),

    #[error("Proof of {0} bytes exceeds the size limit")]
    InvalidProofSize(usize),

    #[error(transparent)]
    Statement(#[from] StatementError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("Malformed transfer: {0}")]
    Malformed(#[from] CodecError),
}
