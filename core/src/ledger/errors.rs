use thiserror::Error;
use umbra_account::AccountError;
use umbra_codec::CodecError;
use umbra_transaction::{RegistrationError, StatementError, TransferError};

use crate::storage::StoreError;

/// Coarse classification used for propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or truncated bytes.
    Encoding,
    /// A semantic invariant does not hold.
    Validation,
    /// A point, signature or proof does not check out.
    Crypto,
    /// Expected under concurrent load; the sender may rebuild and resubmit.
    Conflict,
    /// Raised by the storage capability, surfaced unchanged.
    Store,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Malformed stored value: {0}")]
    Codec(#[from] CodecError),

    /// Undecodable transfer bytes from a client.
    #[error(transparent)]
    Transfer(TransferError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Statement(#[from] StatementError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("Public key {0} is already registered")]
    AlreadyRegistered(String),

    #[error("Public key {0} is not registered")]
    UnregisteredPublicKey(String),

    #[error("Ring member {0} appears more than once")]
    DuplicateRingMember(usize),

    #[error("Statement root {0} is not a recent state root")]
    UnknownRootHash(String),

    #[error("Proof rejected by verifier")]
    ProofRejected,

    #[error("Statement {field}[{position}] does not match the stored balance")]
    StatementMismatch {
        position: usize,
        field: &'static str,
    },

    #[error("Invalid asset length: {0}")]
    InvalidAsset(usize),

    #[error("Corrupted ledger state: {0}")]
    Corrupted(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<TransferError> for LedgerError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::Statement(e) => LedgerError::Statement(e),
            TransferError::Registration(e) => LedgerError::Registration(e),
            TransferError::InvalidAsset(len) => LedgerError::InvalidAsset(len),
            e @ (TransferError::Malformed(_) | TransferError::InvalidProofSize(_)) => {
                LedgerError::Transfer(e)
            }
        }
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Codec(_) | LedgerError::Transfer(_) => ErrorKind::Encoding,
            LedgerError::Account(e) => match e {
                AccountError::Codec(_) => ErrorKind::Encoding,
                AccountError::InvalidPublicKey(_) | AccountError::InvalidPoint(_) => {
                    ErrorKind::Crypto
                }
                AccountError::InvalidVersion(_) | AccountError::InvalidAsset(_) => {
                    ErrorKind::Validation
                }
            },
            LedgerError::Statement(e) => match e {
                StatementError::Malformed(_) => ErrorKind::Encoding,
                StatementError::InvalidPoint { .. } => ErrorKind::Crypto,
                StatementError::UnresolvableBloom { .. }
                | StatementError::InvalidRingSize { .. }
                | StatementError::InvalidRingExponent(_)
                | StatementError::LengthMismatch { .. } => ErrorKind::Validation,
            },
            LedgerError::Registration(e) => match e {
                RegistrationError::Malformed(_) | RegistrationError::SignatureEncoding(_) => {
                    ErrorKind::Encoding
                }
                RegistrationError::InvalidSignature(_) => ErrorKind::Crypto,
                RegistrationError::InvalidRingSize { .. }
                | RegistrationError::IndexOutOfRange { .. } => ErrorKind::Validation,
            },
            LedgerError::AlreadyRegistered(_)
            | LedgerError::UnregisteredPublicKey(_)
            | LedgerError::UnknownRootHash(_) => ErrorKind::Conflict,
            LedgerError::ProofRejected => ErrorKind::Crypto,
            LedgerError::DuplicateRingMember(_)
            | LedgerError::StatementMismatch { .. }
            | LedgerError::InvalidAsset(_) => ErrorKind::Validation,
            LedgerError::Corrupted(_) | LedgerError::Store(_) => ErrorKind::Store,
        }
    }

    /// Only conflicts are worth rebuilding against fresh state.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
