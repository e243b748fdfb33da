use thiserror::Error;
use umbra_codec::CodecError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid point length: expected 33, got {0}")]
    PointLength(usize),

    #[error("Unknown compressed point prefix: {0:#04x}")]
    UnknownPrefix(u8),

    #[error("Point encoding is not canonical")]
    NonCanonicalPoint,

    #[error("Point is not on the curve")]
    NotOnCurve,

    #[error("Scalar encoding is not canonical")]
    NonCanonicalScalar,

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl CryptoError {
    /// True when the failure is about missing or malformed bytes rather than
    /// about the group element they describe.
    pub fn is_encoding(&self) -> bool {
        matches!(self, CryptoError::Codec(_) | CryptoError::InvalidHex(_))
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;
