//! Canonical byte codec shared by every Umbra wire type.
//!
//! Accounts, statements, registrations and heap elements are signed or proven
//! over their exact encodings, so the codec is strict: variable-length
//! integers must be minimal, reads never run past the buffer, and whole-buffer
//! decodes reject trailing bytes.

mod reader;
mod writer;

pub use reader::BufferReader;
pub use writer::BufferWriter;

use thiserror::Error;

/// Longest valid encoding of a `u64` uvarint.
pub const MAX_UVARINT_LEN: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Truncated input: need {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("Uvarint overflows 64 bits")]
    UvarintOverflow,

    #[error("Uvarint is not minimally encoded")]
    NonCanonicalUvarint,

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("Length {len} exceeds limit {max}")]
    LengthOutOfRange { len: u64, max: u64 },
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Types with a canonical wire form.
pub trait Encode {
    fn encode(&self, w: &mut BufferWriter);

    fn encode_to_bytes(&self) -> Vec<u8> {
        let mut w = BufferWriter::new();
        self.encode(&mut w);
        w.into_bytes()
    }
}
