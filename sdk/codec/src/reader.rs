use byteorder::{BigEndian, ByteOrder};

use crate::{CodecError, MAX_UVARINT_LEN, Result};

/// Cursor over a borrowed input buffer.
///
/// Every read either consumes exactly the bytes it returns or fails without
/// moving the cursor.
#[derive(Debug, Clone)]
pub struct BufferReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the next byte without consuming it.
    pub fn peek_byte(&self) -> Result<u8> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or(CodecError::Truncated {
                needed: 1,
                remaining: 0,
            })
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let b = self.peek_byte()?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(CodecError::Truncated {
                needed: n,
                remaining,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Reads a minimally encoded uvarint.
    pub fn read_uvarint(&mut self) -> Result<u64> {
        let start = self.pos;
        let mut value: u64 = 0;
        let mut shift = 0u32;

        for i in 0..MAX_UVARINT_LEN {
            let b = match self.read_byte() {
                Ok(b) => b,
                Err(_) => {
                    let consumed = self.pos - start;
                    self.pos = start;
                    return Err(CodecError::Truncated {
                        needed: consumed + 1,
                        remaining: consumed,
                    });
                }
            };

            if b < 0x80 {
                if i == MAX_UVARINT_LEN - 1 && b > 1 {
                    self.pos = start;
                    return Err(CodecError::UvarintOverflow);
                }
                if b == 0 && i > 0 {
                    self.pos = start;
                    return Err(CodecError::NonCanonicalUvarint);
                }
                return Ok(value | (u64::from(b) << shift));
            }

            value |= u64::from(b & 0x7f) << shift;
            shift += 7;
        }

        self.pos = start;
        Err(CodecError::UvarintOverflow)
    }

    /// Reads a uvarint length and checks it against `max`.
    pub fn read_len(&mut self, max: u64) -> Result<usize> {
        let len = self.read_uvarint()?;
        if len > max {
            return Err(CodecError::LengthOutOfRange { len, max });
        }
        Ok(len as usize)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(8)?;
        Ok(BigEndian::read_f64(bytes))
    }

    pub fn read_u64_be(&mut self) -> Result<u64> {
        let bytes = self.read_bytes(8)?;
        Ok(BigEndian::read_u64(bytes))
    }

    /// Succeeds only when the whole buffer has been consumed.
    pub fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}
