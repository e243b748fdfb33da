//! Public statement of one confidential ring transfer.
//!
//! ```text
//! ┌──────────┬─────────┬──────┬─────────────────────────────────┬───────────┐
//! │ log2(n)  │ fee     │ D    │ n × (CLn, CRn, pk, C)           │ root_hash │
//! │ 1 byte   │ uvarint │ 33 B │ 33 B each, or 1 B when bloomed  │ 32 B      │
//! └──────────┴─────────┴──────┴─────────────────────────────────┴───────────┘
//! ```

use serde::{Deserialize, Serialize};
use umbra_codec::{BufferReader, BufferWriter};
use umbra_crypto::{CryptoError, POINT_SIZE, Point};

use crate::bloom::{BLOOM_MARKER, BloomField, BloomMask, BloomResolver};
use crate::errors::{Slot, StatementError};

pub const ROOT_HASH_SIZE: usize = 32;

/// Smallest encoding of one ring position: three bloomed slots plus `C[i]`.
const MIN_POSITION_LEN: usize = 3 + POINT_SIZE;

pub type Result<T> = std::result::Result<T, StatementError>;

/// Checks that `ring_size` is a power of two in `[2, ring_max]`.
pub fn check_ring_size(ring_size: usize, ring_max: usize) -> Result<()> {
    if ring_size < 2 || ring_size > ring_max || !ring_size.is_power_of_two() {
        return Err(StatementError::InvalidRingSize {
            ring_size,
            ring_max,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatement {
    pub ring_size: usize,
    #[serde(rename = "CLn")]
    pub c_ln: Vec<Point>,
    #[serde(rename = "CRn")]
    pub c_rn: Vec<Point>,
    pub public_key_list: Vec<Point>,
    #[serde(rename = "C")]
    pub c: Vec<Point>,
    #[serde(rename = "D")]
    pub d: Point,
    pub fee: u64,
    #[serde(with = "hex::serde")]
    pub root_hash: [u8; ROOT_HASH_SIZE],
}

enum Pending {
    Explicit(Point),
    Bloomed,
}

impl TransferStatement {
    /// Full check after decode or before submission.
    pub fn validate(&self, ring_max: usize) -> Result<()> {
        check_ring_size(self.ring_size, ring_max)?;
        self.check_lengths()
    }

    pub fn ring_exponent(&self) -> Result<u8> {
        if self.ring_size < 2 || !self.ring_size.is_power_of_two() {
            return Err(StatementError::InvalidRingSize {
                ring_size: self.ring_size,
                ring_max: self.ring_size,
            });
        }
        Ok(self.ring_size.trailing_zeros() as u8)
    }

    fn check_lengths(&self) -> Result<()> {
        let arrays = [
            ("CLn", self.c_ln.len()),
            ("CRn", self.c_rn.len()),
            ("publicKeyList", self.public_key_list.len()),
            ("C", self.c.len()),
        ];
        for (field, got) in arrays {
            if got != self.ring_size {
                return Err(StatementError::LengthMismatch {
                    field,
                    expected: self.ring_size,
                    got,
                });
            }
        }
        Ok(())
    }

    /// Value of a bloomable slot, `None` when `position` is outside the arrays.
    pub fn slot(&self, position: usize, field: BloomField) -> Option<&Point> {
        match field {
            BloomField::CLn => self.c_ln.get(position),
            BloomField::CRn => self.c_rn.get(position),
            BloomField::PublicKey => self.public_key_list.get(position),
        }
    }

    pub fn write(&self, w: &mut BufferWriter, mask: &BloomMask) -> Result<()> {
        let exponent = self.ring_exponent()?;
        self.check_lengths()?;

        w.write_byte(exponent);
        w.write_uvarint(self.fee);
        self.d.write(w);
        for i in 0..self.ring_size {
            for field in BloomField::ALL {
                if mask.contains(i, field) {
                    w.write_byte(BLOOM_MARKER);
                } else if let Some(value) = self.slot(i, field) {
                    value.write(w);
                }
            }
            self.c[i].write(w);
        }
        w.write(&self.root_hash);
        Ok(())
    }

    /// Canonical encoding with every value explicit. Proofs bind to these bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.encode_bloomed(&BloomMask::new())
    }

    pub fn encode_bloomed(&self, mask: &BloomMask) -> Result<Vec<u8>> {
        let mut w = BufferWriter::with_capacity(
            1 + 10 + POINT_SIZE + self.ring_size * 4 * POINT_SIZE + ROOT_HASH_SIZE,
        );
        self.write(&mut w, mask)?;
        Ok(w.into_bytes())
    }

    /// Reads a statement, resolving bloomed slots once `root_hash` is known.
    pub fn read<R: BloomResolver + ?Sized>(
        r: &mut BufferReader<'_>,
        ring_max: usize,
        resolver: &R,
    ) -> Result<Self> {
        let exponent = r.read_byte()?;
        if exponent as u32 >= usize::BITS {
            return Err(StatementError::InvalidRingExponent(exponent));
        }
        let ring_size = 1usize << exponent;
        check_ring_size(ring_size, ring_max)?;

        let fee = r.read_uvarint()?;
        let d = read_point(r, Slot::D)?;

        let capacity = ring_size.min(r.remaining() / MIN_POSITION_LEN);
        let mut pending: Vec<[Pending; 3]> = Vec::with_capacity(capacity);
        let mut c = Vec::with_capacity(capacity);
        for i in 0..ring_size {
            pending.push([
                read_slot(r, Slot::CLn(i))?,
                read_slot(r, Slot::CRn(i))?,
                read_slot(r, Slot::PublicKey(i))?,
            ]);
            c.push(read_point(r, Slot::C(i))?);
        }
        let root_hash = r.read_array::<ROOT_HASH_SIZE>()?;

        let mut columns: [Vec<Point>; 3] = [
            Vec::with_capacity(ring_size),
            Vec::with_capacity(ring_size),
            Vec::with_capacity(ring_size),
        ];
        for (position, slots) in pending.into_iter().enumerate() {
            let fields = slots.into_iter().zip(BloomField::ALL);
            for ((slot, field), column) in fields.zip(&mut columns) {
                let value = match slot {
                    Pending::Explicit(point) => point,
                    Pending::Bloomed => resolver
                        .resolve(position, field, &root_hash)
                        .ok_or(StatementError::UnresolvableBloom { position, field })?,
                };
                column.push(value);
            }
        }
        let [c_ln, c_rn, public_key_list] = columns;

        Ok(Self {
            ring_size,
            c_ln,
            c_rn,
            public_key_list,
            c,
            d,
            fee,
            root_hash,
        })
    }

    /// Whole-buffer decode; trailing bytes are an error.
    pub fn decode<R: BloomResolver + ?Sized>(
        bytes: &[u8],
        ring_max: usize,
        resolver: &R,
    ) -> Result<Self> {
        let mut r = BufferReader::new(bytes);
        let statement = Self::read(&mut r, ring_max, resolver)?;
        r.finish()?;
        Ok(statement)
    }
}

fn read_point(r: &mut BufferReader<'_>, slot: Slot) -> Result<Point> {
    Point::read(r).map_err(|e| match e {
        CryptoError::Codec(c) => StatementError::Malformed(c),
        source => StatementError::InvalidPoint { slot, source },
    })
}

fn read_slot(r: &mut BufferReader<'_>, slot: Slot) -> Result<Pending> {
    if r.peek_byte()? == BLOOM_MARKER {
        r.read_byte()?;
        return Ok(Pending::Bloomed);
    }
    read_point(r, slot).map(Pending::Explicit)
}
