use umbra_codec::{BufferReader, BufferWriter, Encode};

use super::{HeapError, Result};

pub const MAX_KEY_LEN: usize = 255;

pub(crate) fn check_key(key: &[u8]) -> Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(HeapError::InvalidKey(key.len()));
    }
    Ok(())
}

fn read_key(r: &mut BufferReader<'_>) -> Result<Vec<u8>> {
    let len = r.read_byte()? as usize;
    let key = r.read_bytes(len)?.to_vec();
    check_key(&key)?;
    Ok(key)
}

/// Heap slot: `key_len:u8 | key | score:f64 (BE)`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeapElement {
    pub key: Vec<u8>,
    pub score: f64,
}

impl HeapElement {
    pub fn new(key: &[u8], score: f64) -> Result<Self> {
        let element = Self {
            key: key.to_vec(),
            score,
        };
        element.validate()?;
        Ok(element)
    }

    pub fn validate(&self) -> Result<()> {
        check_key(&self.key)?;
        if self.score.is_nan() {
            return Err(HeapError::InvalidScore);
        }
        Ok(())
    }

    pub fn read(r: &mut BufferReader<'_>) -> Result<Self> {
        let key = read_key(r)?;
        let score = r.read_f64()?;
        let element = Self { key, score };
        element.validate()?;
        Ok(element)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = BufferReader::new(bytes);
        let element = Self::read(&mut r)?;
        r.finish()?;
        Ok(element)
    }
}

/// Encoding assumes a validated key.
impl Encode for HeapElement {
    fn encode(&self, w: &mut BufferWriter) {
        w.write_byte(self.key.len() as u8);
        w.write(&self.key);
        w.write_f64(self.score);
    }
}

/// Position of a key in the heap array: `key_len:u8 | key | index:uvarint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapDictElement {
    pub key: Vec<u8>,
    pub index: u64,
}

impl HeapDictElement {
    pub fn validate(&self) -> Result<()> {
        check_key(&self.key)
    }

    pub fn read(r: &mut BufferReader<'_>) -> Result<Self> {
        let key = read_key(r)?;
        let index = r.read_uvarint()?;
        Ok(Self { key, index })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = BufferReader::new(bytes);
        let element = Self::read(&mut r)?;
        r.finish()?;
        Ok(element)
    }
}

impl Encode for HeapDictElement {
    fn encode(&self, w: &mut BufferWriter) {
        w.write_byte(self.key.len() as u8);
        w.write(&self.key);
        w.write_uvarint(self.index);
    }
}
