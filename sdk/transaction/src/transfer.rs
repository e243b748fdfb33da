//! Transaction envelope for a confidential transfer.
//!
//! ```text
//! ┌─────────┬───────┬───────────────┬───────────┬───────────┬───────┐
//! │ len(a)  │ asset │ registrations │ statement │ len(p)    │ proof │
//! │ 1 byte  │       │               │           │ uvarint   │       │
//! └─────────┴───────┴───────────────┴───────────┴───────────┴───────┘
//! ```

use serde::{Deserialize, Serialize};
use umbra_codec::{BufferReader, BufferWriter, Encode};

use crate::bloom::{BloomMask, BloomResolver};
use crate::errors::TransferError;
use crate::registration::Registrations;
use crate::statement::TransferStatement;

pub const MAX_PROOF_SIZE: usize = 64 * 1024;

pub type Result<T> = std::result::Result<T, TransferError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidentialTransfer {
    #[serde(with = "hex::serde")]
    pub asset: Vec<u8>,
    pub registrations: Registrations,
    pub statement: TransferStatement,
    #[serde(with = "hex::serde")]
    pub proof: Vec<u8>,
}

impl ConfidentialTransfer {
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.encode_bloomed(&BloomMask::new())
    }

    pub fn encode_bloomed(&self, mask: &BloomMask) -> Result<Vec<u8>> {
        let asset_len = u8::try_from(self.asset.len())
            .map_err(|_| TransferError::InvalidAsset(self.asset.len()))?;
        if self.proof.len() > MAX_PROOF_SIZE {
            return Err(TransferError::InvalidProofSize(self.proof.len()));
        }

        let mut w = BufferWriter::new();
        w.write_byte(asset_len);
        w.write(&self.asset);
        self.registrations.encode(&mut w);
        self.statement.write(&mut w, mask)?;
        w.write_uvarint(self.proof.len() as u64);
        w.write(&self.proof);
        Ok(w.into_bytes())
    }

    pub fn decode<R: BloomResolver + ?Sized>(
        bytes: &[u8],
        ring_max: usize,
        resolver: &R,
    ) -> Result<Self> {
        let mut r = BufferReader::new(bytes);
        let asset_len = r.read_byte()? as usize;
        let asset = r.read_bytes(asset_len)?.to_vec();
        let registrations = Registrations::read(&mut r, ring_max)?;
        let statement = TransferStatement::read(&mut r, ring_max, resolver)?;
        let proof_len = r.read_len(MAX_PROOF_SIZE as u64)?;
        let proof = r.read_bytes(proof_len)?.to_vec();
        r.finish()?;

        Ok(Self {
            asset,
            registrations,
            statement,
            proof,
        })
    }

    /// Ring members as carried by the statement.
    pub fn ring(&self) -> &[umbra_crypto::Point] {
        &self.statement.public_key_list
    }
}
