//! Confidential ring transfers.
//!
//! A transfer carries zero or more key registrations and exactly one
//! `TransferStatement`. The statement is the public input of the external
//! zero-knowledge verifier; this crate owns its canonical encoding and shape
//! checks, not the proof system.

pub mod bloom;
pub mod errors;
pub mod registration;
pub mod statement;
pub mod transfer;
pub mod verifier;
pub mod witness;

pub use bloom::{BLOOM_MARKER, BloomField, BloomMask, BloomResolver, MapResolver, NoBloom};
pub use errors::{RegistrationError, Slot, StatementError, TransferError};
pub use registration::{RegistrationEntry, Registrations};
pub use statement::{ROOT_HASH_SIZE, TransferStatement, check_ring_size};
pub use transfer::{ConfidentialTransfer, MAX_PROOF_SIZE};
pub use verifier::{MockVerifier, ProofVerifier};
pub use witness::Witness;
