//! Bloomed ring values.
//!
//! A bloomed `CLn`, `CRn` or public key is left out of the statement bytes
//! and rebuilt by the verifier from the chain state named by `root_hash`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use umbra_crypto::Point;

use crate::statement::{ROOT_HASH_SIZE, TransferStatement};

/// Written in place of a 33-byte point. Never a valid compressed prefix.
pub const BLOOM_MARKER: u8 = 0x01;

/// Ring slots that may be bloomed. `C[i]` and `D` are always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BloomField {
    CLn,
    CRn,
    PublicKey,
}

impl BloomField {
    pub const ALL: [BloomField; 3] = [BloomField::CLn, BloomField::CRn, BloomField::PublicKey];
}

/// Set of `(position, field)` slots to omit when encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BloomMask {
    slots: HashSet<(usize, BloomField)>,
}

impl BloomMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bloom every public key of a ring, the common case for wallets that
    /// build rings from already published accounts.
    pub fn public_keys(ring_size: usize) -> Self {
        let mut mask = Self::new();
        for position in 0..ring_size {
            mask.insert(position, BloomField::PublicKey);
        }
        mask
    }

    pub fn insert(&mut self, position: usize, field: BloomField) {
        self.slots.insert((position, field));
    }

    pub fn with(mut self, position: usize, field: BloomField) -> Self {
        self.insert(position, field);
        self
    }

    pub fn contains(&self, position: usize, field: BloomField) -> bool {
        self.slots.contains(&(position, field))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Rebuilds bloomed values from chain state.
///
/// Returning `None` makes decoding fail with `UnresolvableBloom`; an
/// implementation must never substitute a default point.
pub trait BloomResolver {
    fn resolve(
        &self,
        position: usize,
        field: BloomField,
        root_hash: &[u8; ROOT_HASH_SIZE],
    ) -> Option<Point>;
}

/// Resolver for callers without any chain state. Every bloom fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBloom;

impl BloomResolver for NoBloom {
    fn resolve(&self, _: usize, _: BloomField, _: &[u8; ROOT_HASH_SIZE]) -> Option<Point> {
        None
    }
}

/// Snapshot of known ring values keyed by root hash.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    values: HashMap<([u8; ROOT_HASH_SIZE], usize, BloomField), Point>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        root_hash: [u8; ROOT_HASH_SIZE],
        position: usize,
        field: BloomField,
        value: Point,
    ) {
        self.values.insert((root_hash, position, field), value);
    }

    /// Records every bloomable slot of `statement` under its root hash.
    pub fn from_statement(statement: &TransferStatement) -> Self {
        let mut resolver = Self::new();
        resolver.extend_from_statement(statement);
        resolver
    }

    pub fn extend_from_statement(&mut self, statement: &TransferStatement) {
        let root = statement.root_hash;
        for position in 0..statement.ring_size {
            for field in BloomField::ALL {
                if let Some(value) = statement.slot(position, field) {
                    self.insert(root, position, field, *value);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl BloomResolver for MapResolver {
    fn resolve(
        &self,
        position: usize,
        field: BloomField,
        root_hash: &[u8; ROOT_HASH_SIZE],
    ) -> Option<Point> {
        self.values.get(&(*root_hash, position, field)).copied()
    }
}

impl<T: BloomResolver + ?Sized> BloomResolver for &T {
    fn resolve(
        &self,
        position: usize,
        field: BloomField,
        root_hash: &[u8; ROOT_HASH_SIZE],
    ) -> Option<Point> {
        (**self).resolve(position, field, root_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_is_not_a_point_prefix() {
        let bytes = [BLOOM_MARKER; umbra_crypto::POINT_SIZE];
        assert!(Point::decode_compressed(&bytes).is_err());
    }

    #[test]
    fn no_bloom_never_resolves() {
        for field in BloomField::ALL {
            assert!(NoBloom.resolve(0, field, &[0u8; 32]).is_none());
        }
    }

    #[test]
    fn map_resolver_is_keyed_by_root() {
        let mut resolver = MapResolver::new();
        resolver.insert([1u8; 32], 3, BloomField::PublicKey, Point::generator());

        assert_eq!(
            resolver.resolve(3, BloomField::PublicKey, &[1u8; 32]),
            Some(Point::generator())
        );
        let misses = [
            (3, BloomField::PublicKey, [2u8; 32]),
            (3, BloomField::CLn, [1u8; 32]),
            (2, BloomField::PublicKey, [1u8; 32]),
        ];
        for (position, field, root) in misses {
            assert!(resolver.resolve(position, field, &root).is_none());
        }
    }

    #[test]
    fn public_key_mask() {
        let mask = BloomMask::public_keys(4);
        assert_eq!(mask.len(), 4);
        assert!(mask.contains(3, BloomField::PublicKey));
        assert!(!mask.contains(3, BloomField::CLn));
        assert!(!mask.contains(4, BloomField::PublicKey));
    }
}
