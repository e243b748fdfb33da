use std::collections::HashMap;

use umbra_codec::{BufferReader, BufferWriter, Encode};
use umbra_config::HeapKindToml;

use super::elements::{HeapDictElement, HeapElement, check_key};
use super::{HeapError, Result};
use crate::storage::{KvRead, KvWrite};

const HEAP_PREFIX: &[u8] = b"heap/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapKind {
    Min,
    Max,
}

impl HeapKind {
    /// Whether `a` belongs above `b`.
    fn above(self, a: f64, b: f64) -> bool {
        match self {
            HeapKind::Min => a < b,
            HeapKind::Max => a > b,
        }
    }
}

impl From<HeapKindToml> for HeapKind {
    fn from(kind: HeapKindToml) -> Self {
        match kind {
            HeapKindToml::Min => HeapKind::Min,
            HeapKindToml::Max => HeapKind::Max,
        }
    }
}

/// Binary heap with a key -> array position side table.
///
/// Every swap in the array rewrites the side table entries of both moved
/// elements, so `positions[elements[i].key] == i` holds between calls.
#[derive(Debug, Clone)]
pub struct StakeHeap {
    kind: HeapKind,
    elements: Vec<HeapElement>,
    positions: HashMap<Vec<u8>, usize>,
}

impl StakeHeap {
    pub fn new(kind: HeapKind) -> Self {
        Self {
            kind,
            elements: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn kind(&self) -> HeapKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.positions.contains_key(key)
    }

    pub fn get(&self, key: &[u8]) -> Option<f64> {
        self.position(key).map(|i| self.elements[i].score)
    }

    pub fn position(&self, key: &[u8]) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// The minimum or maximum element, per `kind`.
    pub fn peek(&self) -> Option<&HeapElement> {
        self.elements.first()
    }

    /// Elements in array order.
    pub fn iter(&self) -> impl Iterator<Item = &HeapElement> {
        self.elements.iter()
    }

    pub fn insert(&mut self, key: &[u8], score: f64) -> Result<()> {
        let element = HeapElement::new(key, score)?;
        if self.contains(key) {
            return Err(HeapError::DuplicateKey(hex::encode(key)));
        }
        let i = self.elements.len();
        self.positions.insert(element.key.clone(), i);
        self.elements.push(element);
        self.sift_up(i);
        Ok(())
    }

    /// Replaces the score of `key`, returning the old one.
    pub fn update(&mut self, key: &[u8], score: f64) -> Result<f64> {
        if score.is_nan() {
            return Err(HeapError::InvalidScore);
        }
        let i = self
            .position(key)
            .ok_or_else(|| HeapError::KeyNotFound(hex::encode(key)))?;
        let old = std::mem::replace(&mut self.elements[i].score, score);
        let i = self.sift_up(i);
        self.sift_down(i);
        Ok(old)
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<HeapElement> {
        let i = self.position(key)?;
        Some(self.remove_at(i))
    }

    pub fn pop(&mut self) -> Option<HeapElement> {
        if self.elements.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    fn remove_at(&mut self, i: usize) -> HeapElement {
        let last = self.elements.len() - 1;
        self.swap(i, last);
        let removed = self.elements.swap_remove(last);
        self.positions.remove(&removed.key);
        if i < self.elements.len() {
            let i = self.sift_up(i);
            self.sift_down(i);
        }
        removed
    }

    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.elements.swap(i, j);
        for k in [i, j] {
            if let Some(position) = self.positions.get_mut(&self.elements[k].key) {
                *position = k;
            }
        }
    }

    fn sift_up(&mut self, mut i: usize) -> usize {
        while i > 0 {
            let parent = (i - 1) / 2;
            let (score, parent_score) = (self.elements[i].score, self.elements[parent].score);
            if !self.kind.above(score, parent_score) {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
        i
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.elements.len();
        loop {
            let mut best = i;
            for child in [2 * i + 1, 2 * i + 2] {
                if child < len
                    && self
                        .kind
                        .above(self.elements[child].score, self.elements[best].score)
                {
                    best = child;
                }
            }
            if best == i {
                return;
            }
            self.swap(i, best);
            i = best;
        }
    }

    /// Checks heap order and that the side table mirrors the array.
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.positions.len() != self.elements.len() {
            return Err(format!(
                "{} positions for {} elements",
                self.positions.len(),
                self.elements.len()
            ));
        }
        for (i, element) in self.elements.iter().enumerate() {
            if self.positions.get(&element.key) != Some(&i) {
                return Err(format!("key {} not indexed at {i}", hex::encode(&element.key)));
            }
            if i > 0 {
                let parent = &self.elements[(i - 1) / 2];
                if self.kind.above(element.score, parent.score) {
                    return Err(format!("element {i} above its parent"));
                }
            }
        }
        Ok(())
    }

    /// Writes the heap under `heap/<name>/`, replacing any earlier copy.
    pub fn save<W: KvWrite + ?Sized>(&self, scope: &mut W, name: &[u8]) -> Result<()> {
        let prefix = heap_prefix(name)?;
        for (key, _) in scope.scan_prefix(&prefix)? {
            scope.delete(&key)?;
        }

        let mut w = BufferWriter::new();
        w.write_uvarint(self.elements.len() as u64);
        scope.put(&child_key(&prefix, b'n', &[]), w.as_bytes())?;

        for (i, element) in self.elements.iter().enumerate() {
            scope.put(
                &child_key(&prefix, b'e', &(i as u64).to_be_bytes()),
                &element.encode_to_bytes(),
            )?;
            let dict = HeapDictElement {
                key: element.key.clone(),
                index: i as u64,
            };
            let key = child_key(&prefix, b'd', &element.key);
            scope.put(&key, &dict.encode_to_bytes())?;
        }
        Ok(())
    }

    /// Rebuilds a heap written by `save`. An absent heap loads empty.
    pub fn load<R: KvRead + ?Sized>(scope: &R, name: &[u8], kind: HeapKind) -> Result<Self> {
        let prefix = heap_prefix(name)?;
        let corrupted = |reason: String| HeapError::Corrupted {
            name: String::from_utf8_lossy(name).into_owned(),
            reason,
        };

        let mut heap = Self::new(kind);
        let Some(bytes) = scope.get(&child_key(&prefix, b'n', &[]))? else {
            return Ok(heap);
        };
        let mut r = BufferReader::new(&bytes);
        let count = r.read_uvarint()?;
        r.finish()?;

        let elements = scope.scan_prefix(&child_key(&prefix, b'e', &[]))?;
        if elements.len() as u64 != count {
            return Err(corrupted(format!("{} elements, expected {count}", elements.len())));
        }
        for (i, (_, bytes)) in elements.iter().enumerate() {
            let element = HeapElement::decode(bytes)?;
            if heap.positions.insert(element.key.clone(), i).is_some() {
                return Err(corrupted(format!("duplicate key {}", hex::encode(&element.key))));
            }
            heap.elements.push(element);
        }

        let dict = scope.scan_prefix(&child_key(&prefix, b'd', &[]))?;
        if dict.len() != heap.elements.len() {
            return Err(corrupted(format!("{} dict entries", dict.len())));
        }
        for (_, bytes) in &dict {
            let entry = HeapDictElement::decode(bytes)?;
            if heap.position(&entry.key).map(|i| i as u64) != Some(entry.index) {
                return Err(corrupted(format!(
                    "dict entry {} points to {}",
                    hex::encode(&entry.key),
                    entry.index
                )));
            }
        }

        heap.check().map_err(corrupted)?;
        Ok(heap)
    }
}

fn heap_prefix(name: &[u8]) -> Result<Vec<u8>> {
    check_key(name)?;
    let mut prefix = Vec::with_capacity(HEAP_PREFIX.len() + 1 + name.len());
    prefix.extend_from_slice(HEAP_PREFIX);
    prefix.push(name.len() as u8);
    prefix.extend_from_slice(name);
    Ok(prefix)
}

fn child_key(prefix: &[u8], tag: u8, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 2 + suffix.len());
    key.extend_from_slice(prefix);
    key.push(b'/');
    key.push(tag);
    key.extend_from_slice(suffix);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, TransactionalStore, WriteScope};
    use proptest::prelude::*;

    fn filled(kind: HeapKind, scores: &[f64]) -> StakeHeap {
        let mut heap = StakeHeap::new(kind);
        for (i, score) in scores.iter().enumerate() {
            heap.insert(format!("k{i}").as_bytes(), *score).unwrap();
        }
        heap
    }

    #[test]
    fn max_heap_orders_by_score() {
        let mut heap = filled(HeapKind::Max, &[3.0, 9.0, 1.0, 7.0]);
        assert_eq!(heap.peek().unwrap().key, b"k1");
        let popped: Vec<f64> = std::iter::from_fn(|| heap.pop().map(|e| e.score)).collect();
        assert_eq!(popped, vec![9.0, 7.0, 3.0, 1.0]);
        assert!(heap.is_empty());
    }

    #[test]
    fn min_heap_orders_by_score() {
        let heap = filled(HeapKind::Min, &[3.0, 9.0, 1.0, 7.0]);
        assert_eq!(heap.peek().unwrap().score, 1.0);
    }

    #[test]
    fn update_and_remove_arbitrary_keys() {
        let mut heap = filled(HeapKind::Max, &[5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(heap.update(b"k4", 10.0).unwrap(), 1.0);
        assert_eq!(heap.peek().unwrap().key, b"k4");
        assert_eq!(heap.update(b"k4", 0.5).unwrap(), 10.0);
        assert_eq!(heap.peek().unwrap().key, b"k0");

        let removed = heap.remove(b"k2").unwrap();
        assert_eq!(removed.score, 3.0);
        assert_eq!(heap.remove(b"k2"), None);
        assert_eq!(heap.len(), 4);
        heap.check().unwrap();
    }

    #[test]
    fn errors() {
        let mut heap = filled(HeapKind::Max, &[1.0]);
        assert!(matches!(heap.insert(b"k0", 2.0), Err(HeapError::DuplicateKey(_))));
        assert!(matches!(heap.update(b"nope", 2.0), Err(HeapError::KeyNotFound(_))));
        assert!(matches!(heap.update(b"k0", f64::NAN), Err(HeapError::InvalidScore)));
        assert!(matches!(heap.insert(b"", 2.0), Err(HeapError::InvalidKey(0))));
        assert_eq!(heap.get(b"k0"), Some(1.0));
    }

    #[test]
    fn save_and_load() {
        let store = MemoryStore::new();
        let heap = filled(HeapKind::Min, &[4.0, 2.0, 8.0, 6.0, 1.0]);

        let mut w = store.begin_write().unwrap();
        heap.save(&mut w, b"stake").unwrap();
        w.commit().unwrap();

        let r = store.begin_read().unwrap();
        let loaded = StakeHeap::load(&r, b"stake", HeapKind::Min).unwrap();
        assert!(loaded.iter().eq(heap.iter()));
        assert_eq!(loaded.position(b"k4"), Some(0));
        let other = StakeHeap::load(&r, b"other", HeapKind::Min).unwrap();
        assert!(other.is_empty());

        // a smaller heap replaces every stale entry
        let mut w = store.begin_write().unwrap();
        let smaller = filled(HeapKind::Min, &[3.0]);
        smaller.save(&mut w, b"stake").unwrap();
        w.commit().unwrap();
        let r = store.begin_read().unwrap();
        let reloaded = StakeHeap::load(&r, b"stake", HeapKind::Min).unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn load_detects_tampering() {
        let store = MemoryStore::new();
        let heap = filled(HeapKind::Max, &[4.0, 2.0]);
        let mut w = store.begin_write().unwrap();
        heap.save(&mut w, b"stake").unwrap();

        let prefix = heap_prefix(b"stake").unwrap();
        let dict = HeapDictElement {
            key: b"k0".to_vec(),
            index: 1,
        };
        let key = child_key(&prefix, b'd', b"k0");
        w.put(&key, &dict.encode_to_bytes()).unwrap();
        assert!(matches!(
            StakeHeap::load(&w, b"stake", HeapKind::Max),
            Err(HeapError::Corrupted { .. })
        ));

        heap.save(&mut w, b"stake").unwrap();
        // max order read back as a min heap breaks the heap property
        assert!(matches!(
            StakeHeap::load(&w, b"stake", HeapKind::Min),
            Err(HeapError::Corrupted { .. })
        ));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u8, f64),
        Update(u8, f64),
        Remove(u8),
        Pop,
    }

    fn op() -> impl Strategy<Value = Op> {
        let score = -1e6f64..1e6;
        prop_oneof![
            (0u8..32, score.clone()).prop_map(|(k, s)| Op::Insert(k, s)),
            (0u8..32, score).prop_map(|(k, s)| Op::Update(k, s)),
            (0u8..32).prop_map(Op::Remove),
            Just(Op::Pop),
        ]
    }

    proptest! {
        #[test]
        fn side_table_tracks_every_move(
            max in any::<bool>(),
            ops in prop::collection::vec(op(), 1..200),
        ) {
            let kind = if max { HeapKind::Max } else { HeapKind::Min };
            let mut heap = StakeHeap::new(kind);
            let mut model: HashMap<u8, f64> = HashMap::new();

            for op in ops {
                match op {
                    Op::Insert(k, s) => {
                        let inserted = heap.insert(&[k], s).is_ok();
                        prop_assert_eq!(inserted, !model.contains_key(&k));
                        model.entry(k).or_insert(s);
                    }
                    Op::Update(k, s) => {
                        let updated = heap.update(&[k], s).is_ok();
                        prop_assert_eq!(updated, model.contains_key(&k));
                        if let Some(v) = model.get_mut(&k) {
                            *v = s;
                        }
                    }
                    Op::Remove(k) => {
                        let removed = heap.remove(&[k]).map(|e| e.score);
                        prop_assert_eq!(removed, model.remove(&k));
                    }
                    Op::Pop => {
                        if let Some(e) = heap.pop() {
                            prop_assert_eq!(model.remove(&e.key[0]), Some(e.score));
                        } else {
                            prop_assert!(model.is_empty());
                        }
                    }
                }

                prop_assert!(heap.check().is_ok());
                prop_assert_eq!(heap.len(), model.len());
                let extreme = match kind {
                    HeapKind::Max => model.values().copied().reduce(f64::max),
                    HeapKind::Min => model.values().copied().reduce(f64::min),
                };
                prop_assert_eq!(heap.peek().map(|e| e.score), extreme);
            }
        }
    }
}
