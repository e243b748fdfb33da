use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;
use umbra_account::HomomorphicAccount;

use super::elements::HeapElement;
use super::min_max_heap::{HeapKind, StakeHeap};
use super::{HeapError, Result};
use crate::ledger::account_changes;
use crate::storage::CommitLog;

struct SelectorState {
    heap: StakeHeap,
    last_sequence: u64,
}

/// Forging candidates of one asset, ranked by stake weight.
///
/// Fed only from commit logs, in commit order; a log whose sequence was
/// already applied is skipped.
pub struct StakeSelector {
    asset: Vec<u8>,
    state: Mutex<SelectorState>,
}

impl StakeSelector {
    pub fn new(asset: &[u8], kind: HeapKind) -> Self {
        Self::from_heap(asset, StakeHeap::new(kind), 0)
    }

    /// Resumes from a heap restored with `StakeHeap::load`.
    pub fn from_heap(asset: &[u8], heap: StakeHeap, last_sequence: u64) -> Self {
        Self {
            asset: asset.to_vec(),
            state: Mutex::new(SelectorState {
                heap,
                last_sequence,
            }),
        }
    }

    pub fn asset(&self) -> &[u8] {
        &self.asset
    }

    /// Replays the account changes of `log`. `weight` maps an account to its
    /// score, or `None` when it should not be a candidate. Returns false when
    /// the log was already applied.
    pub fn apply<F>(&self, log: &CommitLog, weight: F) -> Result<bool>
    where
        F: Fn(&HomomorphicAccount) -> Option<f64>,
    {
        let mut state = self.lock();
        if log.sequence <= state.last_sequence {
            debug!(
                "stake selector: commit {} already applied (at {})",
                log.sequence, state.last_sequence
            );
            return Ok(false);
        }

        // decode and score everything first so a bad entry leaves the heap untouched
        let mut updates = Vec::new();
        for change in account_changes(log)? {
            if change.asset != self.asset {
                continue;
            }
            let score = change.account.as_ref().and_then(&weight);
            if score.is_some_and(f64::is_nan) {
                return Err(HeapError::InvalidScore);
            }
            updates.push((change.public_key.encode_compressed(), score));
        }

        for (key, score) in &updates {
            match score {
                Some(score) if state.heap.contains(key) => {
                    state.heap.update(key, *score)?;
                }
                Some(score) => state.heap.insert(key, *score)?,
                None => {
                    state.heap.remove(key);
                }
            }
        }
        state.last_sequence = log.sequence;
        debug!(
            "stake selector: applied commit {} ({} changes)",
            log.sequence,
            updates.len()
        );
        Ok(true)
    }

    pub fn peek(&self) -> Option<HeapElement> {
        self.lock().heap.peek().cloned()
    }

    pub fn score(&self, key: &[u8]) -> Option<f64> {
        self.lock().heap.get(key)
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_sequence(&self) -> u64 {
        self.lock().last_sequence
    }

    /// Copy of the heap, e.g. for `StakeHeap::save`.
    pub fn snapshot(&self) -> (StakeHeap, u64) {
        let state = self.lock();
        (state.heap.clone(), state.last_sequence)
    }

    fn lock(&self) -> MutexGuard<'_, SelectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
