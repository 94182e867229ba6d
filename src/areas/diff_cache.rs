//! Diff cache slots
//!
//! A [`DiffSlot`] holds one diff and the bookkeeping for loading it: at most
//! one load runs per slot, and a load only lands if the slot's generation is
//! unchanged since it started. `reset` bumps the generation, so anything still
//! in flight at that point is dropped on completion.
//!
//! [`CommitDiffCache`] keys slots by commit hash and evicts the oldest inserted
//! slot once its capacity is reached.

use crate::artifacts::diff::display::{PreparedDiff, prepare_diff_display};
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::{EngineError, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Independent copy of a slot's state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSnapshot {
    pub ready: bool,
    pub loading: bool,
    pub generation: u64,
    pub diff: PreparedDiff,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct DiffSlot {
    state: Mutex<DiffSnapshot>,
}

impl DiffSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for a load
    ///
    /// # Returns
    ///
    /// The generation the load must report back with, and whether the caller
    /// should actually start it. A slot that is already loading, or holds a
    /// diff and is not forced, is left alone. A slot holding an error is
    /// always retried.
    pub fn start_loading(&self, force: bool) -> (u64, bool) {
        let mut state = self.state.lock();
        let settled = state.ready && state.error.is_none();
        if state.loading || (settled && !force) {
            return (state.generation, false);
        }

        state.loading = true;
        (state.generation, true)
    }

    /// Land the result of a load started at `generation`
    ///
    /// Fails with `StaleGeneration`, leaving the slot untouched, when the slot
    /// was reset in the meantime.
    pub fn finish(&self, generation: u64, result: Result<String>) -> Result<()> {
        let mut state = self.state.lock();
        if state.generation != generation {
            return Err(EngineError::StaleGeneration {
                started: generation,
                current: state.generation,
            });
        }

        state.loading = false;
        state.ready = true;
        match result {
            Ok(text) => {
                state.diff = prepare_diff_display(&text);
                state.error = None;
            }
            Err(error) => {
                state.diff = PreparedDiff::default();
                state.error = Some(error.to_string());
            }
        }

        Ok(())
    }

    /// Release a load started at `generation` without landing a result
    pub fn abandon(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation == generation {
            state.loading = false;
        }
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        let generation = state.generation + 1;
        *state = DiffSnapshot {
            generation,
            ..DiffSnapshot::default()
        };
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    pub fn snapshot(&self) -> DiffSnapshot {
        self.state.lock().clone()
    }
}

#[derive(Debug, Default)]
struct CacheState {
    slots: HashMap<ObjectId, Arc<DiffSlot>>,
    order: VecDeque<ObjectId>,
}

/// Commit diff slots keyed by hash
#[derive(Debug)]
pub struct CommitDiffCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl CommitDiffCache {
    pub fn new(capacity: usize) -> Self {
        CommitDiffCache {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Slot for `oid`, created (and an old slot evicted) when missing
    pub fn slot(&self, oid: &ObjectId) -> Arc<DiffSlot> {
        let mut state = self.state.lock();
        if let Some(slot) = state.slots.get(oid) {
            return slot.clone();
        }

        while state.order.len() >= self.capacity {
            let Some(evicted) = state.order.pop_front() else {
                break;
            };
            state.slots.remove(&evicted);
        }

        let slot = Arc::new(DiffSlot::new());
        state.slots.insert(oid.clone(), slot.clone());
        state.order.push_back(oid.clone());
        slot
    }

    pub fn get(&self, oid: &ObjectId) -> Option<Arc<DiffSlot>> {
        self.state.lock().slots.get(oid).cloned()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        for slot in state.slots.values() {
            slot.reset();
        }
        state.slots.clear();
        state.order.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
