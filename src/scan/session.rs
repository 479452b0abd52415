//! A search session: one target process, its candidate set, and one
//! level of search undo

use super::collection::RegionCollection;
use super::compare::Scalar;
use super::search::{
    is_satisfied, run_search, with_scalar_type, ResolvedSearch, ScanConfig, SearchRequest,
};
use crate::core::types::{Address, ScanResult, Value};
use crate::process::TargetProcess;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Above this region count the pre-search snapshot is skipped; cloning
/// the set would cost more than the undo is worth
const MAX_UNDO_REGIONS: usize = 10_000;

/// What the last snapshot can roll to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoState {
    Nothing,
    Undo,
    Redo,
}

/// Candidate count and region count after an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    pub candidates: usize,
    pub regions: usize,
}

/// One row of the candidate listing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub address: Address,
    pub value: Value,
    pub previous: Value,
    pub changes: u16,
}

struct SessionState {
    collection: RegionCollection,
    backup: RegionCollection,
    undo_state: UndoState,
}

/// Owns the candidate set for one target process.
///
/// All mutation goes through one lock, so frame updates and searches
/// issued from different threads serialize cleanly. The element shape is
/// passed per call rather than stored, letting the caller retype the
/// view without touching the session.
pub struct SearchSession {
    process: Arc<dyn TargetProcess + Send + Sync>,
    state: Mutex<SessionState>,
}

impl SearchSession {
    pub fn new(process: Arc<dyn TargetProcess + Send + Sync>) -> Self {
        Self {
            process,
            state: Mutex::new(SessionState {
                collection: RegionCollection::new(),
                backup: RegionCollection::new(),
                undo_state: UndoState::Nothing,
            }),
        }
    }

    pub fn process(&self) -> &Arc<dyn TargetProcess + Send + Sync> {
        &self.process
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        // a poisoned lock means a panic mid-update; propagating it
        // would just mask the original panic
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn outcome(state: &mut SessionState, config: &ScanConfig) -> SearchOutcome {
        SearchOutcome {
            candidates: state.collection.count_items(config.step()),
            regions: state.collection.region_count(),
        }
    }

    /// Rebuilds the candidate set from the target's page map and primes
    /// the baseline, so the first relative search compares against the
    /// values captured here.
    pub fn reset(&self, config: &ScanConfig) -> SearchOutcome {
        let step = config.step();
        let elem = config.element_bytes();
        let mut state = self.lock();
        state.collection.reset_all(self.process.as_ref());
        state
            .collection
            .update_regions(self.process.as_ref(), step, elem);
        state.collection.queue_previous_refresh();
        state
            .collection
            .update_regions(self.process.as_ref(), step, elem);
        state.collection.reset_changes();
        state.undo_state = UndoState::Nothing;
        let outcome = Self::outcome(&mut state, config);
        info!(
            candidates = outcome.candidates,
            regions = outcome.regions,
            "candidate set reset"
        );
        outcome
    }

    /// Re-captures the target's memory, advancing the change counters.
    /// Call once per frame or poll interval.
    pub fn tick(&self, config: &ScanConfig) {
        let mut state = self.lock();
        state
            .collection
            .update_regions(self.process.as_ref(), config.step(), config.element_bytes());
    }

    /// Validates and runs one search, pruning the candidate set.
    ///
    /// The surviving values become the next baseline on the following
    /// tick. A search that eliminates nothing leaves no undo snapshot
    /// behind.
    pub fn search(&self, config: &ScanConfig, request: &SearchRequest) -> ScanResult<SearchOutcome> {
        let resolved = request.resolve(config)?;
        let mut state = self.lock();

        let before = state.collection.count_items(config.step());
        if state.collection.region_count() <= MAX_UNDO_REGIONS {
            state.backup = state.collection.clone();
            state.undo_state = UndoState::Undo;
        } else {
            state.undo_state = UndoState::Nothing;
        }

        run_search(&mut state.collection, config, &resolved);
        state.collection.queue_previous_refresh();

        let outcome = Self::outcome(&mut state, config);
        if outcome.candidates == before {
            state.undo_state = UndoState::Nothing;
        }
        Ok(outcome)
    }

    /// Rolls the candidate set to the pre-search snapshot, or back
    /// again. Returns `None` when there is nothing to roll to.
    pub fn undo(&self, config: &ScanConfig) -> Option<SearchOutcome> {
        let mut guard = self.lock();
        let state = &mut *guard;
        match state.undo_state {
            UndoState::Nothing => None,
            UndoState::Undo => {
                std::mem::swap(&mut state.collection, &mut state.backup);
                state.undo_state = UndoState::Redo;
                debug!("search undone");
                Some(Self::outcome(state, config))
            }
            UndoState::Redo => {
                std::mem::swap(&mut state.collection, &mut state.backup);
                state.undo_state = UndoState::Undo;
                debug!("search redone");
                Some(Self::outcome(state, config))
            }
        }
    }

    pub fn undo_state(&self) -> UndoState {
        self.lock().undo_state
    }

    /// Current candidate and region counts
    pub fn counts(&self, config: &ScanConfig) -> SearchOutcome {
        Self::outcome(&mut self.lock(), config)
    }

    /// The n-th candidate's address, values, and change count
    pub fn candidate(&self, config: &ScanConfig, item_index: usize) -> Option<Candidate> {
        let mut state = self.lock();
        let (virtual_index, address) = state.collection.item_location(item_index, config.step())?;
        let c = &state.collection;
        let (value, previous) = with_scalar_type!(config, T => (
            c.cur_value_at::<T>(virtual_index).to_value(),
            c.prev_value_at::<T>(virtual_index).to_value(),
        ));
        Some(Candidate {
            address,
            value,
            previous,
            changes: c.change_count_at(virtual_index),
        })
    }

    /// Item index of the candidate containing an address, if still active
    pub fn candidate_at_address(&self, config: &ScanConfig, address: Address) -> Option<usize> {
        self.lock()
            .collection
            .item_index_for_address(address, config.step())
    }

    /// Previews whether a candidate would survive a search without
    /// running it
    pub fn would_survive(
        &self,
        config: &ScanConfig,
        request: &SearchRequest,
        item_index: usize,
    ) -> ScanResult<bool> {
        let resolved: ResolvedSearch = request.resolve(config)?;
        let mut state = self.lock();
        Ok(is_satisfied(
            &mut state.collection,
            config,
            &resolved,
            item_index,
        ))
    }

    /// Zeroes every change counter
    pub fn reset_change_counts(&self) {
        self.lock().collection.reset_changes();
    }

    /// Drops the candidate set and its buffers
    pub fn clear(&self) {
        let mut state = self.lock();
        state.collection.free_all();
        state.backup.free_all();
        state.undo_state = UndoState::Nothing;
    }

    /// Writes a value into the target at a candidate's address, at the
    /// element width of the view. Returns how many bytes landed.
    pub fn poke_value(&self, config: &ScanConfig, address: Address, value: Value) -> usize {
        let bytes = value.raw_bits().to_le_bytes();
        let n = config.element_bytes();
        self.process.write_bytes(address, &bytes[..n])
    }
}
