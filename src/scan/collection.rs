//! The candidate set: active regions plus their captured value buffers

use super::compare::Scalar;
use super::region::Region;
use crate::core::types::Address;
use crate::process::{ProcessMemory, TargetProcess};
use tracing::debug;

/// Padding kept past the logical end of the value buffers so multi-byte
/// loads near the end never index out of bounds
pub const BUFFER_PAD: usize = 8;

/// Result of carving an address range out of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeactivateOutcome {
    /// The range missed the region entirely
    NoEffect,
    /// The region shrank but the cursor still points at it
    Changed,
    /// The region was erased or split and the cursor moved
    ChangedAndMoved,
}

/// Ordered set of active regions backed by three parallel flat buffers.
///
/// Each region owns a slice of the buffers starting at its
/// `virtual_index`: the value captured at the last baseline
/// (`prev_values`), the value captured at the last update
/// (`cur_values`), and a per-byte change counter (`change_counts`).
/// The buffers grow but never shrink while the collection lives, so a
/// shrinking candidate set costs no reallocation.
#[derive(Debug, Clone, Default)]
pub struct RegionCollection {
    regions: Vec<Region>,
    prev_values: Vec<u8>,
    cur_values: Vec<u8>,
    change_counts: Vec<u16>,
    /// High-water mark of the summed region sizes
    capacity: usize,
    /// Total elements at `last_step`, valid when indices are clean
    max_item_index: usize,
    last_step: usize,
    item_indices_dirty: bool,
    previous_needs_refresh: bool,
    scratch: Vec<u8>,
}

impl RegionCollection {
    pub fn new() -> Self {
        Self {
            item_indices_dirty: true,
            previous_needs_refresh: true,
            ..Self::default()
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Discards the regions but keeps the buffers for reuse
    pub fn clear(&mut self) {
        self.regions.clear();
        self.item_indices_dirty = true;
    }

    /// Releases everything, including the grow-only buffers
    pub fn free_all(&mut self) {
        self.regions.clear();
        self.prev_values = Vec::new();
        self.cur_values = Vec::new();
        self.change_counts = Vec::new();
        self.scratch = Vec::new();
        self.capacity = 0;
        self.max_item_index = 0;
        self.item_indices_dirty = true;
    }

    /// Rebuilds the region list from the target's current page map.
    ///
    /// Only committed, writable, unguarded pages whose base passes the
    /// trust and probe checks are searched; read-only pages would flood
    /// the candidate set. Virtual indices are reassigned as a prefix sum
    /// and the buffers are grown (and zeroed) if the total exceeds the
    /// high-water mark.
    pub fn reset_all(&mut self, process: &dyn TargetProcess) {
        self.regions.clear();

        for page in process.pages() {
            if !page.committed || !page.read_write || page.guarded {
                continue;
            }
            if !process.is_address_trusted(page.base) {
                continue;
            }
            if !page.base.is_valid(process) {
                continue;
            }
            self.regions
                .push(Region::new(page.base, page.size as usize, 0));
        }

        let mut next_virtual_index = 0;
        for region in &mut self.regions {
            region.virtual_index = next_virtual_index;
            next_virtual_index += region.size;
        }

        if next_virtual_index > self.capacity {
            self.prev_values = vec![0; next_virtual_index + BUFFER_PAD];
            self.cur_values = vec![0; next_virtual_index + BUFFER_PAD];
            self.change_counts = vec![0; next_virtual_index + BUFFER_PAD];
            self.capacity = next_virtual_index;
        }

        self.item_indices_dirty = true;
        debug!(
            regions = self.regions.len(),
            bytes = next_virtual_index,
            "rebuilt region list"
        );
    }

    /// Zeroes every change counter
    pub fn reset_changes(&mut self) {
        self.change_counts.fill(0);
    }

    /// Makes the current capture the new baseline
    pub fn copy_current_to_previous(&mut self) {
        if !self.prev_values.is_empty() {
            self.prev_values.copy_from_slice(&self.cur_values);
        }
    }

    /// Defers the baseline refresh to the next update, so the update
    /// captures fresh values before they become the baseline
    pub fn queue_previous_refresh(&mut self) {
        self.previous_needs_refresh = true;
    }

    /// Recomputes each region's first item index for the given element
    /// step. Cheap when nothing changed since the last call at the same
    /// step.
    pub fn calculate_item_indices(&mut self, step: usize) {
        if !self.item_indices_dirty && step == self.last_step {
            return;
        }
        let mut item_index = 0;
        for region in &mut self.regions {
            region.item_index = item_index;
            item_index += region.item_count(step);
        }
        self.max_item_index = item_index;
        self.last_step = step;
        self.item_indices_dirty = false;
    }

    /// Number of elements across all regions at the given step
    pub fn count_items(&mut self, step: usize) -> usize {
        self.calculate_item_indices(step);
        self.max_item_index
    }

    /// Carves `[address, address + size)` out of the region under
    /// `cursor`.
    ///
    /// On a full erase the cursor is left pointing at the successor; on
    /// a split it is moved to the inserted tail. Callers looping over
    /// regions must restart their per-region state when the cursor
    /// moves.
    pub fn deactivate(
        &mut self,
        cursor: &mut usize,
        address: Address,
        size: usize,
    ) -> DeactivateOutcome {
        let region = &mut self.regions[*cursor];
        let range_end = address + size as u64;

        if range_end <= region.start || address >= region.end() {
            DeactivateOutcome::NoEffect
        } else if address > region.start && range_end >= region.end() {
            // trim the tail
            region.size = (address - region.start) as usize;
            DeactivateOutcome::Changed
        } else if address <= region.start && range_end < region.end() {
            // trim the head
            let erase = (range_end - region.start) as usize;
            region.start += erase as u64;
            region.size -= erase;
            region.virtual_index += erase;
            DeactivateOutcome::Changed
        } else if address <= region.start && range_end >= region.end() {
            // erase the whole region
            self.regions.remove(*cursor);
            self.item_indices_dirty = true;
            DeactivateOutcome::ChangedAndMoved
        } else {
            // split around the range
            let erase = (range_end - region.start) as usize;
            let tail = Region::new(
                region.start + erase as u64,
                region.size - erase,
                region.virtual_index + erase,
            );
            region.size = (address - region.start) as usize;
            self.regions.insert(*cursor + 1, tail);
            *cursor += 1;
            self.item_indices_dirty = true;
            DeactivateOutcome::ChangedAndMoved
        }
    }

    /// Shared traversal for the four search passes: visits every element
    /// and deactivates the ones `fails` rejects.
    ///
    /// The per-region bounds are snapshotted before the inner walk, so a
    /// tail trim mid-region leaves the remaining comparisons running
    /// against the old extent. Those extra comparisons can only
    /// deactivate bytes that are already inactive.
    fn prune_pass<F>(&mut self, step: usize, mut fails: F)
    where
        F: FnMut(&Self, usize, Address) -> bool,
    {
        let mut cursor = 0;
        'regions: while cursor < self.regions.len() {
            let region = self.regions[cursor];
            let skip = region.alignment_skip(step);
            let start = region.virtual_index + skip;
            let end = region.virtual_index + region.size;
            let mut address = region.start + skip as u64;
            let mut i = start;
            while i < end {
                if fails(&*self, i, address)
                    && self.deactivate(&mut cursor, address, step)
                        == DeactivateOutcome::ChangedAndMoved
                {
                    continue 'regions;
                }
                i += step;
                address += step as u64;
            }
            cursor += 1;
        }
    }

    /// Keeps elements whose current value relates to their baseline value
    pub fn search_relative<T: Scalar>(&mut self, cmp: fn(T, T, T) -> bool, param: T, step: usize) {
        self.prune_pass(step, move |c, i, _| {
            !cmp(T::load(&c.cur_values, i), T::load(&c.prev_values, i), param)
        });
    }

    /// Keeps elements whose current value relates to a given value
    pub fn search_specific<T: Scalar>(
        &mut self,
        cmp: fn(T, T, T) -> bool,
        value: T,
        param: T,
        step: usize,
    ) {
        self.prune_pass(step, move |c, i, _| {
            !cmp(T::load(&c.cur_values, i), value, param)
        });
    }

    /// Keeps elements whose address relates to a given address
    pub fn search_address(
        &mut self,
        cmp: fn(u64, u64, u64) -> bool,
        address: u64,
        param: u64,
        step: usize,
    ) {
        self.prune_pass(step, move |_, _, a| !cmp(a.as_u64(), address, param));
    }

    /// Keeps elements whose change count relates to a given count
    pub fn search_changes(
        &mut self,
        cmp: fn(u16, u16, u16) -> bool,
        changes: u16,
        param: u16,
        step: usize,
    ) {
        self.prune_pass(step, move |c, i, _| !cmp(c.change_counts[i], changes, param));
    }

    /// Re-reads every region from the target and folds the differences
    /// into the capture buffers and change counters
    pub fn update_regions(&mut self, process: &dyn ProcessMemory, step: usize, elem_bytes: usize) {
        let refresh = self.previous_needs_refresh;
        for idx in 0..self.regions.len() {
            let region = self.regions[idx];
            let next = self.regions.get(idx + 1).copied();
            self.update_region(process, region, next, step, elem_bytes, refresh);
        }
        self.previous_needs_refresh = false;
    }

    fn update_region(
        &mut self,
        process: &dyn ProcessMemory,
        region: Region,
        next: Option<Region>,
        step: usize,
        elem_bytes: usize,
        refresh_previous: bool,
    ) {
        debug_assert!(elem_bytes.is_power_of_two() && elem_bytes <= BUFFER_PAD);
        debug_assert!(step == 1 || step == elem_bytes);

        let lo = region.virtual_index;

        if refresh_previous {
            let hi = lo + region.size + elem_bytes - step;
            self.prev_values[lo..hi].copy_from_slice(&self.cur_values[lo..hi]);
        }

        // read the region plus the lookahead bytes the last elements
        // spill into; bytes the read leaves untouched keep their old
        // value and therefore compare as unchanged
        let want = region.size + elem_bytes - 1;
        if self.scratch.len() < want {
            self.scratch.resize(want, 0);
        }
        self.scratch[..want].copy_from_slice(&self.cur_values[lo..lo + want]);
        let _ = process.read_bytes(region.start, &mut self.scratch[..want]);

        let skip = region.alignment_skip(step);
        let index_start = lo + skip;
        let index_end = lo + region.size;

        if elem_bytes == 1 {
            for i in index_start..index_end {
                let fresh = self.scratch[i - lo];
                if self.cur_values[i] != fresh {
                    self.cur_values[i] = fresh;
                    self.change_counts[i] = self.change_counts[i].wrapping_add(1);
                }
            }
            return;
        }

        // Multi-byte elements complicate the bookkeeping: several bytes
        // feed one change counter, simultaneous changes to them must
        // count once, and the last elements reach past the region. The
        // lane array remembers, per byte offset within an element, the
        // next index whose counter may still be bumped.
        let end_skip = skip.wrapping_sub(region.size) % step;
        let last_index_to_read = index_end + end_skip + elem_bytes - step;
        let mut last_index_to_copy = last_index_to_read;
        if let Some(next) = next {
            let next_start = next.virtual_index + next.alignment_skip(step);
            last_index_to_copy = last_index_to_copy.min(next_start);
        }

        let mut next_valid_change = [0usize; BUFFER_PAD];
        for (k, lane) in next_valid_change.iter_mut().enumerate().take(elem_bytes) {
            *lane = index_start + k;
        }

        let mut j = 0;
        for i in index_start..last_index_to_read {
            let fresh = self.scratch[i - lo];
            if self.cur_values[i] != fresh {
                if i < last_index_to_copy {
                    self.cur_values[i] = fresh;
                }
                for k in 0..elem_bytes {
                    if i >= index_end + k {
                        continue;
                    }
                    let m = (j + elem_bytes - k) & (elem_bytes - 1);
                    if next_valid_change[m] <= i {
                        self.change_counts[i - k] = self.change_counts[i - k].wrapping_add(1);
                        next_valid_change[m] = i - k + elem_bytes;
                    }
                }
            }
            j += 1;
        }
    }

    /// Baseline value of the element at a virtual index
    pub fn prev_value_at<T: Scalar>(&self, virtual_index: usize) -> T {
        T::load(&self.prev_values, virtual_index)
    }

    /// Current value of the element at a virtual index
    pub fn cur_value_at<T: Scalar>(&self, virtual_index: usize) -> T {
        T::load(&self.cur_values, virtual_index)
    }

    /// Change counter of the element at a virtual index
    pub fn change_count_at(&self, virtual_index: usize) -> u16 {
        self.change_counts[virtual_index]
    }

    /// Virtual index and address of the n-th element at the given step
    pub fn item_location(&mut self, item_index: usize, step: usize) -> Option<(usize, Address)> {
        self.calculate_item_indices(step);
        if item_index >= self.max_item_index {
            return None;
        }
        let pos = self
            .regions
            .partition_point(|r| r.item_index <= item_index)
            .checked_sub(1)?;
        let region = self.regions[pos];
        let skip = region.alignment_skip(step);
        let offset = (item_index - region.item_index) * step;
        Some((
            region.virtual_index + skip + offset,
            region.start + (skip + offset) as u64,
        ))
    }

    /// Item index of the element containing an address, if it is active.
    /// Bytes skipped for alignment at the front of a region belong to no
    /// element.
    pub fn item_index_for_address(&mut self, address: Address, step: usize) -> Option<usize> {
        self.calculate_item_indices(step);
        let region = self.regions.iter().find(|r| r.contains(address))?;
        let offset = (address - region.start) as usize;
        let skip = region.alignment_skip(step);
        if offset < skip {
            return None;
        }
        Some(region.item_index + (offset - skip) / step)
    }
}
