//! A contiguous run of still-active candidate bytes

use crate::core::types::Address;

/// One active region of the candidate set.
///
/// Regions are kept sorted by `start` and never overlap. `virtual_index`
/// is the region's offset into the compacted value buffers, equal to the
/// sum of the sizes of all regions before it. `item_index` caches the
/// number of elements in all regions before it at the current element
/// step, for random access to the n-th candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: Address,
    pub size: usize,
    pub virtual_index: usize,
    pub item_index: usize,
}

impl Region {
    pub fn new(start: Address, size: usize, virtual_index: usize) -> Self {
        Self {
            start,
            size,
            virtual_index,
            item_index: 0,
        }
    }

    /// One past the last address in the region
    pub fn end(&self) -> Address {
        self.start + self.size as u64
    }

    /// Bytes skipped at the front to reach the first aligned element
    pub fn alignment_skip(&self, step: usize) -> usize {
        self.start.alignment_skip(step as u64) as usize
    }

    /// Number of aligned elements the region holds at the given step
    pub fn item_count(&self, step: usize) -> usize {
        let skip = self.alignment_skip(step);
        if skip >= self.size {
            0
        } else {
            (self.size - skip).div_ceil(step)
        }
    }

    /// Whether the address falls inside the region
    pub fn contains(&self, address: Address) -> bool {
        address >= self.start && address < self.end()
    }
}
