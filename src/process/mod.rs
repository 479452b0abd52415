//! Access to the memory of an inspected process.
//!
//! The scan engine talks to its target exclusively through the traits in
//! this module, so the same engine runs against a live process handle or
//! an in-memory fake in tests.

pub mod mock;

#[cfg(windows)]
pub mod live;

use crate::core::types::Address;

/// One mapped page of the inspected process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// Base address of the page run
    pub base: Address,
    /// Size in bytes
    pub size: u64,
    /// Page is committed (backed by storage)
    pub committed: bool,
    /// Page is writable as ordinary data
    pub read_write: bool,
    /// Page is guarded and must not be touched
    pub guarded: bool,
}

/// Byte-level access to the target's address space.
///
/// Reads and writes return the number of bytes actually transferred; a
/// short count is a normal outcome near region boundaries, not an error.
/// Only the first `n` bytes of the caller's buffer are touched on a short
/// read.
pub trait ProcessMemory {
    /// Reads up to `buf.len()` bytes starting at `address`
    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> usize;

    /// Writes up to `data.len()` bytes starting at `address`
    fn write_bytes(&self, address: Address, data: &[u8]) -> usize;
}

/// Enumeration of the target's mapped pages
pub trait PageInventory {
    /// All mapped page runs, in ascending address order
    fn pages(&self) -> Vec<PageInfo>;

    /// Whether an address lies inside a committed, ordinary read-write
    /// page that the scan may reset onto
    fn is_address_trusted(&self, address: Address) -> bool;
}

/// Everything the scan engine needs from a target process
pub trait TargetProcess: ProcessMemory + PageInventory {}

impl<T: ProcessMemory + PageInventory + ?Sized> TargetProcess for T {}
