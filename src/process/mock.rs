//! In-memory fake of a target process, used by tests and the demo binary

use super::{PageInfo, PageInventory, ProcessMemory};
use crate::core::types::Address;
use std::sync::{Mutex, MutexGuard};

/// One simulated page run
#[derive(Debug, Clone)]
struct MockPage {
    base: Address,
    data: Vec<u8>,
    committed: bool,
    read_write: bool,
    guarded: bool,
    trusted: bool,
}

/// A fake process whose memory lives in this process.
///
/// Reads and writes behave like the real thing: they transfer bytes up to
/// the end of the containing page run, continue into a contiguous
/// neighbour, and stop short at unmapped or guarded memory.
#[derive(Debug, Default)]
pub struct MockProcess {
    pages: Mutex<Vec<MockPage>>,
}

impl MockProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// A process with a single ordinary read-write page
    pub fn with_page(base: Address, data: Vec<u8>) -> Self {
        let p = Self::new();
        p.add_page(base, data);
        p
    }

    /// Adds an ordinary committed read-write page run
    pub fn add_page(&self, base: Address, data: Vec<u8>) {
        self.insert(MockPage {
            base,
            data,
            committed: true,
            read_write: true,
            guarded: false,
            trusted: true,
        });
    }

    /// Adds a mapped but guarded page run; accesses to it stop short
    pub fn add_guarded_page(&self, base: Address, size: usize) {
        self.insert(MockPage {
            base,
            data: vec![0; size],
            committed: true,
            read_write: true,
            guarded: true,
            trusted: false,
        });
    }

    /// Adds a committed read-only page run
    pub fn add_readonly_page(&self, base: Address, data: Vec<u8>) {
        self.insert(MockPage {
            base,
            data,
            committed: true,
            read_write: false,
            guarded: false,
            trusted: false,
        });
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MockPage>> {
        match self.pages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn insert(&self, page: MockPage) {
        let mut pages = self.lock();
        pages.push(page);
        pages.sort_by_key(|p| p.base.as_u64());
    }

    /// Overwrites bytes directly, bypassing the access checks
    pub fn poke(&self, address: Address, data: &[u8]) {
        let mut pages = self.lock();
        for p in pages.iter_mut() {
            let base = p.base.as_u64();
            let addr = address.as_u64();
            if addr >= base && addr < base + p.data.len() as u64 {
                let off = (addr - base) as usize;
                let n = data.len().min(p.data.len() - off);
                p.data[off..off + n].copy_from_slice(&data[..n]);
                return;
            }
        }
    }

    /// Reads one byte directly, bypassing the access checks
    pub fn peek(&self, address: Address) -> Option<u8> {
        let pages = self.lock();
        for p in pages.iter() {
            let base = p.base.as_u64();
            let addr = address.as_u64();
            if addr >= base && addr < base + p.data.len() as u64 {
                return Some(p.data[(addr - base) as usize]);
            }
        }
        None
    }
}

impl ProcessMemory for MockProcess {
    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> usize {
        let pages = self.lock();
        let mut done = 0;
        while done < buf.len() {
            let addr = address.as_u64().wrapping_add(done as u64);
            let Some(p) = pages.iter().find(|p| {
                let base = p.base.as_u64();
                addr >= base && addr < base + p.data.len() as u64
            }) else {
                break;
            };
            if p.guarded || !p.committed {
                break;
            }
            let off = (addr - p.base.as_u64()) as usize;
            let n = (buf.len() - done).min(p.data.len() - off);
            buf[done..done + n].copy_from_slice(&p.data[off..off + n]);
            done += n;
        }
        done
    }

    fn write_bytes(&self, address: Address, data: &[u8]) -> usize {
        let mut pages = self.lock();
        let mut done = 0;
        while done < data.len() {
            let addr = address.as_u64().wrapping_add(done as u64);
            let Some(p) = pages.iter_mut().find(|p| {
                let base = p.base.as_u64();
                addr >= base && addr < base + p.data.len() as u64
            }) else {
                break;
            };
            if p.guarded || !p.committed || !p.read_write {
                break;
            }
            let off = (addr - p.base.as_u64()) as usize;
            let n = (data.len() - done).min(p.data.len() - off);
            p.data[off..off + n].copy_from_slice(&data[done..done + n]);
            done += n;
        }
        done
    }
}

impl PageInventory for MockProcess {
    fn pages(&self) -> Vec<PageInfo> {
        self.lock()
            .iter()
            .map(|p| PageInfo {
                base: p.base,
                size: p.data.len() as u64,
                committed: p.committed,
                read_write: p.read_write,
                guarded: p.guarded,
            })
            .collect()
    }

    fn is_address_trusted(&self, address: Address) -> bool {
        let pages = self.lock();
        pages.iter().any(|p| {
            let base = p.base.as_u64();
            let addr = address.as_u64();
            p.trusted
                && p.committed
                && p.read_write
                && !p.guarded
                && addr >= base
                && addr < base + p.data.len() as u64
        })
    }
}
