//! Live target process backed by the Win32 debug APIs

use super::{PageInfo, PageInventory, ProcessMemory};
use crate::core::types::{Address, ScanError, ScanResult};
use std::mem;
use tracing::debug;
use winapi::shared::minwindef::{FALSE, LPVOID};
use winapi::um::handleapi::CloseHandle;
use winapi::um::memoryapi::{ReadProcessMemory, VirtualQueryEx, WriteProcessMemory};
use winapi::um::processthreadsapi::OpenProcess;
use winapi::um::sysinfoapi::{GetSystemInfo, SYSTEM_INFO};
use winapi::um::winnt::{
    HANDLE, MEMORY_BASIC_INFORMATION, MEM_COMMIT, PAGE_EXECUTE_READWRITE, PAGE_EXECUTE_WRITECOPY,
    PAGE_GUARD, PAGE_NOACCESS, PAGE_READWRITE, PAGE_WRITECOPY, PROCESS_QUERY_INFORMATION,
    PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
};

/// An open handle to another process on this machine
#[derive(Debug)]
pub struct LiveProcess {
    handle: HANDLE,
    pid: u32,
}

// The handle is only used through APIs that are safe to call from any
// thread.
unsafe impl Send for LiveProcess {}
unsafe impl Sync for LiveProcess {}

impl LiveProcess {
    /// Opens the process with the access rights scanning needs
    pub fn open(pid: u32) -> ScanResult<Self> {
        let access = PROCESS_QUERY_INFORMATION
            | PROCESS_VM_READ
            | PROCESS_VM_WRITE
            | PROCESS_VM_OPERATION;
        let handle = unsafe { OpenProcess(access, FALSE, pid) };
        if handle.is_null() {
            return Err(ScanError::ProcessNotFound(format!("PID: {}", pid)));
        }
        debug!(pid, "opened target process");
        Ok(Self { handle, pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn address_space_bounds() -> (u64, u64) {
        let mut info: SYSTEM_INFO = unsafe { mem::zeroed() };
        unsafe { GetSystemInfo(&mut info) };
        (
            info.lpMinimumApplicationAddress as u64,
            info.lpMaximumApplicationAddress as u64,
        )
    }
}

impl Drop for LiveProcess {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.handle);
        }
    }
}

impl ProcessMemory for LiveProcess {
    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> usize {
        let mut bytes_read = 0usize;
        unsafe {
            ReadProcessMemory(
                self.handle,
                address.as_u64() as LPVOID,
                buf.as_mut_ptr() as LPVOID,
                buf.len(),
                &mut bytes_read,
            );
        }
        bytes_read
    }

    fn write_bytes(&self, address: Address, data: &[u8]) -> usize {
        let mut bytes_written = 0usize;
        unsafe {
            WriteProcessMemory(
                self.handle,
                address.as_u64() as LPVOID,
                data.as_ptr() as LPVOID,
                data.len(),
                &mut bytes_written,
            );
        }
        bytes_written
    }
}

fn classify(mbi: &MEMORY_BASIC_INFORMATION) -> PageInfo {
    let protect = mbi.Protect;
    let writable = protect
        & (PAGE_READWRITE | PAGE_WRITECOPY | PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY)
        != 0;
    PageInfo {
        base: Address::new(mbi.BaseAddress as u64),
        size: mbi.RegionSize as u64,
        committed: mbi.State == MEM_COMMIT,
        read_write: writable,
        guarded: protect & PAGE_GUARD != 0 || protect == PAGE_NOACCESS,
    }
}

impl PageInventory for LiveProcess {
    fn pages(&self) -> Vec<PageInfo> {
        let (min, max) = Self::address_space_bounds();
        let mut pages = Vec::new();
        let mut cursor = min;
        while cursor < max {
            let mut mbi: MEMORY_BASIC_INFORMATION = unsafe { mem::zeroed() };
            let got = unsafe {
                VirtualQueryEx(
                    self.handle,
                    cursor as LPVOID,
                    &mut mbi,
                    mem::size_of::<MEMORY_BASIC_INFORMATION>(),
                )
            };
            if got == 0 || mbi.RegionSize == 0 {
                break;
            }
            pages.push(classify(&mbi));
            cursor = (mbi.BaseAddress as u64).saturating_add(mbi.RegionSize as u64);
        }
        debug!(pid = self.pid, pages = pages.len(), "enumerated pages");
        pages
    }

    fn is_address_trusted(&self, address: Address) -> bool {
        let mut mbi: MEMORY_BASIC_INFORMATION = unsafe { mem::zeroed() };
        let got = unsafe {
            VirtualQueryEx(
                self.handle,
                address.as_u64() as LPVOID,
                &mut mbi,
                mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if got == 0 {
            return false;
        }
        let info = classify(&mbi);
        info.committed && info.read_write && !info.guarded
    }
}
