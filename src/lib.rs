//! Incremental memory search and watch engine for live processes.
//!
//! The engine captures the writable pages of a target process, then
//! narrows the candidate set search by search: against a specific
//! value, against the previous capture, against an address, or against
//! how often each element has changed. Surviving addresses can be
//! pinned into a watch list that re-renders on every poll.

pub mod config;
pub mod core;
pub mod process;
pub mod scan;
pub mod watch;

// Re-export the main types
pub use crate::core::types::{
    Address, Endianness, Representation, ScanError, ScanResult, Value, Width,
};
pub use crate::process::{PageInfo, PageInventory, ProcessMemory, TargetProcess};
pub use crate::scan::{
    Candidate, CompareOp, ScanConfig, SearchMode, SearchOutcome, SearchRequest, SearchSession,
};
pub use crate::watch::{Watcher, WatcherSet};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_constants() {
        assert_eq!(crate::core::VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(crate::core::AUTHORS, env!("CARGO_PKG_AUTHORS"));
    }

    #[test]
    fn test_address_reexport() {
        let addr = Address::new(0x1000);
        assert_eq!(addr.as_u64(), 0x1000);
        assert!(Address::null().is_null());
    }

    #[test]
    fn test_value_reexport() {
        let value = Value::I32(42);
        assert_eq!(value.format(Width::W32, Representation::Unsigned), "42");
        assert!(value.binary_equals(&Value::I32(42)));
    }

    #[test]
    fn test_error_reexport() {
        let error = ScanError::ProcessNotFound("notepad.exe".to_string());
        assert!(error.to_string().contains("Process not found"));
        let result: ScanResult<u32> = Ok(42);
        assert!(result.is_ok());
    }

    #[test]
    fn test_session_reexport() {
        use crate::process::mock::MockProcess;
        use std::sync::Arc;

        let process = Arc::new(MockProcess::with_page(Address::new(0x1000), vec![0; 16]));
        let session = SearchSession::new(process);
        let outcome = session.reset(&ScanConfig::default());
        assert_eq!(outcome.candidates, 16);
    }
}
