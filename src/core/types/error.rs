//! Error types for the search and watch engines

use thiserror::Error;

/// Main error type for scan and watch operations
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Invalid search value: {0}")]
    InvalidValue(String),

    #[error("Value {text} does not fit in a {width}-bit {repr} element")]
    ValueOutOfRange {
        text: String,
        width: u32,
        repr: String,
    },

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Malformed watch file record: {0}")]
    WatchFile(String),

    #[error("Watch description may not contain tabs or newlines: {0:?}")]
    WatchDescription(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for scan and watch operations
pub type ScanResult<T> = Result<T, ScanError>;
