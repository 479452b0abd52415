//! Core functionality: fundamental types and error handling

pub mod types;

pub use types::{Address, Endianness, Representation, ScanError, ScanResult, Value, Width};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
