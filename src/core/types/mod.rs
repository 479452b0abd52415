//! Core data types shared across the crate

pub mod address;
pub mod error;
pub mod value;

pub use address::Address;
pub use error::{ScanError, ScanResult};
pub use value::{Endianness, Representation, Value, Width};
