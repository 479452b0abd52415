//! Target-process memory address wrapper with hex parsing and a validity probe

use super::error::ScanError;
use crate::process::ProcessMemory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// An address inside the target process's address space.
///
/// Wide enough for the target's native pointer width; kept separate from
/// `usize` so that buffer offsets and target addresses cannot be mixed up.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Address(pub u64);

impl Address {
    /// Creates a new address from a raw value
    pub const fn new(value: u64) -> Self {
        Address(value)
    }

    /// Creates a null address (0x0)
    pub const fn null() -> Self {
        Address(0)
    }

    /// Checks if the address is null
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Bytes from this address to the next multiple of `step`.
    ///
    /// Zero when already aligned. A `step` of 0 or 1 never skips.
    pub const fn alignment_skip(&self, step: u64) -> u64 {
        if step < 2 {
            0
        } else {
            self.0.wrapping_neg() % step
        }
    }

    /// Best-effort probe: attempts a 1-byte read followed by a write-back of
    /// the same byte at this address in the target.
    ///
    /// A `false` result means "unsafe to trust", not proof of unmapped
    /// memory; guarded or export-only pages can produce false results in
    /// either direction.
    pub fn is_valid(&self, mem: &dyn ProcessMemory) -> bool {
        let mut byte = [0u8; 1];
        mem.read_bytes(*self, &mut byte) == 1 && mem.write_bytes(*self, &byte) == 1
    }
}

impl Add<u64> for Address {
    type Output = Address;

    fn add(self, offset: u64) -> Address {
        Address(self.0.wrapping_add(offset))
    }
}

impl AddAssign<u64> for Address {
    fn add_assign(&mut self, offset: u64) {
        self.0 = self.0.wrapping_add(offset);
    }
}

impl Sub<u64> for Address {
    type Output = Address;

    fn sub(self, offset: u64) -> Address {
        Address(self.0.wrapping_sub(offset))
    }
}

impl SubAssign<u64> for Address {
    fn sub_assign(&mut self, offset: u64) {
        self.0 = self.0.wrapping_sub(offset);
    }
}

/// Byte distance between two addresses
impl Sub<Address> for Address {
    type Output = u64;

    fn sub(self, other: Address) -> u64 {
        self.0.wrapping_sub(other.0)
    }
}

impl FromStr for Address {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        // Handle hex prefix variations
        let value = if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            u64::from_str_radix(rest, 16)
        } else if let Some(rest) = s.strip_prefix('$') {
            u64::from_str_radix(rest, 16)
        } else if s.chars().any(|c| c.is_ascii_alphabetic()) {
            // Assume hex if it contains letters
            u64::from_str_radix(s, 16)
        } else {
            // Try decimal first, then hex
            s.parse::<u64>().or_else(|_| u64::from_str_radix(s, 16))
        };

        value
            .map(Address::new)
            .map_err(|_| ScanError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address::new(value)
    }
}

impl From<usize> for Address {
    fn from(value: usize) -> Self {
        Address::new(value as u64)
    }
}
