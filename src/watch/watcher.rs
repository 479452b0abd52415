//! A single watched address and its cached value

use crate::core::types::{Address, Endianness, Representation, ScanError, ScanResult, Value, Width};
use crate::process::ProcessMemory;

/// Field separator of the watch file format
pub(crate) const DELIM: char = '\t';

/// Record magic carried at the front of every watch file line
pub(crate) const RECORD_MAGIC: &str = "12345";

/// One watched memory location.
///
/// A watcher's identity is its address, width, and representation;
/// endianness and description are presentation. The cached value holds
/// whatever the last update read, so rendering never touches the target.
#[derive(Debug, Clone, PartialEq)]
pub struct Watcher {
    pub address: Address,
    pub width: Width,
    pub representation: Representation,
    pub endianness: Endianness,
    pub description: String,
    cached: Value,
    changed: bool,
}

impl Watcher {
    pub fn new(address: Address, width: Width, representation: Representation) -> Self {
        Self {
            address,
            width,
            representation,
            endianness: Endianness::Little,
            description: String::new(),
            cached: Value::default(),
            changed: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether two watchers watch the same thing. Endianness and
    /// description are cosmetic and do not count.
    pub fn same_slot(&self, other: &Watcher) -> bool {
        self.address == other.address
            && self.width == other.width
            && self.representation == other.representation
    }

    /// Reads the watched bytes from the target and tags them to match
    /// the watcher's representation. A short read leaves the missing
    /// bytes zero.
    pub fn read_value(&self, mem: &dyn ProcessMemory) -> Value {
        let n = self.width.bytes();
        let mut raw = [0u8; 8];
        let _ = mem.read_bytes(self.address, &mut raw[..n]);
        if self.endianness == Endianness::Big {
            raw[..n].reverse();
        }
        let bits = u64::from_le_bytes(raw);
        match self.representation {
            Representation::Float => {
                if self.width == Width::W64 {
                    Value::F64(f64::from_bits(bits))
                } else {
                    Value::F32(f32::from_bits(bits as u32))
                }
            }
            _ => {
                if self.width == Width::W64 {
                    Value::I64(bits as i64)
                } else {
                    Value::I32(bits as i32)
                }
            }
        }
    }

    /// Refreshes the cached value; returns true when it changed
    pub fn update(&mut self, mem: &dyn ProcessMemory) -> bool {
        let fresh = self.read_value(mem);
        self.changed = !self.cached.binary_equals(&fresh);
        if self.changed {
            self.cached = fresh;
        }
        self.changed
    }

    /// Reads and caches the current value without flagging a change
    pub fn prime(&mut self, mem: &dyn ProcessMemory) {
        self.cached = self.read_value(mem);
        self.changed = false;
    }

    pub fn value(&self) -> Value {
        self.cached
    }

    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// Cached value rendered at the watcher's width and representation
    pub fn render(&self) -> String {
        self.cached.format(self.width, self.representation)
    }

    /// One watch file record, without the trailing newline
    pub fn serialize(&self) -> String {
        format!(
            "{magic}{d}{addr}{d}{width}{d}{repr}{d}{endian}{d}{desc}",
            magic = RECORD_MAGIC,
            d = DELIM,
            addr = self.address,
            width = self.width.code(),
            repr = self.representation.code(),
            endian = self.endianness.code(),
            desc = self.description,
        )
    }

    /// Parses one watch file record. Endianness in the file is ignored;
    /// every loaded watcher reads little-endian.
    pub fn deserialize(line: &str) -> ScanResult<Watcher> {
        let malformed = || ScanError::WatchFile(line.to_string());
        let mut fields = line.trim_end_matches(['\r', '\n']).splitn(6, DELIM);
        fields
            .next()
            .filter(|m| *m == RECORD_MAGIC)
            .ok_or_else(malformed)?;
        let address = fields
            .next()
            .and_then(|f| u64::from_str_radix(f, 16).ok())
            .map(Address::new)
            .ok_or_else(malformed)?;
        let width = fields
            .next()
            .and_then(single_char)
            .and_then(Width::from_code)
            .ok_or_else(malformed)?;
        let representation = fields
            .next()
            .and_then(single_char)
            .and_then(Representation::from_code)
            .ok_or_else(malformed)?;
        // parsed for shape only
        fields
            .next()
            .and_then(single_char)
            .and_then(Endianness::from_code)
            .ok_or_else(malformed)?;
        let description = fields.next().unwrap_or_default().to_string();

        Ok(Watcher {
            address,
            width,
            representation,
            endianness: Endianness::Little,
            description,
            cached: Value::default(),
            changed: false,
        })
    }
}

fn single_char(field: &str) -> Option<char> {
    let mut chars = field.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::MockProcess;

    #[test]
    fn test_identity_ignores_endianness_and_description() {
        let a = Watcher::new(Address::new(0x1000), Width::W16, Representation::Signed)
            .with_description("hp");
        let mut b = Watcher::new(Address::new(0x1000), Width::W16, Representation::Signed);
        b.endianness = Endianness::Big;
        assert!(a.same_slot(&b));

        let c = Watcher::new(Address::new(0x1000), Width::W32, Representation::Signed);
        assert!(!a.same_slot(&c));
    }

    #[test]
    fn test_read_value_tags_by_width() {
        let p = MockProcess::with_page(Address::new(0x1000), vec![0xDB, 0x0F, 0x49, 0x40]);
        let w = Watcher::new(Address::new(0x1000), Width::W32, Representation::Float);
        assert_eq!(w.read_value(&p), Value::F32(f32::from_bits(0x40490FDB)));

        let w = Watcher::new(Address::new(0x1000), Width::W16, Representation::Unsigned);
        assert_eq!(w.read_value(&p), Value::I32(0x0FDB));
    }

    #[test]
    fn test_read_value_big_endian() {
        let p = MockProcess::with_page(Address::new(0x1000), vec![0x12, 0x34]);
        let mut w = Watcher::new(Address::new(0x1000), Width::W16, Representation::Hex);
        w.endianness = Endianness::Big;
        assert_eq!(w.read_value(&p), Value::I32(0x1234));
    }

    #[test]
    fn test_update_sets_changed_flag() {
        let p = MockProcess::with_page(Address::new(0x1000), vec![5]);
        let mut w = Watcher::new(Address::new(0x1000), Width::W8, Representation::Unsigned);
        w.prime(&p);
        assert!(!w.has_changed());

        assert!(!w.update(&p));
        p.poke(Address::new(0x1000), &[6]);
        assert!(w.update(&p));
        assert_eq!(w.value(), Value::I32(6));
        assert!(!w.update(&p));
    }

    #[test]
    fn test_serialize_round_trip() {
        let w = Watcher::new(Address::new(0xABCD), Width::W16, Representation::Hex)
            .with_description("timer");
        let line = w.serialize();
        assert_eq!(line, "12345\t0000ABCD\t2\th\tl\ttimer");

        let back = Watcher::deserialize(&line).unwrap();
        assert!(back.same_slot(&w));
        assert_eq!(back.description, "timer");
        assert_eq!(back.endianness, Endianness::Little);
    }

    #[test]
    fn test_deserialize_forces_little_endian() {
        let back = Watcher::deserialize("12345\t00001000\t4\tu\tb\t").unwrap();
        assert_eq!(back.endianness, Endianness::Little);
    }

    #[test]
    fn test_deserialize_rejects_malformed() {
        assert!(Watcher::deserialize("garbage").is_err());
        assert!(Watcher::deserialize("12345\tXYZZY\t4\tu\tl\t").is_err());
        assert!(Watcher::deserialize("12345\t00001000\t3\tu\tl\t").is_err());
        assert!(Watcher::deserialize("12345\t00001000\t4\tq\tl\t").is_err());
    }

    #[test]
    fn test_render_uses_representation() {
        let p = MockProcess::with_page(Address::new(0x1000), vec![0xFF]);
        let mut w = Watcher::new(Address::new(0x1000), Width::W8, Representation::Signed);
        w.prime(&p);
        assert_eq!(w.render(), "-1");
        w.representation = Representation::Unsigned;
        assert_eq!(w.render(), "255");
    }
}
