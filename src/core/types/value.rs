//! Tagged numeric value with width/signedness-aware rendering and parsing

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element width of a scanned or watched value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    /// Size in bytes
    pub const fn bytes(&self) -> usize {
        match self {
            Width::W8 => 1,
            Width::W16 => 2,
            Width::W32 => 4,
            Width::W64 => 8,
        }
    }

    /// Size in bits
    pub const fn bits(&self) -> u32 {
        (self.bytes() as u32) * 8
    }

    /// Single-character code used by the watch file format
    pub const fn code(&self) -> char {
        match self {
            Width::W8 => '1',
            Width::W16 => '2',
            Width::W32 => '4',
            Width::W64 => '8',
        }
    }

    /// Inverse of [`Width::code`]
    pub const fn from_code(c: char) -> Option<Width> {
        match c {
            '1' => Some(Width::W8),
            '2' => Some(Width::W16),
            '4' => Some(Width::W32),
            '8' => Some(Width::W64),
            _ => None,
        }
    }

    /// Width from a bit count (8/16/32/64)
    pub const fn from_bits(bits: u32) -> Option<Width> {
        match bits {
            8 => Some(Width::W8),
            16 => Some(Width::W16),
            32 => Some(Width::W32),
            64 => Some(Width::W64),
            _ => None,
        }
    }
}

/// How the bits of an element are interpreted for display and comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    Signed,
    Unsigned,
    Hex,
    Float,
}

impl Representation {
    /// Single-character code used by the watch file format
    pub const fn code(&self) -> char {
        match self {
            Representation::Signed => 's',
            Representation::Unsigned => 'u',
            Representation::Hex => 'h',
            Representation::Float => 'f',
        }
    }

    /// Inverse of [`Representation::code`]
    pub const fn from_code(c: char) -> Option<Representation> {
        match c {
            's' => Some(Representation::Signed),
            'u' => Some(Representation::Unsigned),
            'h' => Some(Representation::Hex),
            'f' => Some(Representation::Float),
            _ => None,
        }
    }

    /// Human-readable label, used in error messages
    pub const fn label(&self) -> &'static str {
        match self {
            Representation::Signed => "signed",
            Representation::Unsigned => "unsigned",
            Representation::Hex => "hex",
            Representation::Float => "float",
        }
    }
}

/// Byte order of a watched value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    /// Single-character code used by the watch file format
    pub const fn code(&self) -> char {
        match self {
            Endianness::Little => 'l',
            Endianness::Big => 'b',
        }
    }

    /// Inverse of [`Endianness::code`]
    pub const fn from_code(c: char) -> Option<Endianness> {
        match c {
            'l' => Some(Endianness::Little),
            'b' => Some(Endianness::Big),
            _ => None,
        }
    }
}

/// A tagged numeric value read from target memory or parsed from text.
///
/// The tag records how the value was produced; rendering and comparison
/// reinterpret the raw bits at whatever width/representation the caller
/// requests, so a caller can display an `I32` as hex or as a float bit
/// pattern without converting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Default for Value {
    fn default() -> Self {
        Value::I32(0)
    }
}

impl Value {
    /// Raw bit pattern, zero-extended to 64 bits for the 4-byte variants
    pub fn raw_bits(&self) -> u64 {
        match self {
            Value::I32(v) => *v as u32 as u64,
            Value::F32(f) => f.to_bits() as u64,
            Value::I64(v) => *v as u64,
            Value::F64(f) => f.to_bits(),
        }
    }

    /// True for the 8-byte variants
    const fn is_wide(&self) -> bool {
        matches!(self, Value::I64(_) | Value::F64(_))
    }

    /// Bit-pattern equality, grouped by storage size: {I32, F32} compare by
    /// their 4-byte pattern, {I64, F64} by their 8-byte pattern. A 4-byte
    /// value is never binary-equal to an 8-byte one.
    pub fn binary_equals(&self, other: &Value) -> bool {
        match (self.is_wide(), other.is_wide()) {
            (false, false) => (self.raw_bits() as u32) == (other.raw_bits() as u32),
            (true, true) => self.raw_bits() == other.raw_bits(),
            _ => false,
        }
    }

    /// Numeric conversion (C-style truncating cast for floats)
    pub fn as_i64(&self) -> i64 {
        match self {
            Value::I32(v) => *v as i64,
            Value::I64(v) => *v,
            Value::F32(f) => *f as i64,
            Value::F64(f) => *f as i64,
        }
    }

    /// Numeric conversion to f64
    pub fn as_f64(&self) -> f64 {
        match self {
            Value::I32(v) => *v as f64,
            Value::I64(v) => *v as f64,
            Value::F32(f) => *f as f64,
            Value::F64(f) => *f,
        }
    }

    /// Numeric negation, preserving the tag
    pub fn negated(&self) -> Value {
        match self {
            Value::I32(v) => Value::I32(v.wrapping_neg()),
            Value::I64(v) => Value::I64(v.wrapping_neg()),
            Value::F32(f) => Value::F32(-f),
            Value::F64(f) => Value::F64(-f),
        }
    }

    /// Renders the stored bits reinterpreted at the requested width and
    /// representation. The value's own tag does not constrain the output.
    pub fn format(&self, width: Width, repr: Representation) -> String {
        let bits = self.raw_bits();
        match repr {
            Representation::Float => {
                let mut out = if width == Width::W64 {
                    format!("{}", f64::from_bits(bits))
                } else {
                    format!("{}", f32::from_bits(bits as u32))
                };
                // keep integral floats visually distinct from integers
                if !out.contains(['.', 'e', ',']) {
                    out.push_str(".0");
                }
                out
            }
            Representation::Signed => match width {
                Width::W8 => render_byte(bits as u8, (bits as u8 as i8).to_string()),
                Width::W16 => format!("{}", bits as u16 as i16),
                Width::W32 => format!("{}", bits as u32 as i32),
                Width::W64 => format!("{}", bits as i64),
            },
            Representation::Unsigned => match width {
                Width::W8 => render_byte(bits as u8, (bits as u8).to_string()),
                Width::W16 => format!("{}", bits as u16),
                Width::W32 => format!("{}", bits as u32),
                Width::W64 => format!("{}", bits),
            },
            Representation::Hex => match width {
                Width::W8 => format!("{:02x}", bits as u8),
                Width::W16 => format!("{:04x}", bits as u16),
                Width::W32 => format!("{:08x}", bits as u32),
                Width::W64 => format!("{:016x}", bits),
            },
        }
    }

    /// Tolerant text-to-value parser.
    ///
    /// Applies the input corrections described in the module docs (letter
    /// `O` to digit `0`, sign-run parity, `0x`/`$` hex prefixes, quoted
    /// character codes, hex-letter and decimal-point auto-upgrade) and then
    /// reads the value at the given width/representation. A failed parse is
    /// a normal outcome, reported as `None`.
    pub fn parse(text: &str, width: Width, repr: Representation) -> Option<Value> {
        let cleaned: String = text
            .trim()
            .chars()
            .map(|c| if c == 'O' || c == 'o' { '0' } else { c })
            .collect();

        let mut force_hex = repr == Representation::Hex;
        let mut read_float = repr == Representation::Float;
        let read_wide = width == Width::W64;
        let mut negate = false;

        let mut rest = cleaned.as_str();
        while let Some(r) = rest.strip_prefix('-') {
            rest = r;
            negate = !negate;
        }
        if let Some(r) = rest.strip_prefix('+') {
            rest = r;
        }
        if let Some(r) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            rest = r;
            force_hex = true;
        }
        if let Some(r) = rest.strip_prefix('$') {
            rest = r;
            force_hex = true;
        }

        // a quoted single character stands for its numeric code
        let replaced: String;
        let b = rest.as_bytes();
        if b.len() >= 3 && b[0] == b'\'' && b[2] == b'\'' {
            if read_float {
                force_hex = true;
            }
            replaced = if force_hex {
                format!("{:X}", b[1])
            } else {
                format!("{}", b[1])
            };
            rest = &replaced;
        }

        // auto-upgrade plain decimal input containing hex letters or a
        // decimal point
        if !force_hex && !read_float {
            for c in rest.chars() {
                let lower = c.to_ascii_lowercase();
                if ('a'..='f').contains(&lower) {
                    force_hex = true;
                    break;
                }
                if c == '.' {
                    read_float = true;
                    break;
                }
            }
        }

        if rest.is_empty() {
            return None;
        }

        let parsed = if read_float {
            if force_hex {
                // hex digits give the float its bit pattern
                if read_wide {
                    u64::from_str_radix(rest, 16)
                        .ok()
                        .map(|bits| Value::F64(f64::from_bits(bits)))
                } else {
                    u32::from_str_radix(rest, 16)
                        .ok()
                        .map(|bits| Value::F32(f32::from_bits(bits)))
                }
            } else if read_wide {
                rest.parse::<f64>().ok().map(Value::F64)
            } else {
                rest.parse::<f32>().ok().map(Value::F32)
            }
        } else if read_wide {
            let v = if force_hex {
                u64::from_str_radix(rest, 16).ok().map(|x| x as i64)
            } else if repr == Representation::Signed {
                rest.parse::<i64>()
                    .ok()
                    .or_else(|| rest.parse::<u64>().ok().map(|x| x as i64))
            } else {
                rest.parse::<u64>().ok().map(|x| x as i64)
            };
            v.map(Value::I64)
        } else {
            let v = if force_hex {
                u32::from_str_radix(rest, 16).ok().map(|x| x as i32)
            } else if repr == Representation::Signed {
                rest.parse::<i32>()
                    .ok()
                    .or_else(|| rest.parse::<u32>().ok().map(|x| x as i32))
            } else {
                rest.parse::<u32>().ok().map(|x| x as i32)
            };
            v.map(Value::I32)
        };

        parsed.map(|v| if negate { v.negated() } else { v })
    }
}

fn render_byte(byte: u8, mut out: String) -> String {
    if (32..=126).contains(&byte) {
        out.push_str(&format!(" ('{}')", byte as char));
    }
    out
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::I32(v as i32)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::I64(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
        }
    }
}
