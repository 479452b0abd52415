//! Comparison operators and the scalar element types they run over

use crate::core::types::Value;

/// An element type a search pass can be monomorphized over.
///
/// Values are loaded little-endian from the flat capture buffers; integer
/// arithmetic wraps, matching how the target's own registers behave.
pub trait Scalar: Copy + PartialEq + PartialOrd + 'static {
    const BYTES: usize;

    /// Loads the element starting at `index`. The buffers carry enough
    /// padding past their logical end that the full width is always
    /// readable.
    fn load(buf: &[u8], index: usize) -> Self;

    /// True when the two values differ by exactly `amount` in either
    /// direction
    fn differs_by(self, other: Self, amount: Self) -> bool;

    /// True when `self` leaves remainder `target` under `modulus`. A
    /// zero modulus never matches.
    fn mod_equals(self, modulus: Self, target: Self) -> bool;

    /// Numeric (C-style) conversion from a parsed value
    fn from_value(value: Value) -> Self;

    /// Wraps the scalar back into a tagged value of matching storage
    /// size
    fn to_value(self) -> Value;
}

macro_rules! impl_int_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            const BYTES: usize = std::mem::size_of::<$t>();

            fn load(buf: &[u8], index: usize) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                let n = raw.len();
                raw.copy_from_slice(&buf[index..index + n]);
                <$t>::from_le_bytes(raw)
            }

            fn differs_by(self, other: Self, amount: Self) -> bool {
                self.wrapping_sub(other) == amount || other.wrapping_sub(self) == amount
            }

            fn mod_equals(self, modulus: Self, target: Self) -> bool {
                modulus != 0 && self.wrapping_rem(modulus) == target
            }

            fn from_value(value: Value) -> Self {
                value.as_i64() as $t
            }

            fn to_value(self) -> Value {
                if std::mem::size_of::<$t>() <= 4 {
                    Value::I32(self as i32)
                } else {
                    Value::I64(self as i64)
                }
            }
        }
    )*};
}

impl_int_scalar!(i8, u8, i16, u16, i32, u32, i64, u64);

macro_rules! impl_float_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            const BYTES: usize = std::mem::size_of::<$t>();

            fn load(buf: &[u8], index: usize) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                let n = raw.len();
                raw.copy_from_slice(&buf[index..index + n]);
                <$t>::from_le_bytes(raw)
            }

            fn differs_by(self, other: Self, amount: Self) -> bool {
                self - other == amount || other - self == amount
            }

            fn mod_equals(self, modulus: Self, target: Self) -> bool {
                modulus != 0.0 && self % modulus == target
            }

            fn from_value(value: Value) -> Self {
                value.as_f64() as $t
            }

            fn to_value(self) -> Value {
                Value::from(self)
            }
        }
    )*};
}

impl_float_scalar!(f32, f64);

/// A comparison a search applies to each candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    Equal,
    NotEqual,
    /// Differs from the compared value by exactly the parameter
    DiffBy,
    /// Remainder under the parameter equals the compared value
    ModIs,
}

impl CompareOp {
    /// Single-character code, matching the characters shown in the UI
    pub const fn symbol(&self) -> char {
        match self {
            CompareOp::Less => '<',
            CompareOp::Greater => '>',
            CompareOp::LessOrEqual => 'l',
            CompareOp::GreaterOrEqual => 'm',
            CompareOp::Equal => '=',
            CompareOp::NotEqual => '!',
            CompareOp::DiffBy => 'd',
            CompareOp::ModIs => '%',
        }
    }

    /// Inverse of [`CompareOp::symbol`]
    pub const fn from_symbol(c: char) -> Option<CompareOp> {
        match c {
            '<' => Some(CompareOp::Less),
            '>' => Some(CompareOp::Greater),
            'l' => Some(CompareOp::LessOrEqual),
            'm' => Some(CompareOp::GreaterOrEqual),
            '=' => Some(CompareOp::Equal),
            '!' => Some(CompareOp::NotEqual),
            'd' => Some(CompareOp::DiffBy),
            '%' => Some(CompareOp::ModIs),
            _ => None,
        }
    }

    /// Whether the operator consumes the extra parameter
    pub const fn uses_parameter(&self) -> bool {
        matches!(self, CompareOp::DiffBy | CompareOp::ModIs)
    }
}

/// Resolves an operator to a concrete predicate over one scalar type.
///
/// The predicate receives `(value, compared_to, parameter)`; operators
/// that take no parameter ignore the third argument.
pub fn comparator<T: Scalar>(op: CompareOp) -> fn(T, T, T) -> bool {
    match op {
        CompareOp::Less => |a, b, _| a < b,
        CompareOp::Greater => |a, b, _| a > b,
        CompareOp::LessOrEqual => |a, b, _| a <= b,
        CompareOp::GreaterOrEqual => |a, b, _| a >= b,
        CompareOp::Equal => |a, b, _| a == b,
        CompareOp::NotEqual => |a, b, _| a != b,
        CompareOp::DiffBy => |a, b, p| a.differs_by(b, p),
        CompareOp::ModIs => |a, b, p| a.mod_equals(p, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_round_trip() {
        for op in [
            CompareOp::Less,
            CompareOp::Greater,
            CompareOp::LessOrEqual,
            CompareOp::GreaterOrEqual,
            CompareOp::Equal,
            CompareOp::NotEqual,
            CompareOp::DiffBy,
            CompareOp::ModIs,
        ] {
            assert_eq!(CompareOp::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(CompareOp::from_symbol('?'), None);
    }

    #[test]
    fn test_basic_comparisons() {
        let eq = comparator::<i32>(CompareOp::Equal);
        let lt = comparator::<i32>(CompareOp::Less);
        assert!(eq(5, 5, 0));
        assert!(!eq(5, 6, 0));
        assert!(lt(-1, 0, 0));
        assert!(!lt(0, 0, 0));
    }

    #[test]
    fn test_diff_by_wraps() {
        let d = comparator::<u8>(CompareOp::DiffBy);
        assert!(d(250, 2, 8));
        assert!(d(2, 250, 8));
        assert!(!d(2, 250, 9));
        let df = comparator::<f32>(CompareOp::DiffBy);
        assert!(df(1.5, 1.0, 0.5));
        assert!(df(1.0, 1.5, 0.5));
    }

    #[test]
    fn test_mod_equals() {
        let m = comparator::<u32>(CompareOp::ModIs);
        assert!(m(10, 1, 3));
        assert!(!m(10, 0, 3));
        // zero modulus never matches, and never traps
        assert!(!m(10, 0, 0));
        let ms = comparator::<i8>(CompareOp::ModIs);
        // wrapping remainder: -128 % -1 wraps to 0 without trapping
        assert!(ms(i8::MIN, 0, -1));
        assert!(!ms(i8::MIN, -1, 0));
    }

    #[test]
    fn test_load_little_endian() {
        let buf = [0x78, 0x56, 0x34, 0x12, 0, 0, 0, 0];
        assert_eq!(<u32 as Scalar>::load(&buf, 0), 0x12345678);
        assert_eq!(<u16 as Scalar>::load(&buf, 1), 0x3456);
        assert_eq!(<i8 as Scalar>::load(&buf, 3), 0x12);
        let fbuf = 1.5f32.to_le_bytes();
        assert_eq!(<f32 as Scalar>::load(&fbuf, 0), 1.5);
    }

    #[test]
    fn test_from_value_truncates() {
        assert_eq!(<u8 as Scalar>::from_value(Value::I32(0x1FF)), 0xFF);
        assert_eq!(<i32 as Scalar>::from_value(Value::F32(3.9)), 3);
        assert_eq!(<f64 as Scalar>::from_value(Value::I64(-2)), -2.0);
    }
}
