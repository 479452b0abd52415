//! Search requests: validation of user input and dispatch to the
//! monomorphized pruning passes

use super::collection::RegionCollection;
use super::compare::{comparator, CompareOp, Scalar};
use crate::core::types::{Representation, ScanError, ScanResult, Value, Width};
use serde::{Deserialize, Serialize};
use tracing::info;

/// What each candidate is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Current value against the value captured at the last baseline
    Relative,
    /// Current value against a given value
    Specific,
    /// Element address against a given address
    Address,
    /// Change counter against a given count
    Changes,
}

impl SearchMode {
    pub const fn code(&self) -> char {
        match self {
            SearchMode::Relative => 'r',
            SearchMode::Specific => 's',
            SearchMode::Address => 'a',
            SearchMode::Changes => 'n',
        }
    }

    pub const fn from_code(c: char) -> Option<SearchMode> {
        match c {
            'r' => Some(SearchMode::Relative),
            's' => Some(SearchMode::Specific),
            'a' => Some(SearchMode::Address),
            'n' => Some(SearchMode::Changes),
            _ => None,
        }
    }
}

/// Element shape shared by every operation touching the candidate set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub width: Width,
    pub representation: Representation,
    /// When set, elements sit on multiples of their own size; when
    /// clear, every byte offset starts an element
    pub require_alignment: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            width: Width::W8,
            representation: Representation::Signed,
            require_alignment: true,
        }
    }
}

impl ScanConfig {
    /// Bytes occupied by one element. Float comparisons always run at
    /// the width of the float type, so any float narrower than 64 bits
    /// compares as a 4-byte value.
    pub fn element_bytes(&self) -> usize {
        match self.representation {
            Representation::Float => {
                if self.width == Width::W64 {
                    8
                } else {
                    4
                }
            }
            _ => self.width.bytes(),
        }
    }

    /// Distance between consecutive elements
    pub fn step(&self) -> usize {
        if self.require_alignment {
            self.element_bytes()
        } else {
            1
        }
    }
}

/// A search as the user stated it, values still in text form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub mode: SearchMode,
    pub op: CompareOp,
    /// Compared-to value; ignored for [`SearchMode::Relative`]
    pub value_text: String,
    /// Operator parameter; only read for `DiffBy` and `ModIs`
    pub param_text: String,
}

impl SearchRequest {
    pub fn new(mode: SearchMode, op: CompareOp) -> Self {
        Self {
            mode,
            op,
            value_text: String::new(),
            param_text: String::new(),
        }
    }

    pub fn with_value(mut self, text: impl Into<String>) -> Self {
        self.value_text = text.into();
        self
    }

    pub fn with_param(mut self, text: impl Into<String>) -> Self {
        self.param_text = text.into();
        self
    }
}

/// A validated search, ready to run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSearch {
    pub mode: SearchMode,
    pub op: CompareOp,
    pub value: Value,
    pub param: Value,
}

fn out_of_range(text: &str, width: Width, repr: Representation) -> ScanError {
    ScanError::ValueOutOfRange {
        text: text.to_string(),
        width: width.bits(),
        repr: repr.label().to_string(),
    }
}

/// Rejects values that cannot round-trip through a narrow element
fn check_range(value: Value, text: &str, width: Width, repr: Representation) -> ScanResult<()> {
    let v = value.as_i64();
    let signed = repr == Representation::Signed;
    let bad = match (width, signed) {
        (Width::W8, true) => !(-128..=127).contains(&v),
        (Width::W8, false) => !(0..=255).contains(&v),
        (Width::W16, true) => !(-32768..=32767).contains(&v),
        (Width::W16, false) => !(0..=65535).contains(&v),
        _ => false,
    };
    if bad {
        Err(out_of_range(text, width, repr))
    } else {
        Ok(())
    }
}

fn parse_checked(text: &str, width: Width, repr: Representation) -> ScanResult<Value> {
    let value = Value::parse(text, width, repr)
        .ok_or_else(|| ScanError::InvalidValue(text.to_string()))?;
    check_range(value, text, width, repr)?;
    Ok(value)
}

impl SearchRequest {
    /// Validates the request against the element shape. Anything that
    /// does not parse or does not fit rejects the whole search, so a
    /// typo can never silently widen a prune.
    pub fn resolve(&self, config: &ScanConfig) -> ScanResult<ResolvedSearch> {
        let value = match self.mode {
            SearchMode::Relative => Value::I32(0),
            SearchMode::Specific => {
                parse_checked(&self.value_text, config.width, config.representation)?
            }
            SearchMode::Address => Value::parse(&self.value_text, Width::W64, Representation::Hex)
                .ok_or_else(|| ScanError::InvalidAddress(self.value_text.clone()))?,
            SearchMode::Changes => {
                let v = Value::parse(&self.value_text, Width::W32, Representation::Unsigned)
                    .ok_or_else(|| ScanError::InvalidValue(self.value_text.clone()))?;
                if !(0..=0xFFFF).contains(&v.as_i64()) {
                    return Err(out_of_range(
                        &self.value_text,
                        Width::W16,
                        Representation::Unsigned,
                    ));
                }
                v
            }
        };

        // the parameter is read in the domain the comparison runs in
        let (param_width, param_repr) = match self.mode {
            SearchMode::Relative | SearchMode::Specific => (config.width, config.representation),
            SearchMode::Address => (Width::W64, Representation::Hex),
            SearchMode::Changes => (Width::W32, Representation::Signed),
        };

        let param = match self.op {
            CompareOp::DiffBy => {
                let p = Value::parse(&self.param_text, param_width, param_repr)
                    .ok_or_else(|| ScanError::InvalidValue(self.param_text.clone()))?;
                // a difference is a magnitude
                if p.as_f64() < 0.0 {
                    p.negated()
                } else {
                    p
                }
            }
            CompareOp::ModIs => {
                let p = Value::parse(&self.param_text, param_width, param_repr)
                    .ok_or_else(|| ScanError::InvalidValue(self.param_text.clone()))?;
                if p.as_f64() == 0.0 {
                    return Err(ScanError::InvalidValue(self.param_text.clone()));
                }
                p
            }
            _ => Value::I32(0),
        };

        if self.op.uses_parameter() {
            let (check_width, check_repr) = match self.mode {
                SearchMode::Changes => (Width::W16, Representation::Unsigned),
                SearchMode::Address => (Width::W64, Representation::Unsigned),
                _ => (config.width, config.representation),
            };
            check_range(param, &self.param_text, check_width, check_repr)?;
        }

        Ok(ResolvedSearch {
            mode: self.mode,
            op: self.op,
            value,
            param,
        })
    }
}

/// Resolves a [`ScanConfig`] to the concrete scalar type its comparisons
/// run over, and evaluates the body with `$t` bound to that type.
macro_rules! with_scalar_type {
    ($config:expr, $t:ident => $body:expr) => {{
        use $crate::core::types::{Representation, Width};
        match ($config.representation, $config.width) {
            (Representation::Float, Width::W64) => {
                type $t = f64;
                $body
            }
            (Representation::Float, _) => {
                type $t = f32;
                $body
            }
            (Representation::Signed, Width::W8) => {
                type $t = i8;
                $body
            }
            (Representation::Signed, Width::W16) => {
                type $t = i16;
                $body
            }
            (Representation::Signed, Width::W32) => {
                type $t = i32;
                $body
            }
            (Representation::Signed, Width::W64) => {
                type $t = i64;
                $body
            }
            (_, Width::W8) => {
                type $t = u8;
                $body
            }
            (_, Width::W16) => {
                type $t = u16;
                $body
            }
            (_, Width::W32) => {
                type $t = u32;
                $body
            }
            (_, Width::W64) => {
                type $t = u64;
                $body
            }
        }
    }};
}

pub(crate) use with_scalar_type;

fn value_pass<T: Scalar>(
    collection: &mut RegionCollection,
    search: &ResolvedSearch,
    relative: bool,
    step: usize,
) {
    let cmp = comparator::<T>(search.op);
    let param = T::from_value(search.param);
    if relative {
        collection.search_relative(cmp, param, step);
    } else {
        collection.search_specific(cmp, T::from_value(search.value), param, step);
    }
}

/// Runs one resolved search over the collection, pruning every element
/// the comparison rejects
pub fn run_search(collection: &mut RegionCollection, config: &ScanConfig, search: &ResolvedSearch) {
    let step = config.step();
    match search.mode {
        SearchMode::Address => {
            collection.search_address(
                comparator(search.op),
                search.value.raw_bits(),
                search.param.raw_bits(),
                step,
            );
        }
        SearchMode::Changes => {
            collection.search_changes(
                comparator(search.op),
                search.value.as_i64() as u16,
                search.param.as_i64() as u16,
                step,
            );
        }
        mode => {
            let relative = mode == SearchMode::Relative;
            with_scalar_type!(config, T => value_pass::<T>(collection, search, relative, step));
        }
    }
    info!(
        mode = ?search.mode,
        op = ?search.op,
        regions = collection.region_count(),
        "search pass complete"
    );
}

fn satisfied_pass<T: Scalar>(
    collection: &RegionCollection,
    search: &ResolvedSearch,
    relative: bool,
    virtual_index: usize,
) -> bool {
    let cmp = comparator::<T>(search.op);
    let cur = collection.cur_value_at::<T>(virtual_index);
    let other = if relative {
        collection.prev_value_at::<T>(virtual_index)
    } else {
        T::from_value(search.value)
    };
    cmp(cur, other, T::from_value(search.param))
}

/// Previews whether the item at `item_index` would survive the search,
/// without touching the collection's regions
pub fn is_satisfied(
    collection: &mut RegionCollection,
    config: &ScanConfig,
    search: &ResolvedSearch,
    item_index: usize,
) -> bool {
    let step = config.step();
    let Some((virtual_index, address)) = collection.item_location(item_index, step) else {
        return false;
    };
    match search.mode {
        SearchMode::Address => comparator::<u64>(search.op)(
            address.as_u64(),
            search.value.raw_bits(),
            search.param.raw_bits(),
        ),
        SearchMode::Changes => comparator::<u16>(search.op)(
            collection.change_count_at(virtual_index),
            search.value.as_i64() as u16,
            search.param.as_i64() as u16,
        ),
        mode => {
            let relative = mode == SearchMode::Relative;
            with_scalar_type!(config, T => {
                satisfied_pass::<T>(collection, search, relative, virtual_index)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(width: Width, repr: Representation) -> ScanConfig {
        ScanConfig {
            width,
            representation: repr,
            require_alignment: true,
        }
    }

    #[test]
    fn test_element_bytes_and_step() {
        assert_eq!(cfg(Width::W16, Representation::Signed).element_bytes(), 2);
        assert_eq!(cfg(Width::W16, Representation::Float).element_bytes(), 4);
        assert_eq!(cfg(Width::W64, Representation::Float).element_bytes(), 8);
        assert_eq!(cfg(Width::W32, Representation::Hex).step(), 4);

        let unaligned = ScanConfig {
            require_alignment: false,
            ..cfg(Width::W32, Representation::Hex)
        };
        assert_eq!(unaligned.step(), 1);
        assert_eq!(unaligned.element_bytes(), 4);
    }

    #[test]
    fn test_resolve_specific() {
        let config = cfg(Width::W16, Representation::Signed);
        let r = SearchRequest::new(SearchMode::Specific, CompareOp::Equal)
            .with_value("-100")
            .resolve(&config)
            .unwrap();
        assert_eq!(r.value, Value::I32(-100));
        assert_eq!(r.param, Value::I32(0));
    }

    #[test]
    fn test_resolve_rejects_out_of_range() {
        let config = cfg(Width::W8, Representation::Signed);
        let err = SearchRequest::new(SearchMode::Specific, CompareOp::Equal)
            .with_value("200")
            .resolve(&config)
            .unwrap_err();
        assert!(matches!(err, ScanError::ValueOutOfRange { .. }));

        let config = cfg(Width::W8, Representation::Unsigned);
        assert!(SearchRequest::new(SearchMode::Specific, CompareOp::Equal)
            .with_value("-1")
            .resolve(&config)
            .is_err());
        assert!(SearchRequest::new(SearchMode::Specific, CompareOp::Equal)
            .with_value("255")
            .resolve(&config)
            .is_ok());
    }

    #[test]
    fn test_resolve_rejects_garbage() {
        let config = cfg(Width::W32, Representation::Signed);
        let err = SearchRequest::new(SearchMode::Specific, CompareOp::Equal)
            .with_value("xyz")
            .resolve(&config)
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidValue(_)));
    }

    #[test]
    fn test_resolve_address_is_hex() {
        let config = cfg(Width::W8, Representation::Signed);
        let r = SearchRequest::new(SearchMode::Address, CompareOp::Equal)
            .with_value("1000")
            .resolve(&config)
            .unwrap();
        assert_eq!(r.value.raw_bits(), 0x1000);
    }

    #[test]
    fn test_resolve_changes_range() {
        let config = cfg(Width::W8, Representation::Signed);
        assert!(SearchRequest::new(SearchMode::Changes, CompareOp::GreaterOrEqual)
            .with_value("65535")
            .resolve(&config)
            .is_ok());
        assert!(SearchRequest::new(SearchMode::Changes, CompareOp::GreaterOrEqual)
            .with_value("65536")
            .resolve(&config)
            .is_err());
    }

    #[test]
    fn test_resolve_diff_by_param_made_positive() {
        let config = cfg(Width::W32, Representation::Signed);
        let r = SearchRequest::new(SearchMode::Relative, CompareOp::DiffBy)
            .with_param("-3")
            .resolve(&config)
            .unwrap();
        assert_eq!(r.param, Value::I32(3));
    }

    #[test]
    fn test_resolve_mod_rejects_zero() {
        let config = cfg(Width::W32, Representation::Signed);
        assert!(SearchRequest::new(SearchMode::Specific, CompareOp::ModIs)
            .with_value("1")
            .with_param("0")
            .resolve(&config)
            .is_err());
        assert!(SearchRequest::new(SearchMode::Specific, CompareOp::ModIs)
            .with_value("1")
            .with_param("4")
            .resolve(&config)
            .is_ok());
    }

    #[test]
    fn test_mode_codes() {
        for m in [
            SearchMode::Relative,
            SearchMode::Specific,
            SearchMode::Address,
            SearchMode::Changes,
        ] {
            assert_eq!(SearchMode::from_code(m.code()), Some(m));
        }
        assert_eq!(SearchMode::from_code('x'), None);
    }
}
