//! Value types for the three type spaces
//!
//! Every key lives in exactly one type space at a time. `ValueType` names the
//! space and `SettingValue` carries a value together with its space.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute tolerance used when deciding whether a float write changes anything.
///
/// Writes whose difference from the stored value is below this are suppressed.
pub const FLOAT_TOLERANCE: f32 = f32::EPSILON;

/// One of the three independent key/value spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// 32-bit signed integers
    Int,
    /// 32-bit floats
    Float,
    /// UTF-8 strings
    String,
}

impl ValueType {
    /// All type spaces, in persisted order
    pub const ALL: [ValueType; 3] = [ValueType::Int, ValueType::Float, ValueType::String];

    /// Lowercase name used in logs and config
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value tagged with its type space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingValue {
    /// Integer value
    Int(i32),
    /// Float value
    Float(f32),
    /// String value
    String(String),
}

impl SettingValue {
    /// The type space this value belongs to
    pub fn value_type(&self) -> ValueType {
        match self {
            SettingValue::Int(_) => ValueType::Int,
            SettingValue::Float(_) => ValueType::Float,
            SettingValue::String(_) => ValueType::String,
        }
    }

    /// Whether writing `other` over `self` would be a no-op.
    ///
    /// Values in different type spaces are never equivalent. Floats compare
    /// within [`FLOAT_TOLERANCE`]; NaN is never equivalent to anything.
    pub fn is_equivalent(&self, other: &SettingValue) -> bool {
        match (self, other) {
            (SettingValue::Int(a), SettingValue::Int(b)) => a == b,
            (SettingValue::Float(a), SettingValue::Float(b)) => floats_equivalent(*a, *b),
            (SettingValue::String(a), SettingValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Int(v) => write!(f, "{}", v),
            SettingValue::Float(v) => write!(f, "{}", v),
            SettingValue::String(v) => f.write_str(v),
        }
    }
}

impl From<i32> for SettingValue {
    fn from(v: i32) -> Self {
        SettingValue::Int(v)
    }
}

impl From<f32> for SettingValue {
    fn from(v: f32) -> Self {
        SettingValue::Float(v)
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::String(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::String(v.to_string())
    }
}

/// Float comparison used by the write-amplification guard
#[inline]
pub fn floats_equivalent(a: f32, b: f32) -> bool {
    (a - b).abs() < FLOAT_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_of_each_variant() {
        assert_eq!(SettingValue::Int(1).value_type(), ValueType::Int);
        assert_eq!(SettingValue::Float(1.0).value_type(), ValueType::Float);
        assert_eq!(SettingValue::from("x").value_type(), ValueType::String);
    }

    #[test]
    fn test_equivalence_same_space() {
        assert!(SettingValue::Int(5).is_equivalent(&SettingValue::Int(5)));
        assert!(!SettingValue::Int(5).is_equivalent(&SettingValue::Int(6)));
        assert!(SettingValue::from("a").is_equivalent(&SettingValue::from("a")));
        assert!(!SettingValue::from("a").is_equivalent(&SettingValue::from("b")));
    }

    #[test]
    fn test_equivalence_never_crosses_spaces() {
        assert!(!SettingValue::Int(1).is_equivalent(&SettingValue::Float(1.0)));
        assert!(!SettingValue::from("1").is_equivalent(&SettingValue::Int(1)));
    }

    #[test]
    fn test_float_tolerance() {
        assert!(floats_equivalent(0.5, 0.5));
        assert!(floats_equivalent(0.5, 0.5 + FLOAT_TOLERANCE / 4.0));
        assert!(!floats_equivalent(0.5, 0.6));
        assert!(!floats_equivalent(f32::NAN, f32::NAN));
    }

    #[test]
    fn test_display() {
        assert_eq!(SettingValue::Int(-3).to_string(), "-3");
        assert_eq!(SettingValue::Float(0.25).to_string(), "0.25");
        assert_eq!(SettingValue::from("hi").to_string(), "hi");
        assert_eq!(ValueType::Float.to_string(), "float");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn any_value() -> impl Strategy<Value = SettingValue> {
            prop_oneof![
                any::<i32>().prop_map(SettingValue::Int),
                (-1.0e6f32..1.0e6f32).prop_map(SettingValue::Float),
                "[a-z]{0,8}".prop_map(SettingValue::String),
            ]
        }

        proptest! {
            #[test]
            fn equivalence_is_reflexive_and_symmetric(a in any_value(), b in any_value()) {
                prop_assert!(a.is_equivalent(&a));
                prop_assert_eq!(a.is_equivalent(&b), b.is_equivalent(&a));
            }

            #[test]
            fn equivalent_values_share_a_type(a in any_value(), b in any_value()) {
                if a.is_equivalent(&b) {
                    prop_assert_eq!(a.value_type(), b.value_type());
                }
            }
        }
    }
}
