//! Value conditions
//!
//! A `ValueCondition` tests a setting's current value against thresholds.
//! The threshold used depends on the setting's kind: int settings use the int
//! comparison, float settings the float comparison, and string settings are
//! matched for exact equality.

use crate::primitives::setting::{Setting, SettingKind};
use prefs_core::value::floats_equivalent;
use serde::{Deserialize, Serialize};

/// Numeric comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Comparison {
    /// `value == threshold`
    #[default]
    Equal,
    /// `value != threshold`
    NotEqual,
    /// `value < threshold`
    Less,
    /// `value <= threshold`
    LessOrEqual,
    /// `value > threshold`
    Greater,
    /// `value >= threshold`
    GreaterOrEqual,
}

impl Comparison {
    /// Compare two ints
    pub fn compare_int(self, value: i32, threshold: i32) -> bool {
        match self {
            Comparison::Equal => value == threshold,
            Comparison::NotEqual => value != threshold,
            Comparison::Less => value < threshold,
            Comparison::LessOrEqual => value <= threshold,
            Comparison::Greater => value > threshold,
            Comparison::GreaterOrEqual => value >= threshold,
        }
    }

    /// Compare two floats; equality uses the store's float tolerance
    pub fn compare_float(self, value: f32, threshold: f32) -> bool {
        let equal = floats_equivalent(value, threshold);
        match self {
            Comparison::Equal => equal,
            Comparison::NotEqual => !equal,
            Comparison::Less => !equal && value < threshold,
            Comparison::LessOrEqual => equal || value < threshold,
            Comparison::Greater => !equal && value > threshold,
            Comparison::GreaterOrEqual => equal || value > threshold,
        }
    }
}

/// Thresholds a setting's value is tested against
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueCondition {
    /// Threshold for int settings
    pub int_value: i32,
    /// Operator for int settings
    pub int_comparison: Comparison,
    /// Threshold for float settings
    pub float_value: f32,
    /// Operator for float settings
    pub float_comparison: Comparison,
    /// Expected text for string settings
    pub string_value: String,
}

impl ValueCondition {
    /// Condition with every threshold at its zero value and `Equal`
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the int threshold
    pub fn with_int(mut self, comparison: Comparison, value: i32) -> Self {
        self.int_comparison = comparison;
        self.int_value = value;
        self
    }

    /// Set the float threshold
    pub fn with_float(mut self, comparison: Comparison, value: f32) -> Self {
        self.float_comparison = comparison;
        self.float_value = value;
        self
    }

    /// Set the expected string
    pub fn with_string(mut self, value: impl Into<String>) -> Self {
        self.string_value = value.into();
        self
    }

    /// Test `setting`'s current value
    pub fn evaluate(&self, setting: &Setting) -> bool {
        match setting.kind() {
            SettingKind::Int(_) => self.int_comparison.compare_int(setting.get_int(), self.int_value),
            SettingKind::Float(_) => self
                .float_comparison
                .compare_float(setting.get_float(), self.float_value),
            SettingKind::String(_) => setting.get_string() == self.string_value,
        }
    }
}
