//! Core types for prefsdb
//!
//! This crate defines the foundational types used throughout the system:
//! - ValueType: The three type spaces a key can live in (int, float, string)
//! - SettingValue: A value tagged with its type space
//! - Entry: A `(key, value)` pair as stored in the ordered sequences
//! - StoreVersion: Opaque version stamp carried through persistence
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use types::{Entry, FloatEntry, IntEntry, StoreVersion, StringEntry, LATEST_STORE_VERSION};
pub use value::{SettingValue, ValueType, FLOAT_TOLERANCE};
