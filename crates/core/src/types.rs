//! Entry and version types
//!
//! Entries are the unit of persisted storage: one `(key, value)` pair in one
//! of the three ordered sequences.

use serde::{Deserialize, Serialize};

/// Opaque stamp used by the store-version upgrade hook
pub type StoreVersion = u32;

/// Newest store version this build writes
///
/// No migrations exist yet; the stamp is carried through load and save unchanged
/// until `update_store_version` bumps it.
pub const LATEST_STORE_VERSION: StoreVersion = 0;

/// A single key/value pair in one type space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<T> {
    /// Logical key, unique across all three type spaces
    pub key: String,
    /// Stored value
    pub value: T,
}

impl<T> Entry<T> {
    /// Create a new entry
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Entry in the int space
pub type IntEntry = Entry<i32>;
/// Entry in the float space
pub type FloatEntry = Entry<f32>;
/// Entry in the string space
pub type StringEntry = Entry<String>;
