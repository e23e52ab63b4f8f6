//! Persisted cache representation
//!
//! A `CacheSnapshot` is exactly what crosses the storage boundary: the three
//! ordered sequences plus the store-version stamp. Lookup maps, the dirty flag
//! and lookup mode are runtime state and never appear here.
//!
//! The snapshot also remembers the mutation generation it was taken at, so the
//! save path can tell whether the cache changed while the write was in flight.
//! The generation is not serialized.

use prefs_core::{FloatEntry, IntEntry, StoreVersion, StringEntry, ValueType};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Point-in-time copy of a cache's persisted state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Store-version stamp, passed through untouched
    #[serde(default)]
    pub store_version: StoreVersion,
    /// Int entries in insertion order
    #[serde(default)]
    pub ints: Vec<IntEntry>,
    /// Float entries in insertion order
    #[serde(default)]
    pub floats: Vec<FloatEntry>,
    /// String entries in insertion order
    #[serde(default)]
    pub strings: Vec<StringEntry>,
    /// Mutation generation the snapshot was taken at
    #[serde(skip)]
    pub generation: u64,
}

impl CacheSnapshot {
    /// Total entries across all three sequences
    pub fn len(&self) -> usize {
        self.ints.len() + self.floats.len() + self.strings.len()
    }

    /// Whether the snapshot holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type space holding `key`, if any
    pub fn value_type_of(&self, key: &str) -> Option<ValueType> {
        if self.ints.iter().any(|e| e.key == key) {
            Some(ValueType::Int)
        } else if self.floats.iter().any(|e| e.key == key) {
            Some(ValueType::Float)
        } else if self.strings.iter().any(|e| e.key == key) {
            Some(ValueType::String)
        } else {
            None
        }
    }

    /// Drop entries whose key already appeared earlier
    ///
    /// Sequences are visited int, float, string; the first occurrence of a key
    /// wins. Returns the number of entries removed. Snapshots written by this
    /// crate never contain duplicates; hand-edited or foreign files might.
    pub fn dedup_keys(&mut self) -> usize {
        let before = self.len();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        self.ints.retain(|e| seen.insert(e.key.clone()));
        self.floats.retain(|e| seen.insert(e.key.clone()));
        self.strings.retain(|e| seen.insert(e.key.clone()));
        before - self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefs_core::Entry;

    #[test]
    fn test_value_type_of() {
        let snap = CacheSnapshot {
            ints: vec![Entry::new("a", 1)],
            strings: vec![Entry::new("b", "x".to_string())],
            ..Default::default()
        };
        assert_eq!(snap.value_type_of("a"), Some(ValueType::Int));
        assert_eq!(snap.value_type_of("b"), Some(ValueType::String));
        assert_eq!(snap.value_type_of("c"), None);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut snap = CacheSnapshot {
            ints: vec![Entry::new("k", 1), Entry::new("k", 2), Entry::new("j", 3)],
            floats: vec![Entry::new("k", 0.5)],
            strings: vec![Entry::new("j", "dup".to_string()), Entry::new("s", "ok".to_string())],
            ..Default::default()
        };

        assert_eq!(snap.dedup_keys(), 3);
        assert_eq!(snap.ints, vec![Entry::new("k", 1), Entry::new("j", 3)]);
        assert!(snap.floats.is_empty());
        assert_eq!(snap.strings, vec![Entry::new("s", "ok".to_string())]);
    }

    #[test]
    fn test_dedup_noop_on_clean_snapshot() {
        let mut snap = CacheSnapshot {
            ints: vec![Entry::new("a", 1)],
            floats: vec![Entry::new("b", 1.0)],
            ..Default::default()
        };
        assert_eq!(snap.dedup_keys(), 0);
        assert_eq!(snap.len(), 2);
    }
}
