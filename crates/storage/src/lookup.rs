//! Fast-lookup maps
//!
//! One `FxHashMap` per type space, mirroring the ordered sequences. The maps
//! are a derived accelerator: they are always rebuildable from the sequences
//! and are never persisted.

use prefs_core::{FloatEntry, IntEntry, StringEntry};
use rustc_hash::FxHashMap;

/// Hash-map mirror of the three ordered sequences
#[derive(Debug, Default)]
pub struct LookupMaps {
    /// Int space
    pub ints: FxHashMap<String, i32>,
    /// Float space
    pub floats: FxHashMap<String, f32>,
    /// String space
    pub strings: FxHashMap<String, String>,
}

impl LookupMaps {
    /// Fill the maps from the ordered sequences
    ///
    /// Keys are unique within a cache, so insertion order does not matter.
    pub fn populate(&mut self, ints: &[IntEntry], floats: &[FloatEntry], strings: &[StringEntry]) {
        self.ints
            .extend(ints.iter().map(|e| (e.key.clone(), e.value)));
        self.floats
            .extend(floats.iter().map(|e| (e.key.clone(), e.value)));
        self.strings
            .extend(strings.iter().map(|e| (e.key.clone(), e.value.clone())));
    }

    /// Remove `key` from all three maps
    pub fn remove(&mut self, key: &str) -> bool {
        let a = self.ints.remove(key).is_some();
        let b = self.floats.remove(key).is_some();
        let c = self.strings.remove(key).is_some();
        a || b || c
    }

    /// Whether `key` is present in any map
    pub fn contains(&self, key: &str) -> bool {
        self.ints.contains_key(key) || self.floats.contains_key(key) || self.strings.contains_key(key)
    }

    /// Clear all maps, keeping their capacity
    pub fn clear(&mut self) {
        self.ints.clear();
        self.floats.clear();
        self.strings.clear();
    }

    /// Whether all maps are empty
    pub fn is_empty(&self) -> bool {
        self.ints.is_empty() && self.floats.is_empty() && self.strings.is_empty()
    }

    /// Total number of keys across all maps
    pub fn len(&self) -> usize {
        self.ints.len() + self.floats.len() + self.strings.len()
    }
}
