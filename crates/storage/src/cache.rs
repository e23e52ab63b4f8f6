//! SettingsCache: typed key/value cache with optional fast lookup
//!
//! ## Design
//!
//! Three independent type spaces (int, float, string), each stored twice:
//!
//! - an ordered `Vec<Entry<T>>`, the source of truth and what gets persisted
//! - an optional `FxHashMap<String, T>`, present only in fast-lookup mode
//!
//! The maps are built lazily from the sequences on first access after lookup
//! mode is enabled, and handed back to the [`LookupPool`] when it is disabled
//! or the cache is dropped. Every mutation updates both representations inside
//! one `&mut self` call, so no reader can observe them disagreeing.
//!
//! ## Type Exclusivity
//!
//! A key lives in at most one type space. Setting a key in one space removes
//! it from the other two first. Reading a key through the wrong type returns
//! the caller's default.
//!
//! ## Dirty Tracking
//!
//! `dirty` is raised by every effective mutation and cleared only by
//! [`flush`](SettingsCache::flush) or
//! [`flush_through`](SettingsCache::flush_through). Each effective mutation
//! also bumps a generation counter, which lets the save path detect writes
//! that raced with an in-flight save.

use crate::lookup::LookupMaps;
use crate::pool::LookupPool;
use crate::snapshot::CacheSnapshot;
use once_cell::sync::OnceCell;
use prefs_core::value::floats_equivalent;
use prefs_core::{
    Entry, FloatEntry, IntEntry, SettingValue, StoreVersion, StringEntry, ValueType,
    LATEST_STORE_VERSION,
};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

/// Typed key/value settings cache
///
/// # Example
///
/// ```ignore
/// let mut cache = SettingsCache::new();
/// cache.enable_lookup_cache();
///
/// cache.set_int("volume", 5);
/// assert_eq!(cache.get_int("volume", -1), 5);
///
/// cache.set_float("volume", 0.5);
/// assert_eq!(cache.get_int("volume", -1), -1);
/// ```
#[derive(Debug, Default)]
pub struct SettingsCache {
    ints: Vec<IntEntry>,
    floats: Vec<FloatEntry>,
    strings: Vec<StringEntry>,
    store_version: StoreVersion,
    use_lookup: bool,
    lookup: OnceCell<LookupMaps>,
    dirty: bool,
    generation: u64,
}

impl SettingsCache {
    /// Create an empty, clean cache with lookup mode off
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cache from its persisted form
    ///
    /// The result is clean. Keys duplicated across or within sequences are
    /// collapsed to their first occurrence.
    pub fn from_snapshot(mut snapshot: CacheSnapshot) -> Self {
        let dropped = snapshot.dedup_keys();
        if dropped > 0 {
            warn!(dropped, "Dropped duplicate keys while loading settings");
        }
        if snapshot.store_version > LATEST_STORE_VERSION {
            warn!(
                found = snapshot.store_version,
                latest = LATEST_STORE_VERSION,
                "Settings were written by a newer store version"
            );
        }
        Self {
            ints: snapshot.ints,
            floats: snapshot.floats,
            strings: snapshot.strings,
            store_version: snapshot.store_version,
            use_lookup: false,
            lookup: OnceCell::new(),
            dirty: false,
            generation: 0,
        }
    }

    /// Copy the persisted state together with the current generation
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            store_version: self.store_version,
            ints: self.ints.clone(),
            floats: self.floats.clone(),
            strings: self.strings.clone(),
            generation: self.generation,
        }
    }

    // ========== Reads ==========

    /// Int stored at `key`, or `default` when absent or stored as another type
    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.lookup::<i32>(key).copied().unwrap_or(default)
    }

    /// Float stored at `key`, or `default` when absent or stored as another type
    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.lookup::<f32>(key).copied().unwrap_or(default)
    }

    /// String stored at `key`, or `default` when absent or stored as another type
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.lookup::<String>(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Value stored at `key` in whichever space holds it
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        if let Some(v) = self.lookup::<i32>(key) {
            return Some(SettingValue::Int(*v));
        }
        if let Some(v) = self.lookup::<f32>(key) {
            return Some(SettingValue::Float(*v));
        }
        self.lookup::<String>(key)
            .map(|v| SettingValue::String(v.clone()))
    }

    /// Whether `key` exists in any type space
    pub fn has_key(&self, key: &str) -> bool {
        match self.lookup_maps() {
            Some(maps) => maps.contains(key),
            None => {
                self.ints.iter().any(|e| e.key == key)
                    || self.floats.iter().any(|e| e.key == key)
                    || self.strings.iter().any(|e| e.key == key)
            }
        }
    }

    /// Type space currently holding `key`
    pub fn value_type_of(&self, key: &str) -> Option<ValueType> {
        self.get(key).map(|v| v.value_type())
    }

    // ========== Writes ==========

    /// Store an int. Returns `false` when the key already held this value.
    pub fn set_int(&mut self, key: &str, value: i32) -> bool {
        self.set_typed(key, value)
    }

    /// Store a float. Returns `false` when the key already held a value
    /// within [`FLOAT_TOLERANCE`](prefs_core::FLOAT_TOLERANCE).
    pub fn set_float(&mut self, key: &str, value: f32) -> bool {
        self.set_typed(key, value)
    }

    /// Store a string. Returns `false` when the key already held this value.
    pub fn set_string(&mut self, key: &str, value: impl Into<String>) -> bool {
        self.set_typed(key, value.into())
    }

    /// Store a value in the space matching its variant
    pub fn set(&mut self, key: &str, value: SettingValue) -> bool {
        match value {
            SettingValue::Int(v) => self.set_typed(key, v),
            SettingValue::Float(v) => self.set_typed(key, v),
            SettingValue::String(v) => self.set_typed(key, v),
        }
    }

    /// Remove `key` from every type space
    ///
    /// Marks the cache dirty only when something was actually removed.
    pub fn delete_key(&mut self, key: &str) -> bool {
        let removed = self.remove_everywhere(key);
        if removed {
            self.mark_dirty();
        }
        removed
    }

    /// Remove every entry. Always marks the cache dirty.
    pub fn delete_all(&mut self) {
        if let Some(maps) = self.lookup.get_mut() {
            maps.clear();
        }
        self.ints.clear();
        self.floats.clear();
        self.strings.clear();
        self.mark_dirty();
    }

    // ========== Dirty tracking ==========

    /// Whether any effective mutation happened since the last flush
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mutation counter, bumped by every effective write
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Clear the dirty flag without touching data
    ///
    /// Only call this after a confirmed successful write. Calling it otherwise
    /// leaves unsaved changes marked clean; nothing detects that.
    pub fn flush(&mut self) {
        self.dirty = false;
    }

    /// Clear the dirty flag if nothing changed since `generation`
    ///
    /// `generation` is the value recorded in the snapshot that was written.
    /// Returns `false`, leaving the cache dirty, when a later mutation exists.
    /// The same hazard as [`flush`](Self::flush) applies.
    pub fn flush_through(&mut self, generation: u64) -> bool {
        if self.generation == generation {
            self.dirty = false;
            true
        } else {
            false
        }
    }

    // ========== Lookup mode ==========

    /// Turn on fast-lookup mode; maps are built on next access
    pub fn enable_lookup_cache(&mut self) {
        self.use_lookup = true;
    }

    /// Turn off fast-lookup mode and return the maps to the pool
    pub fn disable_lookup_cache(&mut self) {
        self.use_lookup = false;
        if let Some(maps) = self.lookup.take() {
            LookupPool::global().release(maps);
        }
    }

    /// Whether fast-lookup mode is on
    pub fn is_lookup_enabled(&self) -> bool {
        self.use_lookup
    }

    /// Whether the lookup maps currently exist
    pub fn is_lookup_built(&self) -> bool {
        self.lookup.get().is_some()
    }

    // ========== Store version ==========

    /// Version stamp carried by this cache
    pub fn store_version(&self) -> StoreVersion {
        self.store_version
    }

    /// Newest version stamp this build knows
    pub fn latest_store_version(&self) -> StoreVersion {
        LATEST_STORE_VERSION
    }

    /// Raise an older stamp to the latest store version
    ///
    /// No data is migrated. A stamp written by a newer build is kept. Marks
    /// dirty only if the stamp changed.
    pub fn update_store_version(&mut self) {
        if self.store_version < LATEST_STORE_VERSION {
            self.store_version = LATEST_STORE_VERSION;
            self.mark_dirty();
        }
    }

    // ========== Introspection ==========

    /// Int entries in insertion order
    pub fn int_entries(&self) -> &[IntEntry] {
        &self.ints
    }

    /// Float entries in insertion order
    pub fn float_entries(&self) -> &[FloatEntry] {
        &self.floats
    }

    /// String entries in insertion order
    pub fn string_entries(&self) -> &[StringEntry] {
        &self.strings
    }

    /// Total number of keys
    pub fn len(&self) -> usize {
        self.ints.len() + self.floats.len() + self.strings.len()
    }

    /// Whether the cache holds no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========== Internals ==========

    fn lookup_maps(&self) -> Option<&LookupMaps> {
        if !self.use_lookup {
            return None;
        }
        Some(self.lookup.get_or_init(|| {
            let mut maps = LookupPool::global().acquire();
            maps.populate(&self.ints, &self.floats, &self.strings);
            debug!(keys = maps.len(), "Built settings lookup maps");
            maps
        }))
    }

    fn lookup<T: TypeSpace>(&self, key: &str) -> Option<&T> {
        match self.lookup_maps() {
            Some(maps) => T::map(maps).get(key),
            None => T::entries(self)
                .iter()
                .find(|e| e.key == key)
                .map(|e| &e.value),
        }
    }

    fn set_typed<T: TypeSpace>(&mut self, key: &str, value: T) -> bool {
        let unchanged = self
            .lookup::<T>(key)
            .map_or(false, |current| T::unchanged(current, &value));
        if unchanged {
            return false;
        }

        self.remove_everywhere(key);
        if let Some(maps) = self.lookup.get_mut() {
            T::map_mut(maps).insert(key.to_string(), value.clone());
        }
        T::entries_mut(self).push(Entry::new(key, value));
        self.mark_dirty();
        true
    }

    fn remove_everywhere(&mut self, key: &str) -> bool {
        let mut removed = false;
        if let Some(maps) = self.lookup.get_mut() {
            removed |= maps.remove(key);
        }
        removed |= remove_key(&mut self.ints, key);
        removed |= remove_key(&mut self.floats, key);
        removed |= remove_key(&mut self.strings, key);
        removed
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.generation = self.generation.wrapping_add(1);
    }
}

impl Drop for SettingsCache {
    fn drop(&mut self) {
        if let Some(maps) = self.lookup.take() {
            LookupPool::global().release(maps);
        }
    }
}

fn remove_key<T>(entries: &mut Vec<Entry<T>>, key: &str) -> bool {
    let before = entries.len();
    entries.retain(|e| e.key != key);
    entries.len() != before
}

/// Field selection for one type space
trait TypeSpace: Clone {
    fn entries(cache: &SettingsCache) -> &[Entry<Self>];
    fn entries_mut(cache: &mut SettingsCache) -> &mut Vec<Entry<Self>>;
    fn map(maps: &LookupMaps) -> &FxHashMap<String, Self>;
    fn map_mut(maps: &mut LookupMaps) -> &mut FxHashMap<String, Self>;
    fn unchanged(current: &Self, new: &Self) -> bool;
}

impl TypeSpace for i32 {
    fn entries(cache: &SettingsCache) -> &[Entry<Self>] {
        &cache.ints
    }
    fn entries_mut(cache: &mut SettingsCache) -> &mut Vec<Entry<Self>> {
        &mut cache.ints
    }
    fn map(maps: &LookupMaps) -> &FxHashMap<String, Self> {
        &maps.ints
    }
    fn map_mut(maps: &mut LookupMaps) -> &mut FxHashMap<String, Self> {
        &mut maps.ints
    }
    fn unchanged(current: &Self, new: &Self) -> bool {
        current == new
    }
}

impl TypeSpace for f32 {
    fn entries(cache: &SettingsCache) -> &[Entry<Self>] {
        &cache.floats
    }
    fn entries_mut(cache: &mut SettingsCache) -> &mut Vec<Entry<Self>> {
        &mut cache.floats
    }
    fn map(maps: &LookupMaps) -> &FxHashMap<String, Self> {
        &maps.floats
    }
    fn map_mut(maps: &mut LookupMaps) -> &mut FxHashMap<String, Self> {
        &mut maps.floats
    }
    fn unchanged(current: &Self, new: &Self) -> bool {
        floats_equivalent(*current, *new)
    }
}

impl TypeSpace for String {
    fn entries(cache: &SettingsCache) -> &[Entry<Self>] {
        &cache.strings
    }
    fn entries_mut(cache: &mut SettingsCache) -> &mut Vec<Entry<Self>> {
        &mut cache.strings
    }
    fn map(maps: &LookupMaps) -> &FxHashMap<String, Self> {
        &maps.strings
    }
    fn map_mut(maps: &mut LookupMaps) -> &mut FxHashMap<String, Self> {
        &mut maps.strings
    }
    fn unchanged(current: &Self, new: &Self) -> bool {
        current == new
    }
}
