//! Thread-safe cache handle
//!
//! `SharedCache` puts a [`SettingsCache`] behind an `Arc<RwLock<_>>` so the
//! session, the persistence controller and any number of caller threads can
//! hold it at once.
//!
//! # Locking
//!
//! - Reads take the read lock. Lazy lookup-map construction happens inside a
//!   `OnceCell`, so concurrent readers build the maps exactly once.
//! - Mutations take the write lock for the whole map-and-sequence update.
//! - `snapshot()` copies the sequences and the generation under one read lock.
//!
//! No lock is ever held across an `.await`.

use crate::cache::SettingsCache;
use crate::snapshot::CacheSnapshot;
use parking_lot::RwLock;
use prefs_core::{SettingValue, StoreVersion, ValueType};
use std::sync::Arc;

/// Cloneable, thread-safe handle to one settings cache
#[derive(Debug, Clone, Default)]
pub struct SharedCache {
    inner: Arc<RwLock<SettingsCache>>,
}

impl SharedCache {
    /// Wrap an existing cache
    pub fn new(cache: SettingsCache) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cache)),
        }
    }

    /// Run `f` with shared access to the cache
    pub fn read<R>(&self, f: impl FnOnce(&SettingsCache) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` with exclusive access to the cache
    pub fn write<R>(&self, f: impl FnOnce(&mut SettingsCache) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// See [`SettingsCache::get_int`]
    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.inner.read().get_int(key, default)
    }

    /// See [`SettingsCache::get_float`]
    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.inner.read().get_float(key, default)
    }

    /// See [`SettingsCache::get_string`]
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.inner.read().get_string(key, default)
    }

    /// See [`SettingsCache::get`]
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.inner.read().get(key)
    }

    /// See [`SettingsCache::has_key`]
    pub fn has_key(&self, key: &str) -> bool {
        self.inner.read().has_key(key)
    }

    /// See [`SettingsCache::value_type_of`]
    pub fn value_type_of(&self, key: &str) -> Option<ValueType> {
        self.inner.read().value_type_of(key)
    }

    /// See [`SettingsCache::set_int`]
    pub fn set_int(&self, key: &str, value: i32) -> bool {
        self.inner.write().set_int(key, value)
    }

    /// See [`SettingsCache::set_float`]
    pub fn set_float(&self, key: &str, value: f32) -> bool {
        self.inner.write().set_float(key, value)
    }

    /// See [`SettingsCache::set_string`]
    pub fn set_string(&self, key: &str, value: impl Into<String>) -> bool {
        self.inner.write().set_string(key, value)
    }

    /// See [`SettingsCache::set`]
    pub fn set(&self, key: &str, value: SettingValue) -> bool {
        self.inner.write().set(key, value)
    }

    /// See [`SettingsCache::delete_key`]
    pub fn delete_key(&self, key: &str) -> bool {
        self.inner.write().delete_key(key)
    }

    /// See [`SettingsCache::delete_all`]
    pub fn delete_all(&self) {
        self.inner.write().delete_all();
    }

    /// See [`SettingsCache::is_dirty`]
    pub fn is_dirty(&self) -> bool {
        self.inner.read().is_dirty()
    }

    /// See [`SettingsCache::generation`]
    pub fn generation(&self) -> u64 {
        self.inner.read().generation()
    }

    /// See [`SettingsCache::flush`]
    pub fn flush(&self) {
        self.inner.write().flush();
    }

    /// See [`SettingsCache::flush_through`]
    pub fn flush_through(&self, generation: u64) -> bool {
        self.inner.write().flush_through(generation)
    }

    /// See [`SettingsCache::snapshot`]
    pub fn snapshot(&self) -> CacheSnapshot {
        self.inner.read().snapshot()
    }

    /// See [`SettingsCache::enable_lookup_cache`]
    pub fn enable_lookup_cache(&self) {
        self.inner.write().enable_lookup_cache();
    }

    /// See [`SettingsCache::disable_lookup_cache`]
    pub fn disable_lookup_cache(&self) {
        self.inner.write().disable_lookup_cache();
    }

    /// See [`SettingsCache::store_version`]
    pub fn store_version(&self) -> StoreVersion {
        self.inner.read().store_version()
    }

    /// See [`SettingsCache::update_store_version`]
    pub fn update_store_version(&self) {
        self.inner.write().update_store_version();
    }

    /// See [`SettingsCache::len`]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// See [`SettingsCache::is_empty`]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl From<SettingsCache> for SharedCache {
    fn from(cache: SettingsCache) -> Self {
        Self::new(cache)
    }
}
