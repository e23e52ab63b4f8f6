//! Process-wide pool of lookup maps
//!
//! Disabling fast-lookup mode (or dropping a cache) hands its maps back here
//! instead of freeing them. The next cache that enables lookup mode picks them
//! up again with their bucket capacity intact.
//!
//! # Key Optimization
//!
//! HashMap `clear()` preserves allocated capacity, so a toggled-off and
//! toggled-on lookup cache rebuilds without reallocating buckets.
//!
//! The pool is shared by every thread in the process and guarded by a mutex.

use crate::lookup::LookupMaps;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// Maximum map sets kept per pool
///
/// A process normally holds one settings session, so a handful of spares
/// covers toggling and short-lived caches in tests.
pub const MAX_POOL_SIZE: usize = 8;

static GLOBAL_POOL: Lazy<LookupPool> = Lazy::new(LookupPool::new);

/// Pool of cleared [`LookupMaps`] ready for reuse
///
/// # Example
///
/// ```ignore
/// let maps = LookupPool::global().acquire();
/// // ... fill and use the maps ...
/// LookupPool::global().release(maps);
/// ```
#[derive(Debug, Default)]
pub struct LookupPool {
    maps: Mutex<Vec<LookupMaps>>,
}

impl LookupPool {
    /// Create an empty, standalone pool
    pub fn new() -> Self {
        Self {
            maps: Mutex::new(Vec::with_capacity(MAX_POOL_SIZE)),
        }
    }

    /// The process-wide pool used by every [`SettingsCache`](crate::SettingsCache)
    pub fn global() -> &'static LookupPool {
        &GLOBAL_POOL
    }

    /// Take a set of empty maps, reusing a pooled set when one is available.
    pub fn acquire(&self) -> LookupMaps {
        self.maps.lock().pop().unwrap_or_default()
    }

    /// Return maps to the pool
    ///
    /// Maps are cleared before being stored. They are dropped instead when the
    /// pool is already full.
    pub fn release(&self, mut maps: LookupMaps) {
        maps.clear();
        let mut pool = self.maps.lock();
        if pool.len() < MAX_POOL_SIZE {
            pool.push(maps);
        }
    }

    /// Number of map sets currently pooled
    pub fn pool_size(&self) -> usize {
        self.maps.lock().len()
    }

    /// Pre-fill the pool up to `count` map sets (capped at [`MAX_POOL_SIZE`])
    pub fn warmup(&self, count: usize) {
        let count = count.min(MAX_POOL_SIZE);
        let mut pool = self.maps.lock();
        let current = pool.len();
        for _ in current..count {
            pool.push(LookupMaps::default());
        }
    }

    /// Drop every pooled map set
    pub fn clear(&self) {
        self.maps.lock().clear();
    }
}
