//! In-memory settings storage for prefsdb
//!
//! This crate provides the typed key/value cache that every other layer
//! builds on:
//! - SettingsCache: three type spaces, ordered sequences plus optional lookup maps
//! - LookupMaps / LookupPool: the fast-lookup accelerator and its reuse pool
//! - CacheSnapshot: the persisted representation
//! - SharedCache: thread-safe handle used by the engine
//!
//! Nothing here performs I/O. Persistence lives in `prefs-durability`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod lookup;
pub mod pool;
pub mod shared;
pub mod snapshot;

pub use cache::SettingsCache;
pub use lookup::LookupMaps;
pub use pool::{LookupPool, MAX_POOL_SIZE};
pub use shared::SharedCache;
pub use snapshot::CacheSnapshot;
