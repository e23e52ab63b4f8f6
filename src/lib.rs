//! prefsdb - embedded key/value settings store
//!
//! prefsdb keeps application settings in three type spaces (int, float,
//! string) behind a single key namespace, with optional O(1) lookup maps and
//! coalesced asynchronous saves.
//!
//! # Quick Start
//!
//! ```ignore
//! use prefsdb::Settings;
//!
//! let settings = Settings::open_file("./settings").await?;
//! settings.set_int("volume", 7);
//! assert_eq!(settings.get_int("volume", 0), 7);
//!
//! // Two requests while a save is running share one write
//! let a = settings.request_save();
//! let b = settings.request_save();
//! a.await?;
//! b.await?;
//!
//! settings.close().await?;
//! ```
//!
//! # Architecture
//!
//! - `prefs-core`: values, entries, errors
//! - `prefs-storage`: the in-memory cache and its lookup maps
//! - `prefs-durability`: storage backends and the file format
//! - `prefs-engine`: sessions, save coordination, auto-save, primitives

pub use prefs_core::{Error, Result, SettingValue, ValueType, FLOAT_TOLERANCE};
pub use prefs_durability::{FileBackend, MemoryBackend, StorageBackend};
pub use prefs_engine::*;
pub use prefs_storage::{CacheSnapshot, SettingsCache, SharedCache};
