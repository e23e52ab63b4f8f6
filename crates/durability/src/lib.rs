//! Durability layer for prefsdb
//!
//! This crate implements the storage backend contract:
//! - StorageBackend: async load/save of cache snapshots
//! - FileBackend: crash-safe single-file persistence
//! - MemoryBackend: in-memory persistence for tests and ephemeral sessions
//! - format: framed, checksummed MessagePack file format
//! - paths: settings directory layout

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod file;
pub mod format;
pub mod paths;

pub use backend::{MemoryBackend, StorageBackend};
pub use file::FileBackend;
pub use format::{SettingsHeader, SETTINGS_FORMAT_VERSION, SETTINGS_MAGIC};
pub use paths::{SettingsPaths, CONFIG_FILE_NAME, DEFAULT_SETTINGS_FILE};
