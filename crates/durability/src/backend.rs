//! Storage backend abstraction
//!
//! The `StorageBackend` trait is the only seam between the in-memory cache and
//! durable storage. Implementations:
//!
//! - **FileBackend**: crash-safe single-file persistence (see [`crate::file`])
//! - **MemoryBackend**: keeps encoded images in memory, for tests and
//!   ephemeral sessions
//!
//! # Contract
//!
//! - `load` returns `Ok(None)` when nothing was ever saved at the location
//!   (first run), and an error when something exists but cannot be read.
//! - `save` persists the three ordered sequences and the version stamp of the
//!   snapshot. Lookup maps and dirty state are never persisted.
//! - Neither call touches the live cache; callers hand over a snapshot.

use async_trait::async_trait;
use parking_lot::Mutex;
use prefs_core::Result;
use prefs_storage::CacheSnapshot;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::format;

/// Durable storage for settings snapshots
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one backend instance is shared by
/// the session and every in-flight save.
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Read the snapshot stored at `location`, or `None` on first run
    async fn load(&self, location: &Path) -> Result<Option<CacheSnapshot>>;

    /// Persist `snapshot` at `location`
    async fn save(&self, snapshot: &CacheSnapshot, location: &Path) -> Result<()>;

    /// Human-readable backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// In-memory backend
///
/// Stores the same framed bytes the file backend would write, so a load after
/// a save exercises the real format.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    images: Mutex<HashMap<PathBuf, Vec<u8>>>,
    saves: AtomicUsize,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves performed
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Whether anything was saved at `location`
    pub fn contains(&self, location: &Path) -> bool {
        self.images.lock().contains_key(location)
    }

    /// Raw stored image at `location`
    pub fn image(&self, location: &Path) -> Option<Vec<u8>> {
        self.images.lock().get(location).cloned()
    }

    /// Replace the stored image at `location`
    pub fn put_image(&self, location: &Path, bytes: Vec<u8>) {
        self.images.lock().insert(location.to_path_buf(), bytes);
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load(&self, location: &Path) -> Result<Option<CacheSnapshot>> {
        let image = self.images.lock().get(location).cloned();
        image.map(|bytes| format::decode(&bytes)).transpose()
    }

    async fn save(&self, snapshot: &CacheSnapshot, location: &Path) -> Result<()> {
        let bytes = format::encode(snapshot)?;
        self.images.lock().insert(location.to_path_buf(), bytes);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
