//! Crash-safe file backend
//!
//! Uses the write-fsync-rename pattern for every save.
//!
//! # Crash Safety
//!
//! 1. Write the full image to a temporary sibling (`.settings.prefs.tmp`)
//! 2. fsync the temporary file
//! 3. Atomic rename over the final path
//! 4. fsync the parent directory (unix only)
//!
//! Either the old file or the complete new file is visible after a crash;
//! never a partial one. Steps 2 and 4 are skipped when `sync` is off.
//!
//! File I/O runs on tokio's blocking pool so saves never stall the runtime.

use async_trait::async_trait;
use prefs_core::{Error, Result};
use prefs_storage::CacheSnapshot;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::backend::StorageBackend;
use crate::format;
use crate::paths::temp_path_for;

/// Single-file settings backend
#[derive(Debug, Clone)]
pub struct FileBackend {
    sync: bool,
}

impl Default for FileBackend {
    fn default() -> Self {
        Self { sync: true }
    }
}

impl FileBackend {
    /// Backend that fsyncs every save
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable fsync on save
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Whether saves are fsynced
    pub fn syncs(&self) -> bool {
        self.sync
    }

    /// Remove a temporary file left behind by an interrupted save
    ///
    /// Returns whether a file was removed.
    pub fn cleanup_temp_file(location: &Path) -> io::Result<bool> {
        let temp = temp_path_for(location);
        match fs::remove_file(&temp) {
            Ok(()) => {
                warn!(path = %temp.display(), "Removed stale settings temp file");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn load(&self, location: &Path) -> Result<Option<CacheSnapshot>> {
        let path = location.to_path_buf();
        let bytes = tokio::task::spawn_blocking(move || read_if_exists(&path))
            .await
            .map_err(|e| Error::backend(format!("settings read task failed: {}", e)))??;

        match bytes {
            Some(bytes) => {
                let snapshot = format::decode(&bytes)?;
                debug!(path = %location.display(), entries = snapshot.len(), "Loaded settings");
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &CacheSnapshot, location: &Path) -> Result<()> {
        let bytes = format::encode(snapshot)?;
        let path = location.to_path_buf();
        let sync = self.sync;
        let len = bytes.len();

        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes, sync))
            .await
            .map_err(|e| Error::backend(format!("settings write task failed: {}", e)))??;

        debug!(path = %location.display(), bytes = len, "Wrote settings");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

fn read_if_exists(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn write_atomic(path: &Path, bytes: &[u8], sync: bool) -> io::Result<()> {
    let parent = parent_dir(path);
    fs::create_dir_all(&parent)?;

    // Step 1: Write to temporary file
    let temp = temp_path_for(path);
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&temp)?;
    file.write_all(bytes)?;

    // Step 2: fsync the file
    if sync {
        file.sync_all()?;
    }
    drop(file);

    // Step 3: Atomic rename
    fs::rename(&temp, path)?;

    // Step 4: fsync parent directory
    #[cfg(unix)]
    if sync {
        fs::File::open(&parent)?.sync_all()?;
    }
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
