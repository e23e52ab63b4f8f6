//! Settings session
//!
//! `Settings` is the handle applications hold. It owns one cache, one save
//! coordinator and one auto-save timer, and replaces a process-wide singleton
//! with an explicit value the host creates at startup and closes at shutdown.
//!
//! # Lifecycle
//!
//! ```text
//! open(dir, config, backend)
//!   ├── backend.load()  → Some(snapshot) → cache from snapshot
//!   │                   → None           → empty cache, saved immediately
//!   ├── enable lookup maps (config.use_lookup_cache)
//!   └── ready
//!
//! tick(elapsed)  → FlushScheduler → save()
//! on_pause(true) → save()
//! close()        → awaited save, lookup maps back to the pool
//! ```
//!
//! # Example
//!
//! ```ignore
//! let settings = Settings::open_file("./settings").await?;
//! settings.set_int("volume", 7);
//! settings.save_async().await?;
//! settings.close().await?;
//! ```

use crate::config::SettingsConfig;
use crate::coordinator::{SaveCoordinator, SaveHandle, SaveResult, SaveStats};
use crate::scheduler::FlushScheduler;
use parking_lot::Mutex;
use prefs_core::{Result, SettingValue, ValueType};
use prefs_durability::{FileBackend, MemoryBackend, SettingsPaths, StorageBackend};
use prefs_storage::{SettingsCache, SharedCache};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Open settings store
pub struct Settings {
    cache: SharedCache,
    coordinator: SaveCoordinator,
    scheduler: Mutex<FlushScheduler>,
    config: SettingsConfig,
    timer_paused: AtomicBool,
    closed: AtomicBool,
}

impl Settings {
    /// Open the store in `dir` through `backend`
    ///
    /// Must be called from within a tokio runtime; later saves are spawned on
    /// that runtime even when requested from other threads.
    ///
    /// # Errors
    ///
    /// Fails if the config is invalid, an existing store cannot be read, or
    /// the initial save of a new store fails.
    pub async fn open(
        dir: impl AsRef<Path>,
        config: SettingsConfig,
        backend: Arc<dyn StorageBackend>,
    ) -> Result<Self> {
        config.validate()?;
        let paths = SettingsPaths::with_file_name(dir, config.file_name.clone());
        let location = paths.settings_file();

        let mut cache = match backend.load(&location).await? {
            Some(snapshot) => {
                info!(
                    path = %location.display(),
                    entries = snapshot.len(),
                    backend = backend.backend_name(),
                    "Opened settings"
                );
                SettingsCache::from_snapshot(snapshot)
            }
            None => {
                let cache = SettingsCache::new();
                backend.save(&cache.snapshot(), &location).await?;
                info!(
                    path = %location.display(),
                    backend = backend.backend_name(),
                    "Created settings"
                );
                cache
            }
        };

        if config.use_lookup_cache {
            cache.enable_lookup_cache();
        }

        let cache = SharedCache::new(cache);
        let coordinator =
            SaveCoordinator::new(cache.clone(), backend, location, Handle::current());
        let scheduler = match config.save_interval() {
            Some(interval) => FlushScheduler::new(interval),
            None => FlushScheduler::disabled(),
        };

        Ok(Self {
            cache,
            coordinator,
            scheduler: Mutex::new(scheduler),
            config,
            timer_paused: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Open a file-backed store in `dir`, reading or creating `prefs.toml`
    pub async fn open_file(dir: impl AsRef<Path>) -> Result<Self> {
        let paths = SettingsPaths::from_root(dir.as_ref());
        paths.create_directories()?;

        let config_path = paths.config_file();
        SettingsConfig::write_default_if_missing(&config_path)?;
        let config = SettingsConfig::from_file(&config_path)?;

        let data_file = SettingsPaths::with_file_name(dir.as_ref(), config.file_name.clone())
            .settings_file();
        if FileBackend::cleanup_temp_file(&data_file)? {
            debug!(path = %data_file.display(), "Previous save was interrupted");
        }

        let backend = FileBackend::new().with_sync(config.sync_on_save);
        Self::open(dir, config, Arc::new(backend)).await
    }

    /// Open an ephemeral store kept in memory
    pub async fn in_memory() -> Result<Self> {
        Self::in_memory_with_config(SettingsConfig::default()).await
    }

    /// Open an ephemeral store with a custom config
    pub async fn in_memory_with_config(config: SettingsConfig) -> Result<Self> {
        Self::open("memory", config, Arc::new(MemoryBackend::new())).await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Int at `key`, or `default`
    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.cache.get_int(key, default)
    }

    /// Float at `key`, or `default`
    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.cache.get_float(key, default)
    }

    /// String at `key`, or `default`
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.cache.get_string(key, default)
    }

    /// Value at `key` in whichever type space holds it
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.cache.get(key)
    }

    /// Whether `key` exists in any type space
    pub fn has_key(&self, key: &str) -> bool {
        self.cache.has_key(key)
    }

    /// Type space holding `key`
    pub fn value_type_of(&self, key: &str) -> Option<ValueType> {
        self.cache.value_type_of(key)
    }

    /// Number of stored settings
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no settings are stored
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Store an int; returns whether anything changed
    pub fn set_int(&self, key: &str, value: i32) -> bool {
        self.cache.set_int(key, value)
    }

    /// Store a float; returns whether anything changed
    pub fn set_float(&self, key: &str, value: f32) -> bool {
        self.cache.set_float(key, value)
    }

    /// Store a string; returns whether anything changed
    pub fn set_string(&self, key: &str, value: impl Into<String>) -> bool {
        self.cache.set_string(key, value)
    }

    /// Store a value in its own type space; returns whether anything changed
    pub fn set(&self, key: &str, value: SettingValue) -> bool {
        self.cache.set(key, value)
    }

    /// Remove `key` from every type space; returns whether it existed
    pub fn delete_key(&self, key: &str) -> bool {
        self.cache.delete_key(key)
    }

    /// Remove every setting
    pub fn delete_all(&self) {
        self.cache.delete_all()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Whether there are unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.cache.is_dirty()
    }

    /// Fire-and-forget save
    pub fn save(&self) {
        self.coordinator.save();
    }

    /// Save and wait for the outcome
    pub async fn save_async(&self) -> SaveResult {
        self.coordinator.save_async().await
    }

    /// Start or join a save and return its handle
    pub fn request_save(&self) -> SaveHandle {
        self.coordinator.request_save()
    }

    /// Save counters
    pub fn save_stats(&self) -> SaveStats {
        self.coordinator.stats()
    }

    /// Where the store is persisted
    pub fn location(&self) -> PathBuf {
        self.coordinator.location().to_path_buf()
    }

    // ========================================================================
    // Host integration
    // ========================================================================

    /// Host was suspended or resumed; suspension triggers a save
    pub fn on_pause(&self, paused: bool) {
        if paused {
            debug!("Host paused, saving settings");
            self.save();
        }
    }

    /// Stop or resume counting auto-save time (time scale zero)
    pub fn set_timer_paused(&self, paused: bool) {
        self.timer_paused.store(paused, Ordering::Relaxed);
    }

    /// Whether auto-save time is currently not counted
    pub fn is_timer_paused(&self) -> bool {
        self.timer_paused.load(Ordering::Relaxed)
    }

    /// Advance the auto-save timer; returns whether a save was requested
    pub fn tick(&self, elapsed: Duration) -> bool {
        let due = self
            .scheduler
            .lock()
            .tick(elapsed, self.is_dirty(), self.is_timer_paused());
        if due {
            debug!("Auto-save interval elapsed");
            self.save();
        }
        due
    }

    /// Whether the auto-save timer can fire
    pub fn autosave_enabled(&self) -> bool {
        self.scheduler.lock().is_enabled()
    }

    /// Final save, then release lookup maps
    ///
    /// `Ok` means every mutation made before the call reached storage, even
    /// when a save was already running. The store remains usable in memory afterwards, but the auto-save task
    /// stops.
    pub async fn close(&self) -> SaveResult {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let outcome = self.coordinator.save_async().await;
        if let Err(e) = &outcome {
            warn!(error = %e, "Final settings save failed");
        }
        self.cache.disable_lookup_cache();
        info!(path = %self.coordinator.location().display(), "Closed settings");
        outcome
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Active configuration
    pub fn config(&self) -> &SettingsConfig {
        &self.config
    }

    /// Underlying shared cache
    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("coordinator", &self.coordinator)
            .field("entries", &self.len())
            .field("dirty", &self.is_dirty())
            .field("closed", &self.is_closed())
            .finish()
    }
}
