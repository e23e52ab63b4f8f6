//! Settings configuration via `prefs.toml`
//!
//! A settings directory carries a `prefs.toml` next to the data file. On first
//! open a commented default is written. To change behavior, edit the file and
//! reopen.

use prefs_core::{Error, Result};
use prefs_durability::DEFAULT_SETTINGS_FILE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default auto-save interval in milliseconds
pub const DEFAULT_SAVE_INTERVAL_MS: u64 = 10_000;

/// Settings configuration loaded from `prefs.toml`.
///
/// # Example
///
/// ```toml
/// save_interval_ms = 10000
/// use_lookup_cache = true
/// file_name = "settings.prefs"
/// sync_on_save = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Auto-save interval in milliseconds. `0` disables auto-save.
    #[serde(default = "default_save_interval_ms")]
    pub save_interval_ms: u64,
    /// Build hash lookup maps for O(1) reads.
    #[serde(default = "default_true")]
    pub use_lookup_cache: bool,
    /// Name of the data file inside the settings directory.
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// fsync the data file and directory on every save.
    #[serde(default = "default_true")]
    pub sync_on_save: bool,
}

fn default_save_interval_ms() -> u64 {
    DEFAULT_SAVE_INTERVAL_MS
}

fn default_true() -> bool {
    true
}

fn default_file_name() -> String {
    DEFAULT_SETTINGS_FILE.to_string()
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            save_interval_ms: default_save_interval_ms(),
            use_lookup_cache: true,
            file_name: default_file_name(),
            sync_on_save: true,
        }
    }
}

impl SettingsConfig {
    /// Set the auto-save interval
    pub fn with_save_interval(mut self, interval: Duration) -> Self {
        self.save_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Enable or disable lookup maps
    pub fn with_lookup_cache(mut self, enabled: bool) -> Self {
        self.use_lookup_cache = enabled;
        self
    }

    /// Set the data file name
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Enable or disable fsync on save
    pub fn with_sync_on_save(mut self, sync: bool) -> Self {
        self.sync_on_save = sync;
        self
    }

    /// Auto-save interval, or `None` when auto-save is disabled
    pub fn save_interval(&self) -> Option<Duration> {
        match self.save_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Check that the config describes a usable store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file name is empty or contains a path separator.
    pub fn validate(&self) -> Result<()> {
        let name = self.file_name.as_str();
        if name.is_empty() || name == "." || name == ".." {
            return Err(Error::invalid_config(format!(
                "Invalid file_name '{}' in prefs.toml. Expected a plain file name.",
                name
            )));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(Error::invalid_config(format!(
                "Invalid file_name '{}' in prefs.toml. Path separators are not allowed.",
                name
            )));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Settings store configuration
#
# Auto-save interval in milliseconds (default: 10000).
# Dirty settings are written once this much active time has passed.
# Set to 0 to disable auto-save; explicit saves still work.
save_interval_ms = 10000

# Build hash lookup maps for O(1) reads (default: true).
# Turn off for very small stores to save memory.
use_lookup_cache = true

# Name of the data file inside this directory (default: "settings.prefs").
file_name = "settings.prefs"

# fsync on every save (default: true).
# Turning this off is faster but may lose the last save on power loss.
sync_on_save = true
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: SettingsConfig = toml::from_str(&content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::invalid_config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::invalid_config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
