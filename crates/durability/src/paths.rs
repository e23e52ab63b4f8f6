//! Settings directory structure
//!
//! A settings store is a directory holding the config and the data file:
//!
//! ```text
//! settings/
//! ├── prefs.toml              # Configuration (see prefs-engine)
//! ├── settings.prefs          # Persisted cache
//! └── .settings.prefs.tmp     # Present only while a save is in progress
//! ```

use std::path::{Path, PathBuf};

/// Default name of the persisted cache file
pub const DEFAULT_SETTINGS_FILE: &str = "settings.prefs";

/// Name of the config file inside the settings directory
pub const CONFIG_FILE_NAME: &str = "prefs.toml";

/// Paths within a settings directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsPaths {
    root: PathBuf,
    file_name: String,
}

impl SettingsPaths {
    /// Paths for `root` using the default settings file name
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        Self::with_file_name(root, DEFAULT_SETTINGS_FILE)
    }

    /// Paths for `root` using a custom settings file name
    pub fn with_file_name(root: impl AsRef<Path>, file_name: impl Into<String>) -> Self {
        SettingsPaths {
            root: root.as_ref().to_path_buf(),
            file_name: file_name.into(),
        }
    }

    /// Root settings directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persisted cache file
    pub fn settings_file(&self) -> PathBuf {
        self.root.join(&self.file_name)
    }

    /// Config file
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Whether a persisted cache exists
    pub fn exists(&self) -> bool {
        self.settings_file().exists()
    }

    /// Create the root directory if missing
    pub fn create_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }
}

/// Temporary sibling used while writing `target`
///
/// `dir/settings.prefs` becomes `dir/.settings.prefs.tmp`.
pub fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.tmp", name))
}
