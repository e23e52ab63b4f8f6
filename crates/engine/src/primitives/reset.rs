//! Reset groups
//!
//! A `ResetGroup` names a set of settings that go back to their defaults
//! together, e.g. "restore audio defaults".

use crate::primitives::setting::Setting;
use std::sync::Arc;
use tracing::{debug, info};

/// Settings reset together
#[derive(Debug, Default, Clone)]
pub struct ResetGroup {
    settings: Vec<Arc<Setting>>,
}

impl ResetGroup {
    /// Empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a setting, builder style
    pub fn with(mut self, setting: Arc<Setting>) -> Self {
        self.settings.push(setting);
        self
    }

    /// Add a setting
    pub fn push(&mut self, setting: Arc<Setting>) {
        self.settings.push(setting);
    }

    /// Number of settings in the group
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// Whether the group is empty
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Delete every stored value in the group
    ///
    /// Returns how many settings had a stored value to delete.
    pub fn reset(&self) -> usize {
        info!(settings = self.settings.len(), "Resetting settings");
        let mut reset = 0;
        for setting in &self.settings {
            debug!(setting = %setting.name(), "Resetting setting");
            if setting.delete_value() {
                reset += 1;
            }
        }
        reset
    }
}

impl FromIterator<Arc<Setting>> for ResetGroup {
    fn from_iter<I: IntoIterator<Item = Arc<Setting>>>(iter: I) -> Self {
        Self {
            settings: iter.into_iter().collect(),
        }
    }
}
