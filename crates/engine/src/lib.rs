//! Settings engine for prefsdb
//!
//! This crate orchestrates the lower layers:
//! - Settings: the session handle with open/close
//! - SaveCoordinator: coalescing, at-most-one-in-flight persistence
//! - FlushScheduler: periodic auto-save while dirty
//! - SettingsConfig: `prefs.toml` configuration
//! - Primitives: named settings, reset groups, value conditions
//!
//! The engine is the only component that knows about:
//! - When to save (timer, host pause, explicit request)
//! - Cross-layer coordination (cache + backend)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod primitives;
pub mod scheduler;
pub mod session;

pub use config::{SettingsConfig, DEFAULT_SAVE_INTERVAL_MS};
pub use coordinator::{SaveCoordinator, SaveError, SaveHandle, SaveResult, SaveStats};
pub use primitives::{
    Comparison, ResetGroup, Setting, SettingKind, SettingObservers, SubscriptionId,
    ValueCondition,
};
pub use scheduler::{spawn_autosave, FlushScheduler};
pub use session::Settings;
