//! Named settings
//!
//! A `Setting` binds a key and a typed default to a [`Settings`] session. It
//! is a thin facade: all state lives in the session's cache, so any number of
//! `Setting` values may name the same key.
//!
//! Writes compare against the current value, default included, and return
//! early when nothing would change. Only a write the cache reports as
//! effective is logged (when `log_changes` is on) and fires the matching
//! observers, so concurrent writers of one value notify once.

use crate::primitives::observers::SettingObservers;
use crate::session::Settings;
use prefs_core::value::floats_equivalent;
use prefs_core::{SettingValue, ValueType};
use std::sync::Arc;
use tracing::info;

/// Declared type and default of a named setting
#[derive(Debug, Clone, PartialEq)]
pub enum SettingKind {
    /// Int setting with its default
    Int(i32),
    /// Float setting with its default
    Float(f32),
    /// String setting with its default
    String(String),
}

impl SettingKind {
    /// Type space the setting lives in
    pub fn value_type(&self) -> ValueType {
        match self {
            SettingKind::Int(_) => ValueType::Int,
            SettingKind::Float(_) => ValueType::Float,
            SettingKind::String(_) => ValueType::String,
        }
    }

    /// Default as a tagged value
    pub fn default_value(&self) -> SettingValue {
        match self {
            SettingKind::Int(v) => SettingValue::Int(*v),
            SettingKind::Float(v) => SettingValue::Float(*v),
            SettingKind::String(v) => SettingValue::String(v.clone()),
        }
    }
}

/// A named, typed setting bound to a session
pub struct Setting {
    settings: Arc<Settings>,
    name: String,
    kind: SettingKind,
    log_changes: bool,
    observers: SettingObservers,
}

impl Setting {
    /// Bind `name` with `kind` to `settings`; change logging is on
    pub fn new(settings: Arc<Settings>, name: impl Into<String>, kind: SettingKind) -> Self {
        Self {
            settings,
            name: name.into(),
            kind,
            log_changes: true,
            observers: SettingObservers::new(),
        }
    }

    /// Int setting
    pub fn int(settings: Arc<Settings>, name: impl Into<String>, default: i32) -> Self {
        Self::new(settings, name, SettingKind::Int(default))
    }

    /// Float setting
    pub fn float(settings: Arc<Settings>, name: impl Into<String>, default: f32) -> Self {
        Self::new(settings, name, SettingKind::Float(default))
    }

    /// String setting
    pub fn string(
        settings: Arc<Settings>,
        name: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self::new(settings, name, SettingKind::String(default.into()))
    }

    /// Enable or disable logging of effective writes
    pub fn with_log_changes(mut self, log_changes: bool) -> Self {
        self.log_changes = log_changes;
        self
    }

    /// Key in the cache
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind
    pub fn kind(&self) -> &SettingKind {
        &self.kind
    }

    /// Change callbacks
    pub fn observers(&self) -> &SettingObservers {
        &self.observers
    }

    /// Session this setting reads and writes
    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    fn default_int(&self) -> i32 {
        match self.kind {
            SettingKind::Int(v) => v,
            _ => 0,
        }
    }

    fn default_float(&self) -> f32 {
        match self.kind {
            SettingKind::Float(v) => v,
            _ => 0.0,
        }
    }

    fn default_string(&self) -> &str {
        match &self.kind {
            SettingKind::String(v) => v,
            _ => "",
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Stored int, or the default
    pub fn get_int(&self) -> i32 {
        self.settings.get_int(&self.name, self.default_int())
    }

    /// Stored float, or the default
    pub fn get_float(&self) -> f32 {
        self.settings.get_float(&self.name, self.default_float())
    }

    /// Value as text; int and float settings render their number
    pub fn get_string(&self) -> String {
        match self.kind {
            SettingKind::Int(_) => self.get_int().to_string(),
            SettingKind::Float(_) => self.get_float().to_string(),
            SettingKind::String(_) => self.settings.get_string(&self.name, self.default_string()),
        }
    }

    /// Int value read as a flag; only `1` is true
    pub fn get_bool(&self) -> bool {
        self.get_int() == 1
    }

    /// Value in the setting's own type space
    pub fn get(&self) -> SettingValue {
        match self.kind {
            SettingKind::Int(_) => SettingValue::Int(self.get_int()),
            SettingKind::Float(_) => SettingValue::Float(self.get_float()),
            SettingKind::String(_) => SettingValue::String(self.get_string()),
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Store an int; returns whether anything changed
    pub fn set_int(&self, value: i32) -> bool {
        if self.get_int() == value {
            return false;
        }
        // Another writer may have stored the same value in between
        if !self.settings.set_int(&self.name, value) {
            return false;
        }
        self.log_change(&value);
        self.observers.notify_int(value);
        true
    }

    /// Store a float; returns whether anything changed
    pub fn set_float(&self, value: f32) -> bool {
        if floats_equivalent(self.get_float(), value) {
            return false;
        }
        if !self.settings.set_float(&self.name, value) {
            return false;
        }
        self.log_change(&value);
        self.observers.notify_float(value);
        true
    }

    /// Store a string; returns whether anything changed
    pub fn set_string(&self, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.get_string() == value {
            return false;
        }
        if !self.settings.set_string(&self.name, value.as_str()) {
            return false;
        }
        self.log_change(&value);
        self.observers.notify_string(&value);
        true
    }

    /// Store a flag as `1` or `0`
    pub fn set_bool(&self, value: bool) -> bool {
        self.set_int(i32::from(value))
    }

    /// Store a tagged value through the matching setter
    pub fn set(&self, value: SettingValue) -> bool {
        match value {
            SettingValue::Int(v) => self.set_int(v),
            SettingValue::Float(v) => self.set_float(v),
            SettingValue::String(v) => self.set_string(v),
        }
    }

    /// Copy `other`'s value, read through this setting's kind
    pub fn set_from(&self, other: &Setting) -> bool {
        match self.kind {
            SettingKind::Int(_) => self.set_int(other.get_int()),
            SettingKind::Float(_) => self.set_float(other.get_float()),
            SettingKind::String(_) => self.set_string(other.get_string()),
        }
    }

    /// Remove the stored value so reads fall back to the default
    pub fn delete_value(&self) -> bool {
        self.settings.delete_key(&self.name)
    }

    /// Fire-and-forget save of the whole session
    pub fn save(&self) {
        self.settings.save();
    }

    fn log_change(&self, value: &dyn std::fmt::Display) {
        if self.log_changes {
            info!(setting = %self.name, value = %value, "Setting changed");
        }
    }
}

impl std::fmt::Debug for Setting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setting")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("log_changes", &self.log_changes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    async fn session() -> Arc<Settings> {
        Arc::new(Settings::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let s = session().await;
        assert_eq!(Setting::int(s.clone(), "volume", 7).get_int(), 7);
        assert_eq!(Setting::float(s.clone(), "gain", 0.25).get_float(), 0.25);
        assert_eq!(Setting::string(s.clone(), "name", "ada").get_string(), "ada");
        assert!(!s.is_dirty());
    }

    #[tokio::test]
    async fn test_numeric_kinds_render_as_text() {
        let s = session().await;
        let volume = Setting::int(s.clone(), "volume", 3);
        let gain = Setting::float(s.clone(), "gain", 0.5);
        assert_eq!(volume.get_string(), "3");
        assert_eq!(gain.get_string(), "0.5");
    }

    #[tokio::test]
    async fn test_set_equal_to_default_is_skipped() {
        let s = session().await;
        let volume = Setting::int(s.clone(), "volume", 3);
        assert!(!volume.set_int(3));
        assert!(!s.has_key("volume"));
        assert!(!s.is_dirty());
    }

    #[tokio::test]
    async fn test_effective_set_notifies_observers() {
        let s = session().await;
        let volume = Setting::int(s.clone(), "volume", 0).with_log_changes(false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        volume.observers().subscribe_int(move |v| sink.lock().push(v));

        assert!(volume.set_int(4));
        assert!(!volume.set_int(4));
        assert!(volume.set_int(5));

        assert_eq!(*seen.lock(), vec![4, 5]);
        assert_eq!(s.get_int("volume", 0), 5);
    }

    #[tokio::test]
    async fn test_bool_round_trip() {
        let s = session().await;
        let muted = Setting::int(s, "muted", 0);
        assert!(!muted.get_bool());
        assert!(muted.set_bool(true));
        assert!(muted.get_bool());
        assert_eq!(muted.get_int(), 1);
        assert!(muted.set_bool(false));
        assert!(!muted.get_bool());
    }

    #[tokio::test]
    async fn test_set_from_converts_through_own_kind() {
        let s = session().await;
        let source = Setting::int(s.clone(), "source", 9);
        let target = Setting::string(s.clone(), "target", "");

        assert!(target.set_from(&source));
        assert_eq!(s.get_string("target", ""), "9");
    }

    #[tokio::test]
    async fn test_delete_value_restores_default() {
        let s = session().await;
        let gain = Setting::float(s.clone(), "gain", 1.0);
        gain.set_float(0.3);
        assert!(gain.delete_value());
        assert_eq!(gain.get_float(), 1.0);
        assert!(!gain.delete_value());
    }

    #[tokio::test]
    async fn test_two_settings_share_a_key() {
        let s = session().await;
        let a = Setting::string(s.clone(), "lang", "en");
        let b = Setting::string(s, "lang", "en");
        a.set_string("fr");
        assert_eq!(b.get_string(), "fr");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_of_one_value_notify_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Barrier;

        const WRITERS: usize = 8;
        let s = session().await;
        let volume = Arc::new(Setting::int(s, "volume", 0).with_log_changes(false));
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        volume.observers().subscribe_int(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let barrier = Arc::new(Barrier::new(WRITERS));
        let mut writers = Vec::new();
        for _ in 0..WRITERS {
            let volume = Arc::clone(&volume);
            let barrier = Arc::clone(&barrier);
            writers.push(tokio::task::spawn_blocking(move || {
                barrier.wait();
                volume.set_int(7)
            }));
        }

        let mut effective = 0;
        for writer in writers {
            if writer.await.unwrap() {
                effective += 1;
            }
        }
        assert_eq!(effective, 1);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(volume.get_int(), 7);
    }

    #[test]
    fn test_kind_metadata() {
        assert_eq!(SettingKind::Int(1).value_type(), ValueType::Int);
        assert_eq!(SettingKind::Float(1.0).default_value(), SettingValue::Float(1.0));
        assert_eq!(
            SettingKind::String("x".into()).default_value(),
            SettingValue::String("x".into())
        );
    }
}
