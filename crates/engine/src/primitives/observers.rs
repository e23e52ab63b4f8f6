//! Change observers for named settings
//!
//! Callbacks are grouped by type space. A `Setting` fires only the group that
//! matches the value it wrote. Callbacks run on the writing thread, after the
//! write, with no lock held, so a callback may subscribe or unsubscribe.

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by `subscribe_*`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Group<T> {
    callbacks: RwLock<Vec<(SubscriptionId, Callback<T>)>>,
}

impl<T> Default for Group<T> {
    fn default() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Clone> Group<T> {
    fn add(&self, id: SubscriptionId, callback: Callback<T>) {
        self.callbacks.write().push((id, callback));
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    fn notify(&self, value: T) {
        let snapshot: Vec<Callback<T>> = self
            .callbacks
            .read()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in snapshot {
            callback(value.clone());
        }
    }

    fn len(&self) -> usize {
        self.callbacks.read().len()
    }
}

/// Typed change callbacks for one setting
#[derive(Default)]
pub struct SettingObservers {
    next_id: AtomicU64,
    ints: Group<i32>,
    floats: Group<f32>,
    strings: Group<String>,
}

impl SettingObservers {
    /// Empty observer set
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Call `f` with every effective int write
    pub fn subscribe_int(&self, f: impl Fn(i32) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.ints.add(id, Arc::new(f));
        id
    }

    /// Call `f` with every effective float write
    pub fn subscribe_float(&self, f: impl Fn(f32) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.floats.add(id, Arc::new(f));
        id
    }

    /// Call `f` with every effective string write
    pub fn subscribe_string(&self, f: impl Fn(String) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.strings.add(id, Arc::new(f));
        id
    }

    /// Remove a callback; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.ints.remove(id) || self.floats.remove(id) || self.strings.remove(id)
    }

    /// Number of registered callbacks
    pub fn len(&self) -> usize {
        self.ints.len() + self.floats.len() + self.strings.len()
    }

    /// Whether no callbacks are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn notify_int(&self, value: i32) {
        self.ints.notify(value);
    }

    pub(crate) fn notify_float(&self, value: f32) {
        self.floats.notify(value);
    }

    pub(crate) fn notify_string(&self, value: &str) {
        self.strings.notify(value.to_string());
    }
}

impl fmt::Debug for SettingObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingObservers")
            .field("ints", &self.ints.len())
            .field("floats", &self.floats.len())
            .field("strings", &self.strings.len())
            .finish()
    }
}
