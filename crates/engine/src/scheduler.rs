//! Periodic auto-save
//!
//! `FlushScheduler` is a pure timer: the host feeds it elapsed time and it
//! answers whether a save is due. It only counts time while the cache is dirty
//! and the host is not paused, and it resets after firing.
//!
//! [`spawn_autosave`] drives a [`Settings`] session from a tokio interval for
//! hosts without their own frame loop. The task holds a `Weak` reference and
//! exits once the session is dropped or closed.

use crate::session::Settings;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Accumulates dirty, unpaused time and fires once per interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushScheduler {
    interval: Duration,
    accumulated: Duration,
}

impl FlushScheduler {
    /// Scheduler firing every `interval`; `Duration::ZERO` disables it
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulated: Duration::ZERO,
        }
    }

    /// Scheduler that never fires
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Whether the scheduler can fire at all
    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Configured interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time counted toward the next save
    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Advance the timer by `elapsed`
    ///
    /// Returns `true` when a save should be requested.
    pub fn tick(&mut self, elapsed: Duration, dirty: bool, paused: bool) -> bool {
        if !self.is_enabled() || paused || !dirty {
            return false;
        }

        self.accumulated += elapsed;
        if self.accumulated >= self.interval {
            self.accumulated = Duration::ZERO;
            return true;
        }
        false
    }

    /// Forget accumulated time
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
    }
}

/// Drive `settings.tick` from a tokio interval
///
/// `period` is the tick granularity, not the save interval; the session's
/// configured interval still decides when a save fires. Returns `None` when
/// auto-save is disabled.
pub fn spawn_autosave(settings: &Arc<Settings>, period: Duration) -> Option<JoinHandle<()>> {
    if !settings.autosave_enabled() || period.is_zero() {
        return None;
    }

    let weak: Weak<Settings> = Arc::downgrade(settings);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(settings) = weak.upgrade() else {
                break;
            };
            if settings.is_closed() {
                break;
            }
            settings.tick(period);
        }
        debug!("Auto-save task stopped");
    });
    Some(handle)
}
