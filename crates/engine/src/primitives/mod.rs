//! Settings primitives
//!
//! Higher-level facades over a [`Settings`](crate::Settings) session:
//! - **Setting**: a named key with a typed default and change observers
//! - **ResetGroup**: settings restored to their defaults together
//! - **ValueCondition**: a threshold test over a setting's current value
//!
//! ## Design Principle: Stateless Facades
//!
//! Primitives hold only an `Arc<Settings>` and a key. All values live in the
//! session's cache, so two primitives naming the same key always agree.

pub mod condition;
pub mod observers;
pub mod reset;
pub mod setting;

pub use condition::{Comparison, ValueCondition};
pub use observers::{SettingObservers, SubscriptionId};
pub use reset::ResetGroup;
pub use setting::{Setting, SettingKind};
