//! Waiting on asynchronous cloud operations and retrying conflicting ones.
//!
//! Resource handlers never poll by themselves, they compose [`wait_for`], [`wait_for_absence`] and
//! [`retry_on_conflict`] under the [`OperationContext`] the host gave them.

mod conflict_retry;
mod context;
mod legacy_lock;
mod wait;

pub use conflict_retry::retry_on_conflict;
pub use context::{OperationContext, default_wait_retry_interval, set_default_wait_retry_interval};
pub use legacy_lock::lock_legacy_api;
pub use wait::{StatusClass, wait_for, wait_for_absence};
