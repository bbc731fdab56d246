// libnfcee-rs/libnfcee/src/timer/mod.rs
//! Timer port used by the manager.
//!
//! The manager only arms and cancels; expiry is delivered back as a
//! [`crate::dispatch::Message::TimerExpired`] so it is serialized with every
//! other input.

use std::time::Duration;

pub mod virtual_clock;

pub use virtual_clock::VirtualScheduler;

/// Timers owned by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Fires once routing changes have settled.
    RoutingDebounce,
    /// Bounds the wait for NFCEE discovery notifications.
    DiscoveryTimeout,
}

/// Arms and cancels the manager's timers.
pub trait Scheduler: Send {
    /// Start `id`, restarting it when already armed.
    fn arm(&mut self, id: TimerId, after: Duration);

    /// Stop `id`; no-op when idle.
    fn cancel(&mut self, id: TimerId);

    /// True while `id` is pending.
    fn is_armed(&self, id: TimerId) -> bool;
}
