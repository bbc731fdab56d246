// libnfcee-rs/libnfcee/src/timer/virtual_clock.rs
//! Virtual time for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::timer::{Scheduler, TimerId};

#[derive(Debug, Default)]
struct Clock {
    now: Duration,
    deadlines: HashMap<TimerId, Duration>,
    arm_count: usize,
}

/// Manually advanced scheduler for tests and simulations.
///
/// Clones share the same clock: hand one to the manager and keep one to call
/// [`advance`](Self::advance).
#[derive(Debug, Clone, Default)]
pub struct VirtualScheduler {
    clock: Arc<Mutex<Clock>>,
}

impl VirtualScheduler {
    /// Clock at zero with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Move time forward and return the timers that expired, earliest first.
    /// Expired timers are disarmed.
    pub fn advance(&self, by: Duration) -> Vec<TimerId> {
        let mut clock = self.lock();
        clock.now += by;
        let now = clock.now;

        let mut due: Vec<(Duration, TimerId)> = clock
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, at)| (*at, *id))
            .collect();
        due.sort_by_key(|(at, _)| *at);
        for (_, id) in &due {
            clock.deadlines.remove(id);
        }
        due.into_iter().map(|(_, id)| id).collect()
    }

    /// Remaining time before `id` fires.
    pub fn remaining(&self, id: TimerId) -> Option<Duration> {
        let clock = self.lock();
        clock.deadlines.get(&id).map(|at| at.saturating_sub(clock.now))
    }

    /// Number of arm calls so far, re-arms included.
    pub fn arm_count(&self) -> usize {
        self.lock().arm_count
    }
}

impl Scheduler for VirtualScheduler {
    fn arm(&mut self, id: TimerId, after: Duration) {
        let mut clock = self.lock();
        let at = clock.now + after;
        clock.deadlines.insert(id, at);
        clock.arm_count += 1;
    }

    fn cancel(&mut self, id: TimerId) {
        self.lock().deadlines.remove(&id);
    }

    fn is_armed(&self, id: TimerId) -> bool {
        self.lock().deadlines.contains_key(&id)
    }
}
