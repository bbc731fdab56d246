// libnfcee-rs/libnfcee/src/utils/timeout.rs
//! Millisecond helpers for the routing de-bounce and discovery timers.

use std::time::Duration;

use crate::constants::{DEFAULT_DISCOVERY_TIMEOUT_MS, DEFAULT_ROUTING_DEBOUNCE_MS};

/// Convert milliseconds to Duration.
pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Default delay between the last routing change and the routing push.
pub fn default_routing_debounce() -> Duration {
    ms(DEFAULT_ROUTING_DEBOUNCE_MS)
}

/// Default time allowed for all NFCEE discovery notifications to arrive.
pub fn default_discovery_timeout() -> Duration {
    ms(DEFAULT_DISCOVERY_TIMEOUT_MS)
}
