// libnfcee-rs/libnfcee/src/config.rs
//! Manager tunables and their builder.

use std::time::Duration;

use crate::constants::{
    DEFAULT_AID_TABLE_BUDGET, DEFAULT_MAX_EE, DEFAULT_MAX_LISTENERS, MAX_AID_LEN,
    MAX_ROUTING_TLV_SIZE,
};
use crate::utils::{default_discovery_timeout, default_routing_debounce};
use crate::{Error, Result};

/// Tunables of the EE manager.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// NFCEEs tracked in addition to the DH slot.
    pub max_ee: usize,
    /// Capacity of the listener registry.
    pub max_listeners: usize,
    /// Per-EE AID table size in bytes; each entry costs `aid_len + 2`.
    pub aid_table_budget: usize,
    /// Quiet period after a routing change before the push.
    pub routing_debounce: Duration,
    /// Time allowed for all discovery notifications.
    pub discovery_timeout: Duration,
    /// Upper bound on the routing TLV stream, further capped by the controller.
    pub max_tlv_size: usize,
    /// Defer restore of non-HCI EEs until the HCI module reports it is ready.
    pub wait_for_hci: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_ee: DEFAULT_MAX_EE,
            max_listeners: DEFAULT_MAX_LISTENERS,
            aid_table_budget: DEFAULT_AID_TABLE_BUDGET,
            routing_debounce: default_routing_debounce(),
            discovery_timeout: default_discovery_timeout(),
            max_tlv_size: MAX_ROUTING_TLV_SIZE,
            wait_for_hci: false,
        }
    }
}

impl Config {
    /// Start from the defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Reject values the manager cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.max_ee == 0 || self.max_ee >= 0xff {
            return Err(Error::InvalidParam(format!(
                "max_ee must be in 1..255, got {}",
                self.max_ee
            )));
        }
        if self.max_listeners == 0 {
            return Err(Error::InvalidParam("max_listeners must be non-zero".into()));
        }
        // must hold at least one maximal AID entry
        if self.aid_table_budget < MAX_AID_LEN + 2 {
            return Err(Error::InvalidParam(format!(
                "aid_table_budget {} cannot hold a {}-byte AID",
                self.aid_table_budget, MAX_AID_LEN
            )));
        }
        if self.max_tlv_size == 0 || self.max_tlv_size > MAX_ROUTING_TLV_SIZE {
            return Err(Error::InvalidParam(format!(
                "max_tlv_size must be in 1..={}, got {}",
                MAX_ROUTING_TLV_SIZE, self.max_tlv_size
            )));
        }
        Ok(())
    }
}

/// Helper to construct a validated [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Builder over [`Config::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// NFCEE slots besides the DH.
    pub fn max_ee(mut self, n: usize) -> Self {
        self.config.max_ee = n;
        self
    }

    /// Listener registry capacity.
    pub fn max_listeners(mut self, n: usize) -> Self {
        self.config.max_listeners = n;
        self
    }

    /// Per-EE AID table size in bytes.
    pub fn aid_table_budget(mut self, bytes: usize) -> Self {
        self.config.aid_table_budget = bytes;
        self
    }

    /// Routing de-bounce delay.
    pub fn routing_debounce(mut self, d: Duration) -> Self {
        self.config.routing_debounce = d;
        self
    }

    /// Discovery window.
    pub fn discovery_timeout(mut self, d: Duration) -> Self {
        self.config.discovery_timeout = d;
        self
    }

    /// Cap on the routing TLV stream.
    pub fn max_tlv_size(mut self, bytes: usize) -> Self {
        self.config.max_tlv_size = bytes;
        self
    }

    /// Hold non-HCI restores until the HCI module is ready.
    pub fn wait_for_hci(mut self, wait: bool) -> Self {
        self.config.wait_for_hci = wait;
        self
    }

    /// Consume the builder; fails with `InvalidParam` on unusable values.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
