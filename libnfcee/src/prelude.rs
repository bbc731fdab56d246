// libnfcee-rs/libnfcee/src/prelude.rs
//! Common imports: `use libnfcee::prelude::*;`.

pub use crate::config::{Config, ConfigBuilder};
pub use crate::dispatch::{Command, DiscoverReqEntry, Dispatcher, Message, NciEvent};
pub use crate::events::{DiscoverRequestInfo, EeEvent, EeInfo, EeListener, ListenerId};
pub use crate::manager::{ConfigStatus, EmState, Manager};
pub use crate::timer::{Scheduler, TimerId, VirtualScheduler};
pub use crate::transport::{MockTransport, NciTransport};
pub use crate::{
    ActionTrigger, Aid, ConnId, ConnState, EeHandle, EeId, EeInterface, EeMode, EeStatus, Error,
    PowerMode, PowerRouting, PowerState, PowerStates, ProtoMask, Result, Status, TechMask,
};

#[cfg(feature = "async")]
pub use crate::actor::{ManagerHandle, TokioScheduler};

// Re-export small utilities for convenience
pub use crate::utils::{bytes_to_hex, bytes_to_hex_spaced, ms, parse_hex};
