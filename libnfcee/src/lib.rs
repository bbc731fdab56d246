// libnfcee-rs/libnfcee/src/lib.rs

//! libnfcee
//!
//! NFC execution environment manager: discovers NFCEEs behind an NCI
//! controller, keeps their listen-mode routing (technology, protocol and
//! AID) and pushes it to the controller, and manages logical data
//! connections to each NFCEE.
#![warn(missing_docs)]

pub mod config;
pub mod constants;
pub mod dispatch;
pub mod ecb;
pub mod error;
pub mod events;
pub mod manager;
pub mod prelude;
pub mod routing;
#[doc(hidden)]
pub mod test_support;
pub mod timer;
pub mod transport;
pub mod types;
pub mod utils;

#[cfg(feature = "async")]
pub mod actor;

// Re-export common types at crate root so `crate::Error`, `crate::Result`,
// and the newtypes in `types` are available for consumers and for
// convenient `prelude` re-exports.
pub use crate::error::*;
pub use crate::types::*;

pub use prelude::*;
