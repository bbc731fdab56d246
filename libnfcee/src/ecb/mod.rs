// libnfcee-rs/libnfcee/src/ecb/mod.rs
//! Execution-environment control blocks and the fixed table holding them.

pub mod aid;
pub mod block;
pub mod table;

pub use aid::{AidEntry, AidRouteInfo, AidTable, InsertOutcome};
pub use block::{ControlBlock, DirtyFlags, ListenProtocols};
pub use table::{EcbTable, DH_SLOT};
