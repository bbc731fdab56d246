// libnfcee-rs/libnfcee/src/utils/mod.rs
//! Small helpers shared by the manager, tests and the demo.

pub mod hex;
pub mod timeout;

pub use self::hex::*;
pub use self::timeout::*;
