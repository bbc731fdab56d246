// libnfcee-rs/libnfcee/src/transport/mod.rs
//! NCI transport abstraction and its mock.

pub mod mock;
pub mod traits;

pub use mock::{MockTransport, Request};
pub use traits::NciTransport;
