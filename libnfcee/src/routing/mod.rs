// libnfcee-rs/libnfcee/src/routing/mod.rs
//! Routing table encoding.

pub mod serializer;
pub mod tlv;

pub use serializer::{build, ecb_tlvs, RoutingChunk};
pub use tlv::{decode_all, RouteTlv};
