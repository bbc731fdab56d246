// libnfcee-rs/libnfcee/src/constants.rs
//! Protocol constants shared across the crate

/// Routing TLV tag: technology-based entry
pub const ROUTE_TAG_TECH: u8 = 0x00;

/// Routing TLV tag: protocol-based entry
pub const ROUTE_TAG_PROTO: u8 = 0x01;

/// Routing TLV tag: AID-based entry
pub const ROUTE_TAG_AID: u8 = 0x02;

/// Length field of a technology or protocol TLV (ee_id, power_cfg, value)
pub const ROUTE_FIXED_TLV_LEN: u8 = 3;

/// Bytes preceding the value in every routing TLV (tag, len, ee_id, power_cfg)
pub const ROUTE_TLV_HEADER_LEN: usize = 4;

/// Upper bound of the routing TLV stream regardless of controller capacity
pub const MAX_ROUTING_TLV_SIZE: usize = 0xFD;

/// Tag stored in front of each AID in the per-EE AID table (EMV AID tag)
pub const AID_CFG_TAG: u8 = 0x4F;

/// Longest AID accepted (ISO/IEC 7816-5)
pub const MAX_AID_LEN: usize = 16;

/// RF technology values written into TECH TLVs, ordered A, B, F
pub const RF_TECHNOLOGY_A: u8 = 0x00;
/// NFC-B technology value.
pub const RF_TECHNOLOGY_B: u8 = 0x01;
/// NFC-F technology value.
pub const RF_TECHNOLOGY_F: u8 = 0x02;

/// RF protocol values written into PROTO TLVs
pub const RF_PROTOCOL_T1T: u8 = 0x01;
/// Type 2 tag protocol value.
pub const RF_PROTOCOL_T2T: u8 = 0x02;
/// Type 3 tag protocol value.
pub const RF_PROTOCOL_T3T: u8 = 0x03;
/// ISO-DEP protocol value.
pub const RF_PROTOCOL_ISO_DEP: u8 = 0x04;
/// NFC-DEP protocol value.
pub const RF_PROTOCOL_NFC_DEP: u8 = 0x05;

/// Default number of NFCEEs tracked besides the DH
pub const DEFAULT_MAX_EE: usize = 4;

/// Default number of application listeners
pub const DEFAULT_MAX_LISTENERS: usize = 3;

/// Default per-EE AID table budget in bytes (tag + len + AID per entry)
pub const DEFAULT_AID_TABLE_BUDGET: usize = 192;

/// Routing de-bounce interval in milliseconds
pub const DEFAULT_ROUTING_DEBOUNCE_MS: u64 = 1000;

/// NFCEE discovery timeout in milliseconds
pub const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 2000;
