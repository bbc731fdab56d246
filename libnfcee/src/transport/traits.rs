// libnfcee-rs/libnfcee/src/transport/traits.rs
//! Transport port towards the NFCC.

use crate::types::{ConnId, EeId, EeInterface, EeMode};
use crate::Result;

/// Outbound NCI commands issued by the EE manager.
///
/// Responses and notifications come back asynchronously as
/// [`crate::dispatch::NciEvent`] messages; these calls only queue the command.
pub trait NciTransport: Send {
    /// NFCEE_DISCOVER (enable or disable discovery notifications)
    fn nfcee_discover(&mut self, enable: bool) -> Result<()>;

    /// NFCEE_MODE_SET
    fn nfcee_mode_set(&mut self, ee: EeId, mode: EeMode) -> Result<()>;

    /// RF_SET_LISTEN_MODE_ROUTING for one chunk of TLVs
    fn set_routing(&mut self, more: bool, ee: EeId, tlv_count: u8, tlvs: &[u8]) -> Result<()>;

    /// CORE_CONN_CREATE towards an NFCEE
    fn conn_create(&mut self, ee: EeId, interface: EeInterface) -> Result<()>;

    /// CORE_CONN_CLOSE
    fn conn_close(&mut self, conn: ConnId) -> Result<()>;

    /// Queue a data packet; `Error::NoMemory` when no buffer is available.
    fn send_data(&mut self, conn: ConnId, data: Vec<u8>) -> Result<()>;

    /// Listen-mode routing table size reported by the controller, in bytes.
    fn max_routing_table_size(&self) -> usize;
}
