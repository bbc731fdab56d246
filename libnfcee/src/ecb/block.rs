// libnfcee-rs/libnfcee/src/ecb/block.rs
//! One execution environment control block.

use bitflags::bitflags;

use crate::ecb::aid::AidTable;
use crate::events::{EeInfo, ListenerId};
use crate::types::{
    ConnId, ConnState, DiscoverReqOp, EeId, EeInterface, EeStatus, EeTlv, ListenTech, ProtoMask,
    PowerRouting, TechMask,
};

bitflags! {
    /// Routing categories changed since the last successful push.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u8 {
        /// Technology routing.
        const TECH  = 0x01;
        /// Protocol routing.
        const PROTO = 0x02;
        /// AID routing.
        const AID   = 0x04;
        /// Vendor-specific AID configuration.
        const VS    = 0x08;
    }
}

/// RF protocol requested per listen technology by discover-request
/// notifications. `None` means the EE does not listen on that technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenProtocols {
    /// NFC-A.
    pub a: Option<u8>,
    /// NFC-B.
    pub b: Option<u8>,
    /// NFC-F.
    pub f: Option<u8>,
    /// NFC-B'.
    pub b_prime: Option<u8>,
}

impl ListenProtocols {
    /// Apply one discover-request entry.
    pub fn apply(&mut self, tech: ListenTech, op: DiscoverReqOp, protocol: u8) {
        let slot = match tech {
            ListenTech::A => &mut self.a,
            ListenTech::B => &mut self.b,
            ListenTech::F => &mut self.f,
            ListenTech::BPrime => &mut self.b_prime,
        };
        *slot = match op {
            DiscoverReqOp::Add => Some(protocol),
            DiscoverReqOp::Remove => None,
        };
    }

    /// True when the EE listens on any technology.
    pub fn any(&self) -> bool {
        self.a.is_some() || self.b.is_some() || self.f.is_some() || self.b_prime.is_some()
    }
}

/// State kept for one execution environment (ECB).
#[derive(Debug, Clone)]
pub struct ControlBlock {
    /// NFCEE id; [`EeId::INVALID`] for an unused slot.
    pub id: EeId,
    /// Current status.
    pub status: EeStatus,
    /// Status before the last power-down, consumed by restore.
    pub old_status: Option<EeStatus>,
    /// Set on power-mode restore; cleared when the EE is re-notified.
    pub restoring: bool,
    /// A restore mode-set or reconnect is outstanding.
    pub restore_pending: bool,

    /// Data connection state.
    pub connection: ConnState,
    /// Connection id while connected.
    pub conn_id: Option<ConnId>,
    /// Interface of the current or last connection.
    pub use_interface: Option<EeInterface>,
    /// Interfaces from the discovery notification.
    pub interfaces: Vec<EeInterface>,
    /// TLVs from the discovery notification.
    pub tlvs: Vec<EeTlv>,

    /// Technology routing per power state.
    pub tech: PowerRouting<TechMask>,
    /// Protocol routing per power state.
    pub proto: PowerRouting<ProtoMask>,
    /// AID routes.
    pub aids: AidTable,
    /// Categories changed since the last push.
    pub dirty: DirtyFlags,
    /// Contributes to the routing table.
    pub configured: bool,

    /// Listener of the last API call for this EE.
    pub listener: Option<ListenerId>,
    /// Allocated by a discover-request before its discovery notification.
    pub order_pending: bool,
    /// Has discover-request entries.
    pub discover_req: bool,
    /// Requested listen protocols.
    pub listen: ListenProtocols,
}

impl ControlBlock {
    /// An unused slot.
    pub fn unused(aid_budget: usize) -> Self {
        Self {
            id: EeId::INVALID,
            status: EeStatus::Removed,
            old_status: None,
            restoring: false,
            restore_pending: false,
            connection: ConnState::None,
            conn_id: None,
            use_interface: None,
            interfaces: Vec::new(),
            tlvs: Vec::new(),
            tech: PowerRouting::default(),
            proto: PowerRouting::default(),
            aids: AidTable::new(aid_budget),
            dirty: DirtyFlags::empty(),
            configured: false,
            listener: None,
            order_pending: false,
            discover_req: false,
            listen: ListenProtocols::default(),
        }
    }

    /// The device host block; always present and active.
    pub fn device_host(aid_budget: usize) -> Self {
        let mut cb = Self::unused(aid_budget);
        cb.id = EeId::DH;
        cb.status = EeStatus::Active;
        cb
    }

    /// True for a free slot.
    pub fn is_unused(&self) -> bool {
        !self.id.is_valid()
    }

    /// Return the slot to unused, keeping the AID budget.
    pub fn reset(&mut self) {
        *self = Self::unused(self.aids.budget());
    }

    /// Drop all technology, protocol and AID routing and mark it for push.
    pub fn clear_routing(&mut self) {
        self.tech = PowerRouting::default();
        self.proto = PowerRouting::default();
        self.aids.clear();
        self.dirty |= DirtyFlags::TECH | DirtyFlags::PROTO | DirtyFlags::AID;
    }

    /// True when any routing entry is set.
    pub fn has_routing(&self) -> bool {
        !self.tech.is_empty() || !self.proto.is_empty() || self.aids.routed().next().is_some()
    }

    /// Derive `configured` from the current routing.
    pub fn recompute_configured(&mut self) {
        self.configured = self.has_routing();
    }

    /// Snapshot for applications.
    pub fn info(&self) -> EeInfo {
        EeInfo {
            handle: self.id.handle(),
            status: self.status,
            interfaces: self.interfaces.clone(),
            tlvs: self.tlvs.clone(),
        }
    }
}
