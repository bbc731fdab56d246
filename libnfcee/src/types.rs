// libnfcee-rs/libnfcee/src/types.rs
//! Newtypes and small value types shared across the crate.

use crate::Error;
use bitflags::bitflags;
use std::convert::TryFrom;

/// NFCEE identifier assigned by the NFCC - Newtype Pattern (1 バイト)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display(fmt = "{:#04x}", _0)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EeId(u8);

impl EeId {
    /// The device host, routed to like any other EE.
    pub const DH: Self = Self(0x00);
    /// Marks an unused control block slot.
    pub const INVALID: Self = Self(0xff);

    /// Wrap a raw NFCEE id.
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Raw id byte.
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// True for the device host.
    pub fn is_dh(&self) -> bool {
        *self == Self::DH
    }

    /// False for the unused-slot marker.
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Handle the application sees for this EE.
    pub fn handle(&self) -> EeHandle {
        EeHandle::from_ee_id(*self)
    }
}

/// Application-facing handle of an EE (`0x4xx` group).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display(fmt = "{:#06x}", _0)]
pub struct EeHandle(u16);

impl EeHandle {
    /// Handle group shared by every EE.
    pub const GROUP_EE: u16 = 0x0400;
    const GROUP_MASK: u16 = 0xff00;

    /// Handle of `id` in the EE group.
    pub fn from_ee_id(id: EeId) -> Self {
        Self(Self::GROUP_EE | id.as_u8() as u16)
    }

    /// Raw handle value.
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Recover the NFCEE id; handles outside the EE group are rejected.
    pub fn ee_id(&self) -> Option<EeId> {
        if self.0 & Self::GROUP_MASK == Self::GROUP_EE {
            Some(EeId::new((self.0 & 0x00ff) as u8))
        } else {
            None
        }
    }
}

impl TryFrom<u16> for EeHandle {
    type Error = Error;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        let handle = Self(raw);
        match handle.ee_id() {
            Some(_) => Ok(handle),
            None => Err(Error::InvalidParam(format!("not an EE handle: {raw:#06x}"))),
        }
    }
}

/// Logical connection id handed out by the NCI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display(fmt = "conn:{}", _0)]
pub struct ConnId(u8);

impl ConnId {
    /// Wrap a connection id from the NCI layer.
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Raw connection id.
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

/// Application identifier (1..=16 バイト)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Aid(Vec<u8>);

impl Aid {
    /// Longest AID accepted.
    pub const MAX_LEN: usize = crate::constants::MAX_AID_LEN;

    /// Parse an AID from hex, e.g. `"A000000003101001"`.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let bytes = crate::utils::parse_hex(s).map_err(Error::InvalidParam)?;
        Self::try_from(&bytes[..])
    }

    /// AID bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes; never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Upper-case hex without separators.
    pub fn to_hex(&self) -> String {
        crate::utils::bytes_to_hex(&self.0).to_uppercase()
    }
}

impl TryFrom<&[u8]> for Aid {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.is_empty() || bytes.len() > Self::MAX_LEN {
            return Err(Error::InvalidLength {
                expected: Self::MAX_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes.to_vec()))
    }
}

impl std::fmt::Display for Aid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Outcome code carried by transport responses and application events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Success.
    Ok,
    /// Refused by the controller.
    Rejected,
    /// Generic failure.
    Failed,
    /// A parameter was out of range or referred to nothing.
    InvalidParam,
    /// Conflicts with existing state, e.g. an AID owned by another EE.
    SemanticError,
    /// Routing or AID storage exhausted.
    BufferFull,
    /// No buffer for outbound data.
    NoMemory,
}

impl Status {
    /// Map an NCI status octet. Codes this layer does not distinguish
    /// collapse to `Failed`.
    pub fn from_nci(code: u8) -> Self {
        match code {
            0x00 => Self::Ok,
            0x01 => Self::Rejected,
            0x06 => Self::SemanticError,
            0x09 => Self::InvalidParam,
            _ => Self::Failed,
        }
    }

    /// True for [`Status::Ok`].
    pub fn is_ok(&self) -> bool {
        *self == Self::Ok
    }
}

/// EE status as tracked in the control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EeStatus {
    /// Enabled and routable.
    Active,
    /// Present but disabled.
    Inactive,
    /// Activation requested, mode-set response outstanding.
    Pending,
    /// No longer reported by the NFCC.
    Removed,
}

impl EeStatus {
    /// Map the status octet of a discovery notification.
    pub fn from_nci(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Active),
            0x01 => Some(Self::Inactive),
            0x02 => Some(Self::Removed),
            _ => None,
        }
    }
}

/// NFCEE mode requested via mode-set.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EeMode {
    /// Disable the NFCEE.
    Deactivate = 0x00,
    /// Enable the NFCEE.
    Activate = 0x01,
}

/// Lifecycle of the logical data connection to an EE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnState {
    /// No connection.
    #[default]
    None,
    /// Create requested, response outstanding.
    Wait,
    /// Open; data flows.
    Connected,
    /// Close requested, notification outstanding.
    Disconnecting,
}

/// NFCEE protocol/interface advertised during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EeInterface {
    /// ISO 7816 APDUs.
    Apdu,
    /// HCI network access; owned by the HCI module.
    HciAccess,
    /// Type 3 tag command set.
    T3tCommandSet,
    /// Raw frames.
    Transparent,
    /// Vendor interface code.
    Proprietary(u8),
}

impl EeInterface {
    /// Map an NCI interface code.
    pub fn from_nci(code: u8) -> Self {
        match code {
            0x00 => Self::Apdu,
            0x01 => Self::HciAccess,
            0x02 => Self::T3tCommandSet,
            0x03 => Self::Transparent,
            other => Self::Proprietary(other),
        }
    }

    /// NCI interface code.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Apdu => 0x00,
            Self::HciAccess => 0x01,
            Self::T3tCommandSet => 0x02,
            Self::Transparent => 0x03,
            Self::Proprietary(code) => *code,
        }
    }
}

/// Opaque TLV reported with an NFCEE discovery notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EeTlv {
    /// TLV tag.
    pub tag: u8,
    /// TLV value.
    pub value: Vec<u8>,
}

/// NFCC power mode as seen by the device-management layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    /// Normal operation.
    Full,
    /// Reduced power; nothing to restore.
    Low,
}

/// Device power state in which a routing entry applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Device switched on.
    SwitchOn,
    /// Device switched off.
    SwitchOff,
    /// Battery removed or depleted.
    BatteryOff,
}

/// Listen-mode technology named by a discover-request notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenTech {
    /// NFC-A.
    A,
    /// NFC-B.
    B,
    /// NFC-F.
    F,
    /// NFC-B'.
    BPrime,
}

/// Whether a discover-request entry adds or removes a listen protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverReqOp {
    /// Start listening.
    Add,
    /// Stop listening.
    Remove,
}

/// Trigger of an NFCEE action notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTrigger {
    /// An AID was selected.
    AidSelect,
    /// RF protocol based routing matched.
    RfProtocol,
    /// RF technology based routing matched.
    RfTechnology,
    /// Application initiation.
    AppInitiation,
    /// Vendor trigger code.
    Proprietary(u8),
}

impl ActionTrigger {
    /// Map an NCI trigger code.
    pub fn from_nci(code: u8) -> Self {
        match code {
            0x00 => Self::AidSelect,
            0x01 => Self::RfProtocol,
            0x02 => Self::RfTechnology,
            0x10 => Self::AppInitiation,
            other => Self::Proprietary(other),
        }
    }
}

bitflags! {
    /// Power states of one routing entry; the wire `power_cfg` byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct PowerStates: u8 {
        /// Device switched on.
        const SWITCH_ON   = 0x01;
        /// Device switched off.
        const SWITCH_OFF  = 0x02;
        /// Battery off.
        const BATTERY_OFF = 0x04;
    }
}

bitflags! {
    /// RF technologies that can be routed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TechMask: u8 {
        /// NFC-A.
        const A = 0x01;
        /// NFC-B.
        const B = 0x02;
        /// NFC-F.
        const F = 0x04;
    }
}

bitflags! {
    /// RF protocols that can be routed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ProtoMask: u8 {
        /// Type 1 tag.
        const T1T     = 0x01;
        /// Type 2 tag.
        const T2T     = 0x02;
        /// Type 3 tag.
        const T3T     = 0x04;
        /// ISO-DEP (ISO 14443-4).
        const ISO_DEP = 0x08;
        /// NFC-DEP (peer to peer).
        const NFC_DEP = 0x10;
    }
}

/// One mask per power state {switch-on, switch-off, battery-off}.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerRouting<M> {
    /// Applies while switched on.
    pub switch_on: M,
    /// Applies while switched off.
    pub switch_off: M,
    /// Applies with the battery off.
    pub battery_off: M,
}

impl<M: bitflags::Flags + Copy> PowerRouting<M> {
    /// Masks for all three power states.
    pub fn new(switch_on: M, switch_off: M, battery_off: M) -> Self {
        Self {
            switch_on,
            switch_off,
            battery_off,
        }
    }

    /// Route only while the device is switched on.
    pub fn switch_on(mask: M) -> Self {
        Self::new(mask, M::empty(), M::empty())
    }

    /// No bit set in any power state.
    pub fn is_empty(&self) -> bool {
        self.switch_on.is_empty() && self.switch_off.is_empty() && self.battery_off.is_empty()
    }

    /// Mask that applies in `state`.
    pub fn mask_for(&self, state: PowerState) -> M {
        match state {
            PowerState::SwitchOn => self.switch_on,
            PowerState::SwitchOff => self.switch_off,
            PowerState::BatteryOff => self.battery_off,
        }
    }

    /// Power configuration byte for a single technology/protocol bit.
    pub fn power_cfg(&self, flag: M) -> PowerStates {
        let mut cfg = PowerStates::empty();
        if self.switch_on.contains(flag) {
            cfg |= PowerStates::SWITCH_ON;
        }
        if self.switch_off.contains(flag) {
            cfg |= PowerStates::SWITCH_OFF;
        }
        if self.battery_off.contains(flag) {
            cfg |= PowerStates::BATTERY_OFF;
        }
        cfg
    }
}

impl<M: bitflags::Flags + Copy> Default for PowerRouting<M> {
    fn default() -> Self {
        Self::new(M::empty(), M::empty(), M::empty())
    }
}
