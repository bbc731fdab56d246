// libnfcee-rs/libnfcee/src/routing/tlv.rs
//! Listen-mode routing TLVs: `{tag, len, ee_id, power_cfg, value..}`.
//!
//! `len` counts `ee_id`, `power_cfg` and the value, so technology and
//! protocol entries have `len = 3` and AID entries `len = aid_len + 2`.

use crate::constants::{
    MAX_AID_LEN, ROUTE_FIXED_TLV_LEN, ROUTE_TAG_AID, ROUTE_TAG_PROTO, ROUTE_TAG_TECH,
};
use crate::types::{Aid, EeId, PowerStates};
use crate::{Error, Result};

/// A single routing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTlv {
    /// Route an RF technology.
    Technology {
        ee: EeId,
        power: PowerStates,
        tech: u8,
    },
    /// Route an RF protocol.
    Protocol {
        ee: EeId,
        power: PowerStates,
        protocol: u8,
    },
    /// Route an AID.
    Aid {
        ee: EeId,
        power: PowerStates,
        aid: Aid,
    },
}

impl RouteTlv {
    /// Wire tag.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Technology { .. } => ROUTE_TAG_TECH,
            Self::Protocol { .. } => ROUTE_TAG_PROTO,
            Self::Aid { .. } => ROUTE_TAG_AID,
        }
    }

    /// Destination EE.
    pub fn ee(&self) -> EeId {
        match self {
            Self::Technology { ee, .. } | Self::Protocol { ee, .. } | Self::Aid { ee, .. } => *ee,
        }
    }

    fn power(&self) -> PowerStates {
        match self {
            Self::Technology { power, .. }
            | Self::Protocol { power, .. }
            | Self::Aid { power, .. } => *power,
        }
    }

    /// Value of the `len` byte.
    pub fn len_field(&self) -> u8 {
        match self {
            Self::Technology { .. } | Self::Protocol { .. } => ROUTE_FIXED_TLV_LEN,
            Self::Aid { aid, .. } => aid.len() as u8 + 2,
        }
    }

    /// Bytes on the wire including tag and len.
    pub fn encoded_len(&self) -> usize {
        self.len_field() as usize + 2
    }

    /// Append the wire form to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.tag());
        out.push(self.len_field());
        out.push(self.ee().as_u8());
        out.push(self.power().bits());
        match self {
            Self::Technology { tech, .. } => out.push(*tech),
            Self::Protocol { protocol, .. } => out.push(*protocol),
            Self::Aid { aid, .. } => out.extend_from_slice(aid.as_bytes()),
        }
    }

    /// Wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }

    /// Decode one TLV from the front of `buf`, returning it and the bytes
    /// consumed.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < 4 {
            return Err(Error::TlvFormat(format!("truncated header ({} bytes)", buf.len())));
        }
        let tag = buf[0];
        let len = buf[1] as usize;
        if len < 3 {
            return Err(Error::TlvFormat(format!("len {len} too short")));
        }
        let total = len + 2;
        if buf.len() < total {
            return Err(Error::TlvFormat(format!(
                "len {len} exceeds remaining {} bytes",
                buf.len() - 2
            )));
        }

        let ee = EeId::new(buf[2]);
        let power = PowerStates::from_bits_truncate(buf[3]);
        let value = &buf[4..total];
        let tlv = match tag {
            ROUTE_TAG_TECH | ROUTE_TAG_PROTO if len != ROUTE_FIXED_TLV_LEN as usize => {
                return Err(Error::TlvFormat(format!("tag {tag:#04x} with len {len}")));
            }
            ROUTE_TAG_TECH => Self::Technology {
                ee,
                power,
                tech: value[0],
            },
            ROUTE_TAG_PROTO => Self::Protocol {
                ee,
                power,
                protocol: value[0],
            },
            ROUTE_TAG_AID if value.len() <= MAX_AID_LEN => Self::Aid {
                ee,
                power,
                aid: Aid::try_from(value)?,
            },
            _ => {
                return Err(Error::TlvFormat(format!("unexpected tag {tag:#04x} len {len}")));
            }
        };
        Ok((tlv, total))
    }
}

/// Decode a whole routing buffer.
pub fn decode_all(mut buf: &[u8]) -> Result<Vec<RouteTlv>> {
    let mut out = Vec::new();
    while !buf.is_empty() {
        let (tlv, used) = RouteTlv::decode(buf)?;
        out.push(tlv);
        buf = &buf[used..];
    }
    Ok(out)
}
