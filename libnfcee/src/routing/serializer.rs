// libnfcee-rs/libnfcee/src/routing/serializer.rs
//! Builds the listen-mode routing table from the control-block table.

use log::trace;

use crate::constants::{
    RF_PROTOCOL_ISO_DEP, RF_PROTOCOL_NFC_DEP, RF_PROTOCOL_T1T, RF_PROTOCOL_T2T, RF_PROTOCOL_T3T,
    RF_TECHNOLOGY_A, RF_TECHNOLOGY_B, RF_TECHNOLOGY_F,
};
use crate::ecb::{ControlBlock, EcbTable};
use crate::routing::tlv::RouteTlv;
use crate::types::{EeId, EeStatus, ProtoMask, TechMask};
use crate::utils::bytes_to_hex_spaced;
use crate::{Error, Result};

const TECH_ORDER: [(TechMask, u8); 3] = [
    (TechMask::A, RF_TECHNOLOGY_A),
    (TechMask::B, RF_TECHNOLOGY_B),
    (TechMask::F, RF_TECHNOLOGY_F),
];

const PROTO_ORDER: [(ProtoMask, u8); 5] = [
    (ProtoMask::T1T, RF_PROTOCOL_T1T),
    (ProtoMask::T2T, RF_PROTOCOL_T2T),
    (ProtoMask::T3T, RF_PROTOCOL_T3T),
    (ProtoMask::ISO_DEP, RF_PROTOCOL_ISO_DEP),
    (ProtoMask::NFC_DEP, RF_PROTOCOL_NFC_DEP),
];

/// One `set_routing` command worth of TLVs, all for the same EE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingChunk {
    /// EE the chunk is sent for.
    pub ee: EeId,
    /// Another chunk follows in the same push.
    pub more: bool,
    /// Number of TLVs in `tlvs`.
    pub tlv_count: u8,
    /// Encoded TLVs.
    pub tlvs: Vec<u8>,
}

/// Routing entries contributed by one control block: technologies A, B, F,
/// then protocols, then routed AIDs in insertion order.
pub fn ecb_tlvs(cb: &ControlBlock) -> Vec<RouteTlv> {
    let mut out = Vec::new();

    for (flag, tech) in TECH_ORDER {
        let power = cb.tech.power_cfg(flag);
        if !power.is_empty() {
            out.push(RouteTlv::Technology {
                ee: cb.id,
                power,
                tech,
            });
        }
    }

    for (flag, protocol) in PROTO_ORDER {
        let power = cb.proto.power_cfg(flag);
        if !power.is_empty() {
            out.push(RouteTlv::Protocol {
                ee: cb.id,
                power,
                protocol,
            });
        }
    }

    for entry in cb.aids.routed() {
        out.push(RouteTlv::Aid {
            ee: cb.id,
            power: entry.power,
            aid: entry.aid.clone(),
        });
    }

    out
}

/// Serialize every participating block: the DH first, then active NFCEEs in
/// table order. Blocks without entries produce no chunk.
///
/// Fails with `BufferFull` when the table would exceed `limit` bytes.
pub fn build(table: &EcbTable, limit: usize) -> Result<Vec<RoutingChunk>> {
    let participants = table
        .iter()
        .filter(|cb| !cb.is_unused() && (cb.id.is_dh() || cb.status == EeStatus::Active));

    let mut chunks = Vec::new();
    let mut total = 0usize;
    for cb in participants {
        let entries = ecb_tlvs(cb);
        if entries.is_empty() {
            continue;
        }

        let mut tlvs = Vec::new();
        for tlv in &entries {
            tlv.encode_into(&mut tlvs);
        }
        total += tlvs.len();
        if total > limit {
            return Err(Error::BufferFull {
                needed: total,
                capacity: limit,
            });
        }

        trace!("routing {}: {}", cb.id, bytes_to_hex_spaced(&tlvs));
        chunks.push(RoutingChunk {
            ee: cb.id,
            more: true,
            tlv_count: entries.len() as u8,
            tlvs,
        });
    }

    if let Some(last) = chunks.last_mut() {
        last.more = false;
    }
    Ok(chunks)
}
