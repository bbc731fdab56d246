// libnfcee-rs/libnfcee/src/ecb/aid.rs
//! Per-EE AID routing entries.
//!
//! Entries are kept in insertion order because the routing table lists them
//! in that order. Each entry is stored as `4F <len> <aid>` against a fixed
//! byte budget, so a 16-byte AID costs 18 bytes.

use bitflags::bitflags;

use crate::constants::AID_CFG_TAG;
use crate::types::{Aid, PowerStates};
use crate::{Error, Result};

bitflags! {
    /// Which routing categories an AID entry takes part in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AidRouteInfo: u8 {
        /// Listed in the listen-mode routing table.
        const ROUTE = 0x80;
        /// Vendor-specific AID configuration.
        const VS    = 0x40;
    }
}

/// One routed AID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AidEntry {
    /// The AID.
    pub aid: Aid,
    /// Power states the route applies in.
    pub power: PowerStates,
    /// Routing categories.
    pub route_info: AidRouteInfo,
}

impl AidEntry {
    /// Bytes this entry occupies in the table (tag + len + AID).
    pub fn encoded_len(&self) -> usize {
        self.aid.len() + 2
    }
}

/// What [`AidTable::insert`] did with the AID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New entry at the end.
    Appended,
    /// Existing entry updated in place.
    Updated,
}

/// Ordered AID entries of one control block, bounded by a byte budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AidTable {
    entries: Vec<AidEntry>,
    budget: usize,
}

impl AidTable {
    /// Empty table with `budget` bytes.
    pub fn new(budget: usize) -> Self {
        Self {
            entries: Vec::new(),
            budget,
        }
    }

    /// Byte budget.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Bytes consumed by the current entries.
    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(AidEntry::encoded_len).sum()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no AID is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AidEntry> {
        self.entries.iter()
    }

    /// Entries listed in the routing table, in insertion order.
    pub fn routed(&self) -> impl Iterator<Item = &AidEntry> {
        self.entries
            .iter()
            .filter(|e| e.route_info.contains(AidRouteInfo::ROUTE))
    }

    /// Index of `aid`.
    pub fn position(&self, aid: &Aid) -> Option<usize> {
        self.entries.iter().position(|e| &e.aid == aid)
    }

    /// Entry for `aid`.
    pub fn find(&self, aid: &Aid) -> Option<&AidEntry> {
        self.entries.iter().find(|e| &e.aid == aid)
    }

    /// True when `aid` is stored.
    pub fn contains(&self, aid: &Aid) -> bool {
        self.position(aid).is_some()
    }

    /// Add `aid`, or update the power states of an existing entry in place.
    ///
    /// A new entry that does not fit the budget is rejected with
    /// `BufferFull` and the table is left untouched.
    pub fn insert(
        &mut self,
        aid: Aid,
        power: PowerStates,
        route_info: AidRouteInfo,
    ) -> Result<InsertOutcome> {
        if let Some(pos) = self.position(&aid) {
            let entry = &mut self.entries[pos];
            entry.power = power;
            entry.route_info |= route_info;
            return Ok(InsertOutcome::Updated);
        }

        let needed = self.used_bytes() + aid.len() + 2;
        if needed > self.budget {
            return Err(Error::BufferFull {
                needed,
                capacity: self.budget,
            });
        }

        self.entries.push(AidEntry {
            aid,
            power,
            route_info,
        });
        Ok(InsertOutcome::Appended)
    }

    /// Remove `aid`; later entries move down one position.
    pub fn remove(&mut self, aid: &Aid) -> Option<AidEntry> {
        let pos = self.position(aid)?;
        Some(self.entries.remove(pos))
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The table in its stored form: `4F <len> <aid>` per entry.
    pub fn to_cfg_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.used_bytes());
        for e in &self.entries {
            out.push(AID_CFG_TAG);
            out.push(e.aid.len() as u8);
            out.extend_from_slice(e.aid.as_bytes());
        }
        out
    }
}
