// libnfcee-rs/libnfcee/src/ecb/table.rs
//! Control-block table.

use crate::ecb::block::ControlBlock;
use crate::types::{ConnId, ConnState, EeId, EeStatus};

/// Index of the device host block.
pub const DH_SLOT: usize = 0;

/// Fixed-capacity arena of control blocks.
///
/// Slot 0 is the DH; slots `1..=max_ee` hold discovered NFCEEs in the order
/// they were allocated. Table order is routing order.
#[derive(Debug, Clone)]
pub struct EcbTable {
    slots: Vec<ControlBlock>,
}

impl EcbTable {
    /// DH block plus `max_ee` unused slots.
    pub fn new(max_ee: usize, aid_budget: usize) -> Self {
        let mut slots = Vec::with_capacity(max_ee + 1);
        slots.push(ControlBlock::device_host(aid_budget));
        slots.extend((0..max_ee).map(|_| ControlBlock::unused(aid_budget)));
        Self { slots }
    }

    /// NFCEE slots, excluding the DH.
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Block at `idx`.
    pub fn get(&self, idx: usize) -> Option<&ControlBlock> {
        self.slots.get(idx)
    }

    /// Block at `idx`, mutably.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut ControlBlock> {
        self.slots.get_mut(idx)
    }

    /// The DH block.
    pub fn dh(&self) -> &ControlBlock {
        &self.slots[DH_SLOT]
    }

    /// The DH block, mutably.
    pub fn dh_mut(&mut self) -> &mut ControlBlock {
        &mut self.slots[DH_SLOT]
    }

    /// All blocks in routing order, DH first, unused slots included.
    pub fn iter(&self) -> impl Iterator<Item = &ControlBlock> {
        self.slots.iter()
    }

    /// All blocks, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ControlBlock> {
        self.slots.iter_mut()
    }

    /// Slot indices of allocated NFCEE blocks, in table order.
    pub fn ee_slots(&self) -> Vec<usize> {
        (1..self.slots.len())
            .filter(|&i| !self.slots[i].is_unused())
            .collect()
    }

    /// Slot of `id`; the DH is slot 0.
    pub fn find_by_ee_id(&self, id: EeId) -> Option<usize> {
        if id.is_dh() {
            return Some(DH_SLOT);
        }
        if !id.is_valid() {
            return None;
        }
        (1..self.slots.len()).find(|&i| self.slots[i].id == id)
    }

    /// First free NFCEE slot.
    pub fn find_first_unused(&self) -> Option<usize> {
        (1..self.slots.len()).find(|&i| self.slots[i].is_unused())
    }

    /// Slot holding connection `conn`.
    pub fn find_by_conn_id(&self, conn: ConnId) -> Option<usize> {
        self.slots
            .iter()
            .position(|cb| cb.connection != ConnState::None && cb.conn_id == Some(conn))
    }

    /// Claim the first unused slot for `id`. The new block starts Inactive.
    pub fn allocate(&mut self, id: EeId) -> Option<usize> {
        let idx = self.find_first_unused()?;
        let cb = &mut self.slots[idx];
        cb.reset();
        cb.id = id;
        cb.status = EeStatus::Inactive;
        Some(idx)
    }

    /// Number of slots holding a discovered NFCEE.
    pub fn active_count(&self) -> usize {
        self.slots[1..].iter().filter(|cb| !cb.is_unused()).count()
    }

    /// Drop every NFCEE whose `restoring` bit was never cleared. Survivors
    /// shift down keeping their relative order. Returns the removed ids.
    pub fn remove_restoring(&mut self) -> Vec<EeId> {
        let budget = self.dh().aids.budget();
        let capacity = self.capacity();

        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(capacity);
        for cb in self.slots.drain(1..) {
            if cb.is_unused() {
                continue;
            }
            if cb.restoring {
                removed.push(cb.id);
            } else {
                kept.push(cb);
            }
        }

        self.slots.extend(kept);
        while self.slots.len() < capacity + 1 {
            self.slots.push(ControlBlock::unused(budget));
        }
        removed
    }

    /// Return every NFCEE slot to unused and clear DH routing state.
    pub fn reset(&mut self) {
        for cb in self.slots[1..].iter_mut() {
            cb.reset();
        }
        let dh = self.dh_mut();
        let budget = dh.aids.budget();
        *dh = ControlBlock::device_host(budget);
    }
}
