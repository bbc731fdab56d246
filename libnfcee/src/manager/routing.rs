// libnfcee-rs/libnfcee/src/manager/routing.rs
//! Routing configuration requests and the debounced push to the NFCC.

use log::{debug, error, info, warn};

use super::{ConfigStatus, EmState, Manager};
use crate::ecb::{AidRouteInfo, DirtyFlags, InsertOutcome};
use crate::events::EeEvent;
use crate::routing::serializer;
use crate::timer::TimerId;
use crate::types::{Aid, EeId, PowerRouting, PowerStates, ProtoMask, Status, TechMask};
use crate::{Error, Result};

impl Manager {
    /// Replace the technology routing of `ee` (the DH included).
    pub fn set_tech_config(
        &mut self,
        ee: EeId,
        switch_on: TechMask,
        switch_off: TechMask,
        battery_off: TechMask,
    ) -> Result<()> {
        let idx = self.table.find_by_ee_id(ee).ok_or(Error::UnknownEe(ee))?;
        let routing = PowerRouting::new(switch_on, switch_off, battery_off);
        if let Some(cb) = self.table.get_mut(idx) {
            // clearing a previously set mask is a change too
            if !routing.is_empty() || !cb.tech.is_empty() {
                cb.dirty |= DirtyFlags::TECH;
            }
            if !routing.is_empty() {
                cb.configured = true;
            }
            cb.tech = routing;
        }
        debug!(
            "EE {} tech on={:?} off={:?} batt={:?}",
            ee, switch_on, switch_off, battery_off
        );
        self.start_debounce();
        self.report_to_ecb(idx, &EeEvent::TechConfigSet { status: Status::Ok });
        Ok(())
    }

    /// Replace the protocol routing of `ee` (the DH included).
    pub fn set_proto_config(
        &mut self,
        ee: EeId,
        switch_on: ProtoMask,
        switch_off: ProtoMask,
        battery_off: ProtoMask,
    ) -> Result<()> {
        let idx = self.table.find_by_ee_id(ee).ok_or(Error::UnknownEe(ee))?;
        let routing = PowerRouting::new(switch_on, switch_off, battery_off);
        if let Some(cb) = self.table.get_mut(idx) {
            if !routing.is_empty() || !cb.proto.is_empty() {
                cb.dirty |= DirtyFlags::PROTO;
            }
            if !routing.is_empty() {
                cb.configured = true;
            }
            cb.proto = routing;
        }
        debug!(
            "EE {} proto on={:?} off={:?} batt={:?}",
            ee, switch_on, switch_off, battery_off
        );
        self.start_debounce();
        self.report_to_ecb(idx, &EeEvent::ProtoConfigSet { status: Status::Ok });
        Ok(())
    }

    /// Route `aid` to `ee`. An AID routed to another EE must be removed there
    /// first.
    pub fn add_aid(&mut self, ee: EeId, aid: Aid, power: PowerStates) -> Result<()> {
        let idx = self.table.find_by_ee_id(ee).ok_or(Error::UnknownEe(ee))?;

        let owner = self
            .table
            .iter()
            .find(|cb| !cb.is_unused() && cb.id != ee && cb.aids.contains(&aid))
            .map(|cb| cb.id);
        if let Some(owner) = owner {
            let err = Error::SemanticError {
                aid: aid.to_hex(),
                owner,
            };
            warn!("{}", err);
            self.report_failure(Some(idx), &EeEvent::AidAdded { status: (&err).into() });
            return Err(err);
        }

        let outcome = match self.table.get_mut(idx) {
            Some(cb) => cb.aids.insert(aid.clone(), power, AidRouteInfo::ROUTE),
            None => return Err(Error::UnknownEe(ee)),
        };
        match outcome {
            Ok(InsertOutcome::Appended) => debug!("AID {} added to {}", aid, ee),
            Ok(InsertOutcome::Updated) => debug!("AID {} on {} updated", aid, ee),
            Err(err) => {
                warn!("AID {} rejected for {}: {}", aid, ee, err);
                self.report_failure(Some(idx), &EeEvent::AidAdded { status: (&err).into() });
                return Err(err);
            }
        }

        if let Some(cb) = self.table.get_mut(idx) {
            cb.dirty |= DirtyFlags::AID;
            cb.configured = true;
        }
        self.start_debounce();
        self.report_to_ecb(idx, &EeEvent::AidAdded { status: Status::Ok });
        Ok(())
    }

    /// Stop routing `aid` to `ee`.
    pub fn remove_aid(&mut self, ee: EeId, aid: &Aid) -> Result<()> {
        let idx = self.table.find_by_ee_id(ee).ok_or(Error::UnknownEe(ee))?;
        let removed = self.table.get_mut(idx).and_then(|cb| {
            let entry = cb.aids.remove(aid)?;
            if entry.route_info.contains(AidRouteInfo::ROUTE) {
                cb.dirty |= DirtyFlags::AID;
            }
            if entry.route_info.contains(AidRouteInfo::VS) {
                cb.dirty |= DirtyFlags::VS;
            }
            cb.configured = true;
            Some(entry)
        });

        if removed.is_none() {
            let err = Error::InvalidParam(format!("AID {} is not routed to {}", aid, ee));
            debug!("{}", err);
            self.report_failure(Some(idx), &EeEvent::AidRemoved { status: (&err).into() });
            return Err(err);
        }

        debug!("AID {} removed from {}", aid, ee);
        self.start_debounce();
        self.report_to_ecb(idx, &EeEvent::AidRemoved { status: Status::Ok });
        Ok(())
    }

    /// Push routing now instead of waiting for the debounce timer.
    pub fn update_now(&mut self) {
        self.cancel_timer(TimerId::RoutingDebounce);
        self.config_status |= ConfigStatus::UPDATE_NOW;
        self.on_routing_timeout();
    }

    pub(super) fn on_routing_timeout(&mut self) {
        if matches!(self.em_state, EmState::Restoring | EmState::Disabling) {
            debug!("routing push held in {}", self.em_state.name());
            return;
        }
        if !self.need_recfg() {
            debug!("routing unchanged; nothing to push");
            return;
        }
        self.push_routing();
    }

    /// A push is due when forced, when routing changed outside the dirty
    /// bits, or when a configured block has pending changes.
    pub(super) fn need_recfg(&self) -> bool {
        self.config_status
            .intersects(ConfigStatus::UPDATE_NOW | ConfigStatus::CHANGED_ROUTING)
            || self
                .table
                .iter()
                .any(|cb| cb.configured && !cb.dirty.is_empty())
    }

    fn push_routing(&mut self) {
        let limit = self
            .transport
            .max_routing_table_size()
            .min(self.config.max_tlv_size);
        let chunks = match serializer::build(&self.table, limit) {
            Ok(chunks) => chunks,
            Err(err) => {
                error!("routing table rejected: {}", err);
                self.listeners
                    .broadcast(&EeEvent::RoutingError { status: (&err).into() });
                return;
            }
        };

        let prev = self.config_status.contains(ConfigStatus::PREV_ROUTING);
        if chunks.is_empty() {
            if prev {
                // wipe what the controller still holds
                if let Err(err) = self.transport.set_routing(false, EeId::DH, 0, &[]) {
                    error!("clearing routing failed: {}", err);
                    self.listeners
                        .broadcast(&EeEvent::RoutingError { status: Status::Failed });
                    return;
                }
            }
        } else {
            for chunk in &chunks {
                if let Err(err) =
                    self.transport
                        .set_routing(chunk.more, chunk.ee, chunk.tlv_count, &chunk.tlvs)
                {
                    // earlier chunks went out with `more` set; the retry
                    // resends the whole table and ends that batch
                    error!("routing push for {} failed: {}", chunk.ee, err);
                    self.listeners
                        .broadcast(&EeEvent::RoutingError { status: Status::Failed });
                    return;
                }
            }
        }

        self.config_status = if chunks.is_empty() {
            ConfigStatus::empty()
        } else {
            ConfigStatus::PREV_ROUTING
        };
        for cb in self.table.iter_mut() {
            cb.dirty = DirtyFlags::empty();
            cb.recompute_configured();
        }

        if prev || !chunks.is_empty() {
            info!("routing updated ({} chunk(s))", chunks.len());
            self.listeners
                .broadcast(&EeEvent::RoutingUpdated { status: Status::Ok });
        }
    }
}
