// libnfcee-rs/libnfcee/src/manager/discovery.rs
//! NFCEE discovery, mode set and power-mode restore.

use log::{debug, error, info, warn};

use super::{ConfigStatus, EmState, Manager};
use crate::dispatch::DiscoverReqEntry;
use crate::events::{DiscoverRequestInfo, EeEvent, ListenerId};
use crate::timer::TimerId;
use crate::types::{
    ActionTrigger, ConnState, EeId, EeInterface, EeMode, EeStatus, EeTlv, ListenTech, Status,
};
use crate::{Error, Result};

impl Manager {
    /// Start NFCEE discovery; `Enabled` is broadcast once every announced EE
    /// has been reported.
    pub fn enable(&mut self) -> Result<()> {
        if self.em_state != EmState::Init {
            warn!("enable ignored in {}", self.em_state.name());
            return Err(Error::UnexpectedState {
                event: "enable",
                state: self.em_state.name(),
            });
        }
        self.table.reset();
        self.expected = 0;
        self.transport.nfcee_discover(true)?;
        let timeout = self.config.discovery_timeout;
        self.arm_timer(TimerId::DiscoveryTimeout, timeout);
        debug!("NFCEE discovery started");
        Ok(())
    }

    /// Re-run discovery on behalf of `listener`, which receives `Discovered`
    /// when all notifications are in.
    pub fn discover(&mut self, listener: ListenerId) -> Result<()> {
        if !self.listeners.contains(listener) {
            return Err(Error::InvalidParam(format!("{} is not registered", listener)));
        }
        if self.armed.contains(&TimerId::DiscoveryTimeout) {
            self.cancel_timer(TimerId::DiscoveryTimeout);
            self.transport.nfcee_discover(false)?;
        }

        let started = self.disc_listener.is_none() && self.transport.nfcee_discover(true).is_ok();
        if started {
            self.disc_listener = Some(listener);
            return Ok(());
        }
        self.listeners.notify(
            listener,
            &EeEvent::Discovered {
                status: Status::Failed,
                ees: Vec::new(),
            },
        );
        Err(Error::Failed("discovery already in progress".into()))
    }

    pub(super) fn on_discovery_response(&mut self, status: Status, count: u8) {
        debug!(
            "discovery response {:?} count {} in {}",
            status,
            count,
            self.em_state.name()
        );
        self.expected = if status.is_ok() { count as usize } else { 0 };
        if self.expected > self.table.capacity() {
            error!(
                "{} NFCEEs announced, only {} can be tracked",
                self.expected,
                self.table.capacity()
            );
        }

        // a failed response announces nothing, so the phase ends here
        let nothing_expected = self.expected == 0;
        if !status.is_ok() {
            self.cancel_timer(TimerId::DiscoveryTimeout);
        }
        let mut notify_enable = false;
        match self.em_state {
            EmState::Init => {
                if nothing_expected {
                    self.em_state = EmState::InitDone;
                    notify_enable = true;
                }
            }
            // slots are claimed as notifications arrive
            EmState::InitDone => {}
            EmState::Restoring => {
                if nothing_expected {
                    self.remove_pending();
                    self.try_finish_restore();
                }
            }
            EmState::Disabling => {
                warn!("discovery response ignored while disabling");
                return;
            }
        }
        self.report_disc_done(notify_enable);
    }

    pub(super) fn on_discovery_notification(
        &mut self,
        ee: EeId,
        status: EeStatus,
        interfaces: Vec<EeInterface>,
        tlvs: Vec<EeTlv>,
    ) {
        debug!(
            "discovery notification EE {} {:?} in {} (expecting {})",
            ee,
            status,
            self.em_state.name(),
            self.expected
        );
        if self.em_state == EmState::Disabling {
            warn!("discovery notification for {} ignored while disabling", ee);
            return;
        }

        if self.expected > 0 {
            self.expected -= 1;
            if self.expected == 0 && self.disc_listener.is_some() {
                if let Err(e) = self.transport.nfcee_discover(false) {
                    warn!("stopping discovery failed: {}", e);
                }
            }
        }

        let mut notify_enable = false;
        let mut new_ee = false;
        let slot = if ee.is_dh() || !ee.is_valid() {
            warn!("discovery notification with reserved id {}", ee);
            None
        } else {
            match self.em_state {
                EmState::Init => {
                    let slot = self
                        .table
                        .find_by_ee_id(ee)
                        .or_else(|| self.table.allocate(ee));
                    if self.expected == 0 {
                        self.em_state = EmState::InitDone;
                        notify_enable = true;
                    }
                    slot
                }
                _ => match self.table.find_by_ee_id(ee) {
                    Some(i) => {
                        new_ee = self.em_state == EmState::InitDone
                            && self.table.get(i).map(|cb| cb.order_pending).unwrap_or(false);
                        Some(i)
                    }
                    None => {
                        let slot = self.table.allocate(ee);
                        new_ee = slot.is_some();
                        slot
                    }
                },
            }
        };

        let restoring = self.em_state == EmState::Restoring;
        match slot {
            Some(idx) => {
                let (hci, order_pending) = match self.table.get_mut(idx) {
                    Some(cb) => {
                        cb.id = ee;
                        cb.status = status;
                        cb.interfaces = interfaces;
                        cb.tlvs = tlvs;
                        cb.restoring = false;
                        (Self::first_interface_is_hci(cb), cb.order_pending)
                    }
                    None => return,
                };

                // the HCI module restores HCI-access EEs itself
                if restoring && !hci && !self.wait_hci {
                    self.restore_one_ecb(idx);
                }

                if self.disc_listener.is_none() && new_ee {
                    self.announce_new_ee(idx);
                } else {
                    self.report_disc_done(notify_enable);
                }

                if order_pending {
                    if let Some(cb) = self.table.get_mut(idx) {
                        cb.order_pending = false;
                    }
                    self.report_discover_req();
                }
            }
            None => {
                if !ee.is_dh() && ee.is_valid() {
                    error!("no free control block for EE {}", ee);
                }
                self.report_disc_done(notify_enable);
            }
        }

        if restoring && self.expected == 0 {
            self.remove_pending();
            self.try_finish_restore();
        }

        // every slot is filled; nothing more can be discovered
        if self.em_state == EmState::InitDone
            && self.table.active_count() == self.table.capacity()
            && self.armed.contains(&TimerId::DiscoveryTimeout)
        {
            self.cancel_timer(TimerId::DiscoveryTimeout);
            self.on_discovery_timeout();
        }
    }

    fn announce_new_ee(&mut self, idx: usize) {
        let Some(cb) = self.table.get(idx) else {
            return;
        };
        if cb.status == EeStatus::Removed {
            return;
        }
        if self.dm_active {
            let info = cb.info();
            info!("new EE {}", cb.id);
            self.listeners.broadcast(&EeEvent::NewEe(info));
        } else {
            debug!("new EE {} deferred until device management is active", cb.id);
            self.deferred_new_ee.push(cb.id);
        }
    }

    /// Called whenever discovery may have finished.
    fn report_disc_done(&mut self, notify_enable: bool) {
        if self.expected != 0 {
            return;
        }
        if notify_enable && self.em_state == EmState::InitDone {
            info!(
                "EE manager enabled with {} NFCEE(s)",
                self.table.active_count()
            );
            self.listeners.broadcast(&EeEvent::Enabled);
        }
        if let Some(listener) = self.disc_listener.take() {
            let ees = self.ee_info();
            self.listeners.notify(
                listener,
                &EeEvent::Discovered {
                    status: Status::Ok,
                    ees,
                },
            );
        }
    }

    pub(super) fn on_discovery_timeout(&mut self) {
        info!("NFCEE discovery window closed in {}", self.em_state.name());
        if let Err(e) = self.transport.nfcee_discover(false) {
            warn!("stopping discovery failed: {}", e);
        }
        match self.em_state {
            EmState::Init => {
                warn!("{} NFCEE notification(s) never arrived", self.expected);
                self.expected = 0;
                self.em_state = EmState::InitDone;
                self.report_disc_done(true);
            }
            EmState::Restoring => {
                self.expected = 0;
                self.remove_pending();
                self.try_finish_restore();
                self.report_disc_done(false);
            }
            EmState::InitDone if self.expected != 0 => {
                self.expected = 0;
                self.report_disc_done(false);
            }
            _ => {}
        }
    }

    /// Activate or deactivate an NFCEE. The outcome is reported as
    /// `ModeSet` when the controller responds.
    pub fn set_mode(&mut self, ee: EeId, mode: EeMode) -> Result<()> {
        let idx = self.ee_slot(ee)?;

        // the logical connection goes before the NFCEE does
        if mode == EeMode::Deactivate {
            let connected = self
                .table
                .get(idx)
                .is_some_and(|cb| cb.connection == ConnState::Connected);
            if connected {
                self.close_connection(idx)?;
            }
        }

        self.transport.nfcee_mode_set(ee, mode)?;
        debug!("mode set {:?} for EE {}", mode, ee);
        if let Some(cb) = self.table.get_mut(idx) {
            cb.status = match mode {
                EeMode::Activate => EeStatus::Pending,
                EeMode::Deactivate => EeStatus::Inactive,
            };
        }
        Ok(())
    }

    pub(super) fn on_mode_set_response(&mut self, ee: EeId, status: Status, mode: EeMode) {
        let Some(idx) = self.table.find_by_ee_id(ee).filter(|_| !ee.is_dh()) else {
            error!("mode set response for unknown EE {}", ee);
            return;
        };

        // routing follows the EE's new mode
        self.start_debounce();

        let Some(cb) = self.table.get_mut(idx) else {
            return;
        };
        if status.is_ok() {
            match mode {
                EeMode::Activate => cb.status = EeStatus::Active,
                EeMode::Deactivate => {
                    if cb.has_routing() {
                        debug!("EE {} deactivated with routing; forcing update", ee);
                        cb.configured = false;
                        self.config_status |= ConfigStatus::CHANGED_ROUTING;
                    }
                    cb.clear_routing();
                    cb.status = EeStatus::Inactive;
                }
            }
        } else if cb.status == EeStatus::Pending {
            cb.status = EeStatus::Inactive;
        }
        debug!("EE {} mode set {:?}: now {:?}", ee, status, cb.status);

        if cb.restore_pending {
            let reconnect = if cb.connection == ConnState::Connected
                && !Self::first_interface_is_hci(cb)
            {
                cb.use_interface
            } else {
                None
            };
            if let Some(interface) = reconnect {
                match self.transport.conn_create(ee, interface) {
                    Ok(()) => return,
                    Err(e) => warn!("restore reconnect to {} failed: {}", ee, e),
                }
            }
            if let Some(cb) = self.table.get_mut(idx) {
                cb.restore_pending = false;
            }
            self.try_finish_restore();
            return;
        }

        let event = EeEvent::ModeSet {
            handle: ee.handle(),
            status,
            ee_status: cb.status,
        };
        let inactive = cb.status == EeStatus::Inactive;
        self.report_to_ecb(idx, &event);
        if inactive {
            self.report_discover_req();
        }
    }

    // ---- power-mode restore -------------------------------------------------

    pub(super) fn start_restore(&mut self) {
        if self.em_state != EmState::InitDone {
            warn!("power mode restore ignored in {}", self.em_state.name());
            return;
        }
        info!("NFCC back to full power, restoring NFCEEs");
        self.em_state = EmState::Restoring;
        self.expected = 0;
        self.restore_active = true;
        self.wait_hci = self.config.wait_for_hci;

        for idx in self.table.ee_slots() {
            let Some(cb) = self.table.get_mut(idx) else {
                continue;
            };
            cb.old_status = None;
            if !Self::first_interface_is_hci(cb) && cb.status != EeStatus::Removed {
                cb.restoring = true;
                cb.old_status = Some(cb.status);
                cb.restore_pending = true;
            }
        }

        if let Err(e) = self.transport.nfcee_discover(true) {
            warn!("restore discovery failed: {}", e);
        }
        let timeout = self.config.discovery_timeout;
        self.arm_timer(TimerId::DiscoveryTimeout, timeout);
    }

    /// Bring one re-notified EE back to its pre-power-down mode and
    /// connection.
    fn restore_one_ecb(&mut self, idx: usize) {
        let Some(cb) = self.table.get_mut(idx) else {
            return;
        };
        let Some(old) = cb.old_status.take() else {
            return;
        };
        let (id, status, connected, interface) = (
            cb.id,
            cb.status,
            cb.connection == ConnState::Connected,
            cb.use_interface,
        );

        let mode = match old {
            EeStatus::Active | EeStatus::Pending => Some(EeMode::Activate),
            EeStatus::Inactive => Some(EeMode::Deactivate),
            EeStatus::Removed => None,
        };
        let wanted = if old == EeStatus::Pending {
            EeStatus::Active
        } else {
            old
        };
        if let Some(mode) = mode.filter(|_| wanted != status && status != EeStatus::Removed) {
            debug!("restoring EE {} to {:?}", id, wanted);
            match self.transport.nfcee_mode_set(id, mode) {
                Ok(()) => return,
                Err(e) => warn!("restore mode set for {} failed: {}", id, e),
            }
        } else if let Some(interface) = interface.filter(|_| connected) {
            debug!("reconnecting EE {}", id);
            match self.transport.conn_create(id, interface) {
                Ok(()) => return,
                Err(e) => warn!("restore reconnect to {} failed: {}", id, e),
            }
        }

        if let Some(cb) = self.table.get_mut(idx) {
            cb.restore_pending = false;
        }
        self.try_finish_restore();
    }

    /// The HCI network is back; run the restores that were held for it.
    pub fn hci_restored(&mut self) {
        if !self.wait_hci {
            debug!("HCI restored; nothing was waiting");
            return;
        }
        self.wait_hci = false;
        if self.em_state != EmState::Restoring {
            return;
        }
        let ready: Vec<usize> = self
            .table
            .ee_slots()
            .into_iter()
            .filter(|&i| {
                self.table.get(i).is_some_and(|cb| {
                    !cb.restoring && cb.old_status.is_some() && !Self::first_interface_is_hci(cb)
                })
            })
            .collect();
        for idx in ready {
            self.restore_one_ecb(idx);
        }
        self.try_finish_restore();
    }

    /// Drop EEs that did not come back after power-down.
    fn remove_pending(&mut self) {
        let removed = self.table.remove_restoring();
        for ee in &removed {
            info!("EE {} did not reappear; removed", ee);
        }
        self.deferred_new_ee.retain(|ee| !removed.contains(ee));
    }

    /// Finish the restore once discovery and every per-EE restore are done.
    pub(super) fn try_finish_restore(&mut self) {
        if !self.restore_active || self.em_state != EmState::Restoring || self.expected != 0 {
            return;
        }
        let busy = self.table.iter().any(|cb| {
            !cb.is_unused()
                && !cb.id.is_dh()
                && !Self::first_interface_is_hci(cb)
                && (cb.restoring || cb.old_status.is_some() || cb.restore_pending)
        });
        if busy {
            return;
        }

        self.restore_active = false;
        self.em_state = EmState::InitDone;
        if self.config_status.contains(ConfigStatus::PREV_ROUTING) || self.need_recfg() {
            self.update_now();
        }
        info!("power mode restore complete");
        self.listeners.broadcast(&EeEvent::PowerModeRestored);
    }

    // ---- discover-request and action notifications --------------------------

    pub(super) fn on_discover_request(&mut self, entries: &[DiscoverReqEntry]) {
        let mut last_order_pending = None;
        for entry in entries {
            if entry.ee.is_dh() || !entry.ee.is_valid() {
                warn!("discover request for reserved id {}", entry.ee);
                continue;
            }
            let idx = match self.table.find_by_ee_id(entry.ee) {
                Some(i) => i,
                None => match self.table.allocate(entry.ee) {
                    Some(i) => {
                        debug!("discover request before discovery of {}", entry.ee);
                        if let Some(cb) = self.table.get_mut(i) {
                            cb.order_pending = true;
                        }
                        i
                    }
                    None => {
                        error!("no free control block for EE {}", entry.ee);
                        continue;
                    }
                },
            };
            if let Some(cb) = self.table.get_mut(idx) {
                cb.discover_req = true;
                cb.listen.apply(entry.tech, entry.op, entry.protocol);
                last_order_pending = Some(cb.order_pending);
            }
        }

        if last_order_pending == Some(false) {
            self.report_discover_req();
        }
    }

    /// Listen protocols requested by active EEs.
    pub(super) fn build_discover_req(&self) -> Vec<DiscoverRequestInfo> {
        self.table
            .ee_slots()
            .into_iter()
            .filter_map(|i| self.table.get(i))
            .filter(|cb| cb.status == EeStatus::Active && cb.discover_req)
            .map(|cb| {
                let listen = [
                    (ListenTech::A, cb.listen.a),
                    (ListenTech::B, cb.listen.b),
                    (ListenTech::F, cb.listen.f),
                    (ListenTech::BPrime, cb.listen.b_prime),
                ]
                .into_iter()
                .filter_map(|(tech, proto)| proto.map(|p| (tech, p)))
                .collect();
                DiscoverRequestInfo {
                    handle: cb.id.handle(),
                    listen,
                }
            })
            .collect()
    }

    fn report_discover_req(&mut self) {
        if !self.dm_active {
            debug!("discover request event held: device management not active");
            return;
        }
        let aggregate = self.build_discover_req();
        self.listeners
            .broadcast(&EeEvent::DiscoverRequest(aggregate));
    }

    pub(super) fn on_action(&mut self, ee: EeId, trigger: ActionTrigger, params: Vec<u8>) {
        debug!("action {:?} from EE {}", trigger, ee);
        self.listeners.broadcast(&EeEvent::Action {
            handle: ee.handle(),
            trigger,
            params,
        });
    }
}
