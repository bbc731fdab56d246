// libnfcee-rs/libnfcee/src/manager/mod.rs
//! The EE manager: control-block table, discovery state machine, routing
//! accumulator and connection bookkeeping behind one `&mut self`.

use std::collections::HashSet;
use std::time::Duration;

use bitflags::bitflags;
use log::{debug, info, warn};

use crate::config::Config;
use crate::dispatch::{Command, Message, NciEvent};
use crate::ecb::{ControlBlock, EcbTable};
use crate::events::{EeEvent, EeInfo, EeListener, ListenerId, ListenerRegistry};
use crate::timer::{Scheduler, TimerId};
use crate::transport::NciTransport;
use crate::types::{EeId, EeInterface, EeStatus, PowerMode, PowerState, Status, TechMask};
use crate::{Error, Result};

mod connection;
mod discovery;
mod routing;

/// Discovery phase of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmState {
    /// Enabled, waiting for the first discovery to finish.
    Init,
    /// Discovery finished; normal operation.
    InitDone,
    /// Re-validating EEs after the NFCC returned to full power.
    Restoring,
    /// Waiting for connections to close before tearing down.
    Disabling,
}

impl EmState {
    /// Name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::InitDone => "InitDone",
            Self::Restoring => "Restoring",
            Self::Disabling => "Disabling",
        }
    }
}

bitflags! {
    /// Whether a routing push is needed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConfigStatus: u8 {
        /// Routing changed outside the per-EE dirty bits (e.g. deactivation).
        const CHANGED_ROUTING = 0x01;
        /// The controller currently holds a non-empty routing table.
        const PREV_ROUTING    = 0x02;
        /// Push on the next routing check regardless of dirty bits.
        const UPDATE_NOW      = 0x04;
    }
}

/// NFC-EE routing and configuration manager.
pub struct Manager {
    config: Config,
    table: EcbTable,
    em_state: EmState,
    /// Discovery notifications still expected.
    expected: usize,
    config_status: ConfigStatus,
    listeners: ListenerRegistry,
    /// Listener waiting on an API-triggered discovery.
    disc_listener: Option<ListenerId>,
    dm_active: bool,
    /// New EEs found before device management became active.
    deferred_new_ee: Vec<EeId>,
    /// Non-HCI restores wait for `Command::HciRestored`.
    wait_hci: bool,
    /// A power-mode restore is in progress and not yet reported.
    restore_active: bool,
    /// Connections still closing during disable.
    pending_closes: usize,
    transport: Box<dyn NciTransport>,
    timers: Box<dyn Scheduler>,
    /// Timers armed by this manager and not yet consumed.
    armed: HashSet<TimerId>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("em_state", &self.em_state)
            .field("expected", &self.expected)
            .field("config_status", &self.config_status)
            .field("active_ees", &self.table.active_count())
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl Manager {
    /// Manager in `Init`; call [`Manager::enable`] to start discovery.
    pub fn new(
        config: Config,
        transport: Box<dyn NciTransport>,
        timers: Box<dyn Scheduler>,
    ) -> Self {
        let table = EcbTable::new(config.max_ee, config.aid_table_budget);
        let listeners = ListenerRegistry::new(config.max_listeners);
        let wait_hci = config.wait_for_hci;
        Self {
            config,
            table,
            em_state: EmState::Init,
            expected: 0,
            config_status: ConfigStatus::empty(),
            listeners,
            disc_listener: None,
            dm_active: false,
            deferred_new_ee: Vec::new(),
            wait_hci,
            restore_active: false,
            pending_closes: 0,
            transport,
            timers,
            armed: HashSet::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current discovery phase.
    pub fn em_state(&self) -> EmState {
        self.em_state
    }

    /// Routing push bookkeeping.
    pub fn config_status(&self) -> ConfigStatus {
        self.config_status
    }

    /// Control-block table.
    pub fn table(&self) -> &EcbTable {
        &self.table
    }

    /// Discovery notifications still expected.
    pub fn expected_discovery_count(&self) -> usize {
        self.expected
    }

    /// Control block of `ee`, DH included.
    pub fn ecb(&self, ee: EeId) -> Option<&ControlBlock> {
        self.table.find_by_ee_id(ee).and_then(|i| self.table.get(i))
    }

    /// Process one message to completion.
    pub fn handle(&mut self, msg: Message) {
        match msg {
            Message::Command(cmd) => self.handle_command(cmd),
            Message::Nci(ev) => self.handle_nci(ev),
            Message::TimerExpired(id) => self.on_timer(id),
            Message::PowerMode(mode) => self.on_power_mode(mode),
            Message::DmActive(active) => self.set_dm_active(active),
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        let name = cmd.name();
        let res = match cmd {
            Command::Enable => self.enable(),
            Command::Disable => {
                self.disable();
                Ok(())
            }
            Command::Discover(l) => self.discover(l),
            Command::Register(l) => self.register(l).map(|_| ()),
            Command::Deregister(l) => self.deregister(l),
            Command::SetMode { ee, mode } => self.set_mode(ee, mode),
            Command::SetTechConfig { ee, routing } => self.set_tech_config(
                ee,
                routing.switch_on,
                routing.switch_off,
                routing.battery_off,
            ),
            Command::SetProtoConfig { ee, routing } => self.set_proto_config(
                ee,
                routing.switch_on,
                routing.switch_off,
                routing.battery_off,
            ),
            Command::AddAid { ee, aid, power } => self.add_aid(ee, aid, power),
            Command::RemoveAid { ee, aid } => self.remove_aid(ee, &aid),
            Command::UpdateNow => {
                self.update_now();
                Ok(())
            }
            Command::Connect {
                ee,
                interface,
                listener,
            } => self.connect(ee, interface, listener),
            Command::SendData { ee, data } => self.send_data(ee, data),
            Command::Disconnect { ee } => self.disconnect(ee),
            Command::HciRestored => {
                self.hci_restored();
                Ok(())
            }
        };
        if let Err(e) = res {
            debug!("{} failed: {}", name, e);
        }
    }

    fn handle_nci(&mut self, ev: NciEvent) {
        match ev {
            NciEvent::DiscoveryResponse { status, count } => {
                self.on_discovery_response(status, count)
            }
            NciEvent::DiscoveryNotification {
                ee,
                status,
                interfaces,
                tlvs,
            } => self.on_discovery_notification(ee, status, interfaces, tlvs),
            NciEvent::ModeSetResponse { ee, status, mode } => {
                self.on_mode_set_response(ee, status, mode)
            }
            NciEvent::ConnectionCreated { ee, conn, status } => {
                self.on_connection_created(ee, conn, status)
            }
            NciEvent::ConnectionClosed { conn } => self.on_connection_closed(conn),
            NciEvent::DataReceived { conn, data } => self.on_data(conn, data),
            NciEvent::DiscoverRequest(entries) => self.on_discover_request(&entries),
            NciEvent::Action {
                ee,
                trigger,
                params,
            } => self.on_action(ee, trigger, params),
        }
    }

    // ---- listeners -------------------------------------------------------

    /// Register an application listener. The new listener receives
    /// `Registered` followed by the current discover-request aggregate.
    pub fn register(&mut self, mut listener: Box<dyn EeListener>) -> Result<ListenerId> {
        if self.listeners.len() == self.listeners.capacity() {
            warn!("listener table full ({})", self.listeners.capacity());
            listener.on_event(&EeEvent::Registered {
                status: Status::Failed,
                listener: None,
            });
            return Err(Error::ListenerTableFull {
                capacity: self.listeners.capacity(),
            });
        }

        let id = self.listeners.register(listener)?;
        self.listeners.notify(
            id,
            &EeEvent::Registered {
                status: Status::Ok,
                listener: Some(id),
            },
        );
        let aggregate = self.build_discover_req();
        self.listeners
            .notify(id, &EeEvent::DiscoverRequest(aggregate));
        Ok(id)
    }

    /// Remove a listener and every control-block reference to it.
    pub fn deregister(&mut self, id: ListenerId) -> Result<()> {
        let mut listener = self
            .listeners
            .deregister(id)
            .ok_or_else(|| Error::InvalidParam(format!("{} is not registered", id)))?;

        for cb in self.table.iter_mut() {
            if cb.listener == Some(id) {
                cb.listener = None;
            }
        }
        if self.disc_listener == Some(id) {
            self.disc_listener = None;
        }
        listener.on_event(&EeEvent::Deregistered);
        Ok(())
    }

    /// Registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver to the control block's listener, or to everyone when it has
    /// none.
    fn report_to_ecb(&mut self, idx: usize, event: &EeEvent) {
        let target = self.table.get(idx).and_then(|cb| cb.listener);
        self.listeners.report(target, event);
    }

    /// Failure of an application request: only the control block's own
    /// listener hears about it; the caller already has the `Err`.
    fn report_failure(&mut self, idx: Option<usize>, event: &EeEvent) {
        let target = idx
            .and_then(|i| self.table.get(i))
            .and_then(|cb| cb.listener);
        if let Some(id) = target {
            self.listeners.notify(id, event);
        }
    }

    // ---- device management ----------------------------------------------

    fn set_dm_active(&mut self, active: bool) {
        debug!("device management active: {}", active);
        self.dm_active = active;
        if !active {
            return;
        }
        for ee in std::mem::take(&mut self.deferred_new_ee) {
            let info = match self.ecb(ee) {
                Some(cb) if cb.status != EeStatus::Removed => cb.info(),
                _ => continue,
            };
            self.listeners.broadcast(&EeEvent::NewEe(info));
        }
    }

    fn on_power_mode(&mut self, mode: PowerMode) {
        match mode {
            PowerMode::Full => self.start_restore(),
            PowerMode::Low => debug!("NFCC entering low power"),
        }
    }

    /// Tear down: close every open connection, then report `Disabled`.
    pub fn disable(&mut self) {
        info!("disabling EE manager in {}", self.em_state.name());
        self.em_state = EmState::Disabling;
        self.cancel_timer(TimerId::RoutingDebounce);
        if self.armed.contains(&TimerId::DiscoveryTimeout) {
            self.cancel_timer(TimerId::DiscoveryTimeout);
            if let Err(e) = self.transport.nfcee_discover(false) {
                warn!("stopping discovery failed: {}", e);
            }
        }
        self.pending_closes = self.close_all_connections();
        if self.pending_closes == 0 {
            self.finish_disable();
        }
    }

    fn finish_disable(&mut self) {
        self.table.reset();
        self.config_status = ConfigStatus::empty();
        self.expected = 0;
        self.disc_listener = None;
        self.deferred_new_ee.clear();
        self.restore_active = false;
        self.em_state = EmState::Init;
        info!("EE manager disabled");
        self.listeners.broadcast(&EeEvent::Disabled);
    }

    // ---- timers -----------------------------------------------------------

    fn arm_timer(&mut self, id: TimerId, after: Duration) {
        self.timers.arm(id, after);
        self.armed.insert(id);
    }

    fn cancel_timer(&mut self, id: TimerId) {
        self.timers.cancel(id);
        self.armed.remove(&id);
    }

    fn start_debounce(&mut self) {
        let after = self.config.routing_debounce;
        self.arm_timer(TimerId::RoutingDebounce, after);
    }

    fn on_timer(&mut self, id: TimerId) {
        // a timer re-armed after firing, or cancelled, leaves a stale expiry
        if !self.armed.contains(&id) || self.timers.is_armed(id) {
            debug!("stale {:?} expiry ignored", id);
            return;
        }
        self.armed.remove(&id);
        match id {
            TimerId::RoutingDebounce => self.on_routing_timeout(),
            TimerId::DiscoveryTimeout => self.on_discovery_timeout(),
        }
    }

    // ---- queries ----------------------------------------------------------

    /// Discovered NFCEEs in table order.
    pub fn ee_info(&self) -> Vec<EeInfo> {
        self.table
            .ee_slots()
            .into_iter()
            .filter_map(|i| self.table.get(i))
            .map(ControlBlock::info)
            .collect()
    }

    /// True when `ee` is a known, active NFCEE.
    pub fn is_active(&self, ee: EeId) -> bool {
        !ee.is_dh()
            && self
                .ecb(ee)
                .map(|cb| cb.status == EeStatus::Active)
                .unwrap_or(false)
    }

    /// Destination of technologies A, B and F in `state`. The first active
    /// NFCEE in table order that routes a technology wins; otherwise the DH.
    pub fn tech_route(&self, state: PowerState) -> [EeId; 3] {
        [TechMask::A, TechMask::B, TechMask::F].map(|tech| {
            self.table
                .ee_slots()
                .into_iter()
                .filter_map(|i| self.table.get(i))
                .find(|cb| cb.status == EeStatus::Active && cb.tech.mask_for(state).contains(tech))
                .map(|cb| cb.id)
                .unwrap_or(EeId::DH)
        })
    }

    /// NFCEE slot for a request, rejecting the DH and unknown ids.
    fn ee_slot(&self, ee: EeId) -> Result<usize> {
        if ee.is_dh() {
            return Err(Error::InvalidParam("operation not valid for the DH".into()));
        }
        self.table.find_by_ee_id(ee).ok_or(Error::UnknownEe(ee))
    }

    fn first_interface_is_hci(cb: &ControlBlock) -> bool {
        cb.interfaces.first() == Some(&EeInterface::HciAccess)
    }
}
