// libnfcee-rs/libnfcee/src/dispatch.rs
//! The single serialized entry point into the manager.
//!
//! Application commands, transport events, timer expiries and
//! device-management signals are all [`Message`]s. The [`Dispatcher`] owns
//! the [`Manager`] and processes one message to completion before taking the
//! next, so transport threads only ever hold a [`Sender`].

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use log::trace;

use crate::events::{EeListener, ListenerId};
use crate::manager::Manager;
use crate::timer::TimerId;
use crate::types::{
    ActionTrigger, Aid, ConnId, DiscoverReqOp, EeId, EeInterface, EeMode, EeStatus, EeTlv,
    ListenTech, PowerMode, PowerRouting, PowerStates, ProtoMask, Status, TechMask,
};

/// Requests from the application layer.
pub enum Command {
    /// Start discovery; see [`Manager::enable`].
    Enable,
    /// Close connections and reset; see [`Manager::disable`].
    Disable,
    /// Re-run NFCEE discovery and report the result to the listener.
    Discover(ListenerId),
    /// Add a listener.
    Register(Box<dyn EeListener>),
    /// Remove a listener.
    Deregister(ListenerId),
    /// Activate or deactivate an NFCEE.
    SetMode {
        ee: EeId,
        mode: EeMode,
    },
    /// Replace an EE's technology routing.
    SetTechConfig {
        ee: EeId,
        routing: PowerRouting<TechMask>,
    },
    /// Replace an EE's protocol routing.
    SetProtoConfig {
        ee: EeId,
        routing: PowerRouting<ProtoMask>,
    },
    /// Route an AID to an EE.
    AddAid {
        ee: EeId,
        aid: Aid,
        power: PowerStates,
    },
    /// Drop an AID route.
    RemoveAid {
        ee: EeId,
        aid: Aid,
    },
    /// Push routing without waiting for the de-bounce.
    UpdateNow,
    /// Open a data connection.
    Connect {
        ee: EeId,
        interface: EeInterface,
        listener: ListenerId,
    },
    /// Send on the open connection.
    SendData {
        ee: EeId,
        data: Vec<u8>,
    },
    /// Close the data connection.
    Disconnect {
        ee: EeId,
    },
    /// The HCI module finished restoring its network; deferred restores run.
    HciRestored,
}

impl Command {
    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Enable => "Enable",
            Self::Disable => "Disable",
            Self::Discover(_) => "Discover",
            Self::Register(_) => "Register",
            Self::Deregister(_) => "Deregister",
            Self::SetMode { .. } => "SetMode",
            Self::SetTechConfig { .. } => "SetTechConfig",
            Self::SetProtoConfig { .. } => "SetProtoConfig",
            Self::AddAid { .. } => "AddAid",
            Self::RemoveAid { .. } => "RemoveAid",
            Self::UpdateNow => "UpdateNow",
            Self::Connect { .. } => "Connect",
            Self::SendData { .. } => "SendData",
            Self::Disconnect { .. } => "Disconnect",
            Self::HciRestored => "HciRestored",
        }
    }
}

/// One entry of an NFCEE discover-request notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverReqEntry {
    /// EE the entry applies to.
    pub ee: EeId,
    /// Listen technology.
    pub tech: ListenTech,
    /// RF protocol requested on that technology.
    pub protocol: u8,
    /// Add or remove.
    pub op: DiscoverReqOp,
}

/// Responses and notifications from the NFCC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NciEvent {
    /// NFCEE_DISCOVER response with the number of EEs to expect.
    DiscoveryResponse {
        status: Status,
        count: u8,
    },
    /// One NFCEE reported during discovery.
    DiscoveryNotification {
        ee: EeId,
        status: EeStatus,
        interfaces: Vec<EeInterface>,
        tlvs: Vec<EeTlv>,
    },
    /// Outcome of a mode set.
    ModeSetResponse {
        ee: EeId,
        status: Status,
        mode: EeMode,
    },
    /// Outcome of a connection create.
    ConnectionCreated {
        ee: EeId,
        conn: ConnId,
        status: Status,
    },
    /// A connection was closed.
    ConnectionClosed {
        conn: ConnId,
    },
    /// Inbound data on a connection.
    DataReceived {
        conn: ConnId,
        data: Vec<u8>,
    },
    /// Listen requirements changed.
    DiscoverRequest(Vec<DiscoverReqEntry>),
    /// An NFCEE reported an action.
    Action {
        ee: EeId,
        trigger: ActionTrigger,
        params: Vec<u8>,
    },
}

impl NciEvent {
    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DiscoveryResponse { .. } => "DiscoveryResponse",
            Self::DiscoveryNotification { .. } => "DiscoveryNotification",
            Self::ModeSetResponse { .. } => "ModeSetResponse",
            Self::ConnectionCreated { .. } => "ConnectionCreated",
            Self::ConnectionClosed { .. } => "ConnectionClosed",
            Self::DataReceived { .. } => "DataReceived",
            Self::DiscoverRequest(_) => "DiscoverRequest",
            Self::Action { .. } => "Action",
        }
    }
}

/// Everything the manager reacts to.
pub enum Message {
    /// From the application.
    Command(Command),
    /// From the NFCC.
    Nci(NciEvent),
    /// A scheduler timer fired.
    TimerExpired(TimerId),
    /// NFCC power mode change reported by device management.
    PowerMode(PowerMode),
    /// Device management finished (or left) its enabled state.
    DmActive(bool),
}

impl Message {
    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Command(c) => c.name(),
            Self::Nci(e) => e.name(),
            Self::TimerExpired(_) => "TimerExpired",
            Self::PowerMode(_) => "PowerMode",
            Self::DmActive(_) => "DmActive",
        }
    }
}

impl From<Command> for Message {
    fn from(c: Command) -> Self {
        Self::Command(c)
    }
}

impl From<NciEvent> for Message {
    fn from(e: NciEvent) -> Self {
        Self::Nci(e)
    }
}

/// Owns the manager and drains its inbound queue in arrival order.
pub struct Dispatcher {
    manager: Manager,
    rx: Receiver<Message>,
}

impl Dispatcher {
    /// Wrap `manager`; the sender feeds its queue.
    pub fn new(manager: Manager) -> (Self, Sender<Message>) {
        let (tx, rx) = mpsc::channel();
        (Self { manager, rx }, tx)
    }

    /// The owned manager.
    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// The owned manager, mutably.
    pub fn manager_mut(&mut self) -> &mut Manager {
        &mut self.manager
    }

    /// Process every message queued so far; returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.rx.try_recv() {
                Ok(msg) => {
                    trace!("dispatch {}", msg.name());
                    self.manager.handle(msg);
                    handled += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return handled,
            }
        }
    }

    /// Block on the queue until every sender is gone, then return the manager.
    pub fn run(mut self) -> Manager {
        while let Ok(msg) = self.rx.recv() {
            trace!("dispatch {}", msg.name());
            self.manager.handle(msg);
        }
        self.manager
    }
}
