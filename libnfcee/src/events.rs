// libnfcee-rs/libnfcee/src/events.rs
//! Application-facing events and the listener registry.

use log::{debug, warn};

use crate::types::{
    ActionTrigger, EeHandle, EeInterface, EeStatus, EeTlv, ListenTech, Status,
};
use crate::{Error, Result};

/// Slot of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display(fmt = "listener#{}", _0)]
pub struct ListenerId(usize);

impl ListenerId {
    /// Slot index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Snapshot of one EE as reported to applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EeInfo {
    /// EE handle.
    pub handle: EeHandle,
    /// Current status.
    pub status: EeStatus,
    /// Supported interfaces.
    pub interfaces: Vec<EeInterface>,
    /// Discovery TLVs.
    pub tlvs: Vec<EeTlv>,
}

/// One entry of the aggregated discover-request event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverRequestInfo {
    /// EE handle.
    pub handle: EeHandle,
    /// Listen technologies with the protocol requested for each.
    pub listen: Vec<(ListenTech, u8)>,
}

/// Events delivered to [`EeListener`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EeEvent {
    /// Outcome of a registration.
    Registered {
        status: Status,
        listener: Option<ListenerId>,
    },
    /// The listener was removed.
    Deregistered,
    /// Result of a discover call.
    Discovered { status: Status, ees: Vec<EeInfo> },
    /// An NFCEE appeared after enable.
    NewEe(EeInfo),
    /// Outcome of a mode set.
    ModeSet {
        handle: EeHandle,
        status: Status,
        ee_status: EeStatus,
    },
    /// Outcome of a connect.
    Connected {
        handle: EeHandle,
        status: Status,
        interface: Option<EeInterface>,
    },
    /// The connection is closed.
    Disconnected { handle: EeHandle },
    /// Inbound data on a connection.
    Data { handle: EeHandle, data: Vec<u8> },
    /// Outcome of add_aid.
    AidAdded { status: Status },
    /// Outcome of remove_aid.
    AidRemoved { status: Status },
    /// Outcome of set_tech_config.
    TechConfigSet { status: Status },
    /// Outcome of set_proto_config.
    ProtoConfigSet { status: Status },
    /// Listen requirements of every active EE.
    DiscoverRequest(Vec<DiscoverRequestInfo>),
    /// An NFCEE reported an action.
    Action {
        handle: EeHandle,
        trigger: ActionTrigger,
        params: Vec<u8>,
    },
    /// Outbound data was dropped for lack of a buffer.
    NoMemoryError,
    /// A routing push failed.
    RoutingError { status: Status },
    /// A request could not be matched to a connection.
    NoCallbackError,
    /// Initial discovery finished.
    Enabled,
    /// Every connection closed; the table is reset.
    Disabled,
    /// EEs were restored after full power came back.
    PowerModeRestored,
    /// Routing was pushed to the controller.
    RoutingUpdated { status: Status },
}

impl EeEvent {
    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "Registered",
            Self::Deregistered => "Deregistered",
            Self::Discovered { .. } => "Discovered",
            Self::NewEe(_) => "NewEe",
            Self::ModeSet { .. } => "ModeSet",
            Self::Connected { .. } => "Connected",
            Self::Disconnected { .. } => "Disconnected",
            Self::Data { .. } => "Data",
            Self::AidAdded { .. } => "AidAdded",
            Self::AidRemoved { .. } => "AidRemoved",
            Self::TechConfigSet { .. } => "TechConfigSet",
            Self::ProtoConfigSet { .. } => "ProtoConfigSet",
            Self::DiscoverRequest(_) => "DiscoverRequest",
            Self::Action { .. } => "Action",
            Self::NoMemoryError => "NoMemoryError",
            Self::RoutingError { .. } => "RoutingError",
            Self::NoCallbackError => "NoCallbackError",
            Self::Enabled => "Enabled",
            Self::Disabled => "Disabled",
            Self::PowerModeRestored => "PowerModeRestored",
            Self::RoutingUpdated { .. } => "RoutingUpdated",
        }
    }
}

/// Receives EE events. Implementations must not call back into the manager;
/// enqueue a command instead.
pub trait EeListener: Send {
    /// Handle one event.
    fn on_event(&mut self, event: &EeEvent);
}

impl<F> EeListener for F
where
    F: FnMut(&EeEvent) + Send,
{
    fn on_event(&mut self, event: &EeEvent) {
        self(event)
    }
}

/// Fixed-capacity table of listeners.
pub struct ListenerRegistry {
    slots: Vec<Option<Box<dyn EeListener>>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("capacity", &self.capacity())
            .field("registered", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// Registry with `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Registered listeners.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `id` is registered.
    pub fn contains(&self, id: ListenerId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    /// Registered ids in slot order.
    pub fn ids(&self) -> Vec<ListenerId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| ListenerId(i))
            .collect()
    }

    /// Take the first free slot.
    pub fn register(&mut self, listener: Box<dyn EeListener>) -> Result<ListenerId> {
        match self.slots.iter().position(Option::is_none) {
            Some(i) => {
                self.slots[i] = Some(listener);
                Ok(ListenerId(i))
            }
            None => Err(Error::ListenerTableFull {
                capacity: self.capacity(),
            }),
        }
    }

    /// Free the slot and hand back its listener.
    pub fn deregister(&mut self, id: ListenerId) -> Option<Box<dyn EeListener>> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    /// Deliver to one listener.
    pub fn notify(&mut self, id: ListenerId, event: &EeEvent) {
        match self.slots.get_mut(id.0) {
            Some(Some(l)) => {
                debug!("{} -> {}", event.name(), id);
                l.on_event(event);
            }
            _ => warn!("{} dropped: {} not registered", event.name(), id),
        }
    }

    /// Deliver to every registered listener.
    pub fn broadcast(&mut self, event: &EeEvent) {
        debug!("{} -> all ({})", event.name(), self.len());
        for l in self.slots.iter_mut().flatten() {
            l.on_event(event);
        }
    }

    /// Deliver to `target` when it is still registered, otherwise broadcast.
    pub fn report(&mut self, target: Option<ListenerId>, event: &EeEvent) {
        match target {
            Some(id) if self.contains(id) => self.notify(id, event),
            _ => self.broadcast(event),
        }
    }
}
