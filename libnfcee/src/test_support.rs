//! Test support helpers intended for use by unit and integration tests.
//!
//! These helpers centralize the mock transport, virtual clock and recording
//! listener wiring so tests across the crate and the tests/ directory drive
//! the manager the same way.
#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::Config;
use crate::dispatch::{Message, NciEvent};
use crate::events::{EeEvent, EeListener, ListenerId};
use crate::manager::Manager;
use crate::timer::VirtualScheduler;
use crate::transport::MockTransport;
use crate::types::{EeId, EeInterface, EeStatus, PowerMode, Status};
use crate::Result;

/// Listener that keeps every event it receives. Clones share the log.
#[doc(hidden)]
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<EeEvent>>>,
}

impl RecordingListener {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<EeEvent>> {
        self.events.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Events seen so far.
    pub fn events(&self) -> Vec<EeEvent> {
        self.lock().clone()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<EeEvent> {
        std::mem::take(&mut *self.lock())
    }

    /// Events matching `pred`.
    pub fn count(&self, pred: impl Fn(&EeEvent) -> bool) -> usize {
        self.lock().iter().filter(|e| pred(e)).count()
    }
}

impl EeListener for RecordingListener {
    fn on_event(&mut self, event: &EeEvent) {
        self.lock().push(event.clone());
    }
}

/// A manager wired to a [`MockTransport`] and a [`VirtualScheduler`], with
/// one [`RecordingListener`] registered.
#[doc(hidden)]
pub struct Harness {
    /// Manager under test.
    pub manager: Manager,
    /// Handle on the manager's transport.
    pub transport: MockTransport,
    /// Handle on the manager's clock.
    pub clock: VirtualScheduler,
    /// Log of the default listener.
    pub recorder: RecordingListener,
    /// Id of the default listener.
    pub listener: ListenerId,
}

impl Harness {
    /// Harness over the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Harness over `config`.
    pub fn with_config(config: Config) -> Result<Self> {
        let transport = MockTransport::new();
        let clock = VirtualScheduler::new();
        let mut manager = Manager::new(
            config,
            Box::new(transport.clone()),
            Box::new(clock.clone()),
        );
        let recorder = RecordingListener::new();
        let listener = manager.register(Box::new(recorder.clone()))?;
        recorder.take();
        Ok(Self {
            manager,
            transport,
            clock,
            recorder,
            listener,
        })
    }

    /// A manager that discovered the given active NFCEEs, one interface
    /// each, with device management active and the discovery window closed.
    pub fn enabled_with(ees: &[(u8, EeInterface)]) -> Result<Self> {
        let mut h = Self::new()?;
        h.enable_with(ees)?;
        Ok(h)
    }

    /// Enable and discover `ees`, then close the discovery window.
    pub fn enable_with(&mut self, ees: &[(u8, EeInterface)]) -> Result<()> {
        self.manager.enable()?;
        self.nci(NciEvent::DiscoveryResponse {
            status: Status::Ok,
            count: ees.len() as u8,
        });
        for &(id, interface) in ees {
            self.notify_ee(id, EeStatus::Active, interface);
        }
        self.manager.handle(Message::DmActive(true));
        let window = self.manager.config().discovery_timeout;
        self.advance(window);
        Ok(())
    }

    /// Deliver an NFCC event.
    pub fn nci(&mut self, event: NciEvent) {
        self.manager.handle(Message::Nci(event));
    }

    /// Deliver a discovery notification with a single interface.
    pub fn notify_ee(&mut self, id: u8, status: EeStatus, interface: EeInterface) {
        self.nci(NciEvent::DiscoveryNotification {
            ee: EeId::new(id),
            status,
            interfaces: vec![interface],
            tlvs: Vec::new(),
        });
    }

    /// Deliver a power mode change.
    pub fn power_mode(&mut self, mode: PowerMode) {
        self.manager.handle(Message::PowerMode(mode));
    }

    /// Move the virtual clock and deliver every expiry to the manager.
    pub fn advance(&mut self, by: Duration) {
        for id in self.clock.advance(by) {
            self.manager.handle(Message::TimerExpired(id));
        }
    }
}
