// libnfcee-rs/libnfcee/src/manager/connection.rs
//! Logical connections between the DH and an NFCEE.

use log::{debug, warn};

use super::{EmState, Manager};
use crate::events::{EeEvent, ListenerId};
use crate::types::{ConnId, ConnState, EeId, EeInterface, Status};
use crate::{Error, Result};

impl Manager {
    /// Open a connection to `ee` over `interface`. `listener` receives
    /// `Connected`, any inbound `Data` and finally `Disconnected`.
    pub fn connect(
        &mut self,
        ee: EeId,
        interface: EeInterface,
        listener: ListenerId,
    ) -> Result<()> {
        if !self.listeners.contains(listener) {
            return Err(Error::InvalidParam(format!("{} is not registered", listener)));
        }
        let idx = self.ee_slot(ee)?;

        let refusal = match self.table.get(idx) {
            Some(cb) if cb.connection != ConnState::None => {
                Some(format!("EE {} already has a connection", ee))
            }
            Some(cb) if !cb.interfaces.contains(&interface) => {
                Some(format!("EE {} does not offer {:?}", ee, interface))
            }
            Some(_) => None,
            None => return Err(Error::UnknownEe(ee)),
        };
        if let Some(reason) = refusal {
            debug!("{}", reason);
            self.listeners.notify(
                listener,
                &EeEvent::Connected {
                    handle: ee.handle(),
                    status: Status::InvalidParam,
                    interface: Some(interface),
                },
            );
            return Err(Error::InvalidParam(reason));
        }

        if let Some(cb) = self.table.get_mut(idx) {
            cb.listener = Some(listener);
            cb.connection = ConnState::Wait;
            cb.use_interface = Some(interface);
        }
        if let Err(err) = self.transport.conn_create(ee, interface) {
            warn!("connection to {} not created: {}", ee, err);
            if let Some(cb) = self.table.get_mut(idx) {
                cb.connection = ConnState::None;
            }
            self.listeners.notify(
                listener,
                &EeEvent::Connected {
                    handle: ee.handle(),
                    status: Status::Failed,
                    interface: Some(interface),
                },
            );
            return Err(err);
        }
        Ok(())
    }

    /// Send `data` over the open connection to `ee`.
    pub fn send_data(&mut self, ee: EeId, data: Vec<u8>) -> Result<()> {
        let idx = self.ee_slot(ee)?;
        let conn = self
            .table
            .get(idx)
            .filter(|cb| cb.connection == ConnState::Connected)
            .and_then(|cb| cb.conn_id);
        let Some(conn) = conn else {
            self.report_failure(Some(idx), &EeEvent::NoCallbackError);
            return Err(Error::NoConnection(ee));
        };

        match self.transport.send_data(conn, data) {
            Err(Error::NoMemory) => {
                warn!("no buffer for data to {}", ee);
                self.listeners.broadcast(&EeEvent::NoMemoryError);
                Err(Error::NoMemory)
            }
            other => other,
        }
    }

    /// Close the connection to `ee`. Without an open connection
    /// `Disconnected` is reported at once.
    pub fn disconnect(&mut self, ee: EeId) -> Result<()> {
        let idx = self.ee_slot(ee)?;
        let Some(state) = self.table.get(idx).map(|cb| cb.connection) else {
            return Err(Error::UnknownEe(ee));
        };
        match state {
            ConnState::Connected => self.close_connection(idx)?,
            ConnState::Disconnecting => debug!("EE {} already disconnecting", ee),
            // the pending create still owns the listener
            ConnState::Wait => {
                self.report_to_ecb(idx, &EeEvent::Disconnected { handle: ee.handle() });
            }
            ConnState::None => {
                self.report_to_ecb(idx, &EeEvent::Disconnected { handle: ee.handle() });
                if let Some(cb) = self.table.get_mut(idx) {
                    cb.conn_id = None;
                    cb.listener = None;
                }
            }
        }
        Ok(())
    }

    /// Ask the controller to close the open connection of slot `idx`. A
    /// rejected close leaves the slot without a connection.
    pub(super) fn close_connection(&mut self, idx: usize) -> Result<()> {
        let Some(cb) = self.table.get_mut(idx) else {
            return Ok(());
        };
        let Some(conn) = cb.conn_id else {
            cb.connection = ConnState::None;
            return Ok(());
        };
        cb.connection = ConnState::Disconnecting;
        if let Err(err) = self.transport.conn_close(conn) {
            warn!("closing connection to {} failed: {}", cb.id, err);
            cb.connection = ConnState::None;
            cb.conn_id = None;
            cb.use_interface = None;
            return Err(err);
        }
        Ok(())
    }

    pub(super) fn on_connection_created(&mut self, ee: EeId, conn: ConnId, status: Status) {
        let Some(idx) = self.table.find_by_ee_id(ee).filter(|_| !ee.is_dh()) else {
            warn!("connection created for unknown EE {}", ee);
            return;
        };
        let Some(cb) = self.table.get_mut(idx) else {
            return;
        };
        if cb.connection != ConnState::Wait && !cb.restore_pending {
            warn!("unexpected connection {:?} to {} in {:?}", conn, ee, cb.connection);
            if status.is_ok() {
                if let Err(err) = self.transport.conn_close(conn) {
                    warn!("closing stray connection {:?} failed: {}", conn, err);
                }
            }
            return;
        }
        if status.is_ok() {
            cb.conn_id = Some(conn);
            cb.connection = ConnState::Connected;
        } else {
            cb.conn_id = None;
            cb.connection = ConnState::None;
        }
        debug!("connection to {}: {:?} ({:?})", ee, status, cb.connection);

        if cb.restore_pending {
            cb.restore_pending = false;
            self.try_finish_restore();
            return;
        }
        let event = EeEvent::Connected {
            handle: ee.handle(),
            status,
            interface: cb.use_interface,
        };
        if let Some(listener) = cb.listener {
            self.listeners.notify(listener, &event);
        }
    }

    pub(super) fn on_connection_closed(&mut self, conn: ConnId) {
        let Some(idx) = self.table.find_by_conn_id(conn) else {
            debug!("close for unknown connection {:?}", conn);
            return;
        };
        let Some(cb) = self.table.get_mut(idx) else {
            return;
        };
        let handle = cb.id.handle();
        let listener = cb.listener.take();
        cb.connection = ConnState::None;
        cb.conn_id = None;
        cb.use_interface = None;
        if let Some(listener) = listener {
            self.listeners
                .notify(listener, &EeEvent::Disconnected { handle });
        }

        if self.em_state == EmState::Disabling {
            self.pending_closes = self.pending_closes.saturating_sub(1);
            if self.pending_closes == 0 {
                self.finish_disable();
            }
        }
    }

    pub(super) fn on_data(&mut self, conn: ConnId, data: Vec<u8>) {
        let target = self
            .table
            .find_by_conn_id(conn)
            .and_then(|i| self.table.get(i))
            .filter(|cb| cb.connection == ConnState::Connected)
            .and_then(|cb| cb.listener.map(|l| (l, cb.id.handle())));
        match target {
            Some((listener, handle)) => {
                self.listeners
                    .notify(listener, &EeEvent::Data { handle, data });
            }
            None => debug!("{} bytes on {:?} dropped", data.len(), conn),
        }
    }

    /// Start closing every open connection; returns how many closes are
    /// outstanding.
    pub(super) fn close_all_connections(&mut self) -> usize {
        let mut pending = 0;
        for cb in self.table.iter_mut() {
            match cb.connection {
                ConnState::Connected => {
                    cb.connection = ConnState::Disconnecting;
                    let closed = cb
                        .conn_id
                        .map(|conn| self.transport.conn_close(conn))
                        .transpose();
                    match closed {
                        Ok(Some(())) => pending += 1,
                        Ok(None) => cb.connection = ConnState::None,
                        Err(err) => {
                            warn!("closing connection to {} failed: {}", cb.id, err);
                            cb.connection = ConnState::None;
                        }
                    }
                }
                ConnState::Disconnecting => pending += 1,
                ConnState::None | ConnState::Wait => {}
            }
        }
        pending
    }
}
