// libnfcee-rs/libnfcee/src/transport/mock.rs
//! Recording transport for tests and demos.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::constants::MAX_ROUTING_TLV_SIZE;
use crate::transport::traits::NciTransport;
use crate::types::{ConnId, EeId, EeInterface, EeMode};
use crate::{Error, Result};

/// A command recorded by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// NFCEE_DISCOVER on or off.
    Discover(bool),
    /// NFCEE_MODE_SET.
    ModeSet(EeId, EeMode),
    /// One routing table chunk.
    SetRouting {
        more: bool,
        ee: EeId,
        tlv_count: u8,
        tlvs: Vec<u8>,
    },
    /// Connection create.
    ConnCreate(EeId, EeInterface),
    /// Connection close.
    ConnClose(ConnId),
    /// Outbound data.
    SendData(ConnId, Vec<u8>),
}

#[derive(Debug)]
struct MockState {
    sent: Vec<Request>,
    lmrt_size: usize,
    /// Testing hook: number of send_data calls that should fail with NoMemory
    send_failures: usize,
    /// Testing hook: number of set_routing calls that should fail
    routing_failures: usize,
    /// Testing hook: set_routing calls to let through before one fails
    routing_fail_after: Option<usize>,
    /// Testing hook: number of conn_close calls that should fail
    close_failures: usize,
}

/// Mock transport for tests. Clones share one log so a test can keep a
/// handle while the manager owns the boxed transport.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Empty log, full-size routing table.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                sent: Vec::new(),
                lmrt_size: MAX_ROUTING_TLV_SIZE,
                send_failures: 0,
                routing_failures: 0,
                routing_fail_after: None,
                close_failures: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // a test that panicked while holding the lock already failed
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Routing table size reported to the manager.
    pub fn set_lmrt_size(&self, bytes: usize) {
        self.lock().lmrt_size = bytes;
    }

    /// Set how many subsequent send_data calls should fail (for tests).
    pub fn set_send_failures(&self, n: usize) {
        self.lock().send_failures = n;
    }

    /// Set how many subsequent set_routing calls should fail (for tests).
    pub fn set_routing_failures(&self, n: usize) {
        self.lock().routing_failures = n;
    }

    /// Let `n` set_routing calls through, then fail the next one once.
    pub fn fail_routing_after(&self, n: usize) {
        self.lock().routing_fail_after = Some(n);
    }

    /// Set how many subsequent conn_close calls should fail (for tests).
    pub fn set_close_failures(&self, n: usize) {
        self.lock().close_failures = n;
    }

    /// Everything recorded so far.
    pub fn sent(&self) -> Vec<Request> {
        self.lock().sent.clone()
    }

    /// Return and forget everything recorded so far.
    pub fn take_sent(&self) -> Vec<Request> {
        std::mem::take(&mut self.lock().sent)
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.lock().sent.clear();
    }

    /// Recorded set_routing commands, in order.
    pub fn routing_pushes(&self) -> Vec<Request> {
        self.lock()
            .sent
            .iter()
            .filter(|r| matches!(r, Request::SetRouting { .. }))
            .cloned()
            .collect()
    }

    fn record(&self, req: Request) {
        self.lock().sent.push(req);
    }
}

impl NciTransport for MockTransport {
    fn nfcee_discover(&mut self, enable: bool) -> Result<()> {
        self.record(Request::Discover(enable));
        Ok(())
    }

    fn nfcee_mode_set(&mut self, ee: EeId, mode: EeMode) -> Result<()> {
        self.record(Request::ModeSet(ee, mode));
        Ok(())
    }

    fn set_routing(&mut self, more: bool, ee: EeId, tlv_count: u8, tlvs: &[u8]) -> Result<()> {
        let mut st = self.lock();
        if st.routing_failures > 0 {
            st.routing_failures -= 1;
            return Err(Error::Failed("set_routing rejected".into()));
        }
        match st.routing_fail_after {
            Some(0) => {
                st.routing_fail_after = None;
                return Err(Error::Failed("set_routing rejected".into()));
            }
            Some(n) => st.routing_fail_after = Some(n - 1),
            None => {}
        }
        st.sent.push(Request::SetRouting {
            more,
            ee,
            tlv_count,
            tlvs: tlvs.to_vec(),
        });
        Ok(())
    }

    fn conn_create(&mut self, ee: EeId, interface: EeInterface) -> Result<()> {
        self.record(Request::ConnCreate(ee, interface));
        Ok(())
    }

    fn conn_close(&mut self, conn: ConnId) -> Result<()> {
        let mut st = self.lock();
        if st.close_failures > 0 {
            st.close_failures -= 1;
            return Err(Error::Failed("conn_close rejected".into()));
        }
        st.sent.push(Request::ConnClose(conn));
        Ok(())
    }

    fn send_data(&mut self, conn: ConnId, data: Vec<u8>) -> Result<()> {
        let mut st = self.lock();
        if st.send_failures > 0 {
            st.send_failures -= 1;
            return Err(Error::NoMemory);
        }
        st.sent.push(Request::SendData(conn, data));
        Ok(())
    }

    fn max_routing_table_size(&self) -> usize {
        self.lock().lmrt_size
    }
}
