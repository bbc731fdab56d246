// libnfcee-rs/libnfcee/src/error.rs
//! Error type of the crate.

use crate::types::{EeId, Status};
use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A parameter was rejected before anything was sent.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// The AID is already routed to another EE.
    #[error("AID {aid} is already routed to EE {owner}")]
    SemanticError { aid: String, owner: EeId },

    /// Not enough room in the AID table or routing table.
    #[error("buffer full: need {needed} bytes, capacity {capacity}")]
    BufferFull { needed: usize, capacity: usize },

    /// The transport or controller failed the request.
    #[error("operation failed: {0}")]
    Failed(String),

    /// The transport had no buffer for outbound data.
    #[error("out of memory for outbound buffer")]
    NoMemory,

    /// No open connection to send on.
    #[error("no open connection to EE {0}")]
    NoConnection(EeId),

    /// No control block for this id.
    #[error("unknown EE {0}")]
    UnknownEe(EeId),

    /// Every listener slot is taken.
    #[error("listener table full (capacity {capacity})")]
    ListenerTableFull { capacity: usize },

    /// The request does not apply in the current phase.
    #[error("{event} received in unexpected state {state}")]
    UnexpectedState {
        event: &'static str,
        state: &'static str,
    },

    /// A length field or buffer was out of range.
    #[error("invalid length: expected at most {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A routing TLV stream could not be decoded.
    #[error("routing TLV format error: {0}")]
    TlvFormat(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl From<&Error> for Status {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidParam(_)
            | Error::UnknownEe(_)
            | Error::InvalidLength { .. }
            | Error::TlvFormat(_) => Status::InvalidParam,
            Error::SemanticError { .. } => Status::SemanticError,
            Error::BufferFull { .. } | Error::ListenerTableFull { .. } => Status::BufferFull,
            Error::NoMemory => Status::NoMemory,
            Error::Failed(_) | Error::NoConnection(_) | Error::UnexpectedState { .. } => {
                Status::Failed
            }
        }
    }
}
