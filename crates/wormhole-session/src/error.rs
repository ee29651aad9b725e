//! Session error taxonomy
//!
//! Every variant carries a short message suitable for direct display; a
//! caller never has to inspect session internals to decide how to react.

use thiserror::Error;
use wormhole_protocol::MessageError;

use crate::{RendezvousError, TransitError};

/// Session error
#[derive(Debug, Error)]
pub enum SessionError {
    /// A bounded wait exceeded its deadline
    #[error("{0}")]
    Timeout(String),

    /// The peer's human broke the protocol (wrong code, declined offer)
    #[error("{0}")]
    Human(String),

    /// The peer sent an `error` control message, or responded out of protocol
    #[error("{0}")]
    Protocol(String),

    /// A message from the peer failed to decode
    #[error("bad message came from the other side")]
    Malformed(#[from] MessageError),

    /// Post-transfer digest mismatch
    #[error("file transfer failed: checksum mismatch")]
    Integrity { ours: String, theirs: String },

    /// Fewer bytes arrived than the offer advertised
    #[error("download did not complete: received {received} of {expected} bytes")]
    Incomplete { expected: u64, received: u64 },

    /// Operation called in a state that does not allow it
    #[error("operation not valid here: {0}")]
    InvalidState(&'static str),

    #[error("rendezvous failure: {0}")]
    Rendezvous(#[from] RendezvousError),

    #[error("transit failure: {0}")]
    Transit(#[from] TransitError),

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;
