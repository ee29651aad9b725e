//! Wormhole session protocol engine
//!
//! Drives a one-shot file transfer between two peers that exchanged a short
//! human-readable code: code generation or consumption, key exchange and
//! verification, transit negotiation over JSON control messages, and the
//! chunked transfer itself with end-to-end integrity checking.
//!
//! The rendezvous wire protocol and the transit (direct/relay) byte pipe are
//! not implemented here; the host application injects them through the
//! [`RendezvousClient`], [`TransitChannel`] and [`TransitFactory`] traits.

mod config;
mod error;
mod rendezvous;
mod session;
mod transfer;
mod transit;

pub use config::*;
pub use error::*;
pub use rendezvous::*;
pub use session::*;
pub use transfer::Progress;
pub use transit::*;

pub use wormhole_protocol::{ControlMessage, FileOffer, sanitized_filename};
