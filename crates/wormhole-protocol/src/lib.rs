//! Wire types for the wormhole file-transfer protocol
//!
//! This crate contains the JSON control messages exchanged over the
//! rendezvous channel, the final acknowledgement record exchanged over the
//! transit channel, and the codec that validates them.

mod error;
mod filename;
mod message;

pub use error::*;
pub use filename::*;
pub use message::*;
