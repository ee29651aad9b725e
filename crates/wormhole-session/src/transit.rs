//! Transit channel capability
//!
//! Direct-connection and relay establishment are implemented by the host
//! application. The engine negotiates hints and keys through
//! [`TransitChannel`] and moves bulk data through the [`RecordPipe`] the
//! channel yields on connect.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use wormhole_protocol::{Abilities, Hints};

/// Transit failure as reported by the injected channel
#[derive(Debug, Error)]
pub enum TransitError {
    #[error("could not establish a transit connection: {0}")]
    Connect(String),

    #[error("transit record error: {0}")]
    Record(String),

    #[error("transit connection closed")]
    Closed,
}

pub type TransitResult<T> = Result<T, TransitError>;

/// Established bidirectional pipe to the peer.
///
/// Records are length-framed blocks; the byte-level calls stream raw file
/// content. Both ride the same reliable ordered connection.
#[async_trait]
pub trait RecordPipe: Send {
    async fn send_record(&mut self, record: Bytes) -> TransitResult<()>;

    async fn receive_record(&mut self) -> TransitResult<Bytes>;

    /// Stream raw file bytes to the peer
    async fn send_bytes(&mut self, chunk: &[u8]) -> TransitResult<()>;

    /// Receive up to `max` raw file bytes; an empty buffer signals end of data
    async fn receive_bytes(&mut self, max: usize) -> TransitResult<Bytes>;

    async fn close(&mut self) -> TransitResult<()>;
}

/// One side of a transit negotiation, bound to a relay address at creation
#[async_trait]
pub trait TransitChannel: Send {
    /// Our connection hints to advertise to the peer
    async fn connection_hints(&mut self) -> TransitResult<Hints>;

    /// Our supported connection abilities
    fn connection_abilities(&self) -> Abilities;

    /// Feed the peer's hints into the connection attempt
    fn add_connection_hints(&mut self, hints: Hints);

    /// Fixed length of the symmetric key this channel requires
    fn transit_key_length(&self) -> usize;

    /// Install the derived transit encryption key
    fn set_transit_key(&mut self, key: Vec<u8>);

    /// Establish the data connection, directly or via the relay
    async fn connect(&mut self) -> TransitResult<Box<dyn RecordPipe>>;
}

/// Constructs fresh transit channels, one per negotiation.
///
/// Mirrors the sender/receiver split of transit implementations: the two
/// sides run different handshakes even though the engine treats the
/// resulting channel uniformly.
pub trait TransitFactory: Send {
    fn sender(&self, relay_url: &str) -> Box<dyn TransitChannel>;

    fn receiver(&self, relay_url: &str) -> Box<dyn TransitChannel>;
}
