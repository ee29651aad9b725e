//! Rendezvous client capability
//!
//! The mailbox protocol itself (code allocation, encrypted box exchange) is
//! implemented by the host application; the session engine only needs this
//! narrow interface.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Rendezvous failure as reported by the injected client
#[derive(Debug, Error)]
pub enum RendezvousError {
    /// The peer completed the key exchange with a different secret
    #[error("the other side used a different secret")]
    WrongSecret,

    #[error("rendezvous server error: {0}")]
    Server(String),

    #[error("rendezvous connection closed")]
    Closed,
}

pub type RendezvousResult<T> = Result<T, RendezvousError>;

/// Connection to the rendezvous server, exclusively owned by one session
#[async_trait]
pub trait RendezvousClient: Send {
    /// Ask the server to allocate a fresh code; resolves once it is assigned
    async fn allocate_code(&mut self) -> RendezvousResult<String>;

    /// Submit the peer's code; resolves once the rendezvous completes
    async fn set_code(&mut self, code: &str) -> RendezvousResult<()>;

    /// Derive a per-purpose symmetric key from the shared base secret
    fn derive_key(&self, purpose: &str, length: usize) -> Vec<u8>;

    /// Await completion of the key-agreement handshake; resolves into the
    /// verifier, a value both humans can compare out of band
    async fn verifier(&mut self) -> RendezvousResult<Bytes>;

    /// Fire-and-forget send of an opaque message to the peer
    fn send_message(&mut self, payload: Bytes);

    /// Await the next opaque message from the peer
    async fn receive_message(&mut self) -> RendezvousResult<Bytes>;

    /// Release the server connection
    async fn close(&mut self) -> RendezvousResult<()>;
}
