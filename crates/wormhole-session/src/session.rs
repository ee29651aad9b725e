//! Session state machine
//!
//! One `Session` per file transfer attempt. The session exclusively owns one
//! rendezvous client and at most one transit channel; both are released on
//! close and neither outlives the session. There is no partial-state
//! resumption: after any failure the only way forward is `close()` and a
//! fresh session.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};
use wormhole_protocol::{
    AnswerPayload, ControlMessage, FileOffer, OfferPayload, TransitInfo,
};

use crate::{
    MESSAGE_TIMEOUT, RendezvousClient, RendezvousError, SessionConfig, SessionError,
    SessionResult, TransitChannel, TransitFactory, transfer, transfer::Progress,
};

/// Which end of the wormhole this session is, fixed by the first operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Initial state, no operation run yet
    Idle,
    /// Sender: code allocated and assigned
    CodeReady,
    /// Receiver: rendezvous with the peer completed
    Connecting,
    /// Key agreement finished, verifier produced
    KeysExchanged,
    /// Sender: transit channel created, hints being gathered
    TransitNegotiating,
    /// Sender: offer is on the wire, awaiting the peer's messages
    OfferSent,
    /// Receiver: looping for transit info and the offer
    AwaitingOffer,
    /// Receiver: offer recorded, caller has not yet accepted
    OfferReceived,
    /// Receiver: acceptance sent
    Accepting,
    /// Bulk data moving over the transit channel
    Transferring,
    /// Transfer completed and verified
    Done,
    /// A protocol or transfer failure ended the session
    Failed,
    /// Closed by the caller
    Closed,
}

/// Session state machine driving one file transfer attempt
pub struct Session {
    config: SessionConfig,
    rendezvous: Box<dyn RendezvousClient>,
    transit_factory: Box<dyn TransitFactory>,
    transit: Option<Box<dyn TransitChannel>>,
    pending_offer: Option<FileOffer>,
    role: Option<Role>,
    state: SessionState,
    closed: bool,
}

impl Session {
    /// Create a session over an injected rendezvous client and transit factory
    pub fn new(
        config: SessionConfig,
        rendezvous: Box<dyn RendezvousClient>,
        transit_factory: Box<dyn TransitFactory>,
    ) -> Self {
        Self {
            config,
            rendezvous,
            transit_factory,
            transit: None,
            pending_offer: None,
            role: None,
            state: SessionState::Idle,
            closed: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The offer recorded by `await_offer`, if the caller has not accepted yet
    pub fn pending_offer(&self) -> Option<&FileOffer> {
        self.pending_offer.as_ref()
    }

    /// Allocate a fresh code on the rendezvous server (sender side).
    ///
    /// Resolves into the code both humans will exchange. On expiry the
    /// session stays in `Idle` and the role stays unset.
    pub async fn generate_code(&mut self, timeout: Duration) -> SessionResult<String> {
        if self.state != SessionState::Idle || self.role == Some(Role::Receiver) {
            return Err(SessionError::InvalidState("code already requested"));
        }

        let code = match tokio::time::timeout(timeout, self.rendezvous.allocate_code()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SessionError::Timeout(
                    "could not connect to the server".to_string(),
                ));
            }
        };

        self.role = Some(Role::Sender);
        self.state = SessionState::CodeReady;
        info!(code = %code, "code assigned");
        Ok(code)
    }

    /// Rendezvous with the peer by its code (receiver side)
    pub async fn connect(&mut self, code: &str, timeout: Duration) -> SessionResult<()> {
        if self.state != SessionState::Idle || self.role == Some(Role::Sender) {
            return Err(SessionError::InvalidState("session already connected"));
        }

        match tokio::time::timeout(timeout, self.rendezvous.set_code(code)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SessionError::Timeout(
                    "could not connect to the other end".to_string(),
                ));
            }
        }

        self.role = Some(Role::Receiver);
        self.state = SessionState::Connecting;
        info!("rendezvous completed");
        Ok(())
    }

    /// Await completion of the key-agreement handshake.
    ///
    /// Resolves into the verifier, which the caller may display so both
    /// humans can compare it out of band. Callers pass a longer timeout when
    /// the other human is expected to be slow typing the code.
    pub async fn exchange_keys(&mut self, timeout: Duration) -> SessionResult<Bytes> {
        if !matches!(
            self.state,
            SessionState::CodeReady | SessionState::Connecting
        ) {
            return Err(SessionError::InvalidState("keys cannot be exchanged yet"));
        }

        let verifier = match tokio::time::timeout(timeout, self.rendezvous.verifier()).await {
            Ok(Ok(verifier)) => verifier,
            Ok(Err(RendezvousError::WrongSecret)) => {
                return Err(SessionError::Human(
                    "the other end entered a wrong code".to_string(),
                ));
            }
            Ok(Err(error)) => return Err(error.into()),
            Err(_) => {
                return Err(SessionError::Timeout(
                    "could not exchange keys with the other end".to_string(),
                ));
            }
        };

        self.state = SessionState::KeysExchanged;
        info!("keys exchanged");
        Ok(verifier)
    }

    /// Fire-and-forget send of a control message to the peer
    pub fn send_control(&mut self, message: &ControlMessage) {
        debug!(?message, "sending control message");
        self.rendezvous.send_message(message.encode());
    }

    /// Await the next control message from the peer.
    ///
    /// An `error` message is terminal: the session closes itself and the
    /// call fails with the peer's text, so callers never see that variant.
    pub async fn await_control(&mut self, timeout: Duration) -> SessionResult<ControlMessage> {
        let raw = match tokio::time::timeout(timeout, self.rendezvous.receive_message()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SessionError::Timeout(
                    "no message came from the other side".to_string(),
                ));
            }
        };

        let message = ControlMessage::decode(&raw)?;
        debug!(?message, "received control message");

        if let ControlMessage::Error(text) = message {
            warn!(error = %text, "peer reported an error, closing");
            self.close().await;
            self.state = SessionState::Failed;
            return Err(SessionError::Protocol(text));
        }

        Ok(message)
    }

    /// Drive the full send-side protocol: negotiate transit, offer the file,
    /// and stream it once the peer acknowledges.
    ///
    /// Resolves into the hex content digest.
    pub async fn send_file(
        &mut self,
        path: &Path,
        mut progress: Progress<'_>,
    ) -> SessionResult<String> {
        if self.transit.is_some() {
            return Err(SessionError::InvalidState(
                "a transit channel is already attached",
            ));
        }
        if self.state != SessionState::KeysExchanged || self.role != Some(Role::Sender) {
            return Err(SessionError::InvalidState("session is not ready to send"));
        }

        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(SessionError::InvalidState(
                "source path is not a regular file",
            ));
        }
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or(SessionError::InvalidState("source path has no file name"))?
            .to_string();

        self.state = SessionState::TransitNegotiating;
        let mut transit = self.transit_factory.sender(&self.config.transit_relay_url);
        let our_hints = transit.connection_hints().await?;
        let our_abilities = transit.connection_abilities();
        self.transit = Some(transit);

        self.send_control(&ControlMessage::Transit(TransitInfo {
            abilities: our_abilities,
            hints: our_hints,
        }));
        self.send_control(&ControlMessage::Offer(OfferPayload {
            file: FileOffer {
                filename,
                filesize: metadata.len(),
            },
        }));
        self.state = SessionState::OfferSent;
        info!(filesize = metadata.len(), "offer sent");

        // The peer's transit message and its answer may arrive in either
        // order over the relay, so the loop keys on message content rather
        // than a fixed sequence.
        loop {
            match self.await_control(MESSAGE_TIMEOUT).await? {
                ControlMessage::Transit(info) => self.install_peer_transit(info)?,
                ControlMessage::Answer(answer) => {
                    if !answer.is_ok() {
                        self.state = SessionState::Failed;
                        return Err(SessionError::Human(
                            "the other side declined the file".to_string(),
                        ));
                    }
                    self.state = SessionState::Transferring;
                    let result = self.run_transfer_send(path, progress.take()).await;
                    return self.finish_transfer(result);
                }
                other => debug!(?other, "ignoring out-of-protocol message"),
            }
        }
    }

    /// Negotiate transit and await the peer's file offer (receiver side).
    ///
    /// Unlike the send loop, an offer arriving before the peer's transit
    /// message is taken as-is; the asymmetry is a known protocol quirk and
    /// deliberately preserved.
    pub async fn await_offer(&mut self) -> SessionResult<FileOffer> {
        if self.transit.is_some() || self.pending_offer.is_some() {
            return Err(SessionError::InvalidState("an offer is already pending"));
        }
        if self.state != SessionState::KeysExchanged || self.role != Some(Role::Receiver) {
            return Err(SessionError::InvalidState(
                "session is not ready for an offer",
            ));
        }

        let mut transit = self
            .transit_factory
            .receiver(&self.config.transit_relay_url);
        let key = self.rendezvous.derive_key(
            &self.config.transit_key_purpose(),
            transit.transit_key_length(),
        );
        transit.set_transit_key(key);
        self.transit = Some(transit);
        self.state = SessionState::AwaitingOffer;

        loop {
            match self.await_control(MESSAGE_TIMEOUT).await? {
                ControlMessage::Transit(info) => {
                    let Some(transit) = self.transit.as_mut() else {
                        return Err(SessionError::InvalidState("transit channel detached"));
                    };
                    transit.add_connection_hints(info.hints);
                    let our_hints = transit.connection_hints().await?;
                    let our_abilities = transit.connection_abilities();
                    // Echo our transit info back; the sender's loop waits on it
                    self.send_control(&ControlMessage::Transit(TransitInfo {
                        abilities: our_abilities,
                        hints: our_hints,
                    }));
                }
                ControlMessage::Offer(payload) => {
                    info!(
                        filename = %payload.file.filename,
                        filesize = payload.file.filesize,
                        "offer received"
                    );
                    self.pending_offer = Some(payload.file.clone());
                    self.state = SessionState::OfferReceived;
                    return Ok(payload.file);
                }
                other => debug!(?other, "ignoring out-of-protocol message"),
            }
        }
    }

    /// Accept the pending offer and receive the file into `path`.
    ///
    /// Resolves into the hex content digest. The pending offer is cleared
    /// whether or not the transfer succeeds.
    pub async fn accept_offer(
        &mut self,
        path: &Path,
        mut progress: Progress<'_>,
    ) -> SessionResult<String> {
        if self.transit.is_none() {
            return Err(SessionError::InvalidState("no transit channel attached"));
        }
        let offer = self
            .pending_offer
            .take()
            .ok_or(SessionError::InvalidState("no offer is pending"))?;

        self.state = SessionState::Accepting;
        self.send_control(&ControlMessage::Answer(AnswerPayload::ok()));

        self.state = SessionState::Transferring;
        let result = self.run_transfer_receive(path, offer.filesize, progress.take()).await;
        self.finish_transfer(result)
    }

    /// Release the rendezvous client and any attached transit channel.
    ///
    /// Idempotent and infallible: closing commonly runs on cleanup paths
    /// where another error already dominates, so failures are swallowed.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.transit = None;
        self.pending_offer = None;

        if let Err(error) = self.rendezvous.close().await {
            debug!(%error, "ignoring rendezvous close failure");
        }
        if !matches!(self.state, SessionState::Done | SessionState::Failed) {
            self.state = SessionState::Closed;
        }
        info!("session closed");
    }

    /// Feed the peer's hints into our transit channel and install the
    /// derived transit key (sender side)
    fn install_peer_transit(&mut self, info: TransitInfo) -> SessionResult<()> {
        let Some(transit) = self.transit.as_mut() else {
            return Err(SessionError::InvalidState("transit channel detached"));
        };
        transit.add_connection_hints(info.hints);
        let key = self.rendezvous.derive_key(
            &self.config.transit_key_purpose(),
            transit.transit_key_length(),
        );
        transit.set_transit_key(key);
        debug!("peer hints added, transit key installed");
        Ok(())
    }

    async fn run_transfer_send(
        &mut self,
        path: &Path,
        progress: Progress<'_>,
    ) -> SessionResult<String> {
        let Some(transit) = self.transit.as_mut() else {
            return Err(SessionError::InvalidState("transit channel detached"));
        };
        let pipe = transit.connect().await?;
        transfer::send(pipe, path, progress).await
    }

    async fn run_transfer_receive(
        &mut self,
        path: &Path,
        filesize: u64,
        progress: Progress<'_>,
    ) -> SessionResult<String> {
        let Some(transit) = self.transit.as_mut() else {
            return Err(SessionError::InvalidState("transit channel detached"));
        };
        let pipe = transit.connect().await?;
        transfer::receive(pipe, path, filesize, progress).await
    }

    fn finish_transfer(&mut self, result: SessionResult<String>) -> SessionResult<String> {
        match result {
            Ok(digest) => {
                self.state = SessionState::Done;
                Ok(digest)
            }
            Err(error) => {
                self.state = SessionState::Failed;
                Err(error)
            }
        }
    }
}
