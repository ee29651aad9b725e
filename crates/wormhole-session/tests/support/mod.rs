//! In-memory mock capabilities for driving sessions without a network

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use wormhole_protocol::{Abilities, Hints};
use wormhole_session::{
    RecordPipe, RendezvousClient, RendezvousError, RendezvousResult, TransitChannel,
    TransitError, TransitFactory, TransitResult,
};

/// How the mock resolves code allocation and rendezvous
#[derive(Clone)]
pub enum CodeBehavior {
    Assign(String),
    Hang,
}

/// How the mock resolves the key-agreement handshake
#[derive(Clone)]
pub enum VerifierBehavior {
    Value(Bytes),
    WrongSecret,
}

pub struct MockRendezvous {
    pub code: CodeBehavior,
    pub verifier: VerifierBehavior,
    outgoing: mpsc::UnboundedSender<Bytes>,
    incoming: mpsc::UnboundedReceiver<Bytes>,
    pub closes: Arc<AtomicUsize>,
}

/// Two linked rendezvous halves; messages sent by one arrive at the other
pub fn rendezvous_pair(code: &str) -> (MockRendezvous, MockRendezvous) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    let half = |outgoing, incoming| MockRendezvous {
        code: CodeBehavior::Assign(code.to_string()),
        verifier: VerifierBehavior::Value(Bytes::from_static(b"verifier")),
        outgoing,
        incoming,
        closes: Arc::new(AtomicUsize::new(0)),
    };
    (half(a_tx, a_rx), half(b_tx, b_rx))
}

#[async_trait]
impl RendezvousClient for MockRendezvous {
    async fn allocate_code(&mut self) -> RendezvousResult<String> {
        match &self.code {
            CodeBehavior::Assign(code) => Ok(code.clone()),
            CodeBehavior::Hang => std::future::pending().await,
        }
    }

    async fn set_code(&mut self, _code: &str) -> RendezvousResult<()> {
        match &self.code {
            CodeBehavior::Assign(_) => Ok(()),
            CodeBehavior::Hang => std::future::pending().await,
        }
    }

    fn derive_key(&self, purpose: &str, length: usize) -> Vec<u8> {
        // Deterministic so both linked halves derive the same key
        purpose.bytes().cycle().take(length).collect()
    }

    async fn verifier(&mut self) -> RendezvousResult<Bytes> {
        match &self.verifier {
            VerifierBehavior::Value(value) => Ok(value.clone()),
            VerifierBehavior::WrongSecret => Err(RendezvousError::WrongSecret),
        }
    }

    fn send_message(&mut self, payload: Bytes) {
        let _ = self.outgoing.send(payload);
    }

    async fn receive_message(&mut self) -> RendezvousResult<Bytes> {
        self.incoming.recv().await.ok_or(RendezvousError::Closed)
    }

    async fn close(&mut self) -> RendezvousResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockPipe {
    record_tx: mpsc::UnboundedSender<Bytes>,
    record_rx: mpsc::UnboundedReceiver<Bytes>,
    byte_tx: mpsc::UnboundedSender<Bytes>,
    byte_rx: mpsc::UnboundedReceiver<Bytes>,
    buffer: BytesMut,
}

/// Two connected pipe halves over in-memory channels
pub fn pipe_pair() -> (MockPipe, MockPipe) {
    let (a_record_tx, b_record_rx) = mpsc::unbounded_channel();
    let (b_record_tx, a_record_rx) = mpsc::unbounded_channel();
    let (a_byte_tx, b_byte_rx) = mpsc::unbounded_channel();
    let (b_byte_tx, a_byte_rx) = mpsc::unbounded_channel();
    let half = |record_tx, record_rx, byte_tx, byte_rx| MockPipe {
        record_tx,
        record_rx,
        byte_tx,
        byte_rx,
        buffer: BytesMut::new(),
    };
    (
        half(a_record_tx, a_record_rx, a_byte_tx, a_byte_rx),
        half(b_record_tx, b_record_rx, b_byte_tx, b_byte_rx),
    )
}

#[async_trait]
impl RecordPipe for MockPipe {
    async fn send_record(&mut self, record: Bytes) -> TransitResult<()> {
        self.record_tx.send(record).map_err(|_| TransitError::Closed)
    }

    async fn receive_record(&mut self) -> TransitResult<Bytes> {
        self.record_rx.recv().await.ok_or(TransitError::Closed)
    }

    async fn send_bytes(&mut self, chunk: &[u8]) -> TransitResult<()> {
        self.byte_tx
            .send(Bytes::copy_from_slice(chunk))
            .map_err(|_| TransitError::Closed)
    }

    async fn receive_bytes(&mut self, max: usize) -> TransitResult<Bytes> {
        if self.buffer.is_empty() {
            match self.byte_rx.recv().await {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None => return Ok(Bytes::new()),
            }
        }
        let n = self.buffer.len().min(max);
        Ok(self.buffer.split_to(n).freeze())
    }

    async fn close(&mut self) -> TransitResult<()> {
        Ok(())
    }
}

pub struct MockTransitChannel {
    pipe: Option<MockPipe>,
    pub key: Option<Vec<u8>>,
    pub peer_hints: Vec<Hints>,
}

impl MockTransitChannel {
    pub fn with_pipe(pipe: MockPipe) -> Self {
        Self {
            pipe: Some(pipe),
            key: None,
            peer_hints: Vec::new(),
        }
    }
}

#[async_trait]
impl TransitChannel for MockTransitChannel {
    async fn connection_hints(&mut self) -> TransitResult<Hints> {
        Ok(vec![serde_json::json!({
            "type": "direct-tcp-v1",
            "hostname": "127.0.0.1",
            "port": 0,
        })])
    }

    fn connection_abilities(&self) -> Abilities {
        vec![serde_json::json!({"type": "direct-tcp-v1"})]
    }

    fn add_connection_hints(&mut self, hints: Hints) {
        self.peer_hints.push(hints);
    }

    fn transit_key_length(&self) -> usize {
        32
    }

    fn set_transit_key(&mut self, key: Vec<u8>) {
        self.key = Some(key);
    }

    async fn connect(&mut self) -> TransitResult<Box<dyn RecordPipe>> {
        self.pipe
            .take()
            .map(|pipe| Box::new(pipe) as Box<dyn RecordPipe>)
            .ok_or(TransitError::Closed)
    }
}

/// Hands out a single pre-linked channel regardless of side
pub struct MockTransitFactory {
    channel: std::sync::Mutex<Option<MockTransitChannel>>,
}

impl MockTransitFactory {
    pub fn with_channel(channel: MockTransitChannel) -> Self {
        Self {
            channel: std::sync::Mutex::new(Some(channel)),
        }
    }
}

impl TransitFactory for MockTransitFactory {
    fn sender(&self, _relay_url: &str) -> Box<dyn TransitChannel> {
        Box::new(
            self.channel
                .lock()
                .expect("factory lock")
                .take()
                .expect("factory used once"),
        )
    }

    fn receiver(&self, relay_url: &str) -> Box<dyn TransitChannel> {
        self.sender(relay_url)
    }
}

/// Two factories whose channels connect to each other
pub fn transit_link() -> (MockTransitFactory, MockTransitFactory) {
    let (a, b) = pipe_pair();
    (
        MockTransitFactory::with_channel(MockTransitChannel::with_pipe(a)),
        MockTransitFactory::with_channel(MockTransitChannel::with_pipe(b)),
    )
}
