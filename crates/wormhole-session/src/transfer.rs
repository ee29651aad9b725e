//! File transfer engine
//!
//! Chunked read-hash-send and receive-hash-write over an established record
//! pipe. The digest covers file content only, never control records.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};
use wormhole_protocol::TransferAck;

use crate::{RecordPipe, SessionError, SessionResult};

/// Chunk size for streaming file content
const CHUNK_SIZE: usize = 16 * 1024;

/// Optional per-chunk progress callback, invoked with each chunk's byte length
pub type Progress<'a> = Option<&'a mut (dyn FnMut(usize) + Send)>;

/// Stream `path` through the pipe, then check the peer's acknowledgement.
///
/// The peer's digest is verified only when it reports one; a missing or
/// empty digest skips the check.
pub(crate) async fn send(
    mut pipe: Box<dyn RecordPipe>,
    path: &Path,
    mut progress: Progress<'_>,
) -> SessionResult<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut sent = 0u64;

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        pipe.send_bytes(&buffer[..n]).await?;
        sent += n as u64;
        if let Some(callback) = progress.as_deref_mut() {
            callback(n);
        }
    }
    debug!(bytes = sent, "file content sent, awaiting acknowledgement");

    let ours = hex::encode(hasher.finalize());
    let ack = TransferAck::decode(&pipe.receive_record().await?)?;
    let _ = pipe.close().await;

    if ack.ack != "ok" {
        return Err(SessionError::Protocol("file transfer failed".to_string()));
    }
    if let Some(theirs) = ack.sha256.filter(|digest| !digest.is_empty()) {
        if theirs != ours {
            return Err(SessionError::Integrity { ours, theirs });
        }
    }

    info!(bytes = sent, digest = %ours, "file sent");
    Ok(ours)
}

/// Read exactly `filesize` bytes from the pipe into `path`, then report our
/// digest back to the peer.
pub(crate) async fn receive(
    mut pipe: Box<dyn RecordPipe>,
    path: &Path,
    filesize: u64,
    mut progress: Progress<'_>,
) -> SessionResult<String> {
    let mut file = File::create(path).await?;
    let mut hasher = Sha256::new();
    let mut received = 0u64;

    while received < filesize {
        let want = CHUNK_SIZE.min((filesize - received) as usize);
        let chunk = pipe.receive_bytes(want).await?;
        if chunk.is_empty() {
            break;
        }
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
        received += chunk.len() as u64;
        if let Some(callback) = progress.as_deref_mut() {
            callback(chunk.len());
        }
    }
    file.flush().await?;

    if received < filesize {
        return Err(SessionError::Incomplete {
            expected: filesize,
            received,
        });
    }

    let ours = hex::encode(hasher.finalize());
    pipe.send_record(TransferAck::ok(ours.clone()).encode())
        .await?;
    let _ = pipe.close().await;

    info!(bytes = received, digest = %ours, "file received");
    Ok(ours)
}
