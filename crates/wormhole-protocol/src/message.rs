//! Control messages and the final transfer acknowledgement record

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{MessageError, MessageResult};

/// Connection abilities advertised by a transit channel, opaque to the engine
pub type Abilities = Vec<Value>;

/// Connection hints produced/consumed by a transit channel, opaque to the engine
pub type Hints = Vec<Value>;

/// Transit negotiation payload: what each side can do and where to reach it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitInfo {
    #[serde(rename = "abilities-v1")]
    pub abilities: Abilities,
    #[serde(rename = "hints-v1")]
    pub hints: Hints,
}

/// File metadata advertised by the sender.
///
/// `filename` is chosen by the peer and must never be used as a local path
/// without going through [`sanitized_filename`](crate::sanitized_filename).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOffer {
    pub filename: String,
    pub filesize: u64,
}

/// Payload of an `offer` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferPayload {
    pub file: FileOffer,
}

/// Payload of an `answer` message.
///
/// A missing or non-"ok" `file_ack` means the peer declined the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_ack: Option<String>,
}

impl AnswerPayload {
    pub fn ok() -> Self {
        Self {
            file_ack: Some("ok".to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.file_ack.as_deref() == Some("ok")
    }
}

/// A control message exchanged over the rendezvous channel.
///
/// On the wire this is a JSON object with exactly one recognized top-level
/// key: `{"transit": ...}`, `{"offer": ...}`, `{"answer": ...}` or
/// `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMessage {
    Transit(TransitInfo),
    Offer(OfferPayload),
    Answer(AnswerPayload),
    Error(String),
}

const RECOGNIZED_KEYS: [&str; 4] = ["transit", "offer", "answer", "error"];

impl ControlMessage {
    /// Serialize to canonical JSON bytes
    pub fn encode(&self) -> Bytes {
        // Serialization of these shapes cannot fail
        Bytes::from(serde_json::to_vec(self).expect("control message serializes"))
    }

    /// Parse and validate bytes as a control message.
    ///
    /// The input must be a JSON object carrying exactly one recognized key.
    /// Unrecognized sibling keys are tolerated for forward compatibility;
    /// zero or multiple recognized keys are rejected.
    pub fn decode(data: &[u8]) -> MessageResult<Self> {
        let value: Value = serde_json::from_slice(data)?;
        let map = value.as_object().ok_or(MessageError::NotAMapping)?;

        let mut found: Option<&'static str> = None;
        for key in RECOGNIZED_KEYS {
            if map.contains_key(key) {
                if found.is_some() {
                    return Err(MessageError::ConflictingKeys);
                }
                found = Some(key);
            }
        }
        let key = found.ok_or(MessageError::NoRecognizedKey)?;
        let payload = map[key].clone();

        let bad = |reason: serde_json::Error| MessageError::BadPayload {
            key,
            reason: reason.to_string(),
        };

        Ok(match key {
            "transit" => Self::Transit(serde_json::from_value(payload).map_err(bad)?),
            "offer" => Self::Offer(serde_json::from_value(payload).map_err(bad)?),
            "answer" => Self::Answer(serde_json::from_value(payload).map_err(bad)?),
            "error" => Self::Error(serde_json::from_value(payload).map_err(bad)?),
            _ => unreachable!("key comes from RECOGNIZED_KEYS"),
        })
    }
}

/// Final record exchanged over the transit channel after the file bytes.
///
/// The receiver always reports its digest; the sender checks it only when
/// present and non-empty, preserving the protocol's historical leniency
/// towards peers that do not hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferAck {
    pub ack: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl TransferAck {
    pub fn ok(sha256: String) -> Self {
        Self {
            ack: "ok".to_string(),
            sha256: Some(sha256),
        }
    }

    pub fn encode(&self) -> Bytes {
        Bytes::from(serde_json::to_vec(self).expect("ack record serializes"))
    }

    pub fn decode(data: &[u8]) -> MessageResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}
