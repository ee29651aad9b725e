//! Codec error types

use thiserror::Error;

/// Failure to interpret bytes as a well-formed control message.
///
/// Every variant is a protocol violation by the peer; callers surface all of
/// them identically and never need to distinguish the shapes.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAMapping,

    #[error("message carries no recognized key")]
    NoRecognizedKey,

    #[error("message carries more than one recognized key")]
    ConflictingKeys,

    #[error("malformed {key} payload: {reason}")]
    BadPayload { key: &'static str, reason: String },
}

pub type MessageResult<T> = Result<T, MessageError>;
