//! Message envelope for the popup / coordinator / selection-agent channel.
//!
//! DESIGN
//! ======
//! Every exchange on the channel is a `Message`. Requests carry an `op`
//! ("capture:request", "selection:complete", ...) and a flat JSON payload.
//! Replies correlate to their request through `parent_id`. Broadcasts have no
//! parent and are fanned out to every listener (the cleanup signal for the
//! selection overlay is the only one today).
//!
//! The host transports messages as JSON; the codec here is the single place
//! that turns bytes into envelopes.

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// =============================================================================
// OPS
// =============================================================================

/// Popup → coordinator: capture the active page in the given mode.
pub const OP_CAPTURE_REQUEST: &str = "capture:request";
/// Selection agent → coordinator: the user finished drawing a rectangle.
pub const OP_SELECTION_COMPLETE: &str = "selection:complete";
/// Selection agent → coordinator: the user aborted the selection.
pub const OP_SELECTION_CANCEL: &str = "selection:cancel";
/// Coordinator → everyone: tear down any selection overlay still on screen.
pub const OP_SELECTION_CLEANUP: &str = "selection:cleanup";

// =============================================================================
// DATA KEYS
// =============================================================================

/// Data key for the human-readable error message.
pub const DATA_MESSAGE: &str = "message";
/// Data key for grepable error codes.
pub const DATA_CODE: &str = "code";
/// Data key for the user-facing error category.
pub const DATA_CATEGORY: &str = "category";
/// Data key for the retryable flag on error replies.
pub const DATA_RETRYABLE: &str = "retryable";

/// Error returned by [`decode_message`] and [`encode_message`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The bytes were not a valid JSON envelope.
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
    /// The envelope could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    /// A payload field was missing or had the wrong shape.
    #[error("invalid payload for {op}: {reason}")]
    InvalidPayload { op: String, reason: String },
}

/// Lifecycle position of a message.
///
/// Every exchange is `request → done` or `request → error`; broadcasts stand
/// alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Initial request.
    Request,
    /// Successful terminal reply.
    Done,
    /// Failed terminal reply.
    Error,
    /// The sender withdrew the request.
    Cancel,
    /// Fire-and-forget notification with no reply.
    Broadcast,
}

impl Status {
    /// Terminal statuses end an exchange.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancel)
    }
}

/// A single message on the channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message.
    pub id: Uuid,
    /// The request this message replies to, if any.
    pub parent_id: Option<Uuid>,
    /// Milliseconds since the Unix epoch when the message was created.
    pub ts: i64,
    /// Sender label (`"popup"`, `"coordinator"`, `"agent"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Namespaced operation name, e.g. `"capture:request"`.
    pub op: String,
    /// Lifecycle position.
    pub status: Status,
    /// Flat JSON payload.
    pub data: Value,
}

impl Message {
    /// Build a new request.
    #[must_use]
    pub fn request(op: &str, data: Value) -> Self {
        Self::new(op, Status::Request, None, data)
    }

    /// Build a broadcast with an empty payload.
    #[must_use]
    pub fn broadcast(op: &str) -> Self {
        Self::new(op, Status::Broadcast, None, Value::Object(Map::new()))
    }

    /// Build a successful reply to `self`.
    #[must_use]
    pub fn done(&self, data: Value) -> Self {
        Self::new(&self.op, Status::Done, Some(self.id), data)
    }

    /// Build an error reply to `self`.
    #[must_use]
    pub fn error(&self, code: &str, category: &str, message: &str, retryable: bool) -> Self {
        let mut data = Map::new();
        data.insert(DATA_CODE.into(), Value::String(code.into()));
        data.insert(DATA_CATEGORY.into(), Value::String(category.into()));
        data.insert(DATA_MESSAGE.into(), Value::String(message.into()));
        data.insert(DATA_RETRYABLE.into(), Value::Bool(retryable));
        Self::new(&self.op, Status::Error, Some(self.id), Value::Object(data))
    }

    /// Tag the sender.
    #[must_use]
    pub fn with_from(mut self, from: &str) -> Self {
        self.from = Some(from.to_owned());
        self
    }

    /// Read a string payload field.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Read a numeric payload field.
    #[must_use]
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }

    /// Deserialize the whole payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidPayload`] when the payload does not match `T`.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, CodecError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| CodecError::InvalidPayload { op: self.op.clone(), reason: e.to_string() })
    }

    fn new(op: &str, status: Status, parent_id: Option<Uuid>, data: Value) -> Self {
        Self { id: Uuid::new_v4(), parent_id, ts: now_ms(), from: None, op: op.to_owned(), status, data }
    }
}

/// Encode a message into JSON bytes.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_message(message: &Message) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(message).map_err(CodecError::Encode)
}

/// Decode JSON bytes into a message.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes or unknown statuses.
pub fn decode_message(bytes: &[u8]) -> Result<Message, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}

fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}
