//! The stored and delivered event model.

use serde::{Deserialize, Serialize};

/// Maximum length of node references and message identifiers, in characters.
pub const MAX_REF_CHARS: usize = 128;

/// Maximum length of a sender alias, in characters.
pub const MAX_ALIAS_CHARS: usize = 64;

/// Maximum length of a message body, in characters.
pub const MAX_MSG_BODY_CHARS: usize = 16_000;

/// One relayed unit: a message or a delivery receipt.
///
/// Events are immutable once created. `event_id` and `timestamp_ms` are
/// assigned at ingestion; the remaining fields are caller-supplied and
/// validated by the relay service. Exactly one of `body` / `receipt_kind`
/// is present, matching `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Generated unique identifier, never reused.
    pub event_id: String,

    /// Event type discriminator.
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Caller-supplied correlation identifier, opaque to the relay.
    pub message_id: String,

    /// Sender node identifier, may be empty.
    pub from_node_id: String,

    /// Sender display alias, may be empty.
    pub from_alias: String,

    /// Server-assigned ingestion time, epoch milliseconds.
    pub timestamp_ms: u64,

    /// Text payload, present only when `kind` is `Msg`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Receipt classification, present only when `kind` is `Receipt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_kind: Option<ReceiptKind>,
}

/// Event type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Msg,
    Receipt,
}

impl EventKind {
    /// Parse a wire value; anything other than `msg` / `receipt` is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "msg" => Some(Self::Msg),
            "receipt" => Some(Self::Receipt),
            _ => None,
        }
    }
}

/// Receipt classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptKind {
    Delivered,
    Read,
}

impl ReceiptKind {
    /// Parse a wire value (already trimmed and lowercased by the caller).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "delivered" => Some(Self::Delivered),
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}
