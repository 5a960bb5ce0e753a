//! Wire protocol module.
//!
//! Defines the event model and the JSON bodies exchanged over HTTP.
//! All field names are camelCase on the wire.

mod event;
mod response;

pub use event::{Event, EventKind, ReceiptKind, MAX_ALIAS_CHARS, MAX_MSG_BODY_CHARS, MAX_REF_CHARS};
pub use response::{ErrorBody, Health, PullBatch, PushAck};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in milliseconds since the Unix epoch.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
