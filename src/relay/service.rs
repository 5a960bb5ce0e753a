//! Push / pull orchestration and event payload validation.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::{RelayError, ValidationErrorKind};
use crate::protocol::{
    epoch_ms, Event, EventKind, Health, PushAck, ReceiptKind, MAX_ALIAS_CHARS,
    MAX_MSG_BODY_CHARS, MAX_REF_CHARS,
};
use crate::store::EventQueueStore;

/// Implements the relay's three operations over the queue store.
///
/// Rate limiting and request authentication happen before these are
/// called; this layer owns payload validation and normalization.
pub struct RelayService {
    store: Arc<EventQueueStore>,
    max_pull_batch: usize,
}

impl RelayService {
    /// Create a new relay service over the given store.
    pub fn new(store: Arc<EventQueueStore>, max_pull_batch: usize) -> Self {
        Self {
            store,
            max_pull_batch,
        }
    }

    /// Validate a push body, build the event, and enqueue it.
    ///
    /// `raw_body` is the exact bytes received; the caller has already
    /// checked the size bound and verified the signature over them.
    pub fn push(&self, raw_body: &[u8]) -> Result<PushAck, RelayError> {
        let payload: Value = serde_json::from_slice(raw_body)
            .map_err(|_| RelayError::validation(ValidationErrorKind::BadJson))?;

        let (to_ref, event) = build_event(&payload)?;
        let event_id = event.event_id.clone();

        self.store.enqueue(&to_ref, event);
        debug!(to_ref = %to_ref, event_id = %event_id, "Event queued");

        Ok(PushAck {
            ok: true,
            queued_for: to_ref,
            event_id,
        })
    }

    /// Drain up to one batch of pending events for a destination.
    ///
    /// An empty result is a valid, non-error outcome.
    pub fn pull(&self, node_id: &str) -> Result<Vec<Event>, RelayError> {
        let node_id = node_id.trim();
        if node_id.is_empty() || node_id.chars().count() > MAX_REF_CHARS {
            return Err(RelayError::validation(ValidationErrorKind::MissingNodeId));
        }

        Ok(self.store.drain(node_id, self.max_pull_batch))
    }

    /// Liveness check; touches no queue state.
    pub fn health(&self) -> Health {
        Health {
            ok: true,
            ts: epoch_ms(),
        }
    }
}

/// Extract a trimmed string field; non-string values count as absent.
fn text_field<'a>(payload: &'a Value, name: &str) -> &'a str {
    payload
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
}

/// Validate the payload fields and assemble an immutable event.
///
/// Returns the destination reference alongside the event. `eventId` and
/// `timestampMs` are assigned here, at ingestion.
fn build_event(payload: &Value) -> Result<(String, Event), RelayError> {
    let to_ref = text_field(payload, "toRef");
    let kind_raw = text_field(payload, "type");
    let message_id = text_field(payload, "messageId");
    let from_node_id = text_field(payload, "fromNodeId");
    let from_alias = text_field(payload, "fromAlias");

    if to_ref.is_empty()
        || to_ref.chars().count() > MAX_REF_CHARS
        || message_id.is_empty()
        || message_id.chars().count() > MAX_REF_CHARS
        || from_node_id.chars().count() > MAX_REF_CHARS
        || from_alias.chars().count() > MAX_ALIAS_CHARS
    {
        return Err(RelayError::validation(ValidationErrorKind::InvalidEvent));
    }

    let kind = EventKind::parse(kind_raw)
        .ok_or_else(|| RelayError::validation(ValidationErrorKind::InvalidEvent))?;

    let (body, receipt_kind) = match kind {
        EventKind::Msg => {
            // Missing body normalizes to the empty string
            let body = payload
                .get("body")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            if body.chars().count() > MAX_MSG_BODY_CHARS {
                return Err(RelayError::validation(ValidationErrorKind::MessageTooLarge));
            }
            (Some(body), None)
        }
        EventKind::Receipt => {
            let raw = text_field(payload, "receiptKind").to_ascii_lowercase();
            let receipt = ReceiptKind::parse(&raw)
                .ok_or_else(|| RelayError::validation(ValidationErrorKind::InvalidReceipt))?;
            (None, Some(receipt))
        }
    };

    let event = Event {
        event_id: Uuid::new_v4().to_string(),
        kind,
        message_id: message_id.to_string(),
        from_node_id: from_node_id.to_string(),
        from_alias: from_alias.to_string(),
        timestamp_ms: epoch_ms(),
        body,
        receipt_kind,
    };

    Ok((to_ref.to_string(), event))
}
