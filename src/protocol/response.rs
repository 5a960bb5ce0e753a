//! JSON response bodies.

use serde::{Deserialize, Serialize};

use super::Event;

/// Acknowledgement returned by a successful push.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushAck {
    pub ok: bool,
    pub queued_for: String,
    pub event_id: String,
}

/// Batch of events returned by a pull.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullBatch {
    pub events: Vec<Event>,
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub ok: bool,
    pub ts: u64,
}

/// Error body carrying only a stable code; details stay server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>) -> Self {
        Self { error: code.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_ack_wire_shape() {
        let ack = PushAck {
            ok: true,
            queued_for: "node-B".to_string(),
            event_id: "e-1".to_string(),
        };
        let json = serde_json::to_string(&ack).unwrap();
        assert!(json.contains("\"ok\":true"));
        assert!(json.contains("\"queuedFor\":\"node-B\""));
        assert!(json.contains("\"eventId\":\"e-1\""));
    }

    #[test]
    fn test_error_body_shape() {
        let json = serde_json::to_string(&ErrorBody::new("rate_limited")).unwrap();
        assert_eq!(json, "{\"error\":\"rate_limited\"}");
    }
}
