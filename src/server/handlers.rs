//! Request handlers.
//!
//! Every handler runs the same gauntlet: rate limit first, then (for
//! protected operations) signature verification over the exact bytes
//! received, then dispatch into the relay service.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::error::RelayError;
use crate::protocol::{ErrorBody, Health, PullBatch, PushAck};

use super::router::AppState;

/// Query parameters accepted by pull.
#[derive(Debug, Deserialize)]
pub struct PullParams {
    #[serde(default, rename = "nodeId")]
    node_id: Option<String>,
}

/// `GET /healthz` — liveness, unauthenticated, rate-limited.
pub async fn healthz(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Json<Health>, RelayError> {
    state.check_rate(&addr.ip().to_string())?;
    Ok(Json(state.relay.health()))
}

/// `GET /v1/pull?nodeId=<id>` — drain one batch for a destination.
pub async fn pull(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<PullParams>,
) -> Result<Json<PullBatch>, RelayError> {
    let client = addr.ip().to_string();
    state.check_rate(&client)?;
    state.authenticate("GET", path_with_query(&uri), &headers, b"", &client)?;

    let events = state.relay.pull(params.node_id.as_deref().unwrap_or(""))?;
    debug!(client = %client, count = events.len(), "Pull served");

    Ok(Json(PullBatch { events }))
}

/// `POST /v1/push` — validate, authenticate, and enqueue one event.
pub async fn push(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PushAck>, RelayError> {
    let client = addr.ip().to_string();
    state.check_rate(&client)?;

    if body.is_empty() || body.len() > state.max_push_body_bytes {
        return Err(RelayError::PayloadTooLarge {
            size: body.len(),
            max: state.max_push_body_bytes,
        });
    }

    // Signature covers the exact bytes received, before any parsing
    state.authenticate("POST", path_with_query(&uri), &headers, &body, &client)?;

    let ack = state.relay.push(&body)?;
    debug!(client = %client, queued_for = %ack.queued_for, "Push accepted");

    Ok(Json(ack))
}

/// Any unknown route, still charged against the rate window.
pub async fn not_found(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    uri: Uri,
) -> RelayError {
    if let Err(limited) = state.check_rate(&addr.ip().to_string()) {
        return limited;
    }
    RelayError::NotFound {
        path: uri.path().to_string(),
    }
}

fn path_with_query(uri: &Uri) -> &str {
    uri.path_and_query().map_or(uri.path(), |pq| pq.as_str())
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            RelayError::Auth { .. } => warn!(error = %self, "Request rejected"),
            RelayError::Config { .. } | RelayError::Io(_) | RelayError::Serialization(_) => {
                error!(error = %self, "Internal failure")
            }
            _ => debug!(error = %self, "Request rejected"),
        }

        let status = StatusCode::from_u16(self.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody::new(self.wire_code()))).into_response()
    }
}
