//! Route table and shared handler state.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;

use crate::auth::{
    AuthHeaders, RateLimiter, RequestAuthenticator, HEADER_ALGORITHM, HEADER_NONCE,
    HEADER_SIGNATURE, HEADER_TIMESTAMP,
};
use crate::error::RelayError;
use crate::protocol::epoch_ms;
use crate::relay::RelayService;

use super::handlers;

/// Hard backstop on request body buffering; the push limit is enforced
/// separately so the client sees the relay's own 413 body.
const BODY_BUFFER_BACKSTOP: usize = 1_048_576;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayService>,
    pub authenticator: Arc<RequestAuthenticator>,
    pub rate_limiter: Arc<RateLimiter>,
    pub max_push_body_bytes: usize,
}

impl AppState {
    /// Charge one request against the client's rate window.
    pub(super) fn check_rate(&self, client: &str) -> Result<(), RelayError> {
        if self.rate_limiter.allow(client, epoch_ms()) {
            Ok(())
        } else {
            Err(RelayError::RateLimited)
        }
    }

    /// Verify the signed request envelope against the raw body bytes.
    pub(super) fn authenticate(
        &self,
        method: &str,
        path_with_query: &str,
        headers: &HeaderMap,
        body: &[u8],
        client: &str,
    ) -> Result<(), RelayError> {
        let auth_headers = AuthHeaders {
            timestamp: header_str(headers, HEADER_TIMESTAMP),
            nonce: header_str(headers, HEADER_NONCE),
            signature: header_str(headers, HEADER_SIGNATURE),
            algorithm: header_str(headers, HEADER_ALGORITHM),
        };
        self.authenticator
            .verify(method, path_with_query, &auth_headers, body, client, epoch_ms())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Build the relay's route table.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/v1/pull", get(handlers::pull))
        .route("/v1/push", post(handlers::push))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(BODY_BUFFER_BACKSTOP))
        .with_state(state)
}
