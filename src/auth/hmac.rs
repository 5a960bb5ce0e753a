//! HMAC-SHA256 request signing and verification.

use std::sync::Arc;

use ring::{digest, hmac};

use crate::error::{AuthErrorKind, RelayError};

use super::NonceCache;

/// Header carrying the client's epoch-millisecond timestamp.
pub const HEADER_TIMESTAMP: &str = "x-af-ts";
/// Header carrying the single-use nonce.
pub const HEADER_NONCE: &str = "x-af-nonce";
/// Header carrying the lowercase hex HMAC signature.
pub const HEADER_SIGNATURE: &str = "x-af-sig";
/// Optional header naming the signing algorithm.
pub const HEADER_ALGORITHM: &str = "x-af-alg";

/// The only accepted value for the algorithm header.
pub const SIGNING_ALGORITHM: &str = "HMAC-SHA256";

/// Maximum accepted nonce length, in characters.
const MAX_NONCE_CHARS: usize = 128;

/// Expected signature length: 64 hex characters (32 bytes).
const SIGNATURE_HEX_CHARS: usize = 64;

/// Authentication headers extracted from an incoming request.
///
/// Values are the raw header strings; `None` when the header is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthHeaders<'a> {
    pub timestamp: Option<&'a str>,
    pub nonce: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub algorithm: Option<&'a str>,
}

/// Build the canonical signing string for a request.
///
/// Format, newline-joined: uppercased method, path with query, timestamp,
/// nonce, lowercase hex SHA-256 of the raw body bytes.
pub fn canonical_string(
    method: &str,
    path_with_query: &str,
    timestamp_ms: i64,
    nonce: &str,
    body: &[u8],
) -> String {
    let body_hash = hex::encode(digest::digest(&digest::SHA256, body).as_ref());
    format!(
        "{}\n{}\n{}\n{}\n{}",
        method.to_ascii_uppercase(),
        path_with_query,
        timestamp_ms,
        nonce,
        body_hash
    )
}

/// Validator for the signed request envelope.
///
/// When no shared secret is configured every request passes; this mode is
/// intended for trusted-network deployments.
pub struct RequestAuthenticator {
    key: Option<hmac::Key>,
    nonce_cache: Arc<NonceCache>,
    max_skew_ms: u64,
}

impl RequestAuthenticator {
    /// Create a new authenticator. An empty secret disables authentication.
    pub fn new(shared_secret: &str, nonce_cache: Arc<NonceCache>, max_skew_ms: u64) -> Self {
        let secret = shared_secret.trim();
        let key = if secret.is_empty() {
            None
        } else {
            Some(hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()))
        };
        Self {
            key,
            nonce_cache,
            max_skew_ms,
        }
    }

    /// Whether signature verification is active.
    pub fn enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Validate a request envelope.
    ///
    /// Checks, in order: algorithm, header presence, nonce/signature format,
    /// timestamp parse, clock skew, signature, nonce freshness. The nonce is
    /// recorded only after the signature verifies, so a forged request cannot
    /// poison the cache.
    pub fn verify(
        &self,
        method: &str,
        path_with_query: &str,
        headers: &AuthHeaders<'_>,
        body: &[u8],
        client: &str,
        now_ms: u64,
    ) -> Result<(), RelayError> {
        let Some(key) = &self.key else {
            return Ok(());
        };

        let algorithm = headers.algorithm.map(str::trim).unwrap_or("");
        if !algorithm.is_empty() && !algorithm.eq_ignore_ascii_case(SIGNING_ALGORITHM) {
            return Err(RelayError::auth(AuthErrorKind::UnsupportedAlgorithm));
        }

        let ts_raw = headers.timestamp.map(str::trim).unwrap_or("");
        let nonce = headers.nonce.map(str::trim).unwrap_or("");
        let signature = headers
            .signature
            .map(|s| s.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if ts_raw.is_empty() || nonce.is_empty() || signature.is_empty() {
            return Err(RelayError::auth(AuthErrorKind::MissingHeaders));
        }

        if nonce.chars().count() > MAX_NONCE_CHARS
            || signature.chars().count() != SIGNATURE_HEX_CHARS
        {
            return Err(RelayError::auth(AuthErrorKind::MalformedCredentials));
        }

        let timestamp_ms: i64 = ts_raw
            .parse()
            .map_err(|_| RelayError::auth(AuthErrorKind::MalformedTimestamp))?;

        if (now_ms as i64).abs_diff(timestamp_ms) > self.max_skew_ms {
            return Err(RelayError::auth(AuthErrorKind::StaleTimestamp));
        }

        let canonical = canonical_string(method, path_with_query, timestamp_ms, nonce, body);

        let supplied = hex::decode(&signature)
            .map_err(|_| RelayError::auth(AuthErrorKind::InvalidSignature))?;

        // ring's verify is constant-time; never compare signatures with ==
        hmac::verify(key, canonical.as_bytes(), &supplied)
            .map_err(|_| RelayError::auth(AuthErrorKind::InvalidSignature))?;

        // Recorded only on signature success, and last
        if !self.nonce_cache.check_and_record(client, nonce, now_ms) {
            return Err(RelayError::auth(AuthErrorKind::NonceReplayed));
        }

        Ok(())
    }

    /// Produce a lowercase hex signature for a request (for testing).
    #[cfg(test)]
    pub fn sign(
        &self,
        method: &str,
        path_with_query: &str,
        timestamp_ms: i64,
        nonce: &str,
        body: &[u8],
    ) -> String {
        let key = self.key.as_ref().expect("signing requires a secret");
        let canonical = canonical_string(method, path_with_query, timestamp_ms, nonce, body);
        hex::encode(hmac::sign(key, canonical.as_bytes()).as_ref())
    }
}
