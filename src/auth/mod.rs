//! Authentication module.
//!
//! Handles HMAC request verification, nonce tracking for replay
//! prevention, and per-client rate limiting.

mod hmac;
mod nonce;
mod rate_limit;

pub use hmac::{
    canonical_string, AuthHeaders, RequestAuthenticator, HEADER_ALGORITHM, HEADER_NONCE,
    HEADER_SIGNATURE, HEADER_TIMESTAMP, SIGNING_ALGORITHM,
};
pub use nonce::NonceCache;
pub use rate_limit::RateLimiter;
