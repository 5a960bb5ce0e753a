//! Error types for the relay daemon.

use thiserror::Error;

/// Main error type for the relay.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Authentication errors.
    #[error("Authentication error: {kind}")]
    Auth { kind: AuthErrorKind },

    /// Request validation errors.
    #[error("Validation error: {kind}")]
    Validation { kind: ValidationErrorKind },

    /// Per-client request budget exhausted.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Push body outside the accepted size range.
    #[error("Request body of {size} bytes outside accepted range (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Unknown route.
    #[error("Unknown path: {path}")]
    NotFound { path: String },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Authentication error kinds.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    #[error("Unsupported signing algorithm")]
    UnsupportedAlgorithm,

    #[error("Missing authentication headers")]
    MissingHeaders,

    #[error("Malformed nonce or signature")]
    MalformedCredentials,

    #[error("Timestamp is not a valid integer")]
    MalformedTimestamp,

    #[error("Timestamp outside the allowed clock skew window")]
    StaleTimestamp,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Nonce already used (replay attack detected)")]
    NonceReplayed,
}

impl AuthErrorKind {
    /// Stable error code sent to clients.
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::UnsupportedAlgorithm => "bad_alg",
            Self::MissingHeaders => "missing_auth",
            Self::MalformedCredentials => "bad_auth_format",
            Self::MalformedTimestamp => "bad_ts",
            Self::StaleTimestamp => "stale_ts",
            Self::InvalidSignature => "bad_sig",
            Self::NonceReplayed => "replay_nonce",
        }
    }
}

/// Validation error kinds.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    #[error("Missing or invalid nodeId")]
    MissingNodeId,

    #[error("Request body is not valid JSON")]
    BadJson,

    #[error("Event failed field validation")]
    InvalidEvent,

    #[error("Message body exceeds the maximum length")]
    MessageTooLarge,

    #[error("Receipt kind is not 'delivered' or 'read'")]
    InvalidReceipt,
}

impl ValidationErrorKind {
    /// Stable error code sent to clients.
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::MissingNodeId => "missing_nodeId",
            Self::BadJson => "bad_json",
            Self::InvalidEvent => "invalid_event",
            Self::MessageTooLarge => "msg_too_large",
            Self::InvalidReceipt => "invalid_receipt",
        }
    }
}

impl RelayError {
    /// Convenience constructor for authentication failures.
    pub fn auth(kind: AuthErrorKind) -> Self {
        Self::Auth { kind }
    }

    /// Convenience constructor for validation failures.
    pub fn validation(kind: ValidationErrorKind) -> Self {
        Self::Validation { kind }
    }

    /// Stable error code sent to clients.
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::Auth { kind } => kind.wire_code(),
            Self::Validation { kind } => kind.wire_code(),
            Self::RateLimited => "rate_limited",
            Self::PayloadTooLarge { .. } => "body_too_large",
            Self::NotFound { .. } => "not_found",
            Self::Config { .. } | Self::Io(_) | Self::Serialization(_) => "internal_error",
        }
    }

    /// HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Auth { .. } => 401,
            Self::Validation { .. } => 400,
            Self::RateLimited => 429,
            Self::PayloadTooLarge { .. } => 413,
            Self::NotFound { .. } => 404,
            Self::Config { .. } | Self::Io(_) | Self::Serialization(_) => 500,
        }
    }
}

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_wire_codes() {
        assert_eq!(
            RelayError::auth(AuthErrorKind::NonceReplayed).wire_code(),
            "replay_nonce"
        );
        assert_eq!(
            RelayError::auth(AuthErrorKind::StaleTimestamp).wire_code(),
            "stale_ts"
        );
        assert_eq!(RelayError::auth(AuthErrorKind::NonceReplayed).http_status(), 401);
    }

    #[test]
    fn test_validation_wire_codes() {
        assert_eq!(
            RelayError::validation(ValidationErrorKind::MissingNodeId).wire_code(),
            "missing_nodeId"
        );
        assert_eq!(
            RelayError::validation(ValidationErrorKind::MessageTooLarge).http_status(),
            400
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert_eq!(RelayError::RateLimited.http_status(), 429);
        assert_eq!(
            RelayError::PayloadTooLarge { size: 70_000, max: 65_536 }.http_status(),
            413
        );
        assert_eq!(
            RelayError::NotFound { path: "/nope".to_string() }.http_status(),
            404
        );
    }
}
