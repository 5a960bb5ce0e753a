//! Error types for the relay daemon.
//!
//! Provides a unified error handling system using thiserror. Every
//! user-facing failure maps to a stable wire code and an HTTP status.

mod types;

pub use types::*;
