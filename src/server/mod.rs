//! HTTP server module.
//!
//! Thin axum transport over the relay core: routing, client identity,
//! and translation of `RelayError` into JSON error responses.

mod handlers;
mod router;

pub use router::{build_router, AppState};
