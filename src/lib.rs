//! Aufait Relay Library
//!
//! This crate provides the core functionality for the Aufait relay daemon,
//! a store-and-forward rendezvous point: clients push messages or delivery
//! receipts addressed to a destination node, and destination nodes later
//! pull everything queued for them. Requests are authenticated with a
//! timestamped, nonce-protected HMAC envelope; all state is bounded and
//! in-memory.

pub mod auth;
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod store;
