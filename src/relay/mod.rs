//! Relay operations: push, pull, health.

mod service;

pub use service::RelayService;
