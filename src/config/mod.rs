//! Configuration module for the relay daemon.
//!
//! Handles loading and validating configuration from TOML files, with an
//! environment override for the shared secret.

mod settings;

pub use settings::*;
