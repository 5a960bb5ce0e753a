//! Configuration settings for the relay daemon.

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::error::RelayError;

/// Environment variable that overrides the configured shared secret.
pub const SHARED_SECRET_ENV: &str = "AUFAIT_RELAY_SHARED_SECRET";

/// Main configuration structure for the relay.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Shared HMAC secret; empty disables request authentication
    /// (intended for trusted-network deployments).
    #[serde(default)]
    pub shared_secret: String,
    /// Nonce time-to-live in milliseconds.
    #[serde(default = "default_nonce_ttl_ms")]
    pub nonce_ttl_ms: u64,
    /// Maximum allowed clock skew between client and server, milliseconds.
    #[serde(default = "default_max_clock_skew_ms")]
    pub max_clock_skew_ms: u64,
    /// Maximum requests per client per window.
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: usize,
    /// Rate limit window in milliseconds.
    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,
}

/// Capacity limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum accepted push body size in bytes.
    #[serde(default = "default_max_push_body_bytes")]
    pub max_push_body_bytes: usize,
    /// Maximum events returned by a single pull.
    #[serde(default = "default_max_pull_batch")]
    pub max_pull_batch: usize,
    /// Maximum queued events per destination.
    #[serde(default = "default_max_queue_per_dest")]
    pub max_queue_per_dest: usize,
    /// Maximum queued events across all destinations.
    #[serde(default = "default_max_total_events")]
    pub max_total_events: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0:8787".to_string()
}

fn default_nonce_ttl_ms() -> u64 {
    10 * 60 * 1000
}

fn default_max_clock_skew_ms() -> u64 {
    5 * 60 * 1000
}

fn default_rate_limit_max_requests() -> usize {
    240
}

fn default_rate_limit_window_ms() -> u64 {
    60 * 1000
}

fn default_max_push_body_bytes() -> usize {
    64 * 1024
}

fn default_max_pull_batch() -> usize {
    100
}

fn default_max_queue_per_dest() -> usize {
    500
}

fn default_max_total_events() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            shared_secret: String::new(),
            nonce_ttl_ms: default_nonce_ttl_ms(),
            max_clock_skew_ms: default_max_clock_skew_ms(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
            rate_limit_window_ms: default_rate_limit_window_ms(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_push_body_bytes: default_max_push_body_bytes(),
            max_pull_batch: default_max_pull_batch(),
            max_queue_per_dest: default_max_queue_per_dest(),
            max_total_events: default_max_total_events(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RelayError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let mut settings: Settings = toml::from_str(&content).map_err(|e| RelayError::Config {
            message: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;

        settings.apply_env();
        settings.validate()?;

        Ok(settings)
    }

    /// Apply environment overrides (currently the shared secret).
    pub fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var(SHARED_SECRET_ENV) {
            self.security.shared_secret = secret.trim().to_string();
        }
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), RelayError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(RelayError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(RelayError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        self.server
            .listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| RelayError::Config {
                message: format!(
                    "Invalid listen address '{}': {}",
                    self.server.listen_addr, e
                ),
            })?;

        if self.limits.max_pull_batch == 0 || self.limits.max_queue_per_dest == 0 {
            return Err(RelayError::Config {
                message: "Pull batch and per-destination queue limits must be non-zero"
                    .to_string(),
            });
        }

        if self.limits.max_total_events < self.limits.max_queue_per_dest {
            return Err(RelayError::Config {
                message: "max_total_events must be at least max_queue_per_dest".to_string(),
            });
        }

        Ok(())
    }
}
