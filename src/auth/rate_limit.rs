//! Per-client rate limiting.
//!
//! Provides a sliding window rate limiter that caps the number of requests
//! a single client address can make within a time window. The budget is
//! shared across all operations for a given client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::protocol::epoch_ms;

/// A sliding window rate limiter that tracks requests per client address.
pub struct RateLimiter {
    /// Request timestamps (epoch milliseconds) per client.
    windows: Mutex<HashMap<String, Vec<u64>>>,
    /// Maximum requests allowed per window.
    max_requests: usize,
    /// Window duration in milliseconds.
    window_ms: u64,
}

impl RateLimiter {
    /// Create a new rate limiter.
    pub fn new(max_requests: usize, window_ms: u64) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window_ms,
        }
    }

    /// Check whether a request from the given client is allowed, recording it.
    ///
    /// Returns `true` if the request is allowed, `false` if rate limited.
    /// A rejected request is not recorded against the window.
    pub fn allow(&self, client: &str, now_ms: u64) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let cutoff = now_ms.saturating_sub(self.window_ms);

        let entry = windows.entry(client.to_string()).or_default();

        // Drop timestamps outside the window
        entry.retain(|&t| t > cutoff);

        if entry.len() >= self.max_requests {
            return false; // Rate limited
        }

        entry.push(now_ms);
        true
    }

    /// Drop clients whose entire window has expired.
    ///
    /// Keeps idle-client memory from accumulating; safe to call at any time.
    pub fn cleanup(&self, now_ms: u64) {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let cutoff = now_ms.saturating_sub(self.window_ms);

        windows.retain(|_, times| {
            times.retain(|&t| t > cutoff);
            !times.is_empty()
        });
    }

    /// Get the number of clients being tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Start a background cleanup task.
    ///
    /// Spawns a tokio task that periodically drops idle clients so the
    /// window map does not grow without bound.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration) {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            loop {
                interval_timer.tick().await;
                limiter.cleanup(epoch_ms());
            }
        });
    }
}
