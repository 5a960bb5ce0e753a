//! In-memory nonce cache for replay attack prevention.

use std::collections::HashMap;
use std::sync::Mutex;

/// Thread-safe nonce cache with TTL-based expiry.
///
/// Records are keyed by the exact (client, nonce) pair, so the same nonce
/// seen from a different client address is a distinct entry. Expired
/// entries are swept inline on each call; memory is bounded by the TTL and
/// natural churn rather than an explicit capacity.
pub struct NonceCache {
    /// Map of (client, nonce) -> first-seen time in epoch milliseconds.
    seen: Mutex<HashMap<(String, String), u64>>,
    /// Time-to-live in milliseconds.
    ttl_ms: u64,
}

impl NonceCache {
    /// Create a new nonce cache with the given TTL.
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            ttl_ms,
        }
    }

    /// Check whether the (client, nonce) pair is fresh, recording it if so.
    ///
    /// Returns `true` if the pair has not been seen within the TTL (and is
    /// now recorded), `false` if it is a replay.
    pub fn check_and_record(&self, client: &str, nonce: &str, now_ms: u64) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(), // Recover from mutex poisoning
        };

        // Sweep expired entries (lazy cleanup)
        let expired_before = now_ms.saturating_sub(self.ttl_ms);
        seen.retain(|_, first_seen| *first_seen >= expired_before);

        let key = (client.to_string(), nonce.to_string());
        if seen.contains_key(&key) {
            return false;
        }

        seen.insert(key, now_ms);
        true
    }

    /// Get the current number of recorded nonces (for monitoring).
    pub fn len(&self) -> usize {
        match self.seen.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
