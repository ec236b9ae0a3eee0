//! In-memory cache entries.

use derive_getters::Getters;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::Instant;

/// Cache entry with value and expiration.
///
/// An entry is never served once `now >= expires_at`.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    key: String,
    value: JsonValue,
    expires_at: Instant,
}

// TTLs past the clock's range saturate at a century.
fn expiry_after(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .unwrap_or_else(|| now + Duration::from_secs(100 * 365 * 86_400))
}

impl CacheEntry {
    /// Create an entry expiring `ttl` from now.
    pub fn new(key: impl Into<String>, value: JsonValue, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            value,
            expires_at: expiry_after(ttl),
        }
    }

    /// Check if this entry is expired.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Get remaining time until expiration.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.expires_at.checked_duration_since(Instant::now())
    }
}
