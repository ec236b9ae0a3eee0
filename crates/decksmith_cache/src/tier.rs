//! Common interface for cache tiers.

use decksmith_error::CacheError;
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Result type for tier operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// One cache layer.
///
/// Implementations own their entries outright. Values handed to `set` are
/// copied, never shared with another tier.
#[async_trait::async_trait]
pub trait CacheTier: Send + Sync {
    /// Fetch a live value. Expired entries are absent.
    async fn get(&self, key: &str) -> CacheResult<Option<JsonValue>>;

    /// Store a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &JsonValue, ttl: Duration) -> CacheResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Number of stored entries, including not-yet-evicted expired ones.
    async fn len(&self) -> CacheResult<usize>;

    /// Tier name for logs and stats.
    fn name(&self) -> &'static str;
}
