//! In-process cache tier.

use crate::{CacheEntry, CacheResult, CacheTier};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::time::Duration;

/// In-process map with lazy expiry.
///
/// Expired entries are removed when read or by [`MemoryTier::clear_expired`].
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryTier {
    /// Create an empty tier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a live value, evicting it if expired.
    pub fn get_value(&self, key: &str) -> Option<JsonValue> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if entry.is_expired() {
            tracing::debug!(key, "Memory entry expired, removing");
            entries.remove(key);
            return None;
        }
        tracing::debug!(key, time_remaining = ?entry.time_remaining(), "Memory hit");
        Some(entry.value().clone())
    }

    /// Store a value, overwriting any previous entry.
    pub fn set_value(&self, key: &str, value: JsonValue, ttl: Duration) {
        self.entries
            .lock()
            .insert(key.to_string(), CacheEntry::new(key, value, ttl));
    }

    /// Remove a key.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove expired entries, returning how many were evicted.
    pub fn clear_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let removed = before - entries.len();
        if removed > 0 {
            tracing::info!(removed, remaining = entries.len(), "Cleared expired memory entries");
        }
        removed
    }

    /// Number of entries held.
    pub fn entry_count(&self) -> usize {
        self.entries.lock().len()
    }
}

#[async_trait::async_trait]
impl CacheTier for MemoryTier {
    async fn get(&self, key: &str) -> CacheResult<Option<JsonValue>> {
        Ok(self.get_value(key))
    }

    async fn set(&self, key: &str, value: &JsonValue, ttl: Duration) -> CacheResult<()> {
        self.set_value(key, value.clone(), ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.remove(key);
        Ok(())
    }

    async fn len(&self) -> CacheResult<usize> {
        Ok(self.entry_count())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
