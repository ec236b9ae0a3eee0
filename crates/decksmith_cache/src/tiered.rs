//! Tier composition and domain helpers.

use crate::{CacheConfig, CacheResult, CacheTier, DiskTier, MemoryTier};
use decksmith_core::{CardId, SearchParams};
use derive_getters::Getters;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Cache key for a card search.
///
/// Derived from the sorted parameter set, so logically identical queries map
/// to the same key.
pub fn search_key(params: &SearchParams) -> String {
    format!("card_search:{}", params.fingerprint())
}

/// Cache key for a single card.
pub fn card_key(id: CardId) -> String {
    format!("card:{}", id)
}

/// Snapshot of tier occupancy.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct CacheStats {
    /// Entries in the memory tier, including unevicted expired ones
    memory_entries: usize,
    /// Documents in the disk tier, if it could be counted
    disk_entries: Option<usize>,
    /// Whether a remote tier is attached
    remote_configured: bool,
    /// Disk tier directory
    cache_dir: PathBuf,
}

/// Memory, disk and optional remote tiers behind one lookup.
///
/// Reads go fastest first and promote hits into faster tiers. A disk hit keeps
/// no more than its remaining lifetime; a remote hit gets the default TTL. Writes and deletes fan out to every tier. No operation fails: a tier
/// error is logged and treated as a miss for that tier.
pub struct TieredCache {
    config: CacheConfig,
    memory: MemoryTier,
    disk: DiskTier,
    remote: Option<Arc<dyn CacheTier>>,
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("config", &self.config)
            .field("memory", &self.memory)
            .field("disk", &self.disk)
            .field("remote", &self.remote.as_ref().map(|t| t.name()))
            .finish()
    }
}

impl TieredCache {
    /// Build the memory and disk tiers from configuration.
    ///
    /// The remote tier is not attached; see [`TieredCache::connect`].
    ///
    /// # Errors
    ///
    /// Returns error if the disk tier directory cannot be created.
    pub fn new(config: CacheConfig) -> CacheResult<Self> {
        let disk = DiskTier::new(config.cache_dir().clone())?;
        Ok(Self {
            config,
            memory: MemoryTier::new(),
            disk,
            remote: None,
        })
    }

    /// Build all tiers, attaching the remote tier when one is configured.
    ///
    /// A remote tier that cannot be reached is logged and left unattached;
    /// startup never fails on it.
    ///
    /// # Errors
    ///
    /// Returns error if the disk tier directory cannot be created.
    #[tracing::instrument(skip(config))]
    pub async fn connect(config: CacheConfig) -> CacheResult<Self> {
        let mut cache = Self::new(config)?;
        cache.attach_configured_remote().await;
        Ok(cache)
    }

    #[cfg(feature = "redis")]
    async fn attach_configured_remote(&mut self) {
        let Some(url) = self.config.redis_url().clone() else {
            return;
        };
        match crate::RedisTier::connect(&url).await {
            Ok(tier) => self.remote = Some(Arc::new(tier)),
            Err(e) => {
                tracing::warn!(error = %e, "Remote cache tier unavailable, continuing without it")
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn attach_configured_remote(&mut self) {
        if self.config.redis_url().is_some() {
            tracing::warn!("Remote cache URL set but the redis feature is disabled");
        }
    }

    /// Attach a remote tier.
    pub fn with_remote(mut self, tier: Arc<dyn CacheTier>) -> Self {
        self.remote = Some(tier);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The in-process tier.
    pub fn memory(&self) -> &MemoryTier {
        &self.memory
    }

    /// The on-disk tier.
    pub fn disk(&self) -> &DiskTier {
        &self.disk
    }

    /// Look up a key across tiers.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Option<JsonValue> {
        if let Some(value) = self.memory.get_value(key) {
            return Some(value);
        }

        let promote_ttl = self.config.default_ttl();

        match self.disk.get_with_remaining(key).await {
            Ok(Some((value, remaining))) => {
                tracing::debug!(?remaining, "Disk hit, promoting to memory");
                self.memory
                    .set_value(key, value.clone(), remaining.min(promote_ttl));
                return Some(value);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Disk cache read failed"),
        }

        if let Some(remote) = &self.remote {
            match remote.get(key).await {
                Ok(Some(value)) => {
                    tracing::debug!(tier = remote.name(), "Remote hit, promoting");
                    self.memory.set_value(key, value.clone(), promote_ttl);
                    if let Err(e) = self.disk.set(key, &value, promote_ttl).await {
                        tracing::warn!(error = %e, "Disk cache promotion failed");
                    }
                    return Some(value);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(tier = remote.name(), error = %e, "Remote cache read failed"),
            }
        }

        tracing::debug!("Cache miss");
        None
    }

    /// Store a value in every tier. `None` uses the default TTL.
    #[tracing::instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: &JsonValue, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());

        self.memory.set_value(key, value.clone(), ttl);

        if let Err(e) = self.disk.set(key, value, ttl).await {
            tracing::warn!(error = %e, "Disk cache write failed");
        }

        if let Some(remote) = &self.remote
            && let Err(e) = remote.set(key, value, ttl).await
        {
            tracing::warn!(tier = remote.name(), error = %e, "Remote cache write failed");
        }
    }

    /// Remove a key from every tier.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, key: &str) {
        self.memory.remove(key);

        if let Err(e) = self.disk.delete(key).await {
            tracing::warn!(error = %e, "Disk cache delete failed");
        }

        if let Some(remote) = &self.remote
            && let Err(e) = remote.delete(key).await
        {
            tracing::warn!(tier = remote.name(), error = %e, "Remote cache delete failed");
        }
    }

    /// Evict expired memory entries. Disk and remote tiers expire on their own.
    pub fn clear_expired(&self) -> usize {
        self.memory.clear_expired()
    }

    /// Cache search results under the search TTL.
    pub async fn cache_search_results(&self, params: &SearchParams, results: &JsonValue) {
        self.set(&search_key(params), results, Some(self.config.search_ttl()))
            .await;
    }

    /// Cached search results, if any.
    pub async fn get_search_results(&self, params: &SearchParams) -> Option<JsonValue> {
        self.get(&search_key(params)).await
    }

    /// Cache one card under the card TTL.
    pub async fn cache_entity_by_id(&self, id: CardId, value: &JsonValue) {
        self.set(&card_key(id), value, Some(self.config.card_ttl()))
            .await;
    }

    /// Cached card, if any.
    pub async fn get_entity_by_id(&self, id: CardId) -> Option<JsonValue> {
        self.get(&card_key(id)).await
    }

    /// Tier occupancy.
    pub async fn stats(&self) -> CacheStats {
        let disk_entries = match self.disk.len().await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(error = %e, "Could not count disk cache entries");
                None
            }
        };

        CacheStats {
            memory_entries: self.memory.entry_count(),
            disk_entries,
            remote_configured: self.remote.is_some(),
            cache_dir: self.disk.base_path().to_path_buf(),
        }
    }
}
