//! Multi-tier TTL cache for upstream card data.
//!
//! Tiers are consulted fastest first:
//!
//! 1. [`MemoryTier`]: in-process map, monotonic expiry
//! 2. [`DiskTier`]: one JSON document per key, survives restarts
//! 3. `RedisTier` (feature `redis`): shared remote tier
//!
//! [`TieredCache`] composes them. Tier failures never reach callers: they are
//! logged and treated as a miss for that tier.
//!
//! # Examples
//!
//! ```no_run
//! use decksmith_cache::{CacheConfig, TieredCache};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = TieredCache::new(CacheConfig::default())?;
//! cache.cache_entity_by_id(89631139, &json!({"name": "Blue-Eyes White Dragon"})).await;
//! assert!(cache.get_entity_by_id(89631139).await.is_some());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod disk;
mod entry;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod tier;
mod tiered;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use disk::DiskTier;
pub use entry::CacheEntry;
pub use memory::MemoryTier;
#[cfg(feature = "redis")]
pub use redis::RedisTier;
pub use tier::{CacheResult, CacheTier};
pub use tiered::{CacheStats, TieredCache, card_key, search_key};
