//! Cache configuration.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// TTL policy and tier locations.
///
/// # Examples
///
/// ```
/// use decksmith_cache::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::default().with_search_ttl_secs(60);
/// assert_eq!(config.search_ttl(), Duration::from_secs(60));
/// assert_eq!(config.card_ttl(), Duration::from_secs(86_400));
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct CacheConfig {
    /// TTL for anything without a category (seconds)
    #[serde(default = "default_ttl_secs")]
    default_ttl_secs: u64,

    /// TTL for entity-by-id lookups (seconds)
    #[serde(default = "default_card_ttl_secs")]
    card_ttl_secs: u64,

    /// TTL for search results (seconds)
    #[serde(default = "default_search_ttl_secs")]
    search_ttl_secs: u64,

    /// Directory for the disk tier
    #[serde(default = "default_cache_dir")]
    cache_dir: PathBuf,

    /// Remote tier URL; unset disables the remote tier
    #[serde(default)]
    #[setters(strip_option)]
    redis_url: Option<String>,
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_card_ttl_secs() -> u64 {
    86_400
}

fn default_search_ttl_secs() -> u64 {
    1800
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            card_ttl_secs: default_card_ttl_secs(),
            search_ttl_secs: default_search_ttl_secs(),
            cache_dir: default_cache_dir(),
            redis_url: None,
        }
    }
}

impl CacheConfig {
    /// Creates a new config builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// TTL for uncategorised entries and read-through promotion.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// TTL for entity-by-id entries.
    pub fn card_ttl(&self) -> Duration {
        Duration::from_secs(self.card_ttl_secs)
    }

    /// TTL for search result entries.
    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }
}
