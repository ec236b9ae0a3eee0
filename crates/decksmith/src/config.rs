//! Configuration loading for the decksmith stack.
//!
//! Configuration is layered:
//! - Bundled defaults (include_str! from decksmith.toml)
//! - `~/.config/decksmith/decksmith.toml`
//! - `./decksmith.toml`
//! - `DECKSMITH__*` environment variables (e.g. `DECKSMITH__CACHE__REDIS_URL`)

use config::{Config, Environment, File, FileFormat};
use decksmith_cache::CacheConfig;
use decksmith_error::{ConfigError, DecksmithError, DecksmithResult};
use decksmith_rate_limit::{QueueConfig, RateLimitConfig};
use decksmith_retry::RetryConfig;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Where and how to reach the upstream card-data service.
///
/// # Examples
///
/// ```
/// use decksmith::UpstreamConfig;
/// use std::time::Duration;
///
/// let config = UpstreamConfig::default();
/// assert_eq!(config.base_url(), "https://db.ygoprodeck.com/api/v7");
/// assert_eq!(config.timeout(), Duration::from_secs(10));
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_", into)]
#[builder(default, setter(into))]
pub struct UpstreamConfig {
    /// API root, without a trailing slash
    #[serde(default = "default_base_url")]
    base_url: String,

    /// Per-attempt timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    user_agent: String,
}

fn default_base_url() -> String {
    "https://db.ygoprodeck.com/api/v7".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("decksmith/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl UpstreamConfig {
    /// Creates a new config builder.
    pub fn builder() -> UpstreamConfigBuilder {
        UpstreamConfigBuilder::default()
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level decksmith configuration.
///
/// Each section maps onto one component. Retry policies are keyed by
/// operation category and override the built-in table entry of the same name.
///
/// # Example
///
/// ```no_run
/// use decksmith::DecksmithConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DecksmithConfig::load()?;
/// println!("Cache directory: {}", config.cache().cache_dir().display());
/// # Ok(())
/// # }
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Default,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct DecksmithConfig {
    /// Cache tiers and TTL policy
    #[serde(default)]
    cache: CacheConfig,

    /// Caller and upstream limits
    #[serde(default)]
    rate_limit: RateLimitConfig,

    /// Upstream request pacing
    #[serde(default)]
    queue: QueueConfig,

    /// Retry policy per operation category
    #[serde(default)]
    retry: BTreeMap<String, RetryConfig>,

    /// Upstream service location
    #[serde(default)]
    upstream: UpstreamConfig,
}

impl DecksmithConfig {
    /// Load configuration from a specific file path.
    ///
    /// Keys missing from the file take their built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> DecksmithResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                DecksmithError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                DecksmithError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: environment > current dir > home dir
    /// > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source cannot be parsed, or the merged
    /// configuration fails validation.
    #[instrument]
    pub fn load() -> DecksmithResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        // Bundled default configuration
        const DEFAULT_CONFIG: &str = include_str!("../../../decksmith.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/decksmith/decksmith.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("decksmith").required(false))
            .add_source(
                Environment::with_prefix("DECKSMITH")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .map_err(|e| {
                DecksmithError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                DecksmithError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        debug!(
            cache_dir = %config.cache.cache_dir().display(),
            remote = config.cache.redis_url().is_some(),
            base_url = %config.upstream.base_url,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rate_limit.validate()?;
        self.queue.validate()?;

        if self.upstream.base_url.is_empty() {
            return Err(ConfigError::new("upstream.base_url must not be empty"));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::new("upstream.timeout_secs must be positive"));
        }
        for (category, retry) in &self.retry {
            retry
                .validate()
                .map_err(|e| ConfigError::new(format!("retry.{}.{}", category, e.message)))?;
        }

        Ok(())
    }
}
