//! Rate limiter and queue configuration.

use decksmith_error::{BuilderError, BuilderErrorKind, ConfigError};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits and backoff policy for [`crate::RateLimiter`].
///
/// # Examples
///
/// ```
/// use decksmith_rate_limit::RateLimitConfig;
///
/// let config = RateLimitConfig::default();
/// assert_eq!(*config.requests_per_minute(), 60);
/// assert_eq!(*config.burst_limit(), 10);
/// assert_eq!(*config.upstream_requests_per_minute(), 20);
/// assert!(config.validate().is_ok());
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
#[builder(default, build_fn(private, name = "build_internal", error = "BuilderError"))]
pub struct RateLimitConfig {
    /// Per-caller ceiling over the sliding window
    #[serde(default = "default_requests_per_minute")]
    requests_per_minute: u32,

    /// Per-caller burst ceiling over the sliding window
    #[serde(default = "default_burst_limit")]
    burst_limit: u32,

    /// Base of the exponential backoff
    #[serde(default = "default_backoff_factor")]
    backoff_factor: f64,

    /// Backoff ceiling (seconds)
    #[serde(default = "default_max_backoff_secs")]
    max_backoff_secs: u64,

    /// Ceiling on aggregate upstream calls over the sliding window
    #[serde(default = "default_upstream_requests_per_minute")]
    upstream_requests_per_minute: u32,

    /// Upstream failures before all external traffic backs off
    #[serde(default = "default_global_failure_threshold")]
    global_failure_threshold: u32,

    /// Sliding window length (seconds)
    #[serde(default = "default_window_secs")]
    window_secs: u64,
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_burst_limit() -> u32 {
    10
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_backoff_secs() -> u64 {
    300
}

fn default_upstream_requests_per_minute() -> u32 {
    20
}

fn default_global_failure_threshold() -> u32 {
    3
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            burst_limit: default_burst_limit(),
            backoff_factor: default_backoff_factor(),
            max_backoff_secs: default_max_backoff_secs(),
            upstream_requests_per_minute: default_upstream_requests_per_minute(),
            global_failure_threshold: default_global_failure_threshold(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfigBuilder {
    /// Build the RateLimitConfig, checking every limit.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError`] if a value fails validation.
    pub fn build(&self) -> Result<RateLimitConfig, BuilderError> {
        let config = self.build_internal()?;
        config
            .validate()
            .map_err(|e| BuilderError::new(BuilderErrorKind::ValidationFailed(e.message)))?;
        Ok(config)
    }
}

impl RateLimitConfig {
    /// Creates a new config builder.
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::default()
    }

    /// Sliding window length.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Backoff ceiling.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    /// Check that every limit is usable.
    ///
    /// # Errors
    ///
    /// Returns error if a ceiling or the window is zero, or the backoff
    /// factor is below 1.0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.requests_per_minute == 0 {
            return Err(ConfigError::new("requests_per_minute must be positive"));
        }
        if self.burst_limit == 0 {
            return Err(ConfigError::new("burst_limit must be positive"));
        }
        if self.upstream_requests_per_minute == 0 {
            return Err(ConfigError::new(
                "upstream_requests_per_minute must be positive",
            ));
        }
        if self.window_secs == 0 {
            return Err(ConfigError::new("window_secs must be positive"));
        }
        if self.backoff_factor.is_nan() || self.backoff_factor < 1.0 {
            return Err(ConfigError::new(format!(
                "backoff_factor must be at least 1.0, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }
}

/// Concurrency and pacing for [`crate::RequestQueue`].
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
#[setters(prefix = "with_")]
#[builder(default, build_fn(private, name = "build_internal", error = "BuilderError"))]
pub struct QueueConfig {
    /// Maximum upstream calls in flight
    #[serde(default = "default_max_concurrent")]
    max_concurrent: usize,

    /// Minimum gap between consecutive dispatches (milliseconds)
    #[serde(default = "default_min_spacing_ms")]
    min_spacing_ms: u64,
}

fn default_max_concurrent() -> usize {
    5
}

fn default_min_spacing_ms() -> u64 {
    500
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            min_spacing_ms: default_min_spacing_ms(),
        }
    }
}

impl QueueConfigBuilder {
    /// Build the QueueConfig, checking the concurrency bound.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError`] if a value fails validation.
    pub fn build(&self) -> Result<QueueConfig, BuilderError> {
        let config = self.build_internal()?;
        config
            .validate()
            .map_err(|e| BuilderError::new(BuilderErrorKind::ValidationFailed(e.message)))?;
        Ok(config)
    }
}

impl QueueConfig {
    /// Creates a new config builder.
    pub fn builder() -> QueueConfigBuilder {
        QueueConfigBuilder::default()
    }

    /// Minimum gap between consecutive dispatches.
    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }

    /// Check that the queue admits at least one call.
    ///
    /// # Errors
    ///
    /// Returns error if `max_concurrent` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::new("max_concurrent must be positive"));
        }
        Ok(())
    }
}
