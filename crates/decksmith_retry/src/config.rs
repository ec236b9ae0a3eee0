//! Retry policy per operation category.

use decksmith_error::{BuilderError, BuilderErrorKind, ClassifiedError, ConfigError, ErrorKind};
use derive_getters::Getters;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// How often and how patiently to retry one category of operation.
///
/// # Examples
///
/// ```
/// use decksmith_retry::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::api_request().with_jitter(false);
/// assert_eq!(config.delay_for(1), Duration::from_secs(1));
/// assert_eq!(config.delay_for(2), Duration::from_secs(2));
/// assert_eq!(config.delay_for(3), Duration::from_secs(4));
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
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,

    /// Delay before the first retry (seconds)
    #[serde(default = "default_base_delay_secs")]
    base_delay_secs: f64,

    /// Delay ceiling (seconds)
    #[serde(default = "default_max_delay_secs")]
    max_delay_secs: f64,

    /// Growth factor between retries
    #[serde(default = "default_exponential_base")]
    exponential_base: f64,

    /// Scale each delay by a random factor in `[0.5, 1.0)`
    #[serde(default = "default_jitter")]
    jitter: bool,

    /// Transport statuses worth retrying
    #[serde(default = "default_retryable_status_codes")]
    retryable_status_codes: BTreeSet<u16>,

    /// Error kinds worth retrying
    #[serde(default = "default_retryable_error_kinds")]
    retryable_error_kinds: BTreeSet<ErrorKind>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_secs() -> f64 {
    1.0
}

fn default_max_delay_secs() -> f64 {
    60.0
}

fn default_exponential_base() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

fn default_retryable_status_codes() -> BTreeSet<u16> {
    [429, 500, 502, 503, 504].into_iter().collect()
}

fn default_retryable_error_kinds() -> BTreeSet<ErrorKind> {
    [ErrorKind::Network, ErrorKind::Timeout].into_iter().collect()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            exponential_base: default_exponential_base(),
            jitter: default_jitter(),
            retryable_status_codes: default_retryable_status_codes(),
            retryable_error_kinds: default_retryable_error_kinds(),
        }
    }
}

impl RetryConfigBuilder {
    /// Build the RetryConfig, checking the delay schedule.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError`] if a value fails validation.
    pub fn build(&self) -> Result<RetryConfig, BuilderError> {
        let config = self.build_internal()?;
        config
            .validate()
            .map_err(|e| BuilderError::new(BuilderErrorKind::ValidationFailed(e.message)))?;
        Ok(config)
    }
}

impl RetryConfig {
    /// Creates a new config builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Upstream HTTP calls: 3 attempts, 1s base.
    pub fn api_request() -> Self {
        Self::default()
    }

    /// Cache tier calls: 2 attempts, 0.5s base.
    pub fn cache_operation() -> Self {
        Self::default()
            .with_max_attempts(2)
            .with_base_delay_secs(0.5)
    }

    /// Local catalog calls: 3 attempts, 2s base.
    pub fn database_operation() -> Self {
        Self::default().with_base_delay_secs(2.0)
    }

    /// Check that the delay settings describe a usable schedule.
    ///
    /// # Errors
    ///
    /// Returns error if `max_attempts` is zero, a delay is negative, not
    /// finite or beyond [`Duration::MAX`], or the growth factor is below 1.0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::new("max_attempts must be positive"));
        }
        for (field, secs) in [
            ("base_delay_secs", self.base_delay_secs),
            ("max_delay_secs", self.max_delay_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 || Duration::try_from_secs_f64(secs).is_err() {
                return Err(ConfigError::new(format!(
                    "{} must be a non-negative number of seconds, got {}",
                    field, secs
                )));
            }
        }
        if !self.exponential_base.is_finite() || self.exponential_base < 1.0 {
            return Err(ConfigError::new(format!(
                "exponential_base must be at least 1.0, got {}",
                self.exponential_base
            )));
        }
        Ok(())
    }

    /// Delay before the first retry.
    pub fn base_delay(&self) -> Duration {
        secs_to_duration(self.base_delay_secs)
    }

    /// Delay ceiling.
    pub fn max_delay(&self) -> Duration {
        secs_to_duration(self.max_delay_secs)
    }

    /// Un-jittered delay after failed attempt `attempt` (1-based).
    ///
    /// `min(base * exponential_base^(attempt - 1), max_delay)`.
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay_secs * self.exponential_base.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay_secs {
            return self.max_delay();
        }
        secs_to_duration(secs)
    }

    /// Delay after failed attempt `attempt`, jittered when enabled.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let nominal = self.nominal_delay(attempt);
        if self.jitter {
            nominal.mul_f64(rand::thread_rng().gen_range(0.5..1.0))
        } else {
            nominal
        }
    }
}

// Negative and NaN clamp to zero, overflow saturates.
fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

/// Whether `error` is worth another attempt under `config`.
///
/// True when its kind is a retryable kind, or it carries a retryable status.
pub fn should_retry<E: ClassifiedError + ?Sized>(error: &E, config: &RetryConfig) -> bool {
    config.retryable_error_kinds.contains(&error.error_kind())
        || error
            .status_code()
            .is_some_and(|status| config.retryable_status_codes.contains(&status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use decksmith_error::{UpstreamError, UpstreamErrorKind};

    #[test]
    fn category_defaults() {
        let api = RetryConfig::api_request();
        assert_eq!(*api.max_attempts(), 3);
        assert_eq!(api.base_delay(), Duration::from_secs(1));

        let cache = RetryConfig::cache_operation();
        assert_eq!(*cache.max_attempts(), 2);
        assert_eq!(cache.base_delay(), Duration::from_millis(500));

        let db = RetryConfig::database_operation();
        assert_eq!(*db.max_attempts(), 3);
        assert_eq!(db.base_delay(), Duration::from_secs(2));
        assert_eq!(db.max_delay(), Duration::from_secs(60));
    }

    #[test]
    fn nominal_delay_is_capped() {
        let config = RetryConfig::default().with_max_delay_secs(5.0);
        assert_eq!(config.nominal_delay(1), Duration::from_secs(1));
        assert_eq!(config.nominal_delay(3), Duration::from_secs(4));
        assert_eq!(config.nominal_delay(4), Duration::from_secs(5));
        assert_eq!(config.nominal_delay(200), Duration::from_secs(5));
    }

    #[test]
    fn oversized_delays_saturate_instead_of_panicking() {
        let config = RetryConfig::default()
            .with_max_delay_secs(1e30)
            .with_jitter(false);
        assert_eq!(config.max_delay(), Duration::MAX);
        assert_eq!(config.delay_for(200), Duration::MAX);

        let undefined = RetryConfig::default().with_base_delay_secs(f64::NAN);
        assert_eq!(undefined.base_delay(), Duration::ZERO);
    }

    #[test]
    fn unusable_delays_fail_validation() {
        assert!(RetryConfig::default().validate().is_ok());

        let huge = RetryConfig::default().with_max_delay_secs(1e30);
        assert!(huge.validate().unwrap_err().message.contains("max_delay_secs"));

        let negative = RetryConfig::default().with_base_delay_secs(-1.0);
        assert!(negative.validate().unwrap_err().message.contains("base_delay_secs"));

        let nan = RetryConfig::default().with_base_delay_secs(f64::NAN);
        assert!(nan.validate().is_err());

        let shrinking = RetryConfig::default().with_exponential_base(0.5);
        assert!(shrinking.validate().unwrap_err().message.contains("exponential_base"));

        let infinite = RetryConfig::default().with_exponential_base(f64::INFINITY);
        assert!(infinite.validate().is_err());

        let never = RetryConfig::default().with_max_attempts(0);
        assert!(never.validate().unwrap_err().message.contains("max_attempts"));
    }

    #[test]
    fn builder_rejects_unusable_schedules() {
        let config = RetryConfig::builder()
            .max_attempts(5u32)
            .jitter(false)
            .build()
            .unwrap();
        assert_eq!(*config.max_attempts(), 5);
        assert_eq!(config.delay_for(2), Duration::from_secs(2));

        let err = RetryConfig::builder()
            .max_delay_secs(1e30)
            .build()
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            BuilderErrorKind::ValidationFailed(message) if message.contains("max_delay_secs")
        ));
    }

    #[test]
    fn jitter_stays_within_half_to_full() {
        let config = RetryConfig::default();
        for attempt in 1..=6 {
            let nominal = config.nominal_delay(attempt);
            for _ in 0..50 {
                let delay = config.delay_for(attempt);
                assert!(delay >= nominal.mul_f64(0.5));
                assert!(delay <= nominal);
            }
        }
    }

    #[test]
    fn classification_by_kind_and_status() {
        let config = RetryConfig::default();

        let timeout = UpstreamError::new(UpstreamErrorKind::Timeout("slow".into()));
        assert!(should_retry(&timeout, &config));

        let unavailable = UpstreamError::status(503, "unavailable");
        assert!(should_retry(&unavailable, &config));

        let throttled = UpstreamError::status(429, "slow down");
        assert!(should_retry(&throttled, &config));

        let missing = UpstreamError::status(404, "no such card");
        assert!(!should_retry(&missing, &config));

        let invalid = UpstreamError::new(UpstreamErrorKind::InvalidRequest("level".into()));
        assert!(!should_retry(&invalid, &config));

        let not_implemented = UpstreamError::status(501, "nope");
        assert!(!should_retry(&not_implemented, &config));
    }
}
