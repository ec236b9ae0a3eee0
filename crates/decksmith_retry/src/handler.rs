//! Retry loop, error statistics and standardized errors.

use crate::{ErrorStats, RetryConfig, RetryError, should_retry};
use decksmith_error::{ClassifiedError, StandardizedError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio_retry2::{Retry, RetryError as AttemptError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Category for upstream HTTP calls.
pub const API_REQUEST: &str = "api_request";
/// Category for cache tier calls.
pub const CACHE_OPERATION: &str = "cache_operation";
/// Category for local catalog calls.
pub const DATABASE_OPERATION: &str = "database_operation";

/// Replacements for the default code and message of a standardized error.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_setters::Setters)]
#[setters(prefix = "with_", strip_option, into)]
pub struct ErrorOverrides {
    message: Option<String>,
    code: Option<String>,
}

/// Runs operations with retry and turns their failures into
/// [`StandardizedError`]s.
///
/// Holds the per-category retry table and the failure counters. One handler
/// is shared by every call site.
#[derive(Debug)]
pub struct ErrorHandler {
    categories: BTreeMap<String, RetryConfig>,
    default_config: RetryConfig,
    stats: Mutex<ErrorStats>,
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorHandler {
    /// Create a handler with the standard category table.
    pub fn new() -> Self {
        let categories = [
            (API_REQUEST.to_string(), RetryConfig::api_request()),
            (CACHE_OPERATION.to_string(), RetryConfig::cache_operation()),
            (DATABASE_OPERATION.to_string(), RetryConfig::database_operation()),
        ]
        .into_iter()
        .collect();

        Self {
            categories,
            default_config: RetryConfig::default(),
            stats: Mutex::new(ErrorStats::default()),
        }
    }

    /// Replace or add the policy for one category.
    pub fn with_category(mut self, category: impl Into<String>, config: RetryConfig) -> Self {
        self.categories.insert(category.into(), config);
        self
    }

    /// Policy for `category`; unknown categories get the defaults.
    pub fn config_for(&self, category: &str) -> &RetryConfig {
        self.categories
            .get(category)
            .unwrap_or(&self.default_config)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, runs out
    /// of attempts, or `cancel` fires.
    ///
    /// Each failure bumps the counter for `operation`; a success resets it.
    /// Sleeps between attempts follow [`RetryConfig::delay_for`].
    ///
    /// # Errors
    ///
    /// Returns [`RetryError`] carrying the last error and the attempt count.
    #[instrument(skip(self, config, cancel, op), fields(max_attempts = config.max_attempts()))]
    pub async fn retry_with_backoff<T, E, F, Fut>(
        &self,
        operation: &str,
        config: &RetryConfig,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ClassifiedError,
    {
        let max_attempts = (*config.max_attempts()).max(1);
        let attempts = AtomicU32::new(0);
        let gave_up = AtomicBool::new(false);

        let strategy = (1..max_attempts).map(|attempt| config.delay_for(attempt));

        let attempts_made = &attempts;
        let non_retryable = &gave_up;
        let mut op = op;
        let action = move || {
            let attempt = attempts_made.fetch_add(1, Ordering::SeqCst) + 1;
            let pending = op();
            async move {
                match pending.await {
                    Ok(value) => Ok(value),
                    Err(e) => {
                        self.stats.lock().record_failure(operation);

                        if !should_retry(&e, config) {
                            warn!(attempt, error = %e, kind = %e.error_kind(), "Non-retryable failure");
                            non_retryable.store(true, Ordering::SeqCst);
                            Err(AttemptError::Permanent(e))
                        } else if attempt >= max_attempts {
                            Err(AttemptError::Permanent(e))
                        } else {
                            warn!(attempt, error = %e, kind = %e.error_kind(), "Attempt failed, will retry");
                            Err(AttemptError::Transient {
                                err: e,
                                retry_after: None,
                            })
                        }
                    }
                }
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = Retry::spawn(strategy, action) => Some(result),
        };

        let attempts = attempts.load(Ordering::SeqCst);
        match outcome {
            None => {
                info!(attempts, "Retry loop cancelled");
                Err(RetryError::Cancelled { attempts })
            }
            Some(Ok(value)) => {
                self.stats.lock().record_success(operation);
                debug!(attempts, "Operation succeeded");
                Ok(value)
            }
            Some(Err(e)) if gave_up.load(Ordering::SeqCst) => {
                Err(RetryError::NonRetryable { attempts, error: e })
            }
            Some(Err(e)) => {
                error!(attempts, error = %e, "All attempts failed");
                Err(RetryError::Exhausted { attempts, error: e })
            }
        }
    }

    /// [`ErrorHandler::retry_with_backoff`] with the policy registered for
    /// `category`, counting failures under the category name.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError`] carrying the last error and the attempt count.
    pub async fn retry_category<T, E, F, Fut>(
        &self,
        category: &str,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ClassifiedError,
    {
        let config = self.config_for(category);
        self.retry_with_backoff(category, config, cancel, op).await
    }

    /// Build the error object handed to the end caller.
    ///
    /// The kind comes from the error's classification. `details` carries the
    /// raw error text only when DEBUG logging is enabled.
    pub fn create_standardized_error<E>(
        &self,
        error: &E,
        operation: &str,
        overrides: ErrorOverrides,
    ) -> StandardizedError
    where
        E: ClassifiedError + ?Sized,
    {
        let kind = error.error_kind();
        let retryable = should_retry(error, &self.default_config);
        let mut standardized = StandardizedError::from_kind(kind, operation, retryable);

        if let Some(code) = overrides.code {
            standardized.code = code;
        }
        if let Some(message) = overrides.message {
            standardized.message = message;
        }
        if tracing::enabled!(tracing::Level::DEBUG) {
            standardized.details = Some(error.to_string());
        }

        standardized
    }

    /// Snapshot of the failure counters.
    pub fn get_error_stats(&self) -> ErrorStats {
        self.stats.lock().clone()
    }

    /// Clear all failure counters.
    pub fn reset_stats(&self) {
        *self.stats.lock() = ErrorStats::default();
    }
}
