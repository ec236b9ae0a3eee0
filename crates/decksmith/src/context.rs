//! Shared resilience state.

use crate::{DecksmithConfig, FallbackStrategy};
use decksmith_cache::TieredCache;
use decksmith_error::DecksmithResult;
use decksmith_rate_limit::{RateLimiter, RequestQueue};
use decksmith_retry::ErrorHandler;
use tracing::{info, instrument};

/// Everything the resilience layer shares between requests.
///
/// Constructed once at startup and handed to call sites behind an `Arc`.
#[derive(Debug)]
pub struct ResilienceContext {
    /// Multi-tier cache
    pub cache: TieredCache,
    /// Caller and upstream rate limits
    pub limiter: RateLimiter,
    /// Upstream dispatch pacing
    pub queue: RequestQueue,
    /// Retry loop and error statistics
    pub errors: ErrorHandler,
    /// Degraded responses
    pub fallback: FallbackStrategy,
}

impl ResilienceContext {
    /// Build every component from `config`.
    ///
    /// A configured remote cache tier that cannot be reached is skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the disk cache directory cannot be created.
    #[instrument(skip(config))]
    pub async fn from_config(config: &DecksmithConfig) -> DecksmithResult<Self> {
        let cache = TieredCache::connect(config.cache().clone()).await?;

        let errors = config
            .retry()
            .iter()
            .fold(ErrorHandler::new(), |handler, (category, retry)| {
                handler.with_category(category.clone(), retry.clone())
            });

        info!(
            cache_dir = %config.cache().cache_dir().display(),
            upstream_rpm = config.rate_limit().upstream_requests_per_minute(),
            max_concurrent = config.queue().max_concurrent(),
            "Resilience context ready"
        );

        Ok(Self {
            cache,
            limiter: RateLimiter::new(config.rate_limit().clone()),
            queue: RequestQueue::new(config.queue().clone()),
            errors,
            fallback: FallbackStrategy::new(),
        })
    }
}
