//! Cached, rate-limited, retried access to card data.

use crate::{CardApi, LocalCatalog, ResilienceContext, fallback::CARD_SEARCH};
use decksmith_cache::{CacheStats, search_key};
use decksmith_core::{CardId, CardResponse, SearchParams};
use decksmith_error::{
    CancelledError, ClassifiedError, DecksmithResult, ErrorKind, UpstreamError,
};
use decksmith_rate_limit::RateLimiterStats;
use decksmith_retry::{API_REQUEST, DATABASE_OPERATION, ErrorOverrides, ErrorStats, RetryError};
use derive_getters::Getters;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Endpoint label for card-by-id lookups.
pub const CARDS_ENDPOINT: &str = "cards";
/// Endpoint label for searches.
pub const SEARCH_ENDPOINT: &str = "card_search";
/// Endpoint label for random cards.
pub const RANDOM_ENDPOINT: &str = "random_card";

/// Operation name for card-by-id lookups.
pub const CARD_BY_ID: &str = "card_by_id";
/// Operation name for random cards.
pub const RANDOM_CARD: &str = "random_card";

/// Snapshot of every component's counters.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct ServiceStats {
    /// Cache occupancy
    cache: CacheStats,
    /// Limiter activity
    rate_limiter: RateLimiterStats,
    /// Failure counters
    errors: ErrorStats,
}

/// What came back from the upstream path.
enum Fetched {
    /// Authoritative records
    Records(Vec<JsonValue>),
    /// Substitute served after retries gave out
    Degraded(CardResponse),
}

/// Card operations composed from the resilience components.
///
/// Every operation follows the same order: caller limit, cache, local
/// catalog, then upstream through the global limit, the request queue and
/// the retry loop. Upstream failures that retrying could have fixed degrade
/// to a fallback response; not-found and validation failures surface as
/// [`decksmith_error::StandardizedError`].
///
/// # Example
///
/// ```no_run
/// use decksmith::{CardService, DecksmithConfig, ResilienceContext, YgoProDeckClient};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DecksmithConfig::load()?;
/// let ctx = Arc::new(ResilienceContext::from_config(&config).await?);
/// let upstream = Arc::new(YgoProDeckClient::new(config.upstream())?);
/// let service = CardService::new(ctx, upstream);
///
/// let response = service
///     .get_card("127.0.0.1", 46986414, &CancellationToken::new())
///     .await?;
/// println!("{} record(s), cached: {}", response.count(), response.cached());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CardService {
    ctx: Arc<ResilienceContext>,
    upstream: Arc<dyn CardApi>,
    catalog: Option<Arc<dyn LocalCatalog>>,
}

impl std::fmt::Debug for CardService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardService")
            .field("ctx", &self.ctx)
            .field("catalog", &self.catalog.is_some())
            .finish_non_exhaustive()
    }
}

impl CardService {
    /// Creates a service without a local catalog.
    pub fn new(ctx: Arc<ResilienceContext>, upstream: Arc<dyn CardApi>) -> Self {
        Self {
            ctx,
            upstream,
            catalog: None,
        }
    }

    /// Consult `catalog` before going upstream.
    pub fn with_catalog(mut self, catalog: Arc<dyn LocalCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Shared resilience state.
    pub fn context(&self) -> &ResilienceContext {
        &self.ctx
    }

    /// Look up one card.
    ///
    /// # Errors
    ///
    /// - `RateLimited` when the caller or the upstream budget is exhausted
    /// - `Standardized` with kind `not_found` when no such card exists, or
    ///   `validation` when upstream rejects the request
    /// - `Cancelled` when `cancel` fires first
    #[instrument(skip(self, cancel))]
    pub async fn get_card(
        &self,
        caller: &str,
        id: CardId,
        cancel: &CancellationToken,
    ) -> DecksmithResult<CardResponse> {
        self.admit(caller, CARDS_ENDPOINT)?;

        if let Some(card) = self.ctx.cache.get_entity_by_id(id).await {
            debug!("Served from cache");
            self.ctx.limiter.record_success(caller, CARDS_ENDPOINT, false);
            return Ok(CardResponse::from_cache(vec![card]));
        }

        if let Some(catalog) = &self.catalog {
            let local = self
                .ctx
                .errors
                .retry_category(DATABASE_OPERATION, cancel, || catalog.card_by_id(id))
                .await;
            match local {
                Ok(Some(card)) => {
                    debug!("Served from local catalog");
                    self.ctx.cache.cache_entity_by_id(id, &card).await;
                    self.ctx.limiter.record_success(caller, CARDS_ENDPOINT, false);
                    return Ok(CardResponse::fresh(vec![card]));
                }
                Ok(None) => debug!("Local catalog has no such card"),
                Err(RetryError::Cancelled { .. }) => {
                    return Err(CancelledError::new(CARD_BY_ID).into());
                }
                Err(e) => warn!(error = %e, "Local catalog unavailable, going upstream"),
            }
        }

        let fetched = self
            .fetch_upstream(caller, CARDS_ENDPOINT, CARD_BY_ID, cancel, || {
                self.upstream.card_by_id(id)
            })
            .await?;

        match fetched {
            Fetched::Degraded(response) => Ok(response),
            Fetched::Records(records) => {
                let Some(card) = records.into_iter().next() else {
                    info!("Upstream has no such card");
                    let missing = UpstreamError::status(404, format!("Card {} not found", id));
                    return Err(self
                        .ctx
                        .errors
                        .create_standardized_error(&missing, CARD_BY_ID, ErrorOverrides::default())
                        .into());
                };
                self.ctx.cache.cache_entity_by_id(id, &card).await;
                Ok(CardResponse::fresh(vec![card]))
            }
        }
    }

    /// Search cards.
    ///
    /// Parameter order never matters: logically identical searches share one
    /// cache entry. A failed upstream search degrades to the popular-card set.
    ///
    /// # Errors
    ///
    /// - `RateLimited` when the caller or the upstream budget is exhausted
    /// - `Standardized` with kind `validation` when the parameters are rejected
    /// - `Cancelled` when `cancel` fires first
    #[instrument(skip(self, params, cancel), fields(param_count = params.len()))]
    pub async fn search_cards(
        &self,
        caller: &str,
        params: &SearchParams,
        cancel: &CancellationToken,
    ) -> DecksmithResult<CardResponse> {
        self.admit(caller, SEARCH_ENDPOINT)?;

        if let Some(JsonValue::Array(records)) = self.ctx.cache.get_search_results(params).await {
            debug!(count = records.len(), key = %search_key(params), "Served from cache");
            self.ctx.limiter.record_success(caller, SEARCH_ENDPOINT, false);
            return Ok(CardResponse::from_cache(records));
        }

        if let Some(catalog) = &self.catalog {
            let local = self
                .ctx
                .errors
                .retry_category(DATABASE_OPERATION, cancel, || catalog.search_cards(params))
                .await;
            match local {
                Ok(Some(records)) => {
                    debug!(count = records.len(), "Served from local catalog");
                    self.ctx
                        .cache
                        .cache_search_results(params, &JsonValue::Array(records.clone()))
                        .await;
                    self.ctx.limiter.record_success(caller, SEARCH_ENDPOINT, false);
                    return Ok(CardResponse::fresh(records));
                }
                Ok(None) => debug!("Local catalog cannot answer this search"),
                Err(RetryError::Cancelled { .. }) => {
                    return Err(CancelledError::new(CARD_SEARCH).into());
                }
                Err(e) => warn!(error = %e, "Local catalog unavailable, going upstream"),
            }
        }

        let fetched = self
            .fetch_upstream(caller, SEARCH_ENDPOINT, CARD_SEARCH, cancel, || {
                self.upstream.search(params)
            })
            .await?;

        match fetched {
            Fetched::Degraded(response) => Ok(response),
            Fetched::Records(records) => {
                self.ctx
                    .cache
                    .cache_search_results(params, &JsonValue::Array(records.clone()))
                    .await;
                Ok(CardResponse::fresh(records))
            }
        }
    }

    /// Fetch one random card, bypassing cache and catalog.
    ///
    /// # Errors
    ///
    /// - `RateLimited` when the upstream budget is exhausted
    /// - `Standardized` when upstream answers not-found or validation
    /// - `Cancelled` when `cancel` fires first
    #[instrument(skip(self, cancel))]
    pub async fn random_card(
        &self,
        caller: &str,
        cancel: &CancellationToken,
    ) -> DecksmithResult<CardResponse> {
        let fetched = self
            .fetch_upstream(caller, RANDOM_ENDPOINT, RANDOM_CARD, cancel, || {
                self.upstream.random_card()
            })
            .await?;

        Ok(match fetched {
            Fetched::Degraded(response) => response,
            Fetched::Records(records) => CardResponse::fresh(records),
        })
    }

    /// Counters from every component.
    pub async fn stats(&self) -> ServiceStats {
        ServiceStats {
            cache: self.ctx.cache.stats().await,
            rate_limiter: self.ctx.limiter.stats(),
            errors: self.ctx.errors.get_error_stats(),
        }
    }

    /// Apply the caller's own limit.
    fn admit(&self, caller: &str, endpoint: &str) -> DecksmithResult<()> {
        self.ctx
            .limiter
            .check(caller, endpoint, false)
            .into_result(caller, endpoint)?;
        Ok(())
    }

    /// Run `call` against upstream under the global limit, the queue and the
    /// retry loop, and settle the limiter's accounting for the outcome.
    async fn fetch_upstream<F, Fut>(
        &self,
        caller: &str,
        endpoint: &str,
        operation: &str,
        cancel: &CancellationToken,
        call: F,
    ) -> DecksmithResult<Fetched>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<JsonValue>, UpstreamError>>,
    {
        self.ctx
            .limiter
            .check(caller, endpoint, true)
            .into_result(caller, endpoint)?;

        let outcome = self
            .ctx
            .queue
            .execute(cancel, || {
                self.ctx.errors.retry_category(API_REQUEST, cancel, call)
            })
            .await?;

        let error = match outcome {
            Ok(records) => {
                self.ctx.limiter.record_success(caller, endpoint, true);
                return Ok(Fetched::Records(records));
            }
            Err(RetryError::Cancelled { attempts }) => {
                info!(attempts, "Upstream call cancelled");
                return Err(CancelledError::new(operation).into());
            }
            Err(RetryError::Exhausted { error, .. }) | Err(RetryError::NonRetryable { error, .. }) => {
                error
            }
        };

        match error.error_kind() {
            ErrorKind::NotFound | ErrorKind::Validation => {
                // Upstream answered; the request itself was the problem
                self.ctx.limiter.record_success(caller, endpoint, true);
                Err(self
                    .ctx
                    .errors
                    .create_standardized_error(&error, operation, ErrorOverrides::default())
                    .into())
            }
            kind => {
                warn!(%kind, error = %error, "Upstream failed, degrading");
                self.ctx.limiter.record_failure(caller, endpoint, true);
                Ok(Fetched::Degraded(
                    self.ctx.fallback.get_fallback(operation, error.kind(), None),
                ))
            }
        }
    }
}
