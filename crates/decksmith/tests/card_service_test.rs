//! Orchestrator behaviour against a scripted upstream.

use async_trait::async_trait;
use decksmith::{
    CacheConfig, CardApi, CardService, DecksmithConfig, DecksmithErrorKind, ErrorKind,
    InMemoryCatalog, RateLimitConfig, ResilienceContext, SearchParams,
};
use decksmith_core::CardId;
use decksmith_error::{LimitScope, UpstreamError, UpstreamErrorKind};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

type Respond = Box<dyn Fn(u32) -> Result<Vec<JsonValue>, UpstreamError> + Send + Sync>;

/// Upstream whose every endpoint answers from one script keyed by call number.
struct ScriptedApi {
    calls: AtomicU32,
    respond: Respond,
}

impl ScriptedApi {
    fn new(respond: impl Fn(u32) -> Result<Vec<JsonValue>, UpstreamError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            respond: Box::new(respond),
        })
    }

    fn answer(&self) -> Result<Vec<JsonValue>, UpstreamError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        (self.respond)(call)
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CardApi for ScriptedApi {
    async fn card_by_id(&self, _id: CardId) -> Result<Vec<JsonValue>, UpstreamError> {
        self.answer()
    }

    async fn search(&self, _params: &SearchParams) -> Result<Vec<JsonValue>, UpstreamError> {
        self.answer()
    }

    async fn random_card(&self) -> Result<Vec<JsonValue>, UpstreamError> {
        self.answer()
    }
}

fn config_in(dir: &TempDir) -> DecksmithConfig {
    DecksmithConfig::default()
        .with_cache(CacheConfig::default().with_cache_dir(dir.path().to_path_buf()))
}

async fn service(config: &DecksmithConfig, api: Arc<ScriptedApi>) -> CardService {
    let ctx = ResilienceContext::from_config(config).await.unwrap();
    CardService::new(Arc::new(ctx), api)
}

fn dark_magician() -> JsonValue {
    json!({ "id": 46986414, "name": "Dark Magician", "type": "Normal Monster" })
}

#[tokio::test(start_paused = true)]
async fn upstream_answer_is_cached_for_the_next_request() {
    let dir = tempfile::tempdir().unwrap();
    let api = ScriptedApi::new(|_| Ok(vec![dark_magician()]));
    let service = service(&config_in(&dir), api.clone()).await;
    let cancel = CancellationToken::new();

    let first = service.get_card("10.0.0.1", 46986414, &cancel).await.unwrap();
    assert!(!*first.cached());
    assert_eq!(first.data()[0]["name"], "Dark Magician");

    let second = service.get_card("10.0.0.1", 46986414, &cancel).await.unwrap();
    assert!(*second.cached());
    assert_eq!(second.data(), first.data());
    assert_eq!(api.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_search_degrades_to_popular_cards() {
    let dir = tempfile::tempdir().unwrap();
    let api = ScriptedApi::new(|_| Err(UpstreamError::status(503, "Service unavailable")));
    let service = service(&config_in(&dir), api.clone()).await;
    let cancel = CancellationToken::new();
    let params = SearchParams::new().with("name", "Blue-Eyes");

    let start = Instant::now();
    let response = service.search_cards("10.0.0.1", &params, &cancel).await.unwrap();

    assert_eq!(api.calls(), 3);
    // Two jittered sleeps: at least half of 1s + 2s
    assert!(Instant::now() - start >= Duration::from_millis(1500));

    assert!(*response.fallback());
    assert!(!*response.cached());
    assert_eq!(*response.count(), 3);
    assert_eq!(response.data()[0]["name"], "Blue-Eyes White Dragon");
    let error = response.error().clone().unwrap();
    assert!(error.starts_with("Primary operation failed: HTTP 503 error"));

    let stats = service.stats().await;
    assert_eq!(stats.errors().count_for("api_request"), 3);
    assert_eq!(*stats.rate_limiter().global_failure_count(), 1);

    // Fallback answers are never cached
    assert!(service.context().cache.get_search_results(&params).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_caller_backs_off() {
    let dir = tempfile::tempdir().unwrap();
    let api = ScriptedApi::new(|_| {
        Err(UpstreamError::new(UpstreamErrorKind::Connection("refused".into())))
    });
    let service = service(&config_in(&dir), api.clone()).await;
    let cancel = CancellationToken::new();

    let response = service.get_card("10.0.0.1", 1, &cancel).await.unwrap();
    assert!(*response.fallback());
    assert!(response.data().is_empty());

    let err = service.get_card("10.0.0.1", 1, &cancel).await.unwrap_err();
    match err.kind() {
        DecksmithErrorKind::RateLimited(limited) => {
            assert_eq!(limited.scope, LimitScope::Caller);
            assert!(limited.retry_after <= Duration::from_secs(2));
        }
        other => panic!("expected rate limit, got {}", other),
    }
    assert_eq!(api.calls(), 3);

    // Another caller is unaffected until the global threshold is reached
    let other = service.get_card("10.0.0.2", 1, &cancel).await.unwrap();
    assert!(*other.fallback());
}

#[tokio::test(start_paused = true)]
async fn missing_card_is_a_standardized_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let api = ScriptedApi::new(|_| Ok(Vec::new()));
    let service = service(&config_in(&dir), api.clone()).await;
    let cancel = CancellationToken::new();

    let err = service.get_card("10.0.0.1", 999, &cancel).await.unwrap_err();
    match err.kind() {
        DecksmithErrorKind::Standardized(standardized) => {
            assert_eq!(standardized.kind, ErrorKind::NotFound);
            assert_eq!(standardized.operation, "card_by_id");
            assert!(!standardized.retryable);
        }
        other => panic!("expected standardized error, got {}", other),
    }
    assert_eq!(api.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn upstream_404_is_not_retried_or_penalised() {
    let dir = tempfile::tempdir().unwrap();
    let api = ScriptedApi::new(|_| Err(UpstreamError::status(404, "Not Found")));
    let service = service(&config_in(&dir), api.clone()).await;
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        let err = service.get_card("10.0.0.1", 5, &cancel).await.unwrap_err();
        assert!(matches!(
            err.kind(),
            DecksmithErrorKind::Standardized(s) if s.kind == ErrorKind::NotFound
        ));
    }
    // One attempt per request, and no backoff refused the second
    assert_eq!(api.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn rejected_search_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let api = ScriptedApi::new(|_| {
        Err(UpstreamError::new(UpstreamErrorKind::InvalidRequest(
            "level must be a non-negative integer".into(),
        )))
    });
    let service = service(&config_in(&dir), api.clone()).await;

    let err = service
        .search_cards("10.0.0.1", &SearchParams::new().with("level", "high"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        DecksmithErrorKind::Standardized(s) if s.kind == ErrorKind::Validation
    ));
    assert_eq!(api.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn local_catalog_answers_before_upstream() {
    let dir = tempfile::tempdir().unwrap();
    let api = ScriptedApi::new(|_| Ok(vec![json!({ "id": 0 })]));
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert(dark_magician());

    let service = service(&config_in(&dir), api.clone())
        .await
        .with_catalog(catalog);
    let cancel = CancellationToken::new();

    let first = service.get_card("10.0.0.1", 46986414, &cancel).await.unwrap();
    assert!(!*first.cached());
    assert_eq!(first.data()[0]["name"], "Dark Magician");

    let second = service.get_card("10.0.0.1", 46986414, &cancel).await.unwrap();
    assert!(*second.cached());

    let found = service
        .search_cards("10.0.0.1", &SearchParams::new().with("name", "magician"), &cancel)
        .await
        .unwrap();
    assert_eq!(*found.count(), 1);
    assert_eq!(api.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn search_cache_ignores_parameter_order() {
    let dir = tempfile::tempdir().unwrap();
    let api = ScriptedApi::new(|_| Ok(vec![dark_magician()]));
    let service = service(&config_in(&dir), api.clone()).await;
    let cancel = CancellationToken::new();

    let a = SearchParams::new().with("name", "Dark").with("race", "Spellcaster");
    let b = SearchParams::new().with("race", "Spellcaster").with("name", "Dark");

    service.search_cards("10.0.0.1", &a, &cancel).await.unwrap();
    let second = service.search_cards("10.0.0.1", &b, &cancel).await.unwrap();
    assert!(*second.cached());
    assert_eq!(api.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn burst_limit_refuses_cached_reads_too() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir)
        .with_rate_limit(RateLimitConfig::default().with_burst_limit(3));
    let api = ScriptedApi::new(|_| Ok(vec![dark_magician()]));
    let service = service(&config, api.clone()).await;
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        service.get_card("10.0.0.1", 46986414, &cancel).await.unwrap();
    }

    let err = service.get_card("10.0.0.1", 46986414, &cancel).await.unwrap_err();
    match err.kind() {
        DecksmithErrorKind::RateLimited(limited) => {
            assert_eq!(limited.scope, LimitScope::Caller);
            assert_eq!(limited.retry_after_header(), "60");
        }
        other => panic!("expected rate limit, got {}", other),
    }
    assert_eq!(api.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn upstream_ceiling_is_shared_by_all_callers() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir)
        .with_rate_limit(RateLimitConfig::default().with_upstream_requests_per_minute(2));
    let api = ScriptedApi::new(|call| Ok(vec![json!({ "id": call })]));
    let service = service(&config, api.clone()).await;
    let cancel = CancellationToken::new();

    service.get_card("10.0.0.1", 1, &cancel).await.unwrap();
    service.get_card("10.0.0.2", 2, &cancel).await.unwrap();

    let err = service.get_card("10.0.0.3", 3, &cancel).await.unwrap_err();
    assert!(matches!(
        err.kind(),
        DecksmithErrorKind::RateLimited(limited) if limited.scope == LimitScope::Global
    ));

    // Cached reads never count against the upstream ceiling
    let cached = service.get_card("10.0.0.3", 1, &cancel).await.unwrap();
    assert!(*cached.cached());
    assert_eq!(api.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_backoff_stops_the_request() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    // The caller gives up while the first failure is being backed off
    let trigger = cancel.clone();
    let api = ScriptedApi::new(move |_| {
        trigger.cancel();
        Err(UpstreamError::status(502, "Bad Gateway"))
    });
    let service = service(&config_in(&dir), api.clone()).await;

    let err = service.get_card("10.0.0.1", 7, &cancel).await.unwrap_err();
    assert!(matches!(err.kind(), DecksmithErrorKind::Cancelled(_)));
    assert_eq!(api.calls(), 1);

    // Cancellation is not an upstream failure
    let stats = service.stats().await;
    assert_eq!(*stats.rate_limiter().global_failure_count(), 0);
    assert_eq!(*stats.rate_limiter().active_backoffs(), 0);
}

#[tokio::test(start_paused = true)]
async fn already_cancelled_request_never_reaches_upstream() {
    let dir = tempfile::tempdir().unwrap();
    let api = ScriptedApi::new(|_| Ok(vec![dark_magician()]));
    let service = service(&config_in(&dir), api.clone()).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = service
        .search_cards("10.0.0.1", &SearchParams::new().with("name", "Dark"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), DecksmithErrorKind::Cancelled(_)));
    assert_eq!(api.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn random_card_bypasses_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let api = ScriptedApi::new(|call| Ok(vec![json!({ "id": call, "name": "Random" })]));
    let service = service(&config_in(&dir), api.clone()).await;
    let cancel = CancellationToken::new();

    let first = service.random_card("10.0.0.1", &cancel).await.unwrap();
    let second = service.random_card("10.0.0.1", &cancel).await.unwrap();
    assert!(!*second.cached());
    assert_ne!(first.data()[0]["id"], second.data()[0]["id"]);
    assert_eq!(api.calls(), 2);
}
