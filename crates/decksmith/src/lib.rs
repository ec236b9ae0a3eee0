//! Decksmith - resilient access to upstream card data
//!
//! Decksmith sits between application logic and the YGOPRODeck card-data
//! service. Every outbound call passes through a multi-tier cache, per-caller
//! and global rate limits, a paced request queue, and a retry loop with
//! exponential backoff. When retries run out the caller gets a flagged
//! fallback response instead of a raw transport error.
//!
//! # Features
//!
//! - **Tiered cache**: in-process, on-disk and optional Redis tiers with TTLs
//! - **Rate limiting**: sliding windows, burst ceilings and failure backoff
//! - **Request queue**: bounded concurrency with minimum dispatch spacing
//! - **Retry**: per-category policies with jittered exponential backoff
//! - **Fallback**: curated data when upstream is down
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use decksmith::{CardService, DecksmithConfig, ResilienceContext, YgoProDeckClient};
//! use decksmith_core::SearchParams;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DecksmithConfig::load()?;
//!     let ctx = Arc::new(ResilienceContext::from_config(&config).await?);
//!     let service = CardService::new(ctx, Arc::new(YgoProDeckClient::new(config.upstream())?));
//!
//!     let params = SearchParams::new().with("name", "Dark Magician");
//!     let response = service
//!         .search_cards("127.0.0.1", &params, &CancellationToken::new())
//!         .await?;
//!     println!("{} cards (fallback: {})", response.count(), response.fallback());
//!     Ok(())
//! }
//! ```
//!
//! # Cargo Features
//!
//! - `redis` - shared remote cache tier

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod config;
mod context;
mod fallback;
mod service;
mod upstream;

pub use catalog::{InMemoryCatalog, LocalCatalog};
pub use config::{DecksmithConfig, UpstreamConfig, UpstreamConfigBuilder};
pub use context::ResilienceContext;
pub use fallback::{CARD_SEARCH, FallbackStrategy, popular_cards};
pub use service::{
    CARD_BY_ID, CARDS_ENDPOINT, CardService, RANDOM_CARD, RANDOM_ENDPOINT, SEARCH_ENDPOINT,
    ServiceStats,
};
pub use upstream::{CardApi, YgoProDeckClient, search_query};

// Re-export the component crates
pub use decksmith_cache::{CacheConfig, CacheStats, TieredCache};
pub use decksmith_core::{CardId, CardResponse, SearchParams, init_tracing};
pub use decksmith_error::{
    ClassifiedError, DecksmithError, DecksmithErrorKind, DecksmithResult, ErrorKind,
    StandardizedError,
};
pub use decksmith_rate_limit::{QueueConfig, RateLimitConfig, RateLimiter, RequestQueue};
pub use decksmith_retry::{ErrorHandler, RetryConfig};
