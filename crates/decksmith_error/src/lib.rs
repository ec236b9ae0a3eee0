//! Error types for the decksmith workspace.
//!
//! This crate provides the foundation error types used by every decksmith
//! component: the cache tiers, the rate limiter and request queue, the retry
//! loop, and the upstream card-data client.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Independently of the concrete type, every error that can reach the retry
//! loop is classified into the [`ErrorKind`] taxonomy through the
//! [`ClassifiedError`] trait. Retry eligibility and user-facing messaging
//! switch on that tag, never on the concrete type.
//!
//! # Examples
//!
//! ```
//! use decksmith_error::{DecksmithResult, UpstreamError, UpstreamErrorKind};
//!
//! fn fetch_card() -> DecksmithResult<String> {
//!     Err(UpstreamError::new(UpstreamErrorKind::Connection(
//!         "connection refused".to_string(),
//!     )))?
//! }
//!
//! assert!(fetch_card().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod cache;
mod cancelled;
mod config;
mod error;
mod json;
mod kind;
mod rate_limit;
mod standardized;
mod upstream;

pub use builder::{BuilderError, BuilderErrorKind};
pub use cache::{CacheError, CacheErrorKind};
pub use cancelled::CancelledError;
pub use config::ConfigError;
pub use error::{DecksmithError, DecksmithErrorKind, DecksmithResult};
pub use json::JsonError;
pub use kind::{ClassifiedError, ErrorKind};
pub use rate_limit::{LimitScope, RateLimitError};
pub use standardized::StandardizedError;
pub use upstream::{UpstreamError, UpstreamErrorKind};
