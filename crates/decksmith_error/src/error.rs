//! Top-level error wrapper types.

use crate::{
    BuilderError, CacheError, CancelledError, ClassifiedError, ConfigError, ErrorKind, JsonError,
    RateLimitError, StandardizedError, UpstreamError,
};

/// Every failure a decksmith component can surface.
///
/// # Examples
///
/// ```
/// use decksmith_error::{DecksmithError, UpstreamError};
///
/// let err: DecksmithError = UpstreamError::status(503, "unavailable").into();
/// assert!(format!("{}", err).contains("Upstream Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum DecksmithErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON encode/decode error
    #[from(JsonError)]
    Json(JsonError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// Cache tier error
    #[from(CacheError)]
    Cache(CacheError),
    /// Upstream card-data service error
    #[from(UpstreamError)]
    Upstream(UpstreamError),
    /// Request refused at the rate-limiting boundary
    #[from(RateLimitError)]
    RateLimited(RateLimitError),
    /// Classified failure after retries, ready for the end caller
    #[from(StandardizedError)]
    Standardized(StandardizedError),
    /// Caller abandoned the operation
    #[from(CancelledError)]
    Cancelled(CancelledError),
}

/// Decksmith error with kind discrimination.
///
/// # Examples
///
/// ```
/// use decksmith_error::{ConfigError, DecksmithResult};
///
/// fn might_fail() -> DecksmithResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Decksmith Error: {}", _0)]
pub struct DecksmithError(Box<DecksmithErrorKind>);

impl DecksmithError {
    /// Create a new error from a kind.
    pub fn new(kind: DecksmithErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &DecksmithErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to DecksmithErrorKind
impl<T> From<T> for DecksmithError
where
    T: Into<DecksmithErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

impl ClassifiedError for DecksmithError {
    fn error_kind(&self) -> ErrorKind {
        match self.kind() {
            DecksmithErrorKind::Upstream(e) => e.error_kind(),
            DecksmithErrorKind::Cache(e) => e.error_kind(),
            DecksmithErrorKind::Standardized(e) => e.kind,
            DecksmithErrorKind::RateLimited(_) => ErrorKind::RateLimit,
            DecksmithErrorKind::Builder(_) | DecksmithErrorKind::Config(_) => {
                ErrorKind::Validation
            }
            DecksmithErrorKind::Json(_) | DecksmithErrorKind::Cancelled(_) => ErrorKind::Unknown,
        }
    }

    fn status_code(&self) -> Option<u16> {
        match self.kind() {
            DecksmithErrorKind::Upstream(e) => e.status_code(),
            _ => None,
        }
    }
}

/// Result type for decksmith operations.
pub type DecksmithResult<T> = std::result::Result<T, DecksmithError>;
