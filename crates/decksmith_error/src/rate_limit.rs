//! Rate limiter rejection errors.

use std::time::Duration;

/// Which accounting bucket refused the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum LimitScope {
    /// The caller's own window or backoff
    #[display("caller")]
    Caller,
    /// The shared upstream window or global backoff
    #[display("global")]
    Global,
}

/// A synchronous refusal at the rate-limiting boundary.
///
/// Always carries a retry-after hint. Never produced by the retry loop.
///
/// # Examples
///
/// ```
/// use decksmith_error::{LimitScope, RateLimitError};
/// use std::time::Duration;
///
/// let err = RateLimitError::new("127.0.0.1", "search", LimitScope::Caller, Duration::from_millis(12_400));
/// assert_eq!(err.retry_after_header(), "12");
/// assert_eq!(err.user_message(), "Please wait 12.4 seconds before retrying");
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display(
    "Rate Limit Error: {} limit exceeded for {}:{}, retry after {:.1}s at line {} in {}",
    scope,
    caller,
    endpoint,
    retry_after.as_secs_f64(),
    line,
    file
)]
pub struct RateLimitError {
    /// Caller identity that was refused
    pub caller: String,
    /// Endpoint label that was refused
    pub endpoint: String,
    /// Bucket that refused
    pub scope: LimitScope,
    /// How long to wait before retrying
    pub retry_after: Duration,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RateLimitError {
    /// Create a new rejection with automatic location tracking.
    #[track_caller]
    pub fn new(
        caller: impl Into<String>,
        endpoint: impl Into<String>,
        scope: LimitScope,
        retry_after: Duration,
    ) -> Self {
        let location = std::panic::Location::caller();
        Self {
            caller: caller.into(),
            endpoint: endpoint.into(),
            scope,
            retry_after,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Value for a `Retry-After` header, in whole seconds.
    pub fn retry_after_header(&self) -> String {
        self.retry_after.as_secs().to_string()
    }

    /// Message suitable for the end caller.
    pub fn user_message(&self) -> String {
        format!(
            "Please wait {:.1} seconds before retrying",
            self.retry_after.as_secs_f64()
        )
    }
}
