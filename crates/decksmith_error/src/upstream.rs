//! Upstream card-data service errors.

use crate::{ClassifiedError, ErrorKind};

/// Failure conditions observed when calling the upstream card-data service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum UpstreamErrorKind {
    /// Upstream answered with a non-success status
    #[display("HTTP {} error: {}", status_code, message)]
    Status {
        /// HTTP status code
        status_code: u16,
        /// Response body or reason phrase
        message: String,
    },
    /// The attempt exceeded its timeout
    #[display("Request timed out: {}", _0)]
    Timeout(String),
    /// The connection could not be established
    #[display("Connection failed: {}", _0)]
    Connection(String),
    /// Any other transport failure after connecting
    #[display("Network error: {}", _0)]
    Network(String),
    /// The response body could not be decoded
    #[display("Failed to decode response: {}", _0)]
    Decode(String),
    /// The request was rejected before it was sent
    #[display("Invalid request: {}", _0)]
    InvalidRequest(String),
}

impl UpstreamErrorKind {
    /// Transport status code, when the failure carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            UpstreamErrorKind::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Classify into the shared taxonomy.
    ///
    /// Status codes win when present; otherwise the failure variant decides.
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            UpstreamErrorKind::Status { status_code, .. } => ErrorKind::from_status(*status_code),
            UpstreamErrorKind::Timeout(_) => ErrorKind::Timeout,
            UpstreamErrorKind::Connection(_) | UpstreamErrorKind::Network(_) => ErrorKind::Network,
            UpstreamErrorKind::InvalidRequest(_) => ErrorKind::Validation,
            UpstreamErrorKind::Decode(_) => ErrorKind::Unknown,
        }
    }
}

/// Upstream error with source location tracking.
///
/// # Examples
///
/// ```
/// use decksmith_error::{ClassifiedError, ErrorKind, UpstreamError, UpstreamErrorKind};
///
/// let err = UpstreamError::new(UpstreamErrorKind::Status {
///     status_code: 503,
///     message: "Service unavailable".to_string(),
/// });
/// assert_eq!(err.error_kind(), ErrorKind::ServerError);
/// assert_eq!(err.status_code(), Some(503));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Upstream Error: {} at line {} in {}", kind, line, file)]
pub struct UpstreamError {
    /// The kind of error that occurred
    pub kind: UpstreamErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl UpstreamError {
    /// Create a new upstream error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: UpstreamErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a status failure.
    #[track_caller]
    pub fn status(status_code: u16, message: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::Status {
            status_code,
            message: message.into(),
        })
    }

    /// Get the error kind.
    pub fn kind(&self) -> &UpstreamErrorKind {
        &self.kind
    }
}

impl ClassifiedError for UpstreamError {
    fn error_kind(&self) -> ErrorKind {
        self.kind.error_kind()
    }

    fn status_code(&self) -> Option<u16> {
        self.kind.status_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_classify_without_status() {
        let timeout = UpstreamError::new(UpstreamErrorKind::Timeout("10s".into()));
        assert_eq!(timeout.error_kind(), ErrorKind::Timeout);
        assert_eq!(timeout.status_code(), None);

        let refused = UpstreamError::new(UpstreamErrorKind::Connection("refused".into()));
        assert_eq!(refused.error_kind(), ErrorKind::Network);

        let invalid = UpstreamError::new(UpstreamErrorKind::InvalidRequest("level".into()));
        assert_eq!(invalid.error_kind(), ErrorKind::Validation);

        let decode = UpstreamError::new(UpstreamErrorKind::Decode("eof".into()));
        assert_eq!(decode.error_kind(), ErrorKind::Unknown);
    }

    #[test]
    fn status_failures_use_status_classification() {
        assert_eq!(UpstreamError::status(404, "gone").error_kind(), ErrorKind::NotFound);
        assert_eq!(UpstreamError::status(429, "slow").error_kind(), ErrorKind::RateLimit);
        assert_eq!(UpstreamError::status(502, "bad").error_kind(), ErrorKind::ServerError);
    }

    #[test]
    fn display_includes_location() {
        let err = UpstreamError::status(503, "Service unavailable");
        let text = err.to_string();
        assert!(text.contains("HTTP 503 error"));
        assert!(text.contains("upstream.rs"));
    }
}
