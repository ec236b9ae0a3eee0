//! Cancellation errors.

/// The caller abandoned the operation before it completed.
///
/// Cancellation is terminal: it is never retried and never counted as an
/// upstream failure.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cancelled: {} at line {} in {}", operation, line, file)]
pub struct CancelledError {
    /// Logical operation that was abandoned
    pub operation: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl CancelledError {
    /// Create a new cancellation error at the current location.
    #[track_caller]
    pub fn new(operation: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            operation: operation.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
