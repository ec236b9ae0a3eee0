//! Cache tier error types.

use crate::{ClassifiedError, ErrorKind};

/// Kinds of cache tier errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum CacheErrorKind {
    /// Failed to create the cache directory
    #[display("Failed to create cache directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write a cache record
    #[display("Failed to write cache record: {}", _0)]
    Write(String),
    /// Failed to read a cache record
    #[display("Failed to read cache record: {}", _0)]
    Read(String),
    /// A cache record could not be encoded or decoded
    #[display("Cache serialization error: {}", _0)]
    Serialization(String),
    /// The backend could not be reached
    #[display("Cache backend unavailable: {}", _0)]
    Unavailable(String),
    /// The backend rejected or failed the command
    #[display("Cache backend error: {}", _0)]
    Backend(String),
}

/// Cache error with location tracking.
///
/// # Examples
///
/// ```
/// use decksmith_error::{CacheError, CacheErrorKind};
///
/// let err = CacheError::new(CacheErrorKind::Unavailable("redis://localhost".to_string()));
/// assert!(format!("{}", err).contains("unavailable"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cache Error: {} at line {} in {}", kind, line, file)]
pub struct CacheError {
    /// The kind of error that occurred
    pub kind: CacheErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CacheError {
    /// Create a new cache error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CacheErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CacheErrorKind {
        &self.kind
    }
}

impl ClassifiedError for CacheError {
    fn error_kind(&self) -> ErrorKind {
        match self.kind {
            CacheErrorKind::Unavailable(_) => ErrorKind::Network,
            CacheErrorKind::Serialization(_) => ErrorKind::Validation,
            _ => ErrorKind::Unknown,
        }
    }
}
