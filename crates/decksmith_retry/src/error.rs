//! Retry loop outcomes.

use std::fmt;

/// Why the retry loop gave up.
///
/// Carries the last error the operation produced, except on cancellation.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error from the last attempt
        error: E,
    },
    /// An attempt failed with an error that is not worth retrying
    NonRetryable {
        /// Attempts made
        attempts: u32,
        /// The non-retryable error
        error: E,
    },
    /// The caller cancelled the loop
    Cancelled {
        /// Attempts started before cancellation
        attempts: u32,
    },
}

impl<E> RetryError<E> {
    /// Attempts made before the loop stopped.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. }
            | RetryError::NonRetryable { attempts, .. }
            | RetryError::Cancelled { attempts } => *attempts,
        }
    }

    /// The last error, unless cancelled.
    pub fn error(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { error, .. } | RetryError::NonRetryable { error, .. } => {
                Some(error)
            }
            RetryError::Cancelled { .. } => None,
        }
    }

    /// Consume, returning the last error unless cancelled.
    pub fn into_error(self) -> Option<E> {
        match self {
            RetryError::Exhausted { error, .. } | RetryError::NonRetryable { error, .. } => {
                Some(error)
            }
            RetryError::Cancelled { .. } => None,
        }
    }

    /// Whether the loop stopped because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { attempts, error } => {
                write!(f, "All {} attempts failed: {}", attempts, error)
            }
            RetryError::NonRetryable { attempts, error } => {
                write!(f, "Non-retryable failure on attempt {}: {}", attempts, error)
            }
            RetryError::Cancelled { attempts } => {
                write!(f, "Cancelled after {} attempts", attempts)
            }
        }
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error().map(|e| e as &(dyn std::error::Error + 'static))
    }
}
