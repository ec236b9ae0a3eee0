//! Standardized error objects handed to end callers.

use crate::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Uniform error object produced at the resilience boundary.
///
/// Raw transport errors never travel past the error handler; callers see this
/// instead. Serializes to the JSON shape returned to API clients.
///
/// # Examples
///
/// ```
/// use decksmith_error::{ErrorKind, StandardizedError};
///
/// let err = StandardizedError::from_kind(ErrorKind::NotFound, "card_by_id", false);
/// assert_eq!(err.code, "not_found");
/// assert_eq!(err.message, "The requested resource was not found.");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::Display, derive_more::Error)]
#[display("{}: {} (operation: {})", code, message, operation)]
pub struct StandardizedError {
    /// Taxonomy tag
    pub kind: ErrorKind,
    /// Machine-readable code, the kind name unless overridden
    #[serde(rename = "error")]
    pub code: String,
    /// User-facing message
    pub message: String,
    /// Logical operation that failed
    pub operation: String,
    /// When the error was produced
    pub timestamp: DateTime<Utc>,
    /// Raw error text, only populated when debug logging is enabled
    #[serde(default)]
    pub details: Option<String>,
    /// Whether retrying could succeed
    pub retryable: bool,
}

impl StandardizedError {
    /// Build an error with the default code and message for `kind`.
    pub fn from_kind(kind: ErrorKind, operation: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            code: kind.to_string(),
            message: kind.default_message().to_string(),
            operation: operation.into(),
            timestamp: Utc::now(),
            details: None,
            retryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_code_as_error_field() {
        let err = StandardizedError::from_kind(ErrorKind::ServerError, "search", true);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "server_error");
        assert_eq!(json["kind"], "server_error");
        assert_eq!(json["operation"], "search");
        assert_eq!(json["retryable"], true);
        assert!(json["details"].is_null());
    }
}
