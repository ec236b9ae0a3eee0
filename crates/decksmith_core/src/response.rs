//! Card response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Payload returned by every card operation.
///
/// Degraded answers are flagged rather than hidden: `cached` marks a cache
/// serve, `fallback` marks a non-authoritative substitute, and `error` carries
/// the failure that forced the substitute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CardResponse {
    /// Card records
    data: Vec<JsonValue>,
    /// Number of records in `data`
    count: usize,
    /// Served from cache
    #[serde(default)]
    cached: bool,
    /// Served from fallback data
    #[serde(default)]
    fallback: bool,
    /// Failure that forced a fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CardResponse {
    /// Authoritative response fetched from the local catalog or upstream.
    pub fn fresh(data: Vec<JsonValue>) -> Self {
        Self {
            count: data.len(),
            data,
            cached: false,
            fallback: false,
            error: None,
        }
    }

    /// Response served from cache.
    pub fn from_cache(data: Vec<JsonValue>) -> Self {
        Self {
            cached: true,
            ..Self::fresh(data)
        }
    }

    /// Degraded response substituted after a failure.
    pub fn degraded(data: Vec<JsonValue>, error: impl Into<String>) -> Self {
        Self {
            fallback: true,
            error: Some(error.into()),
            ..Self::fresh(data)
        }
    }

    /// Consume the envelope, returning the records.
    pub fn into_data(self) -> Vec<JsonValue> {
        self.data
    }
}
