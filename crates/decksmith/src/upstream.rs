//! Upstream card-data service client.

use crate::UpstreamConfig;
use async_trait::async_trait;
use decksmith_core::{CardId, SearchParams};
use decksmith_error::{UpstreamError, UpstreamErrorKind};
use reqwest::Client;
use serde_json::Value as JsonValue;
use tracing::{debug, error, instrument};

/// Search keys forwarded to the service unchanged.
const PASSTHROUGH_KEYS: [&str; 3] = ["type", "race", "attribute"];

/// Limits at or above this are sent without paging.
const PAGING_CEILING: u64 = 100;

/// Operations the resilience layer needs from the card-data service.
///
/// Each call is a single attempt. Retry, pacing and caching are applied by
/// the caller.
#[async_trait]
pub trait CardApi: Send + Sync {
    /// Fetch the records matching one card id.
    ///
    /// An empty list means the service knows no such card.
    async fn card_by_id(&self, id: CardId) -> Result<Vec<JsonValue>, UpstreamError>;

    /// Search cards.
    ///
    /// Recognised keys are `name`, `type`, `race`, `attribute`, `level` and
    /// `limit`; others are ignored.
    async fn search(&self, params: &SearchParams) -> Result<Vec<JsonValue>, UpstreamError>;

    /// Fetch one random card.
    async fn random_card(&self) -> Result<Vec<JsonValue>, UpstreamError>;
}

/// [`CardApi`] over the YGOPRODeck HTTP API.
#[derive(Debug, Clone)]
pub struct YgoProDeckClient {
    client: Client,
    base_url: String,
}

impl YgoProDeckClient {
    /// Creates a client for the configured service.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        debug!(base_url = %config.base_url(), "Creating YGOPRODeck client");
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent().as_str())
            .build()
            .map_err(|e| {
                UpstreamError::new(UpstreamErrorKind::InvalidRequest(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
        })
    }

    /// API root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(skip(self, query), fields(base_url = %self.base_url))]
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<JsonValue, UpstreamError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(?query, "Sending upstream request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Upstream request failed");
                classify_transport(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // The service answers 400 with this message when a search matches nothing
            if status.as_u16() == 400 && body.contains("No card matching") {
                debug!("Upstream reported no matching cards");
                return Ok(serde_json::json!({ "data": [] }));
            }
            error!(status = %status, body = %body, "Upstream returned error");
            return Err(UpstreamError::status(status.as_u16(), body));
        }

        response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to decode upstream response");
            if e.is_timeout() {
                classify_transport(&e)
            } else {
                UpstreamError::new(UpstreamErrorKind::Decode(e.to_string()))
            }
        })
    }
}

/// Map a reqwest failure onto the upstream taxonomy.
fn classify_transport(e: &reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::new(UpstreamErrorKind::Timeout(e.to_string()))
    } else if e.is_connect() {
        UpstreamError::new(UpstreamErrorKind::Connection(e.to_string()))
    } else if let Some(status) = e.status() {
        UpstreamError::status(status.as_u16(), e.to_string())
    } else if e.is_decode() {
        UpstreamError::new(UpstreamErrorKind::Decode(e.to_string()))
    } else {
        UpstreamError::new(UpstreamErrorKind::Network(e.to_string()))
    }
}

/// Pull the `data` array out of a response body.
fn data_array(body: JsonValue) -> Result<Vec<JsonValue>, UpstreamError> {
    match body {
        JsonValue::Object(mut map) => match map.remove("data") {
            Some(JsonValue::Array(records)) => Ok(records),
            Some(other) => Err(UpstreamError::new(UpstreamErrorKind::Decode(format!(
                "Expected data array, found {}",
                other
            )))),
            // randomcard.php answers with a bare card object
            None => Ok(vec![JsonValue::Object(map)]),
        },
        other => Err(UpstreamError::new(UpstreamErrorKind::Decode(format!(
            "Expected JSON object, found {}",
            other
        )))),
    }
}

/// Translate search parameters into the service's query vocabulary.
///
/// # Errors
///
/// Returns [`UpstreamErrorKind::InvalidRequest`] when `level` or `limit` is
/// not a non-negative integer.
pub fn search_query(params: &SearchParams) -> Result<Vec<(String, String)>, UpstreamError> {
    let mut query = Vec::new();

    if let Some(name) = params.get_str("name").filter(|n| !n.is_empty()) {
        query.push(("fname".to_string(), name.to_string()));
    }

    for key in PASSTHROUGH_KEYS {
        if let Some(value) = params.get_str(key).filter(|v| !v.is_empty()) {
            query.push((key.to_string(), value.to_string()));
        }
    }

    if params.get("level").is_some_and(|level| !level.is_null()) {
        let level = integer_param(params, "level")?;
        query.push(("level".to_string(), level.to_string()));
    }

    if params.get("limit").is_some_and(|limit| !limit.is_null()) {
        let limit = integer_param(params, "limit")?;
        if limit > 0 && limit < PAGING_CEILING {
            query.push(("num".to_string(), limit.to_string()));
            query.push(("offset".to_string(), "0".to_string()));
        }
    }

    Ok(query)
}

fn integer_param(params: &SearchParams, key: &str) -> Result<u64, UpstreamError> {
    params
        .get_u64(key)
        .or_else(|| params.get_str(key).and_then(|s| s.parse().ok()))
        .ok_or_else(|| {
            UpstreamError::new(UpstreamErrorKind::InvalidRequest(format!(
                "{} must be a non-negative integer",
                key
            )))
        })
}

#[async_trait]
impl CardApi for YgoProDeckClient {
    #[instrument(skip(self))]
    async fn card_by_id(&self, id: CardId) -> Result<Vec<JsonValue>, UpstreamError> {
        let query = [("id".to_string(), id.to_string())];
        let body = self.get("cardinfo.php", &query).await?;
        data_array(body)
    }

    #[instrument(skip(self, params), fields(param_count = params.len()))]
    async fn search(&self, params: &SearchParams) -> Result<Vec<JsonValue>, UpstreamError> {
        let query = search_query(params)?;
        let body = self.get("cardinfo.php", &query).await?;
        let records = data_array(body)?;
        debug!(count = records.len(), "Search returned records");
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn random_card(&self) -> Result<Vec<JsonValue>, UpstreamError> {
        let body = self.get("randomcard.php", &[]).await?;
        data_array(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decksmith_error::{ClassifiedError, ErrorKind};
    use serde_json::json;

    #[test]
    fn search_query_translates_names_and_paging() {
        let params = SearchParams::new()
            .with("name", "Dark Magician")
            .with("race", "Spellcaster")
            .with("level", 7)
            .with("limit", 20);

        let query = search_query(&params).unwrap();
        assert!(query.contains(&("fname".to_string(), "Dark Magician".to_string())));
        assert!(query.contains(&("race".to_string(), "Spellcaster".to_string())));
        assert!(query.contains(&("level".to_string(), "7".to_string())));
        assert!(query.contains(&("num".to_string(), "20".to_string())));
        assert!(query.contains(&("offset".to_string(), "0".to_string())));
    }

    #[test]
    fn large_limits_are_not_paged() {
        let params = SearchParams::new().with("name", "HERO").with("limit", 500);
        let query = search_query(&params).unwrap();
        assert!(!query.iter().any(|(k, _)| k == "num" || k == "offset"));
    }

    #[test]
    fn non_integer_level_is_a_validation_failure() {
        let params = SearchParams::new().with("level", "high");
        let err = search_query(&params).unwrap_err();
        assert_eq!(err.error_kind(), ErrorKind::Validation);
    }

    #[test]
    fn bare_object_is_wrapped() {
        let records = data_array(json!({ "id": 1, "name": "Kuriboh" })).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], "Kuriboh");

        let records = data_array(json!({ "data": [{ "id": 1 }, { "id": 2 }] })).unwrap();
        assert_eq!(records.len(), 2);

        assert!(data_array(json!([1, 2])).is_err());
    }
}
