//! Degraded responses for failed operations.

use decksmith_cache::TieredCache;
use decksmith_core::CardResponse;
use serde_json::{Value as JsonValue, json};
use std::fmt::Display;
use tracing::{debug, instrument, warn};

/// Operation name whose failures fall back to the popular-card set.
pub const CARD_SEARCH: &str = "card_search";

/// Builds substitute answers once retries are exhausted.
///
/// # Examples
///
/// ```
/// use decksmith::FallbackStrategy;
///
/// let fallback = FallbackStrategy::new();
/// let response = fallback.get_fallback("card_search", &"HTTP 503", None);
/// assert_eq!(*response.count(), 3);
/// assert!(*response.fallback());
/// assert_eq!(response.error().as_deref(), Some("Primary operation failed: HTTP 503"));
/// ```
#[derive(Debug, Clone)]
pub struct FallbackStrategy {
    popular_cards: Vec<JsonValue>,
}

impl Default for FallbackStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackStrategy {
    /// Creates a strategy with the curated popular-card set.
    pub fn new() -> Self {
        Self {
            popular_cards: popular_cards(),
        }
    }

    /// Replace the curated set.
    pub fn with_popular_cards(popular_cards: Vec<JsonValue>) -> Self {
        Self { popular_cards }
    }

    /// The curated set served when a search fails.
    pub fn popular_cards(&self) -> &[JsonValue] {
        &self.popular_cards
    }

    /// Substitute response for a failed `operation`.
    ///
    /// Caller-supplied data wins. Without it, searches get the popular-card
    /// set and everything else gets an empty list.
    #[instrument(skip(self, error, fallback_data), fields(error = %error))]
    pub fn get_fallback(
        &self,
        operation: &str,
        error: &dyn Display,
        fallback_data: Option<Vec<JsonValue>>,
    ) -> CardResponse {
        let data = match fallback_data {
            Some(data) => data,
            None if operation == CARD_SEARCH => self.popular_cards.clone(),
            None => Vec::new(),
        };

        warn!(count = data.len(), "Serving fallback response");
        CardResponse::degraded(data, format!("Primary operation failed: {}", error))
    }

    /// Previously cached value for `key`, or `default` when there is none.
    pub async fn get_cached_or_default(
        &self,
        cache: &TieredCache,
        key: &str,
        default: Option<JsonValue>,
    ) -> Option<JsonValue> {
        match cache.get(key).await {
            Some(value) => {
                debug!(key, "Fallback served from cache");
                Some(value)
            }
            None => default,
        }
    }
}

/// Well-known cards that are always safe to show.
pub fn popular_cards() -> Vec<JsonValue> {
    vec![
        json!({
            "id": 89631139,
            "name": "Blue-Eyes White Dragon",
            "type": "Normal Monster",
            "desc": "This legendary dragon is a powerful engine of destruction.",
            "atk": 3000,
            "def": 2500,
            "level": 8,
            "race": "Dragon",
            "attribute": "LIGHT",
        }),
        json!({
            "id": 46986414,
            "name": "Dark Magician",
            "type": "Normal Monster",
            "desc": "The ultimate wizard in terms of attack and defense.",
            "atk": 2500,
            "def": 2100,
            "level": 7,
            "race": "Spellcaster",
            "attribute": "DARK",
        }),
        json!({
            "id": 20721928,
            "name": "Elemental HERO Sparkman",
            "type": "Normal Monster",
            "desc": "A warrior of the light.",
            "atk": 1600,
            "def": 1400,
            "level": 4,
            "race": "Warrior",
            "attribute": "LIGHT",
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use decksmith_cache::CacheConfig;

    #[test]
    fn non_search_operations_fall_back_to_empty() {
        let fallback = FallbackStrategy::new();
        let response = fallback.get_fallback("card_by_id", &"timeout", None);
        assert!(response.data().is_empty());
        assert!(*response.fallback());
        assert!(!*response.cached());
    }

    #[test]
    fn caller_data_wins() {
        let fallback = FallbackStrategy::new();
        let response =
            fallback.get_fallback(CARD_SEARCH, &"timeout", Some(vec![json!({ "id": 1 })]));
        assert_eq!(*response.count(), 1);
        assert_eq!(response.data()[0]["id"], 1);
    }

    #[test]
    fn popular_cards_are_curated() {
        let ids: Vec<u64> = popular_cards()
            .iter()
            .filter_map(|c| c["id"].as_u64())
            .collect();
        assert_eq!(ids, vec![89631139, 46986414, 20721928]);
    }

    #[tokio::test]
    async fn cached_value_beats_default() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TieredCache::new(CacheConfig::default().with_cache_dir(dir.path().to_path_buf()))
            .unwrap();
        let fallback = FallbackStrategy::new();

        let missing = fallback
            .get_cached_or_default(&cache, "card:1", Some(json!("default")))
            .await;
        assert_eq!(missing, Some(json!("default")));

        cache.set("card:1", &json!({ "id": 1 }), None).await;
        let hit = fallback.get_cached_or_default(&cache, "card:1", None).await;
        assert_eq!(hit, Some(json!({ "id": 1 })));
    }
}
