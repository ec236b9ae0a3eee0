//! Authoritative local card store.

use async_trait::async_trait;
use decksmith_core::{CardId, SearchParams};
use decksmith_error::DecksmithResult;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Local card store consulted before the upstream service.
///
/// `Ok(None)` means the catalog cannot answer and the caller should go
/// upstream. An error means the catalog itself failed.
#[async_trait]
pub trait LocalCatalog: Send + Sync {
    /// Look up one card.
    async fn card_by_id(&self, id: CardId) -> DecksmithResult<Option<JsonValue>>;

    /// Run a search locally.
    async fn search_cards(&self, params: &SearchParams) -> DecksmithResult<Option<Vec<JsonValue>>>;
}

/// In-process catalog keyed by card id.
///
/// Searches match `name` as a case-insensitive substring and `type`, `race`,
/// `attribute` and `level` exactly. A search with no matches is unanswered.
///
/// # Examples
///
/// ```
/// use decksmith::{InMemoryCatalog, LocalCatalog};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = InMemoryCatalog::new();
/// catalog.insert(json!({ "id": 46986414, "name": "Dark Magician" }));
///
/// let card = catalog.card_by_id(46986414).await?;
/// assert_eq!(card.unwrap()["name"], "Dark Magician");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    cards: RwLock<BTreeMap<CardId, JsonValue>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a card. Records without a numeric `id` are ignored.
    pub fn insert(&self, card: JsonValue) -> bool {
        match card.get("id").and_then(JsonValue::as_u64) {
            Some(id) => {
                self.cards.write().insert(id, card);
                true
            }
            None => false,
        }
    }

    /// Number of cards held.
    pub fn len(&self) -> usize {
        self.cards.read().len()
    }

    /// Whether the catalog holds no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.read().is_empty()
    }
}

fn matches(card: &JsonValue, params: &SearchParams) -> bool {
    params.iter().all(|(key, wanted)| match key.as_str() {
        "name" => match (card.get("name").and_then(JsonValue::as_str), wanted.as_str()) {
            (Some(name), Some(fragment)) => {
                name.to_lowercase().contains(&fragment.to_lowercase())
            }
            _ => false,
        },
        "type" | "race" | "attribute" | "level" => card.get(key) == Some(wanted),
        _ => true,
    })
}

#[async_trait]
impl LocalCatalog for InMemoryCatalog {
    #[instrument(skip(self))]
    async fn card_by_id(&self, id: CardId) -> DecksmithResult<Option<JsonValue>> {
        Ok(self.cards.read().get(&id).cloned())
    }

    #[instrument(skip(self, params))]
    async fn search_cards(&self, params: &SearchParams) -> DecksmithResult<Option<Vec<JsonValue>>> {
        let limit = params
            .get_u64("limit")
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);

        let found: Vec<JsonValue> = self
            .cards
            .read()
            .values()
            .filter(|card| matches(card, params))
            .take(limit)
            .cloned()
            .collect();

        debug!(count = found.len(), "Local search finished");
        Ok((!found.is_empty()).then_some(found))
    }
}
