//! Card lookup command handlers.

use super::commands::OutputFormat;
use decksmith::{CardId, CardResponse, CardService, DecksmithResult, SearchParams};
use decksmith_error::JsonError;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

/// Look up one card.
pub async fn show_card(
    service: &CardService,
    caller: &str,
    id: CardId,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> DecksmithResult<()> {
    let response = service.get_card(caller, id, cancel).await?;
    print_response(&response, format)
}

/// Search cards with the given filters.
#[allow(clippy::too_many_arguments)]
pub async fn search_cards(
    service: &CardService,
    caller: &str,
    name: Option<String>,
    card_type: Option<String>,
    race: Option<String>,
    attribute: Option<String>,
    level: Option<u32>,
    limit: u64,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> DecksmithResult<()> {
    let mut params = SearchParams::new().with("limit", limit);
    let filters = [
        ("name", name),
        ("type", card_type),
        ("race", race),
        ("attribute", attribute),
    ];
    for (key, value) in filters {
        if let Some(value) = value {
            params.insert(key, value);
        }
    }
    if let Some(level) = level {
        params.insert("level", level);
    }

    let response = service.search_cards(caller, &params, cancel).await?;
    print_response(&response, format)
}

/// Fetch a random card.
pub async fn random_card(
    service: &CardService,
    caller: &str,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> DecksmithResult<()> {
    let response = service.random_card(caller, cancel).await?;
    print_response(&response, format)
}

fn print_response(response: &CardResponse, format: OutputFormat) -> DecksmithResult<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(response)
                .map_err(|e| JsonError::new(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Human => {
            if *response.fallback() {
                println!(
                    "Upstream unavailable, showing fallback data ({})",
                    response.error().as_deref().unwrap_or("unknown error")
                );
            } else if *response.cached() {
                println!("(from cache)");
            }
            println!("{:-<80}", "");
            for card in response.data() {
                println!("{}", summarize(card));
            }
            println!("{:-<80}", "");
            println!("Total: {} cards", response.count());
        }
    }

    Ok(())
}

fn summarize(card: &JsonValue) -> String {
    let field = |key: &str| card.get(key).and_then(JsonValue::as_str).unwrap_or("-");
    let id = card.get("id").and_then(JsonValue::as_u64).unwrap_or_default();
    format!("{:>10}  {:<40} {}", id, field("name"), field("type"))
}
