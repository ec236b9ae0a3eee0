//! Cache maintenance and statistics handlers.

use super::commands::CacheCommands;
use decksmith::{CardService, DecksmithResult};
use decksmith_error::JsonError;

/// Handle cache maintenance commands.
pub async fn handle_cache_command(service: &CardService, cmd: CacheCommands) -> DecksmithResult<()> {
    let cache = &service.context().cache;

    match cmd {
        CacheCommands::Get { key } => match cache.get(&key).await {
            Some(value) => {
                let json = serde_json::to_string_pretty(&value)
                    .map_err(|e| JsonError::new(e.to_string()))?;
                println!("{}", json);
            }
            None => println!("No cached value for '{}'", key),
        },

        CacheCommands::Delete { key } => {
            cache.delete(&key).await;
            println!("Deleted '{}'", key);
        }

        CacheCommands::ClearExpired => {
            let removed = cache.clear_expired();
            println!("Removed {} expired entries", removed);
        }
    }

    Ok(())
}

/// Print counters from every component as JSON.
pub async fn show_stats(service: &CardService) -> DecksmithResult<()> {
    let stats = service.stats().await;
    let json = serde_json::to_string_pretty(&stats).map_err(|e| JsonError::new(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
