//! Decksmith CLI binary.
//!
//! This binary provides command-line access to decksmith's functionality:
//! - Look up and search cards through the cache and rate limiter
//! - Inspect component statistics
//! - Maintain the cache

use clap::Parser;
use decksmith::{
    CardService, DecksmithConfig, ResilienceContext, YgoProDeckClient, init_tracing,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{
        Cli, Commands, handle_cache_command, random_card, search_cards, show_card, show_stats,
    };

    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs)?;

    let config = match &cli.config {
        Some(path) => DecksmithConfig::from_file(path)?,
        None => DecksmithConfig::load()?,
    };

    let ctx = Arc::new(ResilienceContext::from_config(&config).await?);
    let upstream = Arc::new(YgoProDeckClient::new(config.upstream())?);
    let service = CardService::new(ctx, upstream);

    // Ctrl-C abandons whatever is waiting on the queue or a backoff
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let caller = cli.caller.as_str();

    match cli.command {
        Commands::Card { id, format } => {
            show_card(&service, caller, id, format, &cancel).await?;
        }

        Commands::Search {
            name,
            card_type,
            race,
            attribute,
            level,
            limit,
            format,
        } => {
            search_cards(
                &service, caller, name, card_type, race, attribute, level, limit, format,
                &cancel,
            )
            .await?;
        }

        Commands::Random { format } => {
            random_card(&service, caller, format, &cancel).await?;
        }

        Commands::Stats => {
            show_stats(&service).await?;
        }

        Commands::Cache(cache_cmd) => {
            handle_cache_command(&service, cache_cmd).await?;
        }
    }

    Ok(())
}
