//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Decksmith - resilient access to YGOPRODeck card data
#[derive(Parser, Debug)]
#[command(name = "decksmith")]
#[command(about = "Cached, rate-limited access to YGOPRODeck card data", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file (replaces the layered defaults)
    #[arg(short, long, global = true, env = "DECKSMITH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Caller identity used for rate limiting
    #[arg(long, global = true, default_value = "local")]
    pub caller: String,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Look up one card by id
    Card {
        /// Card id (passcode)
        id: u64,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Search cards
    Search {
        /// Name fragment
        #[arg(long)]
        name: Option<String>,

        /// Card type, e.g. "Normal Monster"
        #[arg(long = "type")]
        card_type: Option<String>,

        /// Monster race or spell/trap subtype
        #[arg(long)]
        race: Option<String>,

        /// Monster attribute, e.g. LIGHT
        #[arg(long)]
        attribute: Option<String>,

        /// Monster level
        #[arg(long)]
        level: Option<u32>,

        /// Maximum number of results
        #[arg(long, default_value = "20")]
        limit: u64,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Fetch a random card
    Random {
        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Show cache, rate limiter and error counters
    Stats,

    /// Inspect and maintain the cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

/// Cache maintenance commands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Print the cached value for a key
    Get {
        /// Cache key, e.g. card:46986414
        key: String,
    },

    /// Remove a key from every tier
    Delete {
        /// Cache key
        key: String,
    },

    /// Evict expired entries from the memory tier
    ClearExpired,
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}
