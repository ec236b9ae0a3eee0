//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the decksmith binary.

mod cache;
mod cards;
mod commands;

pub use cache::{handle_cache_command, show_stats};
pub use cards::{random_card, search_cards, show_card};
pub use commands::{Cli, Commands};
