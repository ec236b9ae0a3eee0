//! Core payload types for the decksmith workspace.
//!
//! This crate provides the data types shared by the cache, the rate limiter,
//! the retry loop and the card service: search parameters, the card response
//! envelope, and tracing initialisation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod params;
mod response;
mod telemetry;

pub use params::{CardId, SearchParams};
pub use response::CardResponse;
pub use telemetry::init_tracing;
