//! Rate limiting for calls to the upstream card-data service.
//!
//! Two independent mechanisms sit in front of every outbound call:
//!
//! - [`RateLimiter`] decides synchronously whether a caller may proceed, using
//!   a sliding per-caller window, a shared upstream window, and exponential
//!   backoff after failures.
//! - [`RequestQueue`] bounds how many upstream calls run at once and spaces
//!   consecutive dispatches.
//!
//! Callers are identified by a normalised source address, see
//! [`caller_identity`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod identity;
mod limiter;
mod queue;
mod window;

pub use config::{QueueConfig, QueueConfigBuilder, RateLimitConfig, RateLimitConfigBuilder};
pub use identity::caller_identity;
pub use limiter::{LimiterState, RateLimitDecision, RateLimiter, RateLimiterStats, backoff_for};
pub use queue::RequestQueue;
pub use window::CallerWindow;
