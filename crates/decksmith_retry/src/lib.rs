//! Error classification and retry with exponential backoff.
//!
//! Every error entering the retry loop implements
//! [`ClassifiedError`](decksmith_error::ClassifiedError), so retry eligibility is
//! decided from its [`ErrorKind`](decksmith_error::ErrorKind) and transport
//! status code alone. After the loop gives up, [`ErrorHandler`] turns the last
//! error into a [`StandardizedError`](decksmith_error::StandardizedError) for the
//! end caller.
//!
//! # Examples
//!
//! ```
//! use decksmith_error::{UpstreamError, UpstreamErrorKind};
//! use decksmith_retry::{ErrorHandler, RetryConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() {
//! let handler = ErrorHandler::new();
//! let cancel = CancellationToken::new();
//! let config = RetryConfig::api_request();
//!
//! let result: Result<u32, _> = handler
//!     .retry_with_backoff("api_request", &config, &cancel, || async {
//!         Err::<u32, _>(UpstreamError::new(UpstreamErrorKind::Timeout("10s".into())))
//!     })
//!     .await;
//!
//! assert_eq!(result.unwrap_err().attempts(), 3);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod handler;
mod stats;

pub use config::{RetryConfig, RetryConfigBuilder, should_retry};
pub use error::RetryError;
pub use handler::{ErrorHandler, ErrorOverrides, API_REQUEST, CACHE_OPERATION, DATABASE_OPERATION};
pub use stats::ErrorStats;
