//! Error taxonomy shared by every component.

use serde::{Deserialize, Serialize};

/// Classification of a failure, independent of where it came from.
///
/// Produced once, at the boundary where a raw transport or backend error is
/// first caught. Retry eligibility, user messaging and error statistics all
/// switch on this tag.
///
/// # Examples
///
/// ```
/// use decksmith_error::ErrorKind;
///
/// assert_eq!(ErrorKind::from_status(404), ErrorKind::NotFound);
/// assert_eq!(ErrorKind::from_status(503), ErrorKind::ServerError);
/// assert_eq!(ErrorKind::RateLimit.to_string(), "rate_limit");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Connection refused, reset, DNS failure or other transport breakage
    Network,
    /// The attempt ran past its deadline
    Timeout,
    /// Upstream answered 429
    RateLimit,
    /// Upstream answered 404 or the entity does not exist
    NotFound,
    /// Upstream answered with a 5xx status
    ServerError,
    /// The request itself was malformed
    Validation,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Classify a transport status code.
    ///
    /// 404 is `NotFound`, 429 is `RateLimit`, any 5xx is `ServerError`.
    /// Every other status is `Unknown`.
    pub fn from_status(status_code: u16) -> Self {
        match status_code {
            404 => ErrorKind::NotFound,
            429 => ErrorKind::RateLimit,
            500..=599 => ErrorKind::ServerError,
            _ => ErrorKind::Unknown,
        }
    }

    /// Default user-facing message for this kind.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::Network => {
                "Unable to connect to the service. Please check your internet connection."
            }
            ErrorKind::Timeout => "The request took too long to complete. Please try again.",
            ErrorKind::RateLimit => "Too many requests. Please wait a moment before trying again.",
            ErrorKind::NotFound => "The requested resource was not found.",
            ErrorKind::ServerError => "An internal server error occurred. Please try again later.",
            ErrorKind::Validation => "The provided data is invalid.",
            ErrorKind::Unknown => "An unexpected error occurred. Please try again.",
        }
    }
}

/// An error that has been classified into the [`ErrorKind`] taxonomy.
///
/// Implemented by every error type that can flow through the retry loop.
/// The status code, when present, is the raw transport status and takes part
/// in retry classification alongside the kind.
pub trait ClassifiedError: std::fmt::Display {
    /// The taxonomy tag for this error.
    fn error_kind(&self) -> ErrorKind;

    /// Transport status code carried by this error, if any.
    fn status_code(&self) -> Option<u16> {
        None
    }
}
