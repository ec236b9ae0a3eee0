//! Caller identity extraction.

use reqwest::header::HeaderMap;
use std::net::IpAddr;

/// Normalised source address used as the rate-limiting identity.
///
/// Precedence: first hop of `X-Forwarded-For`, then `X-Real-IP`, then the
/// peer address, then `"unknown"`.
///
/// # Examples
///
/// ```
/// use decksmith_rate_limit::caller_identity;
/// use reqwest::header::{HeaderMap, HeaderValue};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
/// assert_eq!(caller_identity(&headers, None), "203.0.113.7");
/// assert_eq!(caller_identity(&HeaderMap::new(), None), "unknown");
/// ```
pub fn caller_identity(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    if let Some(forwarded) = header("x-forwarded-for")
        && let Some(first) = forwarded.split(',').next().map(str::trim)
        && !first.is_empty()
    {
        return first.to_string();
    }

    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }

    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
