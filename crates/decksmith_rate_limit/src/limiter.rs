//! Sliding-window rate limiter with exponential backoff.
//!
//! Each caller+endpoint pair is in one of four states when checked:
//!
//! ```text
//!              record_failure
//!   Open ───────────────────────────▶ Backoff
//!    │ ▲                                 │
//!    │ │ window drains      backoff ends │
//!    ▼ │                                 ▼
//!   WindowedBlock                      Open
//!
//!   GlobalBlock: any external check while the shared upstream window is
//!   full or the global backoff is active
//! ```

use crate::{CallerWindow, RateLimitConfig};
use decksmith_error::{LimitScope, RateLimitError};
use derive_getters::Getters;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// State a caller+endpoint was found in by [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LimiterState {
    /// Request admitted
    Open,
    /// Caller's burst or per-minute ceiling reached
    WindowedBlock,
    /// Caller is cooling down after failures
    Backoff,
    /// Upstream ceiling reached or global backoff active
    GlobalBlock,
}

impl LimiterState {
    /// Which bucket a refusal in this state is charged to.
    pub fn scope(&self) -> LimitScope {
        match self {
            LimiterState::GlobalBlock => LimitScope::Global,
            _ => LimitScope::Caller,
        }
    }
}

/// Outcome of [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    allowed: bool,
    /// How long to wait before retrying, when refused
    retry_after: Option<Duration>,
    /// State the caller was found in
    state: LimiterState,
}

impl RateLimitDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after: None,
            state: LimiterState::Open,
        }
    }

    fn deny(state: LimiterState, retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after: Some(retry_after),
            state,
        }
    }

    /// Convert a refusal into an error for `caller` on `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when the decision is a refusal.
    #[track_caller]
    pub fn into_result(self, caller: &str, endpoint: &str) -> Result<(), RateLimitError> {
        if self.allowed {
            return Ok(());
        }
        Err(RateLimitError::new(
            caller,
            endpoint,
            self.state.scope(),
            self.retry_after.unwrap_or_default(),
        ))
    }
}

/// Snapshot of limiter activity.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct RateLimiterStats {
    /// Per-caller ceiling
    requests_per_minute_limit: u32,
    /// Per-caller burst ceiling
    burst_limit: u32,
    /// Upstream ceiling
    upstream_limit: u32,
    /// Caller+endpoint pairs seen
    active_callers: usize,
    /// Callers currently backing off
    active_backoffs: usize,
    /// Requests from all callers within the window
    recent_requests_last_minute: usize,
    /// Upstream requests within the window
    global_requests_last_minute: usize,
    /// Upstream failures since the last expired global backoff
    global_failure_count: u32,
    /// Whether the global backoff is active
    global_backoff_active: bool,
    /// Seconds left on the global backoff
    global_backoff_remaining_secs: Option<f64>,
}

/// Backoff length after `failures` consecutive failures.
///
/// `min(factor^failures, max_backoff)` seconds. Monotonically non-decreasing
/// in `failures` and never above `max_backoff`.
///
/// # Examples
///
/// ```
/// use decksmith_rate_limit::backoff_for;
/// use std::time::Duration;
///
/// let max = Duration::from_secs(300);
/// assert_eq!(backoff_for(2.0, 1, max), Duration::from_secs(2));
/// assert_eq!(backoff_for(2.0, 3, max), Duration::from_secs(8));
/// assert_eq!(backoff_for(2.0, 20, max), max);
/// ```
pub fn backoff_for(factor: f64, failures: u32, max_backoff: Duration) -> Duration {
    let exponent = i32::try_from(failures).unwrap_or(i32::MAX);
    let secs = factor.powi(exponent);
    if !secs.is_finite() || secs >= max_backoff.as_secs_f64() {
        return max_backoff;
    }
    Duration::from_secs_f64(secs.max(0.0))
}

type CallerKey = (String, String);

#[derive(Debug, Default)]
struct LimiterInner {
    callers: HashMap<CallerKey, CallerWindow>,
    global: CallerWindow,
}

/// Per-caller and global rate limiter.
///
/// All state sits behind one mutex; every operation is a short critical
/// section with no awaits inside.
///
/// # Examples
///
/// ```
/// use decksmith_rate_limit::{RateLimitConfig, RateLimiter};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let limiter = RateLimiter::new(RateLimitConfig::default());
/// let decision = limiter.check("127.0.0.1", "cards", true);
/// assert!(*decision.allowed());
/// limiter.record_success("127.0.0.1", "cards", true);
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterInner>,
}

impl RateLimiter {
    /// Create a limiter with the given limits.
    pub fn new(config: RateLimitConfig) -> Self {
        debug!(
            requests_per_minute = config.requests_per_minute(),
            burst_limit = config.burst_limit(),
            upstream_limit = config.upstream_requests_per_minute(),
            "Creating rate limiter"
        );
        Self {
            config,
            state: Mutex::new(LimiterInner::default()),
        }
    }

    /// Limits in use.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn key(caller: &str, endpoint: &str) -> CallerKey {
        (caller.to_string(), endpoint.to_string())
    }

    /// Decide whether `caller` may call `endpoint` now.
    ///
    /// `is_external` marks calls that will reach upstream; only those are
    /// subject to the global window and global backoff.
    #[instrument(skip(self))]
    pub fn check(&self, caller: &str, endpoint: &str, is_external: bool) -> RateLimitDecision {
        let now = Instant::now();
        let window = self.config.window();
        let mut inner = self.state.lock();
        let LimiterInner { callers, global } = &mut *inner;

        if is_external && let Some(remaining) = global.observe_backoff(now) {
            debug!(remaining = ?remaining, "Global backoff active");
            return RateLimitDecision::deny(LimiterState::GlobalBlock, remaining);
        }

        let caller_window = callers.entry(Self::key(caller, endpoint)).or_default();

        if let Some(remaining) = caller_window.observe_backoff(now) {
            debug!(remaining = ?remaining, "Caller backoff active");
            return RateLimitDecision::deny(LimiterState::Backoff, remaining);
        }

        caller_window.prune(now, window);
        if is_external {
            global.prune(now, window);
        }

        let count = caller_window.count();

        if count >= *self.config.burst_limit() as usize {
            debug!(count, "Burst limit reached");
            return RateLimitDecision::deny(LimiterState::WindowedBlock, window);
        }

        if count >= *self.config.requests_per_minute() as usize {
            let wait = caller_window.time_until_slot(now, window);
            debug!(count, wait = ?wait, "Per-minute limit reached");
            return RateLimitDecision::deny(LimiterState::WindowedBlock, wait);
        }

        if is_external && global.count() >= *self.config.upstream_requests_per_minute() as usize {
            let wait = global.time_until_slot(now, window);
            debug!(global_count = global.count(), wait = ?wait, "Upstream limit reached");
            return RateLimitDecision::deny(LimiterState::GlobalBlock, wait);
        }

        RateLimitDecision::allow()
    }

    /// Record a completed request.
    #[instrument(skip(self))]
    pub fn record_success(&self, caller: &str, endpoint: &str, is_external: bool) {
        let now = Instant::now();
        let mut inner = self.state.lock();
        inner
            .callers
            .entry(Self::key(caller, endpoint))
            .or_default()
            .record(now);
        if is_external {
            inner.global.record(now);
        }
    }

    /// Record a failed request and start the matching backoff.
    ///
    /// External failures also feed the global counter; once it reaches the
    /// threshold every external check backs off.
    #[instrument(skip(self))]
    pub fn record_failure(&self, caller: &str, endpoint: &str, is_external: bool) {
        let now = Instant::now();
        let factor = *self.config.backoff_factor();
        let max_backoff = self.config.max_backoff();
        let mut inner = self.state.lock();

        let caller_window = inner.callers.entry(Self::key(caller, endpoint)).or_default();
        let failures = caller_window.record_failure();
        let backoff = backoff_for(factor, failures, max_backoff);
        caller_window.start_backoff(now, backoff);
        debug!(failures, backoff = ?backoff, "Caller backing off");

        if is_external {
            let global_failures = inner.global.record_failure();
            if global_failures >= *self.config.global_failure_threshold() {
                let global_backoff = backoff_for(factor, global_failures, max_backoff);
                inner.global.start_backoff(now, global_backoff);
                warn!(
                    global_failures,
                    backoff = ?global_backoff,
                    "Upstream failing, backing off all external calls"
                );
            }
        }
    }

    /// Snapshot of limiter activity.
    pub fn stats(&self) -> RateLimiterStats {
        let now = Instant::now();
        let window = self.config.window();
        let inner = self.state.lock();

        let active_backoffs = inner
            .callers
            .values()
            .filter(|w| w.in_backoff(now))
            .count();
        let recent_requests_last_minute = inner
            .callers
            .values()
            .map(|w| w.count_within(now, window))
            .sum();
        let global_remaining = inner
            .global
            .backoff_until()
            .and_then(|until| until.checked_duration_since(now))
            .filter(|d| !d.is_zero());

        RateLimiterStats {
            requests_per_minute_limit: *self.config.requests_per_minute(),
            burst_limit: *self.config.burst_limit(),
            upstream_limit: *self.config.upstream_requests_per_minute(),
            active_callers: inner.callers.len(),
            active_backoffs,
            recent_requests_last_minute,
            global_requests_last_minute: inner.global.count_within(now, window),
            global_failure_count: *inner.global.consecutive_failures(),
            global_backoff_active: global_remaining.is_some(),
            global_backoff_remaining_secs: global_remaining.map(|d| d.as_secs_f64()),
        }
    }
}
