//! Sliding request window with failure accounting.

use derive_getters::Getters;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Request history and backoff state for one caller+endpoint, or for all
/// upstream traffic.
///
/// After [`CallerWindow::prune`] the window holds no timestamps older than the
/// window length.
#[derive(Debug, Clone, Default, Getters)]
pub struct CallerWindow {
    /// Request timestamps, oldest first
    recent_request_times: VecDeque<Instant>,
    /// Failures since the last expired backoff
    consecutive_failures: u32,
    /// End of the current backoff, if one is active or unobserved
    backoff_until: Option<Instant>,
}

impl CallerWindow {
    /// Drop timestamps that fell out of the trailing `window`.
    pub fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.recent_request_times.front() {
            if now.duration_since(oldest) > window {
                self.recent_request_times.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of requests currently in the window.
    pub fn count(&self) -> usize {
        self.recent_request_times.len()
    }

    /// Requests made within the trailing `window`, without pruning.
    pub fn count_within(&self, now: Instant, window: Duration) -> usize {
        self.recent_request_times
            .iter()
            .filter(|&&t| now.duration_since(t) <= window)
            .count()
    }

    /// Record a request at `now`.
    pub fn record(&mut self, now: Instant) {
        self.recent_request_times.push_back(now);
    }

    /// Time until the oldest request leaves the window, at least one second.
    pub fn time_until_slot(&self, now: Instant, window: Duration) -> Duration {
        let elapsed = self
            .recent_request_times
            .front()
            .map(|&oldest| now.duration_since(oldest))
            .unwrap_or_default();
        window.saturating_sub(elapsed).max(Duration::from_secs(1))
    }

    /// Remaining backoff at `now`, if still active.
    ///
    /// An expired backoff is cleared and the failure count reset.
    pub fn observe_backoff(&mut self, now: Instant) -> Option<Duration> {
        let until = self.backoff_until?;
        if now < until {
            return Some(until - now);
        }
        self.backoff_until = None;
        self.consecutive_failures = 0;
        None
    }

    /// Whether a backoff is set and has not yet passed.
    pub fn in_backoff(&self, now: Instant) -> bool {
        self.backoff_until.is_some_and(|until| now < until)
    }

    /// Count one failure and return the new total.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }

    /// Start a backoff lasting `duration` from `now`.
    pub fn start_backoff(&mut self, now: Instant, duration: Duration) {
        self.backoff_until = Some(now + duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn prune_keeps_only_trailing_window() {
        let mut window = CallerWindow::default();
        let start = Instant::now();
        window.record(start);
        tokio::time::advance(Duration::from_secs(30)).await;
        window.record(Instant::now());
        tokio::time::advance(Duration::from_secs(31)).await;

        window.prune(Instant::now(), Duration::from_secs(60));
        assert_eq!(window.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slot_wait_is_floored_at_one_second() {
        let mut window = CallerWindow::default();
        window.record(Instant::now());
        tokio::time::advance(Duration::from_millis(59_800)).await;

        let wait = window.time_until_slot(Instant::now(), Duration::from_secs(60));
        assert_eq!(wait, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_backoff_resets_failures() {
        let mut window = CallerWindow::default();
        window.record_failure();
        window.record_failure();
        window.start_backoff(Instant::now(), Duration::from_secs(4));

        assert_eq!(window.observe_backoff(Instant::now()), Some(Duration::from_secs(4)));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(window.observe_backoff(Instant::now()), None);
        assert_eq!(*window.consecutive_failures(), 0);
        assert!(window.backoff_until().is_none());
    }
}
