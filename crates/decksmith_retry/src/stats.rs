//! Process-lifetime failure counters.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::Serialize;
use std::collections::BTreeMap;

/// Failure counters keyed by operation.
///
/// An operation's count resets when it next succeeds; its last failure time
/// is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Getters)]
pub struct ErrorStats {
    /// Failures since the operation last succeeded
    error_counts: BTreeMap<String, u64>,
    /// When each operation last failed
    last_errors: BTreeMap<String, DateTime<Utc>>,
    /// Sum of `error_counts`
    total_errors: u64,
}

impl ErrorStats {
    pub(crate) fn record_failure(&mut self, operation: &str) {
        *self.error_counts.entry(operation.to_string()).or_default() += 1;
        self.last_errors.insert(operation.to_string(), Utc::now());
        self.total_errors = self.error_counts.values().sum();
    }

    pub(crate) fn record_success(&mut self, operation: &str) {
        if let Some(count) = self.error_counts.get_mut(operation) {
            *count = 0;
            self.total_errors = self.error_counts.values().sum();
        }
    }

    /// Failures recorded for `operation` since it last succeeded.
    pub fn count_for(&self, operation: &str) -> u64 {
        self.error_counts.get(operation).copied().unwrap_or(0)
    }
}
