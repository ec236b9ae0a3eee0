//! Bounded, paced dispatch of upstream calls.

use crate::QueueConfig;
use decksmith_error::CancelledError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Concurrency cap plus a minimum gap between dispatches.
///
/// At most `max_concurrent` calls run at once, and no two dispatches are
/// closer together than `min_spacing`. The dispatch clock is stamped when a
/// call starts and refreshed when it finishes, whatever the outcome.
#[derive(Debug)]
pub struct RequestQueue {
    config: QueueConfig,
    semaphore: Arc<Semaphore>,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RequestQueue {
    /// Create a queue with the given bounds.
    pub fn new(config: QueueConfig) -> Self {
        let permits = (*config.max_concurrent()).max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            config,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Bounds in use.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Calls that could be admitted right now.
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run `call` once admitted.
    ///
    /// The call's own output, success or failure, is returned untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CancelledError`] if `cancel` fires while waiting for a slot
    /// or for the spacing gap. A call already dispatched runs to completion.
    #[instrument(skip_all)]
    pub async fn execute<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T, CancelledError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = tokio::select! {
            _ = cancel.cancelled() => return Err(CancelledError::new("request_queue")),
            permit = self.semaphore.acquire() => {
                // The semaphore is owned here and never closed
                permit.map_err(|_| CancelledError::new("request_queue"))?
            }
        };

        {
            let mut last = tokio::select! {
                _ = cancel.cancelled() => return Err(CancelledError::new("request_queue")),
                guard = self.last_dispatch.lock() => guard,
            };

            if let Some(previous) = *last {
                let ready_at = previous + self.config.min_spacing();
                if ready_at > Instant::now() {
                    debug!(wait = ?(ready_at - Instant::now()), "Spacing dispatch");
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(CancelledError::new("request_queue")),
                        _ = tokio::time::sleep_until(ready_at) => {}
                    }
                }
            }

            *last = Some(Instant::now());
        }

        let output = call().await;

        let finished = Instant::now();
        let mut last = self.last_dispatch.lock().await;
        *last = Some(last.map_or(finished, |previous| previous.max(finished)));

        Ok(output)
    }
}
