// src/edgar/throttle.rs
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::utils::error::EdgarError;

/// Minimum spacing between requests issued through one `RequestThrottle`.
///
/// The lock only covers reading and updating the last grant; callers that must
/// wait sleep outside it and re-check when their earliest slot arrives, so a
/// pool of tasks can share one throttle without serialising on the mutex.
#[derive(Debug)]
pub struct RequestThrottle {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until a request may be issued and records it as issued.
    ///
    /// Returns the instant the request slot was granted. Grants handed out by
    /// one throttle are always at least `min_interval` apart.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Instant, EdgarError> {
        loop {
            if cancel.is_cancelled() {
                return Err(EdgarError::Cancelled);
            }

            let earliest = {
                let mut last = self.last_request.lock().await;
                let now = Instant::now();
                match *last {
                    Some(prev) if now < prev + self.min_interval => prev + self.min_interval,
                    _ => {
                        *last = Some(now);
                        return Ok(now);
                    }
                }
            };

            tracing::trace!(
                wait_ms = earliest.saturating_duration_since(Instant::now()).as_millis() as u64,
                "Throttling EDGAR request"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(EdgarError::Cancelled),
                _ = sleep_until(earliest) => {}
            }
        }
    }
}
