use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Linear backoff: `base * (attempt + 1)`, raised to a server-advertised
/// retry-after when that is longer, and capped at `max` (zero disables the
/// cap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn from_millis(base_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
    }

    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let linear = self.base.saturating_mul(attempt.saturating_add(1));
        let delay = match retry_after {
            Some(hint) if hint > linear => hint,
            _ => linear,
        };
        if self.max.is_zero() {
            delay
        } else {
            delay.min(self.max)
        }
    }

    /// Sleep for [`Backoff::delay`]. Returns `false` if cancelled first.
    pub async fn sleep(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        cancel: &CancellationToken,
    ) -> bool {
        let delay = self.delay(attempt, retry_after);
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_millis(500, 30_000)
    }
}
