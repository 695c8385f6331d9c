use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Global outbound-connection limiter releasing one token every
/// `60s / connects_per_minute`.
#[derive(Debug)]
pub struct ConnectionRateLimiter {
    interval: Duration,
    next: Mutex<Option<Instant>>,
}

impl ConnectionRateLimiter {
    /// Zero connects per minute disables the limiter.
    pub fn new(connects_per_minute: u32) -> Self {
        let interval = if connects_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(60) / connects_per_minute
        };
        Self {
            interval,
            next: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserve the next connection slot and wait for it. Returns `false` if
    /// cancelled before the slot came up; the slot is handed back unless a
    /// later caller has already reserved past it.
    pub async fn wait(&self, cancel: &CancellationToken) -> bool {
        if self.interval.is_zero() {
            return !cancel.is_cancelled();
        }
        let at = self.reserve(Instant::now());
        if at <= Instant::now() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.release(at);
                false
            }
            _ = tokio::time::sleep_until(at) => true,
        }
    }

    fn release(&self, at: Instant) {
        let mut next = self.next.lock();
        if *next == Some(at + self.interval) {
            *next = Some(at);
        }
    }

    fn reserve(&self, now: Instant) -> Instant {
        let mut next = self.next.lock();
        let at = match *next {
            Some(slot) if slot > now => slot,
            _ => now,
        };
        *next = Some(at + self.interval);
        at
    }
}
