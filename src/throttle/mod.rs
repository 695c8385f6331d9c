//! Concurrency controller: per-domain admission slots, a global connection
//! rate clock, and the backoff helper shared by DNS and host retries.
//!
//! All three are plain owned objects; the pipeline holds them behind `Arc`
//! and every wait honours the caller's cancellation token.

mod backoff;
mod rate;
mod slots;

pub use backoff::Backoff;
pub use rate::ConnectionRateLimiter;
pub use slots::{DomainSlots, SlotGuard};

#[cfg(test)]
mod tests;
