use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::*;

#[test]
fn backoff_is_linear_in_attempt() {
    let backoff = Backoff::from_millis(100, 0);
    assert_eq!(backoff.delay(0, None), Duration::from_millis(100));
    assert_eq!(backoff.delay(2, None), Duration::from_millis(300));
}

#[test]
fn retry_after_raises_delay() {
    let backoff = Backoff::from_millis(100, 0);
    assert_eq!(
        backoff.delay(0, Some(Duration::from_secs(5))),
        Duration::from_secs(5)
    );
    assert_eq!(
        backoff.delay(4, Some(Duration::from_millis(10))),
        Duration::from_millis(500)
    );
}

#[test]
fn cap_bounds_delay() {
    let backoff = Backoff::from_millis(100, 1_000);
    assert_eq!(
        backoff.delay(0, Some(Duration::from_secs(900))),
        Duration::from_secs(1)
    );
}

#[tokio::test(start_paused = true)]
async fn backoff_sleep_waits() {
    let backoff = Backoff::from_millis(200, 0);
    let start = Instant::now();
    assert!(backoff.sleep(1, None, &CancellationToken::new()).await);
    assert!(start.elapsed() >= Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn backoff_sleep_honours_cancellation() {
    let backoff = Backoff::from_millis(60_000, 0);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let start = Instant::now();
    assert!(!backoff.sleep(0, None, &cancel).await);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn unlimited_slots_never_block() {
    let slots = DomainSlots::new(0);
    let cancel = CancellationToken::new();
    let a = slots.acquire("example.com", &cancel).await;
    let b = slots.acquire("example.com", &cancel).await;
    assert!(a.is_some() && b.is_some());
    assert_eq!(slots.available("example.com"), None);
}

#[tokio::test]
async fn slots_are_per_domain() {
    let slots = DomainSlots::new(1);
    let cancel = CancellationToken::new();
    let _a = slots.acquire("a.example", &cancel).await.expect("slot");
    let _b = slots.acquire("b.example", &cancel).await.expect("slot");
    assert_eq!(slots.available("a.example"), Some(0));
    assert_eq!(slots.available("b.example"), Some(0));
}

#[tokio::test]
async fn dropping_guard_releases_slot() {
    let slots = DomainSlots::new(1);
    let cancel = CancellationToken::new();
    let guard = slots.acquire("example.com", &cancel).await.expect("slot");
    assert_eq!(slots.available("example.com"), Some(0));
    drop(guard);
    assert_eq!(slots.available("example.com"), Some(1));
}

#[tokio::test(start_paused = true)]
async fn full_pool_waits_until_cancelled() {
    let slots = Arc::new(DomainSlots::new(1));
    let cancel = CancellationToken::new();
    let _held = slots.acquire("example.com", &cancel).await.expect("slot");

    let waiter = {
        let slots = Arc::clone(&slots);
        let cancel = cancel.clone();
        tokio::spawn(async move { slots.acquire("example.com", &cancel).await.is_some() })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();
    assert!(!waiter.await.expect("join"));
}

#[tokio::test(start_paused = true)]
async fn rate_limiter_spaces_connections() {
    let limiter = ConnectionRateLimiter::new(60);
    assert_eq!(limiter.interval(), Duration::from_secs(1));
    let cancel = CancellationToken::new();
    let start = Instant::now();
    for _ in 0..3 {
        assert!(limiter.wait(&cancel).await);
    }
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn rate_limiter_wait_is_cancellable() {
    let limiter = ConnectionRateLimiter::new(1);
    let cancel = CancellationToken::new();
    assert!(limiter.wait(&cancel).await);
    cancel.cancel();
    assert!(!limiter.wait(&cancel).await);
}

#[tokio::test(start_paused = true)]
async fn cancelled_wait_hands_slot_back() {
    let limiter = Arc::new(ConnectionRateLimiter::new(60));
    let live = CancellationToken::new();
    assert!(limiter.wait(&live).await);

    let abandoned = CancellationToken::new();
    let waiter = {
        let limiter = Arc::clone(&limiter);
        let abandoned = abandoned.clone();
        tokio::spawn(async move { limiter.wait(&abandoned).await })
    };
    tokio::task::yield_now().await;
    abandoned.cancel();
    assert!(!waiter.await.expect("join"));

    let start = Instant::now();
    assert!(limiter.wait(&live).await);
    let elapsed = start.elapsed();
    assert!(elapsed <= Duration::from_secs(1), "{elapsed:?}");
}

#[tokio::test]
async fn disabled_rate_limiter_is_immediate() {
    let limiter = ConnectionRateLimiter::new(0);
    let cancel = CancellationToken::new();
    for _ in 0..100 {
        assert!(limiter.wait(&cancel).await);
    }
}
