use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{DnsError, MxHost, MxResolver, resolve_mx_with_retry, resolver};
use crate::throttle::Backoff;
use crate::verdict::{Category, DecisionClass};

type LookupResult = Result<Vec<MxHost>, DnsError>;
type LookupFn = dyn Fn(&str) -> LookupResult + Send + Sync;

/// Scripted resolver counting its calls.
pub(crate) struct StubResolver {
    pub on_lookup: Box<LookupFn>,
    pub calls: AtomicUsize,
    pub domains: Mutex<Vec<String>>,
}

impl StubResolver {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> LookupResult + Send + Sync + 'static,
    {
        Self {
            on_lookup: Box::new(f),
            calls: AtomicUsize::new(0),
            domains: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn hosts(hosts: Vec<MxHost>) -> Self {
        Self::new(move |_| Ok(hosts.clone()))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MxResolver for StubResolver {
    async fn lookup_mx(&self, domain: &str) -> LookupResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut domains) = self.domains.lock() {
            domains.push(domain.to_string());
        }
        (self.on_lookup)(domain)
    }
}

fn no_wait() -> Backoff {
    Backoff::from_millis(0, 0)
}

#[tokio::test]
async fn hosts_sorted_by_preference() {
    let stub = StubResolver::new(|domain| {
        assert_eq!(domain, "example.com");
        Ok(vec![
            MxHost::new("mx2.example.com", 20),
            MxHost::new("mx1.example.com", 10),
            MxHost::new("mx1.example.com", 10),
            MxHost::new("mx3.example.com", 30),
        ])
    });
    let hosts = resolve_mx_with_retry(&stub, "example.com", 0, &no_wait(), &CancellationToken::new())
        .await
        .expect("hosts");
    let names: Vec<_> = hosts.iter().map(|h| h.host.as_str()).collect();
    assert_eq!(names, ["mx1.example.com", "mx2.example.com", "mx3.example.com"]);
}

#[tokio::test]
async fn empty_answer_is_mx_missing() {
    let stub = StubResolver::hosts(Vec::new());
    let verdict = resolve_mx_with_retry(&stub, "example.com", 3, &no_wait(), &CancellationToken::new())
        .await
        .expect_err("no hosts");
    assert_eq!(verdict.category, Category::Invalid);
    assert_eq!(verdict.reason, "mx_missing");
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn timeouts_are_retried_then_reported() {
    let stub = StubResolver::new(|_| Err(DnsError::Timeout));
    let verdict = resolve_mx_with_retry(&stub, "example.com", 2, &no_wait(), &CancellationToken::new())
        .await
        .expect_err("timeout");
    assert_eq!(stub.calls(), 3);
    assert_eq!(verdict.category, Category::Risky);
    assert_eq!(verdict.reason, "dns_timeout");
    assert_eq!(verdict.decision_class, DecisionClass::Retryable);
}

#[tokio::test]
async fn servfail_recovers_on_retry() {
    let stub = StubResolver::new(|_| Err(DnsError::lookup("SERVFAIL from upstream")));
    let verdict = resolve_mx_with_retry(&stub, "example.com", 1, &no_wait(), &CancellationToken::new())
        .await
        .expect_err("servfail");
    assert_eq!(stub.calls(), 2);
    assert_eq!(verdict.reason, "dns_servfail");

    let attempts = AtomicUsize::new(0);
    let flaky = StubResolver::new(move |_| {
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(DnsError::lookup("servfail"))
        } else {
            Ok(vec![MxHost::new("mx.example.com", 5)])
        }
    });
    let hosts = resolve_mx_with_retry(&flaky, "example.com", 1, &no_wait(), &CancellationToken::new())
        .await
        .expect("second attempt succeeds");
    assert_eq!(hosts, vec![MxHost::new("mx.example.com", 5)]);
}

#[tokio::test]
async fn unrecognised_errors_are_servfail_without_retry() {
    let stub = StubResolver::new(|_| Err(DnsError::lookup("refused")));
    let verdict = resolve_mx_with_retry(&stub, "example.com", 5, &no_wait(), &CancellationToken::new())
        .await
        .expect_err("refused");
    assert_eq!(stub.calls(), 1);
    assert_eq!(verdict.reason, "dns_servfail");
}

#[tokio::test]
async fn cancelled_lookup_is_timeout() {
    let stub = StubResolver::hosts(vec![MxHost::new("mx.example.com", 10)]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let verdict = resolve_mx_with_retry(&stub, "example.com", 3, &no_wait(), &cancel)
        .await
        .expect_err("cancelled");
    assert_eq!(verdict.reason, "dns_timeout");
    assert_eq!(stub.calls(), 0);
}

#[test]
fn normalize_exchange_trims_dot_and_lowercases() {
    assert_eq!(
        resolver::normalize_exchange("Mail.EXAMPLE.com."),
        "mail.example.com"
    );
}

#[test]
fn retryability() {
    assert!(DnsError::Timeout.is_retryable());
    assert!(DnsError::lookup("Server Failure (SERVFAIL)").is_retryable());
    assert!(!DnsError::lookup("REFUSED").is_retryable());
}
