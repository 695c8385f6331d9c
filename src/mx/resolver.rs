use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::op::ResponseCode;

use super::{DnsError, MxHost};
use crate::throttle::Backoff;
use crate::verdict::{DecisionClass, Verdict};

/// Capability to look up the mail exchangers of an ASCII domain.
///
/// An empty list means the domain exists but publishes no MX.
#[async_trait]
pub trait MxResolver: Send + Sync {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, DnsError>;
}

/// [`MxResolver`] backed by the system's DNS configuration.
#[derive(Clone)]
pub struct DnsMxResolver {
    inner: TokioAsyncResolver,
    timeout: Duration,
}

impl std::fmt::Debug for DnsMxResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsMxResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DnsMxResolver {
    /// Read `/etc/resolv.conf` (or the platform equivalent). Each query gets
    /// a single attempt bounded by `timeout`; retries are driven by
    /// [`resolve_mx_with_retry`].
    pub fn from_system_conf(timeout: Duration) -> Result<Self, DnsError> {
        let (config, mut opts) = trust_dns_resolver::system_conf::read_system_conf()
            .map_err(|err| DnsError::resolver_init(ResolveError::from(err)))?;
        opts.timeout = timeout;
        opts.attempts = 1;
        Ok(Self {
            inner: TokioAsyncResolver::tokio(config, opts),
            timeout,
        })
    }
}

#[async_trait]
impl MxResolver for DnsMxResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxHost>, DnsError> {
        let fqdn = format!("{}.", domain.trim_end_matches('.'));
        let lookup = match tokio::time::timeout(self.timeout, self.inner.mx_lookup(fqdn)).await {
            Err(_elapsed) => return Err(DnsError::Timeout),
            Ok(Err(err)) => return classify_error(&err),
            Ok(Ok(lookup)) => lookup,
        };
        Ok(lookup
            .iter()
            .map(|mx| MxHost::new(normalize_exchange(&mx.exchange().to_utf8()), mx.preference()))
            .filter(|mx| !mx.host.is_empty())
            .collect())
    }
}

fn classify_error(err: &ResolveError) -> Result<Vec<MxHost>, DnsError> {
    match err.kind() {
        ResolveErrorKind::Timeout => Err(DnsError::Timeout),
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::NoError | ResponseCode::NXDomain => Ok(Vec::new()),
            ResponseCode::ServFail => Err(DnsError::lookup(format!("servfail: {err}"))),
            other => Err(DnsError::lookup(format!("{other}: {err}"))),
        },
        _ => Err(DnsError::lookup(err.to_string())),
    }
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}

/// Look up `domain`'s exchangers, retrying timeouts and SERVFAIL up to
/// `retries` extra times.
///
/// Every outcome that is not a usable host list comes back as a verdict:
/// `invalid/mx_missing` for an empty answer, `risky/dns_timeout` or
/// `risky/dns_servfail` when lookups keep failing.
pub async fn resolve_mx_with_retry<R>(
    resolver: &R,
    domain: &str,
    retries: u32,
    backoff: &Backoff,
    cancel: &CancellationToken,
) -> Result<Vec<MxHost>, Verdict>
where
    R: MxResolver + ?Sized,
{
    let mut attempt = 0;
    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DnsError::Timeout),
            res = resolver.lookup_mx(domain) => res,
        };

        let err = match outcome {
            Ok(hosts) if hosts.is_empty() => {
                debug!(domain, "no MX records");
                return Err(Verdict::invalid("mx_missing"));
            }
            Ok(hosts) => return Ok(order_hosts(hosts)),
            Err(err) => err,
        };

        if err.is_retryable() && attempt < retries && !cancel.is_cancelled() {
            debug!(domain, attempt, error = %err, "MX lookup failed; retrying");
            if backoff.sleep(attempt, None, cancel).await {
                attempt += 1;
                continue;
            }
        }

        warn!(domain, attempts = attempt + 1, error = %err, "MX lookup failed");
        return Err(Verdict::risky(err.reason()).with_decision(DecisionClass::Retryable));
    }
}

/// Ascending preference, input order kept among equals, duplicates dropped.
fn order_hosts(mut hosts: Vec<MxHost>) -> Vec<MxHost> {
    hosts.sort_by_key(|mx| mx.preference);
    let mut seen = HashSet::new();
    hosts.retain(|mx| seen.insert(mx.host.clone()));
    hosts
}
