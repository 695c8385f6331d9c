//! Verification pipeline: screening, MX lookup, then exchangers probed in
//! preference order until one says `valid` or the attempt budget runs out.

mod config;

pub use config::PipelineConfig;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::mx::{DnsError, DnsMxResolver, MxResolver, resolve_mx_with_retry};
use crate::policy::{PolicyEngine, ReplyClassifier};
use crate::smtp::{ProbeTarget, SmtpProber, TcpProber};
use crate::throttle::{Backoff, ConnectionRateLimiter, DomainSlots};
use crate::validator::Screener;
use crate::verdict::Verdict;

pub struct Pipeline {
    config: PipelineConfig,
    screener: Screener,
    backoff: Backoff,
    resolver: Arc<dyn MxResolver>,
    prober: Arc<dyn SmtpProber>,
    slots: Arc<DomainSlots>,
    rate: Arc<ConnectionRateLimiter>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("slots", &self.slots)
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Pipeline over the given collaborators, with its own slot pools and
    /// rate clock sized from `config`.
    pub fn new(
        config: PipelineConfig,
        resolver: Arc<dyn MxResolver>,
        prober: Arc<dyn SmtpProber>,
    ) -> Self {
        let slots = Arc::new(DomainSlots::new(config.per_domain_concurrency));
        let rate = Arc::new(ConnectionRateLimiter::new(config.connects_per_minute));
        Self {
            screener: Screener::new(&config.lists, config.role_policy),
            backoff: config.backoff(),
            config,
            resolver,
            prober,
            slots,
            rate,
        }
    }

    /// Pipeline using the system resolver and plain TCP probing.
    pub fn from_config(
        config: PipelineConfig,
        engine: Option<Arc<PolicyEngine>>,
    ) -> Result<Self, DnsError> {
        let resolver = DnsMxResolver::from_system_conf(config.dns_timeout())?;
        let classifier = ReplyClassifier::new(engine, config.classifier);
        let prober = TcpProber::new(config.probe.clone(), Arc::new(classifier));
        Ok(Self::new(config, Arc::new(resolver), Arc::new(prober)))
    }

    /// Share concurrency state with other pipelines.
    pub fn with_throttle(
        mut self,
        slots: Arc<DomainSlots>,
        rate: Arc<ConnectionRateLimiter>,
    ) -> Self {
        self.slots = slots;
        self.rate = rate;
        self
    }

    pub fn slots(&self) -> Arc<DomainSlots> {
        Arc::clone(&self.slots)
    }

    pub fn rate(&self) -> Arc<ConnectionRateLimiter> {
        Arc::clone(&self.rate)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Verify one address. Never fails: every outcome is a verdict.
    pub async fn verify(&self, address: &str, cancel: &CancellationToken) -> Verdict {
        let parsed = match self.screener.screen(address) {
            Ok(parsed) => parsed,
            Err(verdict) => {
                info!(reason = %verdict.reason, category = %verdict.category, "address screened out");
                return verdict;
            }
        };

        let hosts = match resolve_mx_with_retry(
            self.resolver.as_ref(),
            &parsed.domain,
            self.config.dns_retries,
            &self.backoff,
            cancel,
        )
        .await
        {
            Ok(hosts) => hosts,
            Err(verdict) => {
                info!(domain = %parsed.domain, reason = %verdict.reason, "MX resolution ended verification");
                return verdict;
            }
        };

        let target = ProbeTarget::new(parsed.local, parsed.domain)
            .with_provider_hint(self.config.provider_hint.clone());
        let verdict = self.probe_hosts(&hosts, &target, cancel).await;
        info!(
            domain = %target.domain,
            category = %verdict.category,
            reason = %verdict.reason_code,
            decision = %verdict.decision_class,
            "verification finished"
        );
        verdict
    }

    async fn probe_hosts(
        &self,
        hosts: &[crate::mx::MxHost],
        target: &ProbeTarget,
        cancel: &CancellationToken,
    ) -> Verdict {
        let mut best: Option<Verdict> = None;
        let mut retry_after: Option<Duration> = None;

        for (attempt, host) in hosts.iter().take(self.config.max_attempts).enumerate() {
            if attempt > 0 {
                let previous = u32::try_from(attempt - 1).unwrap_or(u32::MAX);
                if !self.backoff.sleep(previous, retry_after, cancel).await {
                    break;
                }
            }

            let Some(_slot) = self.slots.acquire(&target.domain, cancel).await else {
                break;
            };
            if !self.rate.wait(cancel).await {
                break;
            }

            let verdict = self.prober.probe(host, target, cancel).await;
            debug!(
                host = %host.host,
                preference = host.preference,
                attempt,
                category = %verdict.category,
                reason = %verdict.reason_code,
                "exchanger probed"
            );
            if verdict.is_valid() {
                return verdict;
            }
            retry_after = verdict.retry_after_secs.map(Duration::from_secs);
            best = match best {
                Some(current) if current.rank() >= verdict.rank() => Some(current),
                _ => Some(verdict),
            };
            if cancel.is_cancelled() {
                break;
            }
        }

        best.unwrap_or_else(Verdict::smtp_timeout)
    }
}
