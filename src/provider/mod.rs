//! Provider-aware verification: each destination domain is routed to the
//! pipeline built for its provider override, or to the default one.

mod config;

pub use config::{ConfigError, ProviderOverride, VerifierConfig};

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::mx::{DnsMxResolver, MxResolver};
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::policy::ReplyClassifier;
use crate::smtp::{SmtpProber, TcpProber};
use crate::throttle::{ConnectionRateLimiter, DomainSlots};
use crate::validator::parse_address;
use crate::verdict::Verdict;

/// Cache key of the pipeline used when no provider matches.
pub const DEFAULT_POLICY: &str = "default";

pub struct ProviderAwareVerifier {
    base: PipelineConfig,
    providers: Vec<ProviderOverride>,
    resolver: Arc<dyn MxResolver>,
    prober: Arc<dyn SmtpProber>,
    slots: Arc<DomainSlots>,
    rate: Arc<ConnectionRateLimiter>,
    pipelines: DashMap<String, Arc<Pipeline>>,
}

impl std::fmt::Debug for ProviderAwareVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAwareVerifier")
            .field("base", &self.base)
            .field("providers", &self.providers)
            .field("cached", &self.pipelines.len())
            .finish_non_exhaustive()
    }
}

impl ProviderAwareVerifier {
    pub fn new(
        base: PipelineConfig,
        providers: Vec<ProviderOverride>,
        resolver: Arc<dyn MxResolver>,
        prober: Arc<dyn SmtpProber>,
    ) -> Self {
        let slots = Arc::new(DomainSlots::new(base.per_domain_concurrency));
        let rate = Arc::new(ConnectionRateLimiter::new(base.connects_per_minute));
        Self {
            base,
            providers,
            resolver,
            prober,
            slots,
            rate,
            pipelines: DashMap::new(),
        }
    }

    /// Verifier over the system resolver and TCP probing, classifying
    /// replies with the configured (or built-in) policy document.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, ConfigError> {
        let engine = Arc::new(config.policy_engine()?);
        let resolver = DnsMxResolver::from_system_conf(config.pipeline.dns_timeout())?;
        let classifier = ReplyClassifier::new(Some(engine), config.pipeline.classifier);
        let prober = TcpProber::new(config.pipeline.probe.clone(), Arc::new(classifier));
        Ok(Self::new(
            config.pipeline.clone(),
            config.providers.clone(),
            Arc::new(resolver),
            Arc::new(prober),
        ))
    }

    /// First enabled override whose domains cover `domain`.
    pub fn resolve_policy(&self, domain: &str) -> Option<&ProviderOverride> {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        self.providers
            .iter()
            .filter(|p| p.enabled)
            .find(|p| p.matches(&domain))
    }

    /// Cached pipeline for `domain`'s provider, built on first use.
    pub fn pipeline_for(&self, domain: &str) -> Arc<Pipeline> {
        let provider = self.resolve_policy(domain);
        let key = provider.map_or_else(
            || DEFAULT_POLICY.to_string(),
            |p| format!("provider:{}", p.key()),
        );

        if let Some(existing) = self.pipelines.get(&key) {
            return Arc::clone(existing.value());
        }

        let entry = self.pipelines.entry(key.clone()).or_insert_with(|| {
            let config = provider.map_or_else(|| self.base.clone(), |p| p.apply(&self.base));
            debug!(policy = %key, hint = %config.provider_hint, "building pipeline");
            let pipeline = Pipeline::new(
                config,
                Arc::clone(&self.resolver),
                Arc::clone(&self.prober),
            );
            Arc::new(self.attach_throttle(pipeline, provider))
        });
        Arc::clone(entry.value())
    }

    /// Pipelines share the verifier's slot pools and rate clock unless their
    /// provider sets its own limit.
    fn attach_throttle(&self, pipeline: Pipeline, provider: Option<&ProviderOverride>) -> Pipeline {
        let (own_slots, own_rate) = provider.map_or((false, false), |p| {
            (
                p.per_domain_concurrency.is_some(),
                p.connects_per_minute.is_some(),
            )
        });
        let slots = if own_slots {
            pipeline.slots()
        } else {
            Arc::clone(&self.slots)
        };
        let rate = if own_rate {
            pipeline.rate()
        } else {
            Arc::clone(&self.rate)
        };
        pipeline.with_throttle(slots, rate)
    }

    /// Number of pipelines built so far.
    pub fn cached(&self) -> usize {
        self.pipelines.len()
    }

    pub async fn verify(&self, address: &str, cancel: &CancellationToken) -> Verdict {
        let pipeline = match parse_address(address) {
            Ok(parsed) => self.pipeline_for(&parsed.domain),
            // The default pipeline reports the syntax verdict.
            Err(_) => self.pipeline_for(""),
        };
        pipeline.verify(address, cancel).await
    }
}

#[cfg(test)]
mod tests;
