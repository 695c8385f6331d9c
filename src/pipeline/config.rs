use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::policy::ClassifierOptions;
use crate::smtp::ProbeOptions;
use crate::throttle::Backoff;
use crate::validator::{RolePolicy, ScreeningLists};

/// Tuning for one [`Pipeline`](super::Pipeline). Every field has a default;
/// a JSON document only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dns_timeout_ms: u64,
    /// Extra MX lookups after a timeout or SERVFAIL.
    pub dns_retries: u32,
    /// Exchangers probed at most, in preference order.
    pub max_attempts: usize,
    pub backoff_base_ms: u64,
    /// Upper bound on one backoff sleep; zero means unbounded.
    pub backoff_max_ms: u64,
    /// Concurrent sessions per destination domain; zero means unlimited.
    pub per_domain_concurrency: usize,
    /// Outbound connections per minute; zero means unlimited.
    pub connects_per_minute: u32,
    pub role_policy: RolePolicy,
    pub lists: ScreeningLists,
    pub probe: ProbeOptions,
    pub classifier: ClassifierOptions,
    /// Policy profile used to classify replies; empty infers it per host.
    pub provider_hint: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dns_timeout_ms: 5_000,
            dns_retries: 2,
            max_attempts: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
            per_domain_concurrency: 4,
            connects_per_minute: 120,
            role_policy: RolePolicy::default(),
            lists: ScreeningLists::default(),
            probe: ProbeOptions::default(),
            classifier: ClassifierOptions::default(),
            provider_hint: String::new(),
        }
    }
}

impl PipelineConfig {
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::from_millis(self.backoff_base_ms, self.backoff_max_ms)
    }
}
