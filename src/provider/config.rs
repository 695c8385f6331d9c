use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::DEFAULT_POLICY;
use crate::mx::DnsError;
use crate::pipeline::PipelineConfig;
use crate::policy::{PolicyDocument, PolicyEngine, PolicyError};

/// Per-provider tuning applied on top of the base [`PipelineConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOverride {
    pub name: String,
    pub enabled: bool,
    /// Domain suffixes served by this provider. A leading `.` or `*.` is
    /// ignored.
    pub domains: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_domain_concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connects_per_minute: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_secs: Option<u64>,
    /// Additional exchangers to try after the first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    /// Policy profile used for this provider's replies; defaults to `name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

impl Default for ProviderOverride {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            domains: Vec::new(),
            per_domain_concurrency: None,
            connects_per_minute: None,
            backoff_secs: None,
            retry_count: None,
            profile: None,
        }
    }
}

impl ProviderOverride {
    pub fn key(&self) -> String {
        self.name.trim().to_ascii_lowercase()
    }

    /// Whether `domain` (ASCII, lowercase) equals or sits under one of the
    /// configured suffixes.
    pub fn matches(&self, domain: &str) -> bool {
        self.domains.iter().any(|pattern| {
            let suffix = normalize_suffix(pattern);
            !suffix.is_empty()
                && (domain == suffix
                    || domain
                        .strip_suffix(suffix.as_str())
                        .is_some_and(|head| head.ends_with('.')))
        })
    }

    /// `base` with this provider's overrides applied.
    pub fn apply(&self, base: &PipelineConfig) -> PipelineConfig {
        let mut config = base.clone();
        if let Some(limit) = self.per_domain_concurrency {
            config.per_domain_concurrency = limit;
        }
        if let Some(cpm) = self.connects_per_minute {
            config.connects_per_minute = cpm;
        }
        if let Some(secs) = self.backoff_secs {
            config.backoff_base_ms = secs.saturating_mul(1_000);
        }
        if let Some(retries) = self.retry_count {
            config.max_attempts = usize::try_from(retries)
                .unwrap_or(usize::MAX)
                .saturating_add(1);
        }
        let profile = self
            .profile
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| self.key());
        config.provider_hint = profile;
        config
    }
}

fn normalize_suffix(pattern: &str) -> String {
    pattern
        .trim()
        .trim_start_matches("*.")
        .trim_start_matches('.')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration is not valid JSON: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot read configuration {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("provider override #{index} has no name")]
    UnnamedProvider { index: usize },
    #[error("provider override #{index} uses the reserved name `{name}`")]
    ReservedProviderName { index: usize, name: String },
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Dns(#[from] DnsError),
}

/// Top-level configuration document.
///
/// ```json
/// {"pipeline": {"probe": {"mail_from": "probe@example.net"}},
///  "providers": [{"name": "gmail", "domains": ["gmail.com"], "per_domain_concurrency": 2}],
///  "policy": {"version": "2024-05", "profiles": {}}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub pipeline: PipelineConfig,
    pub providers: Vec<ProviderOverride>,
    /// Provider policy document; the built-in profiles are used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyDocument>,
}

impl VerifierConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|source| ConfigError::Json { source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(index) = self.providers.iter().position(|p| p.key().is_empty()) {
            return Err(ConfigError::UnnamedProvider { index });
        }
        if let Some(index) = self.providers.iter().position(|p| p.key() == DEFAULT_POLICY) {
            return Err(ConfigError::ReservedProviderName {
                index,
                name: DEFAULT_POLICY.to_string(),
            });
        }
        Ok(())
    }

    /// Normalized policy engine: the configured document, or the built-ins.
    pub fn policy_engine(&self) -> Result<PolicyEngine, ConfigError> {
        match &self.policy {
            Some(doc) => Ok(PolicyEngine::from_document(doc.clone())?),
            None => Ok(PolicyEngine::builtin()),
        }
    }
}
