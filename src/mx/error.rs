use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("MX lookup timed out")]
    Timeout,
    #[error("MX lookup failed: {message}")]
    Lookup { message: String },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: ResolveError,
    },
}

impl DnsError {
    pub(crate) fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
        }
    }

    pub(crate) fn resolver_init(source: ResolveError) -> Self {
        Self::ResolverInit { source }
    }

    /// Timeouts and SERVFAIL answers are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Lookup { message } => message.to_ascii_lowercase().contains("servfail"),
            Self::ResolverInit { .. } => false,
        }
    }

    /// Verdict reason for a lookup that never succeeded. Anything that is
    /// not a timeout counts as a server failure.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Timeout => "dns_timeout",
            Self::Lookup { .. } | Self::ResolverInit { .. } => "dns_servfail",
        }
    }
}
