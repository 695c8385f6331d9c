#![forbid(unsafe_code)]
//! mailprobe_lib : vérification de délivrabilité e-mail (filtrage de
//! l'adresse, résolution MX, sondage SMTP RCPT TO et catch-all) avec des
//! politiques de réponse par fournisseur.

pub mod mx;
pub mod pipeline;
pub mod policy;
pub mod provider;
pub mod smtp;
pub mod throttle;
pub mod validator;
pub mod verdict;

pub use mx::{DnsError, DnsMxResolver, MxHost, MxResolver, resolve_mx_with_retry};
pub use pipeline::{Pipeline, PipelineConfig};
pub use policy::{
    ClassifierOptions, PolicyDocument, PolicyEngine, PolicyError, ReplyClassifier,
};
pub use provider::{ConfigError, ProviderAwareVerifier, ProviderOverride, VerifierConfig};
pub use smtp::{ProbeOptions, ProbeTarget, ProtocolReply, SmtpProber, TcpProber};
pub use throttle::{Backoff, ConnectionRateLimiter, DomainSlots};
pub use validator::{
    AddressError, ParsedAddress, RolePolicy, Screener, ScreeningLists, parse_address,
};
pub use verdict::{
    Category, Confidence, DecisionClass, Evidence, RetryStrategy, SmtpStep, Verdict,
};
