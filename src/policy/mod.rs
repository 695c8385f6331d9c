//! Reply classification and provider policy engine.
//!
//! [`ReplyClassifier`] turns a [`ProtocolReply`](crate::smtp::ProtocolReply)
//! into a [`Verdict`](crate::verdict::Verdict). When a [`PolicyEngine`] is
//! active, the provider's rules are consulted first (enhanced code prefix,
//! then numeric code, then message substring; first match wins). Otherwise,
//! or when nothing matches, fixed heuristics apply.

mod builtin;
mod classifier;
mod engine;
mod error;
mod heuristics;
mod provider;
mod types;

pub use builtin::builtin_document;
pub use classifier::{Classification, ClassifierOptions, ReplyClassifier, ReplyContext};
pub use engine::{GENERIC_PROFILE, PolicyEngine};
pub use error::PolicyError;
pub use provider::resolve_provider;
pub use types::{
    CodeRule, EnhancedRule, MessageRule, PolicyDocument, ProfileDocument, ProviderReplyPolicy,
    RetryDocument, RetryTable, RuleKind, RuleMatch, RuleOutcome,
};
