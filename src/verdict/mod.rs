//! Verification outcome model.
//!
//! A [`Verdict`] is built with plain constructors plus chained `with_*`
//! setters. The setters keep the taxonomy consistent: a `policy_blocked`
//! decision always carries the `policy_delay` strategy, terminal decisions
//! never carry a retry delay.

mod types;

pub use types::{
    Category, Confidence, DecisionClass, Evidence, RetryStrategy, SmtpStep, Verdict,
};

use crate::smtp::ProtocolReply;

impl Verdict {
    pub fn new(
        category: Category,
        reason: impl Into<String>,
        decision_class: DecisionClass,
        confidence: Confidence,
    ) -> Self {
        let reason = reason.into();
        Self {
            category,
            reason_code: reason.clone(),
            reason,
            decision_class,
            decision_confidence: confidence,
            retry_after_secs: None,
            retry_strategy: default_strategy(decision_class),
            provider_profile: None,
            policy_version: None,
            matched_rule_id: None,
            suggestion: None,
            evidence: Evidence {
                decision_class: Some(decision_class),
                ..Evidence::default()
            },
        }
    }

    pub fn valid(reason: impl Into<String>) -> Self {
        Self::new(
            Category::Valid,
            reason,
            DecisionClass::Deliverable,
            Confidence::Medium,
        )
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::new(
            Category::Invalid,
            reason,
            DecisionClass::Undeliverable,
            Confidence::High,
        )
    }

    pub fn risky(reason: impl Into<String>) -> Self {
        Self::new(
            Category::Risky,
            reason,
            DecisionClass::Unknown,
            Confidence::Low,
        )
    }

    /// Read deadline exceeded, cancellation, or no result at all.
    pub fn smtp_timeout() -> Self {
        Self::risky("smtp_timeout").with_decision(DecisionClass::Retryable)
    }

    /// Transient transport-level failure tagged with a finer `reason_code`.
    pub fn smtp_tempfail(reason_code: impl Into<String>) -> Self {
        Self::risky("smtp_tempfail")
            .with_reason_code(reason_code)
            .with_decision(DecisionClass::Retryable)
    }

    pub fn with_reason_code(mut self, code: impl Into<String>) -> Self {
        self.reason_code = code.into();
        self
    }

    pub fn with_decision(mut self, class: DecisionClass) -> Self {
        self.decision_class = class;
        self.evidence.decision_class = Some(class);
        match class {
            DecisionClass::PolicyBlocked => self.retry_strategy = RetryStrategy::PolicyDelay,
            DecisionClass::Deliverable | DecisionClass::Undeliverable => {
                self.retry_strategy = RetryStrategy::None;
                self.retry_after_secs = None;
            }
            DecisionClass::Retryable | DecisionClass::Unknown => {
                if matches!(
                    self.retry_strategy,
                    RetryStrategy::None | RetryStrategy::PolicyDelay
                ) {
                    self.retry_strategy = RetryStrategy::Tempfail;
                }
            }
        }
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.decision_confidence = confidence;
        self
    }

    /// Attach retry guidance. Ignored for terminal decisions; forced to
    /// `policy_delay` for policy blocks.
    pub fn with_retry(mut self, strategy: RetryStrategy, after_secs: u64) -> Self {
        match self.decision_class {
            DecisionClass::Deliverable | DecisionClass::Undeliverable => {}
            DecisionClass::PolicyBlocked => {
                self.retry_strategy = RetryStrategy::PolicyDelay;
                self.retry_after_secs = Some(after_secs);
            }
            DecisionClass::Retryable | DecisionClass::Unknown => {
                self.retry_strategy = match strategy {
                    RetryStrategy::None | RetryStrategy::PolicyDelay => RetryStrategy::Tempfail,
                    other => other,
                };
                self.retry_after_secs = Some(after_secs);
            }
        }
        self
    }

    pub fn with_provenance(
        mut self,
        profile: impl Into<String>,
        policy_version: Option<String>,
        rule_id: Option<String>,
    ) -> Self {
        let profile = profile.into();
        self.evidence.provider = Some(profile.clone());
        self.provider_profile = Some(profile);
        self.policy_version = policy_version;
        self.matched_rule_id = rule_id;
        self
    }

    pub fn with_suggestion(mut self, domain: impl Into<String>) -> Self {
        self.suggestion = Some(domain.into());
        self
    }

    pub fn with_reply(mut self, reply: &ProtocolReply) -> Self {
        self.evidence.status_code = Some(reply.status_code);
        self.evidence.enhanced_code = reply.enhanced_code.clone();
        if !reply.message.is_empty() {
            self.evidence.message = Some(reply.message.clone());
        }
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.evidence.mx_host = Some(host.into());
        self
    }

    pub fn with_step(mut self, step: SmtpStep) -> Self {
        self.evidence.step = Some(step);
        self
    }

    pub fn with_transcript(mut self, transcript: Vec<String>) -> Self {
        self.evidence.transcript = transcript;
        self
    }

    /// Only `retryable` and `unknown` decisions may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.decision_class,
            DecisionClass::Retryable | DecisionClass::Unknown
        )
    }

    pub fn rank(&self) -> u8 {
        self.category.rank()
    }

    pub fn is_valid(&self) -> bool {
        self.category == Category::Valid
    }
}

fn default_strategy(class: DecisionClass) -> RetryStrategy {
    match class {
        DecisionClass::PolicyBlocked => RetryStrategy::PolicyDelay,
        DecisionClass::Retryable | DecisionClass::Unknown => RetryStrategy::Tempfail,
        DecisionClass::Deliverable | DecisionClass::Undeliverable => RetryStrategy::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_blocked_forces_policy_delay() {
        let v = Verdict::risky("policy_blocked")
            .with_decision(DecisionClass::PolicyBlocked)
            .with_retry(RetryStrategy::Tempfail, 3600);
        assert_eq!(v.retry_strategy, RetryStrategy::PolicyDelay);
        assert_eq!(v.retry_after_secs, Some(3600));
        assert!(!v.is_retryable());
    }

    #[test]
    fn terminal_decisions_drop_retry_guidance() {
        let v = Verdict::invalid("rcpt_rejected").with_retry(RetryStrategy::Greylist, 60);
        assert_eq!(v.retry_strategy, RetryStrategy::None);
        assert_eq!(v.retry_after_secs, None);
    }

    #[test]
    fn timeout_is_retryable() {
        let v = Verdict::smtp_timeout();
        assert_eq!(v.category, Category::Risky);
        assert_eq!(v.decision_class, DecisionClass::Retryable);
        assert!(v.is_retryable());
        assert_eq!(v.evidence.decision_class, Some(DecisionClass::Retryable));
    }

    #[test]
    fn rank_orders_valid_risky_invalid() {
        assert!(Verdict::valid("rcpt_ok").rank() > Verdict::risky("x").rank());
        assert!(Verdict::risky("x").rank() > Verdict::invalid("y").rank());
    }

    #[test]
    fn serializes_snake_case_tags() {
        let v = Verdict::smtp_tempfail("smtp_read_error");
        let json = serde_json::to_value(&v).expect("serialize");
        assert_eq!(json["category"], "risky");
        assert_eq!(json["decision_class"], "retryable");
        assert_eq!(json["retry_strategy"], "tempfail");
        assert_eq!(json["reason_code"], "smtp_read_error");
    }
}
