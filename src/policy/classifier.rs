use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::engine::{GENERIC_PROFILE, PolicyEngine};
use super::heuristics::{
    is_greylist_signal, is_mailbox_missing, is_policy_block, is_transient_policy_block,
    static_retry_delay,
};
use super::provider::resolve_provider;
use super::types::RuleMatch;
use crate::smtp::ProtocolReply;
use crate::verdict::{Category, Confidence, DecisionClass, RetryStrategy, SmtpStep, Verdict};

/// Knobs controlling how replies are turned into verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    /// Consult the provider policy engine before the fixed heuristics.
    pub use_policy_engine: bool,
    /// Take retry delays from the provider retry tables instead of the
    /// static 30..=180 second heuristic.
    pub adaptive_retry: bool,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            use_policy_engine: true,
            adaptive_retry: true,
        }
    }
}

/// Where a reply was observed.
#[derive(Debug, Clone, Copy)]
pub struct ReplyContext<'a> {
    pub step: SmtpStep,
    pub provider_hint: &'a str,
    pub host: &'a str,
    /// Only a recipient step may end the session with a `valid` verdict.
    pub allow_valid: bool,
}

impl<'a> ReplyContext<'a> {
    pub fn new(step: SmtpStep, provider_hint: &'a str, host: &'a str) -> Self {
        Self {
            step,
            provider_hint,
            host,
            allow_valid: step == SmtpStep::RcptTo,
        }
    }
}

/// Result of classifying one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Session step succeeded; move on to the next one.
    Continue,
    /// The session ends here with this verdict.
    Done(Verdict),
}

#[derive(Debug, Clone, Default)]
pub struct ReplyClassifier {
    engine: Option<Arc<PolicyEngine>>,
    options: ClassifierOptions,
}

impl ReplyClassifier {
    pub fn new(engine: Option<Arc<PolicyEngine>>, options: ClassifierOptions) -> Self {
        Self { engine, options }
    }

    /// Heuristics only, static retry delays.
    pub fn heuristic() -> Self {
        Self {
            engine: None,
            options: ClassifierOptions {
                use_policy_engine: false,
                adaptive_retry: false,
            },
        }
    }

    pub fn options(&self) -> ClassifierOptions {
        self.options
    }

    fn active_engine(&self) -> Option<&PolicyEngine> {
        self.engine
            .as_deref()
            .filter(|engine| self.options.use_policy_engine && engine.is_enabled())
    }

    fn effective_provider(&self, reply: &ProtocolReply, ctx: &ReplyContext<'_>) -> String {
        let provider = resolve_provider(ctx.provider_hint, ctx.host, &reply.message);
        match self.active_engine() {
            Some(engine) if !engine.has_profile(&provider) => GENERIC_PROFILE.to_string(),
            _ => provider,
        }
    }

    /// Session steps continue on 2xx; everything else ends the session.
    pub fn classify(&self, reply: &ProtocolReply, ctx: &ReplyContext<'_>) -> Classification {
        if ctx.step != SmtpStep::RcptTo && reply.is_positive_completion() {
            return Classification::Continue;
        }
        Classification::Done(self.verdict(reply, ctx))
    }

    /// Terminal verdict for a reply, regardless of step.
    pub fn verdict(&self, reply: &ProtocolReply, ctx: &ReplyContext<'_>) -> Verdict {
        if reply.is_malformed() {
            return malformed_reply()
                .with_reply(reply)
                .with_step(ctx.step)
                .with_host(ctx.host);
        }

        let provider = self.effective_provider(reply, ctx);
        let matched = self
            .active_engine()
            .and_then(|engine| engine.evaluate(&provider, reply))
            .and_then(|m| {
                if m.outcome.category == Category::Valid && !ctx.allow_valid {
                    debug!(
                        step = %ctx.step,
                        rule = m.rule_id,
                        "discarding valid rule match outside recipient step"
                    );
                    None
                } else {
                    Some(m)
                }
            });

        let (verdict, rule_id) = match matched {
            Some(m) => {
                let rule_id = m.rule_id.to_string();
                (verdict_from_rule(&m), Some(rule_id))
            }
            None => (fallback(reply, ctx), None),
        };

        let verdict = if ctx.step == SmtpStep::MailFrom
            && verdict.decision_class == DecisionClass::Undeliverable
        {
            mail_from_rejected()
        } else {
            verdict
        };

        debug!(
            step = %ctx.step,
            host = ctx.host,
            code = reply.status_code,
            provider = %provider,
            rule = rule_id.as_deref().unwrap_or("-"),
            category = %verdict.category,
            decision = %verdict.decision_class,
            "reply classified"
        );

        self.finish(verdict, reply, ctx, &provider, rule_id)
    }

    /// Verdict for a `MAIL FROM` rejected with a permanent code: the sender
    /// was refused, which says nothing about the recipient.
    pub fn classify_mail_from_rejection(
        &self,
        reply: &ProtocolReply,
        ctx: &ReplyContext<'_>,
    ) -> Verdict {
        let provider = self.effective_provider(reply, ctx);
        self.finish(mail_from_rejected(), reply, ctx, &provider, None)
    }

    fn finish(
        &self,
        verdict: Verdict,
        reply: &ProtocolReply,
        ctx: &ReplyContext<'_>,
        provider: &str,
        rule_id: Option<String>,
    ) -> Verdict {
        let version = self
            .active_engine()
            .map(|engine| engine.version().to_string())
            .filter(|v| !v.is_empty());
        let verdict = verdict
            .with_reply(reply)
            .with_step(ctx.step)
            .with_host(ctx.host)
            .with_provenance(provider, version, rule_id);

        let class = verdict.decision_class;
        if !matches!(
            class,
            DecisionClass::Retryable | DecisionClass::Unknown | DecisionClass::PolicyBlocked
        ) {
            return verdict;
        }
        let greylist = class != DecisionClass::PolicyBlocked && is_greylist_signal(reply);
        let delay = self.retry_delay(provider, class, greylist, reply);
        let strategy = if greylist {
            RetryStrategy::Greylist
        } else {
            RetryStrategy::Tempfail
        };
        verdict.with_retry(strategy, delay)
    }

    /// Adaptive delay from the provider table, or the static heuristic.
    pub fn retry_delay(
        &self,
        provider: &str,
        class: DecisionClass,
        greylist: bool,
        reply: &ProtocolReply,
    ) -> u64 {
        match (self.options.adaptive_retry, self.engine.as_deref()) {
            (true, Some(engine)) => engine.retry_delay(provider, class, greylist),
            _ => static_retry_delay(reply),
        }
    }
}

fn verdict_from_rule(m: &RuleMatch<'_>) -> Verdict {
    let outcome = m.outcome;
    let confidence = outcome.confidence.unwrap_or(match outcome.decision_class {
        DecisionClass::Deliverable | DecisionClass::Undeliverable => Confidence::High,
        DecisionClass::Retryable | DecisionClass::PolicyBlocked => Confidence::Medium,
        DecisionClass::Unknown => Confidence::Low,
    });
    let mut verdict = Verdict::new(
        outcome.category,
        outcome.reason.clone(),
        outcome.decision_class,
        confidence,
    );
    if let Some(code) = &outcome.reason_code {
        verdict = verdict.with_reason_code(code.clone());
    }
    verdict
}

fn malformed_reply() -> Verdict {
    Verdict::risky("smtp_tempfail").with_reason_code("smtp_malformed_reply")
}

fn mail_from_rejected() -> Verdict {
    Verdict::risky("smtp_tempfail")
        .with_reason_code("smtp_mailfrom_rejected")
        .with_decision(DecisionClass::Retryable)
        .with_confidence(Confidence::Low)
}

fn policy_blocked() -> Verdict {
    Verdict::risky("policy_blocked")
        .with_reason_code("smtp_policy_blocked")
        .with_decision(DecisionClass::PolicyBlocked)
        .with_confidence(Confidence::Medium)
}

fn fallback(reply: &ProtocolReply, ctx: &ReplyContext<'_>) -> Verdict {
    let rcpt = ctx.step == SmtpStep::RcptTo;
    match reply.status_code {
        200..=299 if ctx.allow_valid => Verdict::valid("rcpt_ok"),
        400..=499 => {
            if is_transient_policy_block(reply) {
                policy_blocked()
            } else {
                let code = if is_greylist_signal(reply) {
                    "smtp_greylisted"
                } else {
                    "smtp_tempfail"
                };
                Verdict::risky("smtp_tempfail")
                    .with_reason_code(code)
                    .with_decision(DecisionClass::Retryable)
                    .with_confidence(Confidence::Medium)
            }
        }
        500..=599 => {
            if is_policy_block(reply) {
                policy_blocked()
            } else if rcpt && is_mailbox_missing(reply) {
                Verdict::invalid("rcpt_rejected").with_reason_code("mailbox_not_found")
            } else if rcpt {
                Verdict::invalid("rcpt_rejected").with_confidence(Confidence::Medium)
            } else {
                Verdict::invalid("smtp_unavailable")
                    .with_reason_code("smtp_session_rejected")
                    .with_confidence(Confidence::Low)
            }
        }
        _ => Verdict::risky("smtp_unknown").with_reason_code("smtp_unexpected_reply"),
    }
}
