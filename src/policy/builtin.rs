//! Built-in provider profiles shipped with the crate.

use std::collections::BTreeMap;

use super::types::{
    CodeRule, EnhancedRule, MessageRule, PolicyDocument, ProfileDocument, RetryDocument,
    RetryTable, RuleOutcome,
};
use crate::verdict::{Category, Confidence, DecisionClass};

pub(crate) const BUILTIN_VERSION: &str = "builtin-1";

/// Retry delays used when neither the document nor `generic` define one.
pub(crate) const FALLBACK_RETRY: RetryTable = RetryTable {
    default: 300,
    tempfail: 600,
    greylist: 900,
    policy_blocked: 3600,
    unknown: 900,
};

fn outcome(
    category: Category,
    reason: &str,
    reason_code: &str,
    class: DecisionClass,
    confidence: Confidence,
) -> RuleOutcome {
    RuleOutcome {
        category,
        reason: reason.to_string(),
        reason_code: Some(reason_code.to_string()),
        decision_class: class,
        confidence: Some(confidence),
    }
}

fn mailbox_missing() -> RuleOutcome {
    outcome(
        Category::Invalid,
        "rcpt_rejected",
        "mailbox_not_found",
        DecisionClass::Undeliverable,
        Confidence::High,
    )
}

fn policy_blocked(code: &str) -> RuleOutcome {
    outcome(
        Category::Risky,
        "policy_blocked",
        code,
        DecisionClass::PolicyBlocked,
        Confidence::Medium,
    )
}

fn tempfail(code: &str) -> RuleOutcome {
    outcome(
        Category::Risky,
        "smtp_tempfail",
        code,
        DecisionClass::Retryable,
        Confidence::Medium,
    )
}

fn enhanced(id: &str, prefix: &str, outcome: RuleOutcome) -> EnhancedRule {
    EnhancedRule {
        id: id.to_string(),
        prefix: prefix.to_string(),
        outcome,
    }
}

fn code(id: &str, code: u16, outcome: RuleOutcome) -> CodeRule {
    CodeRule {
        id: id.to_string(),
        code,
        outcome,
    }
}

fn message(id: &str, contains: &str, outcome: RuleOutcome) -> MessageRule {
    MessageRule {
        id: id.to_string(),
        contains: contains.to_string(),
        outcome,
    }
}

fn generic() -> ProfileDocument {
    ProfileDocument {
        enhanced_rules: Some(vec![
            enhanced("generic-5.1.1", "5.1.1", mailbox_missing()),
            enhanced("generic-5.1.10", "5.1.10", mailbox_missing()),
            enhanced(
                "generic-5.2.1",
                "5.2.1",
                outcome(
                    Category::Invalid,
                    "rcpt_rejected",
                    "mailbox_disabled",
                    DecisionClass::Undeliverable,
                    Confidence::High,
                ),
            ),
            enhanced("generic-5.7", "5.7", policy_blocked("smtp_policy_blocked")),
            enhanced("generic-4.2.2", "4.2.2", tempfail("mailbox_full")),
        ]),
        smtp_code_rules: Some(vec![code(
            "generic-421",
            421,
            tempfail("service_unavailable"),
        )]),
        message_rules: Some(vec![message(
            "generic-mailbox-full",
            "mailbox full",
            tempfail("mailbox_full"),
        )]),
        retry: Some(RetryDocument {
            default: Some(FALLBACK_RETRY.default),
            tempfail: Some(FALLBACK_RETRY.tempfail),
            greylist: Some(FALLBACK_RETRY.greylist),
            policy_blocked: Some(FALLBACK_RETRY.policy_blocked),
            unknown: Some(FALLBACK_RETRY.unknown),
        }),
    }
}

fn gmail() -> ProfileDocument {
    ProfileDocument {
        enhanced_rules: Some(vec![
            enhanced("gmail-5.1.1", "5.1.1", mailbox_missing()),
            enhanced("gmail-4.2.1", "4.2.1", tempfail("rate_limited")),
            enhanced(
                "gmail-5.7.26",
                "5.7.26",
                policy_blocked("unauthenticated_sender"),
            ),
            enhanced("gmail-5.7", "5.7", policy_blocked("smtp_policy_blocked")),
        ]),
        smtp_code_rules: None,
        message_rules: Some(vec![message(
            "gmail-rate",
            "receiving mail at a rate",
            tempfail("rate_limited"),
        )]),
        retry: Some(RetryDocument {
            tempfail: Some(900),
            greylist: Some(600),
            ..RetryDocument::default()
        }),
    }
}

fn microsoft() -> ProfileDocument {
    ProfileDocument {
        enhanced_rules: Some(vec![
            enhanced("microsoft-5.1.10", "5.1.10", mailbox_missing()),
            enhanced("microsoft-5.1.1", "5.1.1", mailbox_missing()),
            enhanced(
                "microsoft-5.7.606",
                "5.7.606",
                policy_blocked("banned_sending_ip"),
            ),
            enhanced("microsoft-5.7", "5.7", policy_blocked("smtp_policy_blocked")),
        ]),
        smtp_code_rules: None,
        message_rules: Some(vec![message(
            "microsoft-s3150",
            "s3150",
            policy_blocked("sender_blocklisted"),
        )]),
        retry: Some(RetryDocument {
            tempfail: Some(900),
            greylist: Some(1200),
            policy_blocked: Some(7200),
            ..RetryDocument::default()
        }),
    }
}

fn yahoo() -> ProfileDocument {
    ProfileDocument {
        enhanced_rules: None,
        smtp_code_rules: None,
        message_rules: Some(vec![
            message("yahoo-ts01", "[ts01]", tempfail("rate_limited")),
            message("yahoo-ts03", "[ts03]", policy_blocked("sender_blocklisted")),
            message(
                "yahoo-no-account",
                "doesn't have a yahoo.com account",
                mailbox_missing(),
            ),
        ]),
        retry: Some(RetryDocument {
            tempfail: Some(1800),
            greylist: Some(1800),
            unknown: Some(1800),
            ..RetryDocument::default()
        }),
    }
}

/// The `generic` profile alone, used to fill a document that omits it.
pub(crate) fn generic_profile() -> ProfileDocument {
    generic()
}

pub fn builtin_document() -> PolicyDocument {
    let mut profiles = BTreeMap::new();
    profiles.insert("generic".to_string(), generic());
    profiles.insert("gmail".to_string(), gmail());
    profiles.insert("microsoft".to_string(), microsoft());
    profiles.insert("yahoo".to_string(), yahoo());
    PolicyDocument {
        enabled: true,
        version: BUILTIN_VERSION.to_string(),
        profiles,
    }
}
